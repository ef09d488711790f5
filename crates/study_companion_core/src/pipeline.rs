//! crates/study_companion_core/src/pipeline.rs
//!
//! Assembly of the sequential agent pipelines.
//!
//! Each pipeline is a fixed ordered list of [`StageSpec`]s. A stage binds a
//! role description, an instruction, and an expected-output description; the
//! executor (see `ports::PipelineExecutor`) runs the stages strictly in
//! order, letting later stages see earlier outputs, and returns the final
//! stage's raw text. Nothing here performs I/O.

use crate::domain::{
    OutreachBrief, Question, RoutineConstraints, Subject, TestDifficulty, TestType,
};
use serde::Deserialize;

/// The fixed services the lead-qualification strategist may pitch.
const AGENCY_SERVICES: &str = "\
1. SEO Optimization Service: Best for companies with good products but low traffic. We increase organic reach.
2. Custom Web Development: Best for companies with outdated, ugly or slow websites. We build modern React/Python sites.
3. AI Automation: Best for companies with manual, repetitive tasks. We build agents to save time.";

/// A capability a stage is permitted to use while executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageTool {
    /// The executor may fetch and read web-page content referenced by the
    /// stage instruction.
    ScrapeWebsite,
}

/// One role-bound instruction/response unit within a pipeline.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// Short role name, e.g. "Study Planner".
    pub role: String,
    /// What this stage is trying to achieve.
    pub goal: String,
    /// Persona text framing how the stage should behave.
    pub backstory: String,
    /// The instruction for this stage, possibly interpolated with
    /// user-supplied fields.
    pub description: String,
    /// What shape of output the stage should produce.
    pub expected_output: String,
    pub tools: Vec<StageTool>,
}

// =========================================================================
// Lead-qualification pipeline (research -> service match -> email)
// =========================================================================

/// Builds the three-stage pipeline that researches a target website,
/// matches it to one of the fixed agency services, and drafts a cold
/// email of at most 150 words.
pub fn lead_qualification_pipeline(target_url: &str) -> Vec<StageSpec> {
    vec![
        StageSpec {
            role: "Business Intelligence Analyst".to_string(),
            goal: "Analyze the target company website and identify their core business and potential weaknesses.".to_string(),
            backstory: "You are an expert at analyzing businesses just by looking at their landing page. You look for what they do and where they might be struggling.".to_string(),
            description: format!(
                "Scrape the website {}. Summarize what the company does and identify 1 key area where they could improve (e.g., design, traffic, automation).",
                target_url
            ),
            expected_output: "A brief summary of the company and their potential pain points.".to_string(),
            tools: vec![StageTool::ScrapeWebsite],
        },
        StageSpec {
            role: "Agency Strategist".to_string(),
            goal: "Match the target company needs with ONE of our agency services.".to_string(),
            backstory: format!(
                "You work for a top-tier digital agency. Your goal is to read the analysis of a prospect and decide which of OUR services to pitch.\n\nOUR SERVICES KNOWLEDGE BASE:\n{}\n\nYou must pick the SINGLE best service for this specific client and explain why.",
                AGENCY_SERVICES
            ),
            description: "Based on the analysis, pick ONE service from our Agency Knowledge Base that solves their problem. Explain the match.".to_string(),
            expected_output: "The selected service and the reasoning for the match.".to_string(),
            tools: vec![],
        },
        StageSpec {
            role: "Senior Sales Copywriter".to_string(),
            goal: "Write a personalized cold email that sounds human and professional.".to_string(),
            backstory: "You write emails that get replies. You never sound robotic. You mention specific details found by the Researcher to prove we actually looked at their site.".to_string(),
            description: "Draft a cold email to the CEO of the target company. Pitch the selected service. Keep it under 150 words.".to_string(),
            expected_output: "A professional cold email ready to send.".to_string(),
            tools: vec![],
        },
    ]
}

// =========================================================================
// Outreach pipeline (research -> strategy -> subject+body email)
// =========================================================================

/// Builds the three-stage pipeline that turns an [`OutreachBrief`] into a
/// complete outreach email (subject line plus 150-200 word body, signed by
/// the sender).
pub fn outreach_pipeline(brief: &OutreachBrief) -> Vec<StageSpec> {
    let recipient = brief.recipient().to_string();
    let context = brief
        .additional_context
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("None provided");

    vec![
        StageSpec {
            role: "Company Researcher".to_string(),
            goal: format!(
                "Research and analyze {} to understand their business, values, and needs",
                brief.target_company
            ),
            backstory: "You are an expert business researcher. Your job is to analyze companies and identify what they do, their industry, and potential pain points or opportunities. You provide detailed insights that help craft personalized cold emails.".to_string(),
            description: format!(
                "Research {} and provide insights on:\n1. What the company does (industry, products/services)\n2. Their likely pain points or challenges\n3. Recent news or achievements (if applicable)\n4. What they might value in a {} context\n\nAdditional context: {}",
                brief.target_company, brief.purpose, context
            ),
            expected_output: "A detailed analysis of the company including industry, pain points, and strategic opportunities.".to_string(),
            tools: vec![],
        },
        StageSpec {
            role: "Email Strategist".to_string(),
            goal: format!(
                "Determine the best approach for a {} email to {}",
                brief.purpose, brief.target_company
            ),
            backstory: "You are a strategic communications expert. You analyze the research about a company and determine the best angle, tone, and key points to include in a cold email to maximize response rates. You understand what makes people respond to cold outreach.".to_string(),
            description: format!(
                "Based on the company research, determine:\n1. The best angle/hook for a {} email\n2. Key value propositions to mention\n3. The appropriate tone (formal, casual, enthusiastic, etc.)\n4. What specific pain point or opportunity to address\n\nSender: {}\nRecipient: {} at {}\nPurpose: {}",
                brief.purpose, brief.sender_name, recipient, brief.target_company, brief.purpose
            ),
            expected_output: "A strategic brief with recommended angle, tone, and key talking points.".to_string(),
            tools: vec![],
        },
        StageSpec {
            role: "Professional Copywriter".to_string(),
            goal: "Write a compelling, personalized cold email that gets responses".to_string(),
            backstory: "You are an elite copywriter specializing in cold emails. You write emails that are concise, engaging, and professional. You know how to hook readers in the first sentence, provide value, and include clear calls-to-action. Your emails never sound generic or spammy.".to_string(),
            description: format!(
                "Write a personalized cold email with these specifications:\n\nFROM: {sender}\nTO: {recipient} at {company}\nPURPOSE: {purpose}\n\nUse the research and strategy provided to create an email that:\n- Has a compelling subject line\n- Opens with a personalized hook (not generic)\n- Shows you've researched the company\n- Clearly states the purpose\n- Includes a specific, low-friction call-to-action\n- Is 150-200 words maximum\n- Sounds human and professional\n\nFormat with Subject line first, then the email body.\nSign off as {sender}.",
                sender = brief.sender_name,
                recipient = recipient,
                company = brief.target_company,
                purpose = brief.purpose,
            ),
            expected_output: "A complete, ready-to-send cold email with subject line and body.".to_string(),
            tools: vec![],
        },
    ]
}

// =========================================================================
// Study-routine pipeline (single stage)
// =========================================================================

/// Builds the single-stage pipeline that produces a day-by-day weekly
/// study schedule from the user's subjects and time constraints.
pub fn study_routine_pipeline(
    subjects: &[Subject],
    constraints: &RoutineConstraints,
) -> Vec<StageSpec> {
    let subjects_info = subjects
        .iter()
        .map(|s| {
            let first_topics = s
                .syllabus
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "- {}: Priority {}, Difficulty {}, {} hrs/week, Topics: {}...",
                s.name,
                s.priority.label(),
                s.difficulty.label(),
                s.hours_per_week,
                first_topics
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    vec![StageSpec {
        role: "Study Planner".to_string(),
        goal: "Create effective study routines and schedules for students".to_string(),
        backstory: "You are an expert educational planner with years of experience helping students organize their study time effectively. You understand different learning styles, optimal study durations, and how to balance multiple subjects. You create personalized study plans that maximize learning efficiency.".to_string(),
        description: format!(
            "Create a personalized study routine based on the following:\n\nSubjects:\n{}\n\nConstraints:\n- Study hours per day: {}\n- Preferred time: {}\n- Break every {} minutes for {} minutes\n\nCreate a detailed weekly schedule that:\n1. Balances all subjects based on their priority and difficulty\n2. Allocates more time to high-priority and difficult subjects\n3. Includes specific topics to study each session\n4. Incorporates revision time\n5. Provides a day-by-day breakdown\n\nFormat the schedule clearly with days of the week and time slots.",
            subjects_info,
            constraints.hours_per_day,
            constraints.preferred_time,
            constraints.break_interval_minutes,
            constraints.break_duration_minutes,
        ),
        expected_output: "A detailed, well-structured weekly study schedule".to_string(),
        tools: vec![],
    }]
}

// =========================================================================
// Test-generation pipeline (single stage) and output parsing
// =========================================================================

/// Builds the single-stage pipeline that generates a multiple-choice test
/// for a subject. The question count is fixed by the test type and the
/// output is requested as a JSON object with a `questions` array.
pub fn test_generation_pipeline(
    subject: &Subject,
    test_type: TestType,
    difficulty: TestDifficulty,
) -> Vec<StageSpec> {
    let topics = subject.syllabus.join(", ");
    let num_questions = test_type.question_count();

    vec![StageSpec {
        role: "Test Creator".to_string(),
        goal: "Create comprehensive tests and assessments for students".to_string(),
        backstory: "You are an experienced educator who specializes in creating well-structured tests that accurately assess student understanding. You create questions that range from basic recall to advanced application, and you provide clear, detailed solutions.".to_string(),
        description: format!(
            "Create a {} level test on {}.\n\nTopics to cover: {}\n\nCreate {} multiple choice questions.\n\nFor each question, provide:\n1. The question text\n2. 4 options (A, B, C, D)\n3. The correct answer\n4. A brief explanation of why it's correct\n\nFormat as JSON:\n{{\n    \"questions\": [\n        {{\n            \"question\": \"...\",\n            \"options\": [\"A. ...\", \"B. ...\", \"C. ...\", \"D. ...\"],\n            \"correct\": \"A\",\n            \"explanation\": \"...\"\n        }}\n    ]\n}}",
            difficulty.label(),
            subject.name,
            topics,
            num_questions,
        ),
        expected_output: "A JSON-formatted test with questions, options, correct answers, and explanations".to_string(),
        tools: vec![StageTool::ScrapeWebsite],
    }]
}

// =========================================================================
// Single-turn chat pipelines
// =========================================================================

/// Builds the single-stage homework-help pipeline for one chat message.
/// Each invocation is independent; no prior turns are passed along.
pub fn homework_pipeline(question: &str) -> Vec<StageSpec> {
    vec![StageSpec {
        role: "Homework Helper".to_string(),
        goal: "Help students understand and complete their homework".to_string(),
        backstory: "You are a patient and knowledgeable tutor who helps students with their homework. You explain concepts clearly, provide step-by-step guidance, and help students develop problem-solving skills. You use web research when needed to provide accurate information.".to_string(),
        description: format!(
            "Help with this homework question: {}\n\nPlease provide:\n1. A clear, comprehensive explanation\n2. Step-by-step breakdown if it's a problem\n3. Relevant examples\n4. Additional helpful context\n\nMake your response educational and easy to understand.",
            question
        ),
        expected_output: "A detailed, helpful response to the homework question".to_string(),
        tools: vec![StageTool::ScrapeWebsite],
    }]
}

/// Builds the single-stage definition-lookup pipeline for one term.
pub fn definition_pipeline(term: &str) -> Vec<StageSpec> {
    vec![StageSpec {
        role: "Definition Expert".to_string(),
        goal: "Provide clear and comprehensive definitions for any term or concept".to_string(),
        backstory: "You are a knowledge expert who excels at explaining definitions clearly. You provide not just the basic definition, but also context, examples, and related concepts to ensure complete understanding. You can explain terms from any field of study.".to_string(),
        description: format!(
            "Provide a comprehensive definition for: {}\n\nPlease include:\n1. Clear, concise definition\n2. Etymology/origin if relevant\n3. Examples of usage\n4. Related concepts or terms\n5. Any important context or nuances\n\nMake it educational and easy to understand.",
            term
        ),
        expected_output: "A comprehensive definition with context and examples".to_string(),
        tools: vec![StageTool::ScrapeWebsite],
    }]
}

// =========================================================================
// Test-output parsing
// =========================================================================

/// Raised when the test generator's output cannot be parsed into
/// questions. Carries the raw text so callers can surface it to the user
/// instead of silently discarding it.
#[derive(Debug, thiserror::Error)]
#[error("Test output was not valid JSON")]
pub struct TestParseError {
    pub raw: String,
}

#[derive(Deserialize)]
struct QuestionPayload {
    questions: Vec<Question>,
}

/// Extracts the questions from raw test-generator output.
///
/// Models tend to wrap the JSON object in prose, so this takes the
/// substring from the first `{` to the last `}` (the outermost object; a
/// non-greedy match would stop at the first nested close brace) and parses
/// that. If no brace-delimited substring exists, the whole output is
/// tried. Any failure, including an empty `questions` array, yields a
/// [`TestParseError`] carrying the raw text.
pub fn extract_question_payload(raw: &str) -> Result<Vec<Question>, TestParseError> {
    let candidate = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    };

    let parsed: QuestionPayload = serde_json::from_str(candidate)
        .or_else(|_| serde_json::from_str(raw))
        .map_err(|_| TestParseError {
            raw: raw.to_string(),
        })?;

    if parsed.questions.is_empty() {
        return Err(TestParseError {
            raw: raw.to_string(),
        });
    }
    Ok(parsed.questions)
}
