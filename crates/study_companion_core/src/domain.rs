//! crates/study_companion_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or UI framework.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Difficulty of a subject as rated by the user when adding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    VeryHard,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::VeryHard => "Very Hard",
        }
    }
}

/// How urgently a subject needs study time relative to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::VeryHigh => "Very High",
        }
    }
}

/// Difficulty requested for a generated test. Unlike [`Difficulty`] this
/// includes `Mixed`, which asks the generator to vary question difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestDifficulty {
    Easy,
    Medium,
    Hard,
    Mixed,
}

impl TestDifficulty {
    pub fn label(&self) -> &'static str {
        match self {
            TestDifficulty::Easy => "Easy",
            TestDifficulty::Medium => "Medium",
            TestDifficulty::Hard => "Hard",
            TestDifficulty::Mixed => "Mixed",
        }
    }
}

/// The size of a generated test, which fixes its question count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestType {
    Quick,
    Standard,
    Grand,
}

impl TestType {
    /// Number of multiple-choice questions a test of this type contains.
    pub fn question_count(&self) -> usize {
        match self {
            TestType::Quick => 5,
            TestType::Standard => 10,
            TestType::Grand => 20,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestType::Quick => "Quick Test (5 questions)",
            TestType::Standard => "Standard Test (10 questions)",
            TestType::Grand => "Grand Test (20 questions)",
        }
    }
}

/// A subject the user is studying, together with its syllabus topics.
///
/// Subject names are unique within a namespace (case-insensitive); the
/// keystore enforces this on insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    /// Ordered syllabus topics, one entry per topic.
    pub syllabus: Vec<String>,
    pub difficulty: Difficulty,
    pub priority: Priority,
    pub hours_per_week: u32,
    pub added_date: NaiveDate,
}

/// One multiple-choice question as produced by the test generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    /// Four options, each prefixed with its label ("A. ...", "B. ...").
    pub options: Vec<String>,
    /// The label of the correct option ("A" through "D").
    pub correct: String,
    pub explanation: String,
}

/// A generated test held as the namespace's single "current test" until
/// it is submitted and converted into a [`TestResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Test {
    pub subject: String,
    pub test_type: TestType,
    pub difficulty: TestDifficulty,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl Test {
    /// Grades a set of answers against this test.
    ///
    /// `answers` maps question index to the chosen option label.
    /// Unanswered questions count as wrong. The score is a percentage:
    /// 7 correct of 10 yields 70.0.
    pub fn grade(&self, answers: &HashMap<usize, String>) -> TestResult {
        let total = self.questions.len();
        let correct = self
            .questions
            .iter()
            .enumerate()
            .filter(|(idx, q)| answers.get(idx).map(String::as_str) == Some(q.correct.as_str()))
            .count();

        let score = if total == 0 {
            0.0
        } else {
            (correct as f64 / total as f64) * 100.0
        };

        TestResult {
            subject: self.subject.clone(),
            test_type: self.test_type,
            difficulty: self.difficulty,
            score,
            correct,
            total,
            date: Utc::now(),
        }
    }
}

/// The outcome of one submitted test, appended to the namespace's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub subject: String,
    pub test_type: TestType,
    pub difficulty: TestDifficulty,
    pub score: f64,
    pub correct: usize,
    pub total: usize,
    pub date: DateTime<Utc>,
}

/// Who authored a chat transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in a homework-help or definitions transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Time constraints supplied when generating a study routine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineConstraints {
    pub hours_per_day: u32,
    /// Free-text label such as "Morning (6AM-12PM)" or "Mixed".
    pub preferred_time: String,
    pub break_interval_minutes: u32,
    pub break_duration_minutes: u32,
}

/// Input for the three-stage outreach email pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachBrief {
    pub sender_name: String,
    pub target_company: String,
    pub target_person: Option<String>,
    pub target_role: Option<String>,
    /// e.g. "Job Application", "Business Partnership", "Sales Pitch".
    pub purpose: String,
    pub additional_context: Option<String>,
}

impl OutreachBrief {
    /// Resolves who the email addresses: the named person if known, the
    /// role otherwise, and a generic fallback when neither is given.
    pub fn recipient(&self) -> &str {
        self.target_person
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                self.target_role
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
            })
            .unwrap_or("Hiring Manager")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: &str) -> Question {
        Question {
            question: "q".to_string(),
            options: vec![
                "A. one".to_string(),
                "B. two".to_string(),
                "C. three".to_string(),
                "D. four".to_string(),
            ],
            correct: correct.to_string(),
            explanation: "because".to_string(),
        }
    }

    fn test_with_answers(correct_labels: &[&str]) -> Test {
        Test {
            subject: "Algebra".to_string(),
            test_type: TestType::Standard,
            difficulty: TestDifficulty::Medium,
            questions: correct_labels.iter().map(|c| question(c)).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn grade_counts_exact_matches() {
        let test = test_with_answers(&["A", "B", "C", "D", "A", "B", "C", "D", "A", "B"]);
        let mut answers = HashMap::new();
        // First seven answered correctly, one wrong, two missing.
        for (idx, label) in ["A", "B", "C", "D", "A", "B", "C"].iter().enumerate() {
            answers.insert(idx, label.to_string());
        }
        answers.insert(7, "A".to_string());

        let result = test.grade(&answers);
        assert_eq!(result.correct, 7);
        assert_eq!(result.total, 10);
        assert!((result.score - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn grade_treats_unanswered_as_wrong() {
        let test = test_with_answers(&["A", "B"]);
        let result = test.grade(&HashMap::new());
        assert_eq!(result.correct, 0);
        assert_eq!(result.total, 2);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn recipient_falls_back_from_person_to_role() {
        let mut brief = OutreachBrief {
            sender_name: "Ada".to_string(),
            target_company: "Acme".to_string(),
            target_person: Some("Jane Smith".to_string()),
            target_role: Some("CEO".to_string()),
            purpose: "Networking".to_string(),
            additional_context: None,
        };
        assert_eq!(brief.recipient(), "Jane Smith");

        brief.target_person = Some("  ".to_string());
        assert_eq!(brief.recipient(), "CEO");

        brief.target_role = None;
        assert_eq!(brief.recipient(), "Hiring Manager");
    }

    #[test]
    fn test_type_question_counts() {
        assert_eq!(TestType::Quick.question_count(), 5);
        assert_eq!(TestType::Standard.question_count(), 10);
        assert_eq!(TestType::Grand.question_count(), 20);
    }
}
