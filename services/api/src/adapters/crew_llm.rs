//! services/api/src/adapters/crew_llm.rs
//!
//! This module contains the adapter for the sequential pipeline executor.
//! It implements the `PipelineExecutor` port from the `core` crate on top
//! of an OpenAI-compatible chat-completions API (Gemini's compatibility
//! endpoint by default).

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use study_companion_core::{
    pipeline::{StageSpec, StageTool},
    ports::{PipelineExecutor, PortError, PortResult},
};
use tracing::{debug, info, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that runs a stage pipeline sequentially against an
/// OpenAI-compatible LLM.
///
/// Each stage becomes one chat completion: the stage's role, goal,
/// backstory, and expected output form the system message; its instruction
/// (plus the outputs of all earlier stages, and any scraped page content)
/// forms the user message. The client is built per call from the supplied
/// credential, so each session talks to the provider with its own key.
#[derive(Clone)]
pub struct CrewAdapter {
    model: String,
    api_base: String,
    scrape_max_chars: usize,
    http: reqwest::Client,
}

impl CrewAdapter {
    pub fn new(model: String, api_base: String, scrape_max_chars: usize) -> Self {
        Self {
            model,
            api_base,
            scrape_max_chars,
            http: reqwest::Client::new(),
        }
    }

    /// Picks the first http(s) URL out of a stage instruction, if any.
    fn find_url(description: &str) -> Option<String> {
        let url_regex = Regex::new(r"https?://[^\s]+").unwrap();
        url_regex
            .find(description)
            .map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string())
    }

    /// Fetches a page and reduces it to plain text bounded by the
    /// configured size. Markup is stripped with a tag regex; this is a
    /// research aid for the model, not a faithful HTML renderer.
    async fn scrape(&self, url: &str) -> Result<String, reqwest::Error> {
        let body = self.http.get(url).send().await?.text().await?;

        let tag_regex = Regex::new(r"<[^>]+>").unwrap();
        let text = tag_regex.replace_all(&body, " ");
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut content = collapsed;
        truncate_at_char_boundary(&mut content, self.scrape_max_chars);
        Ok(content)
    }

    /// Builds the user message for one stage: the instruction, optionally
    /// augmented with scraped page content, followed by the outputs of
    /// every earlier stage as context.
    async fn stage_input(&self, stage: &StageSpec, prior: &[(String, String)]) -> String {
        let mut input = stage.description.clone();

        if stage.tools.contains(&StageTool::ScrapeWebsite) {
            if let Some(url) = Self::find_url(&stage.description) {
                match self.scrape(&url).await {
                    Ok(content) if !content.is_empty() => {
                        input.push_str(&format!("\n\nWEBSITE CONTENT ({}):\n{}", url, content));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // Tool failure is not a pipeline failure: the stage
                        // proceeds without the page content.
                        warn!("Scrape of {} failed: {}", url, e);
                    }
                }
            }
        }

        if !prior.is_empty() {
            input.push_str("\n\nCONTEXT FROM PREVIOUS STAGES:");
            for (role, output) in prior {
                input.push_str(&format!("\n\n[{}]\n{}", role, output));
            }
        }

        input
    }
}

/// Truncates to at most `max_bytes`, backing up to the nearest char
/// boundary. Scraped pages are arbitrary UTF-8, so the byte limit can
/// land inside a multibyte character and a plain `truncate` would panic.
fn truncate_at_char_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

//=========================================================================================
// `PipelineExecutor` Trait Implementation
//=========================================================================================

#[async_trait]
impl PipelineExecutor for CrewAdapter {
    async fn run_pipeline(&self, credential: &str, stages: &[StageSpec]) -> PortResult<String> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(PortError::Credential(
                "no API key was provided".to_string(),
            ));
        }
        if stages.is_empty() {
            return Err(PortError::Unexpected("pipeline has no stages".to_string()));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_key(credential)
            .with_api_base(&self.api_base);
        let client = Client::with_config(openai_config);

        let mut prior: Vec<(String, String)> = Vec::new();

        for stage in stages {
            info!("Running pipeline stage: {}", stage.role);

            let system = format!(
                "You are {role}. {backstory}\n\nYour goal: {goal}\n\nExpected output: {expected}",
                role = stage.role,
                backstory = stage.backstory,
                goal = stage.goal,
                expected = stage.expected_output,
            );
            let input = self.stage_input(stage, &prior).await;
            debug!("Stage '{}' input is {} chars", stage.role, input.len());

            let messages = vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(input)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
            ];

            let request = CreateChatCompletionRequestArgs::default()
                .model(&self.model)
                .messages(messages)
                .n(1)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

            // Call the API and manually map the error if it occurs, which
            // respects the orphan rule.
            let response = client.chat().create(request).await.map_err(
                |e: OpenAIError| PortError::StageFailed {
                    stage: stage.role.clone(),
                    message: e.to_string(),
                },
            )?;

            let output = response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| PortError::StageFailed {
                    stage: stage.role.clone(),
                    message: "model response contained no text content".to_string(),
                })?;

            prior.push((stage.role.clone(), output));
        }

        // Stage list is non-empty and every stage pushed an output.
        Ok(prior.pop().map(|(_, output)| output).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_url_picks_first_http_link() {
        let desc = "Scrape the website https://openai.com/. Summarize what the company does.";
        assert_eq!(
            CrewAdapter::find_url(desc),
            Some("https://openai.com/".to_string())
        );
    }

    #[test]
    fn find_url_returns_none_without_links() {
        assert_eq!(CrewAdapter::find_url("no links here"), None);
    }

    #[test]
    fn truncation_backs_up_to_a_char_boundary() {
        // Three two-byte characters: a limit of 5 bytes falls inside the
        // third one and must back up to 4 rather than panic.
        let mut text = "ααα".to_string();
        truncate_at_char_boundary(&mut text, 5);
        assert_eq!(text, "αα");
    }

    #[test]
    fn truncation_leaves_short_text_alone() {
        let mut text = "short".to_string();
        truncate_at_char_boundary(&mut text, 8000);
        assert_eq!(text, "short");

        let mut ascii = "abcdef".to_string();
        truncate_at_char_boundary(&mut ascii, 4);
        assert_eq!(ascii, "abcd");
    }
}
