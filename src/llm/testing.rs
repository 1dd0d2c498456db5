//! Canned completion providers for tests

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{CompletionError, CompletionOptions, CompletionProvider};

/// Replays scripted responses in order; `None` entries and calls past the
/// end of the script fail like a network error
pub struct ScriptedProvider {
    responses: Mutex<Vec<Option<String>>>,
    pub prompts: Mutex<Vec<String>>,
    pub options: Mutex<Vec<CompletionOptions>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Option<&str>>) -> Self {
        let mut responses: Vec<Option<String>> =
            responses.into_iter().map(|r| r.map(str::to_string)).collect();
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        prompt: &str,
        _input: &serde_json::Value,
        opts: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.options.lock().unwrap().push(*opts);
        match self.responses.lock().unwrap().pop() {
            Some(Some(text)) => Ok(text),
            _ => Err(CompletionError::Request("scripted failure".to_string())),
        }
    }
}

/// Sleeps before answering, for timeout tests
///
/// The eventual answer is valid for both extraction and classification.
pub struct SlowProvider(pub Duration);

#[async_trait]
impl CompletionProvider for SlowProvider {
    async fn complete(
        &self,
        _prompt: &str,
        _input: &serde_json::Value,
        _opts: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        tokio::time::sleep(self.0).await;
        Ok(r#"{"requests": ["call me back"], "labels": ["plan_contact"]}"#.to_string())
    }
}
