//! Testing utilities.
//!
//! [`ScriptedGenerator`] stands in for the Ollama collaborator in
//! deterministic tests: it replays queued responses in order and falls back
//! to a fixed line once the script runs out.

use crate::agent::{GenerateError, ResponseGenerator};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A response generator that returns scripted replies.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedGenerator {
    /// Create a generator with an initial script.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    /// Create a generator with an empty script.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Queue another response.
    pub fn queue_response(&self, response: impl Into<String>) {
        self.responses
            .lock()
            .expect("script lock poisoned")
            .push_back(response.into());
    }

    /// Number of unused scripted responses.
    pub fn remaining(&self) -> usize {
        self.responses.lock().expect("script lock poisoned").len()
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, GenerateError> {
        let next = self
            .responses
            .lock()
            .expect("script lock poisoned")
            .pop_front();
        Ok(next.unwrap_or_else(|| "I have nothing more to say.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let generator = ScriptedGenerator::new(vec!["one".to_string(), "two".to_string()]);

        assert_eq!(generator.generate("", "").await.unwrap(), "one");
        assert_eq!(generator.generate("", "").await.unwrap(), "two");
        assert_eq!(
            generator.generate("", "").await.unwrap(),
            "I have nothing more to say."
        );
    }

    #[tokio::test]
    async fn test_queue_response() {
        let generator = ScriptedGenerator::empty();
        generator.queue_response("later");

        assert_eq!(generator.remaining(), 1);
        assert_eq!(generator.generate("", "").await.unwrap(), "later");
        assert_eq!(generator.remaining(), 0);
    }
}
