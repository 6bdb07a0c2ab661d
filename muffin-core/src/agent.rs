//! Character agents: persona-bound suspects answering through a text
//! generator.
//!
//! The generator is an external collaborator behind the
//! [`ResponseGenerator`] trait. The contract with the rest of the engine:
//! [`CharacterAgent::answer_question`] always produces a best-effort string,
//! converting generator failures into a descriptive placeholder so the
//! orchestrator can always log a turn.

use crate::config;
use crate::memory::MemoryContext;
use crate::state::CharacterId;
use async_trait::async_trait;
use ollama::{ChatRequest, Message, Ollama};
use std::sync::Arc;

/// Maximum characters of a quoted question in the prompt.
const MAX_QUESTION_CHARS: usize = 200;

/// Maximum characters of a quoted prior answer in the prompt.
const MAX_ANSWER_CHARS: usize = 300;

/// Maximum contradiction notes surfaced in one prompt.
const MAX_CONTRADICTION_NOTES: usize = 5;

/// Errors from a response generator.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Ollama API error: {0}")]
    Ollama(#[from] ollama::Error),

    #[error("{0}")]
    Other(String),
}

/// Produces one in-character free-text reply for a system prompt and a
/// reconstructed user prompt.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GenerateError>;
}

/// Real collaborator: routes prompts to an Ollama model.
pub struct OllamaGenerator {
    client: Ollama,
    model: String,
}

impl OllamaGenerator {
    /// Create a generator for a specific model.
    pub fn new(client: Ollama, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Create a generator for a character's configured model, with the host
    /// taken from `OLLAMA_HOST` or the default.
    pub fn for_character(character_id: CharacterId) -> Self {
        Self::new(Ollama::from_env(), config::model_for(character_id))
    }
}

#[async_trait]
impl ResponseGenerator for OllamaGenerator {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GenerateError> {
        let request = ChatRequest::new(&self.model)
            .with_message(Message::system(system))
            .with_message(Message::user(prompt));
        let response = self.client.chat(request).await?;
        Ok(response.text().to_string())
    }
}

/// One gang member: persona, hidden instruction, and generator.
pub struct CharacterAgent {
    character_id: CharacterId,
    persona: String,
    guilty: bool,
    generator: Arc<dyn ResponseGenerator>,
}

impl CharacterAgent {
    /// Create an agent for a character. `guilty` selects the hidden
    /// instruction; the character never learns the other suspects' roles.
    pub fn new(
        character_id: CharacterId,
        guilty: bool,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Self {
        Self {
            character_id,
            persona: config::persona_prompt(character_id).to_string(),
            guilty,
            generator,
        }
    }

    pub fn character_id(&self) -> CharacterId {
        self.character_id
    }

    /// Reconstruct the user prompt: memory recap, contradiction notes,
    /// recent exchanges, and the new question.
    pub fn build_prompt(&self, player_question: &str, context: &MemoryContext) -> String {
        let mut parts = vec!["--- MEMORY RECAP ---".to_string()];

        if context.summary.key_claims.is_empty() {
            parts.push("Your key claims so far: None yet.".to_string());
        } else {
            parts.push(format!(
                "Your key claims so far: {}",
                context.summary.key_claims.join("; ")
            ));
        }
        let alibi = if context.summary.core_alibi.is_empty() {
            "Not yet stated."
        } else {
            context.summary.core_alibi.as_str()
        };
        parts.push(format!("Your alibi / story: {alibi}"));

        if !context.contradiction_notes.is_empty() {
            parts.push(
                "Contradictions to be aware of (stay consistent or address carefully):"
                    .to_string(),
            );
            for note in context.contradiction_notes.iter().take(MAX_CONTRADICTION_NOTES) {
                parts.push(format!("  - {note}"));
            }
        }

        if !context.recent_turns.is_empty() {
            parts.push("\n--- YOUR RECENT ANSWERS ---".to_string());
            for turn in &context.recent_turns {
                if let Some(question) = &turn.player_question {
                    parts.push(format!(
                        "Investigator asked: {}",
                        truncate_chars(question, MAX_QUESTION_CHARS)
                    ));
                }
                parts.push(format!(
                    "You said: {}",
                    truncate_chars(&turn.raw_output, MAX_ANSWER_CHARS)
                ));
            }
        }

        parts.push("\n--- NEW QUESTION ---".to_string());
        parts.push(format!("The investigator asks: {player_question}"));
        parts.push(
            "\nReply in character only, in 1-3 short paragraphs. Do not confess or break \
             character."
                .to_string(),
        );

        parts.join("\n")
    }

    /// Ask the character a question. Never fails: a generator error comes
    /// back as a bracketed placeholder string.
    pub async fn answer_question(&self, player_question: &str, context: &MemoryContext) -> String {
        let system = format!("{}\n\n{}", self.persona, config::hidden_instructions(self.guilty));
        let prompt = self.build_prompt(player_question, context);

        match self.generator.generate(&system, &prompt).await {
            Ok(text) => text,
            Err(e) => format!("[Error calling model: {e}]"),
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryContext, MemorySummary};
    use crate::transcript::TranscriptTurn;

    struct FailingGenerator;

    #[async_trait]
    impl ResponseGenerator for FailingGenerator {
        async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, GenerateError> {
            Err(GenerateError::Other("connection refused".to_string()))
        }
    }

    fn context_with_notes(notes: Vec<String>) -> MemoryContext {
        MemoryContext {
            summary: MemorySummary::empty(CharacterId::Crumbs),
            recent_turns: Vec::new(),
            contradiction_notes: notes,
        }
    }

    #[test]
    fn test_prompt_contains_question_and_recap() {
        let agent = CharacterAgent::new(CharacterId::Crumbs, false, Arc::new(FailingGenerator));
        let prompt = agent.build_prompt("Where were you at 9?", &context_with_notes(vec![]));

        assert!(prompt.contains("MEMORY RECAP"));
        assert!(prompt.contains("Where were you at 9?"));
        assert!(prompt.contains("None yet."));
    }

    #[test]
    fn test_prompt_bounds_contradiction_notes() {
        let notes: Vec<String> = (0..8).map(|i| format!("note-{i}")).collect();
        let agent = CharacterAgent::new(CharacterId::Cherry, true, Arc::new(FailingGenerator));
        let prompt = agent.build_prompt("q", &context_with_notes(notes));

        assert!(prompt.contains("note-4"));
        assert!(!prompt.contains("note-5"));
    }

    #[test]
    fn test_prompt_truncates_recent_answers() {
        let mut turn =
            TranscriptTurn::npc_answer("s", 1, CharacterId::Glaze, "q".repeat(400), "a".repeat(500));
        turn.player_question = Some("q".repeat(400));
        let context = MemoryContext {
            summary: MemorySummary::empty(CharacterId::Glaze),
            recent_turns: vec![turn],
            contradiction_notes: vec![],
        };

        let agent = CharacterAgent::new(CharacterId::Glaze, false, Arc::new(FailingGenerator));
        let prompt = agent.build_prompt("new question", &context);

        assert!(!prompt.contains(&"q".repeat(201)));
        assert!(!prompt.contains(&"a".repeat(301)));
        assert!(prompt.contains(&"a".repeat(300)));
    }

    #[tokio::test]
    async fn test_generator_failure_degrades_to_placeholder() {
        let agent = CharacterAgent::new(CharacterId::Crumbs, false, Arc::new(FailingGenerator));
        let answer = agent
            .answer_question("Where were you?", &context_with_notes(vec![]))
            .await;

        assert!(answer.starts_with("[Error calling model:"));
        assert!(answer.contains("connection refused"));
    }
}
