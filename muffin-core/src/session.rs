//! GameSession - the primary public API for the interrogation game.
//!
//! Wires the state store, analysis engine, transcript store, memory store,
//! and character agents into one session lifecycle: start, question turns,
//! and the final accusation/reveal. One session is live per instance.
//!
//! Error policy follows the rest of the engine: game-rule rejections
//! (exhausted budget, wrong phase, mismatched session id) come back as
//! `None`/`false`, while storage failures during crash-safe writes are real
//! errors.

use crate::agent::{CharacterAgent, OllamaGenerator, ResponseGenerator};
use crate::analysis::AnalysisEngine;
use crate::memory::MemoryStore;
use crate::persist::StorageError;
use crate::state::{CharacterId, GameState, Phase, StateStore};
use crate::transcript::{TranscriptStore, TranscriptTurn, DEFAULT_MAX_TRANSCRIPTS};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Errors from GameSession operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration for creating a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Root directory for per-character transcript logs.
    pub transcripts_dir: PathBuf,

    /// Root directory for memory summaries.
    pub session_data_dir: PathBuf,

    /// Scenario seed; a fresh random seed is used when unset.
    pub seed: Option<u64>,

    /// Question budget per character.
    pub questions_per_character: u32,

    /// Circular-log capacity per character.
    pub max_transcripts_per_character: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transcripts_dir: PathBuf::from("transcripts"),
            session_data_dir: PathBuf::from("session_data"),
            seed: None,
            questions_per_character: 2,
            max_transcripts_per_character: DEFAULT_MAX_TRANSCRIPTS,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transcripts root directory.
    pub fn with_transcripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcripts_dir = dir.into();
        self
    }

    /// Set the session-data root directory.
    pub fn with_session_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_data_dir = dir.into();
        self
    }

    /// Fix the scenario seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the per-character question budget.
    pub fn with_questions_per_character(mut self, questions: u32) -> Self {
        self.questions_per_character = questions;
        self
    }

    /// Set the per-character transcript capacity.
    pub fn with_max_transcripts(mut self, max: usize) -> Self {
        self.max_transcripts_per_character = max;
        self
    }
}

/// Result of starting a session.
#[derive(Debug, Clone)]
pub struct SessionStart {
    pub session_id: String,
    pub intro: String,
}

/// Outcome of an accusation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the accused character is the thief.
    pub correct: bool,

    /// Reveal text naming the true guilty character.
    pub reveal: String,
}

/// An interrogation game session.
pub struct GameSession {
    config: SessionConfig,
    state_store: StateStore,
    transcript_store: TranscriptStore,
    memory_store: MemoryStore,
    engine: AnalysisEngine,
    agents: HashMap<CharacterId, CharacterAgent>,
    generator: Option<Arc<dyn ResponseGenerator>>,
    session_id: Option<String>,
}

impl GameSession {
    /// Create a session backed by Ollama, with per-character model routing.
    pub fn new(config: SessionConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a session where every character shares one generator. Used
    /// for scripted tests and custom collaborators.
    pub fn with_generator(config: SessionConfig, generator: Arc<dyn ResponseGenerator>) -> Self {
        Self::build(config, Some(generator))
    }

    fn build(config: SessionConfig, generator: Option<Arc<dyn ResponseGenerator>>) -> Self {
        let state_store = StateStore::new(config.seed);
        let transcript_store = TranscriptStore::new(
            &config.transcripts_dir,
            config.max_transcripts_per_character,
        );
        let memory_store = MemoryStore::new(&config.session_data_dir);

        Self {
            config,
            state_store,
            transcript_store,
            memory_store,
            engine: AnalysisEngine::new(),
            agents: HashMap::new(),
            generator,
            session_id: None,
        }
    }

    /// Start the game: derive the scenario, set up storage, spin up the
    /// character agents, and move to the interrogation phase.
    pub async fn start_game(&mut self) -> Result<SessionStart, SessionError> {
        let session_id = Uuid::new_v4().to_string();
        let questions = self.config.questions_per_character;

        self.state_store.initialize_session(&session_id, questions);
        let guilty_id = self
            .state_store
            .guilty_character_id()
            .unwrap_or(CharacterId::Crumbs);

        self.transcript_store.initialize_session(&session_id).await?;
        self.memory_store.initialize_session(&session_id).await?;

        self.agents = CharacterId::ALL
            .iter()
            .map(|&cid| {
                let generator: Arc<dyn ResponseGenerator> = match &self.generator {
                    Some(shared) => Arc::clone(shared),
                    None => Arc::new(OllamaGenerator::for_character(cid)),
                };
                (cid, CharacterAgent::new(cid, cid == guilty_id, generator))
            })
            .collect();

        self.state_store.set_phase(Phase::Interrogation);
        self.session_id = Some(session_id.clone());
        info!(session_id = %session_id, "session started");

        let intro = format!(
            "The Grand Muffin has been stolen from the Muffin Gang's vault. \
             You are interrogating three members: Crumbs, Cherry, and Glaze. \
             Each has {questions} questions. Find the thief.\n\
             Characters: Crumbs (nervous), Cherry (cocky), Glaze (calm)."
        );

        Ok(SessionStart { session_id, intro })
    }

    /// Ask a character one question.
    ///
    /// Returns `Ok(None)` when the turn is rejected by game rules: unknown
    /// or mismatched session, wrong phase, or exhausted question budget.
    pub async fn ask(
        &mut self,
        session_id: &str,
        character_id: CharacterId,
        player_question: &str,
    ) -> Result<Option<TranscriptTurn>, SessionError> {
        if self.session_id.as_deref() != Some(session_id) {
            return Ok(None);
        }
        match self.state_store.state() {
            Some(state) if state.phase == Phase::Interrogation => {}
            _ => return Ok(None),
        }
        if !self.state_store.use_question(character_id) {
            return Ok(None);
        }

        let turn_id = self.state_store.increment_turn();
        let suspicion = self.state_store.get_suspicion_snapshot();
        let notes = self.state_store.contradiction_notes_for(character_id);

        let recent = self
            .transcript_store
            .get_character_last_n_turns(session_id, character_id, crate::memory::MAX_RECENT_TURNS)
            .await;
        let context = self
            .memory_store
            .memory_context_for_turn(session_id, character_id, recent, notes)
            .await;

        let Some(agent) = self.agents.get(&character_id) else {
            return Ok(None);
        };
        let raw_output = agent.answer_question(player_question, &context).await;

        let mut turn = TranscriptTurn::npc_answer(
            session_id,
            turn_id,
            character_id,
            player_question,
            raw_output,
        );
        if let Ok(snapshot) = serde_json::to_value(&suspicion) {
            turn.metadata.insert("suspicion_snapshot".to_string(), snapshot);
        }

        turn.structured_claims = self.engine.process_turn(&mut self.state_store, &turn);

        self.transcript_store
            .log_turn(session_id, character_id, &turn)
            .await?;

        let all_turns = self
            .transcript_store
            .get_character_turns(session_id, character_id)
            .await;
        self.memory_store
            .maybe_summarize_character(session_id, character_id, &all_turns)
            .await?;

        Ok(Some(turn))
    }

    /// Whether the character has questions left.
    pub fn can_ask(&self, character_id: CharacterId) -> bool {
        self.state_store
            .character_state(character_id)
            .map(|cs| cs.questions_remaining > 0)
            .unwrap_or(false)
    }

    /// Accuse a character and end the game. `None` on an invalid session.
    pub fn accuse(&mut self, session_id: &str, accused: CharacterId) -> Option<Verdict> {
        if self.session_id.as_deref() != Some(session_id) {
            return None;
        }
        let guilty_id = self.state_store.guilty_character_id()?;

        self.state_store.set_phase(Phase::Accusation);
        let correct = guilty_id == accused;
        self.state_store.set_phase(Phase::Ended);

        let reveal = if correct {
            format!("You were right. {accused} stole the Grand Muffin.")
        } else {
            format!("Wrong. The thief was {guilty_id}, not {accused}.")
        };
        Some(Verdict { correct, reveal })
    }

    /// The full session transcript across all characters, sorted by turn.
    pub async fn full_transcript(&self, session_id: &str) -> Vec<TranscriptTurn> {
        self.transcript_store.get_full_transcript(session_id).await
    }

    /// The live game state, if a session is active.
    pub fn state(&self) -> Option<&GameState> {
        self.state_store.state()
    }

    /// Sweep leftover temp files from a previous crashed run of this
    /// session's storage. The last committed index/slot pair stays the
    /// ground truth.
    pub async fn recover(&self, session_id: &str) -> Result<(), SessionError> {
        self.transcript_store.recover_session(session_id).await?;
        self.memory_store.recover_session(session_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;
    use tempfile::TempDir;

    fn scripted_session(dir: &TempDir, seed: u64, responses: Vec<&str>) -> GameSession {
        let config = SessionConfig::new()
            .with_transcripts_dir(dir.path().join("transcripts"))
            .with_session_data_dir(dir.path().join("session_data"))
            .with_seed(seed);
        let generator = Arc::new(ScriptedGenerator::new(
            responses.into_iter().map(String::from).collect(),
        ));
        GameSession::with_generator(config, generator)
    }

    #[tokio::test]
    async fn test_start_game_sets_up_interrogation() {
        let dir = TempDir::new().unwrap();
        let mut session = scripted_session(&dir, 3, vec![]);

        let start = session.start_game().await.unwrap();
        assert!(start.intro.contains("Grand Muffin"));

        let state = session.state().unwrap();
        assert_eq!(state.phase, Phase::Interrogation);
        assert_eq!(state.characters.len(), 3);
    }

    #[tokio::test]
    async fn test_ask_rejects_mismatched_session() {
        let dir = TempDir::new().unwrap();
        let mut session = scripted_session(&dir, 3, vec!["hello"]);
        session.start_game().await.unwrap();

        let turn = session
            .ask("not-the-session", CharacterId::Crumbs, "who are you?")
            .await
            .unwrap();
        assert!(turn.is_none());
    }

    #[tokio::test]
    async fn test_ask_logs_turn_with_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut session = scripted_session(&dir, 3, vec!["I was in the kitchen."]);
        let start = session.start_game().await.unwrap();

        let turn = session
            .ask(&start.session_id, CharacterId::Cherry, "where were you?")
            .await
            .unwrap()
            .expect("turn accepted");

        assert_eq!(turn.turn_id, 1);
        assert_eq!(turn.raw_output, "I was in the kitchen.");
        assert!(turn.metadata.contains_key("suspicion_snapshot"));
        assert!(!turn.structured_claims.is_empty());

        // Turn is durable.
        let persisted = session.full_transcript(&start.session_id).await;
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].turn_id, 1);
    }

    #[tokio::test]
    async fn test_accuse_invalid_session_is_none() {
        let dir = TempDir::new().unwrap();
        let mut session = scripted_session(&dir, 3, vec![]);
        session.start_game().await.unwrap();

        assert!(session.accuse("other", CharacterId::Glaze).is_none());
    }
}
