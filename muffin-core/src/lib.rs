//! Interrogation game engine with AI-driven suspects.
//!
//! This crate provides:
//! - Canonical game state: scenario truth, claims, contradictions, suspicion
//! - Pattern-based claim extraction and contradiction detection
//! - Crash-safe bounded transcript logs and memory summaries
//! - Character agents backed by an Ollama text-generation collaborator
//!
//! # Quick Start
//!
//! ```ignore
//! use muffin_core::{CharacterId, GameSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = GameSession::new(SessionConfig::new());
//!     let start = session.start_game().await?;
//!     println!("{}", start.intro);
//!
//!     if let Some(turn) = session
//!         .ask(&start.session_id, CharacterId::Crumbs, "Where were you at 9?")
//!         .await?
//!     {
//!         println!("Crumbs: {}", turn.raw_output);
//!     }
//!
//!     let verdict = session.accuse(&start.session_id, CharacterId::Cherry);
//!     println!("{:?}", verdict);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod analysis;
pub mod config;
pub mod memory;
pub mod persist;
pub mod session;
pub mod state;
pub mod testing;
pub mod transcript;

// Primary public API
pub use agent::{CharacterAgent, GenerateError, OllamaGenerator, ResponseGenerator};
pub use analysis::{extract_claims, AnalysisEngine};
pub use memory::{MemoryStore, MemorySummary};
pub use persist::StorageError;
pub use session::{GameSession, SessionConfig, SessionError, SessionStart, Verdict};
pub use state::{CharacterId, GameState, Phase, StateStore};
pub use transcript::{SpeakerKind, TranscriptStore, TranscriptTurn};
