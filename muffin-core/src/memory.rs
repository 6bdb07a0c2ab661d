//! Per-character memory summaries.
//!
//! A [`MemorySummary`] is a compact digest of a character's turn history,
//! injected into future prompts to keep answers consistent. Summaries are
//! overwritten wholesale on each resummarization and persisted with the
//! same temp-then-rename discipline as transcripts. The summarizer never
//! fabricates narrative content: fields it cannot derive are carried over
//! or left as explicit placeholders.

use crate::persist::{self, StorageError};
use crate::state::CharacterId;
use crate::transcript::TranscriptTurn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Number of recent key-claim lines retained per summary.
const MAX_KEY_CLAIMS: usize = 20;

/// Number of recent turns included in a prompt context.
pub const MAX_RECENT_TURNS: usize = 5;

/// Compacted digest of one character's interrogation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub character_id: CharacterId,

    #[serde(default)]
    pub core_alibi: String,

    #[serde(default)]
    pub timeline_summary: String,

    #[serde(default)]
    pub relationships_and_attitude: String,

    /// Flat text lines for the most recent claims (at most 20).
    #[serde(default)]
    pub key_claims: Vec<String>,

    #[serde(default)]
    pub known_self_contradictions: Vec<String>,

    #[serde(default)]
    pub known_inter_contradictions: Vec<String>,

    #[serde(default)]
    pub lie_patterns: String,

    /// The last turn id incorporated; guards against redundant rewrites.
    #[serde(default)]
    pub last_updated_turn_id: u64,
}

impl MemorySummary {
    /// An empty summary for a character with no history yet.
    pub fn empty(character_id: CharacterId) -> Self {
        Self {
            character_id,
            core_alibi: String::new(),
            timeline_summary: String::new(),
            relationships_and_attitude: String::new(),
            key_claims: Vec::new(),
            known_self_contradictions: Vec::new(),
            known_inter_contradictions: Vec::new(),
            lie_patterns: String::new(),
            last_updated_turn_id: 0,
        }
    }
}

/// Everything an agent needs from memory for one prompt.
#[derive(Debug, Clone)]
pub struct MemoryContext {
    pub summary: MemorySummary,
    pub recent_turns: Vec<TranscriptTurn>,
    pub contradiction_notes: Vec<String>,
}

/// Loads, saves, and refreshes per-character memory summaries.
pub struct MemoryStore {
    base: PathBuf,
}

impl MemoryStore {
    /// Create a store rooted at the session-data directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.base.join(format!("session_{session_id}"))
    }

    fn summary_path(&self, session_id: &str, character_id: CharacterId) -> PathBuf {
        self.session_dir(session_id)
            .join(format!("{}_memory_summary.json", character_id.name()))
    }

    /// Create the session layout and seed empty summaries. Idempotent.
    pub async fn initialize_session(&self, session_id: &str) -> Result<(), StorageError> {
        fs::create_dir_all(self.session_dir(session_id)).await?;
        for cid in CharacterId::ALL {
            let path = self.summary_path(session_id, cid);
            if persist::read_json_opt::<MemorySummary>(&path).await.is_none() {
                persist::write_json_atomic(&path, &MemorySummary::empty(cid)).await?;
            }
        }
        Ok(())
    }

    /// Load a character's summary; missing or corrupt files yield an empty
    /// summary, never an error.
    pub async fn load_memory_summary(
        &self,
        session_id: &str,
        character_id: CharacterId,
    ) -> MemorySummary {
        persist::read_json_opt(&self.summary_path(session_id, character_id))
            .await
            .unwrap_or_else(|| MemorySummary::empty(character_id))
    }

    /// Persist a summary crash-safely.
    pub async fn save_memory_summary(
        &self,
        session_id: &str,
        summary: &MemorySummary,
    ) -> Result<(), StorageError> {
        persist::write_json_atomic(&self.summary_path(session_id, summary.character_id), summary)
            .await
    }

    /// Bundle the summary with recent turns and contradiction notes for a
    /// prompt.
    pub async fn memory_context_for_turn(
        &self,
        session_id: &str,
        character_id: CharacterId,
        recent_turns: Vec<TranscriptTurn>,
        contradiction_notes: Vec<String>,
    ) -> MemoryContext {
        let summary = self.load_memory_summary(session_id, character_id).await;
        let mut recent = recent_turns;
        if recent.len() > MAX_RECENT_TURNS {
            recent.drain(..recent.len() - MAX_RECENT_TURNS);
        }
        MemoryContext {
            summary,
            recent_turns: recent,
            contradiction_notes,
        }
    }

    /// Re-summarize a character's history if it has grown.
    ///
    /// Skips work when the character has 3 or fewer turns, or when no turn
    /// newer than `last_updated_turn_id` exists; calling twice with an
    /// unchanged turn set is a no-op.
    pub async fn maybe_summarize_character(
        &self,
        session_id: &str,
        character_id: CharacterId,
        all_turns: &[TranscriptTurn],
    ) -> Result<MemorySummary, StorageError> {
        let current = self.load_memory_summary(session_id, character_id).await;
        if all_turns.len() <= 3 {
            return Ok(current);
        }

        let last_turn_id = all_turns.iter().map(|t| t.turn_id).max().unwrap_or(0);
        if last_turn_id <= current.last_updated_turn_id {
            return Ok(current);
        }

        let mut key_claims = Vec::new();
        for turn in all_turns {
            for claim in &turn.structured_claims {
                let mut line = format!("{}: {}", claim.subject, claim.action);
                if let Some(time) = &claim.time {
                    line.push_str(&format!(" at {time}"));
                }
                if let Some(location) = &claim.location {
                    line.push_str(&format!(" in {location}"));
                }
                key_claims.push(line);
            }
        }
        if key_claims.len() > MAX_KEY_CLAIMS {
            key_claims.drain(..key_claims.len() - MAX_KEY_CLAIMS);
        }

        let updated = MemorySummary {
            character_id,
            core_alibi: if current.core_alibi.is_empty() {
                "Not yet stated.".to_string()
            } else {
                current.core_alibi
            },
            timeline_summary: if current.timeline_summary.is_empty() {
                "Timeline not yet established.".to_string()
            } else {
                current.timeline_summary
            },
            relationships_and_attitude: current.relationships_and_attitude,
            key_claims,
            known_self_contradictions: current.known_self_contradictions,
            known_inter_contradictions: current.known_inter_contradictions,
            lie_patterns: current.lie_patterns,
            last_updated_turn_id: last_turn_id,
        };

        self.save_memory_summary(session_id, &updated).await?;
        Ok(updated)
    }

    /// Sweep leftover temp files from an interrupted write.
    pub async fn recover_session(&self, session_id: &str) -> Result<(), StorageError> {
        persist::sweep_tmp_files(&self.session_dir(session_id)).await
    }
}
