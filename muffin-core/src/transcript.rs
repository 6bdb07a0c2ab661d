//! Durable interrogation transcripts.
//!
//! Each character's history is a fixed-capacity circular log on disk: slot
//! files named by zero-padded slot number plus an `index.json` tracking the
//! last written slot and a monotonic write counter. Turns older than
//! `capacity` writes are permanently overwritten; that bounded-history
//! tradeoff is deliberate.
//!
//! All writes go through the atomic temp-then-rename discipline in
//! [`crate::persist`], and the index is updated strictly after the slot
//! write commits. A crash loses at most the in-flight turn, never corrupts
//! committed history.

use crate::persist::{self, StorageError};
use crate::state::{CharacterId, Claim};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::fs;
use tracing::warn;

/// Default circular-log capacity per character.
pub const DEFAULT_MAX_TRANSCRIPTS: usize = 100;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpeakerKind {
    Player,
    Npc,
}

/// One exchange in the interrogation. Written once, never mutated after
/// persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub session_id: String,

    /// Globally unique, strictly increasing across all characters.
    pub turn_id: u64,

    /// The character addressed; absent for pure player turns.
    pub character_id: Option<CharacterId>,

    pub speaker: SpeakerKind,
    pub timestamp: String,

    #[serde(default)]
    pub player_question: Option<String>,

    #[serde(default)]
    pub raw_output: String,

    #[serde(default)]
    pub structured_claims: Vec<Claim>,

    /// Free-form annotations, e.g. the suspicion snapshot at this moment.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl TranscriptTurn {
    /// Create an NPC answer turn with the current timestamp.
    pub fn npc_answer(
        session_id: impl Into<String>,
        turn_id: u64,
        character_id: CharacterId,
        player_question: impl Into<String>,
        raw_output: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            turn_id,
            character_id: Some(character_id),
            speaker: SpeakerKind::Npc,
            timestamp: persist::timestamp(),
            player_question: Some(player_question.into()),
            raw_output: raw_output.into(),
            structured_claims: Vec::new(),
            metadata: Map::new(),
        }
    }
}

/// Persisted cursor for one character's circular log.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TranscriptIndex {
    /// Last written slot, -1 if empty.
    current_index: i64,

    /// Total turns ever written; may exceed capacity.
    total_written: u64,

    max_transcripts: usize,
    updated_at: String,
}

impl TranscriptIndex {
    fn empty(max_transcripts: usize) -> Self {
        Self {
            current_index: -1,
            total_written: 0,
            max_transcripts,
            updated_at: persist::timestamp(),
        }
    }
}

/// Crash-safe, bounded per-character transcript history.
pub struct TranscriptStore {
    base: PathBuf,
    max_per_character: usize,
}

impl TranscriptStore {
    /// Create a store rooted at `base` with the given per-character capacity.
    pub fn new(base: impl Into<PathBuf>, max_per_character: usize) -> Self {
        Self {
            base: base.into(),
            max_per_character: max_per_character.max(1),
        }
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.base.join(format!("session_{session_id}"))
    }

    fn character_dir(&self, session_id: &str, character_id: CharacterId) -> PathBuf {
        self.session_dir(session_id).join(character_id.name())
    }

    fn index_path(&self, session_id: &str, character_id: CharacterId) -> PathBuf {
        self.character_dir(session_id, character_id).join("index.json")
    }

    fn turn_path(&self, session_id: &str, character_id: CharacterId, slot: usize) -> PathBuf {
        self.character_dir(session_id, character_id)
            .join(format!("turn_{slot:03}.json"))
    }

    /// Create the session layout and empty indexes. Idempotent: an existing
    /// index is left alone.
    pub async fn initialize_session(&self, session_id: &str) -> Result<(), StorageError> {
        for cid in CharacterId::ALL {
            let dir = self.character_dir(session_id, cid);
            fs::create_dir_all(&dir).await?;

            let index_path = self.index_path(session_id, cid);
            if persist::read_json_opt::<TranscriptIndex>(&index_path).await.is_none() {
                persist::write_json_atomic(
                    &index_path,
                    &TranscriptIndex::empty(self.max_per_character),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn read_index(&self, session_id: &str, character_id: CharacterId) -> TranscriptIndex {
        persist::read_json_opt(&self.index_path(session_id, character_id))
            .await
            .unwrap_or_else(|| TranscriptIndex::empty(self.max_per_character))
    }

    /// Append a turn to the character's circular log: the slot file is
    /// committed first, then the index. Either write failing is a storage
    /// error; the previously committed state remains readable.
    pub async fn log_turn(
        &self,
        session_id: &str,
        character_id: CharacterId,
        turn: &TranscriptTurn,
    ) -> Result<(), StorageError> {
        let index = self.read_index(session_id, character_id).await;
        let next_slot =
            ((index.current_index + 1).rem_euclid(self.max_per_character as i64)) as usize;

        let slot_path = self.turn_path(session_id, character_id, next_slot);
        persist::write_json_atomic(&slot_path, turn).await?;

        let updated = TranscriptIndex {
            current_index: next_slot as i64,
            total_written: index.total_written + 1,
            max_transcripts: self.max_per_character,
            updated_at: persist::timestamp(),
        };
        persist::write_json_atomic(&self.index_path(session_id, character_id), &updated).await
    }

    /// The retained turns for one character, ascending by turn id. Walks
    /// backward from the current slot for up to `min(total, capacity)`
    /// entries; missing or corrupt slots are skipped, not fatal.
    pub async fn get_character_turns(
        &self,
        session_id: &str,
        character_id: CharacterId,
    ) -> Vec<TranscriptTurn> {
        let index = self.read_index(session_id, character_id).await;
        if index.total_written == 0 || index.current_index < 0 {
            return Vec::new();
        }

        let capacity = self.max_per_character as i64;
        let count = (index.total_written).min(self.max_per_character as u64) as i64;

        let mut turns = Vec::new();
        for i in 0..count {
            let slot = (index.current_index - i).rem_euclid(capacity) as usize;
            let path = self.turn_path(session_id, character_id, slot);
            match persist::read_json_opt::<TranscriptTurn>(&path).await {
                Some(turn) => turns.push(turn),
                None => {
                    warn!(character = %character_id, slot, "transcript slot unreadable, skipping");
                }
            }
        }

        turns.sort_by_key(|t| t.turn_id);
        turns
    }

    /// The most recent `n` retained turns for one character, ascending.
    pub async fn get_character_last_n_turns(
        &self,
        session_id: &str,
        character_id: CharacterId,
        n: usize,
    ) -> Vec<TranscriptTurn> {
        let mut turns = self.get_character_turns(session_id, character_id).await;
        if turns.len() > n {
            turns.drain(..turns.len() - n);
        }
        turns
    }

    /// Union of all characters' retained turns, deduplicated by turn id and
    /// sorted by `(turn_id, character)`.
    pub async fn get_full_transcript(&self, session_id: &str) -> Vec<TranscriptTurn> {
        let mut seen: HashSet<u64> = HashSet::new();
        let mut all = Vec::new();

        for cid in CharacterId::ALL {
            for turn in self.get_character_turns(session_id, cid).await {
                if seen.insert(turn.turn_id) {
                    all.push(turn);
                }
            }
        }

        all.sort_by_key(|t| (t.turn_id, t.character_id.map(|c| c.name()).unwrap_or("")));
        all
    }

    /// Sweep leftover temp files from an interrupted write. The last
    /// committed index/slot pair is trusted as ground truth.
    pub async fn recover_session(&self, session_id: &str) -> Result<(), StorageError> {
        for cid in CharacterId::ALL {
            let dir = self.character_dir(session_id, cid);
            persist::sweep_tmp_files(&dir).await?;
        }
        Ok(())
    }

    /// The configured per-character capacity.
    pub fn capacity(&self) -> usize {
        self.max_per_character
    }
}
