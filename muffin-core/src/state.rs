//! Central game state: scenario canon, character states, claims,
//! contradictions, and suspicion scores.
//!
//! The [`StateStore`] is the sole mutator of [`GameState`]. Every mutating
//! operation is a no-op returning a default when no session is active, so
//! callers never have to special-case an uninitialized store.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The three suspects. The character set is fixed for every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterId {
    Crumbs,
    Cherry,
    Glaze,
}

impl CharacterId {
    /// All characters, in canonical order.
    pub const ALL: [CharacterId; 3] = [
        CharacterId::Crumbs,
        CharacterId::Cherry,
        CharacterId::Glaze,
    ];

    /// The character's display name.
    pub fn name(&self) -> &'static str {
        match self {
            CharacterId::Crumbs => "Crumbs",
            CharacterId::Cherry => "Cherry",
            CharacterId::Glaze => "Glaze",
        }
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Game phases, in order of progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Intro,
    Interrogation,
    Review,
    Accusation,
    Ended,
}

/// How certain a claim is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Certainty {
    /// Directly stated with a recognized time or location.
    #[default]
    Stated,
    /// Fallback capture of free text with no recognized pattern.
    Uncertain,
}

/// A structured claim extracted from an NPC statement.
///
/// Claims are immutable once created and accumulate for the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub subject: String,
    pub action: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub certainty: Certainty,
    #[serde(default)]
    pub source: Option<CharacterId>,
    #[serde(default)]
    pub turn_id: u64,
}

/// Whether a contradiction is within one character's own story or between
/// two characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionKind {
    SelfConflict,
    InterCharacter,
}

/// Which claim field conflicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictField {
    Time,
    Location,
}

/// Severity of a detected contradiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A detected conflict between claims. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    pub kind: ContradictionKind,
    pub character_id: CharacterId,
    pub other_character_id: Option<CharacterId>,
    pub field: ConflictField,
    pub description: String,
    pub severity: Severity,
}

/// Per-character game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterState {
    pub character_id: CharacterId,

    /// Remaining question budget. Never drops below zero.
    pub questions_remaining: u32,

    /// Claims extracted from this character's answers, in order.
    pub claims: Vec<Claim>,

    /// Suspicion score, always clamped to [0, 100].
    pub suspicion_score: f64,

    /// Contradictions attributed to this character.
    pub contradictions: Vec<Contradiction>,
}

/// One entry in the canonical timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time: String,
    pub event: String,
}

/// Canonical ground truth for a session. Created once from the seed and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioCanon {
    pub guilty_character_id: CharacterId,
    pub timeline: Vec<TimelineEvent>,
    pub location: String,
    pub key_events: Vec<String>,
    pub who_saw_what: HashMap<CharacterId, Vec<String>>,
}

impl ScenarioCanon {
    /// Build the heist scenario for a given guilty character and seed.
    /// Deterministic: the same seed always produces the same canon.
    fn generate(guilty_id: CharacterId, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let locations = ["the bakery vault", "the back room", "the kitchen"];
        let location = locations
            .choose(&mut rng)
            .copied()
            .unwrap_or(locations[0])
            .to_string();

        let mut who_saw_what = HashMap::new();
        who_saw_what.insert(
            CharacterId::Crumbs,
            vec![
                "Saw Cherry near the kitchen.".to_string(),
                "Did not see Glaze after 9pm.".to_string(),
            ],
        );
        who_saw_what.insert(
            CharacterId::Cherry,
            vec![
                "Saw Glaze by the vault.".to_string(),
                "Claims Crumbs was with them until 9.".to_string(),
            ],
        );
        who_saw_what.insert(
            CharacterId::Glaze,
            vec![
                "Saw Cherry leave early.".to_string(),
                "Claims to have been in the back room alone.".to_string(),
            ],
        );

        Self {
            guilty_character_id: guilty_id,
            timeline: vec![
                TimelineEvent {
                    time: "20:00".to_string(),
                    event: "Gang met at the bakery.".to_string(),
                },
                TimelineEvent {
                    time: "21:00".to_string(),
                    event: "Grand Muffin was taken from the vault.".to_string(),
                },
                TimelineEvent {
                    time: "21:30".to_string(),
                    event: "Someone left through the back.".to_string(),
                },
            ],
            location,
            key_events: vec![
                "Meeting".to_string(),
                "Vault opened".to_string(),
                "Muffin removed".to_string(),
                "Escape".to_string(),
            ],
            who_saw_what,
        }
    }
}

/// Full game state for one session. Owned exclusively by the [`StateStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub session_id: String,
    pub seed: u64,
    pub scenario: ScenarioCanon,
    pub characters: HashMap<CharacterId, CharacterState>,
    pub total_turns: u64,
    pub phase: Phase,
}

/// Holds and updates game state: scenario, question budgets, claims,
/// contradictions, and suspicion scores.
pub struct StateStore {
    seed: u64,
    state: Option<GameState>,
}

impl StateStore {
    /// Create a store with an optional seed. Without one, a fresh random
    /// seed is generated.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed: seed.unwrap_or_else(|| rand::thread_rng().gen()),
            state: None,
        }
    }

    /// Start a new session: pick the guilty character uniformly at random
    /// from the seeded generator, build the canon, and give every character
    /// the same question budget.
    pub fn initialize_session(
        &mut self,
        session_id: impl Into<String>,
        questions_per_character: u32,
    ) -> &GameState {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let guilty_id = *CharacterId::ALL
            .choose(&mut rng)
            .unwrap_or(&CharacterId::Crumbs);
        let scenario = ScenarioCanon::generate(guilty_id, self.seed);

        let characters = CharacterId::ALL
            .iter()
            .map(|&cid| {
                (
                    cid,
                    CharacterState {
                        character_id: cid,
                        questions_remaining: questions_per_character,
                        claims: Vec::new(),
                        suspicion_score: 0.0,
                        contradictions: Vec::new(),
                    },
                )
            })
            .collect();

        self.state.insert(GameState {
            session_id: session_id.into(),
            seed: self.seed,
            scenario,
            characters,
            total_turns: 0,
            phase: Phase::Intro,
        })
    }

    /// The live game state, if a session is active.
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// The guilty character for the active session.
    pub fn guilty_character_id(&self) -> Option<CharacterId> {
        self.state.as_ref().map(|s| s.scenario.guilty_character_id)
    }

    /// One character's state, if a session is active.
    pub fn character_state(&self, character_id: CharacterId) -> Option<&CharacterState> {
        self.state.as_ref()?.characters.get(&character_id)
    }

    /// Atomically check and decrement a character's question budget.
    /// Returns false (no mutation) when the budget is exhausted or no
    /// session is active.
    pub fn use_question(&mut self, character_id: CharacterId) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        match state.characters.get_mut(&character_id) {
            Some(cs) if cs.questions_remaining > 0 => {
                cs.questions_remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// Record a batch of claims for a character, stamping each with its
    /// source and turn id. Returns the stamped batch.
    pub fn add_claims(
        &mut self,
        character_id: CharacterId,
        mut claims: Vec<Claim>,
        turn_id: u64,
    ) -> Vec<Claim> {
        let Some(state) = self.state.as_mut() else {
            return Vec::new();
        };
        for claim in &mut claims {
            claim.source = Some(character_id);
            claim.turn_id = turn_id;
        }
        if let Some(cs) = state.characters.get_mut(&character_id) {
            cs.claims.extend(claims.iter().cloned());
        }
        claims
    }

    /// Append a contradiction to the character it is attributed to.
    pub fn add_contradiction(&mut self, contradiction: Contradiction) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if let Some(cs) = state.characters.get_mut(&contradiction.character_id) {
            cs.contradictions.push(contradiction);
        }
    }

    /// Set a character's suspicion score, clamped to [0, 100].
    pub fn set_suspicion(&mut self, character_id: CharacterId, score: f64) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if let Some(cs) = state.characters.get_mut(&character_id) {
            cs.suspicion_score = score.clamp(0.0, 100.0);
        }
    }

    /// Advance the global turn counter and return the new turn id.
    /// Returns 0 when no session is active.
    pub fn increment_turn(&mut self) -> u64 {
        let Some(state) = self.state.as_mut() else {
            return 0;
        };
        state.total_turns += 1;
        state.total_turns
    }

    /// Set the current game phase.
    pub fn set_phase(&mut self, phase: Phase) {
        if let Some(state) = self.state.as_mut() {
            state.phase = phase;
        }
    }

    /// Point-in-time mapping of character to suspicion score.
    pub fn get_suspicion_snapshot(&self) -> HashMap<CharacterId, f64> {
        match &self.state {
            Some(state) => state
                .characters
                .iter()
                .map(|(&cid, cs)| (cid, cs.suspicion_score))
                .collect(),
            None => HashMap::new(),
        }
    }

    /// Human-readable descriptions of a character's known contradictions.
    pub fn contradiction_notes_for(&self, character_id: CharacterId) -> Vec<String> {
        self.character_state(character_id)
            .map(|cs| cs.contradictions.iter().map(|c| c.description.clone()).collect())
            .unwrap_or_default()
    }
}
