//! Claim extraction and contradiction detection.
//!
//! Turns raw NPC text into structured claims with simple pattern rules,
//! compares new claims against existing ones to flag contradictions, and
//! recomputes suspicion. Extraction is a best-effort heuristic, not a
//! parser: comparison is plain string equality, so "9pm" and "21:00" are
//! different times on purpose.

use crate::state::{
    Certainty, CharacterId, Claim, ConflictField, Contradiction, ContradictionKind, Severity,
    StateStore,
};
use crate::transcript::{SpeakerKind, TranscriptTurn};
use lazy_static::lazy_static;
use regex::Regex;

/// Maximum characters captured verbatim by the fallback claim.
const FALLBACK_ACTION_CHARS: usize = 100;

lazy_static! {
    /// Time-like substrings: `9:30`, `9 30`, `9pm`, `9 o'clock`.
    static ref TIME_PATTERN: Regex =
        Regex::new(r"(?i)\b(\d{1,2}[:\s]*\d{2}|\d{1,2}\s*(?:am|pm|o'?clock))\b")
            .expect("time pattern is valid");

    /// Location-like substrings: text after at/in/near up to a clause boundary.
    static ref LOCATION_PATTERN: Regex =
        Regex::new(r"(?i)(?:at|in|near)\s+([^.?!]+?)(?:[.,]|$)")
            .expect("location pattern is valid");
}

/// Mine structured claims from one NPC statement.
///
/// A time match and a location match each yield one claim; when neither
/// pattern fires, a single fallback claim captures the statement's first
/// 100 characters verbatim. Multiple claims per turn are normal.
pub fn extract_claims(raw_output: &str, character_id: CharacterId, turn_id: u64) -> Vec<Claim> {
    let mut claims = Vec::new();

    if let Some(caps) = TIME_PATTERN.captures(raw_output) {
        claims.push(Claim {
            subject: character_id.name().to_string(),
            action: "mentioned time".to_string(),
            time: Some(caps[1].trim().to_string()),
            location: None,
            certainty: Certainty::Stated,
            source: Some(character_id),
            turn_id,
        });
    }

    if let Some(caps) = LOCATION_PATTERN.captures(raw_output) {
        claims.push(Claim {
            subject: character_id.name().to_string(),
            action: "mentioned location".to_string(),
            time: None,
            location: Some(caps[1].trim().to_string()),
            certainty: Certainty::Stated,
            source: Some(character_id),
            turn_id,
        });
    }

    if claims.is_empty() {
        claims.push(Claim {
            subject: character_id.name().to_string(),
            action: raw_output.chars().take(FALLBACK_ACTION_CHARS).collect(),
            time: None,
            location: None,
            certainty: Certainty::Uncertain,
            source: Some(character_id),
            turn_id,
        });
    }

    claims
}

/// Consumes each new turn: extracts claims, flags contradictions against
/// the store's existing claims, and recomputes suspicion.
pub struct AnalysisEngine;

impl AnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Process one turn against the store. Returns the recorded claims so
    /// the caller can attach them to the persisted turn. No-op (empty
    /// batch) unless the turn is an NPC answer and a session is active.
    pub fn process_turn(&self, store: &mut StateStore, turn: &TranscriptTurn) -> Vec<Claim> {
        let Some(character_id) = turn.character_id else {
            return Vec::new();
        };
        if turn.speaker != SpeakerKind::Npc || store.state().is_none() {
            return Vec::new();
        }

        let claims = extract_claims(&turn.raw_output, character_id, turn.turn_id);
        let recorded = store.add_claims(character_id, claims, turn.turn_id);
        self.check_contradictions(store, character_id, &recorded);
        self.update_suspicion(store, character_id);
        recorded
    }

    /// Compare new claims against other characters' claims and the
    /// character's own prior claims. Both directions of an inter-character
    /// pair are checked independently over the session, so duplicate
    /// records can accumulate; they only serve as a risk signal.
    fn check_contradictions(
        &self,
        store: &mut StateStore,
        character_id: CharacterId,
        new_claims: &[Claim],
    ) {
        let Some(state) = store.state() else {
            return;
        };

        let mut found = Vec::new();

        for (&other_id, other_state) in &state.characters {
            if other_id == character_id {
                continue;
            }
            for nc in new_claims {
                for oc in &other_state.claims {
                    if let (Some(nt), Some(ot)) = (&nc.time, &oc.time) {
                        if nt != ot && nc.action == oc.action {
                            found.push(Contradiction {
                                kind: ContradictionKind::InterCharacter,
                                character_id,
                                other_character_id: Some(other_id),
                                field: ConflictField::Time,
                                description: format!(
                                    "{character_id} said {nt}, {other_id} said {ot}."
                                ),
                                severity: Severity::Medium,
                            });
                        }
                    }
                    if let (Some(nl), Some(ol)) = (&nc.location, &oc.location) {
                        if nl != ol {
                            found.push(Contradiction {
                                kind: ContradictionKind::InterCharacter,
                                character_id,
                                other_character_id: Some(other_id),
                                field: ConflictField::Location,
                                description: format!(
                                    "{character_id} said {nl}, {other_id} said {ol}."
                                ),
                                severity: Severity::Medium,
                            });
                        }
                    }
                }
            }
        }

        // Self check runs against claims recorded before this batch.
        if let Some(cs) = state.characters.get(&character_id) {
            let prior_end = cs.claims.len().saturating_sub(new_claims.len());
            let prior = &cs.claims[..prior_end];
            for nc in new_claims {
                for ec in prior {
                    if let (Some(nt), Some(et)) = (&nc.time, &ec.time) {
                        if nt != et {
                            found.push(Contradiction {
                                kind: ContradictionKind::SelfConflict,
                                character_id,
                                other_character_id: None,
                                field: ConflictField::Time,
                                description: format!("Previously said {et}, now said {nt}."),
                                severity: Severity::High,
                            });
                        }
                    }
                }
            }
        }

        for contradiction in found {
            store.add_contradiction(contradiction);
        }
    }

    /// Recompute suspicion from the full contradiction count:
    /// `min(100, current + 15 * contradictions + 10 if guilty)`.
    fn update_suspicion(&self, store: &mut StateStore, character_id: CharacterId) {
        let Some(state) = store.state() else {
            return;
        };
        let guilty = state.scenario.guilty_character_id == character_id;
        let Some(cs) = state.characters.get(&character_id) else {
            return;
        };

        let mut delta = cs.contradictions.len() as f64 * 15.0;
        if guilty {
            delta += 10.0;
        }
        let score = cs.suspicion_score + delta;
        store.set_suspicion(character_id, score);
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npc_turn(character_id: CharacterId, turn_id: u64, text: &str) -> TranscriptTurn {
        TranscriptTurn::npc_answer("s", turn_id, character_id, "where were you?", text)
    }

    fn session_with_seed(seed: u64) -> StateStore {
        let mut store = StateStore::new(Some(seed));
        store.initialize_session("s", 5);
        store
    }

    #[test]
    fn test_extract_time_claim() {
        let claims = extract_claims("I left around 9pm, I swear.", CharacterId::Crumbs, 1);
        let time_claim = claims.iter().find(|c| c.time.is_some()).unwrap();
        assert_eq!(time_claim.time.as_deref(), Some("9pm"));
        assert_eq!(time_claim.action, "mentioned time");
        assert_eq!(time_claim.certainty, Certainty::Stated);
    }

    #[test]
    fn test_extract_clock_time_claim() {
        let claims = extract_claims("We met at 21:30 sharp.", CharacterId::Cherry, 1);
        let time_claim = claims.iter().find(|c| c.time.is_some()).unwrap();
        assert_eq!(time_claim.time.as_deref(), Some("21:30"));
    }

    #[test]
    fn test_extract_location_claim() {
        let claims = extract_claims("I was in the kitchen.", CharacterId::Cherry, 1);
        let location_claim = claims.iter().find(|c| c.location.is_some()).unwrap();
        assert_eq!(location_claim.location.as_deref(), Some("the kitchen"));
        assert_eq!(location_claim.action, "mentioned location");
    }

    #[test]
    fn test_fallback_claim_truncates_to_100_chars() {
        let long = "x".repeat(250);
        let claims = extract_claims(&long, CharacterId::Glaze, 1);
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].action.chars().count(), 100);
        assert_eq!(claims[0].certainty, Certainty::Uncertain);
        assert!(claims[0].time.is_none());
        assert!(claims[0].location.is_none());
    }

    #[test]
    fn test_non_npc_turn_is_noop() {
        let mut store = session_with_seed(1);
        let engine = AnalysisEngine::new();

        let mut turn = npc_turn(CharacterId::Crumbs, 1, "I was in the vault.");
        turn.speaker = SpeakerKind::Player;

        assert!(engine.process_turn(&mut store, &turn).is_empty());
        assert!(store
            .character_state(CharacterId::Crumbs)
            .unwrap()
            .claims
            .is_empty());
    }

    #[test]
    fn test_no_session_is_noop() {
        let mut store = StateStore::new(Some(1));
        let engine = AnalysisEngine::new();
        let turn = npc_turn(CharacterId::Crumbs, 1, "I was in the vault.");
        assert!(engine.process_turn(&mut store, &turn).is_empty());
    }

    #[test]
    fn test_self_time_contradiction_exactly_one_high() {
        let mut store = session_with_seed(1);
        let engine = AnalysisEngine::new();

        engine.process_turn(&mut store, &npc_turn(CharacterId::Crumbs, 1, "I left at 9pm."));
        engine.process_turn(
            &mut store,
            &npc_turn(CharacterId::Crumbs, 2, "Fine, I left at 10pm."),
        );

        let cs = store.character_state(CharacterId::Crumbs).unwrap();
        let self_conflicts: Vec<_> = cs
            .contradictions
            .iter()
            .filter(|c| c.kind == ContradictionKind::SelfConflict)
            .collect();
        assert_eq!(self_conflicts.len(), 1);
        assert_eq!(self_conflicts[0].field, ConflictField::Time);
        assert_eq!(self_conflicts[0].severity, Severity::High);
    }

    #[test]
    fn test_inter_character_location_contradiction() {
        let mut store = session_with_seed(1);
        let engine = AnalysisEngine::new();

        engine.process_turn(
            &mut store,
            &npc_turn(CharacterId::Crumbs, 1, "I stood near the vault all evening"),
        );
        engine.process_turn(
            &mut store,
            &npc_turn(CharacterId::Cherry, 2, "Crumbs was in the kitchen with me"),
        );

        // The second speaker's new claim conflicts with the first's.
        let cherry = store.character_state(CharacterId::Cherry).unwrap();
        let conflicts: Vec<_> = cherry
            .contradictions
            .iter()
            .filter(|c| {
                c.kind == ContradictionKind::InterCharacter && c.field == ConflictField::Location
            })
            .collect();
        assert!(!conflicts.is_empty());
        assert_eq!(conflicts[0].other_character_id, Some(CharacterId::Crumbs));
        assert_eq!(conflicts[0].severity, Severity::Medium);
    }

    #[test]
    fn test_suspicion_formula_exact() {
        let mut store = session_with_seed(1);
        let engine = AnalysisEngine::new();
        let guilty = store.guilty_character_id().unwrap();

        engine.process_turn(&mut store, &npc_turn(CharacterId::Crumbs, 1, "I left at 9pm."));
        engine.process_turn(
            &mut store,
            &npc_turn(CharacterId::Crumbs, 2, "Fine, I left at 10pm."),
        );

        let cs = store.character_state(CharacterId::Crumbs).unwrap();
        let count = cs.contradictions.len() as f64;
        let guilt_bonus = if guilty == CharacterId::Crumbs { 10.0 } else { 0.0 };

        // First turn: no contradictions, delta = guilt bonus only.
        // Second turn: delta = 15 * total contradictions + guilt bonus.
        let expected = (guilt_bonus + 15.0 * count + guilt_bonus).min(100.0);
        assert_eq!(cs.suspicion_score, expected);
    }

    #[test]
    fn test_suspicion_clamped_at_100() {
        let mut store = session_with_seed(1);
        let engine = AnalysisEngine::new();

        // Many flip-flopping time statements pile up self contradictions.
        for (i, time) in ["1pm", "2pm", "3pm", "4pm", "5pm", "6pm"].iter().enumerate() {
            engine.process_turn(
                &mut store,
                &npc_turn(CharacterId::Glaze, i as u64 + 1, &format!("I left at {time}.")),
            );
        }

        let cs = store.character_state(CharacterId::Glaze).unwrap();
        assert_eq!(cs.suspicion_score, 100.0);
    }

    #[test]
    fn test_suspicion_monotone_within_session() {
        let mut store = session_with_seed(1);
        let engine = AnalysisEngine::new();

        let mut previous = 0.0;
        for (i, text) in ["I left at 9pm.", "I left at 10pm.", "nothing to add"]
            .iter()
            .enumerate()
        {
            engine.process_turn(&mut store, &npc_turn(CharacterId::Cherry, i as u64 + 1, text));
            let score = store
                .character_state(CharacterId::Cherry)
                .unwrap()
                .suspicion_score;
            assert!(score >= previous);
            previous = score;
        }
    }
}
