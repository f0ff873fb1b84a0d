//! The closed set of mutation primitives, their payloads, and structural
//! validation.
//!
//! The source this was distilled from treats an operation's payload as an
//! open `any` bag; here it becomes [`OperationPayload`], a tagged sum with
//! one struct variant per [`OperationKind`], so the transform matrix can be a
//! dense 2-D table indexed by variant discriminants instead of a dynamic
//! dispatch over untyped data (see [`crate::transform`]).

use cardsync_utils::Errors;
use serde::{Deserialize, Serialize};

use crate::clock::{ClientId, VectorClock};

/// The zones a card (or the implicit "nowhere") can occupy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Hand,
    Battlefield,
    Graveyard,
    Library,
    Exile,
    Command,
    Sideboard,
}

/// A board position. `z_index` is an optional stacking-order hint.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z_index: Option<i64>,
}
impl Position {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

pub type CardId = String;
pub type PlayerId = String;

/// The entity a tombstone or a payload refers to.
///
/// Not named in the source spec, which just speaks of "the referenced
/// entity"; introduced here because tombstones are keyed by a single
/// `entityId` and a payload may identify either a card or a player.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Card(CardId),
    Player(PlayerId),
}

/// The discriminant of an [`OperationPayload`], used to index the transform
/// matrix. Kept as a standalone enum (rather than derived ad hoc from
/// `payload`) so it can be used as a plain `Copy` array index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    MoveCard,
    TapCard,
    DrawCard,
    PlayCard,
    UpdateLife,
    AddCounter,
    ChangePhase,
    EndTurn,
}
impl OperationKind {
    pub const ALL: [OperationKind; 8] = [
        OperationKind::MoveCard,
        OperationKind::TapCard,
        OperationKind::DrawCard,
        OperationKind::PlayCard,
        OperationKind::UpdateLife,
        OperationKind::AddCounter,
        OperationKind::ChangePhase,
        OperationKind::EndTurn,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveCardPayload {
    pub card_id: CardId,
    pub from: Zone,
    pub to: Zone,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TapCardPayload {
    pub card_id: CardId,
    pub tapped: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawCardPayload {
    pub player_id: PlayerId,
    pub card_id: Option<CardId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayCardPayload {
    pub card_id: CardId,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateLifePayload {
    pub player_id: PlayerId,
    pub delta: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddCounterPayload {
    pub card_id: CardId,
    pub counter_type: String,
    pub amount: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangePhasePayload {
    pub from_phase: String,
    pub to_phase: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EndTurnPayload {
    pub current_player_id: PlayerId,
    pub next_player_id: PlayerId,
}

/// The closed set of mutation payloads, one struct-variant per
/// [`OperationKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum OperationPayload {
    MoveCard(MoveCardPayload),
    TapCard(TapCardPayload),
    DrawCard(DrawCardPayload),
    PlayCard(PlayCardPayload),
    UpdateLife(UpdateLifePayload),
    AddCounter(AddCounterPayload),
    ChangePhase(ChangePhasePayload),
    EndTurn(EndTurnPayload),
}
impl OperationPayload {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationPayload::MoveCard(_) => OperationKind::MoveCard,
            OperationPayload::TapCard(_) => OperationKind::TapCard,
            OperationPayload::DrawCard(_) => OperationKind::DrawCard,
            OperationPayload::PlayCard(_) => OperationKind::PlayCard,
            OperationPayload::UpdateLife(_) => OperationKind::UpdateLife,
            OperationPayload::AddCounter(_) => OperationKind::AddCounter,
            OperationPayload::ChangePhase(_) => OperationKind::ChangePhase,
            OperationPayload::EndTurn(_) => OperationKind::EndTurn,
        }
    }

    /// The entity this payload's mutation targets, if any. `ChangePhase` and
    /// `EndTurn` are global (board-wide) and reference no single entity.
    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            OperationPayload::MoveCard(p) => Some(EntityId::Card(p.card_id.clone())),
            OperationPayload::TapCard(p) => Some(EntityId::Card(p.card_id.clone())),
            OperationPayload::DrawCard(p) => Some(EntityId::Player(p.player_id.clone())),
            OperationPayload::PlayCard(p) => Some(EntityId::Card(p.card_id.clone())),
            OperationPayload::UpdateLife(p) => Some(EntityId::Player(p.player_id.clone())),
            OperationPayload::AddCounter(p) => Some(EntityId::Card(p.card_id.clone())),
            OperationPayload::ChangePhase(_) => None,
            OperationPayload::EndTurn(_) => None,
        }
    }

    fn is_structurally_valid(&self) -> bool {
        match self {
            OperationPayload::MoveCard(p) => !p.card_id.is_empty(),
            OperationPayload::TapCard(p) => !p.card_id.is_empty(),
            OperationPayload::DrawCard(p) => {
                !p.player_id.is_empty() && p.card_id.as_ref().is_none_or(|id| !id.is_empty())
            }
            OperationPayload::PlayCard(p) => !p.card_id.is_empty() && p.position.is_finite(),
            OperationPayload::UpdateLife(p) => !p.player_id.is_empty(),
            OperationPayload::AddCounter(p) => !p.card_id.is_empty() && !p.counter_type.is_empty(),
            OperationPayload::ChangePhase(p) => {
                !p.from_phase.is_empty() && !p.to_phase.is_empty()
            }
            OperationPayload::EndTurn(p) => {
                !p.current_player_id.is_empty() && !p.next_player_id.is_empty()
            }
        }
    }

    /// Every structural reason this payload would fail [`is_structurally_valid`],
    /// for diagnostics. `validate` itself stays a plain bool per the source
    /// spec; this exists only so a rejection can be logged with detail
    /// instead of a single opaque "invalid".
    fn structural_errors(&self) -> Vec<&'static str> {
        let mut errors = Vec::new();
        match self {
            OperationPayload::MoveCard(p) => {
                if p.card_id.is_empty() {
                    errors.push("card_id is empty");
                }
            }
            OperationPayload::TapCard(p) => {
                if p.card_id.is_empty() {
                    errors.push("card_id is empty");
                }
            }
            OperationPayload::DrawCard(p) => {
                if p.player_id.is_empty() {
                    errors.push("player_id is empty");
                }
                if p.card_id.as_ref().is_some_and(|id| id.is_empty()) {
                    errors.push("card_id is present but empty");
                }
            }
            OperationPayload::PlayCard(p) => {
                if p.card_id.is_empty() {
                    errors.push("card_id is empty");
                }
                if !p.position.is_finite() {
                    errors.push("position is not finite");
                }
            }
            OperationPayload::UpdateLife(p) => {
                if p.player_id.is_empty() {
                    errors.push("player_id is empty");
                }
            }
            OperationPayload::AddCounter(p) => {
                if p.card_id.is_empty() {
                    errors.push("card_id is empty");
                }
                if p.counter_type.is_empty() {
                    errors.push("counter_type is empty");
                }
            }
            OperationPayload::ChangePhase(p) => {
                if p.from_phase.is_empty() {
                    errors.push("from_phase is empty");
                }
                if p.to_phase.is_empty() {
                    errors.push("to_phase is empty");
                }
            }
            OperationPayload::EndTurn(p) => {
                if p.current_player_id.is_empty() {
                    errors.push("current_player_id is empty");
                }
                if p.next_player_id.is_empty() {
                    errors.push("next_player_id is empty");
                }
            }
        }
        errors
    }
}

/// `(clientId, timestamp, kind)` — an operation's deduplication identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationId {
    pub client_id: ClientId,
    pub timestamp_ms: u64,
    pub kind: OperationKind,
}

/// An immutable record describing one intended mutation, tagged with the
/// vector clock the originating replica held just before emitting it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub client_id: ClientId,
    pub timestamp_ms: u64,
    pub version: VectorClock,
    pub payload: OperationPayload,
}
impl Operation {
    pub fn new(
        client_id: ClientId,
        timestamp_ms: u64,
        version: VectorClock,
        payload: OperationPayload,
    ) -> Self {
        Self {
            client_id,
            timestamp_ms,
            version,
            payload,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.payload.kind()
    }

    pub fn id(&self) -> OperationId {
        OperationId {
            client_id: self.client_id.clone(),
            timestamp_ms: self.timestamp_ms,
            kind: self.kind(),
        }
    }

    pub fn entity_id(&self) -> Option<EntityId> {
        self.payload.entity_id()
    }
}

/// Purely structural validation: known kind (guaranteed by the type once the
/// payload parsed into [`OperationPayload`]), non-empty ids, finite
/// coordinates. Never inspects `version` against any replica's own state.
pub fn validate(op: &Operation) -> bool {
    !op.client_id.as_str().is_empty() && op.payload.is_structurally_valid()
}

/// The accumulated reasons `op` fails [`validate`], or `None` if it passes.
/// Used only to enrich the `tracing` span an engine emits on rejection;
/// `apply`'s accept/reject decision is always driven by the plain bool.
pub fn validation_errors(op: &Operation) -> Option<Errors<&'static str>> {
    let mut errors: Vec<&'static str> = op.payload.structural_errors();
    if op.client_id.as_str().is_empty() {
        errors.push("client_id is empty");
    }
    let mut iter = errors.into_iter();
    let first = iter.next()?;
    let mut accumulated = Errors::Single(first);
    for rest in iter {
        accumulated.push(rest);
    }
    Some(accumulated)
}

/// Two operations affect the same entity when their payloads carry a
/// matching `card_id` or matching `player_id`.
pub fn affects_same_entity(a: &Operation, b: &Operation) -> bool {
    match (a.entity_id(), b.entity_id()) {
        (Some(ea), Some(eb)) => ea == eb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn move_op(client: &str, card: &str, from: Zone, to: Zone) -> Operation {
        Operation::new(
            ClientId::from(client),
            1000,
            VectorClock::new(),
            OperationPayload::MoveCard(MoveCardPayload {
                card_id: card.to_owned(),
                from,
                to,
            }),
        )
    }

    #[test]
    fn validation_errors_accumulates_every_reason() {
        let op = move_op("", "", Zone::Hand, Zone::Battlefield);
        let errors = validation_errors(&op).expect("both ids are empty");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn validation_errors_is_none_for_a_valid_operation() {
        let op = move_op("c1", "card1", Zone::Hand, Zone::Battlefield);
        assert!(validation_errors(&op).is_none());
    }

    #[test]
    fn validate_rejects_empty_ids() {
        let op = move_op("", "card1", Zone::Hand, Zone::Battlefield);
        assert!(!validate(&op));
    }

    #[test]
    fn validate_rejects_non_finite_position() {
        let mut op = move_op("c1", "card1", Zone::Hand, Zone::Battlefield);
        op.payload = OperationPayload::PlayCard(PlayCardPayload {
            card_id: "card1".to_owned(),
            position: Position {
                x: f64::NAN,
                y: 0.0,
                z_index: None,
            },
        });
        assert!(!validate(&op));
    }

    #[test]
    fn validate_accepts_well_formed_operation() {
        let op = move_op("c1", "card1", Zone::Hand, Zone::Battlefield);
        assert!(validate(&op));
    }

    #[test]
    fn affects_same_entity_matches_on_card_id() {
        let a = move_op("c1", "card1", Zone::Hand, Zone::Battlefield);
        let b = move_op("c2", "card1", Zone::Hand, Zone::Graveyard);
        assert!(affects_same_entity(&a, &b));
    }

    #[test]
    fn affects_same_entity_false_for_different_cards() {
        let a = move_op("c1", "card1", Zone::Hand, Zone::Battlefield);
        let b = move_op("c2", "card2", Zone::Hand, Zone::Graveyard);
        assert!(!affects_same_entity(&a, &b));
    }

    #[test]
    fn affects_same_entity_false_when_one_side_is_global() {
        let a = move_op("c1", "card1", Zone::Hand, Zone::Battlefield);
        let b = Operation::new(
            ClientId::from("c2"),
            1000,
            VectorClock::new(),
            OperationPayload::ChangePhase(ChangePhasePayload {
                from_phase: "main".to_owned(),
                to_phase: "combat".to_owned(),
            }),
        );
        assert!(!affects_same_entity(&a, &b));
    }

    #[test]
    fn operation_id_is_the_dedup_key() {
        let a = move_op("c1", "card1", Zone::Hand, Zone::Battlefield);
        let b = move_op("c1", "card1", Zone::Hand, Zone::Graveyard);
        // Same client/timestamp/kind, different payload detail: identity is equal.
        assert_eq!(a.id(), b.id());
    }
}
