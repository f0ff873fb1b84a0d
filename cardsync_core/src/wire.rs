//! The JSON frame contracts exchanged with the transport layer (§6).
//!
//! The core has no socket of its own: the host serializes an
//! [`OperationFrame`] after a successful `apply`, and deserializes one on
//! inbound delivery before calling [`crate::engine::OTEngine::transform`]/
//! [`crate::engine::OTEngine::apply`]. Field names are part of the wire
//! contract and must not be renamed without a version bump at the host.

use serde::{Deserialize, Serialize};

use crate::clock::{ClientId, VectorClock};
use crate::model::{Operation, OperationPayload};

/// `{type, clientId, timestamp, version, data}` — the outbound/inbound shape
/// of one operation. `type` carries the kind tag (`MOVE_CARD`, `TAP_CARD`, …)
/// rather than reusing `OperationPayload`'s own `kind` tag, because the wire
/// contract's tag names are SCREAMING_SNAKE_CASE while the in-process payload
/// tag is the Rust variant name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationFrame {
    #[serde(rename = "MOVE_CARD")]
    MoveCard(OperationFrameBody),
    #[serde(rename = "TAP_CARD")]
    TapCard(OperationFrameBody),
    #[serde(rename = "DRAW_CARD")]
    DrawCard(OperationFrameBody),
    #[serde(rename = "PLAY_CARD")]
    PlayCard(OperationFrameBody),
    #[serde(rename = "UPDATE_LIFE")]
    UpdateLife(OperationFrameBody),
    #[serde(rename = "ADD_COUNTER")]
    AddCounter(OperationFrameBody),
    #[serde(rename = "CHANGE_PHASE")]
    ChangePhase(OperationFrameBody),
    #[serde(rename = "END_TURN")]
    EndTurn(OperationFrameBody),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationFrameBody {
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
    pub timestamp: u64,
    pub version: VectorClock,
    pub data: OperationPayload,
}

impl From<&Operation> for OperationFrame {
    fn from(op: &Operation) -> Self {
        let body = OperationFrameBody {
            client_id: op.client_id.clone(),
            timestamp: op.timestamp_ms,
            version: op.version.clone(),
            data: op.payload.clone(),
        };
        match &op.payload {
            OperationPayload::MoveCard(_) => OperationFrame::MoveCard(body),
            OperationPayload::TapCard(_) => OperationFrame::TapCard(body),
            OperationPayload::DrawCard(_) => OperationFrame::DrawCard(body),
            OperationPayload::PlayCard(_) => OperationFrame::PlayCard(body),
            OperationPayload::UpdateLife(_) => OperationFrame::UpdateLife(body),
            OperationPayload::AddCounter(_) => OperationFrame::AddCounter(body),
            OperationPayload::ChangePhase(_) => OperationFrame::ChangePhase(body),
            OperationPayload::EndTurn(_) => OperationFrame::EndTurn(body),
        }
    }
}

impl From<OperationFrame> for Operation {
    fn from(frame: OperationFrame) -> Self {
        let body = match frame {
            OperationFrame::MoveCard(b)
            | OperationFrame::TapCard(b)
            | OperationFrame::DrawCard(b)
            | OperationFrame::PlayCard(b)
            | OperationFrame::UpdateLife(b)
            | OperationFrame::AddCounter(b)
            | OperationFrame::ChangePhase(b)
            | OperationFrame::EndTurn(b) => b,
        };
        Operation::new(body.client_id, body.timestamp, body.version, body.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MoveCardPayload, Zone};

    fn sample_move() -> Operation {
        Operation::new(
            ClientId::from("c1"),
            1000,
            VectorClock::new(),
            OperationPayload::MoveCard(MoveCardPayload {
                card_id: "card1".to_owned(),
                from: Zone::Hand,
                to: Zone::Battlefield,
            }),
        )
    }

    #[test]
    fn round_trips_through_the_wire_frame() {
        let op = sample_move();
        let frame = OperationFrame::from(&op);
        let restored = Operation::from(frame);
        assert_eq!(op, restored);
    }

    #[test]
    fn frame_tag_is_screaming_snake_case() {
        let op = sample_move();
        let frame = OperationFrame::from(&op);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "MOVE_CARD");
        assert_eq!(json["clientId"], "c1");
        assert_eq!(json["timestamp"], 1000);
    }
}
