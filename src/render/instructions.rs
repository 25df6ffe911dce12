// Draw instructions - Per-tick commands handed to the map renderer
// Serialized as JSON objects tagged by `kind`

use serde::{Deserialize, Serialize};

use crate::tracks::GeoPoint;

/// One drawing command for a single storm track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawInstruction {
    /// First observed position of a storm
    NewTrack { id: String, initial_point: GeoPoint },

    /// Segment from the previous position to the new one
    UpdateTrack {
        id: String,
        from_point: GeoPoint,
        to_point: GeoPoint,
        /// Normalized intensity in [0, 1], used as the colormap index
        color_scalar: f64,
        line_width: f64,
    },

    /// Set the opacity of an ended storm's track
    FadeTrack { id: String, alpha: f64 },

    /// Erase a storm's track entirely
    ClearTrack { id: String },
}

impl DrawInstruction {
    /// Identifier of the storm this instruction applies to
    pub fn id(&self) -> &str {
        match self {
            DrawInstruction::NewTrack { id, .. }
            | DrawInstruction::UpdateTrack { id, .. }
            | DrawInstruction::FadeTrack { id, .. }
            | DrawInstruction::ClearTrack { id } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DrawInstruction::NewTrack { .. } => "NEW_TRACK",
            DrawInstruction::UpdateTrack { .. } => "UPDATE_TRACK",
            DrawInstruction::FadeTrack { .. } => "FADE_TRACK",
            DrawInstruction::ClearTrack { .. } => "CLEAR_TRACK",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_serializes_with_kind_tag() {
        let instruction = DrawInstruction::FadeTrack {
            id: "AL122005".to_string(),
            alpha: 0.5,
        };
        let json = serde_json::to_value(&instruction).unwrap();
        assert_eq!(json["kind"], "FADE_TRACK");
        assert_eq!(json["id"], "AL122005");
        assert_eq!(json["alpha"], 0.5);
        assert_eq!(instruction.kind(), "FADE_TRACK");
    }

    #[test]
    fn test_update_track_fields() {
        let instruction = DrawInstruction::UpdateTrack {
            id: "AL01".to_string(),
            from_point: GeoPoint { latitude: 25.0, longitude: -80.0 },
            to_point: GeoPoint { latitude: 25.5, longitude: -80.5 },
            color_scalar: 0.25,
            line_width: 9.0,
        };
        let json = serde_json::to_value(&instruction).unwrap();
        assert_eq!(json["kind"], "UPDATE_TRACK");
        assert_eq!(json["to_point"]["latitude"], 25.5);
        assert_eq!(instruction.id(), "AL01");
    }
}
