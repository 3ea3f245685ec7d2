//! Beat-map object model.
//!
//! Every editable object in a map lives on a shared time axis measured in
//! beats. This module defines the per-kind data structs, the `TimedObject`
//! union over them, and the `ObjectId` identity used to correlate check
//! results with live editor objects.

use serde::Serialize;

/// Open-ended custom data payload attached to most object kinds.
///
/// String-keyed, values are primitives or nested maps. Stored as JSON so it
/// round-trips through both map files and script values without a schema.
pub type CustomData = serde_json::Map<String, serde_json::Value>;

/// Stable identity for a timed object, usable as a map key.
///
/// Allocated by the [`LiveCollection`](crate::collection::LiveCollection);
/// survives despawn/respawn cycles so check results stay valid while a
/// script shuffles objects around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(pub u64);

/// Discriminant for the eight object categories a check can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Note,
    Bomb,
    Arc,
    Chain,
    Wall,
    Event,
    CustomEvent,
    BpmEvent,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 8] = [
        ObjectKind::Note,
        ObjectKind::Bomb,
        ObjectKind::Arc,
        ObjectKind::Chain,
        ObjectKind::Wall,
        ObjectKind::Event,
        ObjectKind::CustomEvent,
        ObjectKind::BpmEvent,
    ];
}

/// A colour note. `color` doubles as the type discriminator that separates
/// notes from bombs in the v2 storage format (0 = red, 1 = blue, 3 = bomb).
#[derive(Debug, Clone, PartialEq)]
pub struct NoteData {
    pub beat: f32,
    pub x: i32,
    pub y: i32,
    pub color: i32,
    pub cut_direction: i32,
    pub custom_data: CustomData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BombData {
    pub beat: f32,
    pub x: i32,
    pub y: i32,
    pub custom_data: CustomData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArcData {
    pub beat: f32,
    pub x: i32,
    pub y: i32,
    pub tail_beat: f32,
    pub tail_x: i32,
    pub tail_y: i32,
    pub custom_data: CustomData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainData {
    pub beat: f32,
    pub x: i32,
    pub y: i32,
    pub tail_beat: f32,
    pub tail_x: i32,
    pub tail_y: i32,
    pub slice_count: i32,
    pub custom_data: CustomData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WallData {
    pub beat: f32,
    pub duration: f32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub custom_data: CustomData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    pub beat: f32,
    pub event_type: i32,
    pub value: i32,
    pub float_value: f32,
    pub custom_data: CustomData,
}

/// A named custom event with an arbitrary typed data block.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEventData {
    pub beat: f32,
    pub name: String,
    pub data: CustomData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BpmEventData {
    pub beat: f32,
    pub bpm: f32,
}

/// Union over every object category on the time axis.
#[derive(Debug, Clone, PartialEq)]
pub enum TimedObject {
    Note(NoteData),
    Bomb(BombData),
    Arc(ArcData),
    Chain(ChainData),
    Wall(WallData),
    Event(EventData),
    CustomEvent(CustomEventData),
    BpmEvent(BpmEventData),
}

impl TimedObject {
    /// Time position in beats.
    pub fn beat(&self) -> f32 {
        match self {
            TimedObject::Note(n) => n.beat,
            TimedObject::Bomb(b) => b.beat,
            TimedObject::Arc(a) => a.beat,
            TimedObject::Chain(c) => c.beat,
            TimedObject::Wall(w) => w.beat,
            TimedObject::Event(e) => e.beat,
            TimedObject::CustomEvent(c) => c.beat,
            TimedObject::BpmEvent(b) => b.beat,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            TimedObject::Note(_) => ObjectKind::Note,
            TimedObject::Bomb(_) => ObjectKind::Bomb,
            TimedObject::Arc(_) => ObjectKind::Arc,
            TimedObject::Chain(_) => ObjectKind::Chain,
            TimedObject::Wall(_) => ObjectKind::Wall,
            TimedObject::Event(_) => ObjectKind::Event,
            TimedObject::CustomEvent(_) => ObjectKind::CustomEvent,
            TimedObject::BpmEvent(_) => ObjectKind::BpmEvent,
        }
    }

    /// Custom data payload, if this kind carries one.
    pub fn custom_data(&self) -> Option<&CustomData> {
        match self {
            TimedObject::Note(n) => Some(&n.custom_data),
            TimedObject::Bomb(b) => Some(&b.custom_data),
            TimedObject::Arc(a) => Some(&a.custom_data),
            TimedObject::Chain(c) => Some(&c.custom_data),
            TimedObject::Wall(w) => Some(&w.custom_data),
            TimedObject::Event(e) => Some(&e.custom_data),
            TimedObject::CustomEvent(c) => Some(&c.data),
            TimedObject::BpmEvent(_) => None,
        }
    }
}

/// Map format generation. V2 maps have no arcs or chains; checks still
/// receive those sequences, just empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatmapVersion {
    V2,
    V3,
}

impl BeatmapVersion {
    /// Whether this format generation stores arcs and chains.
    pub fn supports(&self, kind: ObjectKind) -> bool {
        match kind {
            ObjectKind::Arc | ObjectKind::Chain => matches!(self, BeatmapVersion::V3),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(beat: f32) -> TimedObject {
        TimedObject::Note(NoteData {
            beat,
            x: 0,
            y: 0,
            color: 0,
            cut_direction: 1,
            custom_data: CustomData::new(),
        })
    }

    #[test]
    fn test_beat_accessor() {
        assert_eq!(note(2.5).beat(), 2.5);
        let wall = TimedObject::Wall(WallData {
            beat: 4.0,
            duration: 1.0,
            x: 0,
            y: 0,
            width: 1,
            height: 5,
            custom_data: CustomData::new(),
        });
        assert_eq!(wall.beat(), 4.0);
        assert_eq!(wall.kind(), ObjectKind::Wall);
    }

    #[test]
    fn test_version_support() {
        assert!(!BeatmapVersion::V2.supports(ObjectKind::Arc));
        assert!(!BeatmapVersion::V2.supports(ObjectKind::Chain));
        assert!(BeatmapVersion::V2.supports(ObjectKind::Note));
        assert!(BeatmapVersion::V3.supports(ObjectKind::Chain));
    }

    #[test]
    fn test_bpm_event_has_no_custom_data() {
        let bpm = TimedObject::BpmEvent(BpmEventData { beat: 0.0, bpm: 128.0 });
        assert!(bpm.custom_data().is_none());
        assert!(note(0.0).custom_data().is_some());
    }
}
