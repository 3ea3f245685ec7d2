//! Beatmap file input.
//!
//! Loads a difficulty file into the live collection so checks can run
//! outside the editor. Two format generations are supported: v3 files
//! carry a `version` field and short key names, v2 files carry `_version`
//! and underscore-prefixed keys. Unknown fields are ignored and missing
//! arrays treated as empty.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::beatmap::{
    ArcData, BeatmapVersion, BombData, BpmEventData, ChainData, CustomData, CustomEventData,
    EventData, NoteData, TimedObject, WallData,
};
use crate::collection::{LiveCollection, SharedCollection};

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} has neither a `version` nor a `_version` field", path.display())]
    UnknownVersion { path: PathBuf },
}

fn f(obj: &Value, key: &str) -> f32 {
    obj.get(key).and_then(Value::as_f64).unwrap_or(0.0) as f32
}

fn i(obj: &Value, key: &str) -> i32 {
    obj.get(key).and_then(Value::as_i64).unwrap_or(0) as i32
}

fn s(obj: &Value, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn custom(obj: &Value, key: &str) -> CustomData {
    obj.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn array<'a>(doc: &'a Value, path: &[&str]) -> &'a [Value] {
    let mut node = doc;
    for key in path {
        match node.get(key) {
            Some(next) => node = next,
            None => return &[],
        }
    }
    node.as_array().map(Vec::as_slice).unwrap_or(&[])
}

pub fn detect_version(doc: &Value) -> Option<BeatmapVersion> {
    if doc.get("version").and_then(Value::as_str).is_some() {
        Some(BeatmapVersion::V3)
    } else if doc.get("_version").and_then(Value::as_str).is_some() {
        Some(BeatmapVersion::V2)
    } else {
        None
    }
}

/// Parse a difficulty document into the collection. The caller has already
/// determined the version via [`detect_version`].
pub fn parse_into(doc: &Value, version: BeatmapVersion, collection: &mut LiveCollection) {
    match version {
        BeatmapVersion::V3 => parse_v3(doc, collection),
        BeatmapVersion::V2 => parse_v2(doc, collection),
    }
}

fn parse_v3(doc: &Value, collection: &mut LiveCollection) {
    for note in array(doc, &["colorNotes"]) {
        collection.load(TimedObject::Note(NoteData {
            beat: f(note, "b"),
            x: i(note, "x"),
            y: i(note, "y"),
            color: i(note, "c"),
            cut_direction: i(note, "d"),
            custom_data: custom(note, "customData"),
        }));
    }
    for bomb in array(doc, &["bombNotes"]) {
        collection.load(TimedObject::Bomb(BombData {
            beat: f(bomb, "b"),
            x: i(bomb, "x"),
            y: i(bomb, "y"),
            custom_data: custom(bomb, "customData"),
        }));
    }
    for arc in array(doc, &["sliders"]) {
        collection.load(TimedObject::Arc(ArcData {
            beat: f(arc, "b"),
            x: i(arc, "x"),
            y: i(arc, "y"),
            tail_beat: f(arc, "tb"),
            tail_x: i(arc, "tx"),
            tail_y: i(arc, "ty"),
            custom_data: custom(arc, "customData"),
        }));
    }
    for chain in array(doc, &["burstSliders"]) {
        collection.load(TimedObject::Chain(ChainData {
            beat: f(chain, "b"),
            x: i(chain, "x"),
            y: i(chain, "y"),
            tail_beat: f(chain, "tb"),
            tail_x: i(chain, "tx"),
            tail_y: i(chain, "ty"),
            slice_count: i(chain, "sc"),
            custom_data: custom(chain, "customData"),
        }));
    }
    for wall in array(doc, &["obstacles"]) {
        collection.load(TimedObject::Wall(WallData {
            beat: f(wall, "b"),
            duration: f(wall, "d"),
            x: i(wall, "x"),
            y: i(wall, "y"),
            width: i(wall, "w"),
            height: i(wall, "h"),
            custom_data: custom(wall, "customData"),
        }));
    }
    for event in array(doc, &["basicBeatmapEvents"]) {
        collection.load(TimedObject::Event(EventData {
            beat: f(event, "b"),
            event_type: i(event, "et"),
            value: i(event, "i"),
            float_value: f(event, "f"),
            custom_data: custom(event, "customData"),
        }));
    }
    for bpm in array(doc, &["bpmEvents"]) {
        collection.load(TimedObject::BpmEvent(BpmEventData {
            beat: f(bpm, "b"),
            bpm: f(bpm, "m"),
        }));
    }
    for custom_event in array(doc, &["customData", "customEvents"]) {
        collection.load(TimedObject::CustomEvent(CustomEventData {
            beat: f(custom_event, "b"),
            name: s(custom_event, "t"),
            data: custom(custom_event, "d"),
        }));
    }
}

fn parse_v2(doc: &Value, collection: &mut LiveCollection) {
    for note in array(doc, &["_notes"]) {
        let note_type = i(note, "_type");
        if note_type == 3 {
            collection.load(TimedObject::Bomb(BombData {
                beat: f(note, "_time"),
                x: i(note, "_lineIndex"),
                y: i(note, "_lineLayer"),
                custom_data: custom(note, "_customData"),
            }));
        } else {
            collection.load(TimedObject::Note(NoteData {
                beat: f(note, "_time"),
                x: i(note, "_lineIndex"),
                y: i(note, "_lineLayer"),
                color: note_type,
                cut_direction: i(note, "_cutDirection"),
                custom_data: custom(note, "_customData"),
            }));
        }
    }
    for wall in array(doc, &["_obstacles"]) {
        // Type 0 is a full-height wall, type 1 a crouch wall.
        let (y, height) = if i(wall, "_type") == 1 { (2, 3) } else { (0, 5) };
        collection.load(TimedObject::Wall(WallData {
            beat: f(wall, "_time"),
            duration: f(wall, "_duration"),
            x: i(wall, "_lineIndex"),
            y,
            width: i(wall, "_width"),
            height,
            custom_data: custom(wall, "_customData"),
        }));
    }
    for event in array(doc, &["_events"]) {
        collection.load(TimedObject::Event(EventData {
            beat: f(event, "_time"),
            event_type: i(event, "_type"),
            value: i(event, "_value"),
            float_value: f(event, "_floatValue"),
            custom_data: custom(event, "_customData"),
        }));
    }
    for custom_event in array(doc, &["_customData", "_customEvents"]) {
        collection.load(TimedObject::CustomEvent(CustomEventData {
            beat: f(custom_event, "_time"),
            name: s(custom_event, "_type"),
            data: custom(custom_event, "_data"),
        }));
    }
    for bpm in array(doc, &["_customData", "_BPMChanges"]) {
        collection.load(TimedObject::BpmEvent(BpmEventData {
            beat: f(bpm, "_time"),
            bpm: f(bpm, "_BPM"),
        }));
    }
}

/// Read, version-detect, and parse a difficulty file into a fresh shared
/// collection.
pub fn load_file(path: &Path) -> Result<(BeatmapVersion, SharedCollection), MapLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| MapLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Value = serde_json::from_str(&contents).map_err(|source| MapLoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let version = detect_version(&doc).ok_or_else(|| MapLoadError::UnknownVersion {
        path: path.to_path_buf(),
    })?;

    let collection = LiveCollection::new_shared();
    parse_into(&doc, version, &mut collection.borrow_mut());
    Ok((version, collection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::ObjectKind;

    #[test]
    fn test_detect_versions() {
        let v3: Value = serde_json::json!({ "version": "3.2.0" });
        let v2: Value = serde_json::json!({ "_version": "2.6.0" });
        let bad: Value = serde_json::json!({ "something": 1 });
        assert_eq!(detect_version(&v3), Some(BeatmapVersion::V3));
        assert_eq!(detect_version(&v2), Some(BeatmapVersion::V2));
        assert_eq!(detect_version(&bad), None);
    }

    #[test]
    fn test_parse_v3_categories() {
        let doc: Value = serde_json::json!({
            "version": "3.2.0",
            "colorNotes": [{ "b": 1.0, "x": 1, "y": 0, "c": 0, "d": 1 }],
            "bombNotes": [{ "b": 2.0, "x": 2, "y": 1 }],
            "sliders": [{ "b": 1.0, "x": 0, "y": 0, "tb": 2.0, "tx": 3, "ty": 2 }],
            "burstSliders": [{ "b": 3.0, "x": 1, "y": 0, "tb": 3.5, "tx": 2, "ty": 0, "sc": 4 }],
            "obstacles": [{ "b": 0.5, "d": 2.0, "x": 0, "y": 0, "w": 1, "h": 5 }],
            "basicBeatmapEvents": [{ "b": 0.0, "et": 1, "i": 3, "f": 1.0 }],
            "bpmEvents": [{ "b": 0.0, "m": 128.0 }],
            "customData": {
                "customEvents": [{ "b": 4.0, "t": "AnimateTrack", "d": { "track": "lane" } }]
            }
        });

        let mut collection = LiveCollection::new();
        parse_into(&doc, BeatmapVersion::V3, &mut collection);

        assert_eq!(collection.sorted(ObjectKind::Note).len(), 1);
        assert_eq!(collection.sorted(ObjectKind::Bomb).len(), 1);
        assert_eq!(collection.sorted(ObjectKind::Arc).len(), 1);
        assert_eq!(collection.sorted(ObjectKind::Chain).len(), 1);
        assert_eq!(collection.sorted(ObjectKind::Wall).len(), 1);
        assert_eq!(collection.sorted(ObjectKind::Event).len(), 1);
        assert_eq!(collection.sorted(ObjectKind::BpmEvent).len(), 1);

        let custom_events = collection.sorted(ObjectKind::CustomEvent);
        assert_eq!(custom_events.len(), 1);
        let TimedObject::CustomEvent(ce) = &custom_events[0].1 else {
            panic!("expected custom event");
        };
        assert_eq!(ce.name, "AnimateTrack");
        assert_eq!(ce.data["track"], serde_json::json!("lane"));
    }

    #[test]
    fn test_parse_v2_bomb_discrimination() {
        let doc: Value = serde_json::json!({
            "_version": "2.6.0",
            "_notes": [
                { "_time": 1.0, "_lineIndex": 0, "_lineLayer": 0, "_type": 0, "_cutDirection": 1 },
                { "_time": 2.0, "_lineIndex": 1, "_lineLayer": 0, "_type": 3, "_cutDirection": 0 }
            ],
            "_obstacles": [
                { "_time": 1.0, "_lineIndex": 0, "_type": 1, "_duration": 2.0, "_width": 2 }
            ]
        });

        let mut collection = LiveCollection::new();
        parse_into(&doc, BeatmapVersion::V2, &mut collection);

        assert_eq!(collection.sorted(ObjectKind::Note).len(), 1);
        assert_eq!(collection.sorted(ObjectKind::Bomb).len(), 1);

        let walls = collection.sorted(ObjectKind::Wall);
        let TimedObject::Wall(wall) = &walls[0].1 else { panic!("expected wall") };
        // Crouch wall mapping.
        assert_eq!(wall.y, 2);
        assert_eq!(wall.height, 3);
    }

    #[test]
    fn test_missing_arrays_are_empty() {
        let doc: Value = serde_json::json!({ "version": "3.2.0" });
        let mut collection = LiveCollection::new();
        parse_into(&doc, BeatmapVersion::V3, &mut collection);
        assert!(collection.is_empty());
    }
}
