//! Built-in native checks.
//!
//! These run as plain host logic over the sorted object sets. The
//! placeholder sits at position zero of the registry so the UI dropdown has
//! a harmless default selection.

use crate::beatmap::TimedObject;
use crate::check::{Check, CheckParam, CheckResult, ObjectSets, ParamKind, ParamValue};
use crate::errors::CheckError;

/// The no-op default. Zero parameters, always an empty result.
pub struct PlaceholderCheck;

impl Check for PlaceholderCheck {
    fn name(&self) -> &str {
        "Select a check"
    }

    fn params(&self) -> &[CheckParam] {
        &[]
    }

    fn perform(
        &mut self,
        _sets: &ObjectSets,
        _vals: &[(String, ParamValue)],
    ) -> Result<CheckResult, CheckError> {
        Ok(CheckResult::new())
    }
}

/// Flags pairs of notes on the same column and row closer together than the
/// configured gap. Doubles directly on top of each other are almost always
/// mapping mistakes.
pub struct StackedNotesCheck {
    params: Vec<CheckParam>,
}

impl StackedNotesCheck {
    pub fn new() -> Self {
        Self {
            params: vec![CheckParam::new("max gap (beats)", ParamKind::Float, "0.01")],
        }
    }
}

impl Default for StackedNotesCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for StackedNotesCheck {
    fn name(&self) -> &str {
        "Stacked notes"
    }

    fn params(&self) -> &[CheckParam] {
        &self.params
    }

    fn perform(
        &mut self,
        sets: &ObjectSets,
        vals: &[(String, ParamValue)],
    ) -> Result<CheckResult, CheckError> {
        let max_gap = vals
            .first()
            .and_then(|(_, v)| v.as_f32())
            .unwrap_or(0.01);

        let mut result = CheckResult::new();
        for (i, (_, object)) in sets.notes.iter().enumerate() {
            let TimedObject::Note(note) = object else { continue };
            // Inputs are sorted by beat, so only a bounded look-back is
            // needed.
            for (_, prev_object) in sets.notes[..i].iter().rev() {
                let TimedObject::Note(prev) = prev_object else { continue };
                if note.beat - prev.beat > max_gap {
                    break;
                }
                if prev.x == note.x && prev.y == note.y {
                    let (id, _) = sets.notes[i];
                    result.add_error(
                        id,
                        note.beat,
                        format!("stacked on note at beat {:.2}", prev.beat),
                    );
                    break;
                }
            }
        }
        Ok(result)
    }
}

/// Warns about notes and bombs parked in the two center columns at head
/// height when anything follows them inside the reaction window: the player
/// cannot see through them.
pub struct VisionBlockCheck {
    params: Vec<CheckParam>,
}

impl VisionBlockCheck {
    pub fn new() -> Self {
        Self {
            params: vec![CheckParam::new(
                "reaction window (beats)",
                ParamKind::Float,
                "0.5",
            )],
        }
    }

    fn is_center(x: i32, y: i32) -> bool {
        (x == 1 || x == 2) && y == 1
    }
}

impl Default for VisionBlockCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for VisionBlockCheck {
    fn name(&self) -> &str {
        "Vision blocks"
    }

    fn params(&self) -> &[CheckParam] {
        &self.params
    }

    fn perform(
        &mut self,
        sets: &ObjectSets,
        vals: &[(String, ParamValue)],
    ) -> Result<CheckResult, CheckError> {
        let window = vals.first().and_then(|(_, v)| v.as_f32()).unwrap_or(0.5);

        // Candidate blockers, already sorted by beat within each set.
        let mut blockers: Vec<(crate::beatmap::ObjectId, f32)> = Vec::new();
        for (id, object) in sets.notes.iter().chain(sets.bombs.iter()) {
            let (x, y, beat) = match object {
                TimedObject::Note(n) => (n.x, n.y, n.beat),
                TimedObject::Bomb(b) => (b.x, b.y, b.beat),
                _ => continue,
            };
            if Self::is_center(x, y) {
                blockers.push((*id, beat));
            }
        }

        let mut result = CheckResult::new();
        for (id, beat) in blockers {
            let obscures_something = sets.notes.iter().any(|(other, object)| {
                *other != id && object.beat() > beat && object.beat() - beat <= window
            });
            if obscures_something {
                result.add_warning(id, beat, "blocks vision of upcoming notes");
            }
        }
        Ok(result)
    }
}
