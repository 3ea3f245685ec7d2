//! Check runner and result aggregator.
//!
//! Orchestrates one run: clear the previous result's outlines, harvest
//! parameter values, gather the sorted object sets for the active format
//! version, invoke the check, commit the result, recolor, and report a
//! count summary. Also owns the circular problem navigation and the
//! outline re-application hook for lazily instantiated objects.
//!
//! Everything here runs on the host's main update thread; a check run is
//! synchronous end to end.

use crate::beatmap::{BeatmapVersion, ObjectId, ObjectKind};
use crate::check::{CheckResult, ObjectSets, ParamValue};
use crate::collection::SharedCollection;
use crate::errors::CheckError;
use crate::registry::CheckRegistry;

/// Outline colors the runner requests from the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineColor {
    Red,
    Yellow,
}

/// Current value of one UI parameter widget, snapshotted by the UI layer.
/// The runner never sees widget types, only this tagged value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamWidgetSnapshot {
    /// Free text input.
    Text(String),
    /// Selected entry of a dropdown, in textual form.
    Choice(String),
    /// Toggle state.
    Toggle(bool),
}

/// The editor-side collaborator surface the runner drives: outline
/// highlighting, playback seeking, and the status display.
pub trait EditorShell {
    fn set_outline(&mut self, id: ObjectId, color: OutlineColor);
    /// Drop the problem highlight. The shell restores the selection
    /// highlight itself; the runner skips selected objects entirely.
    fn clear_outline(&mut self, id: ObjectId);
    fn is_selected(&self, id: ObjectId) -> bool;
    fn seek_to(&mut self, beat: f32);
    fn set_status(&mut self, text: &str);
}

pub struct CheckRunner {
    collection: SharedCollection,
    registry: CheckRegistry,
    shell: Box<dyn EditorShell>,
    version: BeatmapVersion,
    result: Option<CheckResult>,
    index: usize,
    moved_after_run: bool,
}

impl CheckRunner {
    pub fn new(
        collection: SharedCollection,
        registry: CheckRegistry,
        shell: Box<dyn EditorShell>,
        version: BeatmapVersion,
    ) -> Self {
        Self {
            collection,
            registry,
            shell,
            version,
            result: None,
            index: 0,
            moved_after_run: false,
        }
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    pub fn result(&self) -> Option<&CheckResult> {
        self.result.as_ref()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Gather the eight object sequences for the active format version,
    /// each sorted ascending by beat. Unsupported categories come back
    /// empty, never missing.
    fn gather_sets(&self) -> ObjectSets {
        let collection = self.collection.borrow();
        let sorted = |kind: ObjectKind| {
            if self.version.supports(kind) {
                collection.sorted(kind)
            } else {
                Vec::new()
            }
        };
        ObjectSets {
            notes: sorted(ObjectKind::Note),
            bombs: sorted(ObjectKind::Bomb),
            arcs: sorted(ObjectKind::Arc),
            chains: sorted(ObjectKind::Chain),
            events: sorted(ObjectKind::Event),
            walls: sorted(ObjectKind::Wall),
            custom_events: sorted(ObjectKind::CustomEvent),
            bpm_events: sorted(ObjectKind::BpmEvent),
        }
    }

    /// Remove the previous result's highlights, leaving selected objects to
    /// the shell's own selection rendering.
    fn clear_previous_outlines(&mut self) {
        let Some(result) = &self.result else { return };
        for problem in result.all() {
            if !self.shell.is_selected(problem.object) {
                self.shell.clear_outline(problem.object);
            }
        }
    }

    /// Run the named check against the current document state.
    ///
    /// On failure the previous committed result is retained (its outlines
    /// stay cleared) and the error is surfaced on the status display.
    pub fn run_check(
        &mut self,
        name: &str,
        widgets: &[ParamWidgetSnapshot],
    ) -> Result<(), CheckError> {
        self.clear_previous_outlines();

        let sets = self.gather_sets();

        let check = self
            .registry
            .get_mut(name)
            .ok_or_else(|| CheckError::UnknownCheck(name.to_string()))?;

        // Harvest parameters in declaration order. A missing snapshot is a
        // null-valued parameter, not a failed run.
        let vals: Vec<(String, ParamValue)> = check
            .params()
            .iter()
            .enumerate()
            .map(|(idx, param)| {
                let value = match widgets.get(idx) {
                    Some(ParamWidgetSnapshot::Text(raw)) => param.parse(raw),
                    Some(ParamWidgetSnapshot::Choice(raw)) => param.parse(raw),
                    Some(ParamWidgetSnapshot::Toggle(state)) => param.parse(&state.to_string()),
                    None => ParamValue::None,
                };
                (param.name.clone(), value)
            })
            .collect();

        let result = match check.perform(&sets, &vals) {
            Ok(result) => result.commit(),
            Err(e) => {
                log::error!("{e}");
                self.shell.set_status(&format!("Check failed: {e}"));
                return Err(e);
            }
        };

        for problem in result.errors() {
            self.shell.set_outline(problem.object, OutlineColor::Red);
        }
        for problem in result.warnings() {
            self.shell.set_outline(problem.object, OutlineColor::Yellow);
        }

        let count = result.all().len();
        if count == 0 {
            self.shell.set_status("No problems found");
        } else {
            self.shell.set_status(&format!("{count} problems found"));
        }

        self.result = Some(result);
        self.index = 0;
        self.moved_after_run = false;
        Ok(())
    }

    /// Navigate the combined problem list circularly.
    ///
    /// The first navigation after a run is forced to offset 0 when a
    /// positive offset is requested, so it lands on the first problem
    /// instead of skipping past it. A call with no committed result is a
    /// no-op.
    pub fn next_block(&mut self, offset: i64) {
        let mut offset = offset;
        if !self.moved_after_run {
            self.moved_after_run = true;
            if offset > 0 {
                offset = 0;
            }
        }

        let Some(result) = &self.result else { return };
        let len = result.all().len() as i64;
        if len < 1 {
            return;
        }

        let mut index = (self.index as i64 + offset) % len;
        if index < 0 {
            index += len;
        }
        self.index = index as usize;

        let problem = &result.all()[self.index];
        let beat = problem.beat;
        let reason = if problem.reason.is_empty() {
            "...".to_string()
        } else {
            problem.reason.clone()
        };
        self.shell.seek_to(beat);
        self.shell.set_status(&reason);
    }

    /// Re-apply the problem highlight when the editor lazily instantiates
    /// an object's scene representation. Errors take priority over
    /// warnings; a clean object is left alone.
    pub fn object_loaded(&mut self, id: ObjectId) {
        let Some(result) = &self.result else { return };
        if result.errors().iter().any(|p| p.object == id) {
            self.shell.set_outline(id, OutlineColor::Red);
        } else if result.warnings().iter().any(|p| p.object == id) {
            self.shell.set_outline(id, OutlineColor::Yellow);
        }
    }
}
