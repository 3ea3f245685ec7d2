//! Script-backed checks.
//!
//! A check script is a single `.rhai` file declaring, at top level:
//!
//! ```rhai
//! let name = "Example check";
//! let params = [
//!     #{ name: "max gap (beats)", type: "float", default: "0.25" },
//! ];
//!
//! fn run(notes, bombs, arcs, chains, events, walls, custom_events, bpm_events, params) {
//!     let report = [];
//!     for note in notes {
//!         if note.y > 2 {
//!             report.push(#{ object: note, reason: "note above the grid", severity: "error" });
//!         }
//!     }
//!     report
//! }
//! ```
//!
//! The compiled AST, engine, and scope persist across runs; `run` is
//! re-invoked with freshly wrapped object arrays each time. Returning `()`
//! means no problems. `note` is accepted as a legacy alias for `object` in
//! report entries, and `severity` defaults to `"error"`.

use std::fs;
use std::path::{Path, PathBuf};

use rhai::{Dynamic, Engine, Map, Scope, AST};

use crate::beatmap::{
    ArcData, BombData, BpmEventData, ChainData, CustomEventData, EventData, NoteData, WallData,
};
use crate::check::{Check, CheckParam, CheckResult, ObjectSets, ParamKind, ParamValue};
use crate::collection::SharedCollection;
use crate::engine::{base_scope, new_check_engine};
use crate::errors::{CheckError, ScriptBindingError, ScriptLoadError};
use crate::script_diagnostics::{from_eval_error, from_parse_error, ScriptDiagnostic, ScriptPhase};
use crate::script_log::{reset_run_log_count, stringify_dynamic};
use crate::wrapper::{handle_identity, wrap_objects};

pub struct ScriptCheck {
    name: String,
    params: Vec<CheckParam>,
    path: PathBuf,
    engine: Engine,
    ast: AST,
    scope: Scope<'static>,
    collection: SharedCollection,
    /// Most recent failure, kept for UI display.
    last_diagnostic: Option<ScriptDiagnostic>,
}

impl std::fmt::Debug for ScriptCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptCheck")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("path", &self.path)
            .field("last_diagnostic", &self.last_diagnostic)
            .finish_non_exhaustive()
    }
}

impl ScriptCheck {
    /// Load and compile a check script from disk.
    pub fn load(path: &Path, collection: SharedCollection) -> Result<Self, ScriptLoadError> {
        let source = fs::read_to_string(path).map_err(|e| ScriptLoadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_source(path, &source, collection)
    }

    /// Compile a check script from source. Separated from [`load`] so tests
    /// and embedders can skip the filesystem.
    pub fn from_source(
        path: &Path,
        source: &str,
        collection: SharedCollection,
    ) -> Result<Self, ScriptLoadError> {
        let load_error = |message: String| ScriptLoadError {
            path: path.to_path_buf(),
            message,
        };

        let engine = new_check_engine(&collection);
        let ast = engine
            .compile(source)
            .map_err(|e| load_error(from_parse_error(&e).message))?;

        if !ast.iter_functions().any(|f| f.name == "run") {
            return Err(load_error("script does not define a `run` function".to_string()));
        }

        let mut scope = base_scope();
        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| load_error(from_eval_error(ScriptPhase::Load, &e).message))?;

        let name = scope
            .get_value::<Dynamic>("name")
            .and_then(|v| v.into_string().ok())
            .ok_or_else(|| load_error("script does not declare `let name = ...`".to_string()))?;

        let params = match scope.get_value::<Dynamic>("params") {
            Some(value) => parse_param_decls(&value).map_err(load_error)?,
            None => Vec::new(),
        };

        Ok(Self {
            name,
            params,
            path: path.to_path_buf(),
            engine,
            ast,
            scope,
            collection,
            last_diagnostic: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_diagnostic(&self) -> Option<&ScriptDiagnostic> {
        self.last_diagnostic.as_ref()
    }
}

/// Parse the `params` declaration: an array of `#{ name, type, default }`.
fn parse_param_decls(value: &Dynamic) -> Result<Vec<CheckParam>, String> {
    let Some(array) = value.clone().try_cast::<rhai::Array>() else {
        return Err("`params` must be an array of parameter declarations".to_string());
    };

    let mut out = Vec::with_capacity(array.len());
    for (idx, entry) in array.iter().enumerate() {
        let Some(map) = entry.clone().try_cast::<Map>() else {
            return Err(format!("params[{idx}] is not a map"));
        };
        let name = map
            .get("name")
            .and_then(|v| v.clone().into_string().ok())
            .ok_or_else(|| format!("params[{idx}] has no `name`"))?;
        let kind = map
            .get("type")
            .and_then(|v| v.clone().into_string().ok())
            .map(|tag| ParamKind::parse_tag(&tag))
            .unwrap_or(ParamKind::Text);
        let default = map
            .get("default")
            .map(stringify_dynamic)
            .unwrap_or_default();
        out.push(CheckParam {
            name,
            kind,
            default,
        });
    }
    Ok(out)
}

fn param_to_dynamic(value: &ParamValue) -> Dynamic {
    match value {
        ParamValue::Float(f) => Dynamic::from(*f),
        ParamValue::Int(i) => Dynamic::from(*i as i64),
        ParamValue::Bool(b) => Dynamic::from(*b),
        ParamValue::Text(s) => Dynamic::from(s.clone()),
        ParamValue::None => Dynamic::UNIT,
    }
}

/// Unmarshal the script's report into a [`CheckResult`].
fn result_from_report(check: &str, report: Dynamic) -> Result<CheckResult, CheckError> {
    let mut result = CheckResult::new();

    if report.is_unit() {
        return Ok(result);
    }

    let Some(entries) = report.try_cast::<rhai::Array>() else {
        return Err(CheckError::Execution {
            check: check.to_string(),
            message: "run() must return an array of report entries or ()".to_string(),
        });
    };

    for entry in entries {
        let Some(map) = entry.try_cast::<Map>() else {
            return Err(CheckError::Execution {
                check: check.to_string(),
                message: "report entry is not a map".to_string(),
            });
        };

        let object = map
            .get("object")
            .or_else(|| map.get("note"))
            .ok_or_else(|| CheckError::Binding {
                check: check.to_string(),
                source: ScriptBindingError::new(&["object", "note"]),
            })?;
        let (id, beat) = handle_identity(object).ok_or_else(|| CheckError::Binding {
            check: check.to_string(),
            source: ScriptBindingError::new(&["object", "note"]),
        })?;

        let reason = map
            .get("reason")
            .and_then(|v| v.clone().into_string().ok())
            .unwrap_or_else(|| "...".to_string());

        let severity = map
            .get("severity")
            .and_then(|v| v.clone().into_string().ok())
            .unwrap_or_default();
        match severity.as_str() {
            "warning" | "warn" => result.add_warning(id, beat, reason),
            _ => result.add_error(id, beat, reason),
        }
    }

    Ok(result)
}

impl Check for ScriptCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[CheckParam] {
        &self.params
    }

    fn perform(
        &mut self,
        sets: &ObjectSets,
        vals: &[(String, ParamValue)],
    ) -> Result<CheckResult, CheckError> {
        reset_run_log_count();
        self.last_diagnostic = None;

        let notes = wrap_objects::<NoteData>(&sets.notes, &self.collection);
        let bombs = wrap_objects::<BombData>(&sets.bombs, &self.collection);
        let arcs = wrap_objects::<ArcData>(&sets.arcs, &self.collection);
        let chains = wrap_objects::<ChainData>(&sets.chains, &self.collection);
        let events = wrap_objects::<EventData>(&sets.events, &self.collection);
        let walls = wrap_objects::<WallData>(&sets.walls, &self.collection);
        let custom_events = wrap_objects::<CustomEventData>(&sets.custom_events, &self.collection);
        let bpm_events = wrap_objects::<BpmEventData>(&sets.bpm_events, &self.collection);

        let mut params = Map::new();
        for (name, value) in vals {
            params.insert(name.as_str().into(), param_to_dynamic(value));
        }

        let report: Dynamic = self
            .engine
            .call_fn(
                &mut self.scope,
                &self.ast,
                "run",
                (
                    Dynamic::from(notes),
                    Dynamic::from(bombs),
                    Dynamic::from(arcs),
                    Dynamic::from(chains),
                    Dynamic::from(events),
                    Dynamic::from(walls),
                    Dynamic::from(custom_events),
                    Dynamic::from(bpm_events),
                    Dynamic::from(params),
                ),
            )
            .map_err(|e| {
                let diag = from_eval_error(ScriptPhase::Run, &e);
                let message = diag.message.clone();
                self.last_diagnostic = Some(diag);
                CheckError::Execution {
                    check: self.name.clone(),
                    message,
                }
            })?;

        result_from_report(&self.name, report)
    }
}
