//! Structured script diagnostics.
//!
//! Rhai provides rich error types (parse + runtime) with positions. These
//! are wrapped into a stable, JSON-serializable diagnostic format that the
//! editor UI can surface without digging through host logs.

use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptDiagnosticKind {
    /// Syntax/parse errors (load time).
    ParseError,
    /// Runtime errors in user code.
    RuntimeError,
    /// Script used the host API incorrectly (missing members, wrong types).
    HostApiMisuse,
    /// Internal/host error.
    HostError,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    /// Compiling the script file and reading its metadata.
    Load,
    /// Executing the script's `run` entry point.
    Run,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScriptLocation {
    /// 1-based line number in the script file.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptDiagnostic {
    pub kind: ScriptDiagnosticKind,
    pub phase: ScriptPhase,
    pub message: String,
    pub location: Option<ScriptLocation>,
    /// Raw engine error string (useful for bug reports).
    pub raw: Option<String>,
}

fn classify_message(message: &str) -> ScriptDiagnosticKind {
    // Rhai error strings are fairly stable; this provides a pragmatic
    // classification without depending on Rhai's internal enum variants.
    let lower = message.to_ascii_lowercase();

    if lower.contains("property not found")
        || lower.contains("variable not found")
        || lower.contains("function not found")
        || lower.contains("index")
        || lower.contains("map key")
        || lower.contains("mismatched types")
        || lower.contains("missing required field")
        || lower.contains("invalid")
    {
        return ScriptDiagnosticKind::HostApiMisuse;
    }

    ScriptDiagnosticKind::RuntimeError
}

fn location_of(line: u32, column: u32) -> Option<ScriptLocation> {
    if line == 0 {
        return None;
    }
    Some(ScriptLocation {
        line,
        column: column.max(1),
    })
}

pub fn from_parse_error(err: &rhai::ParseError) -> ScriptDiagnostic {
    let raw = err.to_string();

    let pos = err.position();
    let line = pos.line().unwrap_or(0) as u32;
    let column = pos.position().unwrap_or(0) as u32;

    ScriptDiagnostic {
        kind: ScriptDiagnosticKind::ParseError,
        phase: ScriptPhase::Load,
        message: raw.clone(),
        location: location_of(line, column),
        raw: Some(raw),
    }
}

pub fn from_eval_error(phase: ScriptPhase, err: &rhai::EvalAltResult) -> ScriptDiagnostic {
    let raw = err.to_string();
    let kind = classify_message(&raw);

    let pos = err.position();
    let line = pos.line().unwrap_or(0) as u32;
    let column = pos.position().unwrap_or(0) as u32;

    ScriptDiagnostic {
        kind,
        phase,
        message: raw.clone(),
        location: location_of(line, column),
        raw: Some(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_has_location() {
        let engine = rhai::Engine::new();
        let err = engine.compile("let x = ;").unwrap_err();
        let diag = from_parse_error(&err);
        assert_eq!(diag.kind, ScriptDiagnosticKind::ParseError);
        assert_eq!(diag.phase, ScriptPhase::Load);
        assert!(diag.location.is_some());
    }

    #[test]
    fn test_runtime_error_classification() {
        let engine = rhai::Engine::new();
        let err = engine.run("undefined_variable + 1").unwrap_err();
        let diag = from_eval_error(ScriptPhase::Run, &err);
        assert_eq!(diag.kind, ScriptDiagnosticKind::HostApiMisuse);
        assert_eq!(diag.phase, ScriptPhase::Run);
    }
}
