//! Error taxonomy for the check engine.
//!
//! Every failure is caught at the nearest run boundary; nothing here is ever
//! allowed to take the host down. Load errors skip one script file, binding
//! errors abort one object construction, execution errors abort one run and
//! leave the previous result in place.

use std::path::PathBuf;

use thiserror::Error;

/// A script file could not be loaded or compiled. The offending file is
/// skipped; other scripts still load.
#[derive(Debug, Error)]
#[error("failed to load check script {}: {message}", path.display())]
pub struct ScriptLoadError {
    pub path: PathBuf,
    pub message: String,
}

/// A required field was missing or mistyped while marshaling a script value
/// into a domain object.
#[derive(Debug, Error)]
#[error("missing required field `{key}` (tried {aliases:?})")]
pub struct ScriptBindingError {
    /// The preferred (modern) field name.
    pub key: String,
    /// Every alias that was tried, in priority order.
    pub aliases: Vec<String>,
}

impl ScriptBindingError {
    pub fn new(aliases: &[&str]) -> Self {
        Self {
            key: aliases.first().copied().unwrap_or_default().to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A check run failed, native or scripted. The run is aborted and the
/// previous committed result (if any) is retained unchanged.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("no check named `{0}` is registered")]
    UnknownCheck(String),

    #[error("check `{check}` failed: {message}")]
    Execution { check: String, message: String },

    #[error("check `{check}` produced a malformed report entry: {source}")]
    Binding {
        check: String,
        #[source]
        source: ScriptBindingError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_error_names_preferred_key() {
        let err = ScriptBindingError::new(&["x", "_lineIndex"]);
        assert_eq!(err.key, "x");
        let msg = err.to_string();
        assert!(msg.contains("`x`"));
        assert!(msg.contains("_lineIndex"));
    }
}
