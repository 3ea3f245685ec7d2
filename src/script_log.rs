//! Script logging.
//!
//! Check scripts get a `log.info/warn/error` API. Output goes through the
//! host `log` facade, and a per-run cap keeps a misbehaving script from
//! flooding the editor log.

use std::sync::atomic::{AtomicU32, Ordering};

/// Maximum number of log messages allowed per check run.
const MAX_LOGS_PER_RUN: u32 = 100;

static LOG_COUNT: AtomicU32 = AtomicU32::new(0);
static WARNED_LIMIT: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Reset the per-run log counter. Called at the start of each check run.
pub fn reset_run_log_count() {
    LOG_COUNT.store(0, Ordering::Relaxed);
    WARNED_LIMIT.store(0, Ordering::Relaxed);
}

fn can_log() -> bool {
    let count = LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= MAX_LOGS_PER_RUN {
        if WARNED_LIMIT.swap(1, Ordering::Relaxed) == 0 {
            log::warn!(
                "script log limit exceeded ({} messages/run), further logs dropped",
                MAX_LOGS_PER_RUN
            );
        }
        false
    } else {
        true
    }
}

/// Log a message from a script, respecting the per-run limit.
pub fn script_log(level: LogLevel, message: &str) {
    if !can_log() {
        return;
    }
    match level {
        LogLevel::Info => log::info!(target: "script", "{message}"),
        LogLevel::Warn => log::warn!(target: "script", "{message}"),
        LogLevel::Error => log::error!(target: "script", "{message}"),
    }
}

/// Convert a rhai value to a display string. Never panics.
pub fn stringify_dynamic(value: &rhai::Dynamic) -> String {
    if let Ok(s) = value.clone().into_string() {
        return s;
    }

    if value.is_array() {
        if let Some(arr) = value.clone().try_cast::<rhai::Array>() {
            let parts: Vec<String> = arr.iter().map(stringify_dynamic).collect();
            return parts.join(" ");
        }
    }

    if value.is_map() {
        if let Some(map) = value.clone().try_cast::<rhai::Map>() {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, stringify_dynamic(v)))
                .collect();
            return format!("{{{}}}", parts.join(", "));
        }
    }

    if let Ok(i) = value.as_int() {
        return i.to_string();
    }
    if let Ok(f) = value.as_float() {
        return format!("{f}");
    }
    if let Ok(b) = value.as_bool() {
        return b.to_string();
    }
    if value.is_unit() {
        return "()".to_string();
    }

    format!("{value:?}")
}

/// The `log` object pushed into every script scope. Holds no state; method
/// calls dispatch straight to [`script_log`].
#[derive(Debug, Clone, Default)]
pub struct ScriptLogger;

impl ScriptLogger {
    pub fn info(&self, value: rhai::Dynamic) {
        script_log(LogLevel::Info, &stringify_dynamic(&value));
    }

    pub fn warn(&self, value: rhai::Dynamic) {
        script_log(LogLevel::Warn, &stringify_dynamic(&value));
    }

    pub fn error(&self, value: rhai::Dynamic) {
        script_log(LogLevel::Error, &stringify_dynamic(&value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stringify_primitives() {
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from("hello")), "hello");
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from(42_i64)), "42");
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from(true)), "true");
        assert_eq!(stringify_dynamic(&rhai::Dynamic::UNIT), "()");
    }

    #[test]
    fn test_stringify_array() {
        let mut arr = rhai::Array::new();
        arr.push(rhai::Dynamic::from("beat"));
        arr.push(rhai::Dynamic::from(2.5_f32));
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from(arr)), "beat 2.5");
    }

    #[test]
    fn test_run_log_limit() {
        reset_run_log_count();
        for _ in 0..MAX_LOGS_PER_RUN {
            assert!(can_log());
        }
        assert!(!can_log());
        reset_run_log_count();
        assert!(can_log());
    }
}
