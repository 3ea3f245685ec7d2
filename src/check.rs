//! Check model: parameters, results, and the `Check` trait that native and
//! script-backed validations both implement.

use std::fmt;

use crate::beatmap::{ObjectId, TimedObject};
use crate::errors::CheckError;

/// Declared type of a check parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    Int,
    Bool,
    Text,
}

impl ParamKind {
    pub fn parse_tag(tag: &str) -> ParamKind {
        match tag {
            "float" | "number" => ParamKind::Float,
            "int" => ParamKind::Int,
            "bool" | "checkbox" => ParamKind::Bool,
            _ => ParamKind::Text,
        }
    }
}

/// One declared parameter: a name, a type, and the default the UI shows.
/// Declared once at check construction; reparsed from live UI state every
/// run.
#[derive(Debug, Clone)]
pub struct CheckParam {
    pub name: String,
    pub kind: ParamKind,
    pub default: String,
}

impl CheckParam {
    pub fn new(name: &str, kind: ParamKind, default: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: default.to_string(),
        }
    }

    /// Parse raw widget text into a typed value. Empty input falls back to
    /// the declared default; unparsable input yields [`ParamValue::None`].
    pub fn parse(&self, raw: &str) -> ParamValue {
        let text = if raw.trim().is_empty() {
            self.default.as_str()
        } else {
            raw
        };
        match self.kind {
            ParamKind::Float => text
                .trim()
                .parse::<f32>()
                .map(ParamValue::Float)
                .unwrap_or(ParamValue::None),
            ParamKind::Int => text
                .trim()
                .parse::<i32>()
                .map(ParamValue::Int)
                .unwrap_or(ParamValue::None),
            ParamKind::Bool => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => ParamValue::Bool(true),
                "false" | "0" | "off" => ParamValue::Bool(false),
                _ => ParamValue::None,
            },
            ParamKind::Text => ParamValue::Text(text.to_string()),
        }
    }
}

/// A typed, immutable box over one parsed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Text(String),
    /// Unparsable input or an unrecognized widget. Checks treat it as
    /// "value absent" rather than failing the run.
    None,
}

impl ParamValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v}"),
            ParamValue::None => write!(f, ""),
        }
    }
}

/// The eight time-sorted object sequences a check receives. Categories the
/// active format version does not support arrive empty, never missing, so
/// every check shares one signature across versions.
#[derive(Debug, Default, Clone)]
pub struct ObjectSets {
    pub notes: Vec<(ObjectId, TimedObject)>,
    pub bombs: Vec<(ObjectId, TimedObject)>,
    pub arcs: Vec<(ObjectId, TimedObject)>,
    pub chains: Vec<(ObjectId, TimedObject)>,
    pub events: Vec<(ObjectId, TimedObject)>,
    pub walls: Vec<(ObjectId, TimedObject)>,
    pub custom_events: Vec<(ObjectId, TimedObject)>,
    pub bpm_events: Vec<(ObjectId, TimedObject)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One reported problem: an object identity, its beat (kept so navigation
/// can seek without a collection lookup), and the reason text.
#[derive(Debug, Clone)]
pub struct Problem {
    pub object: ObjectId,
    pub beat: f32,
    pub reason: String,
    pub severity: Severity,
    /// Global insertion sequence across both severities; `commit` orders
    /// the union by it.
    seq: u32,
}

/// Result of one check run: ordered errors, warnings, and their union.
#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    errors: Vec<Problem>,
    warnings: Vec<Problem>,
    all: Vec<Problem>,
    next_seq: u32,
}

impl CheckResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, object: ObjectId, beat: f32, reason: impl Into<String>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.errors.push(Problem {
            object,
            beat,
            reason: reason.into(),
            severity: Severity::Error,
            seq,
        });
    }

    pub fn add_warning(&mut self, object: ObjectId, beat: f32, reason: impl Into<String>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.warnings.push(Problem {
            object,
            beat,
            reason: reason.into(),
            severity: Severity::Warning,
            seq,
        });
    }

    /// Finalize for presentation: `all` becomes the insertion-ordered union
    /// of errors and warnings. Idempotent; committing again without further
    /// mutation yields the same three sequences.
    pub fn commit(mut self) -> Self {
        let mut all: Vec<Problem> = self.errors.iter().chain(self.warnings.iter()).cloned().collect();
        all.sort_by_key(|p| p.seq);
        self.all = all;
        self
    }

    pub fn errors(&self) -> &[Problem] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Problem] {
        &self.warnings
    }

    pub fn all(&self) -> &[Problem] {
        &self.all
    }

    pub fn clear(&mut self) {
        self.errors.clear();
        self.warnings.clear();
        self.all.clear();
        self.next_seq = 0;
    }
}

/// A named, parameterized unit of validation.
pub trait Check {
    fn name(&self) -> &str;

    fn params(&self) -> &[CheckParam];

    /// Run the check over pre-sorted object sequences. `vals` pairs each
    /// declared parameter name with its freshly parsed value, in
    /// declaration order.
    fn perform(
        &mut self,
        sets: &ObjectSets,
        vals: &[(String, ParamValue)],
    ) -> Result<CheckResult, CheckError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_parse_float_and_default() {
        let param = CheckParam::new("max gap", ParamKind::Float, "0.25");
        assert_eq!(param.parse("1.5"), ParamValue::Float(1.5));
        assert_eq!(param.parse(""), ParamValue::Float(0.25));
        assert_eq!(param.parse("abc"), ParamValue::None);
    }

    #[test]
    fn test_param_parse_bool_forms() {
        let param = CheckParam::new("strict", ParamKind::Bool, "false");
        assert_eq!(param.parse("True"), ParamValue::Bool(true));
        assert_eq!(param.parse("0"), ParamValue::Bool(false));
        assert_eq!(param.parse("  "), ParamValue::Bool(false));
    }

    #[test]
    fn test_commit_orders_union_by_insertion() {
        let mut result = CheckResult::new();
        result.add_error(ObjectId(1), 1.0, "first");
        result.add_warning(ObjectId(2), 2.0, "second");
        result.add_error(ObjectId(3), 3.0, "third");

        let result = result.commit();
        let reasons: Vec<&str> = result.all().iter().map(|p| p.reason.as_str()).collect();
        assert_eq!(reasons, vec!["first", "second", "third"]);
        assert_eq!(result.errors().len(), 2);
        assert_eq!(result.warnings().len(), 1);
        assert_eq!(result.all().len(), 3);
    }

    #[test]
    fn test_commit_is_idempotent() {
        let mut result = CheckResult::new();
        result.add_warning(ObjectId(5), 1.0, "w");
        result.add_error(ObjectId(6), 2.0, "e");

        let once = result.clone().commit();
        let twice = once.clone().commit();
        let reasons_once: Vec<&str> = once.all().iter().map(|p| p.reason.as_str()).collect();
        let reasons_twice: Vec<&str> = twice.all().iter().map(|p| p.reason.as_str()).collect();
        assert_eq!(reasons_once, reasons_twice);
        assert_eq!(once.errors().len(), twice.errors().len());
        assert_eq!(once.warnings().len(), twice.warnings().len());
    }

    #[test]
    fn test_param_display() {
        assert_eq!(ParamValue::Float(0.5).to_string(), "0.5");
        assert_eq!(ParamValue::Bool(true).to_string(), "true");
        assert_eq!(ParamValue::None.to_string(), "");
    }
}
