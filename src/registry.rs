//! Check registry.
//!
//! Owned by the runner, built once at startup. No ambient global; whoever
//! constructs the runner decides which natives and which script directories
//! contribute checks.

use crate::builtin::{PlaceholderCheck, StackedNotesCheck, VisionBlockCheck};
use crate::check::Check;

#[derive(Default)]
pub struct CheckRegistry {
    checks: Vec<Box<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the built-in native checks, placeholder first.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PlaceholderCheck));
        registry.register(Box::new(StackedNotesCheck::new()));
        registry.register(Box::new(VisionBlockCheck::new()));
        registry
    }

    pub fn register(&mut self, check: Box<dyn Check>) {
        self.checks.push(check);
    }

    pub fn names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Check> {
        self.checks.iter().find(|c| c.name() == name).map(|c| c.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn Check>> {
        self.checks.iter_mut().find(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered_in_order() {
        let registry = CheckRegistry::with_builtins();
        let names = registry.names();
        assert_eq!(names[0], "Select a check");
        assert!(names.contains(&"Stacked notes"));
        assert!(names.contains(&"Vision blocks"));
    }

    #[test]
    fn test_lookup_by_name() {
        let mut registry = CheckRegistry::with_builtins();
        assert!(registry.get_mut("Stacked notes").is_some());
        assert!(registry.get_mut("No such check").is_none());
    }
}
