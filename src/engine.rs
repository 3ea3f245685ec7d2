//! One-time script engine configuration.
//!
//! Each script-backed check owns a persistent engine built here: host
//! bindings installed, resource limits set. The operation cap is the guard
//! against a script that never returns; it aborts the evaluation instead of
//! stalling the editor forever.

use rhai::{Dynamic, Engine, Scope};

use crate::collection::SharedCollection;
use crate::script_log::ScriptLogger;
use crate::wrapper::register_object_api;

/// Build an engine with sandbox limits and the full object/logging API.
pub fn new_check_engine(collection: &SharedCollection) -> Engine {
    let mut engine = Engine::new();

    // Resource limits. Maps hold only thousands of objects, so the array
    // cap is generous; the operation cap is what stops runaway loops.
    engine.set_max_expr_depths(64, 64);
    engine.set_max_call_levels(64);
    engine.set_max_operations(10_000_000);
    engine.set_max_string_size(100_000);
    engine.set_max_array_size(1_000_000);
    engine.set_max_map_size(10_000);

    // `log.info(..)` etc. resolve as method calls on the Logger constant
    // pushed into every script scope.
    engine.register_type_with_name::<ScriptLogger>("Logger");
    engine.register_fn("info", |logger: &mut ScriptLogger, value: Dynamic| {
        logger.info(value);
    });
    engine.register_fn("warn", |logger: &mut ScriptLogger, value: Dynamic| {
        logger.warn(value);
    });
    engine.register_fn("error", |logger: &mut ScriptLogger, value: Dynamic| {
        logger.error(value);
    });

    register_object_api(&mut engine, collection);

    engine
}

/// Fresh scope carrying the host-provided globals. `log` is a plain
/// variable, not a constant: its methods take `&mut self` and rhai rejects
/// non-pure method calls on constants.
pub fn base_scope() -> Scope<'static> {
    let mut scope = Scope::new();
    scope.push("log", ScriptLogger);
    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::LiveCollection;

    #[test]
    fn test_log_api_is_callable() {
        let collection = LiveCollection::new_shared();
        let engine = new_check_engine(&collection);
        let mut scope = base_scope();
        engine
            .run_with_scope(&mut scope, r#"log.info("hello"); log.warn(42);"#)
            .unwrap();
    }

    #[test]
    fn test_operation_limit_aborts_infinite_loop() {
        let collection = LiveCollection::new_shared();
        let engine = new_check_engine(&collection);
        let mut scope = base_scope();
        let result = engine.run_with_scope(&mut scope, "loop { }");
        assert!(result.is_err());
    }

    #[test]
    fn test_object_constructors_registered() {
        let collection = LiveCollection::new_shared();
        let engine = new_check_engine(&collection);
        let mut scope = base_scope();
        engine
            .run_with_scope(
                &mut scope,
                "let n = note(#{ b: 1.0, x: 0, y: 0, c: 0, d: 1 });",
            )
            .unwrap();
    }
}
