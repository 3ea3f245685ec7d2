pub mod beatmap;
pub mod builtin;
pub mod check;
pub mod collection;
pub mod errors;
pub mod format;
pub mod loader;
pub mod registry;
pub mod runner;

// Scripting modules
pub mod engine;
pub mod script_check;
pub mod script_diagnostics;
pub mod script_log;
pub mod script_value;
pub mod wrapper;

pub mod cli;
