use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use crate::beatmap::ObjectId;
use crate::collection::{LiveCollection, SharedCollection};
use crate::format;
use crate::loader;
use crate::registry::CheckRegistry;
use crate::runner::{CheckRunner, EditorShell, OutlineColor, ParamWidgetSnapshot};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory whose `checks/` subdirectory holds check scripts
    #[arg(long, default_value = ".")]
    scripts: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available checks and their parameters
    List,

    /// Run a check against a difficulty file and print the problems
    Run {
        /// Difficulty JSON file (v2 or v3)
        #[arg(long)]
        map: PathBuf,

        /// Name of the check to run
        #[arg(long)]
        check: String,

        /// Parameter override as name=value, repeatable
        #[arg(long = "param")]
        params: Vec<String>,
    },
}

/// Headless stand-in for the editor: outlines are meaningless on a
/// terminal, status and seeks go to stdout.
struct ConsoleShell;

impl EditorShell for ConsoleShell {
    fn set_outline(&mut self, id: ObjectId, color: OutlineColor) {
        log::debug!("outline {id:?} {color:?}");
    }

    fn clear_outline(&mut self, id: ObjectId) {
        log::debug!("clear outline {id:?}");
    }

    fn is_selected(&self, _id: ObjectId) -> bool {
        false
    }

    fn seek_to(&mut self, beat: f32) {
        println!("-> beat {beat}");
    }

    fn set_status(&mut self, text: &str) {
        println!("{text}");
    }
}

fn build_registry(scripts_root: &PathBuf, collection: &SharedCollection) -> CheckRegistry {
    let mut registry = CheckRegistry::with_builtins();
    for check in loader::load_all(scripts_root, collection) {
        registry.register(check);
    }
    registry
}

/// Split repeated `name=value` arguments into pairs.
fn parse_param_args(args: &[String]) -> Result<Vec<(String, String)>> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| anyhow!("expected name=value, got `{arg}`"))
        })
        .collect()
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            let collection = LiveCollection::new_shared();
            let registry = build_registry(&cli.scripts, &collection);
            for name in registry.names() {
                println!("{name}");
                let check = registry
                    .get(name)
                    .ok_or_else(|| anyhow!("registry lookup failed"))?;
                for param in check.params() {
                    println!(
                        "  {} ({:?}, default {})",
                        param.name, param.kind, param.default
                    );
                }
            }
        }
        Commands::Run { map, check, params } => {
            let (version, collection) =
                format::load_file(&map).with_context(|| format!("loading {}", map.display()))?;
            let registry = build_registry(&cli.scripts, &collection);

            let overrides = parse_param_args(&params)?;
            let declared = registry
                .get(&check)
                .ok_or_else(|| anyhow!("no check named `{check}`"))?
                .params()
                .to_vec();
            // Widgets are positional in declaration order; an absent
            // override leaves the declared default in play.
            let widgets: Vec<ParamWidgetSnapshot> = declared
                .iter()
                .map(|param| {
                    let raw = overrides
                        .iter()
                        .find(|(name, _)| *name == param.name)
                        .map(|(_, value)| value.clone())
                        .unwrap_or_default();
                    ParamWidgetSnapshot::Text(raw)
                })
                .collect();

            let mut runner =
                CheckRunner::new(collection, registry, Box::new(ConsoleShell), version);
            runner.run_check(&check, &widgets).map_err(|e| anyhow!("{e}"))?;

            if let Some(result) = runner.result() {
                for problem in result.all() {
                    let reason = if problem.reason.is_empty() {
                        "..."
                    } else {
                        &problem.reason
                    };
                    println!(
                        "[{:?}] beat {:.3}: {}",
                        problem.severity, problem.beat, reason
                    );
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_args_split() {
        let pairs = parse_param_args(&[
            "max gap (beats)=0.05".to_string(),
            "mode=a=b".to_string(),
        ])
        .unwrap();
        assert_eq!(pairs[0], ("max gap (beats)".to_string(), "0.05".to_string()));
        // Only the first `=` splits.
        assert_eq!(pairs[1], ("mode".to_string(), "a=b".to_string()));
    }

    #[test]
    fn test_param_args_reject_bare() {
        assert!(parse_param_args(&["nonsense".to_string()]).is_err());
    }
}
