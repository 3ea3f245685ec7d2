//! Check script discovery.
//!
//! Scripts live in a `checks` subdirectory under the plugin root. The
//! directory is created on first use together with a starter script, and
//! any script files still sitting flat in the plugin root are moved into
//! the subdirectory before loading. A failed move is logged and the file
//! left in place; the same script may then load from both locations until
//! the user cleans up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::check::Check;
use crate::collection::SharedCollection;
use crate::script_check::ScriptCheck;

pub const CHECKS_DIR: &str = "checks";
pub const SCRIPT_EXTENSION: &str = "rhai";
const STARTER_SCRIPT: &str = "welcome.rhai";

const STARTER_SCRIPT_CONTENT: &str = r#"// Auto-created the first time the checks directory did not exist.
let name = "Script folder notice";
let params = [];

fn run(notes, bombs, arcs, chains, events, walls, custom_events, bpm_events, params) {
    log.info("Check scripts now load from the 'checks' subdirectory; scripts found next to it are moved there at startup.");
    ()
}
"#;

/// Create the checks subdirectory if missing. The starter script is written
/// only when the directory itself had to be created, so deleting the
/// starter does not resurrect it.
pub fn ensure_checks_dir(root: &Path) -> io::Result<PathBuf> {
    let dir = root.join(CHECKS_DIR);
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        let starter = dir.join(STARTER_SCRIPT);
        fs::write(&starter, STARTER_SCRIPT_CONTENT)?;
        log::info!("created checks directory {} with starter script", dir.display());
    }
    Ok(dir)
}

/// Move legacy script files from the plugin root into the checks
/// subdirectory. Move failures are logged and non-fatal.
pub fn migrate_legacy_scripts(root: &Path, checks_dir: &Path) {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("cannot scan {} for legacy scripts: {e}", root.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(SCRIPT_EXTENSION) {
            continue;
        }
        let Some(file_name) = path.file_name() else { continue };
        let dest = checks_dir.join(file_name);
        match fs::rename(&path, &dest) {
            Ok(()) => log::info!("relocated legacy script {} -> {}", path.display(), dest.display()),
            Err(e) => {
                // File stays put; it may now exist in both places.
                log::error!(
                    "failed to relocate legacy script {} to {}: {e}",
                    path.display(),
                    checks_dir.display()
                );
            }
        }
    }
}

/// Discover and load every check script under `root`. Files that fail to
/// load are skipped with a logged error; the rest still load.
pub fn load_all(root: &Path, collection: &SharedCollection) -> Vec<Box<dyn Check>> {
    let checks_dir = match ensure_checks_dir(root) {
        Ok(dir) => dir,
        Err(e) => {
            log::error!("cannot create checks directory under {}: {e}", root.display());
            return Vec::new();
        }
    };

    migrate_legacy_scripts(root, &checks_dir);

    let mut paths: Vec<PathBuf> = match fs::read_dir(&checks_dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(SCRIPT_EXTENSION)
            })
            .collect(),
        Err(e) => {
            log::error!("cannot scan {}: {e}", checks_dir.display());
            return Vec::new();
        }
    };
    paths.sort();

    let mut checks: Vec<Box<dyn Check>> = Vec::new();
    for path in paths {
        match ScriptCheck::load(&path, Rc::clone(collection)) {
            Ok(check) => {
                log::info!("loaded check script `{}` from {}", check.name(), path.display());
                checks.push(Box::new(check));
            }
            Err(e) => log::error!("{e}"),
        }
    }
    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::LiveCollection;

    #[test]
    fn test_starter_script_created_once() {
        let root = tempfile::tempdir().unwrap();
        let dir = ensure_checks_dir(root.path()).unwrap();
        let starter = dir.join(STARTER_SCRIPT);
        assert!(starter.is_file());

        // Deleting the starter does not bring it back while the directory
        // still exists.
        fs::remove_file(&starter).unwrap();
        ensure_checks_dir(root.path()).unwrap();
        assert!(!starter.exists());
    }

    #[test]
    fn test_starter_script_loads() {
        let root = tempfile::tempdir().unwrap();
        let collection = LiveCollection::new_shared();
        let checks = load_all(root.path(), &collection);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name(), "Script folder notice");
    }

    #[test]
    fn test_legacy_scripts_are_relocated() {
        let root = tempfile::tempdir().unwrap();
        let legacy = root.path().join("old_check.rhai");
        fs::write(
            &legacy,
            r#"
                let name = "Old check";
                fn run(notes, bombs, arcs, chains, events, walls, custom_events, bpm_events, params) { () }
            "#,
        )
        .unwrap();

        let collection = LiveCollection::new_shared();
        let checks = load_all(root.path(), &collection);

        assert!(!legacy.exists());
        assert!(root.path().join(CHECKS_DIR).join("old_check.rhai").is_file());
        assert!(checks.iter().any(|c| c.name() == "Old check"));
    }

    #[test]
    fn test_malformed_script_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let dir = ensure_checks_dir(root.path()).unwrap();
        fs::write(dir.join("broken.rhai"), "not valid rhai {{{").unwrap();
        fs::write(
            dir.join("good.rhai"),
            r#"
                let name = "Good";
                fn run(notes, bombs, arcs, chains, events, walls, custom_events, bpm_events, params) { () }
            "#,
        )
        .unwrap();

        let collection = LiveCollection::new_shared();
        let checks = load_all(root.path(), &collection);
        // Starter + good; broken skipped.
        assert_eq!(checks.len(), 2);
        assert!(checks.iter().any(|c| c.name() == "Good"));
    }

    #[test]
    fn test_non_script_files_ignored() {
        let root = tempfile::tempdir().unwrap();
        let dir = ensure_checks_dir(root.path()).unwrap();
        fs::write(dir.join("notes.txt"), "not a script").unwrap();

        let collection = LiveCollection::new_shared();
        let checks = load_all(root.path(), &collection);
        assert_eq!(checks.len(), 1);
    }
}
