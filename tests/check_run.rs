//! End-to-end: difficulty file on disk, script check on disk, one run
//! through the runner, then problem navigation.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use mapcheck::beatmap::ObjectId;
use mapcheck::format;
use mapcheck::loader;
use mapcheck::registry::CheckRegistry;
use mapcheck::runner::{CheckRunner, EditorShell, OutlineColor, ParamWidgetSnapshot};

#[derive(Debug, Default)]
struct ShellLog {
    outlines: Vec<(ObjectId, OutlineColor)>,
    seeks: Vec<f32>,
    status: Vec<String>,
}

#[derive(Clone, Default)]
struct RecordingShell(Rc<RefCell<ShellLog>>);

impl EditorShell for RecordingShell {
    fn set_outline(&mut self, id: ObjectId, color: OutlineColor) {
        self.0.borrow_mut().outlines.push((id, color));
    }

    fn clear_outline(&mut self, _id: ObjectId) {}

    fn is_selected(&self, _id: ObjectId) -> bool {
        false
    }

    fn seek_to(&mut self, beat: f32) {
        self.0.borrow_mut().seeks.push(beat);
    }

    fn set_status(&mut self, text: &str) {
        self.0.borrow_mut().status.push(text.to_string());
    }
}

const MAP_V3: &str = r#"{
    "version": "3.2.0",
    "colorNotes": [
        { "b": 1.0, "x": 1, "y": 0, "c": 0, "d": 1 },
        { "b": 2.0, "x": 1, "y": 3, "c": 1, "d": 0 },
        { "b": 3.0, "x": 2, "y": 4, "c": 0, "d": 8 }
    ],
    "bombNotes": [{ "b": 2.5, "x": 2, "y": 1 }],
    "bpmEvents": [{ "b": 0.0, "m": 150.0 }]
}"#;

const HIGH_NOTE_CHECK: &str = r#"
let name = "High notes";
let params = [
    #{ name: "max layer", type: "int", default: "2" },
];

fn run(notes, bombs, arcs, chains, events, walls, custom_events, bpm_events, params) {
    let report = [];
    for note in notes {
        if note.y > params["max layer"] {
            report.push(#{ object: note, reason: "note above layer " + params["max layer"] });
        }
    }
    report
}
"#;

#[test]
fn test_scripted_check_against_map_file() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("ExpertPlus.dat");
    fs::write(&map_path, MAP_V3).unwrap();

    let checks_dir = dir.path().join("checks");
    fs::create_dir(&checks_dir).unwrap();
    fs::write(checks_dir.join("high_notes.rhai"), HIGH_NOTE_CHECK).unwrap();

    let (version, collection) = format::load_file(&map_path).unwrap();

    let mut registry = CheckRegistry::with_builtins();
    for check in loader::load_all(dir.path(), &collection) {
        registry.register(check);
    }
    assert!(registry.names().contains(&"High notes"));

    let shell = RecordingShell::default();
    let mut runner = CheckRunner::new(collection, registry, Box::new(shell.clone()), version);

    runner
        .run_check("High notes", &[ParamWidgetSnapshot::Text("2".to_string())])
        .unwrap();

    let result = runner.result().unwrap();
    assert_eq!(result.all().len(), 2);
    assert_eq!(result.all()[0].beat, 2.0);
    assert_eq!(result.all()[1].beat, 3.0);
    assert_eq!(
        shell.0.borrow().status.last().unwrap(),
        "2 problems found"
    );
    assert_eq!(shell.0.borrow().outlines.len(), 2);

    // First navigation lands on the first problem; the next wraps forward.
    runner.next_block(1);
    runner.next_block(1);
    assert_eq!(shell.0.borrow().seeks, vec![2.0, 3.0]);
    assert_eq!(
        shell.0.borrow().status.last().unwrap(),
        "note above layer 2"
    );
}

#[test]
fn test_builtin_check_against_map_file() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("stacked.dat");
    fs::write(
        &map_path,
        r#"{
            "version": "3.2.0",
            "colorNotes": [
                { "b": 1.0, "x": 1, "y": 0, "c": 0, "d": 1 },
                { "b": 1.0, "x": 1, "y": 0, "c": 1, "d": 1 },
                { "b": 2.0, "x": 2, "y": 0, "c": 0, "d": 1 }
            ]
        }"#,
    )
    .unwrap();

    let (version, collection) = format::load_file(&map_path).unwrap();
    let registry = CheckRegistry::with_builtins();
    let shell = RecordingShell::default();
    let mut runner = CheckRunner::new(collection, registry, Box::new(shell.clone()), version);

    runner
        .run_check("Stacked notes", &[ParamWidgetSnapshot::Text(String::new())])
        .unwrap();

    let result = runner.result().unwrap();
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].beat, 1.0);
}

#[test]
fn test_starter_script_installed_and_loadable() {
    let dir = tempfile::tempdir().unwrap();
    let collection = mapcheck::collection::LiveCollection::new_shared();

    let checks = loader::load_all(dir.path(), &collection);
    assert!(dir.path().join("checks").join("welcome.rhai").exists());
    assert_eq!(checks.len(), 1);
}
