//! Integration tests for the statelab CLI commands.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use statelab::cli::{Cli, execute};
use statelab_core::formats::plain;
use statelab_core::{Elements, StateFragment, StateId, StatelabError, elements_from_bytes};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// HELPERS
// =============================================================================

fn run(args: &[&str]) -> Result<(), StatelabError> {
    let mut argv = vec!["statelab", "--quiet"];
    argv.extend_from_slice(args);
    execute(Cli::parse_from(argv))
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn read_document(path: &Path) -> Elements {
    plain::from_json(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn write_script(dir: &TempDir, name: &str, script: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, script).unwrap();
    path
}

/// Fresh document in a temp dir.
fn init_document() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("machine.json");
    run(&["-D", path_str(&doc), "init"]).unwrap();
    (dir, doc)
}

const NESTED_SCRIPT: &str = r#"[
    {"intent": "create_state", "name": "A", "bounds": {"x": 0, "y": 0, "width": 100, "height": 60}},
    {"intent": "create_state", "name": "B", "bounds": {"x": 10, "y": 10, "width": 30, "height": 20}},
    {"intent": "create_state", "name": "C", "bounds": {"x": 400, "y": 0, "width": 50, "height": 50}},
    {"intent": "create_transition", "source": "state-000002", "target": "state-000003"},
    {"intent": "change_initial_state", "id": "state-000001"}
]"#;

fn apply(doc: &Path, script: &Path) -> Result<(), StatelabError> {
    run(&["-D", path_str(doc), "apply", "-s", path_str(script)])
}

// =============================================================================
// INIT
// =============================================================================

#[test]
fn test_init_creates_empty_document() {
    let (_dir, doc) = init_document();
    let elements = read_document(&doc);

    assert_eq!(elements.platform, "generic");
    assert!(elements.states.is_empty());
    assert!(elements.initial_state.is_none());
}

#[test]
fn test_init_refuses_to_overwrite() {
    let (_dir, doc) = init_document();
    assert!(run(&["-D", path_str(&doc), "init"]).is_err());
    assert!(run(&["-D", path_str(&doc), "init", "--force"]).is_ok());
}

#[test]
fn test_init_rejects_unknown_platform() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("machine.json");
    let result = run(&["-D", path_str(&doc), "init", "-p", "nowhere"]);

    assert!(matches!(result, Err(StatelabError::PlatformResolution(_))));
    assert!(!doc.exists());
}

#[test]
fn test_commands_require_existing_document() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("missing.json");
    assert!(matches!(
        run(&["-D", path_str(&doc), "status"]),
        Err(StatelabError::Io(_))
    ));
}

// =============================================================================
// APPLY
// =============================================================================

#[test]
fn test_apply_nests_and_saves() {
    let (dir, doc) = init_document();
    let script = write_script(&dir, "edits.json", NESTED_SCRIPT);

    apply(&doc, &script).unwrap();

    let elements = read_document(&doc);
    assert_eq!(elements.states.len(), 3);
    let a = StateId::new("state-000001");
    let b = StateId::new("state-000002");
    assert_eq!(elements.states[&b].parent, Some(a.clone()));
    assert!(elements.states[&a].children.contains(&b));
    assert_eq!(elements.transitions.len(), 1);
    assert_eq!(elements.initial_state, Some(a));
}

#[test]
fn test_apply_with_undo_drops_tail() {
    let (dir, doc) = init_document();
    let script = write_script(&dir, "edits.json", NESTED_SCRIPT);

    run(&[
        "-D",
        path_str(&doc),
        "apply",
        "-s",
        path_str(&script),
        "--undo",
        "2",
    ])
    .unwrap();

    let elements = read_document(&doc);
    assert_eq!(elements.states.len(), 3);
    assert!(elements.transitions.is_empty());
    assert!(elements.initial_state.is_none());
}

#[test]
fn test_failed_script_leaves_document_untouched() {
    let (dir, doc) = init_document();
    let before = std::fs::read_to_string(&doc).unwrap();
    let script = write_script(
        &dir,
        "bad.json",
        r#"[
            {"intent": "create_state", "name": "A", "bounds": {"x": 0, "y": 0, "width": 100, "height": 60}},
            {"intent": "delete_state", "id": "state-999999"}
        ]"#,
    );

    let result = apply(&doc, &script);

    assert!(matches!(result, Err(StatelabError::UnknownReference { .. })));
    assert_eq!(std::fs::read_to_string(&doc).unwrap(), before);
}

#[test]
fn test_malformed_script_is_rejected() {
    let (dir, doc) = init_document();
    let script = write_script(&dir, "bad.json", r#"[{"intent": "teleport"}]"#);
    assert!(matches!(
        apply(&doc, &script),
        Err(StatelabError::Deserialization(_))
    ));
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

#[test]
fn test_snapshot_export_import_roundtrip() {
    let (dir, doc) = init_document();
    let script = write_script(&dir, "edits.json", NESTED_SCRIPT);
    apply(&doc, &script).unwrap();

    let snapshot = dir.path().join("machine.bin");
    run(&[
        "-D",
        path_str(&doc),
        "export",
        "-o",
        path_str(&snapshot),
        "-t",
        "snapshot",
    ])
    .unwrap();

    let copy = dir.path().join("copy.json");
    run(&[
        "-D",
        path_str(&copy),
        "import",
        "-i",
        path_str(&snapshot),
        "-t",
        "snapshot",
    ])
    .unwrap();

    assert_eq!(read_document(&copy), read_document(&doc));
}

#[test]
fn test_interchange_export_import_keeps_structure() {
    let (dir, doc) = init_document();
    let script = write_script(&dir, "edits.json", NESTED_SCRIPT);
    apply(&doc, &script).unwrap();

    let exported = dir.path().join("machine.interchange.json");
    run(&[
        "-D",
        path_str(&doc),
        "export",
        "-o",
        path_str(&exported),
        "-t",
        "interchange",
    ])
    .unwrap();

    let text = std::fs::read_to_string(&exported).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["format"], "statelab-interchange");
    assert_eq!(value["states"].as_array().unwrap().len(), 3);

    let copy = dir.path().join("copy.json");
    run(&["-D", path_str(&copy), "import", "-i", path_str(&exported)]).unwrap();

    let original = read_document(&doc);
    let imported = read_document(&copy);
    assert_eq!(imported.states.len(), original.states.len());
    for (id, state) in &original.states {
        assert_eq!(imported.states[id].parent, state.parent);
    }
    assert_eq!(imported.transitions.len(), 1);
    assert_eq!(imported.initial_state, original.initial_state);
}

#[test]
fn test_export_rejects_unknown_format() {
    let (dir, doc) = init_document();
    let out = dir.path().join("out.xml");
    assert!(run(&["-D", path_str(&doc), "export", "-o", path_str(&out), "-t", "xml"]).is_err());
    assert!(!out.exists());
}

// =============================================================================
// COPY / CHECK / PLATFORMS
// =============================================================================

#[test]
fn test_copy_writes_fragment() {
    let (dir, doc) = init_document();
    let script = write_script(&dir, "edits.json", NESTED_SCRIPT);
    apply(&doc, &script).unwrap();

    let fragment_path = dir.path().join("fragment.json");
    run(&[
        "-D",
        path_str(&doc),
        "copy",
        "-s",
        "state-000001",
        "-o",
        path_str(&fragment_path),
    ])
    .unwrap();

    let fragment: StateFragment =
        serde_json::from_str(&std::fs::read_to_string(&fragment_path).unwrap()).unwrap();
    assert_eq!(fragment.root, StateId::new("state-000001"));
    assert_eq!(fragment.states.len(), 2);
}

#[test]
fn test_check_reports_dangling_component() {
    let (dir, doc) = init_document();
    let script = write_script(
        &dir,
        "edits.json",
        r#"[
            {"intent": "add_component", "name": "Led1", "type": "Led"},
            {"intent": "create_state", "name": "A", "bounds": {"x": 0, "y": 0, "width": 100, "height": 60}},
            {"intent": "create_state", "name": "B", "bounds": {"x": 300, "y": 0, "width": 100, "height": 60}},
            {"intent": "create_transition", "source": "state-000001", "target": "state-000002",
             "label": {"trigger": {"component": "System", "method": "onEnter"},
                       "do": [{"component": "Led1", "method": "toggle"}]}}
        ]"#,
    );
    apply(&doc, &script).unwrap();
    assert!(run(&["-D", path_str(&doc), "check"]).is_ok());

    let removal = write_script(
        &dir,
        "remove.json",
        r#"[{"intent": "remove_component", "name": "Led1"}]"#,
    );
    apply(&doc, &removal).unwrap();
    assert!(matches!(
        run(&["-D", path_str(&doc), "check"]),
        Err(StatelabError::Structural(_))
    ));
}

#[test]
fn test_status_tree_and_platforms_succeed() {
    let (dir, doc) = init_document();
    let script = write_script(&dir, "edits.json", NESTED_SCRIPT);
    apply(&doc, &script).unwrap();

    assert!(run(&["-D", path_str(&doc), "status"]).is_ok());
    assert!(run(&["-D", path_str(&doc), "--json-mode", "status"]).is_ok());
    assert!(run(&["-D", path_str(&doc), "tree"]).is_ok());
    assert!(run(&["-D", path_str(&doc), "--json-mode", "tree"]).is_ok());
    assert!(run(&["platforms", "--detailed"]).is_ok());
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_config_catalogue_and_autosave() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("board.toml"),
        r#"
id = "board"

[components.Relay]
methods = [{ name = "close" }]
"#,
    )
    .unwrap();
    let config = dir.path().join("statelab.toml");
    std::fs::write(
        &config,
        "platform = \"board\"\ncatalogues = [\"board.toml\"]\nautosave = \"auto/snapshot.bin\"\n",
    )
    .unwrap();
    let doc = dir.path().join("machine.json");

    run(&["-c", path_str(&config), "-D", path_str(&doc), "init"]).unwrap();
    assert_eq!(read_document(&doc).platform, "board");

    let script = write_script(
        &dir,
        "edits.json",
        r#"[{"intent": "add_component", "name": "R1", "type": "Relay"}]"#,
    );
    run(&[
        "-c",
        path_str(&config),
        "-D",
        path_str(&doc),
        "apply",
        "-s",
        path_str(&script),
    ])
    .unwrap();

    let bytes = std::fs::read(dir.path().join("auto").join("snapshot.bin")).unwrap();
    let restored = elements_from_bytes(&bytes).unwrap();
    assert_eq!(restored, read_document(&doc));
    assert!(restored.components.contains_key("R1"));
}

#[test]
fn test_document_on_unconfigured_platform_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("machine.json");
    std::fs::write(&doc, r#"{"platform": "elsewhere"}"#).unwrap();

    assert!(matches!(
        run(&["-D", path_str(&doc), "status"]),
        Err(StatelabError::PlatformResolution(_))
    ));
}
