//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::Config;
use serde_json::json;
use statelab_core::primitives::{BUILTIN_PLATFORM, MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH};
use statelab_core::{
    Document, Editor, Entry, Hierarchy, Intent, Outcome, PlatformBinding, PlatformRegistry,
    StateId, StatelabError,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for intent scripts (16 MB).
const MAX_SCRIPT_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum file size for documents and imports.
const MAX_IMPORT_FILE_SIZE: u64 = MAX_DOCUMENT_SIZE as u64;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), StatelabError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| StatelabError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(StatelabError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input path: canonicalized, existing, a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, StatelabError> {
    let canonical = path.canonicalize().map_err(|e| {
        StatelabError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(StatelabError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, StatelabError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let canonical_parent = parent.canonicalize().map_err(|e| {
        StatelabError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(StatelabError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| StatelabError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn read_bytes(path: &Path, max_size: u64) -> Result<Vec<u8>, StatelabError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    std::fs::read(&validated).map_err(|e| StatelabError::Io(format!("Read file: {}", e)))
}

fn read_text(path: &Path, max_size: u64) -> Result<String, StatelabError> {
    String::from_utf8(read_bytes(path, max_size)?)
        .map_err(|e| StatelabError::Deserialization(format!("File is not UTF-8: {}", e)))
}

fn write_file(path: &Path, data: &[u8]) -> Result<PathBuf, StatelabError> {
    let validated = validate_output_path(path)?;
    std::fs::write(&validated, data).map_err(|e| StatelabError::Io(format!("Write file: {}", e)))?;
    Ok(validated)
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Resolved global options shared by every command.
#[derive(Debug)]
pub struct Context {
    pub document: PathBuf,
    pub config: Config,
    pub json_mode: bool,
}

impl Context {
    pub fn new(
        document: PathBuf,
        config: Option<&Path>,
        json_mode: bool,
    ) -> Result<Self, StatelabError> {
        Ok(Self {
            document,
            config: Config::discover(config)?,
            json_mode,
        })
    }

    /// An editor with an empty document on `platform`.
    pub fn new_editor(&self, platform: &str) -> Result<Editor, StatelabError> {
        Editor::new(self.config.registry()?, platform)
    }

    /// An editor holding the document file.
    pub fn open(&self) -> Result<Editor, StatelabError> {
        if !self.document.exists() {
            return Err(StatelabError::Io(format!(
                "Document '{}' not found. Run `statelab init` first.",
                self.document.display()
            )));
        }
        let text = read_text(&self.document, MAX_IMPORT_FILE_SIZE)?;
        let mut editor = self.new_editor(BUILTIN_PLATFORM)?;
        editor.load(&text)?;
        Ok(editor)
    }

    /// Write the document back in plain form.
    pub fn save(&self, editor: &mut Editor) -> Result<(), StatelabError> {
        let text = editor.save()?;
        write_file(&self.document, text.as_bytes())?;
        tracing::debug!(path = %self.document.display(), bytes = text.len(), "document saved");
        Ok(())
    }

    fn autosave(&self, editor: &Editor) -> Result<(), StatelabError> {
        let Some(path) = self.config.autosave_path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StatelabError::Io(format!("Create autosave directory: {}", e)))?;
        }
        let bytes = editor.snapshot_bytes()?;
        write_file(&path, &bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "autosave written");
        Ok(())
    }
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create a new empty document.
pub fn cmd_init(ctx: &Context, force: bool, platform: Option<&str>) -> Result<(), StatelabError> {
    if ctx.document.exists() && !force {
        return Err(StatelabError::Io(
            "Document already exists. Use --force to overwrite.".to_string(),
        ));
    }

    let platform = platform.unwrap_or_else(|| ctx.config.platform());
    let mut editor = ctx.new_editor(platform)?;
    ctx.save(&mut editor)?;

    println!(
        "Initialized new {} document at {:?}",
        platform, ctx.document
    );
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show document summary.
pub fn cmd_status(ctx: &Context) -> Result<(), StatelabError> {
    let editor = ctx.open()?;
    let doc = editor.document();

    let roots = Hierarchy::roots(doc).len();
    let max_depth = doc
        .states()
        .map(|(id, _)| Hierarchy::depth(doc, id))
        .max()
        .unwrap_or(0);
    let initial = doc.initial_state().map(|id| state_label(doc, id));

    if ctx.json_mode {
        print_json(&json!({
            "document": ctx.document.to_string_lossy(),
            "platform": doc.platform(),
            "states": doc.state_count(),
            "root_states": roots,
            "max_depth": max_depth,
            "transitions": doc.transition_count(),
            "notes": doc.notes().count(),
            "components": doc.components().map(|(name, _)| name.clone()).collect::<Vec<_>>(),
            "initial_state": doc.initial_state(),
        }));
        return Ok(());
    }

    println!("statelab Document Status");
    println!("========================");
    println!("Document: {:?}", ctx.document);
    println!("Platform: {}", doc.platform());
    println!();
    println!("States:      {} ({} at root)", doc.state_count(), roots);
    println!("Max Depth:   {}", max_depth);
    println!("Transitions: {}", doc.transition_count());
    println!("Notes:       {}", doc.notes().count());
    println!("Components:  {}", doc.components().count());
    println!(
        "Initial:     {}",
        initial.unwrap_or_else(|| "(none)".to_string())
    );

    Ok(())
}

// =============================================================================
// TREE COMMAND
// =============================================================================

/// Print the containment tree, listing each transition under its owner.
pub fn cmd_tree(ctx: &Context) -> Result<(), StatelabError> {
    let editor = ctx.open()?;
    let doc = editor.document();
    let roots = Hierarchy::roots(doc);

    if ctx.json_mode {
        let states: Vec<serde_json::Value> =
            roots.iter().map(|id| state_json(doc, id, 0)).collect();
        print_json(&json!({
            "states": states,
            "transitions": owned_transitions(doc, None),
        }));
        return Ok(());
    }

    let mut lines = Vec::new();
    for root in &roots {
        tree_lines(doc, root, 0, &mut lines);
    }
    for line in owned_transitions(doc, None) {
        lines.push(format!("-> {}", line));
    }
    if lines.is_empty() {
        println!("(empty document)");
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

fn state_label(doc: &Document, id: &StateId) -> String {
    let name = doc.state(id).map(|s| s.name.as_str()).unwrap_or("?");
    format!("{} [{}]", name, id)
}

/// Transitions owned by `owner` (`None` = root), rendered one per line.
fn owned_transitions(doc: &Document, owner: Option<&StateId>) -> Vec<String> {
    doc.transitions()
        .filter(|(id, _)| doc.ownership(id) == Some(owner))
        .map(|(id, transition)| {
            let label = transition
                .label
                .as_ref()
                .map(|l| l.describe())
                .filter(|text| !text.is_empty());
            let mut line = format!(
                "{} -> {} ({})",
                state_label(doc, &transition.source),
                state_label(doc, &transition.target),
                id
            );
            if let Some(label) = label {
                line.push_str(&format!(" : {}", label));
            }
            line
        })
        .collect()
}

fn tree_lines(doc: &Document, id: &StateId, level: usize, out: &mut Vec<String>) {
    let Some(state) = doc.state(id) else {
        return;
    };
    if level > MAX_NESTING_DEPTH {
        return;
    }
    let indent = "  ".repeat(level);
    let marker = if doc.initial_state() == Some(id) {
        " (initial)"
    } else {
        ""
    };
    out.push(format!("{}{}{}", indent, state_label(doc, id), marker));
    for event in &state.events {
        out.push(format!(
            "{}  on {}.{} ({} actions)",
            indent,
            event.trigger.component,
            event.trigger.method,
            event.actions.len()
        ));
    }
    for line in owned_transitions(doc, Some(id)) {
        out.push(format!("{}  -> {}", indent, line));
    }
    for child in &state.children {
        tree_lines(doc, child, level + 1, out);
    }
}

fn state_json(doc: &Document, id: &StateId, level: usize) -> serde_json::Value {
    let Some(state) = doc.state(id) else {
        return serde_json::Value::Null;
    };
    let children: Vec<serde_json::Value> = if level > MAX_NESTING_DEPTH {
        Vec::new()
    } else {
        state
            .children
            .iter()
            .map(|child| state_json(doc, child, level + 1))
            .collect()
    };
    json!({
        "id": id,
        "name": state.name,
        "absolute": Hierarchy::absolute_bounds(doc, id),
        "events": state.events.len(),
        "transitions": owned_transitions(doc, Some(id)),
        "children": children,
    })
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Report unresolved component references. Fails when any exist.
pub fn cmd_check(ctx: &Context) -> Result<(), StatelabError> {
    let editor = ctx.open()?;
    let problems = editor.check_references()?;
    let vacant = editor.vacant_components()?;

    if ctx.json_mode {
        print_json(&json!({
            "problems": problems,
            "vacant_components": vacant,
        }));
    } else if problems.is_empty() {
        println!("All component references resolve.");
        println!("Addable component types: {}", vacant.join(", "));
    } else {
        println!("Unresolved references:");
        for problem in &problems {
            println!("  {}", problem);
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(StatelabError::Structural(format!(
            "{} unresolved component references",
            problems.len()
        )))
    }
}

// =============================================================================
// APPLY COMMAND
// =============================================================================

/// Run an intent script, optionally undo the tail, then save.
///
/// Any failing intent aborts the run and leaves the file untouched.
pub fn cmd_apply(ctx: &Context, script: &Path, undo: usize) -> Result<(), StatelabError> {
    tracing::info!("Applying {:?}", script);

    let text = read_text(script, MAX_SCRIPT_FILE_SIZE)?;
    let intents: Vec<Intent> = serde_json::from_str(&text)
        .map_err(|e| StatelabError::Deserialization(format!("Invalid intent script: {}", e)))?;

    let mut editor = ctx.open()?;
    let mut created = Vec::new();
    let count = intents.len();

    for (index, intent) in intents.into_iter().enumerate() {
        let outcome = editor.dispatch(intent).inspect_err(|e| {
            tracing::error!(index, error = %e, "intent failed; document not saved");
        })?;
        match outcome {
            Outcome::StateCreated(id) => created.push(id.to_string()),
            Outcome::TransitionCreated(id) => created.push(id.to_string()),
            Outcome::NoteCreated(id) => created.push(id.to_string()),
            Outcome::Done | Outcome::Replayed(_) => {}
        }
    }

    let mut undone = 0usize;
    while undone < undo && editor.undo().is_some() {
        undone += 1;
    }

    let changes = editor.drain_changes().len();
    let history = editor.history().undo_len();
    ctx.save(&mut editor)?;
    ctx.autosave(&editor)?;

    if ctx.json_mode {
        print_json(&json!({
            "applied": count,
            "undone": undone,
            "created": created,
            "changes": changes,
            "history": history,
        }));
        return Ok(());
    }

    println!("Applied {} intents ({} undone)", count, undone);
    if !created.is_empty() {
        println!("Created: {}", created.join(", "));
    }
    println!(
        "Document now has {} states, {} transitions",
        editor.document().state_count(),
        editor.document().transition_count()
    );
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the document.
pub fn cmd_export(ctx: &Context, output: &Path, format: &str) -> Result<(), StatelabError> {
    let mut editor = ctx.open()?;

    let data = match format {
        "json" => editor.save()?.into_bytes(),
        "interchange" => editor.export_interchange()?.into_bytes(),
        "snapshot" => editor.snapshot_bytes()?,
        _ => {
            return Err(StatelabError::Serialization(format!(
                "Unknown format: {}. Use: json, interchange, snapshot",
                format
            )));
        }
    };

    let written = write_file(output, &data)?;
    println!("Exported {} bytes to {:?}", data.len(), written);
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Replace the document with the contents of another file.
pub fn cmd_import(ctx: &Context, input: &Path, format: &str) -> Result<(), StatelabError> {
    let data = read_bytes(input, MAX_IMPORT_FILE_SIZE)?;
    let mut editor = ctx.new_editor(BUILTIN_PLATFORM)?;

    let text = || {
        std::str::from_utf8(&data)
            .map_err(|e| StatelabError::Deserialization(format!("File is not UTF-8: {}", e)))
    };
    match format {
        "interchange" => editor.import_interchange(text()?)?,
        "json" => editor.load(text()?)?,
        "snapshot" => editor.load_snapshot(&data)?,
        _ => {
            return Err(StatelabError::Deserialization(format!(
                "Unknown format: {}. Use: interchange, snapshot, json",
                format
            )));
        }
    }

    ctx.save(&mut editor)?;
    println!(
        "Imported document: {} states, {} transitions",
        editor.document().state_count(),
        editor.document().transition_count()
    );
    Ok(())
}

// =============================================================================
// COPY COMMAND
// =============================================================================

/// Print or write the clipboard fragment of a state subtree.
pub fn cmd_copy(ctx: &Context, state: &str, output: Option<&Path>) -> Result<(), StatelabError> {
    let editor = ctx.open()?;
    let fragment = editor.copy_state(&StateId::new(state))?;

    match output {
        Some(path) => {
            let written = write_file(path, fragment.as_bytes())?;
            println!("Copied {} to {:?}", state, written);
        }
        None => println!("{}", fragment),
    }
    Ok(())
}

// =============================================================================
// PLATFORMS COMMAND
// =============================================================================

/// List platform catalogues and their component types.
pub fn cmd_platforms(ctx: &Context, detailed: bool) -> Result<(), StatelabError> {
    let registry = ctx.config.registry()?;

    if ctx.json_mode {
        print_json(&platforms_json(&registry)?);
        return Ok(());
    }

    for id in registry.ids() {
        let platform = registry.resolve(id)?;
        let marker = if id == ctx.config.platform() {
            " (default)"
        } else {
            ""
        };
        println!("{}{}", id, marker);
        for type_id in platform.component_types() {
            let singleton = if platform.is_singleton(&type_id) {
                " [singleton]"
            } else {
                ""
            };
            println!("  {}{}", type_id, singleton);
            if detailed {
                let names = |entries: Vec<Entry>| -> String {
                    entries
                        .into_iter()
                        .map(|e| e.name)
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                println!("    events:    {}", names(platform.events(&type_id)));
                println!("    actions:   {}", names(platform.actions(&type_id)));
                println!("    variables: {}", names(platform.variables(&type_id)));
            }
        }
    }
    Ok(())
}

fn platforms_json(registry: &PlatformRegistry) -> Result<serde_json::Value, StatelabError> {
    let mut platforms = serde_json::Map::new();
    for id in registry.ids() {
        let platform = registry.resolve(id)?;
        let mut types = serde_json::Map::new();
        for type_id in platform.component_types() {
            types.insert(
                type_id.clone(),
                json!({
                    "singleton": platform.is_singleton(&type_id),
                    "events": platform.events(&type_id),
                    "actions": platform.actions(&type_id),
                    "variables": platform.variables(&type_id),
                }),
            );
        }
        platforms.insert(id.to_string(), serde_json::Value::Object(types));
    }
    Ok(serde_json::Value::Object(platforms))
}
