/// Entry-Point Resolver
///
/// **Strategy (in order):**
/// 1. Use the statically extracted name when its class file exists
/// 2. Otherwise scan the workspace class files, skipping synthetic and nested
///    classes (`$` in the name), and take the first whose short name starts with
///    the expected simple name
/// 3. Otherwise take the first class file found at all
///
/// Step 2 exists because compilers rename things: Kotlin top-level declarations
/// in `Snippet.kt` land in `SnippetKt`, and a missing or misleading declaration
/// in the source sends the extracted name nowhere.
///
/// The walk visits entries sorted by file name so "first" is deterministic.

use crate::source::EntryName;
use std::path::{Path, MAIN_SEPARATOR};
use tracing::debug;
use walkdir::WalkDir;

const CLASS_EXTENSION: &str = "class";
const NESTED_MARKER: char = '$';

/// Fully-qualified name of the class to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint(pub String);

impl EntryPoint {
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Last segment of the qualified name
    pub fn short_name(&self) -> &str {
        short_name(&self.0)
    }
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pick the runnable class for this workspace, `None` when nothing was compiled
pub fn resolve(expected: &EntryName, workspace: &Path) -> Option<EntryPoint> {
    let qualified = expected.qualified();
    if class_file_for(&qualified, workspace).is_file() {
        debug!(entry = %qualified, "Entry point resolved from source declaration");
        return Some(EntryPoint(qualified));
    }

    let candidates = scan_classes(workspace);
    let chosen = candidates
        .iter()
        .find(|name| short_name(name).starts_with(expected.simple.as_str()))
        .or_else(|| candidates.first())
        .cloned();

    debug!(
        expected = %qualified,
        candidates = candidates.len(),
        chosen = ?chosen,
        "Entry point resolved from class scan"
    );

    chosen.map(EntryPoint)
}

fn class_file_for(qualified: &str, workspace: &Path) -> std::path::PathBuf {
    let relative = format!("{}.{}", qualified.replace('.', "/"), CLASS_EXTENSION);
    workspace.join(relative)
}

fn short_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Qualified names of all top-level class files, in walk order
fn scan_classes(workspace: &Path) -> Vec<String> {
    WalkDir::new(workspace)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry.path().extension().and_then(|ext| ext.to_str()) == Some(CLASS_EXTENSION)
        })
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(workspace).ok()?;
            let relative = relative.with_extension("");
            let name = relative
                .to_string_lossy()
                .replace(MAIN_SEPARATOR, ".")
                .replace('/', ".");
            (!name.contains(NESTED_MARKER)).then_some(name)
        })
        .collect()
}
