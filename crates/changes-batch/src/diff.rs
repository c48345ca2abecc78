use std::path::Path;

use similar::{Algorithm, TextDiff};

/// Lines of unchanged context kept around each edited hunk.
const CONTEXT_LINES: usize = 2;

/// Unified diff from a source document to its flattened text, labelled with
/// the document's path relative to the input folder. `None` when flattening
/// left the document untouched.
pub fn flatten_diff(relative: &Path, original: &str, flattened: &str) -> Option<String> {
    if original == flattened {
        return None;
    }

    let name = relative.to_string_lossy();
    let rendered = TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(original, flattened)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&name, &format!("{name} (flattened)"))
        .to_string();
    Some(rendered)
}
