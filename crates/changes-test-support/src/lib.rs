//! Shared test harness utilities for changes-flatten crates.

use std::fs;
use std::path::{Path, PathBuf};

use changes_config::Config;

/// A small document exercising every command kind and the package import.
pub const SAMPLE_DOCUMENT: &str = "\\documentclass{article}\n\
\\usepackage[final]{changes}\n\
\\begin{document}\n\
This is \\added{new} and \\deleted{old} text.\n\
We \\replaced{accept}{reject} it and \\highlight{mark} it.\n\
\\end{document}\n";

/// `SAMPLE_DOCUMENT` after flattening with default settings.
pub const SAMPLE_FLATTENED: &str = "\\documentclass{article}\n\
% \\usepackage[final]{changes}\n\
\\begin{document}\n\
This is new and  text.\n\
We accept it and mark it.\n\
\\end{document}\n";

/// Returns the built-in configuration rooted at `working_dir`.
pub fn test_config(working_dir: &Path) -> Config {
    Config::builtin(working_dir)
}

/// Writes `contents` to `dir/relative`, creating parent folders.
pub fn write_document(dir: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture folder");
    }
    fs::write(&path, contents).expect("write fixture document");
    path
}
