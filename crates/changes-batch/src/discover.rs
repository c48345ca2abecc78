use std::fs;
use std::path::{Path, PathBuf};

use changes_config::ScanSettings;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::error::{FlattenError, FlattenResult};
use crate::fs::physical_location;

/// One document to flatten and where its result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Path relative to the input folder, reused under the output folder.
    pub relative: PathBuf,
}

/// Lists the documents under `input` selected by `scan`, sorted by relative
/// path. Only the top level is searched unless `scan.recursive` is set. When
/// the output folder lives inside the input folder, under any spelling, it is
/// never descended into.
pub fn discover(input: &Path, output: &Path, scan: &ScanSettings) -> FlattenResult<Vec<DocumentJob>> {
    let max_depth = if scan.recursive { usize::MAX } else { 1 };
    let output_location = physical_location(output).ok();
    let walker = WalkDir::new(input)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_output_folder(entry, output_location.as_deref()));

    let mut jobs = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("unreadable input folder"));
                return Err(FlattenError::io(input, source));
            }
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                continue;
            }
        };

        if !entry.file_type().is_file() || !scan.matches_extension(entry.path()) {
            continue;
        }

        let relative = match entry.path().strip_prefix(input) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => continue,
        };
        if scan.is_excluded(&relative) {
            continue;
        }

        jobs.push(DocumentJob {
            source: entry.path().to_path_buf(),
            destination: output.join(&relative),
            relative,
        });
    }

    jobs.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(jobs)
}

fn is_output_folder(entry: &DirEntry, output: Option<&Path>) -> bool {
    match output {
        Some(output) if entry.file_type().is_dir() => {
            fs::canonicalize(entry.path()).is_ok_and(|location| location == output)
        }
        _ => false,
    }
}
