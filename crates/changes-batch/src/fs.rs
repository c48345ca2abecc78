use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::Builder;

use crate::discover::DocumentJob;

/// Writes the flattened text of `job` to its destination.
///
/// The text goes to a hidden `.<name>.partial` file beside the destination and
/// is renamed over it once synced, so an interrupted run never leaves a
/// truncated document in the output folder. The result carries the source
/// document's permissions.
pub fn write_output(job: &DocumentJob, contents: &str) -> io::Result<()> {
    let folder = job
        .destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(folder)?;

    let name = job
        .destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut partial = Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".partial")
        .tempfile_in(folder)?;

    partial.write_all(contents.as_bytes())?;
    partial.as_file().sync_all()?;
    partial
        .as_file()
        .set_permissions(fs::metadata(&job.source)?.permissions())?;

    partial.persist(&job.destination).map_err(|err| err.error)?;
    Ok(())
}

/// Resolves `path` to the location it names on disk, following symlinks and
/// `..` through every existing ancestor. Components below the deepest existing
/// ancestor are appended as written, with `.` dropped and `..` popping.
pub fn physical_location(path: &Path) -> io::Result<PathBuf> {
    let mut resolved = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir()?
    };

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => {
                resolved.push(other);
                if let Ok(real) = fs::canonicalize(&resolved) {
                    resolved = real;
                }
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn job(source: PathBuf, destination: PathBuf) -> DocumentJob {
        DocumentJob {
            relative: PathBuf::from(destination.file_name().unwrap()),
            source,
            destination,
        }
    }

    #[test]
    fn replaces_existing_output_without_leftovers() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("paper.tex");
        let out = dir.path().join("out");
        fs::write(&source, "\\added{new}").unwrap();
        fs::create_dir(&out).unwrap();
        fs::write(out.join("paper.tex"), "stale").unwrap();

        write_output(&job(source, out.join("paper.tex")), "new").unwrap();

        assert_eq!(fs::read_to_string(out.join("paper.tex")).unwrap(), "new");
        assert_eq!(fs::read_dir(&out).unwrap().count(), 1);
    }

    #[test]
    fn creates_missing_output_folders() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("one.tex");
        fs::write(&source, "").unwrap();
        let destination = dir.path().join("out/chapters/one.tex");

        write_output(&job(source, destination.clone()), "text").unwrap();

        assert_eq!(fs::read_to_string(&destination).unwrap(), "text");
    }

    #[cfg(unix)]
    #[test]
    fn output_takes_source_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let source = dir.path().join("paper.tex");
        let destination = dir.path().join("out/paper.tex");
        fs::write(&source, "x").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o640)).unwrap();
        fs::create_dir(dir.path().join("out")).unwrap();
        fs::write(&destination, "old").unwrap();
        fs::set_permissions(&destination, fs::Permissions::from_mode(0o600)).unwrap();

        write_output(&job(source, destination.clone()), "x").unwrap();

        let mode = fs::metadata(&destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn physical_location_collapses_parent_components() {
        let dir = tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).unwrap();

        let aliased = physical_location(&docs.join("missing").join("..")).unwrap();
        let nested_new = physical_location(&docs.join("./new/deeper/..")).unwrap();

        let real_docs = fs::canonicalize(&docs).unwrap();
        assert_eq!(aliased, real_docs);
        assert_eq!(nested_new, real_docs.join("new"));
    }

    #[cfg(unix)]
    #[test]
    fn physical_location_follows_symlinks() {
        let dir = tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).unwrap();
        std::os::unix::fs::symlink(&docs, dir.path().join("link")).unwrap();

        assert_eq!(
            physical_location(&dir.path().join("link")).unwrap(),
            physical_location(&docs).unwrap()
        );
    }
}
