//! Settings for changes-flatten.
//!
//! Built-in defaults are overlaid by `.changes-flatten.toml` in the working
//! directory, then by an explicit `--config` file. Folders named in a file are
//! taken relative to the directory holding that file. Command-line arguments
//! are applied on top by the CLI.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".changes-flatten.toml";

#[derive(Clone, Debug)]
pub struct Config {
    pub paths: PathSettings,
    pub scan: ScanSettings,
    pub rewrite: RewriteSettings,
    pub sources: ConfigSources,
}

/// Source and destination folders, already made absolute.
#[derive(Clone, Debug)]
pub struct PathSettings {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Which files in the input folder count as documents.
#[derive(Clone, Debug)]
pub struct ScanSettings {
    /// Lowercase extensions without the leading dot.
    pub extensions: Vec<String>,
    pub recursive: bool,
    /// Globs matched against paths relative to the input folder.
    pub exclude: GlobSet,
}

impl ScanSettings {
    /// True when `path` carries one of the configured extensions (ASCII case-insensitive).
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.exclude.is_match(relative)
    }
}

/// Text rewrites applied after command resolution.
#[derive(Clone, Debug)]
pub struct RewriteSettings {
    pub comment_out_package: bool,
}

/// Working directory plus every layer that contributed, lowest precedence first.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    /// `None` for the built-in defaults.
    pub path: Option<PathBuf>,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            ConfigSourceKind::Default => return f.write_str("built-in defaults"),
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        match &self.path {
            Some(path) => write!(f, "{label} at {}", path.display()),
            None => f.write_str(label),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    Local,
    Override,
}

/// Where to look for settings. Both fields fall back to the process state.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot use working directory {path}: {source}")]
    WorkingDirectory { path: PathBuf, source: io::Error },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration:\n{0}")]
    Invalid(ConfigValidationErrors),
}

impl Config {
    /// Built-in defaults rooted at `working_dir`, ignoring any config files.
    pub fn builtin(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        Config {
            paths: PathSettings {
                input: working_dir.join("input"),
                output: working_dir.join("output"),
            },
            scan: ScanSettings {
                extensions: vec!["tex".to_owned()],
                recursive: false,
                exclude: GlobSet::empty(),
            },
            rewrite: RewriteSettings {
                comment_out_package: true,
            },
            sources: ConfigSources {
                working_directory: working_dir,
                layers: vec![ConfigSource {
                    kind: ConfigSourceKind::Default,
                    path: None,
                }],
            },
        }
    }

    /// Applies the local file and the override file, if any, over the
    /// defaults. Every invalid value across both files is reported at once.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = match options.working_dir {
            Some(dir) => fs::canonicalize(&dir)
                .map_err(|source| ConfigError::WorkingDirectory { path: dir, source })?,
            None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
                path: PathBuf::from("."),
                source,
            })?,
        };

        let override_path = options.override_path.map(|path| working_dir.join(path));
        if let Some(path) = &override_path {
            if !path.is_file() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let mut config = Config::builtin(&working_dir);
        let mut problems = Vec::new();

        let local_path = working_dir.join(CONFIG_FILE_NAME);
        if local_path.is_file() && override_path.as_ref() != Some(&local_path) {
            config.apply_file(ConfigSourceKind::Local, local_path, &mut problems)?;
        }
        if let Some(path) = override_path {
            config.apply_file(ConfigSourceKind::Override, path, &mut problems)?;
        }

        if problems.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(ConfigValidationErrors(problems)))
        }
    }

    fn apply_file(
        &mut self,
        kind: ConfigSourceKind,
        path: PathBuf,
        problems: &mut Vec<ConfigValidationError>,
    ) -> Result<(), ConfigError> {
        let file = SettingsFile::read(&path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let source = ConfigSource {
            kind,
            path: Some(path),
        };
        let mut reject = |setting: &'static str, message: String| {
            problems.push(ConfigValidationError {
                source: source.clone(),
                setting,
                message,
            })
        };

        if let Some(paths) = file.paths {
            if let Some(input) = paths.input {
                self.paths.input = base_dir.join(input);
            }
            if let Some(output) = paths.output {
                self.paths.output = base_dir.join(output);
            }
        }

        if let Some(scan) = file.scan {
            if let Some(raw) = scan.extensions {
                match parse_extensions(&raw) {
                    Ok(extensions) => self.scan.extensions = extensions,
                    Err(messages) => messages
                        .into_iter()
                        .for_each(|message| reject("scan.extensions", message)),
                }
            }
            if let Some(recursive) = scan.recursive {
                self.scan.recursive = recursive;
            }
            if let Some(patterns) = scan.exclude {
                match build_exclude(&patterns) {
                    Ok(set) => self.scan.exclude = set,
                    Err(messages) => messages
                        .into_iter()
                        .for_each(|message| reject("scan.exclude", message)),
                }
            }
        }

        if let Some(comment_out) = file.rewrite.and_then(|rewrite| rewrite.comment_out_package) {
            self.rewrite.comment_out_package = comment_out;
        }

        self.sources.layers.push(source);
        Ok(())
    }
}

/// Lowercases `raw` and strips a leading dot. `None` for empty values or
/// values containing a path separator.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() || ext.contains(['/', '\\']) {
        return None;
    }
    Some(ext)
}

fn parse_extensions(raw: &[String]) -> Result<Vec<String>, Vec<String>> {
    let mut extensions: Vec<String> = Vec::new();
    let mut messages = Vec::new();
    for value in raw {
        match normalize_extension(value) {
            Some(ext) if !extensions.contains(&ext) => extensions.push(ext),
            Some(_) => {}
            None => messages.push(format!("invalid extension '{value}'")),
        }
    }
    if raw.is_empty() {
        messages.push("at least one extension is required".to_owned());
    }
    if messages.is_empty() {
        Ok(extensions)
    } else {
        Err(messages)
    }
}

fn build_exclude(patterns: &[String]) -> Result<GlobSet, Vec<String>> {
    let mut builder = GlobSetBuilder::new();
    let mut messages = Vec::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => messages.push(format!("invalid glob pattern '{pattern}': {err}")),
        }
    }
    if !messages.is_empty() {
        return Err(messages);
    }
    builder.build().map_err(|err| vec![err.to_string()])
}

/// Every rejected value, one bullet per line.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: ConfigSource,
    /// Dotted key of the rejected setting, e.g. `scan.extensions`.
    pub setting: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.setting, self.message, self.source)
    }
}

/// On-disk shape of `.changes-flatten.toml`.
#[derive(Debug, Deserialize)]
struct SettingsFile {
    paths: Option<PathsTable>,
    scan: Option<ScanTable>,
    rewrite: Option<RewriteTable>,
}

#[derive(Debug, Deserialize)]
struct PathsTable {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ScanTable {
    extensions: Option<Vec<String>>,
    recursive: Option<bool>,
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RewriteTable {
    comment_out_package: Option<bool>,
}

impl SettingsFile {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn normalizes_extension_spelling() {
        let extensions = parse_extensions(&strings(&[".TEX", "tex", "ltx"])).unwrap();
        assert_eq!(extensions, strings(&["tex", "ltx"]));
    }

    #[test]
    fn rejects_empty_extension_list() {
        let messages = parse_extensions(&[]).unwrap_err();
        assert_eq!(messages, strings(&["at least one extension is required"]));
    }

    #[test]
    fn reports_every_bad_glob() {
        let messages = build_exclude(&strings(&["[a", "ok/**", "{b"])).unwrap_err();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("'[a'"));
    }

    #[test]
    fn builtin_defaults_resolve_against_working_dir() {
        let config = Config::builtin("/work");
        assert_eq!(config.paths.input, PathBuf::from("/work/input"));
        assert_eq!(config.paths.output, PathBuf::from("/work/output"));
        assert!(config.scan.matches_extension(Path::new("paper.TeX")));
        assert!(!config.scan.matches_extension(Path::new("paper.bib")));
        assert!(!config.scan.is_excluded(Path::new("paper.tex")));
        assert!(config.rewrite.comment_out_package);
        assert_eq!(config.sources.layers[0].to_string(), "built-in defaults");
    }
}
