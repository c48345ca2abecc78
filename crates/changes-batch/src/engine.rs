use std::fs;
use std::io::Read;
use std::path::Path;

use changes_config::Config;
use changes_resolve::{flatten_text, FlattenOptions, Resolution};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::diff::flatten_diff;
use crate::discover::{discover, DocumentJob};
use crate::error::{FlattenError, FlattenResult};
use crate::fs::{physical_location, write_output};
use crate::report::{DocumentReport, DocumentStatus, FlattenOutcome};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Compute diffs instead of writing the output folder.
    pub dry_run: bool,
}

/// Notifications emitted while a run is in flight.
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    OutputCreated(&'a Path),
    /// Sent from the worker thread as soon as the document is done.
    Document(&'a DocumentReport),
}

/// Flattens every document of the configured input folder.
pub struct Flattener {
    config: Config,
    options: FlattenOptions,
}

impl Flattener {
    pub fn new(config: Config) -> Self {
        let options = FlattenOptions {
            comment_out_package: config.rewrite.comment_out_package,
        };
        Self { config, options }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Applies the per-document pipeline to an in-memory string.
    pub fn flatten_str(&self, text: &str) -> Resolution {
        flatten_text(text, &self.options)
    }

    pub fn flatten_reader<R: Read>(&self, reader: &mut R) -> FlattenResult<Resolution> {
        let mut buffer = String::new();
        reader.read_to_string(&mut buffer)?;
        Ok(self.flatten_str(&buffer))
    }

    pub fn run(&self, options: &RunOptions) -> FlattenResult<FlattenOutcome> {
        self.run_with_progress(options, |_| {})
    }

    /// Like [`Flattener::run`], calling `progress` as folders are created and
    /// documents finish. Documents complete in any order.
    pub fn run_with_progress<F>(
        &self,
        options: &RunOptions,
        progress: F,
    ) -> FlattenResult<FlattenOutcome>
    where
        F: Fn(Progress<'_>) + Sync,
    {
        let input = self.config.paths.input.clone();
        let output = self.config.paths.output.clone();
        ensure_distinct(&input, &output)?;

        if !input.exists() {
            fs::create_dir_all(&input).map_err(|err| FlattenError::io(&input, err))?;
            info!(folder = %input.display(), "created missing input folder");
            let mut outcome = FlattenOutcome::new(input, output, options.dry_run, Vec::new());
            outcome.input_created = true;
            return Ok(outcome);
        }

        let mut output_created = false;
        if !output.exists() && !options.dry_run {
            fs::create_dir_all(&output).map_err(|err| FlattenError::io(&output, err))?;
            output_created = true;
            progress(Progress::OutputCreated(&output));
        }

        let jobs = discover(&input, &output, &self.config.scan)?;
        debug!(count = jobs.len(), "discovered documents");

        let documents: Vec<DocumentReport> = jobs
            .par_iter()
            .map(|job| {
                let report = self.process(job, options);
                progress(Progress::Document(&report));
                report
            })
            .collect();

        let mut outcome = FlattenOutcome::new(input, output, options.dry_run, documents);
        outcome.output_created = output_created;
        Ok(outcome)
    }

    fn process(&self, job: &DocumentJob, options: &RunOptions) -> DocumentReport {
        debug!(document = %job.relative.display(), "flattening");

        let mut report = DocumentReport {
            relative: job.relative.clone(),
            source: job.source.clone(),
            destination: job.destination.clone(),
            status: DocumentStatus::DryRun,
            diagnostics: Vec::new(),
            diff: None,
        };

        let original = match fs::read_to_string(&job.source) {
            Ok(text) => text,
            Err(err) => {
                report.status = DocumentStatus::Failed {
                    message: format!("failed to read {}: {err}", job.source.display()),
                };
                return report;
            }
        };

        let resolution = self.flatten_str(&original);
        report.diagnostics = resolution.diagnostics;

        if options.dry_run {
            report.diff = flatten_diff(&job.relative, &original, &resolution.text);
            return report;
        }

        report.status = match write_output(job, &resolution.text) {
            Ok(()) if resolution.text == original => DocumentStatus::Unchanged,
            Ok(()) => DocumentStatus::Written,
            Err(err) => DocumentStatus::Failed {
                message: format!("failed to write {}: {err}", job.destination.display()),
            },
        };
        info!(document = %job.relative.display(), status = ?report.status, "done");

        report
    }
}

/// Rejects runs whose output folder is the input folder under another
/// spelling, since writing there would replace the source documents.
fn ensure_distinct(input: &Path, output: &Path) -> FlattenResult<()> {
    let input_location = physical_location(input).map_err(|err| FlattenError::io(input, err))?;
    let output_location =
        physical_location(output).map_err(|err| FlattenError::io(output, err))?;
    if input_location == output_location {
        return Err(FlattenError::SameFolder {
            path: input.to_path_buf(),
        });
    }
    Ok(())
}
