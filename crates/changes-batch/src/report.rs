use std::path::PathBuf;

use changes_resolve::Diagnostic;
use serde::Serialize;

/// What happened to a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum DocumentStatus {
    /// Flattening altered the text and the result was written.
    Written,
    /// Nothing to flatten; the document was copied through as is.
    Unchanged,
    /// Nothing was written. A diff is attached when the text would change.
    DryRun,
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub relative: PathBuf,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: DocumentStatus,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl DocumentReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, DocumentStatus::Failed { .. })
    }
}

/// Result of one folder run.
#[derive(Debug, Clone, Serialize)]
pub struct FlattenOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    /// The input folder did not exist and was created; nothing was processed.
    pub input_created: bool,
    pub output_created: bool,
    pub dry_run: bool,
    pub processed: usize,
    pub failed: usize,
    pub documents: Vec<DocumentReport>,
}

impl FlattenOutcome {
    pub(crate) fn new(
        input: PathBuf,
        output: PathBuf,
        dry_run: bool,
        documents: Vec<DocumentReport>,
    ) -> Self {
        let failed = documents.iter().filter(|doc| doc.is_failed()).count();
        Self {
            input,
            output,
            input_created: false,
            output_created: false,
            dry_run,
            processed: documents.len() - failed,
            failed,
            documents,
        }
    }

    pub fn diagnostic_count(&self) -> usize {
        self.documents.iter().map(|doc| doc.diagnostics.len()).sum()
    }

    /// No document failed and no diagnostic was raised.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.diagnostic_count() == 0
    }
}
