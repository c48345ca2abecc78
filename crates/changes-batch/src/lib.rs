pub mod diff;
pub mod discover;
pub mod engine;
pub mod error;
pub mod fs;
pub mod report;

pub use changes_resolve::{Diagnostic, DiagnosticReason, Resolution};
pub use discover::{discover, DocumentJob};
pub use engine::{Flattener, Progress, RunOptions};
pub use error::{ExitCode, FlattenError, FlattenResult};
pub use report::{DocumentReport, DocumentStatus, FlattenOutcome};
