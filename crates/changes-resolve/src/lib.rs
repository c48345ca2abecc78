//! Resolution of LaTeX `changes` package markup.
//!
//! `\added`, `\deleted`, `\replaced` and `\highlight` invocations are replaced
//! by their accepted text while everything else in the document is left as
//! written.

use std::borrow::Cow;

mod brace;
mod command;
mod package;
mod resolver;

pub use brace::find_matching_brace;
pub use command::{find_invocation, CommandKind, Invocation};
pub use package::comment_out_package_import;
pub use resolver::{resolve, resolve_document, Diagnostic, DiagnosticReason, Resolution, Resolver};

/// Switches for the per-document pipeline.
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    pub comment_out_package: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            comment_out_package: true,
        }
    }
}

/// Resolves all commands, then applies the package import rewrite.
pub fn flatten_text(text: &str, options: &FlattenOptions) -> Resolution {
    let mut resolution = resolve_document(text);
    if options.comment_out_package {
        let rewritten = match comment_out_package_import(&resolution.text) {
            Cow::Owned(text) => Some(text),
            Cow::Borrowed(_) => None,
        };
        if let Some(text) = rewritten {
            resolution.text = text;
        }
    }
    resolution
}
