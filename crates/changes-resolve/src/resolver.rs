use std::fmt;
use std::ops::Range;

use serde::Serialize;
use tracing::warn;

use crate::brace::find_matching_brace;
use crate::command::{brace_after_whitespace, find_invocation, CommandKind, Invocation};

/// Why resolution of a command kind was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticReason {
    UnmatchedBracket,
    MissingSecondArgument,
}

/// Non-fatal problem raised while resolving a document.
///
/// Offsets and lines refer to the partially resolved text at the moment the
/// problem was found, not to the original input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: CommandKind,
    pub reason: DiagnosticReason,
    pub offset: usize,
    pub line: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            DiagnosticReason::UnmatchedBracket => write!(
                f,
                "Unmatched brace in {} command. Skipping rest of file.",
                self.kind
            ),
            DiagnosticReason::MissingSecondArgument => write!(
                f,
                "Missing second argument for {} command. Skipping rest of file.",
                self.kind
            ),
        }
    }
}

/// Resolved text together with the diagnostics raised on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Owns one document while its commands are resolved kind by kind.
pub struct Resolver {
    text: String,
    diagnostics: Vec<Diagnostic>,
}

impl Resolver {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Exhausts every command kind in [`CommandKind::ORDER`].
    pub fn run(mut self) -> Resolution {
        for kind in CommandKind::ORDER {
            self.exhaust(kind);
        }

        Resolution {
            text: self.text,
            diagnostics: self.diagnostics,
        }
    }

    /// Resolves the leftmost invocation of `kind` until none is left. The
    /// first malformed invocation stops this kind for the rest of the text.
    fn exhaust(&mut self, kind: CommandKind) {
        while let Some(invocation) = find_invocation(&self.text, kind) {
            if let Err(reason) = self.resolve_one(invocation) {
                self.report(invocation, reason);
                break;
            }
        }
    }

    fn resolve_one(&mut self, invocation: Invocation) -> Result<(), DiagnosticReason> {
        let close = find_matching_brace(&self.text, invocation.open)
            .ok_or(DiagnosticReason::UnmatchedBracket)?;
        let argument = invocation.open + 1..close;

        let (end, kept) = match invocation.kind {
            CommandKind::Insert | CommandKind::Highlight => (close + 1, Some(argument)),
            CommandKind::Delete => (close + 1, None),
            CommandKind::Replace => {
                let second_open = brace_after_whitespace(&self.text, close + 1)
                    .ok_or(DiagnosticReason::MissingSecondArgument)?;
                let second_close = find_matching_brace(&self.text, second_open)
                    .ok_or(DiagnosticReason::UnmatchedBracket)?;
                (second_close + 1, Some(argument))
            }
        };

        self.splice(invocation.start..end, kept);
        Ok(())
    }

    fn splice(&mut self, span: Range<usize>, kept: Option<Range<usize>>) {
        let kept = kept.map(|range| &self.text[range]).unwrap_or("");
        let mut rebuilt = String::with_capacity(self.text.len() - span.len() + kept.len());
        rebuilt.push_str(&self.text[..span.start]);
        rebuilt.push_str(kept);
        rebuilt.push_str(&self.text[span.end..]);
        self.text = rebuilt;
    }

    fn report(&mut self, invocation: Invocation, reason: DiagnosticReason) {
        let diagnostic = Diagnostic {
            kind: invocation.kind,
            reason,
            offset: invocation.start,
            line: line_of(&self.text, invocation.start),
        };
        warn!(
            command = %diagnostic.kind,
            line = diagnostic.line,
            "{diagnostic}"
        );
        self.diagnostics.push(diagnostic);
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset]
        .iter()
        .filter(|&&byte| byte == b'\n')
        .count()
        + 1
}

/// Resolves every command and reports what could not be resolved.
pub fn resolve_document(text: &str) -> Resolution {
    Resolver::new(text).run()
}

/// Resolves every command, discarding diagnostics.
pub fn resolve(text: &str) -> String {
    resolve_document(text).text
}
