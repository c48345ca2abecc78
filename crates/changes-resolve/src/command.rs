use std::fmt;

use serde::Serialize;

/// The `changes` package commands understood by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// `\added{text}` keeps `text`.
    Insert,
    /// `\deleted{text}` drops `text`.
    Delete,
    /// `\replaced{new}{old}` keeps `new`.
    Replace,
    /// `\highlight{text}` keeps `text`.
    Highlight,
}

impl CommandKind {
    /// Resolution order. Later kinds never trigger a rescan of earlier ones.
    pub const ORDER: [CommandKind; 4] = [
        CommandKind::Insert,
        CommandKind::Delete,
        CommandKind::Replace,
        CommandKind::Highlight,
    ];

    /// Control sequence as written in the document, including the backslash.
    pub fn control_sequence(self) -> &'static str {
        match self {
            CommandKind::Insert => r"\added",
            CommandKind::Delete => r"\deleted",
            CommandKind::Replace => r"\replaced",
            CommandKind::Highlight => r"\highlight",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.control_sequence())
    }
}

/// Located invocation: where the control sequence starts and where its first
/// argument opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub kind: CommandKind,
    pub start: usize,
    pub open: usize,
}

/// Finds the leftmost `kind` control sequence followed by optional whitespace
/// and `{`. Occurrences followed by anything else are not invocations and are
/// passed over.
pub fn find_invocation(text: &str, kind: CommandKind) -> Option<Invocation> {
    let name = kind.control_sequence();
    let mut from = 0;

    while let Some(rel) = text[from..].find(name) {
        let start = from + rel;
        let after_name = start + name.len();
        if let Some(open) = brace_after_whitespace(text, after_name) {
            return Some(Invocation { kind, start, open });
        }
        from = after_name;
    }

    None
}

/// Offset of the `{` reached from `from` by skipping whitespace only.
pub(crate) fn brace_after_whitespace(text: &str, from: usize) -> Option<usize> {
    let rest = text.get(from..)?;
    let (rel, ch) = rest.char_indices().find(|(_, ch)| !ch.is_whitespace())?;
    (ch == '{').then_some(from + rel)
}
