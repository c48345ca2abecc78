use changes_resolve::{
    flatten_text, resolve, resolve_document, CommandKind, DiagnosticReason, FlattenOptions,
};
use pretty_assertions::assert_eq;

#[test]
fn should_keep_added_text() {
    assert_eq!(resolve(r"This is \added{new} text."), "This is new text.");
}

#[test]
fn should_drop_deleted_text() {
    assert_eq!(resolve(r"This is \deleted{old} text."), "This is  text.");
}

#[test]
fn should_keep_new_text_of_replacement() {
    let resolved = resolve(r"This is \replaced{new}{old} text.");
    assert_eq!(resolved, "This is new text.");
    assert!(!resolved.contains("old"));
}

#[test]
fn should_keep_highlighted_text() {
    assert_eq!(
        resolve(r"This is \highlight{highlighted} text."),
        "This is highlighted text."
    );
}

#[test]
fn should_not_close_on_inner_groups() {
    assert_eq!(
        resolve(r"Start \added{add \textbf{bold}} end."),
        r"Start add \textbf{bold} end."
    );
}

#[test]
fn should_collapse_nested_commands_of_same_kind() {
    assert_eq!(resolve(r"\added{Outer \added{Inner}}"), "Outer Inner");
}

#[test]
fn should_drop_deleted_text_regardless_of_nesting() {
    assert_eq!(resolve(r"a\deleted{x {y {z}} \added{w}}b"), "ab");
}

#[test]
fn should_preserve_line_breaks_in_arguments() {
    assert_eq!(resolve("\\added{Line one\nLine two}"), "Line one\nLine two");
}

#[test]
fn should_resolve_each_command_on_a_line() {
    assert_eq!(
        resolve(r"\added{One} \deleted{Two} \replaced{Three}{Four}"),
        "One  Three"
    );
}

#[test]
fn should_keep_escaped_braces_verbatim() {
    assert_eq!(
        resolve(r"Set \added{A = \{1, 2\}} end."),
        r"Set A = \{1, 2\} end."
    );
}

#[test]
fn should_treat_brace_after_escaped_backslash_as_structural() {
    assert_eq!(
        resolve(r"Start \added{Line \\{ Group }} end."),
        r"Start Line \\{ Group } end."
    );
}

#[test]
fn should_ignore_braces_in_comments() {
    // Given
    let raw = "Start \\added{content % comment with closing brace } \n} end.";

    // When
    let resolved = resolve(raw);

    // Then
    assert_eq!(resolved, "Start content % comment with closing brace } \n end.");
}

#[test]
fn should_allow_whitespace_before_arguments() {
    assert_eq!(resolve(r"\replaced {new} {old}"), "new");
    assert_eq!(resolve("\\added \n {x}"), "x");
}

#[test]
fn should_leave_non_invocations_untouched() {
    let raw = r"\added X{kept} and \deleted";
    let resolution = resolve_document(raw);
    assert_eq!(resolution.text, raw);
    assert!(resolution.is_clean());
}

#[test]
fn should_be_idempotent_on_resolved_text() {
    let raw = "\\section{Intro}\nPlain text with {groups} and 50\\% % note\n";
    assert_eq!(resolve(raw), raw);
    let once = resolve(r"\added{a} \replaced{b}{c} \highlight{d}");
    assert_eq!(resolve(&once), once);
}

#[test]
fn should_stop_kind_at_unterminated_invocation() {
    // Given
    let raw = "Intro \\added{unterminated\n\\added{later} \\deleted{gone}";

    // When
    let resolution = resolve_document(raw);

    // Then
    assert_eq!(resolution.text, "Intro \\added{unterminated\n\\added{later} ");
    assert_eq!(resolution.diagnostics.len(), 1);
    assert_eq!(resolution.diagnostics[0].kind, CommandKind::Insert);
    assert_eq!(
        resolution.diagnostics[0].reason,
        DiagnosticReason::UnmatchedBracket
    );
}

#[test]
fn should_resolve_earlier_invocations_before_failing() {
    let resolution = resolve_document(r"\added{ok} \added{broken");
    assert_eq!(resolution.text, r"ok \added{broken");
    assert_eq!(resolution.diagnostics.len(), 1);
}

#[test]
fn should_not_rescan_earlier_kinds() {
    // Insert runs before Highlight, so an \added spelled out by unwrapping
    // a highlight stays in the output.
    assert_eq!(resolve(r"\add\highlight{}ed{late}"), r"\added{late}");
    assert_eq!(resolve(r"\high\added{}light{x}"), "x");
}

#[test]
fn should_report_each_failing_kind_once() {
    let resolution = resolve_document(r"\deleted{a \highlight{b \replaced{c}");
    let kinds: Vec<_> = resolution
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            CommandKind::Delete,
            CommandKind::Replace,
            CommandKind::Highlight
        ]
    );
}

#[test]
fn should_handle_non_ascii_text() {
    assert_eq!(
        resolve("Größe \\replaced{Übergröße}{Maß} ✓"),
        "Größe Übergröße ✓"
    );
}

#[test]
fn flatten_comments_out_package_import() {
    let raw = "\\usepackage[final]{changes}\n\\begin{document}\\added{x}\\end{document}\n";
    let resolution = flatten_text(raw, &FlattenOptions::default());
    assert_eq!(
        resolution.text,
        "% \\usepackage[final]{changes}\n\\begin{document}x\\end{document}\n"
    );
}

#[test]
fn flatten_can_keep_package_import() {
    let raw = "\\usepackage{changes}\n";
    let options = FlattenOptions {
        comment_out_package: false,
    };
    assert_eq!(flatten_text(raw, &options).text, raw);
}
