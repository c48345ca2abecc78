use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static CHANGES_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\usepackage(\[[^\n]*?\])?\{changes\}").expect("static pattern compiles")
});

/// Comments out every `\usepackage{changes}` (with or without options) so the
/// flattened document no longer loads the package.
pub fn comment_out_package_import(text: &str) -> Cow<'_, str> {
    CHANGES_IMPORT.replace_all(text, "% $0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_plain_import() {
        assert_eq!(
            comment_out_package_import("\\usepackage{changes}\n"),
            "% \\usepackage{changes}\n"
        );
    }

    #[test]
    fn comments_import_with_options() {
        assert_eq!(
            comment_out_package_import("\\usepackage[final,markup=underlined]{changes}"),
            "% \\usepackage[final,markup=underlined]{changes}"
        );
    }

    #[test]
    fn leaves_other_packages_alone() {
        let text = "\\usepackage{graphicx}\n\\usepackage[utf8]{inputenc}\n";
        assert!(matches!(comment_out_package_import(text), Cow::Borrowed(_)));
    }

    #[test]
    fn options_do_not_span_lines() {
        let text = "\\usepackage[a]{x}\n[b]{changes}";
        assert_eq!(comment_out_package_import(text), text);
    }
}
