const ESCAPE: u8 = b'\\';
const COMMENT: u8 = b'%';
const OPEN: u8 = b'{';
const CLOSE: u8 = b'}';
const NEWLINE: u8 = b'\n';

/// Returns the byte offset of the `}` that closes the `{` at `open`.
///
/// Escaped characters (`\` plus whatever follows) and `%` line comments never
/// count towards the depth. Returns `None` when `open` is not a `{` or when the
/// text ends before the group is balanced.
///
/// Every structural byte is ASCII, so scanning bytes of UTF-8 text is safe: an
/// escape that skips into the middle of a multi-byte character only lands on
/// continuation bytes, which never match.
pub fn find_matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&OPEN) {
        return None;
    }

    let mut depth = 1usize;
    let mut cursor = open + 1;

    while cursor < bytes.len() {
        match bytes[cursor] {
            ESCAPE => {
                cursor += 2;
                continue;
            }
            COMMENT => {
                cursor = skip_comment(bytes, cursor);
                continue;
            }
            OPEN => depth += 1,
            CLOSE => {
                depth -= 1;
                if depth == 0 {
                    return Some(cursor);
                }
            }
            _ => {}
        }
        cursor += 1;
    }

    None
}

/// Offset of the line break ending the comment at `start`, or the text length.
fn skip_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&byte| byte == NEWLINE)
        .map(|rel| start + rel)
        .unwrap_or(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_flat_group() {
        assert_eq!(find_matching_brace("{abc}", 0), Some(4));
    }

    #[test]
    fn matches_nested_groups() {
        let text = "x{a{b{c}}d} tail";
        assert_eq!(find_matching_brace(text, 1), Some(10));
        assert_eq!(find_matching_brace(text, 3), Some(8));
    }

    #[test]
    fn rejects_non_brace_start() {
        assert_eq!(find_matching_brace("abc}", 0), None);
        assert_eq!(find_matching_brace("{}", 7), None);
    }

    #[test]
    fn escaped_braces_are_not_structural() {
        let text = r"{A = \{1, 2\}}";
        assert_eq!(find_matching_brace(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn brace_after_escaped_backslash_is_structural() {
        let text = r"{Line \\{ Group }}";
        assert_eq!(find_matching_brace(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn comment_hides_braces_until_line_break() {
        let text = "{a % } ignored\n}";
        assert_eq!(find_matching_brace(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn comment_running_to_end_is_unmatched() {
        assert_eq!(find_matching_brace("{a % }", 0), None);
    }

    #[test]
    fn trailing_escape_does_not_overrun() {
        assert_eq!(find_matching_brace("{abc\\", 0), None);
        assert_eq!(find_matching_brace("{\\", 0), None);
    }

    #[test]
    fn unbalanced_group_is_unmatched() {
        assert_eq!(find_matching_brace("{a{b}", 0), None);
    }

    #[test]
    fn tolerates_multibyte_text() {
        let text = "{Größe \\é {ü}}";
        let close = find_matching_brace(text, 0).unwrap();
        assert_eq!(&text[close..], "}");
        assert_eq!(close, text.len() - 1);
    }
}
