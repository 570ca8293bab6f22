/// Check if a character can start an identifier (letter or underscore)
pub const fn is_identifier_start(c: char) -> bool {
    (c >= 'a' && c <= 'z') || (c >= 'A' && c <= 'Z') || c == '_'
}

/// Check if a character can continue an identifier (letter, digit, or underscore)
pub const fn is_identifier_continue(c: char) -> bool {
    (c >= 'a' && c <= 'z') || (c >= 'A' && c <= 'Z') || (c >= '0' && c <= '9') || c == '_'
}

/// Regex class matching [`is_identifier_start`].
pub(crate) const IDENT_START_CLASS: &str = "[A-Za-z_]";

/// Regex class matching [`is_identifier_continue`].
pub(crate) const IDENT_CONTINUE_CLASS: &str = "[0-9A-Za-z_]";

/// Strip comments and extraneous spaces from a single-line fragment.
///
/// `//` comments run to the end of the fragment; `/* ... */` comments are
/// removed inline, and an unterminated `/*` drops the remainder. Leading and
/// trailing spaces are trimmed from the result.
pub(crate) fn clean_fragment(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '/' && i + 1 < chars.len() {
            if chars[i + 1] == '/' {
                break;
            }
            if chars[i + 1] == '*' {
                let mut j = i + 2;
                let mut closed = false;
                while j + 1 < chars.len() {
                    if chars[j] == '*' && chars[j + 1] == '/' {
                        closed = true;
                        break;
                    }
                    j += 1;
                }
                if !closed {
                    break;
                }
                i = j + 2;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out.trim_matches(' ').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_classes() {
        assert!(is_identifier_start('_'));
        assert!(is_identifier_start('q'));
        assert!(!is_identifier_start('3'));
        assert!(is_identifier_continue('3'));
        assert!(!is_identifier_continue('('));
    }

    #[test]
    fn clean_plain_text() {
        assert_eq!(clean_fragment("  hello world  "), "hello world");
    }

    #[test]
    fn clean_line_comment() {
        assert_eq!(clean_fragment("value // trailing note"), "value");
        assert_eq!(clean_fragment("// whole line"), "");
    }

    #[test]
    fn clean_block_comment() {
        assert_eq!(clean_fragment("a /* gone */ b"), "a  b");
        assert_eq!(clean_fragment("a /* unterminated"), "a");
    }
}
