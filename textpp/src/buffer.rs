use std::ops::RangeInclusive;

/// One file's worth of lines under expansion, plus its display name.
///
/// The frame is owned by the expansion loop processing it; `#include` builds
/// a fresh frame for the included file and the old one resumes when the
/// recursive call returns.
#[derive(Debug)]
pub(crate) struct FileFrame {
    pub name: String,
    pub lines: Vec<String>,
}

impl FileFrame {
    pub fn new<S: Into<String>>(name: S, text: &str) -> Self {
        FileFrame {
            name: name.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Replace the inclusive `range` of lines with `replacement`, shifting
    /// the tail of the buffer.
    pub fn splice(&mut self, range: RangeInclusive<usize>, replacement: Vec<String>) {
        self.lines.splice(range, replacement);
    }

    /// Insert `new_lines` immediately after `index`, preserving their order.
    pub fn insert_after(&mut self, index: usize, new_lines: Vec<String>) {
        let at = index + 1;
        self.lines.splice(at..at, new_lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_text_into_lines() {
        let frame = FileFrame::new("f", "a\nb\n");
        assert_eq!(frame.lines, vec!["a", "b"]);
        assert!(FileFrame::new("f", "").lines.is_empty());
    }

    #[test]
    fn splice_replaces_inclusive_range() {
        let mut frame = FileFrame::new("f", "a\nb\nc\nd\n");
        frame.splice(1..=2, vec!["x".to_string()]);
        assert_eq!(frame.lines, vec!["a", "x", "d"]);
    }

    #[test]
    fn insert_after_keeps_order() {
        let mut frame = FileFrame::new("f", "a\nd\n");
        frame.insert_after(0, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(frame.lines, vec!["a", "b", "c", "d"]);
    }
}
