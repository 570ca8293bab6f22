use regex::Regex;

use crate::token::{IDENT_CONTINUE_CLASS, IDENT_START_CLASS, clean_fragment, is_identifier_continue};

/// How a pattern's regex match must relate to identifier boundaries.
///
/// The `regex` crate has no lookaround assertions, so the boundary rules are
/// explicit adjacent-character checks applied after a candidate regex match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Guard {
    /// Use the regex match as-is.
    None,
    /// The match must not be preceded by an identifier character, nor
    /// followed by an identifier character or `(` (object-macro tokens; a
    /// following `(` is reserved for function-macro call syntax).
    Token,
    /// The match must not be preceded by an identifier character
    /// (function-macro call patterns, which end in a literal `)`).
    CallPrefix,
}

/// What a matched pattern expands to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Expansion {
    /// Plain replacement text (object-like macro body, possibly empty).
    Literal(String),
    /// Start of a multi-line comment; echo verbatim to the closing line.
    CommentStart,
    /// Substitute the current 1-based line index.
    LineNumber,
    /// Substitute the current file name.
    FileName,
    /// `#include <path>`
    Include,
    /// `#define NAME`
    DefineNull,
    /// `#define NAME value`
    DefineValue,
    /// `#undef NAME`
    Undef,
    /// `#if expr`
    If,
    /// `#ifdef NAME`
    Ifdef,
    /// `#else`
    Else,
    /// `#endif`
    Endif,
    /// `#command cmd...`
    Command,
    /// `#define NAME(params) body`
    DefineFn,
    /// `#define NAME(params)` with the body on following lines.
    DefineFnMulti,
    /// A function-macro call site: parameter names in declaration order plus
    /// the stored body to substitute them into.
    FnUse {
        params: Vec<String>,
        body: String,
    },
}

/// One registered pattern: its identity string, compiled matcher, boundary
/// guard, and expansion.
#[derive(Clone, Debug)]
pub(crate) struct PatternEntry {
    raw: String,
    matcher: Regex,
    guard: Guard,
    pub(crate) expansion: Expansion,
}

impl PatternEntry {
    /// Leftmost guard-accepted match as `(start, end)` byte offsets.
    pub fn find(&self, line: &str) -> Option<(usize, usize)> {
        self.matcher
            .find_iter(line)
            .map(|m| (m.start(), m.end()))
            .find(|&(start, end)| self.guard_accepts(line, start, end))
    }

    /// Capture groups for the guard-accepted match at `start`.
    pub fn capture_groups(&self, line: &str, start: usize) -> Option<Vec<String>> {
        let caps = self.matcher.captures_at(line, start)?;
        Some(
            (1..caps.len())
                .map(|g| caps.get(g).map_or(String::new(), |m| m.as_str().to_string()))
                .collect(),
        )
    }

    fn guard_accepts(&self, line: &str, start: usize, end: usize) -> bool {
        let before_ok = || {
            line[..start]
                .chars()
                .next_back()
                .is_none_or(|c| !is_identifier_continue(c))
        };
        match self.guard {
            Guard::None => true,
            Guard::CallPrefix => before_ok(),
            Guard::Token => {
                let after_ok = line[end..]
                    .chars()
                    .next()
                    .is_none_or(|c| !is_identifier_continue(c) && c != '(');
                before_ok() && after_ok
            }
        }
    }
}

/// A registry slot: a live pattern or the tombstone left by `#undef`.
///
/// Tombstones are never compacted, so slot indices and matching priority
/// stay stable for the whole run.
#[derive(Clone, Debug)]
pub(crate) enum Slot {
    Live(PatternEntry),
    Removed,
}

const TOKEN_PREFIX: &str = "(?<![0-9A-Za-z_])";
const TOKEN_SUFFIX: &str = "(?![0-9A-Za-z_(])";

/// Canonical identity string for an object-macro name.
///
/// Two different names must never share an identity, and lookups go through
/// the same wrapping, so the asserted boundaries are part of the key even
/// though the compiled matcher expresses them through [`Guard::Token`].
pub(crate) fn wrap_token(name: &str) -> String {
    format!("{TOKEN_PREFIX}{}{TOKEN_SUFFIX}", clean_fragment(name))
}

/// Canonical identity string for a function-macro call pattern.
pub(crate) fn wrap_call_pattern(pattern: &str) -> String {
    format!("{TOKEN_PREFIX}{pattern}")
}

/// Ordered store of macro and directive patterns.
///
/// Position in the store is matching priority: the expansion loop scans live
/// entries in registration order and resolves pre-match-length ties in favor
/// of the earliest entry. Redefinition replaces an expansion in place so the
/// original priority is kept.
pub(crate) struct PatternRegistry {
    slots: Vec<Slot>,
}

impl PatternRegistry {
    /// Create a registry seeded with the built-in directive patterns, in
    /// their fixed priority order.
    pub fn new() -> Self {
        let mut registry = PatternRegistry { slots: Vec::new() };
        let ident = format!("{IDENT_START_CLASS}{IDENT_CONTINUE_CLASS}*");

        // Multi-line comment start: only comments opening at the beginning
        // of a line are recognized, and nesting is not supported.
        registry.push_builtin(r"^\s*/\*.*$", Expansion::CommentStart);
        registry.push_builtin("__LINE__", Expansion::LineNumber);
        registry.push_builtin("__FILE__", Expansion::FileName);
        // No quoting or <> bracketing: the path is the rest of the line.
        registry.push_builtin(r"^\s*#\s*include\s+(\S+)\s*$", Expansion::Include);
        registry.push_builtin(
            &format!(r"^\s*#\s*define\s+({ident})\s*$"),
            Expansion::DefineNull,
        );
        registry.push_builtin(
            &format!(r"^\s*#\s*define\s+({ident})\s+(.+)\s*$"),
            Expansion::DefineValue,
        );
        registry.push_builtin(
            &format!(r"^\s*#\s*undef\s+({ident})\s*$"),
            Expansion::Undef,
        );
        registry.push_builtin(r"^\s*#\s*if\s+(.+)\s*$", Expansion::If);
        registry.push_builtin(r"^\s*#\s*ifdef\s+(\S+)\s*$", Expansion::Ifdef);
        registry.push_builtin(r"^\s*#\s*else\s*$", Expansion::Else);
        registry.push_builtin(r"^\s*#\s*endif\s*$", Expansion::Endif);
        registry.push_builtin(r"^\s*#\s*command\s+(.+)\s*$", Expansion::Command);
        registry.push_builtin(
            &format!(r"^\s*#\s*define\s+({ident})\(\s*(.*)\s*\)\s+(.+)\s*$"),
            Expansion::DefineFn,
        );
        registry.push_builtin(
            &format!(r"^\s*#\s*define\s+({ident})\(\s*(.*)\s*\)\s*$"),
            Expansion::DefineFnMulti,
        );

        registry
    }

    fn push_builtin(&mut self, pattern: &str, expansion: Expansion) {
        self.insert_entry(pattern.to_string(), pattern, Guard::None, expansion);
    }

    /// Register `raw` with the given matcher and expansion, or replace the
    /// expansion in place if `raw` is already live.
    pub fn insert_entry(&mut self, raw: String, pattern: &str, guard: Guard, expansion: Expansion) {
        if let Some(pos) = self.position(&raw) {
            if let Slot::Live(entry) = &mut self.slots[pos] {
                log::debug!("replacing expansion of pattern [{raw}] in place");
                entry.expansion = expansion;
            }
            return;
        }
        match Regex::new(pattern) {
            Ok(matcher) => {
                log::trace!("registering pattern [{raw}]");
                self.slots.push(Slot::Live(PatternEntry {
                    raw,
                    matcher,
                    guard,
                    expansion,
                }));
            }
            Err(err) => log::error!("could not compile pattern [{pattern}]: {err}"),
        }
    }

    /// Register or replace an object-like macro. An empty `value` makes it
    /// an existence-only macro.
    pub fn define(&mut self, name: &str, value: &str) {
        let cleaned = clean_fragment(name);
        let raw = wrap_token(&cleaned);
        let expansion = Expansion::Literal(clean_fragment(value));
        self.insert_entry(raw, &cleaned, Guard::Token, expansion);
    }

    /// Tombstone the entry for `name`. Returns false if it was not live.
    pub fn undef(&mut self, name: &str) -> bool {
        match self.position(&wrap_token(name)) {
            Some(pos) => {
                self.slots[pos] = Slot::Removed;
                true
            }
            None => false,
        }
    }

    /// Whether `name` is currently defined as an object-like macro.
    pub fn exists(&self, name: &str) -> bool {
        self.position(&wrap_token(name)).is_some()
    }

    /// The literal expansion registered for `name`, for `#if` string
    /// equality tests. `None` for undefined names and non-literal entries.
    pub fn lookup_expansion(&self, name: &str) -> Option<&str> {
        let raw = wrap_token(name);
        self.slots.iter().find_map(|slot| match slot {
            Slot::Live(entry) if entry.raw == raw => match &entry.expansion {
                Expansion::Literal(text) => Some(text.as_str()),
                _ => None,
            },
            _ => None,
        })
    }

    /// Live entries with their slot indices, in registration order.
    pub fn live_entries(&self) -> impl Iterator<Item = (usize, &PatternEntry)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Live(entry) => Some((i, entry)),
            Slot::Removed => None,
        })
    }

    /// The live entry at `index`, if any.
    pub fn entry(&self, index: usize) -> Option<&PatternEntry> {
        match self.slots.get(index) {
            Some(Slot::Live(entry)) => Some(entry),
            _ => None,
        }
    }

    fn position(&self, raw: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Slot::Live(entry) if entry.raw == raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_exists() {
        let mut registry = PatternRegistry::new();
        assert!(!registry.exists("FOO"));
        registry.define("FOO", "bar");
        assert!(registry.exists("FOO"));
        assert_eq!(registry.lookup_expansion("FOO"), Some("bar"));
        assert_eq!(registry.lookup_expansion("MISSING"), None);
    }

    #[test]
    fn redefine_replaces_in_place() {
        let mut registry = PatternRegistry::new();
        registry.define("FOO", "one");
        let count = registry.live_entries().count();
        let pos = registry.position(&wrap_token("FOO"));
        registry.define("FOO", "two");
        assert_eq!(registry.live_entries().count(), count);
        assert_eq!(registry.position(&wrap_token("FOO")), pos);
        assert_eq!(registry.lookup_expansion("FOO"), Some("two"));
    }

    #[test]
    fn undef_leaves_a_tombstone() {
        let mut registry = PatternRegistry::new();
        let before = registry.slots.len();
        registry.define("FOO", "");
        assert!(registry.undef("FOO"));
        assert!(!registry.exists("FOO"));
        assert!(!registry.undef("FOO"));
        // slot kept as a hole, not compacted
        assert_eq!(registry.slots.len(), before + 1);
    }

    #[test]
    fn token_guard_respects_identifier_boundaries() {
        let mut registry = PatternRegistry::new();
        registry.define("FOO", "bar");
        let pos = registry.position(&wrap_token("FOO")).unwrap();
        let entry = registry.entry(pos).unwrap();
        assert_eq!(entry.find("say FOO now"), Some((4, 7)));
        assert_eq!(entry.find("FOOBAR"), None);
        assert_eq!(entry.find("aFOO"), None);
        // a following `(` is function-macro call syntax, not this token
        assert_eq!(entry.find("FOO(1)"), None);
    }

    #[test]
    fn directive_patterns_capture_their_operands() {
        let registry = PatternRegistry::new();
        let line = "  # define  WIDTH  80 ";
        let (slot, _) = registry
            .live_entries()
            .find(|(_, e)| {
                e.expansion == Expansion::DefineValue && e.find(line).is_some()
            })
            .unwrap();
        let entry = registry.entry(slot).unwrap();
        let (start, _) = entry.find(line).unwrap();
        let groups = entry.capture_groups(line, start).unwrap();
        assert_eq!(groups[0], "WIDTH");
        assert_eq!(groups[1].trim(), "80");
    }
}
