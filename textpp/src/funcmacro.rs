//! Function-like macro definitions and call-site substitution.
//!
//! A definition is compiled into a call-matching pattern (one capture group
//! per parameter) plus a stored body annotated with the ordered parameter
//! names. At a call site the captured arguments are bound to those names and
//! substituted into the body as literal, identifier-boundary-aware text.

use crate::registry::{Expansion, Guard, PatternRegistry, wrap_call_pattern};
use crate::token::{clean_fragment, is_identifier_continue};

/// Capture for a regular argument: excludes top-level commas and parentheses
/// but tolerates balanced nested parentheses containing commas, so another
/// call can be passed as an argument.
const ARG_CAPTURE: &str = r"([^,\(\)]+(?:\(+[^,]*,+[^,]*\)(?:[^,\(\)])*)*)";

/// Capture for the variadic tail: everything up to the closing parenthesis.
const VARIADIC_CAPTURE: &str = r"([^\)]+)";

/// Name of the catch-all pseudo-parameter bound to the unsplit variadic text.
const VA_ARGS: &str = "__VA_ARGS__";

/// Parse a function-macro definition and register its call pattern.
///
/// `params_text` is the raw text between the parentheses of the definition;
/// `body` is the replacement text (already cleaned for single-line forms,
/// verbatim for multi-line forms). A misplaced or repeated variadic
/// parameter is reported through `warn` but does not abort the definition.
pub(crate) fn define_function_macro(
    registry: &mut PatternRegistry,
    name: &str,
    params_text: &str,
    body: String,
    warn: &mut dyn FnMut(String),
) {
    let mut params = split_params(params_text);
    // a trailing or doubled comma yields an empty name, which would match at
    // every position during substitution and never let the expansion finish
    params.retain(|param| {
        if param.is_empty() {
            warn(format!("ignoring empty parameter name in macro {name}"));
            return false;
        }
        true
    });

    let mut pattern = String::new();
    pattern.push_str(name);
    pattern.push_str(r"\(");
    let mut variadic_seen = false;
    for (idx, param) in params.iter().enumerate() {
        pattern.push_str(r"\s*");
        if idx > 0 {
            pattern.push_str(r",\s*");
        }
        if param == "..." {
            if variadic_seen {
                warn(format!(
                    "variadic parameter declared more than once in macro {name}"
                ));
            }
            variadic_seen = true;
            pattern.push_str(VARIADIC_CAPTURE);
        } else {
            pattern.push_str(ARG_CAPTURE);
        }
    }
    pattern.push_str(r"\s*\)");

    if variadic_seen && params.last().is_some_and(|p| p != "...") {
        warn(format!(
            "variadic parameter must be the last parameter of macro {name}"
        ));
    }

    log::debug!("macro {name} call pattern [{pattern}]");
    let raw = wrap_call_pattern(&pattern);
    registry.insert_entry(raw, &pattern, Guard::CallPrefix, Expansion::FnUse { params, body });
}

fn split_params(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split(',').map(|p| p.trim().to_string()).collect()
}

/// Expand one call site: bind cleaned captured arguments to parameter names,
/// split a trailing variadic argument into `__VA_ARGS__$N` pseudo-parameters
/// plus the `__VA_ARGS__` catch-all, and substitute each name into the body
/// exactly once, in declaration order.
pub(crate) fn expand_call(params: &[String], body: &str, args: &[String]) -> String {
    if params.is_empty() {
        return body.to_string();
    }

    let mut names: Vec<String> = params.to_vec();
    let mut subs: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(idx, _)| clean_fragment(args.get(idx).map_or("", String::as_str)))
        .collect();

    if params.last().is_some_and(|p| p == "...") {
        names.pop();
        let varargs = subs.pop().unwrap_or_default();
        for (n, piece) in split_varargs(&varargs).into_iter().enumerate() {
            names.push(format!("{VA_ARGS}${n}"));
            subs.push(piece);
        }
        names.push(VA_ARGS.to_string());
        subs.push(varargs);
    }

    let mut result = body.to_string();
    for (name, sub) in names.iter().zip(&subs) {
        result = substitute(&result, name, sub);
    }
    result
}

/// Split variadic argument text on unquoted commas. Quoted spans (`"` or
/// `'`) keep their commas and their quote characters; a backslash-escaped
/// quote does not end a span. Pieces are raw substrings, spacing preserved.
fn split_varargs(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut piece_start = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            let quote = c;
            i += 1;
            while i < chars.len() {
                if chars[i] == quote && chars[i - 1] != '\\' {
                    break;
                }
                i += 1;
            }
        } else if c == ',' {
            pieces.push(chars[piece_start..i].iter().collect());
            piece_start = i + 1;
        }
        i += 1;
    }

    pieces.push(chars[piece_start..].iter().collect());
    pieces
}

/// Replace every identifier-boundary occurrence of `name` in `body` with
/// `replacement`. Substituted text is skipped, not re-scanned, within this
/// pass; re-expansion is the expansion loop's job on the next iteration.
fn substitute(body: &str, name: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(pos) = rest.find(name) {
        let before_ok = if pos == 0 {
            out.chars().next_back().is_none_or(|c| !is_identifier_continue(c))
        } else {
            rest[..pos]
                .chars()
                .next_back()
                .is_none_or(|c| !is_identifier_continue(c))
        };
        let after = &rest[pos + name.len()..];
        let after_ok = after.chars().next().is_none_or(|c| !is_identifier_continue(c));

        out.push_str(&rest[..pos]);
        if before_ok && after_ok {
            out.push_str(replacement);
        } else {
            out.push_str(name);
        }
        rest = after;
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_params_handles_spacing_and_empty() {
        assert_eq!(split_params(""), Vec::<String>::new());
        assert_eq!(split_params("  "), Vec::<String>::new());
        assert_eq!(split_params("a , b,c"), vec!["a", "b", "c"]);
        assert_eq!(split_params("fmt, ..."), vec!["fmt", "..."]);
    }

    #[test]
    fn substitute_respects_identifier_boundaries() {
        assert_eq!(substitute("a+b", "a", "1"), "1+b");
        assert_eq!(substitute("ab+a", "a", "1"), "ab+1");
        assert_eq!(substitute("max(a, ax, a)", "a", "y"), "max(y, ax, y)");
    }

    #[test]
    fn substitute_does_not_rescan_replacement_text() {
        // the `a` inside the replacement must not be replaced again
        assert_eq!(substitute("a b a", "a", "a+a"), "a+a b a+a");
        assert_eq!(substitute("x y", "x", "y"), "y y");
    }

    #[test]
    fn varargs_split_on_unquoted_commas_only() {
        assert_eq!(split_varargs("1, 2,3"), vec!["1", " 2", "3"]);
        assert_eq!(split_varargs("\"a,b\", x"), vec!["\"a,b\"", " x"]);
        assert_eq!(split_varargs("'a,b',x"), vec!["'a,b'", "x"]);
        // escaped quote does not end the span
        assert_eq!(split_varargs(r#""a\",b", x"#), vec![r#""a\",b""#, " x"]);
        assert_eq!(split_varargs("solo"), vec!["solo"]);
    }

    #[test]
    fn expand_call_binds_in_declaration_order() {
        let params = vec!["a".to_string(), "b".to_string()];
        let args = vec!["1".to_string(), "2".to_string()];
        assert_eq!(expand_call(&params, "a+b", &args), "1+2");
        // a later parameter's pass sees text substituted by an earlier one
        let args = vec!["b".to_string(), "2".to_string()];
        assert_eq!(expand_call(&params, "a+b", &args), "2+2");
    }

    #[test]
    fn expand_call_variadic_pseudo_parameters() {
        let params = vec!["...".to_string()];
        let args = vec!["\"a,b\", x".to_string()];
        let body = "[__VA_ARGS__$0][__VA_ARGS__$1]{__VA_ARGS__}";
        assert_eq!(
            expand_call(&params, body, &args),
            "[\"a,b\"][ x]{\"a,b\", x}"
        );
    }

    #[test]
    fn registered_call_pattern_matches_nested_calls() {
        let mut registry = PatternRegistry::new();
        let mut warnings = Vec::new();
        define_function_macro(
            &mut registry,
            "PAIR",
            "x, y",
            "[x|y]".to_string(),
            &mut |w| warnings.push(w),
        );
        assert!(warnings.is_empty());

        let line = "PAIR(f(a,b), c)";
        let (slot, entry) = registry
            .live_entries()
            .find(|(_, e)| matches!(e.expansion, Expansion::FnUse { .. }))
            .unwrap();
        let (start, _) = entry.find(line).unwrap();
        assert_eq!(start, 0);
        let groups = registry.entry(slot).unwrap().capture_groups(line, start).unwrap();
        assert_eq!(groups[0], "f(a,b)");
        assert_eq!(groups[1], "c");
    }

    #[test]
    fn empty_parameter_names_are_dropped_with_a_warning() {
        let mut registry = PatternRegistry::new();
        let mut warnings = Vec::new();
        define_function_macro(
            &mut registry,
            "G",
            "a,",
            "out a".to_string(),
            &mut |w| warnings.push(w),
        );
        assert_eq!(warnings.len(), 1);

        let (_, entry) = registry
            .live_entries()
            .find(|(_, e)| matches!(e.expansion, Expansion::FnUse { .. }))
            .unwrap();
        // the macro keeps its one real parameter
        assert!(entry.find("G(1)").is_some());
        assert!(entry.find("G(1,2)").is_none());
    }

    #[test]
    fn misplaced_variadic_is_reported() {
        let mut registry = PatternRegistry::new();
        let mut warnings = Vec::new();
        define_function_macro(
            &mut registry,
            "BAD",
            "..., tail",
            "x".to_string(),
            &mut |w| warnings.push(w),
        );
        assert_eq!(warnings.len(), 1);
    }
}
