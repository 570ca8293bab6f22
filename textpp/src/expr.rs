//! Boolean expression evaluation for `#if`.
//!
//! Evaluation runs in two phases. The first pass collapses each identifier
//! (an existence test, or a string-(in)equality test against a quoted literal
//! or another macro's expansion) into a single `t`/`f` byte, keeping only the
//! structural characters `( ) & | ^ !`. The second pass folds that normalized
//! string left to right: `&`, `|` and `^` share one precedence level and
//! there is no short-circuiting.

use crate::registry::PatternRegistry;
use crate::token::{is_identifier_continue, is_identifier_start};

/// Evaluate a `#if` expression against the registry.
///
/// Expression errors are reported through `warn` and make the whole
/// expression false.
pub(crate) fn evaluate(
    expr: &str,
    registry: &PatternRegistry,
    warn: &mut dyn FnMut(String),
) -> bool {
    match normalize(expr, registry, warn) {
        Some(normalized) => {
            log::trace!("#if [{expr}] normalized to [{normalized}]");
            fold(normalized.as_bytes(), 0, false, warn).0
        }
        None => false,
    }
}

/// Phase 1: resolve identifiers and tests to `t`/`f`, drop whitespace, pass
/// structural characters through. `None` signals a reported error.
fn normalize(
    expr: &str,
    registry: &PatternRegistry,
    warn: &mut dyn FnMut(String),
) -> Option<String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut not_pending = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if is_identifier_start(c) {
            let start = i;
            while i < chars.len() && is_identifier_continue(chars[i]) {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();

            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }

            let value = if j < chars.len() && (chars[j] == '=' || chars[j] == '~') {
                let op = chars[j];
                j += 1;
                // accept the doubled forms `==` and `~~` as well
                if j < chars.len() && chars[j] == op {
                    j += 1;
                }
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j >= chars.len() || !(is_identifier_start(chars[j]) || chars[j] == '"') {
                    warn(format!(
                        "expecting identifier or quoted literal after '{op}' in expression [{expr}]"
                    ));
                    return None;
                }
                let rhs: Option<String> = if chars[j] == '"' {
                    j += 1;
                    let lit_start = j;
                    while j < chars.len() && chars[j] != '"' {
                        j += 1;
                    }
                    let literal: String = chars[lit_start..j].iter().collect();
                    if j < chars.len() {
                        j += 1;
                    }
                    Some(literal)
                } else {
                    let name_start = j;
                    while j < chars.len() && is_identifier_continue(chars[j]) {
                        j += 1;
                    }
                    let name: String = chars[name_start..j].iter().collect();
                    registry.lookup_expansion(&name).map(str::to_string)
                };
                i = j;

                // either side failing to resolve makes the test false
                match (registry.lookup_expansion(&ident), rhs) {
                    (Some(lhs), Some(rhs)) => {
                        if op == '~' {
                            lhs.eq_ignore_ascii_case(&rhs)
                        } else {
                            lhs == rhs
                        }
                    }
                    _ => false,
                }
            } else {
                registry.exists(&ident)
            };

            out.push(if value ^ not_pending { 't' } else { 'f' });
            not_pending = false;
            continue;
        }

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '(' => {
                if not_pending {
                    out.push('!');
                    not_pending = false;
                }
                out.push('(');
            }
            ')' | '&' | '|' | '^' => {
                if not_pending {
                    warn(format!("'!' may not precede '{c}' in expression [{expr}]"));
                    return None;
                }
                out.push(c);
            }
            '!' => not_pending = !not_pending,
            _ => {
                warn(format!(
                    "illegal character [{c}] in boolean expression [{expr}]"
                ));
                return None;
            }
        }
        i += 1;
    }

    Some(out)
}

/// Phase 2: fold a normalized expression left to right from `from`.
///
/// Returns the value and the index of the last consumed byte (the matching
/// `)` when `in_group` is set, or one past the end otherwise), so the caller
/// can resume after a parenthesized group.
fn fold(expr: &[u8], from: usize, in_group: bool, warn: &mut dyn FnMut(String)) -> (bool, usize) {
    let mut result = false;
    let mut not_pending = false;
    let mut pending_op: Option<u8> = None;
    let mut i = from;

    while i < expr.len() {
        match expr[i] {
            b't' | b'f' => {
                result = apply(result, expr[i] == b't', pending_op.take());
            }
            b'(' => {
                let (sub, close) = fold(expr, i + 1, true, warn);
                result = apply(result, sub ^ not_pending, pending_op.take());
                not_pending = false;
                i = close;
            }
            b')' => {
                if in_group {
                    return (result, i);
                }
                warn("closing bracket without matching opening bracket in expression".to_string());
                return (false, i);
            }
            b'!' => not_pending = !not_pending,
            b'&' | b'|' | b'^' => {
                if pending_op.is_some() {
                    warn("two operations not separated by an operand in expression".to_string());
                    return (false, i);
                }
                pending_op = Some(expr[i]);
            }
            other => {
                warn(format!(
                    "illegal character [{}] while evaluating boolean expression",
                    other as char
                ));
                return (false, i);
            }
        }
        i += 1;
    }

    (result, i)
}

fn apply(acc: bool, operand: bool, op: Option<u8>) -> bool {
    match op {
        None => operand,
        Some(b'&') => acc & operand,
        Some(b'|') => acc | operand,
        Some(b'^') => acc ^ operand,
        // pending_op is only ever set to one of the three above
        Some(_) => operand,
    }
}
