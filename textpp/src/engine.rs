//! The expansion loop and directive dispatch.

use std::io::Write;
use std::path::Path;

use crate::buffer::FileFrame;
use crate::command::splice_command;
use crate::cond::ConditionalStack;
use crate::config::{IncludeContext, IncludeResolver, PreprocessorConfig, WarningHandler};
use crate::error::PreprocessError;
use crate::expr::evaluate;
use crate::funcmacro::{define_function_macro, expand_call};
use crate::registry::{Expansion, PatternRegistry};
use crate::token::clean_fragment;

/// What the loop does after dispatching one match.
enum Step {
    /// The line changed; rescan it from the first pattern. Extra lines in the
    /// replacement are inserted into the frame after the current index.
    Replace(String),
    /// The line is fully consumed with no output; move to the next one.
    Consume,
    /// The frame was restructured at the current index; read it again.
    Reread,
}

/// The block terminator for a multi-line `#define NAME(params)`.
fn is_end_def(line: &str) -> bool {
    line.trim_start()
        .strip_prefix('#')
        .is_some_and(|rest| rest.trim() == "end-def")
}

fn emit_warning(handler: Option<&WarningHandler>, message: &str) {
    match handler {
        Some(handler) => handler(message),
        None => log::warn!("{message}"),
    }
}

/// The preprocessor: a pattern registry, a conditional stack, and the loop
/// that drives them over a stack of file frames.
///
/// One instance carries its macro state across every file it processes, so
/// a definition made while processing one input is visible in the next.
pub struct Preprocessor {
    registry: PatternRegistry,
    conditionals: ConditionalStack,
    include_resolver: Option<IncludeResolver>,
    warning_handler: Option<WarningHandler>,
    include_stack: Vec<String>,
    current_file: String,
    output_lines: usize,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Create a preprocessor with only the built-in patterns registered.
    #[must_use]
    pub fn new() -> Self {
        Preprocessor {
            registry: PatternRegistry::new(),
            conditionals: ConditionalStack::new(),
            include_resolver: None,
            warning_handler: None,
            include_stack: Vec::new(),
            current_file: String::new(),
            output_lines: 0,
        }
    }

    /// Create a preprocessor from a configuration: pre-registered defines,
    /// include resolver, and warning handler.
    #[must_use]
    pub fn from_config(config: &PreprocessorConfig) -> Self {
        let mut pp = Self::new();
        for name in &config.defines {
            pp.registry.define(name, "");
        }
        pp.include_resolver = config.include_resolver.clone();
        pp.warning_handler = config.warning_handler.clone();
        pp
    }

    /// Register `name` as an existence-only macro.
    pub fn define(&mut self, name: &str) {
        self.registry.define(name, "");
    }

    /// Register `name` with a replacement value.
    pub fn define_value(&mut self, name: &str, value: &str) {
        self.registry.define(name, value);
    }

    /// Remove the macro `name`. Returns false if it was not defined.
    pub fn undef(&mut self, name: &str) -> bool {
        self.registry.undef(name)
    }

    /// Whether `name` is currently defined as an object-like macro.
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.registry.exists(name)
    }

    /// Preprocess `input` under the display name `name`, writing eligible
    /// lines to `out`.
    pub fn process_str(
        &mut self,
        name: &str,
        input: &str,
        out: &mut dyn Write,
    ) -> Result<(), PreprocessError> {
        self.run_frame(FileFrame::new(name, input), out)
    }

    /// Preprocess the file at `path`, writing eligible lines to `out`.
    pub fn process_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        out: &mut dyn Write,
    ) -> Result<(), PreprocessError> {
        let name = path.as_ref().to_string_lossy().into_owned();
        let text = self.load(&name)?;
        log::info!("processing {name}");
        self.run_frame(FileFrame::new(name.as_str(), &text), out)
    }

    /// Lines written to the output so far, across all processed files.
    #[must_use]
    pub fn output_lines(&self) -> usize {
        self.output_lines
    }

    /// Resolve `path` through the configured resolver, or the file system
    /// when none is set.
    fn load(&self, path: &str) -> Result<String, PreprocessError> {
        match &self.include_resolver {
            Some(resolver) => {
                let context = IncludeContext {
                    include_stack: self.include_stack.clone(),
                };
                resolver(path, &context)
                    .ok_or_else(|| PreprocessError::FileNotFound(path.to_string()))
            }
            None => std::fs::read_to_string(path)
                .map_err(|_| PreprocessError::FileNotFound(path.to_string())),
        }
    }

    fn warn(&self, message: String) {
        emit_warning(self.warning_handler.as_ref(), &message);
    }

    /// A closure form of [`Self::warn`] that can live alongside a mutable
    /// borrow of the registry.
    fn warn_fn(&self) -> impl FnMut(String) + use<> {
        let handler = self.warning_handler.clone();
        move |message: String| emit_warning(handler.as_ref(), &message)
    }

    /// Run one file frame to completion. The conditional stack is shared
    /// with the enclosing frames; a conditional left open when this frame
    /// ends is reported and stays open for the includer.
    fn run_frame(&mut self, mut frame: FileFrame, out: &mut dyn Write) -> Result<(), PreprocessError> {
        let parent = std::mem::replace(&mut self.current_file, frame.name.clone());
        self.include_stack.push(frame.name.clone());
        let depth_at_entry = self.conditionals.depth();

        let result = self.expand_lines(&mut frame, out);

        log::debug!(
            "{} output line(s) after end of {}",
            self.output_lines,
            frame.name
        );
        let opened = self.conditionals.depth().saturating_sub(depth_at_entry);
        if opened > 0 {
            self.warn(format!(
                "{opened} unmatched #if/#ifdef(s) after end of {}",
                frame.name
            ));
        }
        self.include_stack.pop();
        self.current_file = parent;
        result
    }

    fn expand_lines(&mut self, frame: &mut FileFrame, out: &mut dyn Write) -> Result<(), PreprocessError> {
        let mut i = 0;
        // the line under expansion when it differs from frame.lines[i]; a
        // replacement never writes back into the frame
        let mut current: Option<String> = None;

        while i < frame.lines.len() {
            let line = match current.take() {
                Some(changed) => changed,
                None => frame.lines[i].clone(),
            };

            // earliest match wins; on a tie the pattern registered first
            let mut best_start = line.len();
            let mut best: Option<(usize, usize)> = None;
            for (slot, entry) in self.registry.live_entries() {
                if let Some((start, end)) = entry.find(&line) {
                    if start < best_start {
                        best_start = start;
                        best = Some((end, slot));
                    }
                }
            }

            let Some((end, slot)) = best else {
                if self.conditionals.eligible() {
                    self.emit(out, &line)?;
                }
                i += 1;
                continue;
            };
            let start = best_start;

            let (groups, expansion) = match self.registry.entry(slot) {
                Some(entry) => match entry.capture_groups(&line, start) {
                    Some(groups) => (groups, entry.expansion.clone()),
                    None => {
                        self.warn(format!(
                            "internal match inconsistency on line {} in {}, giving up on this file",
                            i + 1,
                            self.current_file
                        ));
                        break;
                    }
                },
                None => {
                    i += 1;
                    continue;
                }
            };
            let pre = &line[..start];
            let post = &line[end..];

            let step = match expansion {
                Expansion::Literal(text) => Step::Replace(format!("{pre}{text}{post}")),
                Expansion::LineNumber => Step::Replace(format!("{pre}{}{post}", i + 1)),
                Expansion::FileName => {
                    Step::Replace(format!("{pre}{}{post}", self.current_file))
                }
                Expansion::FnUse { params, body } => {
                    let expanded = expand_call(&params, &body, &groups);
                    Step::Replace(format!("{pre}{expanded}{post}"))
                }
                Expansion::CommentStart => {
                    let eligible = self.conditionals.eligible();
                    if eligible {
                        self.emit(out, &line)?;
                    }
                    i += 1;
                    if !line.trim_end().ends_with("*/") {
                        while i < frame.lines.len() {
                            let text = frame.lines[i].clone();
                            if eligible {
                                self.emit(out, &text)?;
                            }
                            i += 1;
                            if text.trim_end().ends_with("*/") {
                                break;
                            }
                        }
                    }
                    continue;
                }
                Expansion::Include => {
                    let path = groups.first().cloned().unwrap_or_default();
                    match self.load(&path) {
                        Ok(text) => {
                            let child = FileFrame::new(path.as_str(), &text);
                            self.run_frame(child, out)?;
                        }
                        Err(err) => self.warn(format!(
                            "{err}, included from {} at line {}",
                            self.current_file,
                            i + 1
                        )),
                    }
                    Step::Consume
                }
                Expansion::DefineNull => {
                    let name = groups.first().cloned().unwrap_or_default();
                    self.registry.define(&name, "");
                    Step::Consume
                }
                Expansion::DefineValue => {
                    let name = groups.first().cloned().unwrap_or_default();
                    let value = groups.get(1).cloned().unwrap_or_default();
                    self.registry.define(&name, &value);
                    Step::Consume
                }
                Expansion::Undef => {
                    let name = groups.first().cloned().unwrap_or_default();
                    if !self.registry.undef(&name) {
                        self.warn(format!(
                            "cannot undefine [{name}], it was not defined ({} line {})",
                            self.current_file,
                            i + 1
                        ));
                    }
                    Step::Consume
                }
                Expansion::If => {
                    let expr = groups.first().cloned().unwrap_or_default();
                    let mut warn = self.warn_fn();
                    let value = evaluate(&expr, &self.registry, &mut warn);
                    self.conditionals.push(value);
                    Step::Consume
                }
                Expansion::Ifdef => {
                    let name = groups.first().cloned().unwrap_or_default();
                    self.conditionals.push(self.registry.exists(&name));
                    Step::Consume
                }
                Expansion::Else => {
                    if !self.conditionals.flip_top() {
                        self.warn(format!(
                            "#else without matching #if/#ifdef ({} line {})",
                            self.current_file,
                            i + 1
                        ));
                    }
                    Step::Consume
                }
                Expansion::Endif => {
                    if self.conditionals.pop().is_none() {
                        self.warn(format!(
                            "#endif without matching #if/#ifdef ({} line {})",
                            self.current_file,
                            i + 1
                        ));
                    }
                    Step::Consume
                }
                Expansion::Command => {
                    let cmd = groups.first().cloned().unwrap_or_default();
                    let mut warn = self.warn_fn();
                    if !splice_command(&cmd, frame, i, &mut warn) {
                        // could not start the child; drop the directive line
                        // and process the block as ordinary text
                        frame.splice(i..=i, Vec::new());
                    }
                    Step::Reread
                }
                Expansion::DefineFn => {
                    let name = groups.first().cloned().unwrap_or_default();
                    let params_text = groups.get(1).cloned().unwrap_or_default();
                    let body = clean_fragment(groups.get(2).map_or("", String::as_str));
                    let mut warn = self.warn_fn();
                    define_function_macro(&mut self.registry, &name, &params_text, body, &mut warn);
                    Step::Consume
                }
                Expansion::DefineFnMulti => {
                    let name = groups.first().cloned().unwrap_or_default();
                    let params_text = groups.get(1).cloned().unwrap_or_default();
                    let mut k = i + 1;
                    while k < frame.lines.len() && !is_end_def(&frame.lines[k]) {
                        k += 1;
                    }
                    if k >= frame.lines.len() {
                        self.warn(format!(
                            "did not find \"#end-def\" before end of {} to match \"#define {name}(...)\" at line {}",
                            self.current_file,
                            i + 1
                        ));
                        break;
                    }
                    // each body line keeps its newline so text following a
                    // call site ends up on its own line after the expansion
                    let mut body = String::new();
                    for body_line in &frame.lines[i + 1..k] {
                        body.push_str(body_line);
                        body.push('\n');
                    }
                    let mut warn = self.warn_fn();
                    define_function_macro(&mut self.registry, &name, &params_text, body, &mut warn);
                    i = k + 1;
                    continue;
                }
            };

            match step {
                Step::Replace(text) => {
                    let text = text
                        .strip_suffix('\n')
                        .map(str::to_string)
                        .unwrap_or(text);
                    let mut pieces = text.split('\n');
                    let first = pieces.next().unwrap_or_default().to_string();
                    let rest: Vec<String> = pieces.map(str::to_string).collect();
                    if !rest.is_empty() {
                        frame.insert_after(i, rest);
                    }
                    current = Some(first);
                }
                Step::Consume => i += 1,
                Step::Reread => {}
            }
        }

        Ok(())
    }

    fn emit(&mut self, out: &mut dyn Write, line: &str) -> Result<(), PreprocessError> {
        self.output_lines += 1;
        writeln!(out, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_def_marker_forms() {
        assert!(is_end_def("#end-def"));
        assert!(is_end_def("  # end-def "));
        assert!(!is_end_def("#end-define"));
        assert!(!is_end_def("end-def"));
    }
}
