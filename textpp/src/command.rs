//! External command splicing for `#command` ... `#end-command`.

use std::io::{Read, Write};
use std::process::{Command, Stdio};

use crate::buffer::FileFrame;

/// The block terminator: `#` at the start of the line, then `end-command`.
fn is_end_command(line: &str) -> bool {
    line.strip_prefix('#').is_some_and(|rest| rest.trim() == "end-command")
}

/// Feed the block of lines after `start` to `cmd` and splice the command's
/// output over the consumed range (the `#command` line through the
/// `#end-command` line, or the end of the buffer when the terminator is
/// missing). Returns false if the child process could not be started.
///
/// The command line is split on whitespace with no quoting support. The
/// child's stderr is inherited. All input is written before any output is
/// read; a child that streams output while its input is still pending can
/// fill the pipe and deadlock. That ordering is part of the contract here
/// (see DESIGN.md) and is not worked around.
pub(crate) fn splice_command(
    cmd: &str,
    frame: &mut FileFrame,
    start: usize,
    warn: &mut dyn FnMut(String),
) -> bool {
    let mut parts = cmd.split_whitespace();
    let Some(program) = parts.next() else {
        warn(format!("empty #command at line {} in {}", start + 1, frame.name));
        return false;
    };

    let spawned = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            warn(format!(
                "could not start process from [{cmd}] on line {} in {}: {err}",
                start + 1,
                frame.name
            ));
            return false;
        }
    };
    log::debug!("#command spawned [{cmd}] at line {} in {}", start + 1, frame.name);

    let mut end_found = false;
    let mut k = start + 1;
    let mut input = String::new();
    while k < frame.lines.len() {
        if is_end_command(&frame.lines[k]) {
            end_found = true;
            break;
        }
        input.push_str(&frame.lines[k]);
        input.push('\n');
        k += 1;
    }
    if !end_found {
        warn(format!(
            "did not find \"#end-command\" before end of file to match \"#command\" at line {} in {}",
            start + 1,
            frame.name
        ));
    }

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(err) = stdin.write_all(input.as_bytes()) {
            warn(format!("could not write input to [{cmd}]: {err}"));
        }
        // stdin drops here, closing the child's input
    }

    let mut output = String::new();
    if let Some(mut stdout) = child.stdout.take() {
        if let Err(err) = stdout.read_to_string(&mut output) {
            warn(format!("could not read output of [{cmd}]: {err}"));
        }
    }
    if let Err(err) = child.wait() {
        warn(format!("could not wait for [{cmd}]: {err}"));
    }

    let replacement: Vec<String> = if output.is_empty() {
        Vec::new()
    } else {
        output
            .strip_suffix('\n')
            .unwrap_or(&output)
            .split('\n')
            .map(str::to_string)
            .collect()
    };

    let last = if end_found { k } else { frame.lines.len() - 1 };
    log::trace!(
        "#command replaced lines {}..={} with {} output line(s)",
        start + 1,
        last + 1,
        replacement.len()
    );
    frame.splice(start..=last, replacement);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_marker_forms() {
        assert!(is_end_command("#end-command"));
        assert!(is_end_command("#  end-command  "));
        assert!(!is_end_command("  #end-command"));
        assert!(!is_end_command("#end-commands"));
    }

    #[test]
    fn splices_output_over_block() {
        let mut frame = FileFrame::new("f", "#command cat\none\ntwo\n#end-command\ntail\n");
        let mut warnings = Vec::new();
        assert!(splice_command("cat", &mut frame, 0, &mut |w| warnings.push(w)));
        assert!(warnings.is_empty());
        assert_eq!(frame.lines, vec!["one", "two", "tail"]);
    }

    #[test]
    fn missing_terminator_consumes_to_end_with_warning() {
        let mut frame = FileFrame::new("f", "#command cat\nonly\n");
        let mut warnings = Vec::new();
        assert!(splice_command("cat", &mut frame, 0, &mut |w| warnings.push(w)));
        assert_eq!(warnings.len(), 1);
        assert_eq!(frame.lines, vec!["only"]);
    }

    #[test]
    fn unstartable_command_is_reported() {
        let mut frame = FileFrame::new("f", "#command nope\n#end-command\n");
        let mut warnings = Vec::new();
        assert!(!splice_command(
            "definitely-not-a-real-binary-9f2c",
            &mut frame,
            0,
            &mut |w| warnings.push(w)
        ));
        assert_eq!(warnings.len(), 1);
        assert_eq!(frame.lines.len(), 2);
    }
}
