use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use super::display::{error_mark, warn_mark};
use super::fill::{SelectionSpec, parse};

pub(crate) const SELECTION_HELP: &str = "\
Select shows to fill:
  - Gaps only: 1 3 5
  - With beginning: 1b 3b
  - With ending: 1e 3e
  - Beginning + gaps + ending: 1be 3be
  - Range: 1-3 or 1-3be
  - Mixed: 1b 3 5-7e
  - All with all parts: allbe
  - Cancel: leave empty";

fn is_cancel(answer: &str) -> bool {
    matches!(answer, "" | "cancel" | "q" | "quit")
}

/// Reads selections until one parses. `None` means the user cancelled.
pub(crate) fn prompt_selection<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    show_count: usize,
) -> Result<Option<SelectionSpec>> {
    loop {
        write!(output, "Your selection: ")?;
        output.flush()?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("failed to read selection")?;
        if read == 0 {
            return Ok(None);
        }

        let answer = line.trim().to_ascii_lowercase();
        if is_cancel(&answer) {
            return Ok(None);
        }

        match parse(&answer, show_count) {
            Ok(spec) if spec.is_empty() => return Ok(None),
            Ok(spec) => return Ok(Some(spec)),
            Err(err) if err.is_input_error() => {
                writeln!(output, "{} {err}", error_mark())?;
                writeln!(
                    output,
                    "{} Try again, or leave empty to cancel.",
                    warn_mark()
                )?;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Parses a selection given on the command line. Input errors are reported
/// on `output` and yield `None`, like a cancelled prompt.
pub(crate) fn selection_from_flag<W: Write>(
    text: &str,
    output: &mut W,
    show_count: usize,
) -> Result<Option<SelectionSpec>> {
    match parse(text, show_count) {
        Ok(spec) if spec.is_empty() => Ok(None),
        Ok(spec) => Ok(Some(spec)),
        Err(err) if err.is_input_error() => {
            writeln!(output, "{} {err}", error_mark())?;
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<bool> {
    write!(output, "{question} (yes/no): ")?;
    output.flush()?;
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read confirmation")?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "yes" | "y"
    ))
}
