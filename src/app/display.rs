use std::io::{self, IsTerminal, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::execute;
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};

fn styled(mark: &str, paint: fn(&str) -> String) -> String {
    if io::stdout().is_terminal() {
        paint(mark)
    } else {
        mark.to_string()
    }
}

pub(crate) fn ok_mark() -> String {
    styled("✓", |mark| mark.green().to_string())
}

pub(crate) fn warn_mark() -> String {
    styled("⚠", |mark| mark.yellow().to_string())
}

pub(crate) fn error_mark() -> String {
    styled("✗", |mark| mark.red().to_string())
}

pub(crate) fn rule() -> String {
    "=".repeat(70)
}

pub(crate) fn progress_bar(done: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("[{}] 100% (0/0)", "█".repeat(width));
    }
    let filled = width * done.min(total) / total;
    let percent = done.min(total) * 100 / total;
    format!(
        "[{}{}] {percent}% ({done}/{total})",
        "█".repeat(filled),
        "-".repeat(width - filled)
    )
}

/// Redraws a single progress line on stderr when it is a terminal.
pub(crate) struct Progress {
    total: usize,
    enabled: bool,
}

impl Progress {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            enabled: io::stderr().is_terminal(),
        }
    }

    pub(crate) fn update(&self, done: usize) {
        if !self.enabled {
            return;
        }
        let mut stderr = io::stderr();
        let _ = execute!(
            stderr,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(progress_bar(done, self.total, 40))
        );
    }

    pub(crate) fn finish(&self) {
        if self.enabled {
            let mut stderr = io::stderr();
            let _ = writeln!(stderr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_scales_to_width() {
        assert_eq!(progress_bar(1, 4, 8), "[██------] 25% (1/4)");
        assert_eq!(progress_bar(4, 4, 4), "[████] 100% (4/4)");
    }

    #[test]
    fn progress_bar_handles_empty_total() {
        assert_eq!(progress_bar(0, 0, 2), "[██] 100% (0/0)");
    }
}
