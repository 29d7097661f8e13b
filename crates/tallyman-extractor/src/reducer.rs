//! OCR text reduction ahead of prompting
//!
//! Receipts come out of OCR with symbol-run garbage lines and long stretches
//! of boilerplate. The reducer drops the garbage, and for long inputs keeps
//! only the lines likely to hold a total or a date: lines with digits and
//! short label-like lines.

/// Line inserted where kept lines were not adjacent in the input
pub const ELISION_MARKER: &str = "...";

/// Inputs with at most this many non-noise lines are passed through whole
pub const DEFAULT_MIN_LINES: usize = 20;

/// Lines up to this many characters are kept even without digits
pub const DEFAULT_SHORT_LINE_CHARS: usize = 40;

/// Reduces noisy OCR text to a bounded, high-signal excerpt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextReducer {
    min_lines: usize,
    short_line_chars: usize,
}

impl Default for TextReducer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LINES, DEFAULT_SHORT_LINE_CHARS)
    }
}

impl TextReducer {
    /// Create a reducer with explicit thresholds
    pub fn new(min_lines: usize, short_line_chars: usize) -> Self {
        Self {
            min_lines,
            short_line_chars,
        }
    }

    /// Reduce the given text
    ///
    /// Returns an empty string when nothing but noise remains.
    pub fn reduce(&self, text: &str) -> String {
        let lines: Vec<&str> = text
            .lines()
            .filter(|line| !is_noise(line))
            .map(str::trim_end)
            .collect();

        if lines.len() <= self.min_lines {
            return lines.join("\n");
        }

        let mut out: Vec<&str> = Vec::new();
        let mut last_kept: Option<usize> = None;

        for (idx, line) in lines.iter().enumerate() {
            if !self.is_signal(line) {
                continue;
            }
            if last_kept.is_some_and(|prev| idx > prev + 1) {
                out.push(ELISION_MARKER);
            }
            out.push(line);
            last_kept = Some(idx);
        }

        out.join("\n")
    }

    fn is_signal(&self, line: &str) -> bool {
        line.chars().any(|c| c.is_ascii_digit()) || line.chars().count() <= self.short_line_chars
    }
}

/// Reduce text with the default thresholds
pub fn reduce(text: &str) -> String {
    TextReducer::default().reduce(text)
}

/// Empty lines, single characters, and symbol runs with at most one
/// alphanumeric character
fn is_noise(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.chars().count() <= 1 {
        return true;
    }
    trimmed.chars().filter(|c| c.is_alphanumeric()).count() <= 1
}
