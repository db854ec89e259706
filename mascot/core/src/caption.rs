//! Caption Layout
//!
//! Message text is drawn on the sign the waiting pose holds up. The sign is
//! narrow, so text is word-wrapped and anything past the last line is cut
//! with an ellipsis.

use textwrap::{wrap, Options, WrapAlgorithm};

/// Characters per caption line on the 200 px sign
pub const COLUMNS: usize = 24;

/// Lines that fit on the sign
pub const MAX_LINES: usize = 3;

const ELLIPSIS: char = '\u{2026}';

/// Wrap `text` into at most `max_lines` lines of `columns` width
///
/// Explicit newlines start a new line; blank lines are kept.
#[must_use]
pub fn layout(text: &str, columns: usize, max_lines: usize) -> Vec<String> {
    if max_lines == 0 || columns == 0 {
        return Vec::new();
    }

    let options = Options::new(columns).wrap_algorithm(WrapAlgorithm::FirstFit);
    let mut wrapped: Vec<String> = text
        .trim_end()
        .lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                wrap(line, &options)
                    .into_iter()
                    .map(|cow| cow.to_string())
                    .collect()
            }
        })
        .collect();

    if wrapped.len() > max_lines {
        wrapped.truncate(max_lines);
        if let Some(last) = wrapped.last_mut() {
            let mut kept: String = last.chars().take(columns - 1).collect();
            kept.truncate(kept.trim_end().len());
            kept.push(ELLIPSIS);
            *last = kept;
        }
    }

    wrapped
}
