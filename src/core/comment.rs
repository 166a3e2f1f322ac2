//! Line-comment documentation: locating the block that precedes a declaration
//! and turning it into markdown text.

use super::declaration::LineRange;
use super::lines::LineStore;

const COMMENT_MARKER: &str = "//";

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with(COMMENT_MARKER)
}

/// Find the comment block documenting a declaration that starts at `start_line`.
///
/// Walks upward from the line above the declaration. A single blank line may
/// separate the declaration from its comment; anything else ends the search.
/// The returned range covers only comment lines.
pub fn locate(lines: &LineStore, start_line: usize) -> Option<LineRange> {
    let mut current = start_line.checked_sub(1)?;
    if current == 0 || current > lines.len() {
        return None;
    }

    let mut gap_used = false;
    let mut block: Option<LineRange> = None;

    while let Some(text) = lines.get(current) {
        if is_comment(text) {
            block = Some(match block {
                Some(range) => LineRange { start: current, end: range.end },
                None => LineRange { start: current, end: current },
            });
        } else if block.is_some() {
            break;
        } else if text.trim().is_empty() && !gap_used {
            gap_used = true;
        } else {
            return None;
        }

        match current.checked_sub(1) {
            Some(previous) if previous > 0 => current = previous,
            _ => break,
        }
    }

    block
}

/// Render the comment lines of `range` as markdown text.
///
/// The marker (up to three slashes) and one following space are removed. An
/// empty line becomes a paragraph break, other lines are joined with spaces.
pub fn extract_text(lines: &LineStore, range: LineRange) -> String {
    let Some(range) = lines.clamp(range) else {
        return String::new();
    };

    let mut text = String::new();
    for number in range.start..=range.end {
        let Some(raw) = lines.get(number) else {
            continue;
        };
        let line = strip_marker(raw);
        if line.is_empty() {
            text.push_str("\n\n");
            continue;
        }
        text.push_str(line);
        if number < range.end {
            text.push(' ');
        }
    }
    text
}

fn strip_marker(raw: &str) -> &str {
    let mut line = raw.trim_start_matches([' ', '\t']);
    for _ in 0..3 {
        match line.strip_prefix('/') {
            Some(rest) => line = rest,
            None => break,
        }
    }
    line.strip_prefix(' ').unwrap_or(line)
}
