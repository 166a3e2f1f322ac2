use super::declaration::LineRange;
use super::lines::LineStore;

/// Rebuild the head of a declaration from its source lines.
///
/// Leading tabs and trailing semicolons are removed and every line is prefixed
/// with `indent` spaces. Output stops at the first line holding an opening
/// brace, so bodies are never included.
pub fn reconstruct(lines: &LineStore, range: LineRange, indent: usize) -> String {
    let Some(range) = lines.clamp(range) else {
        return String::new();
    };

    let padding = " ".repeat(indent);
    let mut signature = String::new();

    for number in range.start..=range.end {
        let Some(raw) = lines.get(number) else {
            break;
        };
        let line = raw.trim_start_matches('\t').trim_end_matches(';');

        if line.contains('{') {
            signature.push_str(&padding);
            signature.push_str(line.trim_end_matches(['{', ' ']));
            break;
        }

        signature.push_str(&padding);
        signature.push_str(line);
        if number < range.end {
            signature.push('\n');
        }
    }
    signature
}
