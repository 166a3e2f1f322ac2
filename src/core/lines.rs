use super::declaration::LineRange;

/// Raw source lines of one input unit, addressed by 1-based line number
#[derive(Debug, Clone, Default)]
pub struct LineStore {
    lines: Vec<String>,
}

impl LineStore {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn from_source(source: &str) -> Self {
        Self {
            lines: source.lines().map(str::to_string).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line `number`, or `None` outside `1..=len`
    pub fn get(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .map(String::as_str)
    }

    /// Clamp a range to the stored lines, `None` if nothing remains
    pub fn clamp(&self, range: LineRange) -> Option<LineRange> {
        let start = range.start.max(1);
        let end = range.end.min(self.lines.len());
        (start <= end).then_some(LineRange { start, end })
    }

    /// Lines of `range` with surrounding whitespace trimmed
    pub fn trimmed(&self, range: LineRange) -> Vec<&str> {
        match self.clamp(range) {
            Some(range) => self.lines[range.start - 1..range.end]
                .iter()
                .map(|line| line.trim())
                .collect(),
            None => Vec::new(),
        }
    }
}
