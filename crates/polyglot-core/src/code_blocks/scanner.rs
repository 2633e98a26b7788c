//! Linear tokenizer for triple-backtick fences.

const FENCE: &str = "```";

/// A fenced segment found in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FencedSegment<'a> {
    /// Position of the segment among all segments found (0-based).
    pub index: usize,
    /// First whitespace-separated token of the info string, as written.
    pub tag: &'a str,
    /// Text between the opening line and the closing fence, untrimmed.
    pub body: &'a str,
}

/// Iterator over the fenced segments of a text.
///
/// An opening fence is three backticks at the start of a line, optionally
/// indented with spaces or tabs. The info string runs to the end of that line
/// and may not contain a backtick, so inline spans such as ```` ```x``` ```` are
/// skipped. The body ends at the next triple backtick wherever it appears.
/// Scanning resumes on the line after the closing fence. An opening fence with
/// no closing fence ends the scan.
///
/// Every byte is visited a bounded number of times, so the scan is linear in
/// the input length.
#[derive(Debug, Clone)]
pub struct FenceScanner<'a> {
    text: &'a str,
    /// Always the start of a line, or `text.len()` once exhausted.
    pos: usize,
    found: usize,
}

impl<'a> FenceScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0, found: 0 }
    }

    /// Byte offset of the line after the one containing `from`.
    fn next_line_start(&self, from: usize) -> usize {
        self.text[from..].find('\n').map_or(self.text.len(), |offset| from + offset + 1)
    }
}

impl<'a> Iterator for FenceScanner<'a> {
    type Item = FencedSegment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            let line_start = self.pos;
            let Some(newline) = self.text[line_start..].find('\n').map(|i| line_start + i) else {
                // The last line cannot open a fence: there is no body after it.
                self.pos = self.text.len();
                return None;
            };
            self.pos = newline + 1;

            let line = &self.text[line_start..newline];
            let Some(info) = line.trim_start_matches([' ', '\t']).strip_prefix(FENCE) else {
                continue;
            };
            if info.contains('`') {
                continue;
            }

            let body_start = newline + 1;
            let Some(body_len) = self.text[body_start..].find(FENCE) else {
                self.pos = self.text.len();
                return None;
            };
            let body_end = body_start + body_len;
            self.pos = self.next_line_start(body_end + FENCE.len());

            let segment = FencedSegment {
                index: self.found,
                tag: info.split_whitespace().next().unwrap_or(""),
                body: &self.text[body_start..body_end],
            };
            self.found += 1;
            return Some(segment);
        }
        None
    }
}
