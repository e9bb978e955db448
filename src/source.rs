//! Line-indexed view of a source file and the character cursor the lexer
//! reads from.

use crate::token::Span;

pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Source split into lines. Each stored line keeps its trailing `'\n'` (the
/// last line may lack one) so the cursor sees newlines as ordinary characters.
#[derive(Debug, Clone)]
pub struct SourceText {
    lines: Vec<Vec<char>>,
    tab_width: usize,
}

impl SourceText {
    pub fn new(source: &str, tab_width: usize) -> Self {
        let lines = source
            .split_inclusive('\n')
            .map(|line| line.chars().collect())
            .collect();
        Self {
            lines,
            tab_width: tab_width.max(1),
        }
    }

    /// Text of a 0-based line without its line terminator.
    pub fn line(&self, index: usize) -> Option<String> {
        let line = self.lines.get(index)?;
        let text: String = line.iter().collect();
        Some(text.trim_end_matches(['\n', '\r']).to_string())
    }

    pub fn reader(&self) -> SourceReader<'_> {
        SourceReader::new(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Position {
    line: usize,
    index: usize,
    column: usize,
}

/// Character cursor over a [`SourceText`]. Supports a single character of
/// backtracking, which is all the comment and operator recognizers need.
#[derive(Debug, Clone)]
pub struct SourceReader<'a> {
    source: &'a SourceText,
    position: Position,
    previous: Option<Position>,
}

impl<'a> SourceReader<'a> {
    pub fn new(source: &'a SourceText) -> Self {
        Self {
            source,
            position: Position::default(),
            previous: None,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.position.line, self.position.column)
    }

    pub fn peek(&self) -> Option<char> {
        self.source
            .lines
            .get(self.position.line)
            .and_then(|line| line.get(self.position.index))
            .copied()
    }

    pub fn next_char(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.previous = Some(self.position);

        if ch == '\n' {
            self.position = Position {
                line: self.position.line + 1,
                index: 0,
                column: 0,
            };
        } else {
            self.position.index += 1;
            self.position.column = match ch {
                '\t' => {
                    let width = self.source.tab_width;
                    (self.position.column / width + 1) * width
                }
                _ => self.position.column + 1,
            };
        }
        Some(ch)
    }

    /// Steps back over the character returned by the last `next_char`.
    /// Returns `false` when there is nothing to step back over.
    pub fn backtrack(&mut self) -> bool {
        match self.previous.take() {
            Some(position) => {
                self.position = position;
                true
            }
            None => false,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.peek().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_across_lines() {
        let source = SourceText::new("ab\nc", 4);
        let mut reader = source.reader();
        let chars: Vec<char> = std::iter::from_fn(|| reader.next_char()).collect();
        assert_eq!(chars, vec!['a', 'b', '\n', 'c']);
        assert!(reader.is_at_end());
        assert_eq!(source.line(0).as_deref(), Some("ab"));
        assert_eq!(source.line(1).as_deref(), Some("c"));
    }

    #[test]
    fn expands_tabs_for_columns_only() {
        let source = SourceText::new("\tx\n  \ty", 4);
        let mut reader = source.reader();
        reader.next_char();
        assert_eq!(reader.peek(), Some('x'));
        assert_eq!(reader.span(), Span::new(0, 4));

        reader.next_char();
        reader.next_char();
        reader.next_char();
        reader.next_char();
        reader.next_char();
        assert_eq!(reader.peek(), Some('y'));
        assert_eq!(reader.span(), Span::new(1, 4));
    }

    #[test]
    fn backtracks_one_character() {
        let source = SourceText::new("a\nb", 4);
        let mut reader = source.reader();
        reader.next_char();
        reader.next_char();
        assert_eq!(reader.span(), Span::new(1, 0));
        assert!(reader.backtrack());
        assert_eq!(reader.peek(), Some('\n'));
        assert_eq!(reader.span(), Span::new(0, 1));
        assert!(!reader.backtrack());
    }
}
