use std::collections::VecDeque;

use crate::diagnostics::Diagnostics;
use crate::source::{SourceReader, SourceText};
use crate::token::{Token, TokenKind};

mod error;

pub use error::{LexError, LexResult};

/// How many tokens `backtrack` can retract without forward progress.
pub const BACKTRACK_DEPTH: usize = 3;

type Scan = fn(&mut SourceReader<'_>, &mut Diagnostics) -> LexResult<Option<Token>>;

/// One token class. `starts` screens the next raw character; `scan` consumes
/// the lexeme and yields a token, or `None` for skipped text.
struct Recognizer {
    starts: fn(char) -> bool,
    scan: Scan,
}

const RECOGNIZERS: [Recognizer; 6] = [
    Recognizer {
        starts: char::is_whitespace,
        scan: scan_whitespace,
    },
    Recognizer {
        starts: |c| c == '/',
        scan: scan_comment_or_slash,
    },
    Recognizer {
        starts: |c| c.is_ascii_alphabetic(),
        scan: scan_identifier,
    },
    Recognizer {
        starts: |c| c.is_ascii_digit(),
        scan: scan_integer,
    },
    Recognizer {
        starts: |c| c == '"',
        scan: scan_string,
    },
    Recognizer {
        starts: |c| TokenKind::operator(c).is_some() || c == ':' || c == '.',
        scan: scan_operator,
    },
];

pub struct Lexer<'a> {
    reader: SourceReader<'a>,
    /// The most recently produced tokens, oldest first.
    history: VecDeque<Token>,
    /// How many tokens at the back of `history` have been handed back.
    rewound: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceText) -> Self {
        Self {
            reader: source.reader(),
            history: VecDeque::with_capacity(BACKTRACK_DEPTH),
            rewound: 0,
        }
    }

    pub fn next(&mut self, diagnostics: &mut Diagnostics) -> LexResult<Token> {
        if self.rewound > 0 {
            let token = self.history[self.history.len() - self.rewound].clone();
            self.rewound -= 1;
            return Ok(token);
        }

        let token = self.scan(diagnostics)?;
        if self.history.len() == BACKTRACK_DEPTH {
            self.history.pop_front();
        }
        self.history.push_back(token.clone());
        Ok(token)
    }

    pub fn peek(&mut self, diagnostics: &mut Diagnostics) -> LexResult<Token> {
        let token = self.next(diagnostics)?;
        self.backtrack()?;
        Ok(token)
    }

    pub fn backtrack(&mut self) -> LexResult<()> {
        if self.rewound >= self.history.len() {
            return Err(LexError::BacktrackOverflow {
                depth: BACKTRACK_DEPTH,
            });
        }
        self.rewound += 1;
        Ok(())
    }

    fn scan(&mut self, diagnostics: &mut Diagnostics) -> LexResult<Token> {
        loop {
            let span = self.reader.span();
            let Some(ch) = self.reader.peek() else {
                return Ok(Token::new(TokenKind::EOF, span));
            };

            match RECOGNIZERS.iter().find(|recognizer| (recognizer.starts)(ch)) {
                Some(recognizer) => {
                    if let Some(token) = (recognizer.scan)(&mut self.reader, diagnostics)? {
                        log::trace!("{}: {}", token.span, token.kind);
                        return Ok(token);
                    }
                }
                None => {
                    diagnostics.lexical_error(format!("Unexpected character '{ch}'"), span);
                    self.reader.next_char();
                }
            }
        }
    }
}

fn scan_whitespace(reader: &mut SourceReader<'_>, _: &mut Diagnostics) -> LexResult<Option<Token>> {
    while reader.peek().is_some_and(char::is_whitespace) {
        reader.next_char();
    }
    Ok(None)
}

fn scan_comment_or_slash(
    reader: &mut SourceReader<'_>,
    diagnostics: &mut Diagnostics,
) -> LexResult<Option<Token>> {
    let span = reader.span();
    reader.next_char();
    match reader.next_char() {
        Some('/') => {
            while let Some(ch) = reader.next_char() {
                if ch == '\n' {
                    break;
                }
            }
            Ok(None)
        }
        Some('*') => {
            let mut depth = 1;
            while depth > 0 {
                match reader.next_char() {
                    Some('*') if reader.peek() == Some('/') => {
                        reader.next_char();
                        depth -= 1;
                    }
                    Some('/') if reader.peek() == Some('*') => {
                        reader.next_char();
                        depth += 1;
                    }
                    Some(_) => {}
                    None => {
                        diagnostics.warning("Unterminated block comment", span);
                        break;
                    }
                }
            }
            Ok(None)
        }
        Some(_) => {
            if !reader.backtrack() {
                return Err(LexError::InvariantViolation {
                    message: "no character to step back over after '/'",
                });
            }
            Ok(Some(Token::new(TokenKind::Slash, span)))
        }
        None => Ok(Some(Token::new(TokenKind::Slash, span))),
    }
}

fn scan_identifier(reader: &mut SourceReader<'_>, _: &mut Diagnostics) -> LexResult<Option<Token>> {
    let span = reader.span();
    let mut text = String::new();
    while let Some(ch) = reader.peek() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            text.push(ch);
            reader.next_char();
        } else {
            break;
        }
    }

    let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier(text));
    Ok(Some(Token::new(kind, span)))
}

fn scan_integer(
    reader: &mut SourceReader<'_>,
    diagnostics: &mut Diagnostics,
) -> LexResult<Option<Token>> {
    let span = reader.span();
    let mut digits = String::new();
    while let Some(ch) = reader.peek().filter(char::is_ascii_digit) {
        digits.push(ch);
        reader.next_char();
    }

    let value = digits.parse::<i64>().unwrap_or_else(|_| {
        diagnostics.lexical_error(
            format!("Integer literal '{digits}' does not fit in a 64-bit signed integer"),
            span,
        );
        1
    });
    Ok(Some(Token::new(TokenKind::Integer(value), span)))
}

fn scan_string(
    reader: &mut SourceReader<'_>,
    diagnostics: &mut Diagnostics,
) -> LexResult<Option<Token>> {
    let span = reader.span();
    reader.next_char(); // opening quote
    let mut value = String::new();
    loop {
        let escape_span = reader.span();
        match reader.next_char() {
            Some('"') => break,
            Some('\n') => {
                diagnostics.lexical_error("Newline in string literal", escape_span);
                break;
            }
            Some('\\') => match reader.next_char() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some('r') => value.push('\r'),
                Some('\\') => value.push('\\'),
                Some('"') => value.push('"'),
                Some(other) => {
                    diagnostics.lexical_error(
                        format!("Unknown escape sequence '\\{}'", other.escape_default()),
                        escape_span,
                    );
                    if other == '\n' {
                        break;
                    }
                    value.push(other);
                }
                None => {
                    diagnostics.lexical_error("Unterminated string literal", span);
                    break;
                }
            },
            Some(ch) => value.push(ch),
            None => {
                diagnostics.lexical_error("Unterminated string literal", span);
                break;
            }
        }
    }
    Ok(Some(Token::new(TokenKind::Text(value), span)))
}

fn scan_operator(
    reader: &mut SourceReader<'_>,
    diagnostics: &mut Diagnostics,
) -> LexResult<Option<Token>> {
    let span = reader.span();
    let Some(ch) = reader.next_char() else {
        return Err(LexError::InvariantViolation {
            message: "operator recognizer started at end of input",
        });
    };

    let kind = match ch {
        ':' if reader.peek() == Some('=') => {
            reader.next_char();
            TokenKind::Assign
        }
        ':' => TokenKind::Colon,
        '.' if reader.peek() == Some('.') => {
            reader.next_char();
            TokenKind::Range
        }
        '.' => {
            diagnostics.lexical_error("Unexpected character '.', did you mean '..'?", span);
            return Ok(None);
        }
        other => match TokenKind::operator(other) {
            Some(kind) => kind,
            None => {
                return Err(LexError::InvariantViolation {
                    message: "operator recognizer started on a non-operator character",
                });
            }
        },
    };
    Ok(Some(Token::new(kind, span)))
}

/// Scans the whole input, returning every significant token up to and
/// including EOF together with the lexical diagnostics.
pub fn tokenize(input: &str, tab_width: usize) -> LexResult<(Vec<Token>, Diagnostics)> {
    let source = SourceText::new(input, tab_width);
    let mut lexer = Lexer::new(&source);
    let mut diagnostics = Diagnostics::new();
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next(&mut diagnostics)?;
        let is_eof = token.is(&TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok((tokens, diagnostics))
}
