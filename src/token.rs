use std::fmt;

/// Source position of a token or node. Both fields are 0-based; `column`
/// already accounts for tab expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i64),
    Text(String),

    // Keywords
    Var,
    For,
    End,
    In,
    Do,
    Read,
    Print,
    Int,
    String,
    Bool,
    Assert,

    // Operators
    Plus,  // +
    Minus, // -
    Star,  // *
    Slash, // /
    Less,  // <
    Equal, // =
    And,   // &
    Not,   // !

    // Delimiters
    Semicolon, // ;
    Colon,     // :
    Assign,    // :=
    Range,     // ..
    LParen,    // (
    RParen,    // )

    EOF,
}

impl TokenKind {
    /// Screens scanned identifier text against the reserved words.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "var" => TokenKind::Var,
            "for" => TokenKind::For,
            "end" => TokenKind::End,
            "in" => TokenKind::In,
            "do" => TokenKind::Do,
            "read" => TokenKind::Read,
            "print" => TokenKind::Print,
            "int" => TokenKind::Int,
            "string" => TokenKind::String,
            "bool" => TokenKind::Bool,
            "assert" => TokenKind::Assert,
            _ => return None,
        };
        Some(kind)
    }

    pub fn operator(ch: char) -> Option<TokenKind> {
        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '<' => TokenKind::Less,
            '=' => TokenKind::Equal,
            '&' => TokenKind::And,
            '!' => TokenKind::Not,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Identifier(name) => return write!(f, "identifier '{name}'"),
            TokenKind::Integer(value) => return write!(f, "integer {value}"),
            TokenKind::Text(value) => return write!(f, "string {value:?}"),
            TokenKind::Var => "'var'",
            TokenKind::For => "'for'",
            TokenKind::End => "'end'",
            TokenKind::In => "'in'",
            TokenKind::Do => "'do'",
            TokenKind::Read => "'read'",
            TokenKind::Print => "'print'",
            TokenKind::Int => "'int'",
            TokenKind::String => "'string'",
            TokenKind::Bool => "'bool'",
            TokenKind::Assert => "'assert'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Less => "'<'",
            TokenKind::Equal => "'='",
            TokenKind::And => "'&'",
            TokenKind::Not => "'!'",
            TokenKind::Semicolon => "';'",
            TokenKind::Colon => "':'",
            TokenKind::Assign => "':='",
            TokenKind::Range => "'..'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::EOF => "end of file",
        };
        f.write_str(text)
    }
}

/// A scanned token. Equality looks at the kind only: two `for` tokens are
/// equal wherever they were found, identifiers and literals compare by payload.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is(&self, kind: &TokenKind) -> bool {
        &self.kind == kind
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Token {}
