use crate::ast::{
    BinaryOperator, Expression, ExpressionKind, NodeId, Program, Statement, StatementKind,
    VariableType,
};
use crate::diagnostics::Diagnostics;
use crate::error::CompileResult;
use crate::lexer::{LexError, Lexer};
use crate::source::SourceText;
use crate::token::{Span, Token, TokenKind};

/// Why a production stopped early. Syntax errors have already been reported
/// by the time this is returned.
enum Interrupt {
    Syntax,
    Internal(LexError),
}

impl From<LexError> for Interrupt {
    fn from(error: LexError) -> Self {
        Interrupt::Internal(error)
    }
}

type ParseResult<T> = Result<T, Interrupt>;

pub struct Parser<'s, 'd> {
    lexer: Lexer<'s>,
    diagnostics: &'d mut Diagnostics,
    next_id: u32,
    loop_depth: usize,
    /// Set once the current statement has produced a syntax error, so that
    /// running into end of file while skipping it yields a note rather than
    /// a second error.
    statement_reported: bool,
}

impl<'s, 'd> Parser<'s, 'd> {
    pub fn new(source: &'s SourceText, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            lexer: Lexer::new(source),
            diagnostics,
            next_id: 0,
            loop_depth: 0,
            statement_reported: false,
        }
    }

    pub fn parse_program(mut self) -> CompileResult<Program> {
        let statements = self.statement_list()?;
        Ok(Program {
            statements,
            expression_count: self.next_id,
        })
    }

    fn statement_list(&mut self) -> Result<Vec<Statement>, LexError> {
        let mut statements = Vec::new();
        loop {
            let token = self.peek()?;
            match token.kind {
                TokenKind::EOF => break,
                TokenKind::End if self.loop_depth > 0 => break,
                _ => statements.push(self.terminated_statement()?),
            }
        }
        Ok(statements)
    }

    fn terminated_statement(&mut self) -> Result<Statement, LexError> {
        self.statement_reported = false;
        let span = self.peek()?.span;

        let statement = match self.statement() {
            Ok(statement) => statement,
            Err(Interrupt::Internal(error)) => return Err(error),
            Err(Interrupt::Syntax) => {
                self.synchronize()?;
                return Ok(Statement {
                    span,
                    kind: StatementKind::Error,
                });
            }
        };

        let token = self.next()?;
        if token.is(&TokenKind::Semicolon) {
            return Ok(statement);
        }

        self.report(
            format!("Expected ';' after statement, got {}", token.kind),
            token.span,
        );
        self.lexer.backtrack()?;
        if !token.is(&TokenKind::EOF) {
            self.synchronize()?;
        }
        Ok(Statement {
            span,
            kind: StatementKind::Error,
        })
    }

    /// Skips to just past the next `;` that belongs to the current statement.
    /// `do ... end` pairs are skipped whole; an `end` closing the enclosing
    /// loop body and end of file are left unconsumed.
    fn synchronize(&mut self) -> Result<(), LexError> {
        let mut nesting = 0usize;
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::Semicolon if nesting == 0 => return Ok(()),
                TokenKind::Do => nesting += 1,
                TokenKind::End if nesting > 0 => nesting -= 1,
                TokenKind::End if self.loop_depth > 0 => {
                    self.lexer.backtrack()?;
                    return Ok(());
                }
                TokenKind::EOF => {
                    self.lexer.backtrack()?;
                    if self.statement_reported {
                        self.diagnostics
                            .note("This statement is missing its terminating ';'", token.span);
                    } else {
                        self.diagnostics
                            .syntax_error("Expected ';' before end of file", token.span);
                    }
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    fn statement(&mut self) -> ParseResult<Statement> {
        let token = self.next()?;
        let span = token.span;
        let kind = match token.kind {
            TokenKind::Var => self.declaration()?,
            TokenKind::Identifier(name) => {
                self.expect(TokenKind::Assign, "after variable name in assignment")?;
                let value = self.expression()?;
                StatementKind::Assign { name, value }
            }
            TokenKind::For => self.for_statement()?,
            TokenKind::Read => {
                let (name, _) = self.expect_identifier("after 'read'")?;
                StatementKind::Read(name)
            }
            TokenKind::Print => StatementKind::Print(self.expression()?),
            TokenKind::Assert => StatementKind::Assert(self.expression()?),
            other => {
                self.lexer.backtrack()?;
                return Err(self.report(format!("Expected a statement, got {other}"), span));
            }
        };
        Ok(Statement { span, kind })
    }

    fn declaration(&mut self) -> ParseResult<StatementKind> {
        let (name, _) = self.expect_identifier("after 'var'")?;
        self.expect(TokenKind::Colon, "after variable name in declaration")?;
        let var_type = self.type_name()?;

        let initializer = if self.peek()?.is(&TokenKind::Assign) {
            self.next()?;
            Some(self.expression()?)
        } else {
            None
        };

        Ok(StatementKind::Declaration {
            name,
            var_type,
            initializer,
        })
    }

    fn type_name(&mut self) -> ParseResult<VariableType> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Int => Ok(VariableType::Integer),
            TokenKind::String => Ok(VariableType::String),
            TokenKind::Bool => Ok(VariableType::Boolean),
            other => {
                self.lexer.backtrack()?;
                Err(self.report(
                    format!("Expected a type name ('int', 'string' or 'bool'), got {other}"),
                    token.span,
                ))
            }
        }
    }

    fn for_statement(&mut self) -> ParseResult<StatementKind> {
        let (variable, _) = self.expect_identifier("after 'for'")?;
        self.expect(TokenKind::In, "after loop variable")?;
        let start = self.expression()?;
        self.expect(TokenKind::Range, "between loop bounds")?;
        let end = self.expression()?;
        self.expect(TokenKind::Do, "after loop bounds")?;

        self.loop_depth += 1;
        let body = self.statement_list();
        self.loop_depth -= 1;
        let body = body?;

        self.expect(TokenKind::End, "to close loop body")?;
        self.expect(TokenKind::For, "after 'end'")?;
        Ok(StatementKind::For {
            variable,
            start,
            end,
            body,
        })
    }

    fn expression(&mut self) -> ParseResult<Expression> {
        let token = self.next()?;
        if token.is(&TokenKind::Not) {
            let operand = self.operand()?;
            return Ok(self.node(token.span, ExpressionKind::Not(Box::new(operand))));
        }
        self.lexer.backtrack()?;

        let left = self.operand()?;
        let token = self.next()?;
        let Some(op) = binary_operator(&token.kind) else {
            self.lexer.backtrack()?;
            return Ok(left);
        };
        let right = self.operand()?;
        Ok(self.node(
            token.span,
            ExpressionKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        ))
    }

    fn operand(&mut self) -> ParseResult<Expression> {
        let token = self.next()?;
        let kind = match token.kind {
            TokenKind::Integer(value) => ExpressionKind::Integer(value),
            TokenKind::Text(value) => ExpressionKind::String(value),
            TokenKind::Identifier(name) => ExpressionKind::Identifier(name),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "to close parenthesized expression")?;
                return Ok(inner);
            }
            TokenKind::Minus => {
                let literal = self.next()?;
                match literal.kind {
                    TokenKind::Integer(value) => ExpressionKind::Integer(value.wrapping_neg()),
                    other => {
                        self.lexer.backtrack()?;
                        return Err(self.report(
                            format!("Unary '-' applies only to integer literals, got {other}"),
                            literal.span,
                        ));
                    }
                }
            }
            other => {
                self.lexer.backtrack()?;
                return Err(self.report(format!("Expected an operand, got {other}"), token.span));
            }
        };
        Ok(self.node(token.span, kind))
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> ParseResult<Token> {
        let token = self.next()?;
        if token.is(&kind) {
            return Ok(token);
        }
        self.lexer.backtrack()?;
        Err(self.report(
            format!("Expected {kind} {context}, got {}", token.kind),
            token.span,
        ))
    }

    fn expect_identifier(&mut self, context: &str) -> ParseResult<(String, Span)> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Identifier(name) => Ok((name, token.span)),
            other => {
                self.lexer.backtrack()?;
                Err(self.report(
                    format!("Expected an identifier {context}, got {other}"),
                    token.span,
                ))
            }
        }
    }

    fn node(&mut self, span: Span, kind: ExpressionKind) -> Expression {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Expression { id, span, kind }
    }

    fn report(&mut self, message: String, span: Span) -> Interrupt {
        self.diagnostics.syntax_error(message, span);
        self.statement_reported = true;
        Interrupt::Syntax
    }

    fn next(&mut self) -> Result<Token, LexError> {
        self.lexer.next(&mut *self.diagnostics)
    }

    fn peek(&mut self) -> Result<Token, LexError> {
        self.lexer.peek(&mut *self.diagnostics)
    }
}

fn binary_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Sub,
        TokenKind::Star => BinaryOperator::Mul,
        TokenKind::Slash => BinaryOperator::Div,
        TokenKind::Less => BinaryOperator::Less,
        TokenKind::Equal => BinaryOperator::Equal,
        TokenKind::And => BinaryOperator::And,
        _ => return None,
    };
    Some(op)
}

pub fn parse(source: &SourceText, diagnostics: &mut Diagnostics) -> CompileResult<Program> {
    Parser::new(source, diagnostics).parse_program()
}
