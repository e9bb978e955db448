//! Syntax tree shared by the semantic checker and the code generator.
//!
//! The parser builds the tree once and it is never restructured afterwards.
//! Resolved expression types live in a side table keyed by [`NodeId`] rather
//! than on the nodes themselves.

use std::fmt;

use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VariableType {
    #[default]
    None,
    String,
    Integer,
    Boolean,
    Error,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableType::None => "none",
            VariableType::String => "string",
            VariableType::Integer => "int",
            VariableType::Boolean => "bool",
            VariableType::Error => "<error>",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    Equal,
    And,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Less => "<",
            BinaryOperator::Equal => "=",
            BinaryOperator::And => "&",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Expression {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExpressionKind,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ExpressionKind {
    Integer(i64),
    String(String),
    Identifier(String),
    Binary {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    Not(Box<Expression>),
}

impl Expression {
    /// Whether `name` is referenced anywhere in this subtree.
    pub fn references(&self, name: &str) -> bool {
        match &self.kind {
            ExpressionKind::Identifier(identifier) => identifier == name,
            ExpressionKind::Binary { left, right, .. } => {
                left.references(name) || right.references(name)
            }
            ExpressionKind::Not(operand) => operand.references(name),
            ExpressionKind::Integer(_) | ExpressionKind::String(_) => false,
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Statement {
    pub span: Span,
    pub kind: StatementKind,
}

#[derive(Debug, PartialEq, Clone)]
pub enum StatementKind {
    Declaration {
        name: String,
        var_type: VariableType,
        initializer: Option<Expression>,
    },
    Assign {
        name: String,
        value: Expression,
    },
    For {
        variable: String,
        start: Expression,
        end: Expression,
        body: Vec<Statement>,
    },
    Print(Expression),
    Read(String),
    Assert(Expression),
    /// Replaces a statement the parser had to skip.
    Error,
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
    /// Number of expression ids handed out while parsing.
    pub expression_count: u32,
}

impl Program {
    /// Whether the parser had to replace any statement, nested loop bodies
    /// included.
    pub fn contains_errors(&self) -> bool {
        fn statement_has_error(statement: &Statement) -> bool {
            match &statement.kind {
                StatementKind::Error => true,
                StatementKind::For { body, .. } => body.iter().any(statement_has_error),
                _ => false,
            }
        }

        self.statements.iter().any(statement_has_error)
    }
}
