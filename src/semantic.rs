//! Semantic checker: one walk over the tree that builds the symbol table,
//! resolves every expression type and reports semantic diagnostics.
//!
//! The walk always runs to completion. Once an operand resolves to
//! [`VariableType::Error`] every enclosing check stays quiet, so a single
//! mistake produces a single diagnostic.

use crate::ast::{
    BinaryOperator, Expression, ExpressionKind, Program, Statement, StatementKind, VariableType,
};
use crate::diagnostics::Diagnostics;
use crate::token::Span;

pub mod symbol_table;

pub use symbol_table::{Symbol, SymbolTable, TypeTable};

/// Output of the checker consumed by the code generator.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub symbols: SymbolTable,
    pub types: TypeTable,
}

enum ResultType {
    SameAsOperands,
    Fixed(VariableType),
}

/// Typing rule for one binary operator.
struct OperatorRule {
    operands_must_match: bool,
    accepted: &'static [VariableType],
    result: ResultType,
}

fn operator_rule(op: BinaryOperator) -> OperatorRule {
    use VariableType::{Boolean, Integer, String};
    match op {
        BinaryOperator::Add => OperatorRule {
            operands_must_match: true,
            accepted: &[Integer, String],
            result: ResultType::SameAsOperands,
        },
        BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div => OperatorRule {
            operands_must_match: true,
            accepted: &[Integer],
            result: ResultType::Fixed(Integer),
        },
        BinaryOperator::Less | BinaryOperator::Equal => OperatorRule {
            operands_must_match: true,
            accepted: &[Integer, String, Boolean],
            result: ResultType::Fixed(Boolean),
        },
        BinaryOperator::And => OperatorRule {
            operands_must_match: true,
            accepted: &[Boolean],
            result: ResultType::Fixed(Boolean),
        },
    }
}

struct Checker<'d> {
    symbols: SymbolTable,
    types: TypeTable,
    diagnostics: &'d mut Diagnostics,
}

pub fn check(program: &Program, diagnostics: &mut Diagnostics) -> Analysis {
    let mut checker = Checker {
        symbols: SymbolTable::new(),
        types: TypeTable::new(),
        diagnostics,
    };
    for statement in &program.statements {
        checker.statement(statement);
    }
    log::debug!(
        "checked {} statements: {} variables, {} typed expressions",
        program.statements.len(),
        checker.symbols.len(),
        checker.types.len()
    );
    Analysis {
        symbols: checker.symbols,
        types: checker.types,
    }
}

impl Checker<'_> {
    fn statement(&mut self, statement: &Statement) {
        let span = statement.span;
        match &statement.kind {
            StatementKind::Declaration {
                name,
                var_type,
                initializer,
            } => self.declaration(name, *var_type, initializer.as_ref(), span),
            StatementKind::Assign { name, value } => self.assignment(name, value, span),
            StatementKind::For {
                variable,
                start,
                end,
                body,
            } => self.for_loop(variable, start, end, body, span),
            StatementKind::Print(value) => {
                let value_type = self.expression(value);
                if !matches!(
                    value_type,
                    VariableType::Integer | VariableType::String | VariableType::Error
                ) {
                    self.diagnostics.semantic_error(
                        format!("Cannot print a value of type {value_type}"),
                        value.span,
                    );
                }
            }
            StatementKind::Read(name) => {
                let Some(symbol) = self.target(name, span) else {
                    return;
                };
                if symbol.var_type == VariableType::Boolean {
                    self.diagnostics.semantic_error(
                        format!("Cannot read a value into '{name}' of type bool"),
                        span,
                    );
                }
            }
            StatementKind::Assert(value) => {
                let value_type = self.expression(value);
                if !matches!(value_type, VariableType::Boolean | VariableType::Error) {
                    self.diagnostics.semantic_error(
                        format!("Assert expects a bool expression, got {value_type}"),
                        value.span,
                    );
                }
            }
            StatementKind::Error => {}
        }
    }

    fn declaration(
        &mut self,
        name: &str,
        var_type: VariableType,
        initializer: Option<&Expression>,
        span: Span,
    ) {
        // A redeclared name keeps its first type, so the initializer is
        // checked against that one.
        let declared_type = match self.symbols.declare(name, var_type, span) {
            Ok(_) => var_type,
            Err(previous) => {
                let (first, kept_type) = (previous.declared_at, previous.var_type);
                self.diagnostics
                    .semantic_error(format!("Variable '{name}' is already declared"), span);
                self.diagnostics
                    .note(format!("'{name}' was first declared here"), first);
                kept_type
            }
        };

        let Some(initializer) = initializer else {
            return;
        };
        let value_type = self.expression(initializer);
        if initializer.references(name) {
            self.diagnostics.semantic_error(
                format!("Variable '{name}' is used in its own initialization"),
                initializer.span,
            );
        } else if value_type != VariableType::Error && value_type != declared_type {
            self.diagnostics.semantic_error(
                format!("Cannot initialize '{name}' of type {declared_type} with a value of type {value_type}"),
                initializer.span,
            );
        }
    }

    fn assignment(&mut self, name: &str, value: &Expression, span: Span) {
        let value_type = self.expression(value);
        let Some(symbol) = self.target(name, span) else {
            return;
        };

        if value.as_identifier() == Some(name) {
            self.diagnostics
                .warning(format!("Variable '{name}' is assigned to itself"), span);
        } else if value_type != VariableType::Error && value_type != symbol.var_type {
            self.diagnostics.semantic_error(
                format!(
                    "Cannot assign a value of type {value_type} to '{name}' of type {}",
                    symbol.var_type
                ),
                value.span,
            );
        }
    }

    /// Resolves a variable that is about to be written, reporting undeclared
    /// names and writes to an active loop control variable.
    fn target(&mut self, name: &str, span: Span) -> Option<Symbol> {
        let Some(symbol) = self.symbols.lookup(name).cloned() else {
            self.diagnostics
                .semantic_error(format!("Variable '{name}' is not declared"), span);
            return None;
        };
        if symbol.loop_control {
            self.diagnostics.semantic_error(
                format!("Loop control variable '{name}' cannot be modified inside its loop"),
                span,
            );
        }
        Some(symbol)
    }

    fn for_loop(
        &mut self,
        variable: &str,
        start: &Expression,
        end: &Expression,
        body: &[Statement],
        span: Span,
    ) {
        if let Some(symbol) = self.target(variable, span)
            && symbol.var_type != VariableType::Integer
        {
            self.diagnostics.semantic_error(
                format!(
                    "Loop control variable '{variable}' must be of type int, got {}",
                    symbol.var_type
                ),
                span,
            );
        }

        for (bound, label) in [(start, "start"), (end, "end")] {
            let bound_type = self.expression(bound);
            if !matches!(bound_type, VariableType::Integer | VariableType::Error) {
                self.diagnostics.semantic_error(
                    format!("Loop {label} bound must be of type int, got {bound_type}"),
                    bound.span,
                );
            }
        }

        let was_active = self.symbols.set_loop_control(variable, true);
        for statement in body {
            self.statement(statement);
        }
        self.symbols.set_loop_control(variable, was_active);
    }

    fn expression(&mut self, expression: &Expression) -> VariableType {
        let resolved = match &expression.kind {
            ExpressionKind::Integer(_) => VariableType::Integer,
            ExpressionKind::String(_) => VariableType::String,
            ExpressionKind::Identifier(name) => match self.symbols.lookup(name) {
                Some(symbol) => symbol.var_type,
                None => {
                    self.diagnostics.semantic_error(
                        format!("Variable '{name}' is not declared"),
                        expression.span,
                    );
                    VariableType::Error
                }
            },
            ExpressionKind::Not(operand) => match self.expression(operand) {
                VariableType::Error => VariableType::Error,
                VariableType::Boolean => VariableType::Boolean,
                other => {
                    self.diagnostics.semantic_error(
                        format!("Operator '!' expects an operand of type bool, got {other}"),
                        expression.span,
                    );
                    VariableType::Error
                }
            },
            ExpressionKind::Binary { left, op, right } => {
                let left_type = self.expression(left);
                let right_type = self.expression(right);
                self.binary(*op, left_type, right_type, expression.span)
            }
        };
        self.types.record(expression.id, resolved);
        resolved
    }

    fn binary(
        &mut self,
        op: BinaryOperator,
        left: VariableType,
        right: VariableType,
        span: Span,
    ) -> VariableType {
        if left == VariableType::Error || right == VariableType::Error {
            return VariableType::Error;
        }

        let rule = operator_rule(op);
        let symbol = op.symbol();
        if rule.operands_must_match && left != right {
            self.diagnostics.semantic_error(
                format!("Operator '{symbol}' expects operands of the same type, got {left} and {right}"),
                span,
            );
            return VariableType::Error;
        }
        if !rule.accepted.contains(&left) {
            let accepted = rule
                .accepted
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            self.diagnostics.semantic_error(
                format!("Operator '{symbol}' cannot be applied to {left} (accepts: {accepted})"),
                span,
            );
            return VariableType::Error;
        }

        match rule.result {
            ResultType::SameAsOperands => left,
            ResultType::Fixed(result) => result,
        }
    }
}
