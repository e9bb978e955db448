use std::fmt::Write as _;

use thiserror::Error;

use crate::ast::{
    BinaryOperator, Expression, ExpressionKind, Program, Statement, StatementKind, VariableType,
};
use crate::error::{CompileError, CompileResult};
use crate::semantic::Analysis;

mod opcode;

pub use opcode::Opcode;

/// Pool index of the empty string used to default-initialize string variables.
pub const EMPTY_STRING: u32 = 0;

/// A compiled program: the instruction stream, its string pool and how many
/// variable cells the interpreter has to allocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytecode {
    pub code: Vec<u8>,
    pub strings: Vec<String>,
    pub variable_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Integer(i64),
    Index(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub opcode: Opcode,
    pub operand: Operand,
    /// Offset of the following instruction.
    pub next: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Offset {offset} is past the end of the code")]
    OutOfBounds { offset: usize },
    #[error("Invalid opcode 0x{byte:02x} at offset {offset}")]
    InvalidOpcode { offset: usize, byte: u8 },
    #[error("Truncated operand for {mnemonic} at offset {offset}")]
    TruncatedOperand {
        offset: usize,
        mnemonic: &'static str,
    },
}

/// Decodes the instruction starting at `offset`.
pub fn decode(code: &[u8], offset: usize) -> Result<Decoded, DecodeError> {
    let byte = *code.get(offset).ok_or(DecodeError::OutOfBounds { offset })?;
    let opcode = Opcode::try_from(byte).map_err(|byte| DecodeError::InvalidOpcode { offset, byte })?;

    let start = offset + 1;
    let width = opcode.operand_width();
    let truncated = || DecodeError::TruncatedOperand {
        offset,
        mnemonic: opcode.mnemonic(),
    };
    let bytes = code.get(start..start + width).ok_or_else(truncated)?;

    let operand = match width {
        0 => Operand::None,
        4 => Operand::Index(u32::from_le_bytes(
            bytes.try_into().map_err(|_| truncated())?,
        )),
        _ => Operand::Integer(i64::from_le_bytes(
            bytes.try_into().map_err(|_| truncated())?,
        )),
    };
    Ok(Decoded {
        opcode,
        operand,
        next: start + width,
    })
}

struct Generator<'a> {
    analysis: &'a Analysis,
    code: Vec<u8>,
    strings: Vec<String>,
    /// Hidden loop-bound slots handed out so far; they follow the declared ones.
    hidden_slots: u32,
}

pub fn generate(program: &Program, analysis: &Analysis) -> CompileResult<Bytecode> {
    let mut generator = Generator {
        analysis,
        code: Vec::new(),
        strings: vec![String::new()],
        hidden_slots: 0,
    };
    for statement in &program.statements {
        generator.statement(statement)?;
    }

    let bytecode = Bytecode {
        code: generator.code,
        strings: generator.strings,
        variable_count: analysis.symbols.slot_count() + generator.hidden_slots,
    };
    log::debug!(
        "generated {} bytes, {} pooled strings, {} variable slots",
        bytecode.code.len(),
        bytecode.strings.len(),
        bytecode.variable_count
    );
    Ok(bytecode)
}

impl Generator<'_> {
    fn statement(&mut self, statement: &Statement) -> CompileResult<()> {
        match &statement.kind {
            StatementKind::Declaration {
                name,
                var_type,
                initializer,
            } => {
                match initializer {
                    Some(value) => self.expression(value)?,
                    None => self.default_value(*var_type)?,
                }
                let slot = self.slot(name)?;
                self.emit_index(Opcode::StoreVariable, slot);
            }
            StatementKind::Assign { name, value } => {
                self.expression(value)?;
                let slot = self.slot(name)?;
                self.emit_index(Opcode::StoreVariable, slot);
            }
            StatementKind::For {
                variable,
                start,
                end,
                body,
            } => {
                let control = self.slot(variable)?;
                let bound = self.hidden_slot();

                self.expression(start)?;
                self.emit_index(Opcode::StoreVariable, control);
                self.expression(end)?;
                self.emit_index(Opcode::StoreVariable, bound);

                let body_start = self.offset()?;
                for statement in body {
                    self.statement(statement)?;
                }

                self.emit_index(Opcode::PushVariable, control);
                self.emit_integer(1);
                self.emit(Opcode::Add);
                self.emit_index(Opcode::StoreVariable, control);

                self.emit_index(Opcode::PushVariable, control);
                self.emit_index(Opcode::PushVariable, bound);
                self.emit(Opcode::IsLessOrEqualInt);
                self.emit_index(Opcode::JumpIfTrue, body_start);
            }
            StatementKind::Print(value) => {
                self.expression(value)?;
                let opcode = match self.analysis.types.get(value.id) {
                    VariableType::Integer => Opcode::PrintInt,
                    VariableType::String => Opcode::PrintString,
                    other => {
                        return Err(CompileError::internal(format!(
                            "cannot print expression of type {other}"
                        )));
                    }
                };
                self.emit(opcode);
            }
            StatementKind::Read(name) => {
                let symbol = self.analysis.symbols.lookup(name).ok_or_else(|| {
                    CompileError::internal(format!("no slot for variable '{name}'"))
                })?;
                let opcode = match symbol.var_type {
                    VariableType::Integer => Opcode::ReadInt,
                    VariableType::String => Opcode::ReadString,
                    other => {
                        return Err(CompileError::internal(format!(
                            "cannot read into variable of type {other}"
                        )));
                    }
                };
                let slot = symbol.slot;
                self.emit(opcode);
                self.emit_index(Opcode::StoreVariable, slot);
            }
            StatementKind::Assert(value) => {
                self.expression(value)?;
                let line = u32::try_from(statement.span.line + 1)
                    .map_err(|_| CompileError::internal("source line number overflows u32"))?;
                self.emit_index(Opcode::Assert, line);
            }
            StatementKind::Error => {
                return Err(CompileError::internal(format!(
                    "error node reached code generation at {}",
                    statement.span
                )));
            }
        }
        Ok(())
    }

    fn expression(&mut self, expression: &Expression) -> CompileResult<()> {
        match &expression.kind {
            ExpressionKind::Integer(value) => self.emit_integer(*value),
            ExpressionKind::String(value) => {
                let index = self.intern(value)?;
                self.emit_index(Opcode::PushString, index);
            }
            ExpressionKind::Identifier(name) => {
                let slot = self.slot(name)?;
                self.emit_index(Opcode::PushVariable, slot);
            }
            ExpressionKind::Not(operand) => {
                self.expression(operand)?;
                self.emit(Opcode::Not);
            }
            ExpressionKind::Binary { left, op, right } => {
                self.expression(left)?;
                self.expression(right)?;
                let opcode = self.binary_opcode(*op, expression, left)?;
                self.emit(opcode);
            }
        }
        Ok(())
    }

    /// Picks the opcode for a binary node. `+` follows the node's own type,
    /// comparisons follow the left operand's type.
    fn binary_opcode(
        &self,
        op: BinaryOperator,
        node: &Expression,
        left: &Expression,
    ) -> CompileResult<Opcode> {
        let types = &self.analysis.types;
        let opcode = match op {
            BinaryOperator::Add => match types.get(node.id) {
                VariableType::Integer => Opcode::Add,
                VariableType::String => Opcode::Concat,
                other => {
                    return Err(CompileError::internal(format!("'+' resolved to type {other}")));
                }
            },
            BinaryOperator::Sub => Opcode::Sub,
            BinaryOperator::Mul => Opcode::Mul,
            BinaryOperator::Div => Opcode::Div,
            BinaryOperator::And => Opcode::And,
            BinaryOperator::Less | BinaryOperator::Equal => {
                let less = op == BinaryOperator::Less;
                match (types.get(left.id), less) {
                    (VariableType::Integer, true) => Opcode::IsLessInt,
                    (VariableType::String, true) => Opcode::IsLessString,
                    (VariableType::Boolean, true) => Opcode::IsLessBool,
                    (VariableType::Integer, false) => Opcode::IsEqualInt,
                    (VariableType::String, false) => Opcode::IsEqualString,
                    (VariableType::Boolean, false) => Opcode::IsEqualBool,
                    (other, _) => {
                        return Err(CompileError::internal(format!(
                            "comparison operand resolved to type {other}"
                        )));
                    }
                }
            }
        };
        Ok(opcode)
    }

    fn default_value(&mut self, var_type: VariableType) -> CompileResult<()> {
        match var_type {
            VariableType::Integer | VariableType::Boolean => self.emit_integer(0),
            VariableType::String => self.emit_index(Opcode::PushString, EMPTY_STRING),
            other => {
                return Err(CompileError::internal(format!(
                    "no default value for type {other}"
                )));
            }
        }
        Ok(())
    }

    fn slot(&self, name: &str) -> CompileResult<u32> {
        self.analysis
            .symbols
            .slot(name)
            .ok_or_else(|| CompileError::internal(format!("no slot for variable '{name}'")))
    }

    /// A fresh slot for a loop's upper bound. Slots are never reused.
    fn hidden_slot(&mut self) -> u32 {
        let slot = self.analysis.symbols.slot_count() + self.hidden_slots;
        self.hidden_slots += 1;
        slot
    }

    fn intern(&mut self, value: &str) -> CompileResult<u32> {
        let index = match self.strings.iter().position(|s| s == value) {
            Some(index) => index,
            None => {
                self.strings.push(value.to_string());
                self.strings.len() - 1
            }
        };
        u32::try_from(index).map_err(|_| CompileError::internal("string pool overflow"))
    }

    fn offset(&self) -> CompileResult<u32> {
        u32::try_from(self.code.len())
            .map_err(|_| CompileError::internal("bytecode exceeds 4 GiB"))
    }

    fn emit(&mut self, opcode: Opcode) {
        self.code.push(opcode as u8);
    }

    fn emit_integer(&mut self, value: i64) {
        self.emit(Opcode::PushInt);
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    fn emit_index(&mut self, opcode: Opcode, index: u32) {
        self.emit(opcode);
        self.code.extend_from_slice(&index.to_le_bytes());
    }
}

/// Human-readable listing, one instruction per line.
pub fn disassemble(bytecode: &Bytecode) -> String {
    let mut out = String::new();
    let mut offset = 0;
    while offset < bytecode.code.len() {
        let decoded = match decode(&bytecode.code, offset) {
            Ok(decoded) => decoded,
            Err(error) => {
                let _ = writeln!(out, "{offset:04}  <{error}>");
                break;
            }
        };

        let mnemonic = decoded.opcode.mnemonic();
        let _ = match (decoded.opcode, decoded.operand) {
            (Opcode::PushString, Operand::Index(index)) => {
                let text = bytecode
                    .strings
                    .get(index as usize)
                    .map(|s| format!("{s:?}"))
                    .unwrap_or_else(|| "<out of range>".to_string());
                writeln!(out, "{offset:04}  {mnemonic:<20} {index} {text}")
            }
            (_, Operand::Index(index)) => writeln!(out, "{offset:04}  {mnemonic:<20} {index}"),
            (_, Operand::Integer(value)) => writeln!(out, "{offset:04}  {mnemonic:<20} {value}"),
            (_, Operand::None) => writeln!(out, "{offset:04}  {mnemonic}"),
        };
        offset = decoded.next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::parser::parse;
    use crate::semantic::check;
    use crate::source::{DEFAULT_TAB_WIDTH, SourceText};
    use crate::token::Span;
    use indoc::indoc;

    fn compile(input: &str) -> Bytecode {
        let source = SourceText::new(input, DEFAULT_TAB_WIDTH);
        let mut diagnostics = Diagnostics::new();
        let program = parse(&source, &mut diagnostics).expect("parse failed");
        let analysis = check(&program, &mut diagnostics);
        assert!(!diagnostics.has_blocking(), "{diagnostics:?}");
        generate(&program, &analysis).expect("generate failed")
    }

    fn int(value: i64) -> Vec<u8> {
        let mut bytes = vec![Opcode::PushInt as u8];
        bytes.extend_from_slice(&value.to_le_bytes());
        bytes
    }

    fn indexed(opcode: Opcode, index: u32) -> Vec<u8> {
        let mut bytes = vec![opcode as u8];
        bytes.extend_from_slice(&index.to_le_bytes());
        bytes
    }

    fn op(opcode: Opcode) -> Vec<u8> {
        vec![opcode as u8]
    }

    fn listing(bytecode: &Bytecode) -> Vec<String> {
        disassemble(bytecode)
            .lines()
            .map(|line| line.split_whitespace().skip(1).collect::<Vec<_>>().join(" "))
            .collect()
    }

    #[test]
    fn encodes_arithmetic_program() {
        let bytecode = compile("var n: int; n := 4 + (6*2); print n;");
        let expected = [
            int(0),
            indexed(Opcode::StoreVariable, 0),
            int(4),
            int(6),
            int(2),
            op(Opcode::Mul),
            op(Opcode::Add),
            indexed(Opcode::StoreVariable, 0),
            indexed(Opcode::PushVariable, 0),
            op(Opcode::PrintInt),
        ]
        .concat();
        assert_eq!(bytecode.code, expected);
        assert_eq!(bytecode.strings, vec![String::new()]);
        assert_eq!(bytecode.variable_count, 1);
    }

    #[test]
    fn interns_string_literals() {
        let bytecode = compile(indoc! {r#"
            var s : string;
            print "a";
            print "b";
            print "a";
            s := "";
        "#});
        assert_eq!(bytecode.strings, vec!["", "a", "b"]);
        assert_eq!(
            listing(&bytecode),
            vec![
                "PUSH_STRING 0 \"\"",
                "STORE_VARIABLE 0",
                "PUSH_STRING 1 \"a\"",
                "PRINT_STRING",
                "PUSH_STRING 2 \"b\"",
                "PRINT_STRING",
                "PUSH_STRING 1 \"a\"",
                "PRINT_STRING",
                "PUSH_STRING 0 \"\"",
                "STORE_VARIABLE 0",
            ]
        );
    }

    #[test]
    fn lowers_for_loop_as_post_test() {
        let bytecode = compile("var i : int; for i in 1..3 do print i; end for;");
        assert_eq!(bytecode.variable_count, 2);
        let text = disassemble(&bytecode);
        assert_eq!(
            text,
            indoc! {"
                0000  PUSH_INT             0
                0009  STORE_VARIABLE       0
                0014  PUSH_INT             1
                0023  STORE_VARIABLE       0
                0028  PUSH_INT             3
                0037  STORE_VARIABLE       1
                0042  PUSH_VARIABLE        0
                0047  PRINT_INT
                0048  PUSH_VARIABLE        0
                0053  PUSH_INT             1
                0062  ADD
                0063  STORE_VARIABLE       0
                0068  PUSH_VARIABLE        0
                0073  PUSH_VARIABLE        1
                0078  IS_LESS_OR_EQUAL_INT
                0079  JUMP_IF_TRUE         42
            "}
        );
    }

    #[test]
    fn every_loop_gets_a_fresh_bound_slot() {
        let bytecode = compile(indoc! {"
            var i : int;
            var j : int;
            for i in 1..2 do
                for j in 1..2 do
                    print j;
                end for;
            end for;
            for i in 1..2 do
                print i;
            end for;
        "});
        assert_eq!(bytecode.variable_count, 5);
        let stores: Vec<String> = listing(&bytecode)
            .into_iter()
            .filter(|line| line.starts_with("STORE_VARIABLE"))
            .collect();
        assert!(stores.contains(&"STORE_VARIABLE 2".to_string()));
        assert!(stores.contains(&"STORE_VARIABLE 3".to_string()));
        assert!(stores.contains(&"STORE_VARIABLE 4".to_string()));
    }

    #[test]
    fn dispatches_on_operand_types() {
        let bytecode = compile(indoc! {r#"
            var s : string := "a" + "b";
            var t : bool := s < "c";
            var u : bool := t = (1 = 2);
            var v : bool := t < u;
            var n : int := 1 + 2;
            read s;
            read n;
            assert ((!t) & u);
        "#});
        let lines = listing(&bytecode);
        for expected in [
            "CONCAT",
            "IS_LESS_STRING",
            "IS_EQUAL_INT",
            "IS_EQUAL_BOOL",
            "IS_LESS_BOOL",
            "ADD",
            "READ_STRING",
            "READ_INT",
            "NOT",
            "AND",
            "ASSERT 8",
        ] {
            assert!(
                lines.iter().any(|line| line == expected),
                "missing {expected} in {lines:#?}"
            );
        }
    }

    #[test]
    fn error_node_is_an_internal_error() {
        let program = Program {
            statements: vec![Statement {
                span: Span::new(2, 0),
                kind: StatementKind::Error,
            }],
            expression_count: 0,
        };
        let error = generate(&program, &Analysis::default()).expect_err("expected failure");
        assert!(matches!(error, CompileError::InternalCompilerError { .. }));
        assert!(error.to_string().starts_with("Internal compiler error"));
    }

    #[test]
    fn decode_rejects_bad_streams() {
        assert_eq!(
            decode(&[0xee], 0),
            Err(DecodeError::InvalidOpcode {
                offset: 0,
                byte: 0xee
            })
        );
        assert!(matches!(
            decode(&[Opcode::PushInt as u8, 1, 2], 0),
            Err(DecodeError::TruncatedOperand { .. })
        ));
    }
}
