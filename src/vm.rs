use std::collections::VecDeque;

use log::{debug, trace};

use crate::bytecode::{Bytecode, Decoded, Opcode, Operand, decode};
use crate::source::SourceText;

mod error;
mod io;

pub use error::{RuntimeError, RuntimeResult};
pub use io::{InputSource, OutputSink};

/// Stack machine over 64-bit cells. Integers and booleans (0/1) are stored
/// directly; strings are stored as indices into the interpreter's own copy
/// of the string pool.
pub struct Interpreter<'a> {
    code: &'a [u8],
    source: Option<&'a SourceText>,
    strings: Vec<String>,
    variables: Vec<i64>,
    stack: Vec<i64>,
    pc: usize,
    pending_input: VecDeque<String>,
}

impl<'a> Interpreter<'a> {
    pub fn new(bytecode: &'a Bytecode) -> Self {
        Self {
            code: &bytecode.code,
            source: None,
            strings: bytecode.strings.clone(),
            variables: vec![0; bytecode.variable_count as usize],
            stack: Vec::new(),
            pc: 0,
            pending_input: VecDeque::new(),
        }
    }

    /// Attaches the program text so failed asserts can quote their line.
    pub fn with_source(mut self, source: &'a SourceText) -> Self {
        self.source = Some(source);
        self
    }

    pub fn run(
        &mut self,
        input: &mut dyn InputSource,
        output: &mut dyn OutputSink,
    ) -> RuntimeResult<()> {
        debug!(
            "running {} bytes with {} variable slots",
            self.code.len(),
            self.variables.len()
        );
        while self.pc < self.code.len() {
            self.step(input, output)?;
        }
        debug!("execution finished, {} strings in pool", self.strings.len());
        Ok(())
    }

    pub fn stack(&self) -> &[i64] {
        &self.stack
    }

    pub fn variables(&self) -> &[i64] {
        &self.variables
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    fn step(
        &mut self,
        input: &mut dyn InputSource,
        output: &mut dyn OutputSink,
    ) -> RuntimeResult<()> {
        let offset = self.pc;
        let Decoded {
            opcode,
            operand,
            next,
        } = decode(self.code, offset)?;
        trace!("{offset:04} {} {operand:?} stack={:?}", opcode.mnemonic(), self.stack);
        self.pc = next;

        match opcode {
            Opcode::PushInt => {
                let value = Self::integer(operand)?;
                self.stack.push(value);
            }
            Opcode::PushString => {
                let index = Self::index(operand)?;
                self.string(i64::from(index))?;
                self.stack.push(i64::from(index));
            }
            Opcode::PushVariable => {
                let slot = self.slot(operand)?;
                self.stack.push(self.variables[slot]);
            }
            Opcode::StoreVariable => {
                let slot = self.slot(operand)?;
                let value = self.pop()?;
                self.variables[slot] = value;
            }

            Opcode::Add => self.arithmetic(i64::wrapping_add)?,
            Opcode::Sub => self.arithmetic(i64::wrapping_sub)?,
            Opcode::Mul => self.arithmetic(i64::wrapping_mul)?,
            Opcode::Div => {
                let (left, right) = self.pop_pair()?;
                if right == 0 {
                    debug!("division by zero at offset {offset}");
                    return Err(RuntimeError::DivisionByZero);
                }
                self.stack.push(left.wrapping_div(right));
            }
            Opcode::Concat => {
                let (left, right) = self.pop_pair()?;
                let joined = format!("{}{}", self.string(left)?, self.string(right)?);
                let index = self.intern(joined);
                self.stack.push(index);
            }
            Opcode::And => {
                let (left, right) = self.pop_pair()?;
                self.push_bool(left != 0 && right != 0);
            }
            Opcode::Not => {
                let value = self.pop()?;
                self.push_bool(value == 0);
            }

            Opcode::IsLessInt => {
                let (left, right) = self.pop_pair()?;
                self.push_bool(left < right);
            }
            Opcode::IsLessString => {
                let (left, right) = self.pop_pair()?;
                let less = self.string(left)? < self.string(right)?;
                self.push_bool(less);
            }
            Opcode::IsLessBool => {
                let (left, right) = self.pop_pair()?;
                self.push_bool((left != 0) < (right != 0));
            }
            Opcode::IsEqualInt => {
                let (left, right) = self.pop_pair()?;
                self.push_bool(left == right);
            }
            Opcode::IsEqualString => {
                let (left, right) = self.pop_pair()?;
                let equal = self.string(left)? == self.string(right)?;
                self.push_bool(equal);
            }
            Opcode::IsEqualBool => {
                let (left, right) = self.pop_pair()?;
                self.push_bool((left != 0) == (right != 0));
            }
            Opcode::IsLessOrEqualInt => {
                let (left, right) = self.pop_pair()?;
                self.push_bool(left <= right);
            }

            Opcode::JumpIfTrue => {
                let target = Self::index(operand)? as usize;
                if target > self.code.len() {
                    return Err(RuntimeError::internal(format!(
                        "jump target {target} at offset {offset} is outside the code"
                    )));
                }
                if self.pop()? != 0 {
                    self.pc = target;
                }
            }

            Opcode::PrintInt => {
                let value = self.pop()?;
                output.write(&value.to_string())?;
            }
            Opcode::PrintString => {
                let index = self.pop()?;
                output.write(self.string(index)?)?;
            }
            Opcode::ReadInt => {
                let token = self.next_token(input)?;
                let value = token
                    .parse::<i64>()
                    .map_err(|_| RuntimeError::InvalidIntegerInput { token })?;
                self.stack.push(value);
            }
            Opcode::ReadString => {
                let token = self.next_token(input)?;
                let index = self.intern(token);
                self.stack.push(index);
            }
            Opcode::Assert => {
                let line = Self::index(operand)?;
                if self.pop()? == 0 {
                    self.report_assert(line, output)?;
                }
            }
        }
        Ok(())
    }

    fn report_assert(&self, line: u32, output: &mut dyn OutputSink) -> RuntimeResult<()> {
        let mut report = format!("Assert failed at line {line}\n");
        if let Some(text) = self
            .source
            .and_then(|source| source.line((line as usize).checked_sub(1)?))
        {
            report.push_str("    ");
            report.push_str(&text);
            report.push('\n');
        }
        output.write(&report)?;
        Ok(())
    }

    /// Next whitespace-separated token, pulling more lines only once the
    /// buffered ones are used up.
    fn next_token(&mut self, input: &mut dyn InputSource) -> RuntimeResult<String> {
        loop {
            if let Some(token) = self.pending_input.pop_front() {
                return Ok(token);
            }
            let line = input.read_line()?.ok_or(RuntimeError::InputExhausted)?;
            self.pending_input
                .extend(line.split_whitespace().map(str::to_string));
        }
    }

    /// Index of `text` in the string table, appending it only when no equal
    /// entry exists yet.
    fn intern(&mut self, text: String) -> i64 {
        let index = match self.strings.iter().position(|s| *s == text) {
            Some(index) => index,
            None => {
                self.strings.push(text);
                self.strings.len() - 1
            }
        };
        index as i64
    }

    fn arithmetic(&mut self, apply: fn(i64, i64) -> i64) -> RuntimeResult<()> {
        let (left, right) = self.pop_pair()?;
        self.stack.push(apply(left, right));
        Ok(())
    }

    fn push_bool(&mut self, value: bool) {
        self.stack.push(i64::from(value));
    }

    fn pop(&mut self) -> RuntimeResult<i64> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::internal(format!("stack underflow at offset {}", self.pc)))
    }

    /// Pops the right operand, then the left one.
    fn pop_pair(&mut self) -> RuntimeResult<(i64, i64)> {
        let right = self.pop()?;
        let left = self.pop()?;
        Ok((left, right))
    }

    fn string(&self, index: i64) -> RuntimeResult<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.strings.get(index))
            .map(String::as_str)
            .ok_or_else(|| RuntimeError::internal(format!("string index {index} out of range")))
    }

    fn slot(&self, operand: Operand) -> RuntimeResult<usize> {
        let slot = Self::index(operand)? as usize;
        if slot >= self.variables.len() {
            return Err(RuntimeError::internal(format!(
                "variable slot {slot} out of range ({} slots)",
                self.variables.len()
            )));
        }
        Ok(slot)
    }

    fn index(operand: Operand) -> RuntimeResult<u32> {
        match operand {
            Operand::Index(index) => Ok(index),
            other => Err(RuntimeError::internal(format!(
                "expected an index operand, got {other:?}"
            ))),
        }
    }

    fn integer(operand: Operand) -> RuntimeResult<i64> {
        match operand {
            Operand::Integer(value) => Ok(value),
            other => Err(RuntimeError::internal(format!(
                "expected an integer operand, got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::source::DEFAULT_TAB_WIDTH;
    use crate::{bytecode, parser, semantic};
    use indoc::indoc;

    fn compile(source: &SourceText) -> Bytecode {
        let mut diagnostics = Diagnostics::new();
        let program = parser::parse(source, &mut diagnostics).expect("parse failed");
        let analysis = semantic::check(&program, &mut diagnostics);
        assert!(!diagnostics.has_blocking(), "{diagnostics:?}");
        bytecode::generate(&program, &analysis).expect("generate failed")
    }

    struct Run {
        result: RuntimeResult<()>,
        output: String,
        stack: Vec<i64>,
        variables: Vec<i64>,
    }

    fn run_with_input(program: &str, input: &str) -> Run {
        let source = SourceText::new(program, DEFAULT_TAB_WIDTH);
        let bytecode = compile(&source);
        let mut interpreter = Interpreter::new(&bytecode).with_source(&source);
        let mut input = input.as_bytes();
        let mut output = Vec::<u8>::new();
        let result = interpreter.run(&mut input, &mut output);
        Run {
            result,
            output: String::from_utf8(output).expect("utf-8 output"),
            stack: interpreter.stack().to_vec(),
            variables: interpreter.variables().to_vec(),
        }
    }

    fn run(program: &str) -> Run {
        run_with_input(program, "")
    }

    fn raw(code: Vec<u8>, variable_count: u32) -> RuntimeResult<()> {
        let bytecode = Bytecode {
            code,
            strings: vec![String::new()],
            variable_count,
        };
        let mut input: &[u8] = b"";
        Interpreter::new(&bytecode).run(&mut input, &mut Vec::<u8>::new())
    }

    #[test]
    fn prints_sixteen_and_leaves_stack_empty() {
        let run = run("var n: int; n := 4 + (6*2); print n;");
        assert!(run.result.is_ok());
        assert_eq!(run.output, "16");
        assert!(run.stack.is_empty());
    }

    #[test]
    fn for_loop_runs_body_once_per_value() {
        let run = run(indoc! {r#"
            var i : int;
            var count : int;
            for i in 1..5 do
                count := count + 1;
                print i;
                print " ";
            end for;
        "#});
        assert!(run.result.is_ok());
        assert_eq!(run.output, "1 2 3 4 5 ");
        assert_eq!(run.variables[1], 5);
        assert_eq!(run.variables[0], 6);
    }

    #[test]
    fn loop_body_runs_once_even_when_bounds_are_empty() {
        let run = run("var i : int; for i in 5..1 do print i; end for;");
        assert!(run.result.is_ok());
        assert_eq!(run.output, "5");
    }

    #[test]
    fn loop_bounds_are_evaluated_once() {
        let run = run(indoc! {"
            var i : int;
            var n : int := 3;
            for i in 1..n do
                n := n + 1;
            end for;
            print n;
        "});
        assert!(run.result.is_ok());
        assert_eq!(run.output, "6");
    }

    #[test]
    fn failed_assert_is_reported_and_execution_continues() {
        let run = run(indoc! {r#"
            var x : int := 2;
            var y : int := 1;
            assert (x < y);
            print "after";
        "#});
        assert!(run.result.is_ok());
        assert_eq!(
            run.output,
            "Assert failed at line 3\n    assert (x < y);\nafter"
        );
        assert!(run.stack.is_empty());
    }

    #[test]
    fn passing_assert_is_silent() {
        let run = run("assert (1 < 2); assert (\"a\" = \"a\");");
        assert!(run.result.is_ok());
        assert_eq!(run.output, "");
    }

    #[test]
    fn strings_concatenate_and_compare() {
        let run = run(indoc! {r#"
            var s : string := "foo" + "bar";
            print s;
            assert (s = "foobar");
            assert ("abc" < "abd");
            assert (!(s < "a"));
        "#});
        assert!(run.result.is_ok());
        assert_eq!(run.output, "foobar");
    }

    #[test]
    fn boolean_operators() {
        let run = run(indoc! {"
            var t : bool := 1 = 1;
            var f : bool;
            assert (t & (!f));
            assert (f < t);
            assert (!(t < f));
            assert (f = (1 = 2));
            print \"ok\";
        "});
        assert!(run.result.is_ok());
        assert_eq!(run.output, "ok");
    }

    #[test]
    fn arithmetic_wraps_and_divides_toward_zero() {
        let run = run(indoc! {"
            var big : int := 9223372036854775807;
            big := big + 1;
            print big;
            print \" \";
            print (0 - 7) / 2;
        "});
        assert!(run.result.is_ok());
        assert_eq!(run.output, "-9223372036854775808 -3");
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let run = run("print \"a\"; print 10 / 0; print \"b\";");
        assert!(matches!(
            run.result,
            Err(RuntimeError::DivisionByZero)
        ));
        let error = run.result.as_ref().unwrap_err();
        assert!(!error.is_internal());
        assert_eq!(error.to_string(), "Division by zero");
        assert_eq!(run.output, "a");
    }

    #[test]
    fn reads_tokens_from_the_same_line() {
        let run = run_with_input(
            indoc! {"
                var a : int;
                var b : int;
                var s : string;
                read a;
                read b;
                read s;
                print a + b;
                print s;
            "},
            "3 4\n  hello\n",
        );
        assert!(run.result.is_ok());
        assert_eq!(run.output, "7hello");
    }

    #[test]
    fn concatenation_reuses_pooled_text() {
        let source = SourceText::new(
            indoc! {r#"
                var i : int;
                var s : string;
                for i in 1..1000 do
                    s := "a" + "b";
                end for;
                s := s + "";
            "#},
            DEFAULT_TAB_WIDTH,
        );
        let bytecode = compile(&source);
        let mut interpreter = Interpreter::new(&bytecode);
        let mut input: &[u8] = b"";
        interpreter.run(&mut input, &mut Vec::<u8>::new()).unwrap();

        assert_eq!(interpreter.strings(), ["", "a", "b", "ab"]);
        assert_eq!(interpreter.variables()[1], 3);
    }

    #[test]
    fn read_string_reuses_pooled_text() {
        let source = SourceText::new("var s : string; print \"x\"; read s;", DEFAULT_TAB_WIDTH);
        let bytecode = compile(&source);
        let mut interpreter = Interpreter::new(&bytecode);
        let mut input: &[u8] = b"x\n";
        interpreter.run(&mut input, &mut Vec::<u8>::new()).unwrap();
        assert_eq!(interpreter.strings(), ["", "x"]);
        assert_eq!(interpreter.variables()[0], 1);
    }

    #[test]
    fn invalid_integer_input_is_fatal() {
        let run = run_with_input("var n : int; read n; print n;", "twelve\n");
        match run.result {
            Err(RuntimeError::InvalidIntegerInput { token }) => assert_eq!(token, "twelve"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(run.output, "");
    }

    #[test]
    fn exhausted_input_is_fatal() {
        let run = run_with_input("var n : int; read n;", "");
        assert!(matches!(run.result, Err(RuntimeError::InputExhausted)));
    }

    #[test]
    fn unknown_opcode_is_internal() {
        let error = raw(vec![0xee], 0).unwrap_err();
        assert!(error.is_internal());
        assert!(error.to_string().starts_with("Internal compiler error"));
    }

    #[test]
    fn malformed_streams_are_internal() {
        let mut bad_slot = vec![Opcode::PushVariable as u8];
        bad_slot.extend_from_slice(&3u32.to_le_bytes());
        assert!(raw(bad_slot, 1).unwrap_err().is_internal());

        assert!(raw(vec![Opcode::Add as u8], 0).unwrap_err().is_internal());

        let mut bad_jump = vec![Opcode::PushInt as u8];
        bad_jump.extend_from_slice(&1i64.to_le_bytes());
        bad_jump.push(Opcode::JumpIfTrue as u8);
        bad_jump.extend_from_slice(&500u32.to_le_bytes());
        assert!(raw(bad_jump, 0).unwrap_err().is_internal());

        assert!(raw(vec![Opcode::PushString as u8, 0], 0).unwrap_err().is_internal());
    }
}
