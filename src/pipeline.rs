//! Drives source text through every stage and hands the result to the VM.

use log::debug;

use crate::ast::Program;
use crate::bytecode::{self, Bytecode};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::CompileResult;
use crate::parser;
use crate::semantic::{self, Analysis};
use crate::source::SourceText;
use crate::vm::{InputSource, Interpreter, OutputSink, RuntimeResult};

/// Everything the front end produced for one source file. `bytecode` is
/// `None` when a blocking diagnostic stopped compilation.
#[derive(Debug)]
pub struct Compilation {
    pub source: SourceText,
    pub diagnostics: Diagnostics,
    pub program: Program,
    pub analysis: Analysis,
    pub bytecode: Option<Bytecode>,
}

impl Compilation {
    pub fn succeeded(&self) -> bool {
        self.bytecode.is_some()
    }

    /// Diagnostics rendered with the offending source lines.
    pub fn report(&self) -> String {
        self.diagnostics.render(&self.source)
    }
}

pub fn compile(text: &str, config: &Config) -> CompileResult<Compilation> {
    let source = SourceText::new(text, config.tab_width);
    let mut diagnostics = Diagnostics::new();

    let program = parser::parse(&source, &mut diagnostics)?;
    debug!(
        "parsed {} statements, {} diagnostics so far",
        program.statements.len(),
        diagnostics.len()
    );

    let analysis = semantic::check(&program, &mut diagnostics);
    debug!(
        "checked {} variables, {} typed expressions",
        analysis.symbols.len(),
        analysis.types.len()
    );

    let bytecode = if diagnostics.has_blocking() {
        let errors = diagnostics.blocking().len();
        diagnostics.generic_note(format!(
            "Code generation skipped because of {errors} error{}",
            if errors == 1 { "" } else { "s" }
        ));
        None
    } else {
        Some(bytecode::generate(&program, &analysis)?)
    };

    Ok(Compilation {
        source,
        diagnostics,
        program,
        analysis,
        bytecode,
    })
}

/// Executes compiled bytecode; failed asserts quote lines from `source`.
pub fn execute(
    bytecode: &Bytecode,
    source: &SourceText,
    input: &mut dyn InputSource,
    output: &mut dyn OutputSink,
) -> RuntimeResult<()> {
    Interpreter::new(bytecode)
        .with_source(source)
        .run(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use indoc::indoc;

    #[test]
    fn clean_program_produces_bytecode() {
        let compilation = compile("var x : int := 3; print x;", &Config::default()).unwrap();
        assert!(compilation.succeeded());
        assert!(compilation.diagnostics.is_empty());

        let bytecode = compilation.bytecode.as_ref().unwrap();
        let mut input: &[u8] = b"";
        let mut output = Vec::<u8>::new();
        execute(bytecode, &compilation.source, &mut input, &mut output).unwrap();
        assert_eq!(output, b"3");
    }

    #[test]
    fn blocking_diagnostics_skip_code_generation() {
        let compilation = compile(
            indoc! {r#"
                var x : int := "a";
                print y;
            "#},
            &Config::default(),
        )
        .unwrap();
        assert!(!compilation.succeeded());
        assert_eq!(compilation.diagnostics.count(Severity::SemanticError), 2);
        assert_eq!(compilation.diagnostics.count(Severity::GenericNote), 1);
        assert!(
            compilation
                .report()
                .ends_with("note: Code generation skipped because of 2 errors\n")
        );
    }

    #[test]
    fn warnings_do_not_block() {
        let compilation =
            compile("var x : int; x := x; print x;", &Config::default()).unwrap();
        assert!(compilation.succeeded());
        assert_eq!(compilation.diagnostics.count(Severity::Warning), 1);
    }

    #[test]
    fn tab_width_changes_reported_columns() {
        let config = Config::default().with_tab_width(8);
        let compilation = compile("\tprint y;", &config).unwrap();
        let error = compilation.diagnostics.blocking()[0];
        assert_eq!(error.span.column, 14);
    }
}
