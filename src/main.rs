use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use minipl::bytecode::disassemble;
use minipl::config::Config;
use minipl::lexer::tokenize;
use minipl::source::DEFAULT_TAB_WIDTH;
use minipl::{compile, execute};

/// Compile and run a Mini-PL program.
#[derive(Debug, Parser)]
#[command(name = "minipl", version)]
struct Cli {
    /// Program to run; read from stdin when omitted.
    file: Option<PathBuf>,

    /// Columns a tab advances to in reported positions.
    #[arg(long, default_value_t = DEFAULT_TAB_WIDTH, value_parser = parse_tab_width)]
    tab_width: usize,

    /// Print the token stream before compiling.
    #[arg(long)]
    dump_tokens: bool,

    /// Print the syntax tree after parsing.
    #[arg(long)]
    dump_ast: bool,

    /// Print the bytecode listing before running.
    #[arg(long)]
    dump_bytecode: bool,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            tab_width: self.tab_width,
            dump_tokens: self.dump_tokens,
            dump_ast: self.dump_ast,
            dump_bytecode: self.dump_bytecode,
        }
    }
}

fn parse_tab_width(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("tab width must be at least 1".to_string()),
        Ok(width) => Ok(width),
        Err(error) => Err(error.to_string()),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = cli.config();
    let text = match &cli.file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Reading stdin")?;
            buffer
        }
    };

    if config.dump_tokens {
        let (tokens, _) = tokenize(&text, config.tab_width)?;
        for token in tokens {
            println!("{}  {}", token.span, token.kind);
        }
    }

    let compilation = compile(&text, &config)?;
    if !compilation.diagnostics.is_empty() {
        eprint!("{}", compilation.report());
    }
    if config.dump_ast {
        println!("{:#?}", compilation.program);
    }

    let Some(bytecode) = &compilation.bytecode else {
        return Ok(ExitCode::FAILURE);
    };
    if config.dump_bytecode {
        print!("{}", disassemble(bytecode));
    }

    let mut input = io::stdin().lock();
    let mut output = io::stdout().lock();
    if let Err(error) = execute(bytecode, &compilation.source, &mut input, &mut output) {
        eprintln!("runtime error: {error}");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
