use std::fs::{read_to_string, set_permissions, write, Permissions};
use std::os::unix::fs::PermissionsExt;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use thiserror::Error;

use ast::dot::dump_ast;
use codegen::lower_program;
use lexer::{Lexer, TokenKind};
use linker::{link, Layout};
use lir::Label;
use parser::Parser;

/// Fixed artifact names, matching the compiler's batch one-shot contract:
/// an AST dump, an assembly listing, and the executable image.
const AST_DUMP_PATH: &str = "dump.dot";
const LISTING_PATH: &str = "output.asm";
const IMAGE_PATH: &str = "output";

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = "Runs the Lyceum compiler for the Aristotle language")]
struct CLI {
    /// Path to Aristotle source file
    #[arg(default_value = "test.aristotle")]
    path: String,

    /// Emit the assembly listing, but do not build the executable image
    #[arg(short = 'S')]
    s: bool,
}

pub fn main() -> Result<()> {
    env_logger::init();

    let args = CLI::parse();

    run_driver(&args.path, args.s)
}

fn run_driver(path: &str, listing_only: bool) -> Result<()> {
    let source = read_to_string(path)
        .with_context(|| format!("Unable to read source file: {}", path))?;

    let (tokens, errors): (Vec<_>, Vec<_>) = Lexer::new(&source)
        .tokenize()
        .into_iter()
        .partition(|t| t.kind != TokenKind::Unknown);

    if !errors.is_empty() {
        let mut error_msgs = Vec::new();

        for err in errors {
            error_msgs.push(format!(
                "{:?} at {}:{}:{}: '{}'",
                err.value, path, err.line, err.col, err.lexeme
            ));
        }

        return Err(CompileErr::Lexer(error_msgs).into());
    }

    log::debug!("lexed {} tokens", tokens.len());

    let program = Parser::new(tokens)
        .parse()
        .map_err(|e| CompileErr::Parser(vec![e.to_string()]))?;

    dump_ast(&program, AST_DUMP_PATH)?;

    let lowered = lower_program(&program).map_err(|e| CompileErr::CodeGen(vec![e.to_string()]))?;

    // the listing is written even for a diagnosed run, so the lowered
    // stream can be inspected; the executable never is
    emission::output(LISTING_PATH, &lowered.instructions)?;
    log::debug!("wrote {} and {}", AST_DUMP_PATH, LISTING_PATH);

    if !lowered.diagnostics.is_empty() {
        return Err(CompileErr::CodeGen(lowered.diagnostics).into());
    }

    if listing_only {
        return Ok(());
    }

    let code = link(&lowered.instructions, emission::load_addr())
        .map_err(|e| CompileErr::Linker(vec![e.to_string()]))?;

    let layout =
        Layout::of(&lowered.instructions).map_err(|e| CompileErr::Linker(vec![e.to_string()]))?;
    let entry = layout.offset_of(&Label::named("_start")).unwrap_or(0);

    write(IMAGE_PATH, emission::write_elf(&code, entry as u64))?;
    set_permissions(IMAGE_PATH, Permissions::from_mode(0o755))?;
    log::debug!("wrote {} ({} code bytes)", IMAGE_PATH, code.len());

    Ok(())
}


#[allow(dead_code)]
#[derive(Error, Debug)]
enum CompileErr {
    #[error("Lexer encountered an error(s): {:#?}", .0)]
    Lexer(Vec<String>),
    #[error("Parser encountered an error: {:#?}", .0)]
    Parser(Vec<String>),
    #[error("Codegen encountered an error: {:#?}", .0)]
    CodeGen(Vec<String>),
    #[error("Linker encountered an error: {:#?}", .0)]
    Linker(Vec<String>),
}
