//! The Rux compiler driver: read a source (file or stdin), run the
//! pipeline, and emit the textual LLVM module (`main.ll` next to the
//! working directory in file mode, stdout in stdin mode). Any error
//! renders as a diagnostic on stderr and exits with status 1.
mod args;
mod error;

use std::{
    fs,
    io::{self, IsTerminal, Read, Write},
    process::exit,
    time::Instant,
};

use clap::Parser;
use log::debug;
use rux_lexer::Lexer;
use rux_lower::{emit_text, lower_module};
use rux_parser::parse_module;
use rux_sema::analyse;
use rux_source::{SourceMap, STDIN_NAME};

use crate::{args::CompilerOptions, error::CompilerError};

/// The file the module is written to in file mode.
const OUTPUT_NAME: &str = "main.ll";

fn main() {
    pretty_env_logger::init();
    let options = CompilerOptions::parse();

    let map = match read_source(&options) {
        Ok(map) => map,
        Err(err) => {
            eprintln!("error: {err}");
            exit(1);
        }
    };

    let text = match compile(&map) {
        Ok(text) => text,
        Err(err) => {
            let colour = io::stderr().is_terminal();
            eprint!("{}", err.to_report().with_source(&map, colour));
            exit(1);
        }
    };

    if let Err(err) = write_output(&options, &text) {
        eprintln!("error: {err}");
        exit(1);
    }
}

fn read_source(options: &CompilerOptions) -> io::Result<SourceMap> {
    if options.use_stdin() {
        let mut contents = String::new();
        io::stdin().read_to_string(&mut contents)?;
        Ok(SourceMap::new(STDIN_NAME, contents))
    } else {
        let name = options.filename.as_deref().unwrap();
        let contents = fs::read_to_string(name)?;
        Ok(SourceMap::new(name, contents))
    }
}

fn compile(map: &SourceMap) -> Result<String, CompilerError> {
    let mut stage = Stopwatch::start();

    let tokens = Lexer::new(map.contents()).tokenise()?;
    stage.lap(format_args!("lexed {} tokens", tokens.len()));

    let ast = parse_module(tokens)?;
    stage.lap(format_args!("parsed {} items", ast.items.len()));

    let analysis = analyse(&ast)?;
    stage.lap(format_args!("analysed the module"));

    let (module, ctx) = lower_module(&ast, &analysis)?;
    stage.lap(format_args!("lowered {} functions", module.functions.len()));

    Ok(emit_text(&module, &ctx))
}

/// Per-stage timing reported at debug level.
struct Stopwatch {
    last: Instant,
}

impl Stopwatch {
    fn start() -> Self {
        Self { last: Instant::now() }
    }

    fn lap(&mut self, what: std::fmt::Arguments<'_>) {
        debug!("{what} in {:?}", self.last.elapsed());
        self.last = Instant::now();
    }
}

/// File mode writes the whole module in one buffered pass; stdin mode
/// prints it.
fn write_output(options: &CompilerOptions, text: &str) -> io::Result<()> {
    if options.use_stdin() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(text.as_bytes())?;
        handle.flush()
    } else {
        fs::write(OUTPUT_NAME, text)
    }
}
