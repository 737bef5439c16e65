//! Compiler argument management.
use clap::Parser;

/// Command-line surface: one optional input, nothing else. Logging is
/// configured through `RUST_LOG`.
#[derive(Parser)]
#[command(
    name = "rux",
    version,
    author = "Rux Language Authors",
    about = "Compile Rux programs to LLVM IR",
    disable_colored_help = true
)]
pub(crate) struct CompilerOptions {
    /// Source file to compile; `-` (or no argument) reads from
    /// standard input and prints the module to standard output.
    pub(crate) filename: Option<String>,
}

impl CompilerOptions {
    /// Whether the compiler runs in stdin/stdout mode.
    pub(crate) fn use_stdin(&self) -> bool {
        match &self.filename {
            None => true,
            Some(name) => name == "-",
        }
    }
}
