//! The top-level error type: every stage's failure, unified for
//! reporting at the CLI boundary.
use derive_more::From;
use rux_ir::IrError;
use rux_lexer::LexerError;
use rux_parser::ParseError;
use rux_reporting::Report;
use rux_sema::SemanticError;
use rux_source::Span;

#[derive(Debug, From)]
pub(crate) enum CompilerError {
    Lex(LexerError),
    Parse(ParseError),
    Semantic(SemanticError),
    Ir(IrError),
}

impl CompilerError {
    fn span(&self) -> Option<Span> {
        match self {
            CompilerError::Lex(err) => Some(err.span),
            CompilerError::Parse(err) => Some(err.span),
            CompilerError::Semantic(err) => Some(err.span),
            // IR errors are invariant failures without a source
            // position.
            CompilerError::Ir(_) => None,
        }
    }

    pub(crate) fn to_report(&self) -> Report {
        let message = match self {
            CompilerError::Lex(err) => err.to_string(),
            CompilerError::Parse(err) => err.to_string(),
            CompilerError::Semantic(err) => err.to_string(),
            CompilerError::Ir(err) => err.to_string(),
        };
        Report::error(message, self.span())
    }
}
