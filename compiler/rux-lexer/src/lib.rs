//! The Rux lexer: turns source text into a flat [Token] stream.
//!
//! Comments are stripped here rather than in a separate pre-pass.
//! Integer literals admit decimal, `0x`, `0o` and `0b` forms with `_`
//! separators and an optional `i32`/`u32`/`isize`/`usize` suffix;
//! character literals support the standard escapes; string literals
//! support the `c` (C-string) and `r#…#` (raw) prefixes.
pub mod error;
pub mod token;

pub use error::{LexerError, LexerErrorKind};
use rux_ast::IntSuffix;
use rux_source::Span;
pub use token::{Keyword, Token, TokenKind};

pub type LexerResult<T> = Result<T, LexerError>;

/// A cursor over the source text. Construct with [Lexer::new] and
/// drain with [Lexer::tokenise].
pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    /// Lex the whole source.
    pub fn tokenise(mut self) -> LexerResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }

    fn error(&self, kind: LexerErrorKind, start: usize) -> LexerError {
        LexerError::new(kind, self.span_from(start))
    }

    /// Skip whitespace and comments; block comments nest.
    fn skip_trivia(&mut self) -> LexerResult<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let start = self.pos;
                    self.bump();
                    self.bump();

                    let mut depth = 1usize;
                    loop {
                        match (self.peek(), self.peek_second()) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            (Some('/'), Some('*')) => {
                                self.bump();
                                self.bump();
                                depth += 1;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(self
                                    .error(LexerErrorKind::UnterminatedBlockComment, start));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> LexerResult<Option<Token>> {
        self.skip_trivia()?;

        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        // String prefixes are decided before identifier lexing so that
        // `c"…"` and `r#"…"#` do not lex as an identifier.
        if c == 'c' && self.peek_second() == Some('"') {
            self.bump();
            return self.lex_string(start, true).map(Some);
        }
        if c == 'r' && matches!(self.peek_second(), Some('"') | Some('#')) {
            self.bump();
            return self.lex_raw_string(start).map(Some);
        }

        if c.is_ascii_digit() {
            return self.lex_number(start).map(Some);
        }
        if c == '_' || c.is_alphabetic() {
            return self.lex_ident(start).map(Some);
        }

        let kind = match self.bump().unwrap() {
            '\'' => return self.lex_char(start).map(Some),
            '"' => return self.lex_string(start, false).map(Some),

            '+' if self.eat('=') => TokenKind::PlusEq,
            '+' => TokenKind::Plus,
            '-' if self.eat('=') => TokenKind::MinusEq,
            '-' if self.eat('>') => TokenKind::Arrow,
            '-' => TokenKind::Minus,
            '*' if self.eat('=') => TokenKind::StarEq,
            '*' => TokenKind::Star,
            '/' if self.eat('=') => TokenKind::SlashEq,
            '/' => TokenKind::Slash,
            '%' if self.eat('=') => TokenKind::PercentEq,
            '%' => TokenKind::Percent,
            '^' if self.eat('=') => TokenKind::CaretEq,
            '^' => TokenKind::Caret,
            '&' if self.eat('&') => TokenKind::AmpAmp,
            '&' if self.eat('=') => TokenKind::AmpEq,
            '&' => TokenKind::Amp,
            '|' if self.eat('|') => TokenKind::PipePipe,
            '|' if self.eat('=') => TokenKind::PipeEq,
            '|' => TokenKind::Pipe,
            '!' if self.eat('=') => TokenKind::NotEq,
            '!' => TokenKind::Not,
            '=' if self.eat('=') => TokenKind::EqEq,
            '=' => TokenKind::Eq,
            '<' if self.eat('<') => {
                if self.eat('=') {
                    TokenKind::ShlEq
                } else {
                    TokenKind::Shl
                }
            }
            '<' if self.eat('=') => TokenKind::LtEq,
            '<' => TokenKind::Lt,
            '>' if self.eat('>') => {
                if self.eat('=') {
                    TokenKind::ShrEq
                } else {
                    TokenKind::Shr
                }
            }
            '>' if self.eat('=') => TokenKind::GtEq,
            '>' => TokenKind::Gt,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            ':' if self.eat(':') => TokenKind::ColonColon,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            other => {
                return Err(self.error(LexerErrorKind::UnexpectedCharacter(other), start));
            }
        };

        Ok(Some(Token::new(kind, self.span_from(start))))
    }

    fn lex_ident(&mut self, start: usize) -> LexerResult<Token> {
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }

        let text = &self.src[start..self.pos];
        let kind = match Keyword::from_str(text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(text.to_string()),
        };

        Ok(Token::new(kind, self.span_from(start)))
    }

    fn lex_number(&mut self, start: usize) -> LexerResult<Token> {
        let radix = if self.peek() == Some('0') {
            match self.peek_second() {
                Some('x' | 'X') => 16,
                Some('o' | 'O') => 8,
                Some('b' | 'B') => 2,
                _ => 10,
            }
        } else {
            10
        };

        if radix != 10 {
            self.bump();
            self.bump();
        }

        let digits_start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c.is_digit(radix) {
                self.bump();
            } else {
                break;
            }
        }

        let digits: String =
            self.src[digits_start..self.pos].chars().filter(|c| *c != '_').collect();
        if digits.is_empty() {
            return Err(self.error(LexerErrorKind::InvalidDigit { radix }, start));
        }

        // Whatever identifier-like text trails the digits is the type
        // suffix.
        let suffix_start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }

        let suffix = match &self.src[suffix_start..self.pos] {
            "" => None,
            "i32" => Some(IntSuffix::I32),
            "u32" => Some(IntSuffix::U32),
            "isize" => Some(IntSuffix::ISize),
            "usize" => Some(IntSuffix::USize),
            _ => {
                let text = self.src[start..self.pos].to_string();
                return Err(self.error(LexerErrorKind::InvalidIntLiteral(text), start));
            }
        };

        let value = u64::from_str_radix(&digits, radix).map_err(|_| {
            self.error(LexerErrorKind::InvalidIntLiteral(self.src[start..self.pos].into()), start)
        })?;

        Ok(Token::new(TokenKind::Int { value, suffix }, self.span_from(start)))
    }

    fn lex_escape(&mut self, start: usize) -> LexerResult<char> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('\\') => Ok('\\'),
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some('0') => Ok('\0'),
            Some('x') => {
                let mut value = 0u32;
                for _ in 0..2 {
                    let digit = self
                        .bump()
                        .and_then(|c| c.to_digit(16))
                        .ok_or_else(|| self.error(LexerErrorKind::InvalidEscape('x'), start))?;
                    value = value * 16 + digit;
                }
                char::from_u32(value)
                    .ok_or_else(|| self.error(LexerErrorKind::InvalidEscape('x'), start))
            }
            Some(other) => Err(self.error(LexerErrorKind::InvalidEscape(other), start)),
            None => Err(self.error(LexerErrorKind::UnterminatedChar, start)),
        }
    }

    fn lex_char(&mut self, start: usize) -> LexerResult<Token> {
        let value = match self.bump() {
            Some('\\') => self.lex_escape(start)?,
            Some('\'') => return Err(self.error(LexerErrorKind::InvalidCharLiteral, start)),
            Some(c) => c,
            None => return Err(self.error(LexerErrorKind::UnterminatedChar, start)),
        };

        if !self.eat('\'') {
            // A second character before the closing quote is a
            // malformed literal, not an unterminated one, when the
            // quote eventually shows up; keep the simpler report.
            return Err(self.error(LexerErrorKind::UnterminatedChar, start));
        }

        Ok(Token::new(TokenKind::Char(value), self.span_from(start)))
    }

    fn lex_string(&mut self, start: usize, c_str: bool) -> LexerResult<Token> {
        // The opening quote of a plain string has already been
        // consumed by `next_token`; for a `c` string only the prefix
        // has.
        if c_str {
            self.bump();
        }

        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => value.push(self.lex_escape(start)?),
                Some(c) => value.push(c),
                None => return Err(self.error(LexerErrorKind::UnterminatedString, start)),
            }
        }

        Ok(Token::new(TokenKind::Str { value, c_str }, self.span_from(start)))
    }

    fn lex_raw_string(&mut self, start: usize) -> LexerResult<Token> {
        let mut hashes = 0usize;
        while self.eat('#') {
            hashes += 1;
        }
        if !self.eat('"') {
            return Err(self.error(LexerErrorKind::UnterminatedString, start));
        }

        let mut value = String::new();
        'outer: loop {
            match self.bump() {
                Some('"') => {
                    let mark = self.pos;
                    for _ in 0..hashes {
                        if !self.eat('#') {
                            // Not the closing delimiter; everything is
                            // literal text.
                            value.push('"');
                            value.push_str(&self.src[mark..self.pos]);
                            continue 'outer;
                        }
                    }
                    break;
                }
                Some(c) => value.push(c),
                None => return Err(self.error(LexerErrorKind::UnterminatedString, start)),
            }
        }

        Ok(Token::new(TokenKind::Str { value, c_str: false }, self.span_from(start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenise().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn integer_literal_forms() {
        assert_eq!(lex("42"), vec![TokenKind::Int { value: 42, suffix: None }]);
        assert_eq!(lex("0xFF_u32"), vec![TokenKind::Int { value: 255, suffix: Some(IntSuffix::U32) }]);
        assert_eq!(lex("0o17"), vec![TokenKind::Int { value: 15, suffix: None }]);
        assert_eq!(lex("0b1010isize"), vec![TokenKind::Int { value: 10, suffix: Some(IntSuffix::ISize) }]);
        assert_eq!(lex("1_000_000"), vec![TokenKind::Int { value: 1_000_000, suffix: None }]);
        assert_eq!(lex("2147483648u32"), vec![TokenKind::Int { value: 2147483648, suffix: Some(IntSuffix::U32) }]);
    }

    #[test]
    fn bad_integer_literals() {
        assert!(Lexer::new("0x").tokenise().is_err());
        assert!(Lexer::new("10i64").tokenise().is_err());
        assert!(Lexer::new("99999999999999999999999").tokenise().is_err());
    }

    #[test]
    fn char_escapes() {
        assert_eq!(lex(r"'\n'"), vec![TokenKind::Char('\n')]);
        assert_eq!(lex(r"'\x41'"), vec![TokenKind::Char('A')]);
        assert_eq!(lex("'q'"), vec![TokenKind::Char('q')]);
        assert!(Lexer::new(r"'\q'").tokenise().is_err());
    }

    #[test]
    fn string_forms() {
        assert_eq!(
            lex(r#""hi\n""#),
            vec![TokenKind::Str { value: "hi\n".into(), c_str: false }]
        );
        assert_eq!(
            lex(r#"c"end""#),
            vec![TokenKind::Str { value: "end".into(), c_str: true }]
        );
        assert_eq!(
            lex(r###"r#"raw \n "quoted""#"###),
            vec![TokenKind::Str { value: r#"raw \n "quoted""#.into(), c_str: false }]
        );
    }

    #[test]
    fn operators_and_keywords() {
        assert_eq!(
            lex("a <<= 1 >> b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::ShlEq,
                TokenKind::Int { value: 1, suffix: None },
                TokenKind::Shr,
                TokenKind::Ident("b".into()),
            ]
        );
        assert_eq!(
            lex("fn f() -> i32"),
            vec![
                TokenKind::Keyword(Keyword::Fn),
                TokenKind::Ident("f".into()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Arrow,
                TokenKind::Ident("i32".into()),
            ]
        );
    }

    #[test]
    fn comments_are_stripped() {
        assert_eq!(
            lex("1 // line\n/* block /* nested */ */ 2"),
            vec![
                TokenKind::Int { value: 1, suffix: None },
                TokenKind::Int { value: 2, suffix: None },
            ]
        );
        assert!(Lexer::new("/* open").tokenise().is_err());
    }
}
