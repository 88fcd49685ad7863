//! Lexer for the project DSL.
//!
//! Produces a flat stream of positioned tokens. Newlines are
//! significant as statement terminators outside unclosed brackets, so
//! the lexer tracks bracket depth itself and suppresses `Newline`
//! tokens while depth > 0 (mirrors the way `legacy_src/parser/lexer.rs`
//! tracks heredoc state inline rather than pushing that work onto the
//! parser).

mod token;

pub use token::{Token, TokenKind};

use crate::ast::Position;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("{0}:{1}: invalid escape sequence '{2}'")]
    InvalidEscape(usize, usize, String),
    #[error("{0}:{1}: unterminated string literal")]
    UnterminatedString(usize, usize),
    #[error("{0}:{1}: invalid numeric literal '{2}'")]
    InvalidNumber(usize, usize, String),
    #[error("{0}:{1}: unexpected character '{2}'")]
    UnexpectedChar(usize, usize, char),
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::InvalidEscape(l, ..)
            | LexError::UnterminatedString(l, ..)
            | LexError::InvalidNumber(l, ..)
            | LexError::UnexpectedChar(l, ..) => *l,
        }
    }
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("if", TokenKind::If),
    ("elif", TokenKind::Elif),
    ("else", TokenKind::Else),
    ("endif", TokenKind::Endif),
    ("foreach", TokenKind::Foreach),
    ("endforeach", TokenKind::Endforeach),
    ("and", TokenKind::And),
    ("or", TokenKind::Or),
    ("not", TokenKind::Not),
    ("in", TokenKind::In),
    ("continue", TokenKind::Continue),
    ("break", TokenKind::Break),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
];

pub struct Lexer<'a> {
    src: &'a [u8],
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    file: u32,
    bracket_depth: i32,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: u32) -> Self {
        Self {
            src: source.as_bytes(),
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            file,
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn position(&self) -> Position {
        Position { file: self.file, line: self.line, column: self.column }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            match self.peek() {
                None => {
                    let pos = self.position();
                    return Ok(Token { kind: TokenKind::Eof, text: String::new(), start: pos, end: pos });
                }
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                    continue;
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                    continue;
                }
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    // line continuation
                    self.advance();
                    self.advance();
                    continue;
                }
                Some('\n') => {
                    let start = self.position();
                    self.advance();
                    if self.bracket_depth > 0 {
                        continue;
                    }
                    let end = self.position();
                    return Ok(Token { kind: TokenKind::Newline, text: "\n".into(), start, end });
                }
                _ => break,
            }
        }

        let start = self.position();
        let c = self.peek().unwrap();

        if c.is_ascii_digit() {
            return self.lex_number(start);
        }
        if c == '_' || c.is_alphabetic() {
            return self.lex_ident(start);
        }
        if c == '\'' {
            return self.lex_single(start, false);
        }
        if c == '"' {
            return self.lex_double(start);
        }
        if c == 'f' && (self.peek_at(1) == Some('\'') || self.peek_at(1) == Some('"')) {
            self.advance();
            let quote = self.peek().unwrap();
            return if quote == '\'' {
                self.lex_single(start, true)
            } else {
                self.lex_double_fstring(start)
            };
        }

        self.lex_operator(start, c)
    }

    fn lex_number(&mut self, start: Position) -> Result<Token, LexError> {
        let mut text = String::new();
        if self.peek() == Some('0')
            && matches!(self.peek_at(1), Some('x') | Some('X') | Some('o') | Some('O') | Some('b') | Some('B'))
        {
            text.push(self.advance().unwrap());
            text.push(self.advance().unwrap());
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() {
                    text.push(self.advance().unwrap());
                } else {
                    break;
                }
            }
        } else {
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(self.advance().unwrap());
                } else {
                    break;
                }
            }
        }
        if parse_int_literal(&text).is_none() {
            return Err(LexError::InvalidNumber(start.line, start.column, text));
        }
        let end = self.position();
        Ok(Token { kind: TokenKind::Int, text, start, end })
    }

    fn lex_ident(&mut self, start: Position) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                text.push(self.advance().unwrap());
            } else {
                break;
            }
        }
        let end = self.position();
        let kind = KEYWORDS.iter().find(|(k, _)| *k == text).map(|(_, k)| *k).unwrap_or(TokenKind::Ident);
        Ok(Token { kind, text, start, end })
    }

    fn lex_single(&mut self, start: Position, is_fstring: bool) -> Result<Token, LexError> {
        self.advance(); // opening quote(s)
        let triple = self.peek() == Some('\'') && self.peek_at(1) == Some('\'');
        if triple {
            self.advance();
            self.advance();
            let mut text = String::new();
            loop {
                match self.peek() {
                    None => return Err(LexError::UnterminatedString(start.line, start.column)),
                    Some('\'') if self.peek_at(1) == Some('\'') && self.peek_at(2) == Some('\'') => {
                        self.advance();
                        self.advance();
                        self.advance();
                        break;
                    }
                    Some(c) => {
                        text.push(c);
                        self.advance();
                    }
                }
            }
            let end = self.position();
            let kind = if is_fstring { TokenKind::FString } else { TokenKind::TripleString };
            return Ok(Token { kind, text, start, end });
        }

        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::UnterminatedString(start.line, start.column)),
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let esc_start = self.position();
                    self.advance();
                    match self.peek() {
                        None => return Err(LexError::UnterminatedString(start.line, start.column)),
                        Some(ec) => {
                            let decoded = decode_escape(ec, self)?;
                            match decoded {
                                Some(s) => text.push_str(&s),
                                None => {
                                    return Err(LexError::InvalidEscape(
                                        esc_start.line,
                                        esc_start.column,
                                        format!("\\{ec}"),
                                    ))
                                }
                            }
                        }
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        let end = self.position();
        let kind = if is_fstring { TokenKind::FString } else { TokenKind::SingleString };
        Ok(Token { kind, text, start, end })
    }

    fn lex_double(&mut self, start: Position) -> Result<Token, LexError> {
        // Double-quoted strings follow the same escape rules as single
        // quotes in this DSL; only the delimiter differs.
        self.advance();
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::UnterminatedString(start.line, start.column)),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let esc_start = self.position();
                    self.advance();
                    match self.peek() {
                        None => return Err(LexError::UnterminatedString(start.line, start.column)),
                        Some(ec) => match decode_escape(ec, self)? {
                            Some(s) => text.push_str(&s),
                            None => {
                                return Err(LexError::InvalidEscape(
                                    esc_start.line,
                                    esc_start.column,
                                    format!("\\{ec}"),
                                ))
                            }
                        },
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        let end = self.position();
        Ok(Token { kind: TokenKind::SingleString, text, start, end })
    }

    fn lex_double_fstring(&mut self, start: Position) -> Result<Token, LexError> {
        let mut tok = self.lex_double(start)?;
        tok.kind = TokenKind::FString;
        Ok(tok)
    }

    fn lex_operator(&mut self, start: Position, c: char) -> Result<Token, LexError> {
        // Two-character operators: ==, !=, <=, >=, +=
        let two_char_kind = match (c, self.peek_at(1)) {
            ('=', Some('=')) => Some(TokenKind::EqEq),
            ('!', Some('=')) => Some(TokenKind::Ne),
            ('<', Some('=')) => Some(TokenKind::Le),
            ('>', Some('=')) => Some(TokenKind::Ge),
            ('+', Some('=')) => Some(TokenKind::PlusEq),
            _ => None,
        };
        if let Some(kind) = two_char_kind {
            self.advance();
            self.advance();
            let end = self.position();
            return Ok(Token { kind, text: format!("{}{}", c, '='), start, end });
        }

        match c {
            '(' => {
                self.advance();
                self.bracket_depth += 1;
                let end = self.position();
                Ok(Token { kind: TokenKind::LParen, text: "(".into(), start, end })
            }
            ')' => {
                self.advance();
                self.bracket_depth -= 1;
                let end = self.position();
                Ok(Token { kind: TokenKind::RParen, text: ")".into(), start, end })
            }
            '[' => {
                self.advance();
                self.bracket_depth += 1;
                let end = self.position();
                Ok(Token { kind: TokenKind::LBracket, text: "[".into(), start, end })
            }
            ']' => {
                self.advance();
                self.bracket_depth -= 1;
                let end = self.position();
                Ok(Token { kind: TokenKind::RBracket, text: "]".into(), start, end })
            }
            '{' => {
                self.advance();
                self.bracket_depth += 1;
                let end = self.position();
                Ok(Token { kind: TokenKind::LBrace, text: "{".into(), start, end })
            }
            '}' => {
                self.advance();
                self.bracket_depth -= 1;
                let end = self.position();
                Ok(Token { kind: TokenKind::RBrace, text: "}".into(), start, end })
            }
            ',' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Comma, text: ",".into(), start, end })
            }
            ':' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Colon, text: ":".into(), start, end })
            }
            '.' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Dot, text: ".".into(), start, end })
            }
            '?' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Question, text: "?".into(), start, end })
            }
            '=' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Eq, text: "=".into(), start, end })
            }
            '+' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Plus, text: "+".into(), start, end })
            }
            '-' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Minus, text: "-".into(), start, end })
            }
            '*' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Star, text: "*".into(), start, end })
            }
            '/' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Slash, text: "/".into(), start, end })
            }
            '%' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Percent, text: "%".into(), start, end })
            }
            '<' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Lt, text: "<".into(), start, end })
            }
            '>' => {
                self.advance();
                let end = self.position();
                Ok(Token { kind: TokenKind::Gt, text: ">".into(), start, end })
            }
            _ => Err(LexError::UnexpectedChar(start.line, start.column, c)),
        }
    }
}

fn parse_int_literal(text: &str) -> Option<i64> {
    if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(rest, 16).ok()
    } else if let Some(rest) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        i64::from_str_radix(rest, 8).ok()
    } else if let Some(rest) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        i64::from_str_radix(rest, 2).ok()
    } else {
        text.parse::<i64>().ok()
    }
}

/// Decode a single-character escape following a backslash. Returns
/// `Ok(None)` for an unrecognized escape (caller turns that into an
/// error with position context).
fn decode_escape(ec: char, lexer: &mut Lexer<'_>) -> Result<Option<String>, LexError> {
    lexer.advance();
    Ok(match ec {
        'n' => Some("\n".to_string()),
        't' => Some("\t".to_string()),
        'r' => Some("\r".to_string()),
        '\'' => Some("'".to_string()),
        '"' => Some("\"".to_string()),
        '\\' => Some("\\".to_string()),
        '0' => Some("\0".to_string()),
        'a' => Some("\u{7}".to_string()),
        'b' => Some("\u{8}".to_string()),
        'f' => Some("\u{c}".to_string()),
        'v' => Some("\u{b}".to_string()),
        'x' => {
            let mut hex = String::new();
            for _ in 0..2 {
                if let Some(h) = lexer.peek().filter(|c| c.is_ascii_hexdigit()) {
                    hex.push(h);
                    lexer.advance();
                }
            }
            u8::from_str_radix(&hex, 16).ok().map(|b| (b as char).to_string())
        }
        'u' => decode_unicode_escape(lexer, 4),
        'U' => decode_unicode_escape(lexer, 8),
        _ => None,
    })
}

fn decode_unicode_escape(lexer: &mut Lexer<'_>, width: usize) -> Option<String> {
    let mut hex = String::new();
    for _ in 0..width {
        if let Some(h) = lexer.peek().filter(|c| c.is_ascii_hexdigit()) {
            hex.push(h);
            lexer.advance();
        }
    }
    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32).map(|c| c.to_string())
}

pub fn parse_int(text: &str) -> Option<i64> {
    parse_int_literal(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, 0).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_identifiers_and_keywords() {
        assert_eq!(kinds("foo if bar"), vec![TokenKind::Ident, TokenKind::If, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn lexes_integers() {
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("42"), Some(42));
    }

    #[test]
    fn suppresses_newlines_inside_brackets() {
        let toks = kinds("foo(\n1,\n2)\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Int,
                TokenKind::Comma,
                TokenKind::Int,
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn single_quote_escapes() {
        let toks = Lexer::new("'a\\nb'", 0).tokenize().unwrap();
        assert_eq!(toks[0].text, "a\nb");
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = Lexer::new("'abc", 0).tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString(1, 1)));
    }

    #[test]
    fn triple_quoted_preserves_newlines() {
        let toks = Lexer::new("'''a\nb'''", 0).tokenize().unwrap();
        assert_eq!(toks[0].kind, TokenKind::TripleString);
        assert_eq!(toks[0].text, "a\nb");
    }
}
