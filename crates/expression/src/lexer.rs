//! Tokenizer for the `$`-prefixed path/expression grammar (§4.1, §4.2).

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    /// A `$`-prefixed path root name, e.g. the `input` in `$input.x`.
    Dollar(String),
    Ident(String),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
    ConcatConcat,
    MinusMinus,
    In,
    Pipe,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub position: usize,
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { chars: input.chars().collect(), input, pos: 0 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let estimate = (self.input.len() / 4).max(8);
        let mut tokens = Vec::with_capacity(estimate);
        loop {
            let tok = self.next_token()?;
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Token { kind: TokenKind::Eof, position: start });
        };

        let kind = match c {
            '.' => {
                self.advance();
                TokenKind::Dot
            }
            '[' => {
                self.advance();
                TokenKind::LBracket
            }
            ']' => {
                self.advance();
                TokenKind::RBracket
            }
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '+' if self.peek_at(1) == Some('+') => {
                self.advance();
                self.advance();
                TokenKind::ConcatConcat
            }
            '+' => {
                self.advance();
                TokenKind::Plus
            }
            '-' if self.peek_at(1) == Some('-') => {
                self.advance();
                self.advance();
                TokenKind::MinusMinus
            }
            '-' => {
                self.advance();
                TokenKind::Minus
            }
            '*' => {
                self.advance();
                TokenKind::Star
            }
            '/' => {
                self.advance();
                TokenKind::Slash
            }
            '=' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                TokenKind::Eq
            }
            '!' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                TokenKind::NotEq
            }
            '<' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                TokenKind::LtEq
            }
            '<' => {
                self.advance();
                TokenKind::Lt
            }
            '>' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                TokenKind::GtEq
            }
            '>' => {
                self.advance();
                TokenKind::Gt
            }
            '|' => {
                self.advance();
                TokenKind::Pipe
            }
            '"' | '\'' => self.read_string(c)?,
            '$' => self.read_dollar()?,
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_identifier_or_keyword(),
            _ => {
                return Err(LexError {
                    message: format!("unexpected character '{c}'"),
                    position: start,
                });
            }
        };

        Ok(Token { kind, position: start })
    }

    fn read_string(&mut self, quote: char) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.advance();
        let mut s = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(LexError { message: "unterminated string literal".into(), position: start });
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(other) => s.push(other),
                    None => {
                        return Err(LexError {
                            message: "unterminated escape sequence".into(),
                            position: start,
                        });
                    }
                },
                Some(c) => s.push(c),
            }
        }
        Ok(TokenKind::Str(s))
    }

    fn read_dollar(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.advance();
        let mut name = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            name.push(self.advance().unwrap());
        }
        if name.is_empty() {
            return Err(LexError { message: "expected path root name after '$'".into(), position: start });
        }
        Ok(TokenKind::Dollar(name))
    }

    fn read_number(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            TokenKind::Float(text.parse().unwrap_or(0.0))
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                Err(_) => TokenKind::Float(text.parse().unwrap_or(0.0)),
            }
        }
    }

    fn read_identifier_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            "null" | "nil" => TokenKind::Null,
            _ => TokenKind::Ident(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_path() {
        assert_eq!(
            kinds("$input.user.email"),
            vec![
                TokenKind::Dollar("input".into()),
                TokenKind::Dot,
                TokenKind::Ident("user".into()),
                TokenKind::Dot,
                TokenKind::Ident("email".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_operators() {
        assert_eq!(
            kinds("1 ++ 2 -- 3"),
            vec![
                TokenKind::Int(1),
                TokenKind::ConcatConcat,
                TokenKind::Int(2),
                TokenKind::MinusMinus,
                TokenKind::Int(3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_string_with_escape() {
        assert_eq!(kinds(r#""a\nb""#), vec![TokenKind::Str("a\nb".into()), TokenKind::Eof]);
    }

    #[test]
    fn tokenizes_keywords() {
        assert_eq!(
            kinds("true and false or not null in x"),
            vec![
                TokenKind::Bool(true),
                TokenKind::And,
                TokenKind::Bool(false),
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Null,
                TokenKind::In,
                TokenKind::Ident("x".into()),
                TokenKind::Eof,
            ]
        );
    }
}
