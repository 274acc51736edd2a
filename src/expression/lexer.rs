// Expression Template Lexer
//
// Splits a template into literal text and the tokens of each `${...}` expression.
// Outside an expression everything is text; inside, whitespace is insignificant.

use std::fmt;

use super::{ExpressionError, Result};

/// Template token types
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    /// Literal text outside any expression
    Text(String),
    /// `${`
    ExprStart,
    /// `}`
    ExprEnd,
    Identifier(String),
    /// Quoted string literal
    STRING(String),
    INTEGER(i64),
    COLON,
    COMMA,
    LeftParen,
    RightParen,
    EOF,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenType::Text(text) => write!(f, "text '{}'", text),
            TokenType::ExprStart => write!(f, "'${{'"),
            TokenType::ExprEnd => write!(f, "'}}'"),
            TokenType::Identifier(name) => write!(f, "identifier '{}'", name),
            TokenType::STRING(s) => write!(f, "string '{}'", s),
            TokenType::INTEGER(i) => write!(f, "integer {}", i),
            TokenType::COLON => write!(f, "':'"),
            TokenType::COMMA => write!(f, "','"),
            TokenType::LeftParen => write!(f, "'('"),
            TokenType::RightParen => write!(f, "')'"),
            TokenType::EOF => write!(f, "end of input"),
        }
    }
}

/// A token and the character offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub position: usize,
}

/// Template lexer
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    /// Start offsets of the currently open `${`
    open: Vec<usize>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
            open: Vec::new(),
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn token(&self, token_type: TokenType, position: usize) -> Token {
        Token { token_type, position }
    }

    /// Produce the next token
    pub fn next_token(&mut self) -> Result<Token> {
        if self.open.is_empty() {
            self.next_text_token()
        } else {
            self.next_expression_token()
        }
    }

    fn next_text_token(&mut self) -> Result<Token> {
        let start = self.pos;
        let mut text = String::new();

        while let Some(ch) = self.current() {
            match (ch, self.peek()) {
                ('$', Some('$')) => {
                    text.push('$');
                    self.pos += 2;
                }
                ('$', Some('{')) => {
                    if !text.is_empty() {
                        return Ok(self.token(TokenType::Text(text), start));
                    }
                    self.open.push(self.pos);
                    self.pos += 2;
                    return Ok(self.token(TokenType::ExprStart, start));
                }
                _ => {
                    text.push(ch);
                    self.pos += 1;
                }
            }
        }

        if text.is_empty() {
            Ok(self.token(TokenType::EOF, self.pos))
        } else {
            Ok(self.token(TokenType::Text(text), start))
        }
    }

    fn next_expression_token(&mut self) -> Result<Token> {
        while self.current().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }

        let start = self.pos;
        let ch = match self.current() {
            Some(ch) => ch,
            None => {
                let opened_at = self.open.first().copied().unwrap_or(0);
                return Err(ExpressionError::UnterminatedExpression(opened_at));
            }
        };

        let token_type = match ch {
            '$' if self.peek() == Some('{') => {
                self.open.push(self.pos);
                self.pos += 2;
                return Ok(self.token(TokenType::ExprStart, start));
            }
            '}' => {
                self.open.pop();
                TokenType::ExprEnd
            }
            ':' => TokenType::COLON,
            ',' => TokenType::COMMA,
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '\'' | '"' => return self.read_string(ch),
            c if is_identifier_char(c) => return Ok(self.read_word()),
            c => {
                return Err(ExpressionError::UnexpectedCharacter { ch: c, position: start });
            }
        };

        self.pos += 1;
        Ok(self.token(token_type, start))
    }

    /// Read a quoted string, honouring backslash escapes
    fn read_string(&mut self, quote: char) -> Result<Token> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();

        loop {
            match self.current() {
                None => return Err(ExpressionError::UnterminatedString(start)),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(self.token(TokenType::STRING(value), start));
                }
                Some('\\') => {
                    let escaped = match self.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => other,
                        None => return Err(ExpressionError::UnterminatedString(start)),
                    };
                    value.push(escaped);
                    self.pos += 2;
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    /// Read an identifier or an integer
    fn read_word(&mut self) -> Token {
        let start = self.pos;
        let mut word = String::new();
        while let Some(c) = self.current() {
            if !is_identifier_char(c) {
                break;
            }
            word.push(c);
            self.pos += 1;
        }

        match word.parse::<i64>() {
            Ok(i) => self.token(TokenType::INTEGER(i), start),
            Err(_) => self.token(TokenType::Identifier(word), start),
        }
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.token_type == TokenType::EOF;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '-'
}
