// Expression Template Parser
//
// Recursive descent over the lexer's tokens. Function names and argument
// counts are checked here so a malformed template fails before evaluation.

use super::ast::{Argument, Call, Expression, Function, Segment, Subject, Template};
use super::lexer::{Lexer, Token, TokenType};
use super::{ExpressionError, Result};

pub struct Parser {
    lexer: Lexer,
    current: Option<Token>,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Parser {
            lexer: Lexer::new(input),
            current: None,
        }
    }

    fn next(&mut self) -> Result<Token> {
        match self.current.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    fn peek(&mut self) -> Result<&Token> {
        let token = match self.current.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(&*self.current.insert(token))
    }

    fn unexpected(token: Token) -> ExpressionError {
        ExpressionError::UnexpectedToken {
            found: token.token_type.to_string(),
            position: token.position,
        }
    }

    fn expect(&mut self, expected: TokenType) -> Result<Token> {
        let token = self.next()?;
        if token.token_type == expected {
            Ok(token)
        } else {
            Err(Self::unexpected(token))
        }
    }

    /// Parse the whole input as a template
    pub fn parse_template(&mut self) -> Result<Template> {
        let mut segments = Vec::new();
        loop {
            let token = self.next()?;
            match token.token_type {
                TokenType::Text(text) => segments.push(Segment::Literal(text)),
                TokenType::ExprStart => {
                    let expression = self.parse_expression(token.position)?;
                    segments.push(Segment::Expression(expression));
                }
                TokenType::EOF => break,
                _ => return Err(Self::unexpected(token)),
            }
        }
        Ok(Template { segments })
    }

    /// Parse an expression body; the opening `${` has been consumed
    fn parse_expression(&mut self, start: usize) -> Result<Expression> {
        let subject = self.parse_subject(start)?;
        let mut calls = Vec::new();

        loop {
            let token = self.next()?;
            match token.token_type {
                TokenType::ExprEnd => break,
                TokenType::COLON => calls.push(self.parse_call()?),
                _ => return Err(Self::unexpected(token)),
            }
        }

        Ok(Expression { subject, calls })
    }

    fn parse_subject(&mut self, start: usize) -> Result<Subject> {
        let token = self.next()?;
        match token.token_type {
            TokenType::Identifier(name) => {
                if self.peek()?.token_type != TokenType::LeftParen {
                    return Ok(Subject::Attribute(name));
                }
                if name != "literal" {
                    return Err(ExpressionError::UnknownFunction(name));
                }
                self.expect(TokenType::LeftParen)?;
                let token = self.next()?;
                let value = match token.token_type {
                    TokenType::STRING(s) => s,
                    TokenType::INTEGER(i) => i.to_string(),
                    _ => return Err(Self::unexpected(token)),
                };
                self.expect(TokenType::RightParen)?;
                Ok(Subject::Literal(value))
            }
            // Quoted attribute names allow spaces and other punctuation
            TokenType::STRING(name) => Ok(Subject::Attribute(name)),
            TokenType::INTEGER(i) => Ok(Subject::Attribute(i.to_string())),
            TokenType::ExprEnd => Err(ExpressionError::EmptyExpression(start)),
            _ => Err(Self::unexpected(token)),
        }
    }

    fn parse_call(&mut self) -> Result<Call> {
        let token = self.next()?;
        let name = match token.token_type {
            TokenType::Identifier(name) => name,
            _ => return Err(Self::unexpected(token)),
        };
        let function = Function::from_name(&name)
            .ok_or_else(|| ExpressionError::UnknownFunction(name.clone()))?;

        self.expect(TokenType::LeftParen)?;
        let args = self.parse_arguments()?;

        let arity = function.arity();
        if !arity.contains(&args.len()) {
            let expected = if arity.start() == arity.end() {
                arity.start().to_string()
            } else {
                format!("{}-{}", arity.start(), arity.end())
            };
            return Err(ExpressionError::ArgumentCount {
                function: name,
                expected,
                found: args.len(),
            });
        }

        Ok(Call { function, args })
    }

    /// Parse a comma-separated argument list up to and including `)`
    fn parse_arguments(&mut self) -> Result<Vec<Argument>> {
        let mut args = Vec::new();
        if self.peek()?.token_type == TokenType::RightParen {
            self.next()?;
            return Ok(args);
        }

        loop {
            let token = self.next()?;
            let arg = match token.token_type {
                TokenType::STRING(s) => Argument::Text(s),
                TokenType::INTEGER(i) => Argument::Integer(i),
                TokenType::ExprStart => Argument::Expression(self.parse_expression(token.position)?),
                _ => return Err(Self::unexpected(token)),
            };
            args.push(arg);

            let token = self.next()?;
            match token.token_type {
                TokenType::COMMA => continue,
                TokenType::RightParen => break,
                _ => return Err(Self::unexpected(token)),
            }
        }

        Ok(args)
    }
}
