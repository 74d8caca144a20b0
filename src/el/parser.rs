//! Recursive-descent parser for expression bodies
//!
//! Grammar:
//!
//! ```text
//! expr     := term (('+' | '-') term)*
//! term     := unary (('*' | '/' | '%') unary)*
//! unary    := '-' unary | primary
//! primary  := INT | STRING | '(' expr ')' | name ['(' args ')']
//! name     := IDENT [':' IDENT]
//! ```

use super::tokenizer::{tokenize, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Str(String),
    Variable(String),
    Call {
        namespace: Option<String>,
        name: String,
        args: Vec<Expr>,
    },
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(ref t) if *t == expected => Ok(()),
            Some(t) => Err(format!("Expected {:?} but found {:?}", expected, t)),
            None => Err(format!("Expected {:?} but reached end of expression", expected)),
        }
    }

    fn expression(&mut self) -> Result<Expr, String> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.next();
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.next();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Minus) {
            self.next();
            let inner = self.unary()?;
            return Ok(match inner {
                Expr::Int(n) => Expr::Int(-n),
                other => Expr::Neg(Box::new(other)),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Int(n)) => Ok(Expr::Int(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::LeftParen) => {
                let inner = self.expression()?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Some(Token::Identifier(first)) => {
                let (namespace, name) = if self.peek() == Some(&Token::Colon) {
                    self.next();
                    match self.next() {
                        Some(Token::Identifier(name)) => (Some(first), name),
                        _ => return Err(format!("Expected function name after '{}:'", first)),
                    }
                } else {
                    (None, first)
                };

                if self.peek() == Some(&Token::LeftParen) {
                    self.next();
                    let args = self.arguments()?;
                    Ok(Expr::Call {
                        namespace,
                        name,
                        args,
                    })
                } else if let Some(ns) = namespace {
                    Err(format!("Expected '(' after function {}:{}", ns, name))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(t) => Err(format!("Unexpected token {:?}", t)),
            None => Err("Unexpected end of expression".to_string()),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RightParen) {
            self.next();
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RightParen) => return Ok(args),
                Some(t) => return Err(format!("Expected ',' or ')' but found {:?}", t)),
                None => return Err("Unclosed argument list".to_string()),
            }
        }
    }
}

/// Parse one expression body
pub fn parse_expression(body: &str) -> Result<Expr, String> {
    let tokens = tokenize(body)?;
    if tokens.is_empty() {
        return Err("Empty expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    if let Some(extra) = parser.peek() {
        return Err(format!("Unexpected trailing token {:?}", extra));
    }
    Ok(expr)
}

/// A template split into literal text and expression bodies
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expression(String),
}

/// Split `text` into literals and `${...}` bodies.
///
/// Braces inside quoted strings do not close an expression.
pub fn split_template(text: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        literal.push_str(&rest[..start]);
        let body_start = start + 2;
        let mut quote: Option<char> = None;
        let mut end = None;
        let mut escaped = false;
        for (offset, ch) in rest[body_start..].char_indices() {
            match (quote, ch) {
                (Some(_), '\\') if !escaped => {
                    escaped = true;
                    continue;
                }
                (Some(q), c) if c == q && !escaped => quote = None,
                (None, '\'') | (None, '"') => quote = Some(ch),
                (None, '}') => {
                    end = Some(body_start + offset);
                    break;
                }
                _ => {}
            }
            escaped = false;
        }
        let end = end.ok_or_else(|| format!("Unterminated expression in '{}'", text))?;
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Expression(rest[body_start..end].to_string()));
        rest = &rest[end + 1..];
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. })),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_namespaced_call_and_variable() {
        let expr = parse_expression("coord:future(0, 10)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                namespace: Some("coord".into()),
                name: "future".into(),
                args: vec![Expr::Int(0), Expr::Int(10)],
            }
        );
        assert_eq!(
            parse_expression("nameNode").unwrap(),
            Expr::Variable("nameNode".into())
        );
        assert_eq!(parse_expression("-(3)").unwrap(), Expr::Int(-3));
        assert_eq!(
            parse_expression("-x").unwrap(),
            Expr::Neg(Box::new(Expr::Variable("x".into())))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_expression("").is_err());
        assert!(parse_expression("current(1").is_err());
        assert!(parse_expression("coord:days").is_err());
        assert!(parse_expression("1 2").is_err());
    }

    #[test]
    fn test_split_template() {
        let segments = split_template("hdfs://${host}/logs/${YEAR}").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("hdfs://".into()),
                Segment::Expression("host".into()),
                Segment::Literal("/logs/".into()),
                Segment::Expression("YEAR".into()),
            ]
        );
        let segments = split_template("${f('}')}").unwrap();
        assert_eq!(segments, vec![Segment::Expression("f('}')".into())]);
        assert!(split_template("${open").is_err());
        assert_eq!(
            split_template("plain $ text").unwrap(),
            vec![Segment::Literal("plain $ text".into())]
        );
    }
}
