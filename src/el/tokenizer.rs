//! Lexical analysis for `${...}` expression bodies

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Str(String),
    Identifier(String),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    Colon,
    Comma,
    LeftParen,
    RightParen,
}

/// Parse a quoted string literal; the opening quote is already consumed.
/// A backslash escapes the next character.
fn parse_string(quote: char, chars: &mut Peekable<Chars>) -> Result<String, String> {
    let mut string = String::new();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped) => string.push(escaped),
                None => break,
            },
            c if c == quote => return Ok(string),
            c => string.push(c),
        }
    }
    Err(format!("Unterminated string literal starting with {}", quote))
}

fn parse_number(chars: &mut Peekable<Chars>) -> Result<i64, String> {
    let mut digits = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            chars.next();
        } else {
            break;
        }
    }
    digits
        .parse::<i64>()
        .map_err(|e| format!("Invalid integer literal '{}': {}", digits, e))
}

fn parse_identifier(chars: &mut Peekable<Chars>) -> String {
    let mut ident = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_alphanumeric() || ch == '_' || ch == '.' {
            ident.push(ch);
            chars.next();
        } else {
            break;
        }
    }
    ident
}

/// Tokenize an expression body (the text between `${` and `}`)
pub fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '\'' | '"' => {
                chars.next();
                tokens.push(Token::Str(parse_string(ch, &mut chars)?));
            }
            c if c.is_ascii_digit() => tokens.push(Token::Int(parse_number(&mut chars)?)),
            c if c.is_alphabetic() || c == '_' => {
                tokens.push(Token::Identifier(parse_identifier(&mut chars)));
            }
            _ => {
                chars.next();
                let token = match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    ':' => Token::Colon,
                    ',' => Token::Comma,
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    other => return Err(format!("Unexpected character '{}'", other)),
                };
                tokens.push(token);
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_function_call() {
        let tokens = tokenize("coord:current(-1)").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("coord".into()),
                Token::Colon,
                Token::Identifier("current".into()),
                Token::LeftParen,
                Token::Minus,
                Token::Int(1),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_strings_and_dotted_names() {
        let tokens = tokenize("coord:dataIn('in\\'put') + name.node").unwrap();
        assert!(tokens.contains(&Token::Str("in'put".into())));
        assert!(tokens.contains(&Token::Identifier("name.node".into())));
        assert!(tokenize("'open").is_err());
        assert!(tokenize("a # b").is_err());
    }
}
