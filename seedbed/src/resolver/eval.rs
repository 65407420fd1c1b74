//! The `$eval` expression language.
//!
//! A deliberately small, deterministic language evaluated against a
//! read-only snapshot of the enclosing document's already-resolved fields.
//! It supports literals (integers, floats, quoted strings, `true`,
//! `false`, `null`), dotted field references (`firstName`,
//! `address.city`, `items.0`), parentheses, unary minus, and the
//! arithmetic operators `+ - * / %` with the usual precedence. `+`
//! concatenates when either operand is a string.
//!
//! Two authoring habits from expression dialects that run with the
//! document as `this` are tolerated: a leading `this.` on a field
//! reference and a trailing `;`.
//!
//! Evaluation has no access to anything beyond the context document: no
//! module loading, no ambient process state, no mutation.

use crate::document::{Document, Value};
use crate::errors::{ErrorKind, SeedbedError, SeedbedResult};

/// Evaluates an expression against the given context document.
pub fn evaluate(source: &str, context: &Document) -> SeedbedResult<Value> {
    let trimmed = source.trim().trim_end_matches(';').trim_end();
    if trimmed.is_empty() {
        return Err(eval_error(source, "expression is empty"));
    }

    let tokens = tokenize(trimmed).map_err(|msg| eval_error(source, &msg))?;
    let mut parser = Parser {
        tokens,
        position: 0,
        context,
    };
    let value = parser.parse_expression().map_err(|msg| eval_error(source, &msg))?;
    parser.expect_end().map_err(|msg| eval_error(source, &msg))?;
    Ok(value)
}

fn eval_error(source: &str, message: &str) -> SeedbedError {
    log::error!("Cannot evaluate '{}': {}", source, message);
    SeedbedError::new(
        &format!("Cannot evaluate '{}': {}", source, message),
        ErrorKind::ResolutionError,
    )
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Integer(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Dot,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut literal = String::new();
                i += 1;
                loop {
                    if i >= chars.len() {
                        return Err("unterminated string literal".to_string());
                    }
                    let c = chars[i];
                    if c == quote {
                        i += 1;
                        break;
                    }
                    if c == '\\' && i + 1 < chars.len() {
                        let escaped = chars[i + 1];
                        match escaped {
                            'n' => literal.push('\n'),
                            't' => literal.push('\t'),
                            '\\' => literal.push('\\'),
                            '\'' => literal.push('\''),
                            '"' => literal.push('"'),
                            other => return Err(format!("unknown escape '\\{}'", other)),
                        }
                        i += 2;
                        continue;
                    }
                    literal.push(c);
                    i += 1;
                }
                tokens.push(Token::Str(literal));
            }
            '0'..='9' => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                // a fractional part only when a digit follows the dot,
                // so `items.0` stays a path segment
                if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                    is_float = true;
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    let parsed = text
                        .parse::<f64>()
                        .map_err(|_| format!("invalid number '{}'", text))?;
                    tokens.push(Token::Float(parsed));
                } else {
                    let parsed = text
                        .parse::<i64>()
                        .map_err(|_| format!("invalid number '{}'", text))?;
                    tokens.push(Token::Integer(parsed));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                match ident.as_str() {
                    "true" => tokens.push(Token::True),
                    "false" => tokens.push(Token::False),
                    "null" => tokens.push(Token::Null),
                    _ => tokens.push(Token::Ident(ident)),
                }
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    context: &'a Document,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expect_end(&self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(format!("unexpected trailing token {:?}", token)),
        }
    }

    fn parse_expression(&mut self) -> Result<Value, String> {
        let mut left = self.parse_term()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                Token::Plus => {
                    self.advance();
                    let right = self.parse_term()?;
                    left = add(&left, &right)?;
                }
                Token::Minus => {
                    self.advance();
                    let right = self.parse_term()?;
                    left = arithmetic(&left, &right, "-")?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Value, String> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                Token::Star => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = arithmetic(&left, &right, "*")?;
                }
                Token::Slash => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = arithmetic(&left, &right, "/")?;
                }
                Token::Percent => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = arithmetic(&left, &right, "%")?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Value, String> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            let value = self.parse_unary()?;
            return match value {
                Value::I64(v) => v
                    .checked_neg()
                    .map(Value::I64)
                    .ok_or_else(|| "integer overflow".to_string()),
                Value::U64(v) => i64::try_from(v)
                    .ok()
                    .and_then(i64::checked_neg)
                    .map(Value::I64)
                    .ok_or_else(|| "integer overflow".to_string()),
                Value::F64(v) => Ok(Value::F64(-v)),
                other => Err(format!("cannot negate {:?}", other)),
            };
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Value, String> {
        match self.advance() {
            Some(Token::Integer(v)) => Ok(Value::I64(v)),
            Some(Token::Float(v)) => Ok(Value::F64(v)),
            Some(Token::Str(v)) => Ok(Value::String(v)),
            Some(Token::True) => Ok(Value::Bool(true)),
            Some(Token::False) => Ok(Value::Bool(false)),
            Some(Token::Null) => Ok(Value::Null),
            Some(Token::LParen) => {
                let value = self.parse_expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("expected ')'".to_string()),
                }
            }
            Some(Token::Ident(first)) => {
                let path = self.parse_path(first)?;
                self.resolve_path(&path)
            }
            Some(other) => Err(format!("unexpected token {:?}", other)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn parse_path(&mut self, first: String) -> Result<Vec<String>, String> {
        let mut segments = vec![first];
        while matches!(self.peek(), Some(Token::Dot)) {
            self.advance();
            match self.advance() {
                Some(Token::Ident(segment)) => segments.push(segment),
                Some(Token::Integer(index)) if index >= 0 => segments.push(index.to_string()),
                _ => return Err("expected field name after '.'".to_string()),
            }
        }
        // tolerate `this.` as an explicit reference to the context document
        if segments.len() > 1 && segments[0] == "this" {
            segments.remove(0);
        }
        Ok(segments)
    }

    fn resolve_path(&self, segments: &[String]) -> Result<Value, String> {
        if segments.len() == 1 && segments[0] == "this" {
            return Ok(Value::Document(self.context.clone()));
        }

        let mut current = Value::Document(self.context.clone());
        for segment in segments {
            current = match current {
                Value::Document(doc) => match doc.get_field(segment) {
                    Some(value) => value.clone(),
                    None => {
                        return Err(format!(
                            "unknown field '{}' in context",
                            segments.join(".")
                        ))
                    }
                },
                Value::Array(items) => {
                    let index = segment
                        .parse::<usize>()
                        .map_err(|_| format!("invalid array index '{}'", segment))?;
                    items
                        .get(index)
                        .cloned()
                        .ok_or_else(|| format!("array index {} out of bound", index))?
                }
                _ => {
                    return Err(format!(
                        "field '{}' does not address a document or array",
                        segments.join(".")
                    ))
                }
            };
        }
        Ok(current)
    }
}

fn add(left: &Value, right: &Value) -> Result<Value, String> {
    // string concatenation when either side is a string
    if left.is_string() || right.is_string() {
        return Ok(Value::String(format!(
            "{}{}",
            stringify(left)?,
            stringify(right)?
        )));
    }
    arithmetic(left, right, "+")
}

fn stringify(value: &Value) -> Result<String, String> {
    match value {
        Value::String(v) => Ok(v.clone()),
        Value::I64(v) => Ok(v.to_string()),
        Value::U64(v) => Ok(v.to_string()),
        Value::F64(v) => Ok(v.to_string()),
        Value::Bool(v) => Ok(v.to_string()),
        Value::Null => Ok("null".to_string()),
        other => Err(format!("cannot concatenate {:?}", other)),
    }
}

fn arithmetic(left: &Value, right: &Value, op: &str) -> Result<Value, String> {
    if let (Some(a), Some(b)) = (int_operand(left), int_operand(right)) {
        let result = match op {
            "+" => a.checked_add(b),
            "-" => a.checked_sub(b),
            "*" => a.checked_mul(b),
            "/" => {
                if b == 0 {
                    return Err("division by zero".to_string());
                }
                a.checked_div(b)
            }
            "%" => {
                if b == 0 {
                    return Err("division by zero".to_string());
                }
                a.checked_rem(b)
            }
            _ => None,
        };
        return result
            .map(Value::I64)
            .ok_or_else(|| "integer overflow".to_string());
    }

    let a = float_operand(left).ok_or_else(|| format!("cannot apply '{}' to {:?}", op, left))?;
    let b = float_operand(right).ok_or_else(|| format!("cannot apply '{}' to {:?}", op, right))?;
    let result = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" => {
            if b == 0.0 {
                return Err("division by zero".to_string());
            }
            a / b
        }
        "%" => {
            if b == 0.0 {
                return Err("division by zero".to_string());
            }
            a % b
        }
        _ => return Err(format!("unknown operator '{}'", op)),
    };
    Ok(Value::F64(result))
}

fn int_operand(value: &Value) -> Option<i64> {
    match value {
        Value::I64(v) => Some(*v),
        Value::U64(v) => i64::try_from(*v).ok(),
        _ => None,
    }
}

fn float_operand(value: &Value) -> Option<f64> {
    value.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn context() -> Document {
        doc! {
            a: 1,
            firstName: "Axl",
            lastName: "Rose",
            score: 2.5,
            address: { city: "Lafayette", zip: 47901 },
            items: [10, 20, 30],
        }
    }

    #[test]
    fn test_literals() {
        let ctx = Document::new();
        assert_eq!(evaluate("42", &ctx).unwrap(), Value::I64(42));
        assert_eq!(evaluate("1.5", &ctx).unwrap(), Value::F64(1.5));
        assert_eq!(evaluate("'hi'", &ctx).unwrap(), Value::from("hi"));
        assert_eq!(evaluate("\"hi\"", &ctx).unwrap(), Value::from("hi"));
        assert_eq!(evaluate("true", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("null", &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn test_arithmetic() {
        let ctx = Document::new();
        assert_eq!(evaluate("1 + 2 * 3", &ctx).unwrap(), Value::I64(7));
        assert_eq!(evaluate("(1 + 2) * 3", &ctx).unwrap(), Value::I64(9));
        assert_eq!(evaluate("10 - 4 - 3", &ctx).unwrap(), Value::I64(3));
        assert_eq!(evaluate("7 / 2", &ctx).unwrap(), Value::I64(3));
        assert_eq!(evaluate("7 % 2", &ctx).unwrap(), Value::I64(1));
        assert_eq!(evaluate("-5 + 2", &ctx).unwrap(), Value::I64(-3));
        assert_eq!(evaluate("1.5 * 2", &ctx).unwrap(), Value::F64(3.0));
    }

    #[test]
    fn test_field_reference() {
        let ctx = context();
        assert_eq!(evaluate("a", &ctx).unwrap(), Value::I64(1));
        assert_eq!(evaluate("a + 1", &ctx).unwrap(), Value::I64(2));
    }

    #[test]
    fn test_nested_field_reference() {
        let ctx = context();
        assert_eq!(
            evaluate("address.city", &ctx).unwrap(),
            Value::from("Lafayette")
        );
        assert_eq!(evaluate("address.zip + 1", &ctx).unwrap(), Value::I64(47902));
        assert_eq!(evaluate("items.1", &ctx).unwrap(), Value::I64(20));
    }

    #[test]
    fn test_string_concatenation() {
        let ctx = context();
        assert_eq!(
            evaluate("firstName + ' ' + lastName", &ctx).unwrap(),
            Value::from("Axl Rose")
        );
        assert_eq!(evaluate("'n=' + a", &ctx).unwrap(), Value::from("n=1"));
    }

    #[test]
    fn test_this_prefix_and_trailing_semicolon() {
        let ctx = context();
        assert_eq!(evaluate("this.a;", &ctx).unwrap(), Value::I64(1));
        assert_eq!(
            evaluate("this.firstName + ' ' + this.lastName", &ctx).unwrap(),
            Value::from("Axl Rose")
        );
    }

    #[test]
    fn test_unknown_field_is_error() {
        let ctx = context();
        let err = evaluate("missing + 1", &ctx).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ResolutionError);
        assert!(err.message().contains("unknown field"));
    }

    #[test]
    fn test_division_by_zero_is_error() {
        let ctx = Document::new();
        assert!(evaluate("1 / 0", &ctx).is_err());
        assert!(evaluate("1 % 0", &ctx).is_err());
    }

    #[test]
    fn test_malformed_expressions() {
        let ctx = Document::new();
        assert!(evaluate("", &ctx).is_err());
        assert!(evaluate("1 +", &ctx).is_err());
        assert!(evaluate("(1 + 2", &ctx).is_err());
        assert!(evaluate("'unterminated", &ctx).is_err());
        assert!(evaluate("1 ~ 2", &ctx).is_err());
        assert!(evaluate("1 2", &ctx).is_err());
    }

    #[test]
    fn test_type_errors() {
        let ctx = context();
        assert!(evaluate("address * 2", &ctx).is_err());
        assert!(evaluate("-'text'", &ctx).is_err());
    }

    #[test]
    fn test_float_and_int_mix() {
        let ctx = context();
        assert_eq!(evaluate("score + 1", &ctx).unwrap(), Value::F64(3.5));
        assert_eq!(evaluate("score * 2", &ctx).unwrap(), Value::F64(5.0));
    }

    #[test]
    fn test_evaluation_does_not_mutate_context() {
        let ctx = context();
        let before = ctx.clone();
        let _ = evaluate("a + 1", &ctx).unwrap();
        assert_eq!(ctx, before);
    }
}
