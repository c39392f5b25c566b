//! Boolean expressions over a property value, bound to `$`.
//!
//! ```text
//! or      = and ("||" and)*
//! and     = compare ("&&" compare)*
//! compare = sum (("==" | "!=" | "<" | "<=" | ">" | ">=") sum)?
//! sum     = product (("+" | "-") product)*
//! product = unary (("*" | "/" | "%") unary)*
//! unary   = ("!" | "-") unary | atom
//! atom    = number | string | "true" | "false" | "$" | "(" or ")"
//! ```

use std::fmt;

use crate::errors::Error;

/// Evaluates `expr` with `$` set to `value`; the result must be a boolean
pub(crate) fn evaluate(expr: &str, value: &str) -> Result<bool, Error> {
    let fail = |reason: String| Error::Expression {
        expr: expr.to_string(),
        reason,
    };

    let tokens = tokenize(expr).map_err(fail)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        dollar: Value::from_property(value),
    };
    let result = parser.or().map_err(fail)?;
    if let Some(token) = parser.tokens.get(parser.pos) {
        return Err(fail(format!("unexpected {token}")));
    }

    match result {
        Value::Bool(result) => Ok(result),
        other => Err(fail(format!("evaluates to {other}, not a boolean"))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    fn from_property(value: &str) -> Value {
        let trimmed = value.trim();
        if let Ok(num) = trimmed.parse::<f64>() {
            return Value::Num(num);
        }
        match trimmed {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Str(value.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(num) => write!(f, "number {num}"),
            Value::Str(s) => write!(f, "string {s:?}"),
            Value::Bool(b) => write!(f, "boolean {b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Str(String),
    Bool(bool),
    Dollar,
    Op(&'static str),
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(num) => write!(f, "'{num}'"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Bool(b) => write!(f, "'{b}'"),
            Token::Dollar => f.write_str("'$'"),
            Token::Op(op) => write!(f, "'{op}'"),
            Token::Open => f.write_str("'('"),
            Token::Close => f.write_str("')'"),
        }
    }
}

const OPERATORS: [&str; 16] = [
    "==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/", "%", "!", "(", ")",
];

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = expr.trim_start();

    while let Some(c) = rest.chars().next() {
        if c == '$' {
            tokens.push(Token::Dollar);
            rest = &rest[1..];
        } else if c == '"' || c == '\'' {
            let end = rest[1..]
                .find(c)
                .ok_or_else(|| "unterminated string".to_string())?;
            tokens.push(Token::Str(rest[1..=end].to_string()));
            rest = &rest[end + 2..];
        } else if c.is_ascii_digit() || c == '.' {
            let end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            let num = rest[..end]
                .parse()
                .map_err(|_| format!("invalid number '{}'", &rest[..end]))?;
            tokens.push(Token::Num(num));
            rest = &rest[end..];
        } else if c.is_ascii_alphabetic() {
            let end = rest
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(rest.len());
            match &rest[..end] {
                "true" => tokens.push(Token::Bool(true)),
                "false" => tokens.push(Token::Bool(false)),
                word => return Err(format!("unknown identifier '{word}'")),
            }
            rest = &rest[end..];
        } else {
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .ok_or_else(|| format!("unexpected character '{c}'"))?;
            tokens.push(match *op {
                "(" => Token::Open,
                ")" => Token::Close,
                op => Token::Op(op),
            });
            rest = &rest[op.len()..];
        }
        rest = rest.trim_start();
    }

    Ok(tokens)
}

const MAX_DEPTH: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Open parentheses and unary operators around the current position
    depth: usize,
    dollar: Value,
}

impl Parser {
    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Value, String>,
    ) -> Result<Value, String> {
        if self.depth >= MAX_DEPTH {
            return Err(format!("nested deeper than {MAX_DEPTH} levels"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek_op(&self, ops: &[&'static str]) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) if ops.contains(op) => Some(*op),
            _ => None,
        }
    }

    fn or(&mut self) -> Result<Value, String> {
        let mut left = self.and()?;
        while self.peek_op(&["||"]).is_some() {
            self.pos += 1;
            let right = self.and()?;
            left = Value::Bool(as_bool(&left)? || as_bool(&right)?);
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Value, String> {
        let mut left = self.compare()?;
        while self.peek_op(&["&&"]).is_some() {
            self.pos += 1;
            let right = self.compare()?;
            left = Value::Bool(as_bool(&left)? && as_bool(&right)?);
        }
        Ok(left)
    }

    fn compare(&mut self) -> Result<Value, String> {
        let left = self.sum()?;
        let Some(op) = self.peek_op(&["==", "!=", "<", "<=", ">", ">="]) else {
            return Ok(left);
        };
        self.pos += 1;
        let right = self.sum()?;

        let result = match (op, &left, &right) {
            ("==", _, _) => left == right,
            ("!=", _, _) => left != right,
            (_, Value::Num(l), Value::Num(r)) => ordered(op, l.partial_cmp(r)),
            (_, Value::Str(l), Value::Str(r)) => ordered(op, Some(l.cmp(r))),
            _ => return Err(format!("can't compare {left} {op} {right}")),
        };
        Ok(Value::Bool(result))
    }

    fn sum(&mut self) -> Result<Value, String> {
        let mut left = self.product()?;
        while let Some(op) = self.peek_op(&["+", "-"]) {
            self.pos += 1;
            let right = self.product()?;
            left = match (op, left, right) {
                ("+", Value::Num(l), Value::Num(r)) => Value::Num(l + r),
                ("+", Value::Str(l), Value::Str(r)) => Value::Str(l + &r),
                ("-", Value::Num(l), Value::Num(r)) => Value::Num(l - r),
                (op, l, r) => return Err(format!("can't apply {op} to {l} and {r}")),
            };
        }
        Ok(left)
    }

    fn product(&mut self) -> Result<Value, String> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek_op(&["*", "/", "%"]) {
            self.pos += 1;
            let right = self.unary()?;
            left = match (left, right) {
                (Value::Num(l), Value::Num(r)) => Value::Num(match op {
                    "*" => l * r,
                    "/" => l / r,
                    _ => l % r,
                }),
                (l, r) => return Err(format!("can't apply {op} to {l} and {r}")),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Value, String> {
        match self.peek_op(&["!", "-"]) {
            Some("!") => {
                self.pos += 1;
                let value = self.nested(Self::unary)?;
                Ok(Value::Bool(!as_bool(&value)?))
            }
            Some(_) => {
                self.pos += 1;
                match self.nested(Self::unary)? {
                    Value::Num(num) => Ok(Value::Num(-num)),
                    other => Err(format!("can't negate {other}")),
                }
            }
            None => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Value, String> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "unexpected end".to_string())?;
        self.pos += 1;

        match token {
            Token::Num(num) => Ok(Value::Num(num)),
            Token::Str(s) => Ok(Value::Str(s)),
            Token::Bool(b) => Ok(Value::Bool(b)),
            Token::Dollar => Ok(self.dollar.clone()),
            Token::Open => {
                let value = self.nested(Self::or)?;
                match self.tokens.get(self.pos) {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    _ => Err("missing ')'".to_string()),
                }
            }
            other => Err(format!("unexpected {other}")),
        }
    }
}

fn as_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(format!("expected a boolean, found {other}")),
    }
}

fn ordered(op: &str, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match (op, ordering) {
        ("<", Some(Less)) => true,
        ("<=", Some(Less | Equal)) => true,
        (">", Some(Greater)) => true,
        (">=", Some(Greater | Equal)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_numbers() {
        assert!(evaluate("$ > 3", "4").unwrap());
        assert!(!evaluate("$ > 3", "3").unwrap());
        assert!(evaluate("$ >= 3 && $ < 10", "3").unwrap());
        assert!(evaluate("$ % 2 == 0", "8").unwrap());
        assert!(evaluate("-$ + 1 == -4", "5").unwrap());
        assert!(evaluate("($ + 1) * 2 == 12", "5").unwrap());
    }

    #[test]
    fn compares_strings_and_booleans() {
        assert!(evaluate("$ == 'fast'", "fast").unwrap());
        assert!(evaluate("$ != \"slow\" || false", "fast").unwrap());
        assert!(evaluate("$ + '-mode' == 'fast-mode'", "fast").unwrap());
        assert!(evaluate("!$", "false").unwrap());
        assert!(evaluate("$ < 'b'", "a").unwrap());
    }

    #[test]
    fn rejects_bad_expressions() {
        for (expr, value) in [
            ("$ + 1", "1"),
            ("$ > ", "1"),
            ("$ > 'a'", "1"),
            ("($ > 1", "2"),
            ("$ > 1 2", "2"),
            ("'open", "2"),
            ("value == 1", "1"),
            ("$ && true", "3"),
        ] {
            let err = evaluate(expr, value).unwrap_err();
            assert!(matches!(err, Error::Expression { .. }), "{expr}: {err}");
        }
    }

    #[test]
    fn limits_nesting() {
        assert!(evaluate(&format!("{}$", "!".repeat(64)), "true").unwrap());

        let bangs = format!("{}$", "!".repeat(10_000));
        let parens = format!("{}$ > 1{}", "(".repeat(10_000), ")".repeat(10_000));
        for expr in [bangs, parens] {
            let err = evaluate(&expr, "2").unwrap_err();
            assert!(matches!(err, Error::Expression { .. }));
        }
    }
}
