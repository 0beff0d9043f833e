//! Parser for the literal text AppleScript prints for a result (`osascript -s s`).
//!
//! Grammar:
//!
//! ```text
//! value  := list | string | date | number | bool | null
//! list   := "{" [ value ( "," value )* ] "}"
//! string := '"' ( char | '\"' | '\\' )* '"'
//! date   := 'date "' weekday ", " day " " month " " year " at " hh:mm:ss '"'
//! null   := "missing value"
//! bool   := "true" | "false"
//! ```

use crate::engine::Value;
use chrono::NaiveDateTime;
use thiserror::Error;

/// `strftime` pattern of the date literal body, e.g. `Monday, 05 January 2015 at 09:00:00`.
pub const DATE_FORMAT: &str = "%A, %d %B %Y at %H:%M:%S";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LiteralError {
    #[error("Unexpected end of input, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("Unexpected character '{found}' at offset {position}")]
    UnexpectedChar { found: char, position: usize },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Invalid date literal '{0}'")]
    InvalidDate(String),

    #[error("Trailing input at offset {0}")]
    TrailingInput(usize),
}

/// Parse one complete response literal.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser { src: input, pos: 0 };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(LiteralError::TrailingInput(parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, keyword: &str) -> bool {
        if self.rest().starts_with(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> LiteralError {
        match self.peek() {
            Some(found) => LiteralError::UnexpectedChar {
                found,
                position: self.pos,
            },
            None => LiteralError::UnexpectedEnd("a value"),
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_ws();
        match self.peek() {
            None => Err(LiteralError::UnexpectedEnd("a value")),
            Some('{') => self.list(),
            Some('"') => self.string().map(Value::Text),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(_) => {
                if self.eat("missing value") {
                    Ok(Value::Null)
                } else if self.eat("true") {
                    Ok(Value::Bool(true))
                } else if self.eat("false") {
                    Ok(Value::Bool(false))
                } else if self.eat("date ") {
                    self.date()
                } else {
                    Err(self.unexpected())
                }
            }
        }
    }

    fn list(&mut self) -> Result<Value, LiteralError> {
        self.bump();
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Value::List(items));
        }
        loop {
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::List(items)),
                Some(found) => {
                    return Err(LiteralError::UnexpectedChar {
                        found,
                        position: self.pos - found.len_utf8(),
                    });
                }
                None => return Err(LiteralError::UnexpectedEnd("',' or '}'")),
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(LiteralError::UnexpectedEnd("closing '\"'")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err(LiteralError::UnexpectedEnd("escaped character")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            self.bump();
        }
        let token = &self.src[start..self.pos];
        token
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| LiteralError::InvalidNumber(token.to_string()))
    }

    fn date(&mut self) -> Result<Value, LiteralError> {
        self.skip_ws();
        if self.peek() != Some('"') {
            return Err(self.unexpected());
        }
        let body = self.string()?;
        NaiveDateTime::parse_from_str(&body, DATE_FORMAT)
            .map(Value::Date)
            .map_err(|_| LiteralError::InvalidDate(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_mixed_list() {
        let v = parse_literal(r#"{"x", 3, date "Monday, 05 January 2015 at 09:00:00", missing value}"#)
            .unwrap();
        let expected_date = NaiveDate::from_ymd_opt(2015, 1, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Text("x".into()),
                Value::Number(3.0),
                Value::Date(expected_date),
                Value::Null,
            ])
        );
    }

    #[test]
    fn test_nested_lists_and_scalars() {
        let v = parse_literal("{{1, 2.5}, {true, false}, {}}").unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::List(vec![Value::Number(1.0), Value::Number(2.5)]),
                Value::List(vec![Value::Bool(true), Value::Bool(false)]),
                Value::List(vec![]),
            ])
        );
    }

    #[test]
    fn test_escaped_quotes_and_backslashes() {
        let v = parse_literal(r#""say \"hi\" \\ now""#).unwrap();
        assert_eq!(v, Value::Text(r#"say "hi" \ now"#.into()));
    }

    #[test]
    fn test_exponent_and_negative_numbers() {
        assert_eq!(parse_literal("1.0E+5").unwrap(), Value::Number(100000.0));
        assert_eq!(parse_literal("-2").unwrap(), Value::Number(-2.0));
    }

    #[test]
    fn test_bare_missing_value() {
        assert_eq!(parse_literal("missing value\n").unwrap(), Value::Null);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(parse_literal("{1, 2"), Err(LiteralError::UnexpectedEnd(_))));
        assert!(matches!(parse_literal("\"open"), Err(LiteralError::UnexpectedEnd(_))));
        assert!(matches!(parse_literal("1 2"), Err(LiteralError::TrailingInput(2))));
        assert!(matches!(parse_literal("nothing"), Err(LiteralError::UnexpectedChar { .. })));
        assert!(matches!(parse_literal("1.2.3"), Err(LiteralError::InvalidNumber(_))));
        assert!(matches!(
            parse_literal(r#"date "05/01/2015 09:00""#),
            Err(LiteralError::InvalidDate(_))
        ));
        assert!(matches!(parse_literal(""), Err(LiteralError::UnexpectedEnd(_))));
    }
}
