//! AppleScript request construction.
//!
//! Identifiers (workbook, sheet and address names) go through [`quote`];
//! cell values go through [`literal`]. Nothing is interpolated raw.

use super::literal::DATE_FORMAT;
use crate::engine::{Address, Value};
use chrono::NaiveDateTime;

/// Handlers appended to every request, callable from the body as `my name(...)`.
pub const HELPERS: &str = r#"
on index_of(theItem, theList)
	repeat with i from 1 to count of theList
		if item i of theList is theItem then return i
	end repeat
	return 0
end index_of

on join_list(theList, theDelimiter)
	set oldDelimiters to AppleScript's text item delimiters
	set AppleScript's text item delimiters to theDelimiter
	set theString to theList as string
	set AppleScript's text item delimiters to oldDelimiters
	return theString
end join_list

on flatten(theList)
	if class of theList is not list then return {theList}
	set flat to {}
	repeat with anItem in theList
		set flat to flat & flatten(contents of anItem)
	end repeat
	return flat
end flatten
"#;

/// Double-quoted AppleScript string with `\` and `"` escaped.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Encode a value as an AppleScript literal expression.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "missing value".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) if !n.is_finite() => "missing value".to_string(),
        Value::Number(n) => format!("{}", n),
        Value::Text(s) => quote(s),
        Value::Date(d) => date_literal(d),
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(literal).collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

pub fn date_literal(date: &NaiveDateTime) -> String {
    format!("date {}", quote(&date.format(DATE_FORMAT).to_string()))
}

/// Accumulates body statements and wraps them in the request envelope.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    lines: Vec<String>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, statement: impl Into<String>) -> &mut Self {
        self.lines.push(statement.into());
        self
    }

    /// `set <var> to range "<addr>" of worksheet "<sheet>" of workbook "<wb>"`.
    pub fn bind_range(&mut self, var: &str, workbook: &str, sheet: &str, address: &Address) -> &mut Self {
        let stmt = format!(
            "set {} to range {} of {}",
            var,
            quote(&address.to_string()),
            sheet_ref(workbook, sheet)
        );
        self.line(stmt)
    }

    pub fn body(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// `worksheet "<sheet>" of workbook "<wb>"`.
pub fn sheet_ref(workbook: &str, sheet: &str) -> String {
    format!("worksheet {} of workbook {}", quote(sheet), quote(workbook))
}

/// Wrap a body in `tell application ... end tell` followed by [`HELPERS`].
pub fn envelope(application: &str, body: &str) -> String {
    format!(
        "tell application {}\n{}\nend tell\n{}",
        quote(application),
        body,
        HELPERS
    )
}
