//! Line-oriented CSV reader for catalog uploads.
//!
//! Deliberately small: comma-separated fields, double-quoted fields may
//! contain commas, a doubled quote inside a quoted field is a literal
//! quote. Malformed quoting is handled best-effort and never errors.

use std::collections::HashMap;

/// A parsed data row: normalized header name -> raw field value.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    /// Raw value for a column, empty string when the column is missing.
    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    /// First non-empty value among aliased column names.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .map(|k| self.get(k))
            .find(|v| !v.is_empty())
    }
}

/// A parsed document: normalized header plus one `RawRow` per data line.
#[derive(Debug)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl ParsedCsv {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

/// Split one line into trimmed fields, honoring double-quoted fields and
/// doubled-quote escapes.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => {
                    fields.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            }
        }
    }
    // An unterminated quote just ends the field; best-effort extraction.
    fields.push(current.trim().to_string());
    fields
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Parse a whole document. Returns `None` when there are fewer than two
/// non-blank lines (no header plus at least one data row); the caller
/// decides how to reject that.
pub fn parse_document(content: &str) -> Option<ParsedCsv> {
    let lines: Vec<&str> = content
        .split(['\n'])
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.len() < 2 {
        return None;
    }

    let headers: Vec<String> = parse_line(lines[0])
        .iter()
        .map(|h| normalize_header(h))
        .collect();

    let rows = lines[1..]
        .iter()
        .map(|line| {
            let values = parse_line(line);
            let mut fields = HashMap::with_capacity(headers.len());
            for (i, header) in headers.iter().enumerate() {
                // Missing trailing fields default to empty.
                let value = values.get(i).cloned().unwrap_or_default();
                fields.insert(header.clone(), value);
            }
            RawRow::new(fields)
        })
        .collect();

    Some(ParsedCsv { headers, rows })
}
