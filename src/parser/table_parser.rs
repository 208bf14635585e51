//! `CREATE TABLE` body extraction.
//!
//! The column list is found by scanning the body character by character,
//! tracking parenthesis depth, string literals, bracketed identifiers and
//! comments, and splitting on top-level commas. `DECIMAL(10,2)` stays in one
//! piece; a comma inside `'a,b'` or `[odd,name]` does not split.
//!
//! The scan sits behind [`DefinitionExtractor`] so a full T-SQL parser can
//! replace it without touching change detection, ordering or generation.

use once_cell::sync::Lazy;
use regex::Regex;

use super::identifier_utils::normalize_identifier;

/// One column item of a table body, e.g. `[Price] DECIMAL(10,2) NOT NULL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnItem {
    /// Column name without brackets
    pub name: String,
    /// Full item text with comments removed, name included
    pub definition: String,
}

/// A named table-level constraint item, e.g. `CONSTRAINT [PK_T] PRIMARY KEY ([Id])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConstraintItem {
    pub name: String,
    pub definition: String,
}

/// The parts of a `CREATE TABLE` statement change detection cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnItem>,
    pub constraints: Vec<TableConstraintItem>,
}

/// Extracts structure from raw `CREATE TABLE` text.
pub trait DefinitionExtractor {
    /// Returns `None` when the text is not a parseable `CREATE TABLE`.
    fn extract_table(&self, sql: &str) -> Option<TableDefinition>;
}

/// Bracket/parenthesis scanning extractor (no full SQL grammar).
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanningExtractor;

impl DefinitionExtractor for ScanningExtractor {
    fn extract_table(&self, sql: &str) -> Option<TableDefinition> {
        parse_create_table(sql)
    }
}

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)\bCREATE\s+TABLE\s+((?:\[[^\]]+\]|"[^"]+"|[\w@#$]+)(?:\s*\.\s*(?:\[[^\]]+\]|"[^"]+"|[\w@#$]+))*)\s*\("#,
    )
    .expect("valid regex")
});

/// Table-level items that are not columns.
const TABLE_ITEM_KEYWORDS: &[&str] = &[
    "CONSTRAINT",
    "PRIMARY",
    "UNIQUE",
    "FOREIGN",
    "CHECK",
    "INDEX",
    "PERIOD",
];

/// Parse a `CREATE TABLE` statement into its column and named constraint items.
pub fn parse_create_table(sql: &str) -> Option<TableDefinition> {
    let stripped = strip_comments(sql);
    let caps = CREATE_TABLE_RE.captures(&stripped)?;
    let qualified = caps.get(1)?.as_str();
    let open_paren = caps.get(0)?.end() - 1;

    let mut parts: Vec<String> = split_qualified(qualified);
    let name = parts.pop()?;
    let schema = parts.pop().unwrap_or_else(|| "dbo".to_string());

    let items = split_top_level(&stripped[open_paren..])?;

    let mut columns = Vec::new();
    let mut constraints = Vec::new();
    for item in items {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (first, rest) = leading_identifier(item)?;
        if first.bracketed || !is_table_item_keyword(&first.value) {
            columns.push(ColumnItem {
                name: first.value,
                definition: item.to_string(),
            });
        } else if first.value.eq_ignore_ascii_case("CONSTRAINT") {
            if let Some((constraint_name, _)) = leading_identifier(rest.trim_start()) {
                constraints.push(TableConstraintItem {
                    name: constraint_name.value,
                    definition: item.to_string(),
                });
            }
        }
    }

    Some(TableDefinition {
        schema,
        name,
        columns,
        constraints,
    })
}

fn is_table_item_keyword(word: &str) -> bool {
    TABLE_ITEM_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(word))
}

fn split_qualified(qualified: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = qualified.trim();
    while let Some((ident, remainder)) = leading_identifier(rest) {
        parts.push(ident.value);
        let remainder = remainder.trim_start();
        match remainder.strip_prefix('.') {
            Some(after_dot) => rest = after_dot.trim_start(),
            None => break,
        }
    }
    parts
}

struct LeadingIdentifier {
    value: String,
    bracketed: bool,
}

/// Read the identifier at the start of `text`, returning it and the remaining text.
fn leading_identifier(text: &str) -> Option<(LeadingIdentifier, &str)> {
    let mut chars = text.char_indices();
    let (_, first) = chars.next()?;
    match first {
        '[' | '"' => {
            let close = if first == '[' { ']' } else { '"' };
            let mut value = String::new();
            let mut iter = text[1..].char_indices().peekable();
            while let Some((idx, c)) = iter.next() {
                if c == close {
                    // Doubled delimiter is an escaped delimiter
                    if iter.peek().map(|(_, n)| *n) == Some(close) {
                        value.push(c);
                        iter.next();
                        continue;
                    }
                    return Some((
                        LeadingIdentifier {
                            value,
                            bracketed: true,
                        },
                        &text[1 + idx + c.len_utf8()..],
                    ));
                }
                value.push(c);
            }
            None
        }
        c if is_identifier_char(c) => {
            let end = text
                .char_indices()
                .find(|(_, c)| !is_identifier_char(*c))
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            Some((
                LeadingIdentifier {
                    value: text[..end].to_string(),
                    bracketed: false,
                },
                &text[end..],
            ))
        }
        _ => None,
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$')
}

/// Split a parenthesized list on top-level commas.
///
/// `text` must start at the opening parenthesis. Returns `None` when the
/// closing parenthesis is never found.
pub fn split_top_level(text: &str) -> Option<Vec<String>> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                current.push(c);
                copy_until_quote(&mut chars, &mut current, '\'');
            }
            '[' => {
                current.push(c);
                copy_until_quote(&mut chars, &mut current, ']');
            }
            '"' => {
                current.push(c);
                copy_until_quote(&mut chars, &mut current, '"');
            }
            '(' => {
                depth += 1;
                if depth > 1 {
                    current.push(c);
                }
            }
            ')' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
                if depth == 0 {
                    items.push(current.trim().to_string());
                    return Some(items);
                }
                current.push(c);
            }
            ',' if depth == 1 => {
                items.push(current.trim().to_string());
                current.clear();
            }
            _ => {
                if depth >= 1 {
                    current.push(c);
                }
            }
        }
    }

    None
}

/// Copy characters up to and including the closing delimiter. Doubled
/// delimiters (`''`, `]]`) are escapes and do not close.
fn copy_until_quote(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    out: &mut String,
    close: char,
) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == close {
            if chars.peek() == Some(&close) {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
                continue;
            }
            return;
        }
    }
}

/// Remove `--` and `/* */` comments, leaving string literals and bracketed
/// identifiers untouched. Block comments become a single space.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '[' | '"' => {
                out.push(c);
                let close = if c == '[' { ']' } else { c };
                copy_until_quote(&mut chars, &mut out, close);
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut depth = 1;
                while let Some(next) = chars.next() {
                    if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    } else if next == '/' && chars.peek() == Some(&'*') {
                        chars.next();
                        depth += 1;
                    }
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Column names of a table definition, bracket-free, for quick lookups.
pub fn column_names(definition: &TableDefinition) -> Vec<String> {
    definition
        .columns
        .iter()
        .map(|c| normalize_identifier(&c.name))
        .collect()
}
