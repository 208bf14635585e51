//! Identifier and whitespace handling for T-SQL definition text.
//!
//! # Examples
//!
//! ```ignore
//! use crate::parser::identifier_utils::*;
//!
//! assert_eq!(normalize_identifier("[MyTable]"), "MyTable");
//! assert_eq!(quote_name("dbo", "MyTable"), "[dbo].[MyTable]");
//! assert_eq!(normalize_whitespace("DECIMAL( 10 , 2 )"), "DECIMAL(10,2)");
//! ```

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use sqlparser::tokenizer::Token;

/// Strips brackets `[]` and double quotes `""` from an identifier.
pub fn normalize_identifier(ident: &str) -> String {
    ident
        .trim()
        .trim_matches(|c| c == '[' || c == ']' || c == '"')
        .to_string()
}

/// Wraps an identifier in brackets, escaping embedded `]`.
pub fn bracket(ident: &str) -> String {
    format!("[{}]", normalize_identifier(ident).replace(']', "]]"))
}

/// `[schema].[name]`
pub fn quote_name(schema: &str, name: &str) -> String {
    format!("{}.{}", bracket(schema), bracket(name))
}

/// `[schema].[table].[name]`, the shape `sp_rename` expects for columns and indexes.
pub fn quote_table_child(schema: &str, table: &str, name: &str) -> String {
    format!("{}.{}.{}", bracket(schema), bracket(table), bracket(name))
}

/// Escape a value for embedding in an `N'...'` literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Converts a sqlparser-rs Token back to SQL text.
///
/// Quoted identifiers keep their delimiters and string literals are
/// re-escaped, so the output can be re-parsed or executed.
pub fn format_token_sql(token: &Token) -> String {
    match token {
        Token::Word(w) => match w.quote_style {
            Some('[') => format!("[{}]", w.value.replace(']', "]]")),
            Some('"') => format!("\"{}\"", w.value),
            _ => w.value.clone(),
        },
        Token::Number(n, _) => n.clone(),
        Token::SingleQuotedString(s) => format!("'{}'", escape_literal(s)),
        Token::NationalStringLiteral(s) => format!("N'{}'", escape_literal(s)),
        Token::DoubleQuotedString(s) => format!("\"{}\"", s),
        Token::HexStringLiteral(s) => format!("0x{}", s),
        Token::Whitespace(ws) => ws.to_string(),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::Comma => ",".to_string(),
        Token::Period => ".".to_string(),
        Token::SemiColon => ";".to_string(),
        Token::Colon => ":".to_string(),
        Token::DoubleColon => "::".to_string(),
        Token::Plus => "+".to_string(),
        Token::Minus => "-".to_string(),
        Token::Mul => "*".to_string(),
        Token::Div => "/".to_string(),
        Token::Mod => "%".to_string(),
        Token::Eq => "=".to_string(),
        Token::Neq => "<>".to_string(),
        Token::Lt => "<".to_string(),
        Token::Gt => ">".to_string(),
        Token::LtEq => "<=".to_string(),
        Token::GtEq => ">=".to_string(),
        Token::AtSign => "@".to_string(),
        Token::Sharp => "#".to_string(),
        Token::Ampersand => "&".to_string(),
        Token::Pipe => "|".to_string(),
        Token::Caret => "^".to_string(),
        Token::Tilde => "~".to_string(),
        Token::ExclamationMark => "!".to_string(),
        Token::LBracket => "[".to_string(),
        Token::RBracket => "]".to_string(),
        Token::LBrace => "{".to_string(),
        Token::RBrace => "}".to_string(),
        _ => format!("{}", token),
    }
}

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static PUNCT_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*([(),])\s*").expect("valid regex"));

/// Canonical form for structural comparison of definition fragments.
///
/// Runs of whitespace collapse to one space, the ends are trimmed, spaces
/// directly around `(`, `)` and `,` are removed and a trailing `;` is dropped.
/// Case is preserved.
pub fn normalize_whitespace(definition: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(definition.trim(), " ");
    let tightened = PUNCT_SPACE_RE.replace_all(&collapsed, "$1");
    tightened.trim().trim_end_matches(';').trim_end().to_string()
}

/// Replace every occurrence of identifier `from` with `to` inside `definition`.
///
/// Matches `[from]` and bare `from` on word boundaries, case-insensitively.
/// Bracketed occurrences stay bracketed.
pub fn replace_identifier(definition: &str, from: &str, to: &str) -> String {
    let from = normalize_identifier(from);
    let to = normalize_identifier(to);
    if from.is_empty() {
        return definition.to_string();
    }

    let bracketed = Regex::new(&format!(r"(?i)\[{}\]", regex::escape(&from)));
    let bare = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&from)));
    let (Ok(bracketed), Ok(bare)) = (bracketed, bare) else {
        return definition.to_string();
    };

    let replaced = bracketed.replace_all(definition, NoExpand(&format!("[{}]", to)));
    bare.replace_all(&replaced, NoExpand(&to)).into_owned()
}
