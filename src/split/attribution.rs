//! Batch attribution: which object does a `GO` batch work on?
//!
//! A batch is attributed by the first recognized DDL statement it holds:
//!
//! ```text
//! CREATE [OR ALTER] TABLE|VIEW|PROC|PROCEDURE|FUNCTION|TRIGGER [s].[n]
//! CREATE [UNIQUE] [CLUSTERED|NONCLUSTERED|…] INDEX [n] ON [s].[t]
//! ALTER TABLE [s].[t] ADD|DROP CONSTRAINT [c]      -> the constraint
//! ALTER TABLE [s].[t] …                            -> the table
//! DROP TABLE|VIEW|PROC|PROCEDURE|FUNCTION|TRIGGER [IF EXISTS] [s].[n]
//! DROP INDEX [n] ON [s].[t]
//! EXEC sp_rename '[s].[t].[c]', …                  -> the owning table
//! EXEC sp_rename '[s].[old]', 'new', …             -> the new name
//! ```
//!
//! Table recreation is recognized across the whole script first
//! ([`ScriptContext::scan`]): once `CREATE TABLE [s].[tmp_ms_xx_T]` is seen,
//! every batch that touches the temp table, renames it back, changes
//! constraints or indexes on `T`, or adds/drops a foreign key referencing
//! `T` belongs to `Table s.T`.

use std::collections::HashMap;

use sqlparser::tokenizer::{Token, TokenWithSpan, Whitespace};

use crate::parser::TokenParser;

/// Prefix of the transient table a schema-compare rebuild goes through.
/// A user table such as `tmp_Orders` is an ordinary table.
const TEMP_TABLE_PREFIX: &str = "tmp_ms_xx_";

pub const TYPE_TABLE: &str = "Table";
pub const TYPE_VIEW: &str = "View";
pub const TYPE_PROCEDURE: &str = "StoredProcedure";
pub const TYPE_FUNCTION: &str = "Function";
pub const TYPE_TRIGGER: &str = "Trigger";
pub const TYPE_INDEX: &str = "Index";
pub const TYPE_CONSTRAINT: &str = "Constraint";
pub const TYPE_OBJECT: &str = "Object";
pub const TYPE_SCRIPT: &str = "Script";
pub const TYPE_UNATTRIBUTED: &str = "Unattributed";

/// Identity of the object a segment is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub object_type: String,
    pub schema: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(object_type: &str, schema: &str, name: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            schema: schema.to_string(),
            name: name.to_string(),
        }
    }

    /// Key of a control batch (`SET …`, `BEGIN TRANSACTION`, …).
    pub fn control(kind: &str) -> Self {
        Self::new(TYPE_SCRIPT, "control", kind)
    }

    /// Catch-all key for batches no rule recognizes.
    pub fn unattributed() -> Self {
        Self::new(TYPE_UNATTRIBUTED, "batch", "misc")
    }

    /// Case-insensitive identity comparison.
    pub fn same_as(&self, other: &ObjectKey) -> bool {
        self.object_type.eq_ignore_ascii_case(&other.object_type)
            && self.schema.eq_ignore_ascii_case(&other.schema)
            && self.name.eq_ignore_ascii_case(&other.name)
    }

    /// `schema.name`
    pub fn object_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// How a batch takes part in the split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchKind {
    /// DDL on a recognized object
    Object(ObjectKey),
    /// Script plumbing, keyed by kind (`set_options`, `begin_transaction`, …)
    Control(&'static str),
    /// Only comments or `PRINT`; travels with the next attributed batch
    Annotation,
    Unattributed,
}

/// Facts gathered from the whole script before any batch is attributed.
#[derive(Debug, Default)]
pub struct ScriptContext {
    /// Tables rebuilt through a temp table, keyed by lowercase `(schema, table)`
    recreated: HashMap<(String, String), (String, String)>,
    /// Constraint name (lowercase) -> owning `(schema, table)` with temp prefixes removed
    constraint_owners: HashMap<String, (String, String)>,
    /// Foreign key name (lowercase) -> referenced `(schema, table)`
    foreign_keys: HashMap<String, (String, String)>,
    /// Object name (lowercase) -> type, for typing `sp_rename` targets
    object_types: HashMap<String, &'static str>,
}

impl ScriptContext {
    pub fn scan<S: AsRef<str>>(batches: &[S]) -> Self {
        let mut context = ScriptContext::default();
        for batch in batches {
            if let Some(mut parser) = TokenParser::new(batch.as_ref()) {
                context.scan_batch(&mut parser);
            }
        }
        context
    }

    fn scan_batch(&mut self, parser: &mut TokenParser) {
        let mut current_table: Option<(String, String)> = None;

        while !parser.is_at_end() {
            let here = parser.pos();

            if parser.accept_word_ci("CREATE") {
                if parser.accept_word_ci("OR") {
                    let _ = parser.expect_word_ci("ALTER");
                }
                if let Some(kind) = accept_object_kind(parser) {
                    if let Some((schema, name)) = parser.parse_schema_qualified_name() {
                        if kind == TYPE_TABLE {
                            let owner = match temp_base(&name) {
                                Some(base) => {
                                    self.recreated.insert(
                                        (schema.to_lowercase(), base.to_lowercase()),
                                        (schema.clone(), base.to_string()),
                                    );
                                    base.to_string()
                                }
                                None => name.clone(),
                            };
                            current_table = Some((schema, owner));
                        }
                        self.object_types.insert(name.to_lowercase(), kind);
                    }
                }
            } else if parser.accept_word_ci("ALTER") {
                if parser.accept_word_ci("TABLE") {
                    if let Some((schema, name)) = parser.parse_schema_qualified_name() {
                        let owner = temp_base(&name).map(str::to_string).unwrap_or(name);
                        current_table = Some((schema, owner));
                    }
                }
            } else if parser.accept_word_ci("CONSTRAINT") {
                if !parser.check_word_ci("ALL") {
                    if let Some(name) = parser.parse_identifier() {
                        self.register_constraint(parser, &name, current_table.as_ref());
                    }
                }
            }

            parser.set_pos(here);
            parser.advance();
        }
    }

    fn register_constraint(
        &mut self,
        parser: &mut TokenParser,
        name: &str,
        owner: Option<&(String, String)>,
    ) {
        let key = name.to_lowercase();
        self.object_types.insert(key.clone(), TYPE_CONSTRAINT);
        if let Some(owner) = owner {
            self.constraint_owners.insert(key.clone(), owner.clone());
        }

        parser.skip_whitespace();
        if !parser.accept_word_ci("FOREIGN") {
            return;
        }
        if let Some(referenced) = find_references(parser) {
            let referenced = (
                referenced.0,
                temp_base(&referenced.1)
                    .map(str::to_string)
                    .unwrap_or(referenced.1),
            );
            self.foreign_keys.insert(key, referenced);
        }
    }

    pub fn is_recreated(&self, schema: &str, table: &str) -> bool {
        self.recreated
            .contains_key(&(schema.to_lowercase(), table.to_lowercase()))
    }

    /// The recreated table a temp-table name stands for, schema included.
    fn recreated_for_temp(&self, temp_name: &str) -> Option<(String, String)> {
        let base = temp_base(temp_name)?.to_lowercase();
        self.recreated
            .iter()
            .find(|((_, table), _)| *table == base)
            .map(|(_, original)| original.clone())
    }

    /// Recreated table a constraint belongs to or references, if any.
    fn recreated_table_of_constraint(
        &self,
        constraint: &str,
        owner: Option<(&str, &str)>,
    ) -> Option<(String, String)> {
        let key = constraint.to_lowercase();
        let owner = owner
            .map(|(s, t)| (s.to_string(), t.to_string()))
            .or_else(|| self.constraint_owners.get(&key).cloned());
        if let Some((schema, table)) = owner {
            if self.is_recreated(&schema, &table) {
                return Some((schema, table));
            }
        }
        self.foreign_keys
            .get(&key)
            .filter(|(schema, table)| self.is_recreated(schema, table))
            .cloned()
    }
}

/// Attribute one batch.
pub fn classify_batch(batch: &str, context: &ScriptContext) -> BatchKind {
    let Some(mut parser) = TokenParser::new(batch) else {
        return BatchKind::Unattributed;
    };

    skip_prints(&mut parser);
    if parser.is_at_end() {
        return BatchKind::Annotation;
    }
    let first_statement = parser.pos();

    if let Some(key) = find_ddl(&mut parser, context) {
        return BatchKind::Object(key);
    }
    if let Some((schema, table)) = temp_table_reference(parser.tokens(), context) {
        return BatchKind::Object(ObjectKey::new(TYPE_TABLE, &schema, &table));
    }
    if let Some(key) = object_id_reference(parser.tokens(), context) {
        return BatchKind::Object(key);
    }

    parser.set_pos(first_statement);
    match control_kind(&mut parser) {
        Some(kind) => BatchKind::Control(kind),
        None => BatchKind::Unattributed,
    }
}

/// Skip leading `PRINT` statements (and the comments around them).
fn skip_prints(parser: &mut TokenParser) {
    loop {
        parser.skip_whitespace();
        if !parser.check_word_ci("PRINT") {
            return;
        }
        parser.advance();
        while let Some(token) = parser.current_token() {
            match &token.token {
                Token::SemiColon => {
                    parser.advance();
                    break;
                }
                Token::Whitespace(Whitespace::Newline)
                | Token::Whitespace(Whitespace::SingleLineComment { .. }) => break,
                _ => parser.advance(),
            }
        }
    }
}

/// Try every top-level statement verb in order; the first recognized DDL wins.
fn find_ddl(parser: &mut TokenParser, context: &ScriptContext) -> Option<ObjectKey> {
    let mut depth = 0i32;
    while !parser.is_at_end() {
        let here = parser.pos();
        if parser.check_token(&Token::LParen) {
            depth += 1;
        } else if parser.check_token(&Token::RParen) {
            depth -= 1;
        } else if depth <= 0
            && parser.check_any_word_ci(&["CREATE", "ALTER", "DROP", "EXEC", "EXECUTE"])
        {
            if let Some(key) = parse_ddl(parser, context) {
                return Some(key);
            }
            parser.set_pos(here);
        }
        parser.advance();
    }
    None
}

fn parse_ddl(parser: &mut TokenParser, context: &ScriptContext) -> Option<ObjectKey> {
    if parser.accept_word_ci("CREATE") {
        if parser.accept_word_ci("OR") {
            parser.expect_word_ci("ALTER")?;
        }
        while ["UNIQUE", "CLUSTERED", "NONCLUSTERED", "COLUMNSTORE", "PRIMARY", "XML", "SPATIAL"]
            .iter()
            .any(|w| parser.accept_word_ci(w))
        {}
        if parser.accept_word_ci("INDEX") {
            let name = parser.parse_identifier()?;
            parser.skip_whitespace();
            parser.expect_word_ci("ON")?;
            let (schema, table) = parser.parse_schema_qualified_name()?;
            return Some(index_key(&schema, &table, &name, context));
        }
        let kind = accept_object_kind(parser)?;
        let (schema, name) = parser.parse_schema_qualified_name()?;
        return Some(object_key(kind, &schema, &name));
    }

    if parser.accept_word_ci("ALTER") {
        if parser.accept_word_ci("TABLE") {
            return alter_table(parser, context);
        }
        if parser.accept_word_ci("INDEX") {
            let name = parser.parse_identifier()?;
            parser.skip_whitespace();
            parser.expect_word_ci("ON")?;
            let (schema, table) = parser.parse_schema_qualified_name()?;
            return Some(index_key(&schema, &table, &name, context));
        }
        let kind = accept_object_kind(parser)?;
        let (schema, name) = parser.parse_schema_qualified_name()?;
        return Some(object_key(kind, &schema, &name));
    }

    if parser.accept_word_ci("DROP") {
        if parser.accept_word_ci("INDEX") {
            skip_if_exists(parser);
            let parts = parser.parse_multipart_name()?;
            if parser.accept_word_ci("ON") {
                let (schema, table) = parser.parse_schema_qualified_name()?;
                return Some(index_key(&schema, &table, parts.last()?, context));
            }
            // Legacy form: DROP INDEX [schema.]table.index
            let (schema, table, name) = match parts.as_slice() {
                [schema, table, name] => (schema.as_str(), table.as_str(), name.as_str()),
                [table, name] => ("dbo", table.as_str(), name.as_str()),
                _ => return None,
            };
            return Some(index_key(schema, table, name, context));
        }
        let kind = accept_object_kind(parser)?;
        skip_if_exists(parser);
        let (schema, name) = parser.parse_schema_qualified_name()?;
        return Some(object_key(kind, &schema, &name));
    }

    if parser.accept_word_ci("EXEC") || parser.accept_word_ci("EXECUTE") {
        return sp_rename(parser, context);
    }

    None
}

fn alter_table(parser: &mut TokenParser, context: &ScriptContext) -> Option<ObjectKey> {
    let (schema, name) = parser.parse_schema_qualified_name()?;
    let is_temp = temp_base(&name).is_some();
    let table = temp_base(&name).map(str::to_string).unwrap_or(name);
    let table_key = ObjectKey::new(TYPE_TABLE, &schema, &table);
    let owner_recreated = is_temp || context.is_recreated(&schema, &table);

    if parser.accept_word_ci("WITH") {
        // WITH CHECK | WITH NOCHECK
        parser.advance();
        parser.skip_whitespace();
    }

    let names_constraint = if parser.accept_word_ci("ADD") || parser.accept_word_ci("DROP") {
        parser.accept_word_ci("CONSTRAINT")
    } else if parser.accept_word_ci("CHECK") || parser.accept_word_ci("NOCHECK") {
        parser.accept_word_ci("CONSTRAINT") && !parser.check_word_ci("ALL")
    } else {
        false
    };
    if !names_constraint {
        return Some(table_key);
    }

    skip_if_exists(parser);
    let Some(constraint) = parser.parse_identifier() else {
        return Some(table_key);
    };
    if owner_recreated {
        return Some(table_key);
    }
    if let Some((ref_schema, ref_table)) =
        context.recreated_table_of_constraint(&constraint, Some((&schema, &table)))
    {
        return Some(ObjectKey::new(TYPE_TABLE, &ref_schema, &ref_table));
    }
    Some(ObjectKey::new(TYPE_CONSTRAINT, &schema, &constraint))
}

/// `sp_rename` attribution. Position is just after `EXEC`.
fn sp_rename(parser: &mut TokenParser, context: &ScriptContext) -> Option<ObjectKey> {
    if parser.check_word_ci("sys") || parser.check_word_ci("dbo") {
        parser.advance();
        parser.skip_whitespace();
        parser.expect_token(&Token::Period)?;
    }
    if !parser.check_word_ci("sp_rename") {
        return None;
    }
    parser.advance();

    let mut arguments = Vec::new();
    while arguments.len() < 3 {
        parser.skip_whitespace();
        if !arguments.is_empty() && parser.expect_token(&Token::Comma).is_none() {
            break;
        }
        // Named argument: @objname = …
        let named = matches!(
            parser.current_token().map(|t| &t.token),
            Some(Token::Word(w)) if w.value.starts_with('@')
        );
        if named {
            parser.advance();
            parser.skip_whitespace();
            parser.expect_token(&Token::Eq)?;
        }
        let literal = match parser.current_token().map(|t| &t.token) {
            Some(Token::SingleQuotedString(s)) | Some(Token::NationalStringLiteral(s)) => {
                s.clone()
            }
            _ => break,
        };
        parser.advance();
        arguments.push(literal);
    }

    let old = arguments.first()?;
    let new_name = arguments.get(1).map(|n| split_qualified_literal(n));
    let new_name = new_name.as_ref().and_then(|parts| parts.last()).cloned();
    let rename_type = arguments.get(2).map(|t| t.to_ascii_uppercase());

    let parts = split_qualified_literal(old);
    match (parts.as_slice(), rename_type.as_deref()) {
        ([.., schema, table, _column], _) => Some(table_from_name(schema, table, context)),
        ([table, _child], Some("COLUMN") | Some("INDEX")) => {
            Some(table_from_name("dbo", table, context))
        }
        ([schema, old_name], _) => Some(renamed_object(schema, old_name, new_name, context)),
        ([old_name], _) => Some(renamed_object("dbo", old_name, new_name, context)),
        _ => None,
    }
}

fn renamed_object(
    schema: &str,
    old_name: &str,
    new_name: Option<String>,
    context: &ScriptContext,
) -> ObjectKey {
    if let Some((s, t)) = context.recreated_table_of_constraint(old_name, None) {
        return ObjectKey::new(TYPE_TABLE, &s, &t);
    }
    if let Some((s, t)) = context.recreated_for_temp(old_name) {
        return ObjectKey::new(TYPE_TABLE, &s, &t);
    }
    let name = new_name.unwrap_or_else(|| old_name.to_string());
    let object_type = context
        .object_types
        .get(&name.to_lowercase())
        .or_else(|| context.object_types.get(&old_name.to_lowercase()))
        .copied()
        .unwrap_or(TYPE_OBJECT);
    ObjectKey::new(object_type, schema, &name)
}

fn table_from_name(schema: &str, table: &str, context: &ScriptContext) -> ObjectKey {
    match context.recreated_for_temp(table) {
        Some((s, t)) => ObjectKey::new(TYPE_TABLE, &s, &t),
        None => ObjectKey::new(TYPE_TABLE, schema, table),
    }
}

fn object_key(kind: &'static str, schema: &str, name: &str) -> ObjectKey {
    if kind == TYPE_TABLE {
        if let Some(base) = temp_base(name) {
            return ObjectKey::new(TYPE_TABLE, schema, base);
        }
    }
    ObjectKey::new(kind, schema, name)
}

/// Indexes are keyed `table.index`; indexes on a rebuilt table belong to the table.
fn index_key(schema: &str, table: &str, name: &str, context: &ScriptContext) -> ObjectKey {
    let owner = temp_base(table).unwrap_or(table);
    if temp_base(table).is_some() || context.is_recreated(schema, owner) {
        return ObjectKey::new(TYPE_TABLE, schema, owner);
    }
    ObjectKey::new(TYPE_INDEX, schema, &format!("{owner}.{name}"))
}

fn accept_object_kind(parser: &mut TokenParser) -> Option<&'static str> {
    if parser.accept_word_ci("TABLE") {
        Some(TYPE_TABLE)
    } else if parser.accept_word_ci("VIEW") {
        Some(TYPE_VIEW)
    } else if parser.accept_word_ci("PROCEDURE") || parser.accept_word_ci("PROC") {
        Some(TYPE_PROCEDURE)
    } else if parser.accept_word_ci("FUNCTION") {
        Some(TYPE_FUNCTION)
    } else if parser.accept_word_ci("TRIGGER") {
        Some(TYPE_TRIGGER)
    } else {
        None
    }
}

fn skip_if_exists(parser: &mut TokenParser) {
    let here = parser.pos();
    if !(parser.accept_word_ci("IF") && parser.accept_word_ci("EXISTS")) {
        parser.set_pos(here);
    }
}

/// From just after `FOREIGN`, the table named by the matching `REFERENCES`.
fn find_references(parser: &mut TokenParser) -> Option<(String, String)> {
    let mut depth = 0i32;
    while !parser.is_at_end() {
        if parser.check_token(&Token::LParen) {
            depth += 1;
        } else if parser.check_token(&Token::RParen) {
            depth -= 1;
            if depth < 0 {
                return None;
            }
        } else if parser.check_token(&Token::SemiColon) {
            return None;
        } else if depth == 0 && parser.check_word_ci("REFERENCES") {
            parser.advance();
            parser.skip_whitespace();
            return parser.parse_schema_qualified_name();
        }
        parser.advance();
    }
    None
}

/// A batch that names a rebuild's temp table anywhere belongs to the rebuilt table.
fn temp_table_reference(
    tokens: &[TokenWithSpan],
    context: &ScriptContext,
) -> Option<(String, String)> {
    tokens.iter().find_map(|t| match &t.token {
        Token::Word(w) => context.recreated_for_temp(&w.value),
        _ => None,
    })
}

/// `OBJECT_ID(N'[s].[t]')` in catalog lookups names the table being changed.
fn object_id_reference(
    tokens: &[TokenWithSpan],
    context: &ScriptContext,
) -> Option<ObjectKey> {
    let significant: Vec<&Token> = tokens
        .iter()
        .map(|t| &t.token)
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect();
    significant.windows(3).find_map(|window| match window {
        [
            Token::Word(w),
            Token::LParen,
            Token::SingleQuotedString(s) | Token::NationalStringLiteral(s),
        ] if w.value.eq_ignore_ascii_case("OBJECT_ID") =>
        {
            match split_qualified_literal(s).as_slice() {
                [schema, table] => Some(table_from_name(schema, table, context)),
                [table] => Some(table_from_name("dbo", table, context)),
                _ => None,
            }
        }
        _ => None,
    })
}

fn control_kind(parser: &mut TokenParser) -> Option<&'static str> {
    parser.skip_whitespace();
    if parser.check_word_ci("SET") {
        return Some("set_options");
    }
    if parser.accept_word_ci("BEGIN") {
        return (parser.check_word_ci("TRAN") || parser.check_word_ci("TRANSACTION"))
            .then_some("begin_transaction");
    }
    if parser.check_word_ci("COMMIT") {
        return Some("commit_transaction");
    }
    if parser.check_word_ci("ROLLBACK") {
        return Some("rollback_transaction");
    }
    None
}

/// Strip a rebuild temp-table prefix: `tmp_ms_xx_Orders` -> `Orders`.
pub fn temp_base(name: &str) -> Option<&str> {
    let head = name.get(..TEMP_TABLE_PREFIX.len())?;
    let rest = &name[TEMP_TABLE_PREFIX.len()..];
    (head.eq_ignore_ascii_case(TEMP_TABLE_PREFIX) && !rest.is_empty()).then_some(rest)
}

/// Split `[dbo].[T].[Col]` / `dbo.T.Col` into its parts, brackets removed.
pub fn split_qualified_literal(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = text.trim().chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '[' => {
                while let Some(inner) = chars.next() {
                    if inner == ']' {
                        if chars.peek() == Some(&']') {
                            chars.next();
                            current.push(']');
                            continue;
                        }
                        break;
                    }
                    current.push(inner);
                }
            }
            '"' => {
                for inner in chars.by_ref() {
                    if inner == '"' {
                        break;
                    }
                    current.push(inner);
                }
            }
            '.' => parts.push(std::mem::take(&mut current)),
            c if c.is_whitespace() => {}
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}
