//! Header parsing for object-level definitions.
//!
//! Only the leading clause of each statement is read: enough to know the
//! object's name, owning table, and (for constraints) what kind of
//! constraint it is. Bodies are never interpreted.
//!
//! ## Supported Syntax
//!
//! ```sql
//! CREATE [UNIQUE] [CLUSTERED|NONCLUSTERED] [COLUMNSTORE] INDEX [name] ON [s].[t] (...)
//! ALTER TABLE [s].[t] [WITH CHECK|NOCHECK] ADD CONSTRAINT [name] DEFAULT (expr) FOR [col]
//! ALTER TABLE [s].[t] ADD CONSTRAINT [name] FOREIGN KEY (...) REFERENCES [s].[t2] (...)
//! CONSTRAINT [name] PRIMARY KEY (...)            -- table-level item
//! CREATE [OR ALTER] TRIGGER [s].[name] ON [s].[t] ...
//! CREATE [OR ALTER] VIEW|PROC|PROCEDURE|FUNCTION [s].[name] ...
//! ```

use sqlparser::tokenizer::Token;

use super::token_parser_base::TokenParser;

/// Parsed `CREATE INDEX` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub name: String,
    pub schema: String,
    pub table: String,
    pub is_unique: bool,
}

/// Kind of table constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
    Default,
    Unknown,
}

/// Parsed constraint definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintHeader {
    /// Owning table schema (None for a bare table-level item)
    pub schema: Option<String>,
    /// Owning table (None for a bare table-level item)
    pub table: Option<String>,
    pub name: String,
    pub kind: ConstraintKind,
    /// DEFAULT constraints: the column after FOR
    pub default_column: Option<String>,
    /// DEFAULT constraints: the value expression
    pub default_expression: Option<String>,
    /// FOREIGN KEY constraints: the referenced `(schema, table)`
    pub referenced_table: Option<(String, String)>,
}

/// Kind of programmable object (or table) created by a module definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Table,
    View,
    Procedure,
    Function,
    Trigger,
}

/// Parsed `CREATE <module>` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHeader {
    pub kind: ModuleKind,
    pub schema: String,
    pub name: String,
    /// Triggers: the table (or view) the trigger is ON
    pub parent: Option<(String, String)>,
}

/// Parse the header of a `CREATE … INDEX` statement.
pub fn parse_index_header(sql: &str) -> Option<IndexHeader> {
    let mut base = TokenParser::new(sql)?;
    if !seek_statement(&mut base, "CREATE") {
        return None;
    }
    base.expect_word_ci("CREATE")?;

    let mut is_unique = false;
    loop {
        if base.accept_word_ci("UNIQUE") {
            is_unique = true;
        } else if !(base.accept_word_ci("CLUSTERED")
            || base.accept_word_ci("NONCLUSTERED")
            || base.accept_word_ci("COLUMNSTORE")
            || base.accept_word_ci("PRIMARY")
            || base.accept_word_ci("XML")
            || base.accept_word_ci("SPATIAL"))
        {
            break;
        }
    }

    base.expect_word_ci("INDEX")?;
    let name = base.parse_identifier()?;
    base.skip_whitespace();
    base.expect_word_ci("ON")?;
    let (schema, table) = base.parse_schema_qualified_name()?;

    Some(IndexHeader {
        name,
        schema,
        table,
        is_unique,
    })
}

/// Parse a constraint definition: either `ALTER TABLE … ADD CONSTRAINT …`
/// or a bare `CONSTRAINT [name] …` table item.
pub fn parse_constraint_definition(sql: &str) -> Option<ConstraintHeader> {
    let mut base = TokenParser::new(sql)?;
    base.skip_whitespace();

    let mut owner: Option<(String, String)> = None;
    if base.check_word_ci("ALTER") {
        base.expect_word_ci("ALTER")?;
        base.expect_word_ci("TABLE")?;
        owner = Some(base.parse_schema_qualified_name()?);
        if base.accept_word_ci("WITH") {
            // WITH CHECK | WITH NOCHECK
            base.advance();
            base.skip_whitespace();
        }
        base.expect_word_ci("ADD")?;
    }

    base.expect_word_ci("CONSTRAINT")?;
    let name = base.parse_identifier()?;
    base.skip_whitespace();

    let mut header = ConstraintHeader {
        schema: owner.as_ref().map(|(s, _)| s.clone()),
        table: owner.map(|(_, t)| t),
        name,
        kind: ConstraintKind::Unknown,
        default_column: None,
        default_expression: None,
        referenced_table: None,
    };

    if base.accept_word_ci("PRIMARY") {
        header.kind = ConstraintKind::PrimaryKey;
    } else if base.accept_word_ci("UNIQUE") {
        header.kind = ConstraintKind::Unique;
    } else if base.accept_word_ci("CHECK") {
        header.kind = ConstraintKind::Check;
    } else if base.accept_word_ci("FOREIGN") {
        header.kind = ConstraintKind::ForeignKey;
        if base.skip_to_word_ci("REFERENCES") {
            base.expect_word_ci("REFERENCES")?;
            header.referenced_table = base.parse_schema_qualified_name();
        }
    } else if base.accept_word_ci("DEFAULT") {
        header.kind = ConstraintKind::Default;
        let start = base.pos();
        if base.skip_to_word_ci("FOR") {
            let expression = base.tokens_to_string(start, base.pos()).trim().to_string();
            if !expression.is_empty() {
                header.default_expression = Some(expression);
            }
            base.expect_word_ci("FOR")?;
            header.default_column = base.parse_identifier();
        } else {
            let expression = base.tokens_to_string(start, base.tokens().len());
            let expression = expression.trim().trim_end_matches(';').trim_end();
            if !expression.is_empty() {
                header.default_expression = Some(expression.to_string());
            }
        }
    }

    Some(header)
}

/// Parse the header of a `CREATE [OR ALTER] TABLE|VIEW|PROCEDURE|FUNCTION|TRIGGER` statement.
///
/// Leading `SET` batches and comments are skipped.
pub fn parse_module_header(sql: &str) -> Option<ModuleHeader> {
    let mut base = TokenParser::new(sql)?;
    if !seek_statement(&mut base, "CREATE") {
        return None;
    }
    base.expect_word_ci("CREATE")?;
    if base.accept_word_ci("OR") {
        base.expect_word_ci("ALTER")?;
    }

    let kind = if base.accept_word_ci("TABLE") {
        ModuleKind::Table
    } else if base.accept_word_ci("VIEW") {
        ModuleKind::View
    } else if base.accept_word_ci("PROCEDURE") || base.accept_word_ci("PROC") {
        ModuleKind::Procedure
    } else if base.accept_word_ci("FUNCTION") {
        ModuleKind::Function
    } else if base.accept_word_ci("TRIGGER") {
        ModuleKind::Trigger
    } else {
        return None;
    };

    let (schema, name) = base.parse_schema_qualified_name()?;
    let parent = if kind == ModuleKind::Trigger {
        base.skip_whitespace();
        if base.accept_word_ci("ON") {
            base.parse_schema_qualified_name()
        } else {
            None
        }
    } else {
        None
    };

    Some(ModuleHeader {
        kind,
        schema,
        name,
        parent,
    })
}

/// Move to the first top-level occurrence of `verb` at a statement start.
///
/// A statement start is the beginning of the text or a position after a `;`
/// or after a line that holds only `GO`.
fn seek_statement(base: &mut TokenParser, verb: &str) -> bool {
    base.skip_whitespace();
    while !base.is_at_end() {
        if base.check_word_ci(verb) {
            return true;
        }
        base.advance();
        while !base.is_at_end()
            && !base.check_token(&Token::SemiColon)
            && !base.check_word_ci("GO")
            && !base.check_word_ci(verb)
        {
            base.advance();
        }
        if base.check_token(&Token::SemiColon) || base.check_word_ci("GO") {
            base.advance();
        }
        base.skip_whitespace();
    }
    false
}
