//! Token-based column definition parsing for T-SQL
//!
//! ## Supported Syntax
//!
//! Regular columns:
//! ```sql
//! [Name] TYPE [COLLATE name] [IDENTITY(seed, increment)] [NOT NULL|NULL]
//!     [CONSTRAINT name DEFAULT (value)|DEFAULT (value)]
//!     [CONSTRAINT name CHECK (expr)|CHECK (expr)]
//!     [ROWGUIDCOL] [SPARSE] [FILESTREAM]
//! ```
//!
//! Computed columns:
//! ```sql
//! [Name] AS (expression) [PERSISTED] [NOT NULL]
//! ```

use sqlparser::tokenizer::Token;

use super::identifier_utils::bracket;
use super::token_parser_base::TokenParser;

/// Words that end a DEFAULT value written without parentheses.
const MODIFIER_WORDS: &[&str] = &[
    "NOT",
    "NULL",
    "CONSTRAINT",
    "CHECK",
    "IDENTITY",
    "ROWGUIDCOL",
    "SPARSE",
    "FILESTREAM",
    "COLLATE",
    "PRIMARY",
    "UNIQUE",
    "REFERENCES",
    "FOREIGN",
    "DEFAULT",
];

/// Structured view of one column definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedColumn {
    /// Column name
    pub name: String,
    /// Data type as written, e.g. `DECIMAL(10,2)`. Empty for computed columns.
    pub data_type: String,
    /// COLLATE clause value
    pub collation: Option<String>,
    /// IDENTITY clause as written, e.g. `IDENTITY(1,1)`
    pub identity: Option<String>,
    /// Some(true) = explicit NULL, Some(false) = NOT NULL, None = unspecified
    pub nullability: Option<bool>,
    /// Inline default constraint name
    pub default_constraint_name: Option<String>,
    /// Inline default expression, e.g. `(0)`
    pub default_expression: Option<String>,
    /// Computed column expression
    pub computed_expression: Option<String>,
    pub is_persisted: bool,
    /// Other modifiers kept verbatim (ROWGUIDCOL, SPARSE, FILESTREAM)
    pub flags: Vec<String>,
}

impl ParsedColumn {
    pub fn is_not_null(&self) -> bool {
        self.nullability == Some(false)
    }

    pub fn is_computed(&self) -> bool {
        self.computed_expression.is_some()
    }

    fn type_clause(&self) -> String {
        let mut clause = format!("{} {}", bracket(&self.name), self.data_type);
        if let Some(collation) = &self.collation {
            clause.push_str(" COLLATE ");
            clause.push_str(collation);
        }
        clause
    }

    /// Body of an `ALTER TABLE … ALTER COLUMN` statement: name, type,
    /// collation and nullability only. `None` for computed columns, which
    /// cannot be altered in place.
    pub fn alter_column_definition(&self) -> Option<String> {
        if self.is_computed() || self.data_type.is_empty() {
            return None;
        }
        let mut def = self.type_clause();
        for flag in &self.flags {
            if flag.eq_ignore_ascii_case("SPARSE") {
                def.push_str(" SPARSE");
            }
        }
        match self.nullability {
            Some(false) => def.push_str(" NOT NULL"),
            Some(true) => def.push_str(" NULL"),
            None => {}
        }
        Some(def)
    }

    /// Column definition with `default_expression` inlined ahead of the
    /// nullability, e.g. `[Active] BIT DEFAULT ((1)) NOT NULL`.
    pub fn definition_with_default(&self, default_expression: &str) -> String {
        let mut def = self.type_clause();
        if let Some(identity) = &self.identity {
            def.push(' ');
            def.push_str(identity);
        }
        for flag in &self.flags {
            def.push(' ');
            def.push_str(flag);
        }
        def.push_str(" DEFAULT ");
        def.push_str(&parenthesize(default_expression));
        match self.nullability {
            Some(false) => def.push_str(" NOT NULL"),
            Some(true) => def.push_str(" NULL"),
            None => {}
        }
        def
    }
}

/// Wrap an expression in parentheses unless it already is one group.
pub fn parenthesize(expression: &str) -> String {
    let trimmed = expression.trim();
    if is_single_group(trimmed) {
        trimmed.to_string()
    } else {
        format!("({})", trimmed)
    }
}

fn is_single_group(text: &str) -> bool {
    if !text.starts_with('(') || !text.ends_with(')') {
        return false;
    }
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != text.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Token-based column definition parser
pub struct ColumnTokenParser {
    base: TokenParser,
}

impl ColumnTokenParser {
    pub fn new(col_def: &str) -> Option<Self> {
        Some(Self {
            base: TokenParser::new(col_def)?,
        })
    }

    pub fn parse(&mut self) -> Option<ParsedColumn> {
        self.base.skip_whitespace();
        let name = self.base.parse_identifier()?;
        self.base.skip_whitespace();

        if self.base.check_word_ci("AS") {
            return self.parse_computed_column(name);
        }

        let data_type = self.parse_data_type()?;
        let mut result = ParsedColumn {
            name,
            data_type,
            ..Default::default()
        };
        self.parse_column_modifiers(&mut result);
        Some(result)
    }

    fn parse_computed_column(&mut self, name: String) -> Option<ParsedColumn> {
        self.base.expect_word_ci("AS")?;
        let expression = self.base.consume_parenthesized()?;
        let mut result = ParsedColumn {
            name,
            computed_expression: Some(expression),
            ..Default::default()
        };

        loop {
            self.base.skip_whitespace();
            if self.base.accept_word_ci("PERSISTED") {
                result.is_persisted = true;
            } else if self.base.accept_word_ci("NOT") {
                if self.base.accept_word_ci("NULL") {
                    result.nullability = Some(false);
                }
            } else if self.base.accept_word_ci("NULL") {
                result.nullability = Some(true);
            } else {
                break;
            }
        }

        Some(result)
    }

    /// Type name (possibly schema-qualified) plus an optional argument list.
    fn parse_data_type(&mut self) -> Option<String> {
        let start = self.base.pos();
        let parts = self.base.parse_multipart_name()?;
        let mut data_type = if parts.len() > 1 {
            self.base.tokens_to_string(start, self.base.pos()).trim().to_string()
        } else {
            parts[0].clone()
        };
        if self.base.check_token(&Token::LParen) {
            let args = self.base.consume_parenthesized()?;
            data_type.push_str(&args);
            self.base.skip_whitespace();
        }
        Some(data_type)
    }

    fn parse_column_modifiers(&mut self, result: &mut ParsedColumn) {
        let mut pending_constraint_name: Option<String> = None;

        loop {
            self.base.skip_whitespace();
            if self.base.is_at_end() {
                break;
            }

            if self.base.check_word_ci("COLLATE") {
                self.base.advance();
                self.base.skip_whitespace();
                result.collation = self.base.parse_identifier();
                continue;
            }

            if self.base.check_word_ci("IDENTITY") {
                self.base.advance();
                self.base.skip_whitespace();
                let args = self.base.consume_parenthesized().unwrap_or_default();
                result.identity = Some(format!("IDENTITY{}", args));
                continue;
            }

            if self.base.accept_word_ci("NOT") {
                if self.base.accept_word_ci("NULL") {
                    result.nullability = Some(false);
                }
                continue;
            }

            if self.base.accept_word_ci("NULL") {
                if result.nullability.is_none() {
                    result.nullability = Some(true);
                }
                continue;
            }

            if self.base.accept_word_ci("CONSTRAINT") {
                pending_constraint_name = self.base.parse_identifier();
                continue;
            }

            if self.base.accept_word_ci("DEFAULT") {
                result.default_expression = self.parse_default_value();
                result.default_constraint_name = pending_constraint_name.take();
                continue;
            }

            if self.base.accept_word_ci("CHECK") {
                self.base.skip_parenthesized();
                pending_constraint_name = None;
                continue;
            }

            if let Some(flag) = ["ROWGUIDCOL", "SPARSE", "FILESTREAM"]
                .iter()
                .find(|f| self.base.check_word_ci(f))
            {
                result.flags.push(flag.to_string());
                self.base.advance();
                continue;
            }

            // Anything else (PRIMARY KEY, REFERENCES, …) is not needed here
            self.base.advance();
        }
    }

    /// DEFAULT value: a parenthesized group, or tokens up to the next modifier.
    fn parse_default_value(&mut self) -> Option<String> {
        if self.base.check_token(&Token::LParen) {
            return self.base.consume_parenthesized();
        }

        let start = self.base.pos();
        let mut end = start;
        while !self.base.is_at_end() {
            if MODIFIER_WORDS.iter().any(|w| self.base.check_word_ci(w)) {
                break;
            }
            if self.base.check_token(&Token::LParen) {
                self.base.skip_parenthesized();
            } else {
                self.base.advance();
            }
            if !matches!(
                self.base.tokens().get(self.base.pos().saturating_sub(1)).map(|t| &t.token),
                Some(Token::Whitespace(_))
            ) {
                end = self.base.pos();
            }
        }

        let value = self.base.tokens_to_string(start, end).trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Parse a column definition such as `[Price] DECIMAL(10,2) NOT NULL`.
pub fn parse_column_definition(col_def: &str) -> Option<ParsedColumn> {
    ColumnTokenParser::new(col_def)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_not_null_column() {
        let col = parse_column_definition("[Email] NVARCHAR(100) NOT NULL").unwrap();
        assert_eq!(col.name, "Email");
        assert_eq!(col.data_type, "NVARCHAR(100)");
        assert!(col.is_not_null());
        assert_eq!(
            col.alter_column_definition().unwrap(),
            "[Email] NVARCHAR(100) NOT NULL"
        );
    }

    #[test]
    fn test_identity_and_named_default() {
        let col = parse_column_definition(
            "[Id] INT IDENTITY(1,1) CONSTRAINT [DF_T_Id] DEFAULT (0) NOT NULL",
        )
        .unwrap();
        assert_eq!(col.identity.as_deref(), Some("IDENTITY(1,1)"));
        assert_eq!(col.default_constraint_name.as_deref(), Some("DF_T_Id"));
        assert_eq!(col.default_expression.as_deref(), Some("(0)"));
        assert!(col.is_not_null());
    }

    #[test]
    fn test_unparenthesized_default() {
        let col = parse_column_definition("[Created] DATETIME2 DEFAULT GETUTCDATE() NOT NULL")
            .unwrap();
        assert_eq!(col.default_expression.as_deref(), Some("GETUTCDATE()"));
        assert!(col.is_not_null());
    }

    #[test]
    fn test_collation_kept_for_alter() {
        let col = parse_column_definition(
            "[Code] VARCHAR(10) COLLATE Latin1_General_CS_AS NULL",
        )
        .unwrap();
        assert_eq!(
            col.alter_column_definition().unwrap(),
            "[Code] VARCHAR(10) COLLATE Latin1_General_CS_AS NULL"
        );
    }

    #[test]
    fn test_computed_column_cannot_be_altered() {
        let col = parse_column_definition("[Total] AS ([Qty] * [Price]) PERSISTED").unwrap();
        assert!(col.is_computed());
        assert!(col.is_persisted);
        assert!(col.alter_column_definition().is_none());
    }

    #[test]
    fn test_definition_with_default() {
        let col = parse_column_definition("[Active] BIT NOT NULL").unwrap();
        assert_eq!(
            col.definition_with_default("((1))"),
            "[Active] BIT DEFAULT ((1)) NOT NULL"
        );
        assert_eq!(
            col.definition_with_default("0"),
            "[Active] BIT DEFAULT (0) NOT NULL"
        );
    }

    #[test]
    fn test_parenthesize() {
        assert_eq!(parenthesize("(0)"), "(0)");
        assert_eq!(parenthesize("(1) + (2)"), "((1) + (2))");
        assert_eq!(parenthesize("N'x'"), "(N'x')");
    }
}
