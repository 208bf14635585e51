//! Token-based parsing of extended property procedure calls
//!
//! ## Supported Syntax
//!
//! ```sql
//! EXEC sp_addextendedproperty
//!     @name = N'MS_Description',
//!     @value = N'Description text',
//!     @level0type = N'SCHEMA', @level0name = N'dbo',
//!     @level1type = N'TABLE',  @level1name = N'TableName',
//!     @level2type = N'COLUMN', @level2name = N'ColumnName';
//! ```
//!
//! Also supports:
//! - With or without EXEC/EXECUTE keyword
//! - Schema-qualified procedure name: `sys.sp_addextendedproperty`
//! - `sp_updateextendedproperty` / `sp_dropextendedproperty`
//! - NULL values and mixed-case parameter names

use sqlparser::tokenizer::Token;

use super::identifier_utils::escape_literal;
use super::token_parser_base::TokenParser;

/// One `@levelNtype`/`@levelNname` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyLevel {
    pub level_type: String,
    pub level_name: String,
}

/// A parsed `sp_*extendedproperty` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedPropertyCall {
    /// Procedure called, lowercase, e.g. `sp_addextendedproperty`
    pub procedure: String,
    /// Property name (e.g., "MS_Description")
    pub property_name: String,
    /// Property value; None when NULL or absent
    pub property_value: Option<String>,
    /// Levels 0..=2 in order; missing levels are omitted
    pub levels: Vec<PropertyLevel>,
}

impl ExtendedPropertyCall {
    /// `@level0type = N'SCHEMA', @level0name = N'dbo', …`
    pub fn level_arguments(&self) -> String {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, level)| {
                format!(
                    "@level{i}type = N'{}', @level{i}name = N'{}'",
                    escape_literal(&level.level_type),
                    escape_literal(&level.level_name)
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Level 1 object name (usually the table), if present.
    pub fn level1_name(&self) -> Option<&str> {
        self.levels.get(1).map(|l| l.level_name.as_str())
    }

    /// Level 0 name (the schema); `dbo` when the call omits it.
    pub fn schema(&self) -> &str {
        self.levels
            .first()
            .map(|l| l.level_name.as_str())
            .unwrap_or("dbo")
    }
}

const PROCEDURES: &[&str] = &[
    "sp_addextendedproperty",
    "sp_updateextendedproperty",
    "sp_dropextendedproperty",
];

/// Token-based extended property parser
pub struct ExtendedPropertyTokenParser {
    base: TokenParser,
}

impl ExtendedPropertyTokenParser {
    pub fn new(sql: &str) -> Option<Self> {
        Some(Self {
            base: TokenParser::new(sql)?,
        })
    }

    pub fn parse(&mut self) -> Option<ExtendedPropertyCall> {
        self.base.skip_whitespace();

        if !self.base.accept_word_ci("EXEC") {
            self.base.accept_word_ci("EXECUTE");
        }

        // Optional schema prefix (sys. / dbo.)
        if self.base.check_word_ci("sys") || self.base.check_word_ci("dbo") {
            self.base.advance();
            self.base.skip_whitespace();
            self.base.expect_token(&Token::Period)?;
        }

        let procedure = PROCEDURES
            .iter()
            .find(|p| self.base.check_word_ci(p))?
            .to_string();
        self.base.advance();

        let mut call = ExtendedPropertyCall {
            procedure,
            ..Default::default()
        };
        let mut level_types: [Option<String>; 3] = [None, None, None];
        let mut level_names: [Option<String>; 3] = [None, None, None];

        while !self.base.is_at_end() {
            self.base.skip_whitespace();
            if self.base.check_token(&Token::SemiColon) {
                break;
            }

            let Some(param_name) = self.try_parse_param_name() else {
                self.base.advance();
                continue;
            };
            self.base.skip_whitespace();
            if self.base.expect_token(&Token::Eq).is_none() {
                continue;
            }
            let value = self.parse_parameter_value();

            match param_name.as_str() {
                "NAME" => call.property_name = value.unwrap_or_default(),
                "VALUE" => call.property_value = value,
                other => {
                    if let Some((index, is_type)) = level_param(other) {
                        if is_type {
                            level_types[index] = value;
                        } else {
                            level_names[index] = value;
                        }
                    }
                }
            }
        }

        if call.property_name.is_empty() {
            return None;
        }

        for (index, (level_type, level_name)) in
            level_types.into_iter().zip(level_names).enumerate()
        {
            let level_type = match (index, level_type) {
                (_, Some(t)) => t,
                // Level 0 is always a schema
                (0, None) => "SCHEMA".to_string(),
                _ => break,
            };
            let Some(level_name) = level_name.or_else(|| (index == 0).then(|| "dbo".to_string()))
            else {
                break;
            };
            call.levels.push(PropertyLevel {
                level_type,
                level_name,
            });
        }

        Some(call)
    }

    /// MsSqlDialect tokenizes `@name` as a single Word token.
    fn try_parse_param_name(&mut self) -> Option<String> {
        if let Some(token) = self.base.current_token() {
            if let Token::Word(w) = &token.token {
                if let Some(name) = w.value.strip_prefix('@') {
                    let name = name.to_uppercase();
                    self.base.advance();
                    return Some(name);
                }
            }
        }
        None
    }

    /// `N'string'`, `'string'`, `NULL`, or a bare identifier.
    fn parse_parameter_value(&mut self) -> Option<String> {
        let token = self.base.current_token()?;
        let value = match &token.token {
            Token::SingleQuotedString(s) | Token::NationalStringLiteral(s) => Some(s.clone()),
            Token::Word(w) if w.value.eq_ignore_ascii_case("NULL") => None,
            Token::Word(w) => Some(w.value.clone()),
            Token::Number(n, _) => Some(n.clone()),
            _ => return None,
        };
        self.base.advance();
        value
    }
}

/// `LEVEL1TYPE` -> (1, true), `LEVEL2NAME` -> (2, false)
fn level_param(param: &str) -> Option<(usize, bool)> {
    let rest = param.strip_prefix("LEVEL")?;
    let index: usize = rest.get(..1)?.parse().ok()?;
    if index > 2 {
        return None;
    }
    match &rest[1..] {
        "TYPE" => Some((index, true)),
        "NAME" => Some((index, false)),
        _ => None,
    }
}

/// Parse an extended property call; `None` if the text is not one.
pub fn parse_extended_property(sql: &str) -> Option<ExtendedPropertyCall> {
    ExtendedPropertyTokenParser::new(sql)?.parse()
}
