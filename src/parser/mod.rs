//! T-SQL definition extraction
//!
//! Everything that reads SQL text lives here: the bracket-scanning table
//! extractor, token-based header parsers for the other object kinds, the
//! extended-property call parser and `GO` batch splitting. Nothing in this
//! module evaluates expressions or builds an AST.

pub mod batch;
pub mod column_parser;
pub mod extended_property_parser;
pub mod identifier_utils;
pub mod object_parser;
pub mod table_parser;
mod token_parser_base;

pub(crate) use token_parser_base::TokenParser;

pub use batch::{join_batches, split_batches, Batch, BatchText, ScriptBatch};
pub use column_parser::{parse_column_definition, ParsedColumn};
pub use extended_property_parser::{parse_extended_property, ExtendedPropertyCall};
pub use identifier_utils::{normalize_whitespace, quote_name, replace_identifier};
pub use object_parser::{
    parse_constraint_definition, parse_index_header, parse_module_header, ConstraintHeader,
    ConstraintKind, IndexHeader, ModuleHeader, ModuleKind,
};
pub use table_parser::{DefinitionExtractor, ScanningExtractor, TableDefinition};

/// Statements SSMS scripts around object definitions that carry no schema meaning.
const SESSION_OPTION_PREFIXES: &[&str] = &["SET ANSI_NULLS", "SET QUOTED_IDENTIFIER"];

/// Reduce a schema file to the definition it holds.
///
/// Batches that only set `ANSI_NULLS`/`QUOTED_IDENTIFIER` are dropped and the
/// remaining batches are re-joined with `GO`. A single-batch file comes back
/// trimmed, without any `GO` line.
pub fn definition_text(file_content: &str) -> String {
    let kept: Vec<&str> = split_batches(file_content)
        .into_iter()
        .map(|b| b.content.trim())
        .filter(|b| !is_session_option_batch(b))
        .collect();
    kept.join("\nGO\n")
}

fn is_session_option_batch(batch: &str) -> bool {
    let stripped = table_parser::strip_comments(batch);
    let statements: Vec<&str> = stripped
        .split([';', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    !statements.is_empty()
        && statements.iter().all(|s| {
            SESSION_OPTION_PREFIXES
                .iter()
                .any(|p| crate::util::starts_with_ci(s, p))
        })
}
