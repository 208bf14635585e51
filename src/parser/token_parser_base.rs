//! Base token parser shared by the definition extractors.
//!
//! Wraps the sqlparser `MsSqlDialect` tokenizer and provides cursor-style
//! navigation. Specialized parsers (`object_parser`, `column_parser`,
//! `extended_property_parser`, `split::attribution`) compose a `TokenParser`
//! and delegate to it:
//!
//! ```ignore
//! let mut base = TokenParser::new("CREATE INDEX [IX_A] ON [dbo].[T] ([A])")?;
//! base.skip_whitespace();
//! base.expect_word_ci("CREATE")?;
//! ```

use sqlparser::dialect::MsSqlDialect;
use sqlparser::tokenizer::{Token, TokenWithSpan, Tokenizer};

use super::identifier_utils::format_token_sql;

/// Cursor over a tokenized T-SQL fragment.
pub struct TokenParser {
    tokens: Vec<TokenWithSpan>,
    pos: usize,
}

impl TokenParser {
    /// Tokenize `sql` with the MsSql dialect. Returns `None` if tokenization fails
    /// (for example an unterminated string literal).
    pub fn new(sql: &str) -> Option<Self> {
        let dialect = MsSqlDialect {};
        let tokens = Tokenizer::new(&dialect, sql)
            .tokenize_with_location()
            .ok()?;

        Some(Self { tokens, pos: 0 })
    }

    // ========================================================================
    // Position and state
    // ========================================================================

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    #[inline]
    pub fn tokens(&self) -> &[TokenWithSpan] {
        &self.tokens
    }

    #[inline]
    pub fn current_token(&self) -> Option<&TokenWithSpan> {
        self.tokens.get(self.pos)
    }

    #[inline]
    pub fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    // ========================================================================
    // Whitespace handling
    // ========================================================================

    /// Skip whitespace and comment tokens.
    pub fn skip_whitespace(&mut self) {
        while let Some(token) = self.current_token() {
            match &token.token {
                Token::Whitespace(_) => self.advance(),
                _ => break,
            }
        }
    }

    // ========================================================================
    // Token type checks
    // ========================================================================

    /// Check if the current token is an unquoted word matching `word` (case-insensitive).
    ///
    /// Bracketed identifiers never match, so `[Table]` is not mistaken for `TABLE`.
    #[inline]
    pub fn check_word_ci(&self, word: &str) -> bool {
        matches!(
            self.current_token().map(|t| &t.token),
            Some(Token::Word(w)) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(word)
        )
    }

    /// Check if the current token is any of the given unquoted words.
    pub fn check_any_word_ci(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.check_word_ci(w))
    }

    /// Check if the current token matches a token type (by discriminant).
    #[inline]
    pub fn check_token(&self, expected: &Token) -> bool {
        if let Some(token) = self.current_token() {
            std::mem::discriminant(&token.token) == std::mem::discriminant(expected)
        } else {
            false
        }
    }

    // ========================================================================
    // Expect methods (check and advance)
    // ========================================================================

    /// Expect an unquoted word, then skip any following whitespace.
    pub fn expect_word_ci(&mut self, word: &str) -> Option<()> {
        if self.check_word_ci(word) {
            self.advance();
            self.skip_whitespace();
            Some(())
        } else {
            None
        }
    }

    /// Consume the word if present; returns whether it was there.
    pub fn accept_word_ci(&mut self, word: &str) -> bool {
        self.expect_word_ci(word).is_some()
    }

    pub fn expect_token(&mut self, expected: &Token) -> Option<()> {
        if self.check_token(expected) {
            self.advance();
            self.skip_whitespace();
            Some(())
        } else {
            None
        }
    }

    // ========================================================================
    // Identifier parsing
    // ========================================================================

    /// Parse an identifier (bracketed, quoted or bare) without its delimiters.
    pub fn parse_identifier(&mut self) -> Option<String> {
        match &self.current_token()?.token {
            Token::Word(w) => {
                let name = w.value.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    /// Parse a dotted multi-part name such as `[dbo].[T].[Col]`.
    ///
    /// Returns the parts in order, without brackets. Whitespace after the
    /// name is consumed.
    pub fn parse_multipart_name(&mut self) -> Option<Vec<String>> {
        let mut parts = vec![self.parse_identifier()?];
        loop {
            let save = self.pos;
            self.skip_whitespace();
            if self.check_token(&Token::Period) {
                self.advance();
                self.skip_whitespace();
                match self.parse_identifier() {
                    Some(part) => parts.push(part),
                    None => {
                        self.pos = save;
                        break;
                    }
                }
            } else {
                self.pos = save;
                break;
            }
        }
        self.skip_whitespace();
        Some(parts)
    }

    /// Parse `[schema].[name]` or `[name]`. A missing schema defaults to `dbo`.
    pub fn parse_schema_qualified_name(&mut self) -> Option<(String, String)> {
        let mut parts = self.parse_multipart_name()?;
        let name = parts.pop()?;
        let schema = parts.pop().unwrap_or_else(|| "dbo".to_string());
        Some((schema, name))
    }

    // ========================================================================
    // Token string conversion
    // ========================================================================

    /// Convert a range of tokens back to SQL text, `end_pos` exclusive.
    pub fn tokens_to_string(&self, start_pos: usize, end_pos: usize) -> String {
        let end_pos = end_pos.min(self.tokens.len());
        if start_pos >= end_pos {
            return String::new();
        }
        self.tokens[start_pos..end_pos]
            .iter()
            .map(|t| format_token_sql(&t.token))
            .collect()
    }

    // ========================================================================
    // Utility methods
    // ========================================================================

    /// Advance until an unquoted word is found at parenthesis depth zero.
    ///
    /// The word is NOT consumed. Returns `false` if the end was reached.
    pub fn skip_to_word_ci(&mut self, word: &str) -> bool {
        let mut depth = 0i32;
        while !self.is_at_end() {
            if self.check_token(&Token::LParen) {
                depth += 1;
            } else if self.check_token(&Token::RParen) {
                depth -= 1;
            } else if depth <= 0 && self.check_word_ci(word) {
                return true;
            }
            self.advance();
        }
        false
    }

    /// Skip a parenthesized group, including nested parentheses.
    ///
    /// Position should be at the opening parenthesis.
    pub fn skip_parenthesized(&mut self) {
        let _ = self.consume_parenthesized();
    }

    /// Consume a parenthesized group and return its text, parentheses included.
    ///
    /// Returns `None` if not at a left parenthesis or if it is never closed.
    pub fn consume_parenthesized(&mut self) -> Option<String> {
        if !self.check_token(&Token::LParen) {
            return None;
        }

        let start_pos = self.pos;
        let mut depth = 0;

        while !self.is_at_end() {
            if self.check_token(&Token::LParen) {
                depth += 1;
            } else if self.check_token(&Token::RParen) {
                depth -= 1;
                if depth == 0 {
                    let end_pos = self.pos + 1;
                    self.advance();
                    return Some(self.tokens_to_string(start_pos, end_pos));
                }
            }
            self.advance();
        }

        None
    }
}
