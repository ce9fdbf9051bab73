// src/services/query_validator.rs
use regex::Regex;
use thiserror::Error;

/// Why a query was refused. The Display text is sent to the client as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Query cannot be empty")]
    Empty,
    #[error("Query too long (max {max} characters)")]
    TooLong { max: usize },
    #[error("Invalid characters in query")]
    InvalidCharacters,
}

/// Length and character-set checks applied to every chat query.
///
/// SQL keywords are not filtered here: a query such as `DROP TABLE Employees`
/// passes, and the read-only store connection is what refuses to execute it.
#[derive(Debug, Clone)]
pub struct QueryValidator {
    max_length: usize,
    allowed: Regex,
}

impl QueryValidator {
    pub fn new(max_length: usize, allowed_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            max_length,
            allowed: Regex::new(allowed_pattern)?,
        })
    }

    /// Trim `raw` and check it. First failing rule wins; on success the
    /// trimmed query is returned.
    pub fn validate<'a>(&self, raw: &'a str) -> Result<&'a str, ValidationError> {
        let query = raw.trim_matches(is_query_whitespace);
        if query.is_empty() {
            return Err(ValidationError::Empty);
        }
        if query.chars().count() > self.max_length {
            return Err(ValidationError::TooLong { max: self.max_length });
        }
        if !self.allowed.is_match(query) {
            return Err(ValidationError::InvalidCharacters);
        }
        Ok(query)
    }
}

/// Unicode whitespace plus the ASCII separators U+001C..=U+001F, which
/// `char::is_whitespace` leaves out.
fn is_query_whitespace(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}
