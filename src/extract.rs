//! Extraction of numeric fields from captured process output.
//!
//! Two contracts are supported:
//! - positional: every match of a numeric-token pattern is collected in order and the k-th token is assigned
//!   to a fixed field. This is what the Monte Carlo executables print today (`avg payoff is 1.23`,
//!   `time elapsed : 0.45`), so token `0` is the average payoff and token `1` the elapsed time.
//! - keyed: `key=value` or `key: value` pairs, independent of their position in the output.

use crate::{Record, Value};
use regex::Regex;
use thiserror::Error;

/// Matches a simple `digits.digits` decimal token.
pub const NUMERIC_TOKEN_PATTERN: &str = r"\d+\.\d+";

/// Position of the average payoff token in the executable's output.
pub const PAYOFF_TOKEN: usize = 0;

/// Position of the elapsed time token in the executable's output.
pub const TIME_TOKEN: usize = 1;

//==============
// Errors

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("output has {found} numeric tokens but token #{needed} was requested")]
    TooFewTokens { needed: usize, found: usize },

    #[error("output has no numeric value for key `{key}`")]
    MissingKey { key: String },

    #[error("`{token}` is not a number")]
    BadNumber { token: String },

    #[error("invalid extraction pattern: {0}")]
    Pattern(String),
}

impl From<regex::Error> for ExtractError {
    fn from(e: regex::Error) -> Self {
        Self::Pattern(e.to_string())
    }
}

//=================
// Extraction

#[derive(Debug, Clone)]
enum Rule {
    Positional {
        pattern: Regex,
        fields: Vec<(String, usize)>,
    },
    Keyed {
        fields: Vec<(String, String, Regex)>,
    },
}

/// Maps captured output text to a [`Record`] of float fields.
#[derive(Debug, Clone)]
pub struct Extraction {
    rule: Rule,
}

impl Extraction {
    /// Positional extraction with the default [`NUMERIC_TOKEN_PATTERN`].
    pub fn positional<S: Into<String>>(fields: impl IntoIterator<Item = (S, usize)>) -> Self {
        Self::positional_with_pattern(NUMERIC_TOKEN_PATTERN, fields)
            .expect("default numeric pattern is valid")
    }

    /// Positional extraction with a custom token pattern. Each match of `pattern` is one token.
    pub fn positional_with_pattern<S: Into<String>>(
        pattern: &str,
        fields: impl IntoIterator<Item = (S, usize)>,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            rule: Rule::Positional {
                pattern: Regex::new(pattern)?,
                fields: fields.into_iter().map(|(n, p)| (n.into(), p)).collect(),
            },
        })
    }

    /// Keyed extraction: each `(field, key)` pair reads the number following `key=` or `key:`.
    pub fn keyed<S: Into<String>, K: AsRef<str>>(
        fields: impl IntoIterator<Item = (S, K)>,
    ) -> Result<Self, ExtractError> {
        let fields = fields
            .into_iter()
            .map(|(name, key)| -> Result<(String, String, Regex), ExtractError> {
                let key = key.as_ref();
                let re = Regex::new(&format!(
                    r"(?:^|[^\w]){}\s*[=:]\s*([-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)",
                    regex::escape(key)
                ))?;
                Ok((name.into(), key.to_owned(), re))
            })
            .collect::<Result<_, ExtractError>>()?;
        Ok(Self {
            rule: Rule::Keyed { fields },
        })
    }

    /// Names of the fields this extraction produces, in order.
    pub fn field_names(&self) -> Vec<&str> {
        match &self.rule {
            Rule::Positional { fields, .. } => fields.iter().map(|(n, _)| n.as_str()).collect(),
            Rule::Keyed { fields } => fields.iter().map(|(n, _, _)| n.as_str()).collect(),
        }
    }

    /// Extracts every configured field from `text`.
    ///
    /// # Errors
    /// - [`ExtractError::TooFewTokens`] if a positional field refers to a token beyond the last one present.
    /// - [`ExtractError::MissingKey`] if a keyed field's key does not appear.
    pub fn apply(&self, text: &str) -> Result<Record, ExtractError> {
        match &self.rule {
            Rule::Positional { pattern, fields } => {
                let tokens = numeric_tokens(pattern, text)?;
                log::trace!("extracted tokens {tokens:?}");

                // Validate the output shape before indexing.
                if let Some(needed) = fields.iter().map(|(_, p)| *p).max() {
                    if needed >= tokens.len() {
                        return Err(ExtractError::TooFewTokens {
                            needed,
                            found: tokens.len(),
                        });
                    }
                }

                Ok(fields
                    .iter()
                    .map(|(name, pos)| (name.clone(), Value::Float(tokens[*pos])))
                    .collect())
            }

            Rule::Keyed { fields } => fields
                .iter()
                .map(|(name, key, re)| -> Result<(String, Value), ExtractError> {
                    let cap = re
                        .captures(text)
                        .ok_or_else(|| ExtractError::MissingKey { key: key.clone() })?;
                    Ok((name.clone(), Value::Float(parse_number(&cap[1])?)))
                })
                .collect(),
        }
    }
}

/// Returns, in order, every match of `pattern` in `text` parsed as a number.
pub fn numeric_tokens(pattern: &Regex, text: &str) -> Result<Vec<f64>, ExtractError> {
    pattern
        .find_iter(text)
        .map(|m| parse_number(m.as_str()))
        .collect()
}

fn parse_number(token: &str) -> Result<f64, ExtractError> {
    token.parse().map_err(|_| ExtractError::BadNumber {
        token: token.to_owned(),
    })
}
