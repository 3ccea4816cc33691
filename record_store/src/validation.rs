//! Identifier validation
//!
//! Table and column names end up inside SQL text, so every name that does not
//! come from a derived record is validated here first. Generated statements
//! always double-quote identifiers, which makes reserved words usable.

use std::fmt;
use thiserror::Error;

/// PostgreSQL truncates identifiers longer than this many bytes
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// What an identifier names, for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Table,
    Column,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdentifierKind::Table => "table",
            IdentifierKind::Column => "column",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{kind} name is empty")]
    Empty { kind: IdentifierKind },

    #[error("{kind} name '{name}' is {length} bytes long, at most {max} are kept", max = MAX_IDENTIFIER_LENGTH)]
    TooLong {
        kind: IdentifierKind,
        name: String,
        length: usize,
    },

    #[error("{kind} name '{name}' must start with a letter or underscore")]
    InvalidStartCharacter { kind: IdentifierKind, name: String },

    #[error("{kind} name '{name}' contains {found:?}; use letters, digits and underscores")]
    InvalidCharacters {
        kind: IdentifierKind,
        name: String,
        found: char,
    },
}

fn check(kind: IdentifierKind, name: &str) -> Result<(), ValidationError> {
    let Some(first) = name.chars().next() else {
        return Err(ValidationError::Empty { kind });
    };
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            kind,
            name: name.to_string(),
            length: name.len(),
        });
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(ValidationError::InvalidStartCharacter {
            kind,
            name: name.to_string(),
        });
    }
    if let Some(found) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(ValidationError::InvalidCharacters {
            kind,
            name: name.to_string(),
            found,
        });
    }
    Ok(())
}

/// Double-quote an identifier for use in SQL text
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

macro_rules! validated_name {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new(name: &str) -> Result<Self, ValidationError> {
                check($kind, name)?;
                Ok(Self(name.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The name wrapped in double quotes
            pub fn quoted(&self) -> String {
                quote_identifier(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

validated_name!(
    /// Table name checked for use in SQL text
    ValidatedTableName,
    IdentifierKind::Table
);

validated_name!(
    /// Column or alias name checked for use in SQL text
    ValidatedFieldName,
    IdentifierKind::Column
);
