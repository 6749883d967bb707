//! Attribute key parsing
//!
//! Keys are either a bare column name or `table.column`.

use crate::model::is_identifier;

/// A parsed attribute key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKey<'a> {
    Unqualified(&'a str),
    Qualified { table: &'a str, column: &'a str },
    Invalid { reason: &'static str },
}

impl<'a> AttributeKey<'a> {
    pub fn parse(key: &'a str) -> Self {
        let mut segments = key.split('.');
        let first = segments.next().unwrap_or("");
        let second = segments.next();

        if segments.next().is_some() {
            return AttributeKey::Invalid {
                reason: "more than one qualifier segment",
            };
        }

        match second {
            None if is_identifier(first) => AttributeKey::Unqualified(first),
            None => AttributeKey::Invalid {
                reason: "not a valid column name",
            },
            Some(column) if first.is_empty() || column.is_empty() => AttributeKey::Invalid {
                reason: "empty segment",
            },
            Some(column) if is_identifier(first) && is_identifier(column) => {
                AttributeKey::Qualified {
                    table: first,
                    column,
                }
            }
            Some(_) => AttributeKey::Invalid {
                reason: "not a valid qualified column name",
            },
        }
    }

    /// The column part of a valid key
    pub fn column(&self) -> Option<&'a str> {
        match self {
            AttributeKey::Unqualified(column) => Some(*column),
            AttributeKey::Qualified { column, .. } => Some(*column),
            AttributeKey::Invalid { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unqualified() {
        assert_eq!(AttributeKey::parse("city"), AttributeKey::Unqualified("city"));
        assert_eq!(AttributeKey::parse("city").column(), Some("city"));
    }

    #[test]
    fn test_qualified() {
        assert_eq!(
            AttributeKey::parse("users_version.city"),
            AttributeKey::Qualified {
                table: "users_version",
                column: "city"
            }
        );
    }

    #[test]
    fn test_invalid_keys() {
        assert!(matches!(
            AttributeKey::parse("a.b.c"),
            AttributeKey::Invalid { reason: "more than one qualifier segment" }
        ));
        assert!(matches!(AttributeKey::parse(".city"), AttributeKey::Invalid { .. }));
        assert!(matches!(AttributeKey::parse("users."), AttributeKey::Invalid { .. }));
        assert!(matches!(AttributeKey::parse(""), AttributeKey::Invalid { .. }));
        assert!(matches!(AttributeKey::parse("drop table"), AttributeKey::Invalid { .. }));
        assert_eq!(AttributeKey::parse("x.y.z").column(), None);
    }
}
