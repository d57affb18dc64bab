//! Logical field types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of field types a model can declare.
///
/// Kinds are written in snake_case in model files. Parsing is
/// case-insensitive and accepts a few legacy spellings (`hash_md5`,
/// `increment_int`, `string_az`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldKind {
    String,
    StringAz,
    StringRegex,
    Integer,
    Long,
    Float,
    Boolean,
    IncrementInteger,
    IncrementLong,
    Timestamp,
    Date,
    DateAsString,
    Birthdate,
    Bytes,
    Hash,
    Uuid,
    Ip,
    Name,
    Country,
    City,
    Email,
    Phone,
}

impl FieldKind {
    pub const ALL: [FieldKind; 22] = [
        FieldKind::String,
        FieldKind::StringAz,
        FieldKind::StringRegex,
        FieldKind::Integer,
        FieldKind::Long,
        FieldKind::Float,
        FieldKind::Boolean,
        FieldKind::IncrementInteger,
        FieldKind::IncrementLong,
        FieldKind::Timestamp,
        FieldKind::Date,
        FieldKind::DateAsString,
        FieldKind::Birthdate,
        FieldKind::Bytes,
        FieldKind::Hash,
        FieldKind::Uuid,
        FieldKind::Ip,
        FieldKind::Name,
        FieldKind::Country,
        FieldKind::City,
        FieldKind::Email,
        FieldKind::Phone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::StringAz => "string_az",
            FieldKind::StringRegex => "string_regex",
            FieldKind::Integer => "integer",
            FieldKind::Long => "long",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::IncrementInteger => "increment_integer",
            FieldKind::IncrementLong => "increment_long",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Date => "date",
            FieldKind::DateAsString => "date_as_string",
            FieldKind::Birthdate => "birthdate",
            FieldKind::Bytes => "bytes",
            FieldKind::Hash => "hash",
            FieldKind::Uuid => "uuid",
            FieldKind::Ip => "ip",
            FieldKind::Name => "name",
            FieldKind::Country => "country",
            FieldKind::City => "city",
            FieldKind::Email => "email",
            FieldKind::Phone => "phone",
        }
    }

    /// Kinds whose values compare numerically in conditions.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Integer
                | FieldKind::Long
                | FieldKind::Float
                | FieldKind::IncrementInteger
                | FieldKind::IncrementLong
        )
    }

    /// Counter kinds return `base + ++count` and ignore value sets.
    pub fn is_counter(&self) -> bool {
        matches!(self, FieldKind::IncrementInteger | FieldKind::IncrementLong)
    }

    /// Kinds that sample from a reference dataset.
    pub fn is_dictionary(&self) -> bool {
        matches!(
            self,
            FieldKind::Name
                | FieldKind::Country
                | FieldKind::City
                | FieldKind::Email
                | FieldKind::Phone
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let kind = match normalized.as_str() {
            "hash_md5" | "hash_sha256" => FieldKind::Hash,
            "increment_int" => FieldKind::IncrementInteger,
            "bool" => FieldKind::Boolean,
            "int" => FieldKind::Integer,
            other => {
                return FieldKind::ALL
                    .iter()
                    .copied()
                    .find(|k| k.as_str() == other)
                    .ok_or_else(|| format!("unknown field type '{s}'"))
            }
        };
        Ok(kind)
    }
}

impl TryFrom<String> for FieldKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("STRING_AZ".parse::<FieldKind>(), Ok(FieldKind::StringAz));
        assert_eq!("Increment_Long".parse::<FieldKind>(), Ok(FieldKind::IncrementLong));
        assert_eq!("hash_md5".parse::<FieldKind>(), Ok(FieldKind::Hash));
    }

    #[test]
    fn test_every_kind_parses_from_its_name() {
        for kind in FieldKind::ALL {
            assert_eq!(kind.as_str().parse::<FieldKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_kind() {
        assert!("blob".parse::<FieldKind>().is_err());
    }
}
