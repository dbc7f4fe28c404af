//! Built-in XSD datatypes understood by the validator.

use crate::number::parse_double;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    AnyType,
    AnySimpleType,
    String,
    NormalizedString,
    Token,
    Boolean,
    Double,
    Float,
    Decimal,
    Integer,
    Long,
    Int,
    NonNegativeInteger,
    PositiveInteger,
}

impl BuiltinType {
    pub fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "anyType" => BuiltinType::AnyType,
            "anySimpleType" => BuiltinType::AnySimpleType,
            "string" => BuiltinType::String,
            "normalizedString" => BuiltinType::NormalizedString,
            "token" => BuiltinType::Token,
            "boolean" => BuiltinType::Boolean,
            "double" => BuiltinType::Double,
            "float" => BuiltinType::Float,
            "decimal" => BuiltinType::Decimal,
            "integer" => BuiltinType::Integer,
            "long" => BuiltinType::Long,
            "int" => BuiltinType::Int,
            "nonNegativeInteger" => BuiltinType::NonNegativeInteger,
            "positiveInteger" => BuiltinType::PositiveInteger,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::AnyType => "anyType",
            BuiltinType::AnySimpleType => "anySimpleType",
            BuiltinType::String => "string",
            BuiltinType::NormalizedString => "normalizedString",
            BuiltinType::Token => "token",
            BuiltinType::Boolean => "boolean",
            BuiltinType::Double => "double",
            BuiltinType::Float => "float",
            BuiltinType::Decimal => "decimal",
            BuiltinType::Integer => "integer",
            BuiltinType::Long => "long",
            BuiltinType::Int => "int",
            BuiltinType::NonNegativeInteger => "nonNegativeInteger",
            BuiltinType::PositiveInteger => "positiveInteger",
        }
    }

    /// Applies the type's whitespace facet (preserve, replace or collapse).
    pub fn normalize(self, value: &str) -> String {
        match self {
            BuiltinType::AnyType | BuiltinType::AnySimpleType | BuiltinType::String => value.to_owned(),
            BuiltinType::NormalizedString => replace_whitespace(value),
            _ => collapse_whitespace(value),
        }
    }

    /// Checks an already normalized lexical value.
    pub fn check(self, lexical: &str) -> Result<(), String> {
        let ok = match self {
            BuiltinType::AnyType
            | BuiltinType::AnySimpleType
            | BuiltinType::String
            | BuiltinType::NormalizedString
            | BuiltinType::Token => true,
            BuiltinType::Boolean => matches!(lexical, "true" | "false" | "1" | "0"),
            BuiltinType::Double | BuiltinType::Float => parse_double(lexical).is_some(),
            BuiltinType::Decimal => is_decimal(lexical),
            BuiltinType::Integer => is_integer(lexical),
            BuiltinType::Long => is_integer(lexical) && lexical.parse::<i64>().is_ok(),
            BuiltinType::Int => is_integer(lexical) && lexical.parse::<i32>().is_ok(),
            BuiltinType::NonNegativeInteger => is_integer(lexical) && !is_negative(lexical),
            BuiltinType::PositiveInteger => {
                is_integer(lexical) && !is_negative(lexical) && lexical.bytes().any(|b| (b'1'..=b'9').contains(&b))
            }
        };
        if ok { Ok(()) } else { Err(format!("not a valid xs:{}", self.name())) }
    }

    /// Numeric value for range facets; `None` for non-numeric types.
    pub fn numeric_value(self, lexical: &str) -> Option<f64> {
        match self {
            BuiltinType::Double | BuiltinType::Float => parse_double(lexical),
            BuiltinType::Decimal
            | BuiltinType::Integer
            | BuiltinType::Long
            | BuiltinType::Int
            | BuiltinType::NonNegativeInteger
            | BuiltinType::PositiveInteger => lexical.parse::<f64>().ok(),
            _ => None,
        }
    }
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(['+', '-']).unwrap_or(s)
}

fn is_negative(s: &str) -> bool {
    s.starts_with('-') && s.bytes().any(|b| (b'1'..=b'9').contains(&b))
}

fn is_integer(s: &str) -> bool {
    let digits = strip_sign(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(s: &str) -> bool {
    let body = strip_sign(s);
    let (int, frac) = body.split_once('.').unwrap_or((body, ""));
    (!int.is_empty() || !frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn replace_whitespace(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            '\t' | '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

pub(crate) fn collapse_whitespace(input: &str) -> String {
    input.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}
