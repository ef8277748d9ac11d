//! Typed values of simple content
//!
//! Identity constraints compare field values by value, not by lexical
//! form: `1` and `1.0` are the same xs:decimal, `0A` and `0a` the same
//! xs:hexBinary. This module covers the built-in types a key field is
//! realistically declared with and parses lexical values into
//! [`AtomicValue`]s.
//!
//! Values of different primitive types never compare equal; the integer
//! family derives from xs:decimal and shares its value space.

use std::fmt;
use std::hash::{Hash, Hasher};

use base64::Engine;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::names::is_valid_ncname;
use crate::namespaces::{NamespaceContext, QName};

lazy_static::lazy_static! {
    static ref LANGUAGE_REGEX: Regex =
        Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").expect("language pattern is valid");
    static ref DECIMAL_REGEX: Regex =
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("decimal pattern is valid");
    static ref INTEGER_REGEX: Regex = Regex::new(r"^[+-]?\d+$").expect("integer pattern is valid");
    static ref FLOAT_REGEX: Regex = Regex::new(r"^([+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?|-?INF|NaN)$")
        .expect("float pattern is valid");
    static ref HEX_BINARY_REGEX: Regex = Regex::new(r"^([0-9a-fA-F]{2})*$").expect("hexBinary pattern is valid");
    static ref DATE_REGEX: Regex =
        Regex::new(r"^(-?\d{4,}-\d{2}-\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("date pattern is valid");
    static ref DATETIME_REGEX: Regex = Regex::new(
        r"^(-?\d{4,}-\d{2}-\d{2})T(\d{2}:\d{2}:\d{2}(\.\d+)?)(Z|[+-]\d{2}:\d{2})?$"
    )
    .expect("dateTime pattern is valid");
}

/// Built-in atomic types usable as key field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    /// xs:string
    String,
    /// xs:normalizedString
    NormalizedString,
    /// xs:token
    Token,
    /// xs:language
    Language,
    /// xs:NMTOKEN
    NmToken,
    /// xs:Name
    Name,
    /// xs:NCName
    NCName,
    /// xs:ID
    Id,
    /// xs:IDREF
    IdRef,
    /// xs:anyURI
    AnyUri,
    /// xs:boolean
    Boolean,
    /// xs:decimal
    Decimal,
    /// xs:integer
    Integer,
    /// xs:long
    Long,
    /// xs:int
    Int,
    /// xs:short
    Short,
    /// xs:byte
    Byte,
    /// xs:nonNegativeInteger
    NonNegativeInteger,
    /// xs:positiveInteger
    PositiveInteger,
    /// xs:nonPositiveInteger
    NonPositiveInteger,
    /// xs:negativeInteger
    NegativeInteger,
    /// xs:unsignedLong
    UnsignedLong,
    /// xs:unsignedInt
    UnsignedInt,
    /// xs:unsignedShort
    UnsignedShort,
    /// xs:unsignedByte
    UnsignedByte,
    /// xs:float
    Float,
    /// xs:double
    Double,
    /// xs:date
    Date,
    /// xs:dateTime
    DateTime,
    /// xs:hexBinary
    HexBinary,
    /// xs:base64Binary
    Base64Binary,
    /// xs:QName
    QName,
}

/// Whitespace handling applied before parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Keep as is
    Preserve,
    /// Tabs and newlines become spaces
    Replace,
    /// Replace, then trim and squeeze runs of spaces
    Collapse,
}

impl WhiteSpace {
    /// Apply the normalization
    pub fn normalize(&self, value: &str) -> String {
        match self {
            Self::Preserve => value.to_string(),
            Self::Replace => value.replace(['\t', '\n', '\r'], " "),
            Self::Collapse => value.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

impl AtomicType {
    /// Look a built-in type up by its local name (`"decimal"`, `"ID"`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let local = name.rsplit(':').next().unwrap_or(name);
        Some(match local {
            "string" => Self::String,
            "normalizedString" => Self::NormalizedString,
            "token" => Self::Token,
            "language" => Self::Language,
            "NMTOKEN" => Self::NmToken,
            "Name" => Self::Name,
            "NCName" => Self::NCName,
            "ID" => Self::Id,
            "IDREF" => Self::IdRef,
            "anyURI" => Self::AnyUri,
            "boolean" => Self::Boolean,
            "decimal" => Self::Decimal,
            "integer" => Self::Integer,
            "long" => Self::Long,
            "int" => Self::Int,
            "short" => Self::Short,
            "byte" => Self::Byte,
            "nonNegativeInteger" => Self::NonNegativeInteger,
            "positiveInteger" => Self::PositiveInteger,
            "nonPositiveInteger" => Self::NonPositiveInteger,
            "negativeInteger" => Self::NegativeInteger,
            "unsignedLong" => Self::UnsignedLong,
            "unsignedInt" => Self::UnsignedInt,
            "unsignedShort" => Self::UnsignedShort,
            "unsignedByte" => Self::UnsignedByte,
            "float" => Self::Float,
            "double" => Self::Double,
            "date" => Self::Date,
            "dateTime" => Self::DateTime,
            "hexBinary" => Self::HexBinary,
            "base64Binary" => Self::Base64Binary,
            "QName" => Self::QName,
            _ => return None,
        })
    }

    /// The XSD local name of the type
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::NormalizedString => "normalizedString",
            Self::Token => "token",
            Self::Language => "language",
            Self::NmToken => "NMTOKEN",
            Self::Name => "Name",
            Self::NCName => "NCName",
            Self::Id => "ID",
            Self::IdRef => "IDREF",
            Self::AnyUri => "anyURI",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Int => "int",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::PositiveInteger => "positiveInteger",
            Self::NonPositiveInteger => "nonPositiveInteger",
            Self::NegativeInteger => "negativeInteger",
            Self::UnsignedLong => "unsignedLong",
            Self::UnsignedInt => "unsignedInt",
            Self::UnsignedShort => "unsignedShort",
            Self::UnsignedByte => "unsignedByte",
            Self::Float => "float",
            Self::Double => "double",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::HexBinary => "hexBinary",
            Self::Base64Binary => "base64Binary",
            Self::QName => "QName",
        }
    }

    /// Whether the type is xs:decimal or derived from it
    pub fn is_decimal(&self) -> bool {
        self.integer_bounds().is_some() || matches!(self, Self::Decimal | Self::Integer)
    }

    /// Whitespace facet of the type
    pub fn white_space(&self) -> WhiteSpace {
        match self {
            Self::String => WhiteSpace::Preserve,
            Self::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    fn integer_bounds(&self) -> Option<(Option<i64>, Option<u64>)> {
        let bounds = match self {
            Self::Long => (Some(i64::MIN), Some(i64::MAX as u64)),
            Self::Int => (Some(i32::MIN as i64), Some(i32::MAX as u64)),
            Self::Short => (Some(i16::MIN as i64), Some(i16::MAX as u64)),
            Self::Byte => (Some(i8::MIN as i64), Some(i8::MAX as u64)),
            Self::NonNegativeInteger => (Some(0), None),
            Self::PositiveInteger => (Some(1), None),
            Self::NonPositiveInteger => (None, Some(0)),
            Self::NegativeInteger => (None, None),
            Self::UnsignedLong => (Some(0), Some(u64::MAX)),
            Self::UnsignedInt => (Some(0), Some(u32::MAX as u64)),
            Self::UnsignedShort => (Some(0), Some(u16::MAX as u64)),
            Self::UnsignedByte => (Some(0), Some(u8::MAX as u64)),
            _ => return None,
        };
        Some(bounds)
    }

    /// Parse a lexical value
    ///
    /// `namespaces` is only consulted for xs:QName values.
    pub fn parse(&self, value: &str, namespaces: &NamespaceContext) -> Result<AtomicValue> {
        let value = self.white_space().normalize(value);
        let lexical = value.clone();
        let invalid = |reason: &str| {
            Error::Value(format!("'{}' is not a valid xs:{}: {}", value, self.name(), reason))
        };

        match self {
            Self::String | Self::NormalizedString | Self::Token | Self::AnyUri => {
                Ok(AtomicValue::String(value))
            }
            Self::Language => {
                if LANGUAGE_REGEX.is_match(&value) {
                    Ok(AtomicValue::String(value))
                } else {
                    Err(invalid("not a language tag"))
                }
            }
            Self::NmToken => {
                let valid = !value.is_empty()
                    && value
                        .chars()
                        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
                if valid {
                    Ok(AtomicValue::String(value))
                } else {
                    Err(invalid("not a name token"))
                }
            }
            Self::Name => {
                if value.split(':').all(is_valid_ncname) {
                    Ok(AtomicValue::String(value))
                } else {
                    Err(invalid("not an XML name"))
                }
            }
            Self::NCName | Self::Id | Self::IdRef => {
                if is_valid_ncname(&value) {
                    Ok(AtomicValue::String(value))
                } else {
                    Err(invalid("not an NCName"))
                }
            }
            Self::Boolean => match value.as_str() {
                "true" | "1" => Ok(AtomicValue::Boolean(true)),
                "false" | "0" => Ok(AtomicValue::Boolean(false)),
                _ => Err(invalid("expected true, false, 1 or 0")),
            },
            Self::Decimal => {
                if !DECIMAL_REGEX.is_match(&value) {
                    return Err(invalid("not a decimal number"));
                }
                parse_decimal(&value)
                    .map(AtomicValue::Decimal)
                    .ok_or_else(|| invalid("out of range"))
            }
            Self::Integer
            | Self::Long
            | Self::Int
            | Self::Short
            | Self::Byte
            | Self::NonNegativeInteger
            | Self::PositiveInteger
            | Self::NonPositiveInteger
            | Self::NegativeInteger
            | Self::UnsignedLong
            | Self::UnsignedInt
            | Self::UnsignedShort
            | Self::UnsignedByte => {
                if !INTEGER_REGEX.is_match(&value) {
                    return Err(invalid("not an integer"));
                }
                parse_decimal(&value)
                    .map(AtomicValue::Decimal)
                    .ok_or_else(|| invalid("out of range"))
            }
            Self::Float | Self::Double => {
                if !FLOAT_REGEX.is_match(&value) {
                    return Err(invalid("not a floating point number"));
                }
                let number = match value.as_str() {
                    "INF" => f64::INFINITY,
                    "-INF" => f64::NEG_INFINITY,
                    "NaN" => f64::NAN,
                    other => other.parse::<f64>().map_err(|_| invalid("not a number"))?,
                };
                if *self == Self::Float {
                    Ok(AtomicValue::Float(number as f32))
                } else {
                    Ok(AtomicValue::Double(number))
                }
            }
            Self::Date => {
                let captures = DATE_REGEX
                    .captures(&value)
                    .ok_or_else(|| invalid("expected YYYY-MM-DD"))?;
                let date = NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d")
                    .map_err(|_| invalid("no such date"))?;
                let offset = captures
                    .get(2)
                    .map(|tz| parse_offset(tz.as_str()))
                    .transpose()
                    .map_err(|_| invalid("bad timezone"))?;
                Ok(AtomicValue::Date { date, offset })
            }
            Self::DateTime => {
                let captures = DATETIME_REGEX
                    .captures(&value)
                    .ok_or_else(|| invalid("expected YYYY-MM-DDThh:mm:ss"))?;
                let date = NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d")
                    .map_err(|_| invalid("no such date"))?;
                let time = NaiveTime::parse_from_str(&captures[2], "%H:%M:%S%.f")
                    .map_err(|_| invalid("no such time"))?;
                let offset = captures
                    .get(4)
                    .map(|tz| parse_offset(tz.as_str()))
                    .transpose()
                    .map_err(|_| invalid("bad timezone"))?;
                Ok(AtomicValue::DateTime {
                    value: date.and_time(time),
                    offset,
                })
            }
            Self::HexBinary => {
                if !HEX_BINARY_REGEX.is_match(&value) {
                    return Err(invalid("not a hexadecimal encoding"));
                }
                (0..value.len())
                    .step_by(2)
                    .map(|i| u8::from_str_radix(&value[i..i + 2], 16))
                    .collect::<std::result::Result<Vec<u8>, _>>()
                    .map(AtomicValue::HexBinary)
                    .map_err(|_| invalid("not a hexadecimal encoding"))
            }
            Self::Base64Binary => {
                let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .map(AtomicValue::Base64Binary)
                    .map_err(|_| invalid("not a base64 encoding"))
            }
            Self::QName => {
                let name = namespaces.resolve(&value).map_err(|err| invalid(&err.to_string()))?;
                Ok(AtomicValue::QName(name))
            }
        }
        .and_then(|parsed| self.check_bounds(parsed, &lexical))
    }

    fn check_bounds(&self, parsed: AtomicValue, lexical: &str) -> Result<AtomicValue> {
        let (Some((min, max)), AtomicValue::Decimal(number)) = (self.integer_bounds(), &parsed) else {
            return Ok(parsed);
        };
        if !INTEGER_REGEX.is_match(lexical) {
            return Err(Error::Value(format!(
                "'{}' is not a valid xs:{}: not an integer",
                lexical,
                self.name()
            )));
        }
        let below = min.map_or(false, |min| *number < Decimal::from(min));
        let above = max.map_or(false, |max| *number > Decimal::from(max));
        let sign = match self {
            Self::NegativeInteger => number.is_sign_negative() && !number.is_zero(),
            _ => true,
        };
        if below || above || !sign {
            return Err(Error::Value(format!(
                "'{}' is not a valid xs:{}: value out of range",
                lexical,
                self.name()
            )));
        }
        Ok(parsed)
    }
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name())
    }
}

fn parse_decimal(value: &str) -> Option<Decimal> {
    let unsigned = value.strip_prefix('+').unwrap_or(value);
    let mut text = String::with_capacity(unsigned.len() + 2);
    match unsigned.strip_prefix('-') {
        Some(rest) => {
            text.push('-');
            if rest.starts_with('.') {
                text.push('0');
            }
            text.push_str(rest);
        }
        None => {
            if unsigned.starts_with('.') {
                text.push('0');
            }
            text.push_str(unsigned);
        }
    }
    if text.ends_with('.') {
        text.push('0');
    }
    text.parse::<Decimal>().ok()
}

fn parse_offset(tz: &str) -> std::result::Result<FixedOffset, ()> {
    if tz == "Z" {
        return FixedOffset::east_opt(0).ok_or(());
    }
    let sign = if tz.starts_with('-') { -1 } else { 1 };
    let hours: i32 = tz.get(1..3).and_then(|h| h.parse().ok()).ok_or(())?;
    let minutes: i32 = tz.get(4..6).and_then(|m| m.parse().ok()).ok_or(())?;
    if hours > 14 || minutes > 59 {
        return Err(());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or(())
}

/// Simple type of a key field: an atomic type or a list of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimpleType {
    /// The atomic (item) type
    pub item: AtomicType,
    /// Whether values are whitespace separated lists of items
    pub is_list: bool,
}

impl SimpleType {
    /// An atomic type
    pub fn atomic(item: AtomicType) -> Self {
        Self { item, is_list: false }
    }

    /// A list type
    pub fn list(item: AtomicType) -> Self {
        Self { item, is_list: true }
    }

    /// Parse a lexical value into its items
    pub fn parse(&self, value: &str, namespaces: &NamespaceContext) -> Result<Vec<AtomicValue>> {
        if self.is_list {
            value
                .split_whitespace()
                .map(|item| self.item.parse(item, namespaces))
                .collect()
        } else {
            Ok(vec![self.item.parse(value, namespaces)?])
        }
    }
}

impl From<AtomicType> for SimpleType {
    fn from(item: AtomicType) -> Self {
        Self::atomic(item)
    }
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_list {
            write!(f, "list of {}", self.item)
        } else {
            write!(f, "{}", self.item)
        }
    }
}

/// A parsed atomic value
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicValue {
    /// Anything in the string family, or an untyped value
    String(String),
    /// xs:boolean
    Boolean(bool),
    /// xs:decimal and the integer types
    Decimal(Decimal),
    /// xs:float
    Float(f32),
    /// xs:double
    Double(f64),
    /// xs:date
    Date {
        /// Calendar date
        date: NaiveDate,
        /// Timezone, if any
        offset: Option<FixedOffset>,
    },
    /// xs:dateTime
    DateTime {
        /// Local date and time
        value: NaiveDateTime,
        /// Timezone, if any
        offset: Option<FixedOffset>,
    },
    /// xs:hexBinary
    HexBinary(Vec<u8>),
    /// xs:base64Binary
    Base64Binary(Vec<u8>),
    /// xs:QName
    QName(QName),
}

/// Value-space view of an atomic value, used for key comparison
#[derive(PartialEq, Eq, Hash)]
enum Normalized<'a> {
    String(&'a str),
    Boolean(bool),
    Decimal(Decimal),
    Float(u32),
    Double(u64),
    Date(NaiveDate, Option<i32>),
    DateTime(NaiveDateTime, bool),
    HexBinary(&'a [u8]),
    Base64Binary(&'a [u8]),
    QName(&'a QName),
}

impl AtomicValue {
    fn normalized(&self) -> Normalized<'_> {
        match self {
            Self::String(s) => Normalized::String(s),
            Self::Boolean(b) => Normalized::Boolean(*b),
            Self::Decimal(d) => Normalized::Decimal(d.normalize()),
            // +0 and -0 are the same value
            Self::Float(f) => Normalized::Float(if *f == 0.0 { 0 } else { f.to_bits() }),
            Self::Double(d) => Normalized::Double(if *d == 0.0 { 0 } else { d.to_bits() }),
            Self::Date { date, offset } => {
                Normalized::Date(*date, offset.map(|o| o.local_minus_utc()))
            }
            Self::DateTime { value, offset } => match offset {
                Some(offset) => {
                    let utc = *value - chrono::Duration::seconds(offset.local_minus_utc() as i64);
                    Normalized::DateTime(utc, true)
                }
                None => Normalized::DateTime(*value, false),
            },
            Self::HexBinary(bytes) => Normalized::HexBinary(bytes),
            Self::Base64Binary(bytes) => Normalized::Base64Binary(bytes),
            Self::QName(name) => Normalized::QName(name),
        }
    }

    /// Equality in the value space; values of unrelated types are unequal
    pub fn key_eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }

    /// Hash consistent with [`key_eq`](Self::key_eq)
    pub fn key_hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for AtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Date { date, offset } => match offset {
                Some(offset) => write!(f, "{}{}", date, offset),
                None => write!(f, "{}", date),
            },
            Self::DateTime { value, offset } => match offset {
                Some(offset) => write!(f, "{}{}", value.format("%Y-%m-%dT%H:%M:%S%.f"), offset),
                None => write!(f, "{}", value.format("%Y-%m-%dT%H:%M:%S%.f")),
            },
            Self::HexBinary(bytes) => {
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Self::Base64Binary(bytes) => {
                write!(f, "{}", base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Self::QName(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(ty: AtomicType, value: &str) -> Result<AtomicValue> {
        ty.parse(value, &NamespaceContext::new())
    }

    #[test]
    fn test_from_name() {
        assert_eq!(AtomicType::from_name("decimal"), Some(AtomicType::Decimal));
        assert_eq!(AtomicType::from_name("xs:ID"), Some(AtomicType::Id));
        assert_eq!(AtomicType::from_name("duration"), None);
        assert_eq!(AtomicType::Integer.to_string(), "xs:integer");
    }

    #[test]
    fn test_decimal_value_space() {
        let one = parse(AtomicType::Decimal, "1").unwrap();
        let one_point_zero = parse(AtomicType::Decimal, "1.0").unwrap();
        let plus_one = parse(AtomicType::Decimal, " +1. ").unwrap();
        assert!(one.key_eq(&one_point_zero));
        assert!(one.key_eq(&plus_one));
        assert!(parse(AtomicType::Decimal, ".5").is_ok());
        assert!(parse(AtomicType::Decimal, "1e3").is_err());
    }

    #[test]
    fn test_integer_family() {
        let integer = parse(AtomicType::Integer, "42").unwrap();
        let decimal = parse(AtomicType::Decimal, "42.00").unwrap();
        assert!(integer.key_eq(&decimal));

        assert!(parse(AtomicType::Integer, "4.2").is_err());
        assert!(parse(AtomicType::Byte, "127").is_ok());
        assert!(parse(AtomicType::Byte, "128").is_err());
        assert!(parse(AtomicType::UnsignedShort, "-1").is_err());
        assert!(parse(AtomicType::PositiveInteger, "0").is_err());
        assert!(parse(AtomicType::NegativeInteger, "-1").is_ok());
        assert!(parse(AtomicType::NegativeInteger, "0").is_err());
        assert!(parse(AtomicType::UnsignedLong, "18446744073709551615").is_ok());
        assert!(AtomicType::Short.is_decimal());
        assert!(!AtomicType::Double.is_decimal());
    }

    #[test]
    fn test_incomparable_types() {
        let decimal = parse(AtomicType::Decimal, "1").unwrap();
        let string = parse(AtomicType::String, "1").unwrap();
        let double = parse(AtomicType::Double, "1").unwrap();
        let boolean = parse(AtomicType::Boolean, "1").unwrap();
        assert!(!decimal.key_eq(&string));
        assert!(!decimal.key_eq(&double));
        assert!(!decimal.key_eq(&boolean));
    }

    #[test]
    fn test_floats() {
        assert_eq!(parse(AtomicType::Double, "INF").unwrap(), AtomicValue::Double(f64::INFINITY));
        assert!(parse(AtomicType::Double, "inf").is_err());
        assert!(parse(AtomicType::Float, "1.5e2").is_ok());
        let zero = parse(AtomicType::Double, "0").unwrap();
        let negative_zero = parse(AtomicType::Double, "-0.0").unwrap();
        assert!(zero.key_eq(&negative_zero));
    }

    #[test]
    fn test_whitespace() {
        assert_eq!(
            parse(AtomicType::Token, "  a \n b ").unwrap(),
            AtomicValue::String("a b".to_string())
        );
        assert_eq!(
            parse(AtomicType::String, " a ").unwrap(),
            AtomicValue::String(" a ".to_string())
        );
        assert_eq!(
            parse(AtomicType::NormalizedString, "a\tb").unwrap(),
            AtomicValue::String("a b".to_string())
        );
    }

    #[test]
    fn test_names_and_language() {
        assert!(parse(AtomicType::Language, "en-US").is_ok());
        assert!(parse(AtomicType::Language, "english language").is_err());
        assert!(parse(AtomicType::Id, "id1").is_ok());
        assert!(parse(AtomicType::Id, "1id").is_err());
        assert!(parse(AtomicType::NmToken, "1.x").is_ok());
    }

    #[test]
    fn test_dates() {
        let utc = parse(AtomicType::DateTime, "2002-10-10T17:00:00Z").unwrap();
        let shifted = parse(AtomicType::DateTime, "2002-10-10T12:00:00-05:00").unwrap();
        let local = parse(AtomicType::DateTime, "2002-10-10T17:00:00").unwrap();
        assert!(utc.key_eq(&shifted));
        assert!(!utc.key_eq(&local));
        assert!(parse(AtomicType::DateTime, "2002-10-10T17:00:00.5").is_ok());

        assert!(parse(AtomicType::Date, "2002-02-30").is_err());
        assert!(parse(AtomicType::Date, "2002-02-28+01:00").is_ok());
    }

    #[test]
    fn test_binary() {
        let upper = parse(AtomicType::HexBinary, "0AFF").unwrap();
        let lower = parse(AtomicType::HexBinary, "0aff").unwrap();
        assert!(upper.key_eq(&lower));
        assert!(parse(AtomicType::HexBinary, "ABC").is_err());
        assert_eq!(upper.to_string(), "0AFF");

        let base64 = parse(AtomicType::Base64Binary, "CvE=").unwrap();
        assert_eq!(base64, AtomicValue::Base64Binary(vec![0x0a, 0xf1]));
        assert!(!base64.key_eq(&parse(AtomicType::HexBinary, "0AF1").unwrap()));
    }

    #[test]
    fn test_qname_values() {
        let namespaces = NamespaceContext::new().with_prefix("p", "urn:p");
        let value = AtomicType::QName.parse("p:item", &namespaces).unwrap();
        assert_eq!(value, AtomicValue::QName(QName::namespaced("urn:p", "item")));
        assert!(AtomicType::QName.parse("q:item", &namespaces).is_err());
    }

    #[test]
    fn test_list_type() {
        let list = SimpleType::list(AtomicType::Integer);
        let items = list.parse(" 1 2  3 ", &NamespaceContext::new()).unwrap();
        assert_eq!(items.len(), 3);
        assert!(list.parse("1 x", &NamespaceContext::new()).is_err());
        assert_eq!(list.to_string(), "list of xs:integer");
    }
}
