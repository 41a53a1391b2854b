//! Byte sizes written the way operators write them in config ("32MB", "512KiB")

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty byte size")]
    Empty,

    #[error("invalid number in byte size: {0}")]
    InvalidNumber(String),

    #[error("unknown byte size unit: {0}")]
    InvalidUnit(String),

    #[error("byte size overflows u64: {0}")]
    Overflow(String),
}

const UNITS: &[(&str, u64)] = &[
    ("TB", 1 << 40),
    ("GB", 1 << 30),
    ("MB", 1 << 20),
    ("KB", 1 << 10),
];

/// A size in bytes. Units are binary: `1KB` is 1024 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const fn kib(n: u64) -> Self {
        Self(n << 10)
    }

    pub const fn mib(n: u64) -> Self {
        Self(n << 20)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

fn multiplier(unit: &str) -> Option<u64> {
    match unit {
        "" | "B" => Some(1),
        "K" | "KB" | "KIB" => Some(1 << 10),
        "M" | "MB" | "MIB" => Some(1 << 20),
        "G" | "GB" | "GIB" => Some(1 << 30),
        "T" | "TB" | "TIB" => Some(1 << 40),
        _ => None,
    }
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        if digits.is_empty() {
            return Err(ParseError::InvalidNumber(s.to_string()));
        }

        let value: u64 = digits
            .parse()
            .map_err(|_| ParseError::InvalidNumber(digits.to_string()))?;
        let unit = unit.trim().to_ascii_uppercase();
        let factor = multiplier(&unit).ok_or_else(|| ParseError::InvalidUnit(unit.clone()))?;

        value
            .checked_mul(factor)
            .map(ByteSize)
            .ok_or_else(|| ParseError::Overflow(s.to_string()))
    }
}

impl fmt::Display for ByteSize {
    /// Largest unit that divides the value exactly, so the output parses back
    /// to the same number of bytes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &(unit, factor) in UNITS {
            if self.0 != 0 && self.0 % factor == 0 {
                return write!(f, "{}{}", self.0 / factor, unit);
            }
        }
        write!(f, "{}B", self.0)
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = ByteSize;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a byte count or a size string such as \"32MB\"")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<ByteSize, E> {
                Ok(ByteSize(v))
            }

            // config-rs hands integers over as i64
            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<ByteSize, E> {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom(format!("byte size cannot be negative: {v}")))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<ByteSize, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Limits {
        max_body_bytes: ByteSize,
    }

    #[test]
    fn test_parse_with_units() {
        assert_eq!("512".parse::<ByteSize>().unwrap(), ByteSize(512));
        assert_eq!("512B".parse::<ByteSize>().unwrap(), ByteSize(512));
        assert_eq!("4kb".parse::<ByteSize>().unwrap(), ByteSize::kib(4));
        assert_eq!("32MB".parse::<ByteSize>().unwrap(), ByteSize::mib(32));
        assert_eq!("32 MiB".parse::<ByteSize>().unwrap(), ByteSize::mib(32));
        assert_eq!("2G".parse::<ByteSize>().unwrap(), ByteSize(2 << 30));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<ByteSize>(), Err(ParseError::Empty));
        assert!(matches!("MB".parse::<ByteSize>(), Err(ParseError::InvalidNumber(_))));
        assert!(matches!("10XB".parse::<ByteSize>(), Err(ParseError::InvalidUnit(_))));
        assert!(matches!(
            "99999999999TB".parse::<ByteSize>(),
            Err(ParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_display_uses_exact_unit() {
        assert_eq!(ByteSize::mib(32).to_string(), "32MB");
        assert_eq!(ByteSize(1536).to_string(), "1536B");
        assert_eq!(ByteSize::kib(3).to_string(), "3KB");
        assert_eq!(ByteSize(0).to_string(), "0B");
    }

    #[test]
    fn test_deserialize_from_toml() {
        let limits: Limits = toml::from_str(r#"max_body_bytes = "8MB""#).unwrap();
        assert_eq!(limits.max_body_bytes, ByteSize::mib(8));

        let limits: Limits = toml::from_str("max_body_bytes = 4096").unwrap();
        assert_eq!(limits.max_body_bytes, ByteSize(4096));

        assert!(toml::from_str::<Limits>("max_body_bytes = -1").is_err());
    }
}
