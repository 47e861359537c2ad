//! Custom descriptor tags.
//!
//! A tag identifies the meaning of a custom descriptor. Tags are eight bits
//! wide; a few values are reserved for meanings shared across libraries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Identifier of a custom descriptor's meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(u8);

impl Tag {
    /// Device serial number.
    pub const SERIALNO: Tag = Tag(0x00);

    /// Name and version of a library linked into the image.
    ///
    /// Every library registers under this same tag.
    pub const LIBVERSION: Tag = Tag(0x01);

    const NAMED: [(&'static str, Tag); 2] =
        [("serialno", Self::SERIALNO), ("libversion", Self::LIBVERSION)];

    /// Create a tag from its raw value.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// The raw tag value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// The well-known name of this tag, if it has one.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(_, tag)| *tag == self)
            .map(|(name, _)| *name)
    }
}

impl From<u8> for Tag {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let lower = input.to_ascii_lowercase();

        if let Some((_, tag)) = Self::NAMED.iter().find(|(name, _)| *name == lower) {
            return Ok(*tag);
        }

        let parsed = match lower.strip_prefix("0x") {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => lower.parse::<u8>(),
        };

        parsed.map(Tag).map_err(|_| Error::InvalidTag {
            input: input.to_string(),
        })
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => u8::try_from(n)
                .map(Tag)
                .map_err(|_| serde::de::Error::custom(format!("tag {n} does not fit in 8 bits"))),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_values() {
        assert_eq!(Tag::SERIALNO.raw(), 0x00);
        assert_eq!(Tag::LIBVERSION.raw(), 0x01);
    }

    #[test]
    fn test_display() {
        assert_eq!(Tag::SERIALNO.to_string(), "serialno");
        assert_eq!(Tag::LIBVERSION.to_string(), "libversion");
        assert_eq!(Tag::new(0x2a).to_string(), "0x2a");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("serialno".parse::<Tag>().unwrap(), Tag::SERIALNO);
        assert_eq!("LibVersion".parse::<Tag>().unwrap(), Tag::LIBVERSION);
        assert_eq!(" serialno ".parse::<Tag>().unwrap(), Tag::SERIALNO);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!("42".parse::<Tag>().unwrap(), Tag::new(42));
        assert_eq!("0x2A".parse::<Tag>().unwrap(), Tag::new(0x2a));
        assert_eq!("0".parse::<Tag>().unwrap(), Tag::SERIALNO);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "missing".parse::<Tag>(),
            Err(Error::InvalidTag { .. })
        ));
        assert!("256".parse::<Tag>().is_err());
        assert!("0x100".parse::<Tag>().is_err());
        assert!("".parse::<Tag>().is_err());
    }

    #[test]
    fn test_serde_accepts_name_and_number() {
        let from_name: Tag = serde_json::from_str(r#""libversion""#).unwrap();
        assert_eq!(from_name, Tag::LIBVERSION);

        let from_number: Tag = serde_json::from_str("16").unwrap();
        assert_eq!(from_number, Tag::new(16));

        assert!(serde_json::from_str::<Tag>("300").is_err());
    }

    #[test]
    fn test_serialize_as_text() {
        assert_eq!(serde_json::to_string(&Tag::SERIALNO).unwrap(), r#""serialno""#);
        assert_eq!(serde_json::to_string(&Tag::new(0x80)).unwrap(), r#""0x80""#);
    }
}
