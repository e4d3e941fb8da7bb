// Strong Types - newtype identifiers for every stored record
// Ids are 64-bit integers internally and travel as decimal strings in JSON,
// which keeps them exact for clients that parse numbers as doubles.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Raw value, as stored in SQLite
            pub fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(IdVisitor).map(Self)
            }
        }
    };
}

struct IdVisitor;

impl<'de> de::Visitor<'de> for IdVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a record id as a decimal string or integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        v.trim()
            .parse::<i64>()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }
}

record_id!(
    /// Identity of a signed-in user (password or anonymous)
    UserId
);
record_id!(PageId);
record_id!(ItemId);
record_id!(ViewId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_strings() {
        let id = PageId::new(7_000_000_000_123);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7000000000123\"");
    }

    #[test]
    fn ids_accept_strings_and_integers() {
        let from_str: ItemId = serde_json::from_str("\"42\"").unwrap();
        let from_int: ItemId = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, from_int);
        assert!(serde_json::from_str::<ItemId>("\"forty-two\"").is_err());
    }

    #[test]
    fn ids_parse_from_str() {
        assert_eq!("15".parse::<ViewId>().unwrap(), ViewId(15));
        assert!("x".parse::<UserId>().is_err());
    }
}
