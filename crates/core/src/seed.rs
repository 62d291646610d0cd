//! Generation seed.
//!
//! The backend draws random seeds from the full unsigned 64-bit range and
//! uses `-1` on the wire to ask for one, so the value does not fit an `i64`.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire value meaning "let the server pick a random seed".
pub const RANDOM_SEED_WIRE: i64 = -1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Seed {
    #[default]
    Random,
    Fixed(u64),
}

impl Seed {
    pub fn is_random(self) -> bool {
        matches!(self, Self::Random)
    }

    pub fn fixed(self) -> Option<u64> {
        match self {
            Self::Random => None,
            Self::Fixed(n) => Some(n),
        }
    }

    /// Parse a typed seed field. Anything that is not a non-negative integer
    /// in `u64` range is [`Seed::Random`].
    pub fn parse(input: &str) -> Self {
        input
            .trim()
            .parse::<u64>()
            .map(Self::Fixed)
            .unwrap_or(Self::Random)
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        Self::Fixed(value)
    }
}

/// Wire form: `-1` or the decimal seed.
impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "{RANDOM_SEED_WIRE}"),
            Self::Fixed(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Random => serializer.serialize_i64(RANDOM_SEED_WIRE),
            Self::Fixed(n) => serializer.serialize_u64(*n),
        }
    }
}

struct SeedVisitor;

impl Visitor<'_> for SeedVisitor {
    type Value = Seed;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer seed or -1")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Seed, E> {
        Ok(Seed::Fixed(value))
    }

    // Any negative value is the random sentinel.
    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Seed, E> {
        Ok(u64::try_from(value).map(Seed::Fixed).unwrap_or(Seed::Random))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Seed, E> {
        Ok(Seed::parse(value))
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SeedVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_u64_range_deserializes() {
        let seed: Seed = serde_json::from_value(json!(18446744073709551615u64)).unwrap();
        assert_eq!(seed, Seed::Fixed(u64::MAX));
        assert_eq!(serde_json::to_value(seed).unwrap(), json!(18446744073709551615u64));
    }

    #[test]
    fn negative_values_are_random() {
        let seed: Seed = serde_json::from_value(json!(-1)).unwrap();
        assert_eq!(seed, Seed::Random);
        let seed: Seed = serde_json::from_value(json!(-42)).unwrap();
        assert!(seed.is_random());
        assert_eq!(serde_json::to_value(Seed::Random).unwrap(), json!(-1));
    }

    #[test]
    fn parse_typed_field() {
        assert_eq!(Seed::parse(" 7 "), Seed::Fixed(7));
        assert_eq!(Seed::parse("0"), Seed::Fixed(0));
        assert_eq!(
            Seed::parse("10000000000000000000"),
            Seed::Fixed(10_000_000_000_000_000_000)
        );
        assert_eq!(Seed::parse("-5"), Seed::Random);
        assert_eq!(Seed::parse("18446744073709551616"), Seed::Random);
        assert_eq!(Seed::parse(""), Seed::Random);
    }

    #[test]
    fn display_is_wire_form() {
        assert_eq!(Seed::Random.to_string(), "-1");
        assert_eq!(Seed::Fixed(u64::MAX).to_string(), "18446744073709551615");
    }
}
