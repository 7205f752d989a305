//! Per-field codec rules, applied with `#[serde(with = "...")]`.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Profile {
//!     #[serde(with = "tether::codec::fields::wide_int")]
//!     play_time_ms: i64,
//!     #[serde(default, with = "tether::codec::fields::lenient_uuid")]
//!     last_opponent: Option<Uuid>,
//!     #[serde(skip)]
//!     combat_tagged_until: Option<i64>,
//! }
//! ```

use serde::Deserialize;

/// Wire forms accepted for a wide integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum WideRepr {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl WideRepr {
    fn into_int<T, E>(self) -> Result<T, E>
    where
        T: std::str::FromStr + TryFrom<u64> + TryFrom<i64>,
        <T as std::str::FromStr>::Err: std::fmt::Display,
        E: serde::de::Error,
    {
        match self {
            WideRepr::Text(s) => s
                .trim()
                .parse::<T>()
                .map_err(|e| E::custom(format!("invalid wide integer {s:?}: {e}"))),
            WideRepr::Unsigned(n) => {
                T::try_from(n).map_err(|_| E::custom(format!("integer {n} out of range")))
            }
            WideRepr::Signed(n) => {
                T::try_from(n).map_err(|_| E::custom(format!("integer {n} out of range")))
            }
        }
    }
}

/// Identifier fields encoded as their canonical string; unparseable input decodes to `None`.
///
/// Use with `#[serde(default, with = "lenient_uuid")]` on an `Option<Uuid>`.
pub mod lenient_uuid {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use uuid::Uuid;

    pub fn serialize<S>(value: &Option<Uuid>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(id) => serializer.collect_str(&id.hyphenated()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Value::String(s)) => Uuid::parse_str(&s).ok(),
            _ => None,
        })
    }
}

/// 64-bit integers encoded as decimal strings so float-based JSON readers keep full precision.
///
/// Decoding accepts either the string form or a plain number.
pub mod wide_int {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    use super::WideRepr;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr + TryFrom<u64> + TryFrom<i64>,
        <T as FromStr>::Err: Display,
        D: Deserializer<'de>,
    {
        WideRepr::deserialize(deserializer)?.into_int()
    }
}

/// [`wide_int`] for optional fields.
pub mod option_wide_int {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    use super::WideRepr;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr + TryFrom<u64> + TryFrom<i64>,
        <T as FromStr>::Err: Display,
        D: Deserializer<'de>,
    {
        Option::<WideRepr>::deserialize(deserializer)?
            .map(WideRepr::into_int)
            .transpose()
    }
}
