use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Millisecond epoch timestamp as Apple sends it (`"1546300800000"`).
///
/// The zero value stands for "not set": a missing or `null` field
/// deserializes to it, so `cancellation_date_ms` being absent and being
/// zero mean the same thing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReceiptTime {
    millis: i64,
}

impl ReceiptTime {
    pub const ZERO: ReceiptTime = ReceiptTime { millis: 0 };

    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub fn from_datetime(dt: OffsetDateTime) -> Self {
        Self {
            millis: (dt.unix_timestamp_nanos() / 1_000_000) as i64,
        }
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }

    pub fn is_zero(&self) -> bool {
        self.millis == 0
    }

    /// `None` for the zero value or an out-of-range timestamp.
    pub fn to_datetime(&self) -> Option<OffsetDateTime> {
        if self.is_zero() {
            return None;
        }
        OffsetDateTime::from_unix_timestamp_nanos(self.millis as i128 * 1_000_000).ok()
    }

    pub fn is_before(&self, instant: OffsetDateTime) -> bool {
        self.millis < Self::from_datetime(instant).millis
    }
}

impl<'de> Deserialize<'de> for ReceiptTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MillisVisitor;

        impl<'de> de::Visitor<'de> for MillisVisitor {
            type Value = ReceiptTime;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a millisecond epoch timestamp, as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.trim()
                    .parse::<i64>()
                    .map(ReceiptTime::from_millis)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(ReceiptTime::from_millis(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(ReceiptTime::from_millis)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ReceiptTime::ZERO)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ReceiptTime::ZERO)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                d.deserialize_any(self)
            }
        }

        deserializer.deserialize_any(MillisVisitor)
    }
}

/// Serialized as RFC 3339 for upstream consumers, `null` when unset.
impl Serialize for ReceiptTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_datetime() {
            Some(dt) => {
                let formatted = dt.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&formatted)
            }
            None => serializer.serialize_none(),
        }
    }
}
