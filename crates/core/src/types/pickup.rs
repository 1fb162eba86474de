//! Pickup codes shown to customers and checked at the counter.

use core::fmt;
use core::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a valid [`PickupCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("pickup code must be {len} uppercase hexadecimal characters", len = PickupCode::LEN)]
pub struct PickupCodeError;

/// Six uppercase hexadecimal characters derived from three random bytes.
///
/// ```
/// use cafe_calories_core::PickupCode;
///
/// let code = PickupCode::from_bytes([0x0a, 0xbc, 0xff]);
/// assert_eq!(code.as_str(), "0ABCFF");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PickupCode(String);

impl PickupCode {
    pub const LEN: usize = 6;

    /// Encode three bytes (normally from a CSPRNG) as a code.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        let mut code = String::with_capacity(Self::LEN);
        for byte in bytes {
            let _ = write!(code, "{byte:02X}");
        }
        Self(code)
    }

    /// # Errors
    ///
    /// Returns [`PickupCodeError`] unless `s` is exactly six characters from
    /// `0-9A-F`.
    pub fn parse(s: &str) -> Result<Self, PickupCodeError> {
        let valid = s.len() == Self::LEN
            && s
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(PickupCodeError)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PickupCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PickupCode {
    type Error = PickupCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PickupCode> for String {
    fn from(code: PickupCode) -> Self {
        code.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PickupCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PickupCode {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PickupCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_bytes_as_uppercase_hex() {
        assert_eq!(PickupCode::from_bytes([0, 0, 0]).as_str(), "000000");
        assert_eq!(PickupCode::from_bytes([0xde, 0xad, 0x01]).as_str(), "DEAD01");
    }

    #[test]
    fn every_generated_code_parses() {
        for seed in 0..=255u8 {
            let code = PickupCode::from_bytes([seed, seed.wrapping_mul(7), !seed]);
            assert_eq!(PickupCode::parse(code.as_str()), Ok(code));
        }
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(PickupCode::parse("abcdef").is_err());
        assert!(PickupCode::parse("ABCDE").is_err());
        assert!(PickupCode::parse("ABCDEFA").is_err());
        assert!(PickupCode::parse("ABCDEG").is_err());
    }
}
