use crate::{Error, IdInt, Result};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Base-36 text form of packed ids.
///
/// Encoding uses lowercase digits and no padding. Decoding is
/// case-insensitive and rejects anything that does not fit the id type.
///
/// # Example
///
/// ```
/// use trendid::RadixExt;
///
/// assert_eq!(1_295u64.to_radix36(), "zz");
/// assert_eq!(u64::from_radix36("ZZ").unwrap(), 1_295);
/// assert!(u64::from_radix36("").is_err());
/// ```
pub trait RadixExt: Sized {
    fn to_radix36(self) -> String;

    /// Parses a base-36 string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRadix36`] if `s` is empty, contains a
    /// character outside `0-9a-zA-Z`, or overflows `Self`.
    fn from_radix36(s: &str) -> Result<Self>;
}

impl<T: IdInt> RadixExt for T {
    fn to_radix36(self) -> String {
        let mut value = self.to_u128();
        if value == 0 {
            return "0".to_owned();
        }
        // u128::MAX has 25 base-36 digits
        let mut buf = [0u8; 25];
        let mut start = buf.len();
        while value > 0 {
            start -= 1;
            buf[start] = DIGITS[(value % 36) as usize];
            value /= 36;
        }
        buf[start..].iter().map(|&b| char::from(b)).collect()
    }

    fn from_radix36(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidRadix36 { reason: "empty input" });
        }
        let overflow = Error::InvalidRadix36 {
            reason: "value does not fit the id type",
        };
        let mut value: u128 = 0;
        for c in s.chars() {
            let digit = c.to_digit(36).ok_or(Error::InvalidRadix36 {
                reason: "invalid character",
            })?;
            value = value
                .checked_mul(36)
                .and_then(|v| v.checked_add(u128::from(digit)))
                .ok_or_else(|| overflow.clone())?;
        }
        T::try_from_u128(value).ok_or(overflow)
    }
}
