//! Station address newtype.
//!
//! A [`MacAddress`] wraps the 6-byte IEEE 802 address in network byte
//! order. The derived ordering is byte-lexicographic, which for a
//! big-endian address equals numeric order — gate tie-breaks rely on this.

use core::fmt;
use core::str::FromStr;

/// A 48-bit IEEE 802 MAC address in network byte order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[must_use]
pub struct MacAddress(pub(crate) [u8; 6]);

impl MacAddress {
    /// The all-ones broadcast address.
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);

    /// The all-zero address, used as the "unreachable" next-hop sentinel.
    pub const ZERO: MacAddress = MacAddress([0x00; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Whether this is the broadcast address.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Whether this is the all-zero sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl AsRef<[u8]> for MacAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for MacAddress {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 6] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 6,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

impl FromStr for MacAddress {
    type Err = AddressParseError;

    /// Parse the canonical `aa:bb:cc:dd:ee:ff` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in &mut bytes {
            let part = parts.next().ok_or_else(|| AddressParseError {
                input: s.to_string(),
            })?;
            if part.len() != 2 {
                return Err(AddressParseError {
                    input: s.to_string(),
                });
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| AddressParseError {
                input: s.to_string(),
            })?;
        }
        if parts.next().is_some() {
            return Err(AddressParseError {
                input: s.to_string(),
            });
        }
        Ok(Self(bytes))
    }
}

/// Error returned when a byte slice has the wrong length for an address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid length: expected {expected} bytes, got {actual}")]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

/// Error returned when a textual MAC address does not parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid MAC address: {input:?}")]
pub struct AddressParseError {
    pub input: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_colon_hex() {
        let mac = MacAddress::new([0x02, 0x00, 0xab, 0xcd, 0xef, 0x01]);
        assert_eq!(mac.to_string(), "02:00:ab:cd:ef:01");
    }

    #[test]
    fn parse_round_trip() {
        let mac: MacAddress = "02:00:00:00:00:aa".parse().unwrap();
        assert_eq!(mac.to_string(), "02:00:00:00:00:aa");
        assert_eq!(mac.octets(), [0x02, 0, 0, 0, 0, 0xaa]);
    }

    #[test]
    fn parse_accepts_uppercase() {
        let mac: MacAddress = "FF:FF:FF:FF:FF:FF".parse().unwrap();
        assert!(mac.is_broadcast());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("".parse::<MacAddress>().is_err());
        assert!("02:00:00:00:00".parse::<MacAddress>().is_err());
        assert!("02:00:00:00:00:aa:bb".parse::<MacAddress>().is_err());
        assert!("02-00-00-00-00-aa".parse::<MacAddress>().is_err());
        assert!("02:00:00:00:00:zz".parse::<MacAddress>().is_err());
        assert!("2:0:0:0:0:a".parse::<MacAddress>().is_err());
    }

    #[test]
    fn try_from_wrong_length() {
        let err = MacAddress::try_from([0u8; 5].as_ref()).unwrap_err();
        assert_eq!(err.expected, 6);
        assert_eq!(err.actual, 5);
    }

    #[test]
    fn ordering_is_numeric() {
        let low = MacAddress::new([0x02, 0, 0, 0, 0, 0x01]);
        let high = MacAddress::new([0x02, 0, 0, 0, 0, 0x02]);
        let highest = MacAddress::new([0x03, 0, 0, 0, 0, 0x00]);
        assert!(low < high);
        assert!(high < highest);
    }

    #[test]
    fn sentinel_classification() {
        assert!(MacAddress::ZERO.is_zero());
        assert!(!MacAddress::ZERO.is_broadcast());
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert!(!MacAddress::BROADCAST.is_zero());
        let mac = MacAddress::new([0x02, 0, 0, 0, 0, 0x01]);
        assert!(!mac.is_zero());
        assert!(!mac.is_broadcast());
    }
}
