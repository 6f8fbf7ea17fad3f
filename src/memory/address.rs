// Tue Jan 13 2026 - Alex

use std::fmt;
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address {
    value: u64,
}

impl Address {
    pub const fn new(value: u64) -> Self {
        Self { value }
    }

    pub const fn zero() -> Self {
        Self { value: 0 }
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self { value: ptr as usize as u64 }
    }

    pub fn as_u64(&self) -> u64 {
        self.value
    }

    pub fn as_usize(&self) -> usize {
        self.value as usize
    }

    pub fn is_null(&self) -> bool {
        self.value == 0
    }

    pub fn is_aligned(&self, alignment: usize) -> bool {
        alignment <= 1 || self.value % alignment as u64 == 0
    }

    /// Rounds down to a power-of-two boundary.
    pub fn align_down(&self, alignment: usize) -> Self {
        Self { value: self.value & !(alignment as u64 - 1) }
    }

    /// `None` when `self + offset` does not fit in 64 bits.
    pub fn checked_add(&self, offset: u64) -> Option<Self> {
        self.value.checked_add(offset).map(Self::new)
    }

    pub fn offset_from(&self, base: Address) -> u64 {
        self.value - base.value
    }

    /// Parses `0x7f00...`, `7f00...` or a plain decimal with a `#` prefix.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(decimal) = text.strip_prefix('#') {
            return decimal.parse().ok().map(Self::new);
        }
        let hex = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        u64::from_str_radix(hex, 16).ok().map(Self::new)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.value)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.value, f)
    }
}

impl Add<u64> for Address {
    type Output = Self;
    fn add(self, rhs: u64) -> Self::Output {
        Self { value: self.value + rhs }
    }
}

impl Sub<u64> for Address {
    type Output = Self;
    fn sub(self, rhs: u64) -> Self::Output {
        Self { value: self.value - rhs }
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.value
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:x}", self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Address::parse("0x1000"), Some(Address::new(0x1000)));
        assert_eq!(Address::parse("7fff0000"), Some(Address::new(0x7fff_0000)));
        assert_eq!(Address::parse("#4096"), Some(Address::new(4096)));
        assert_eq!(Address::parse("zz"), None);
    }

    #[test]
    fn test_alignment() {
        let addr = Address::new(0x1234);
        assert!(addr.is_aligned(4));
        assert!(!addr.is_aligned(8));
        assert!(addr.is_aligned(0));
        assert_eq!(addr.align_down(0x1000), Address::new(0x1000));
    }

    #[test]
    fn test_checked_add() {
        assert_eq!(Address::new(0x1000).checked_add(0x10), Some(Address::new(0x1010)));
        assert_eq!(Address::new(u64::MAX).checked_add(1), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::new(0xdead).to_string(), "0x000000000000dead");
    }
}
