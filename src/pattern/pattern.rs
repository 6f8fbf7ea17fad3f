// Tue Jan 13 2026 - Alex

use crate::pattern::PatternError;
use std::fmt;

/// A byte signature with a per-byte "don't care" mask.
///
/// `mask[i] == true` means byte `i` must match; `false` is a wildcard.
/// A pattern always holds at least one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<u8>,
    mask: Vec<bool>,
    name: Option<String>,
}

impl Pattern {
    pub fn new(bytes: Vec<u8>, mask: Vec<bool>) -> Result<Self, PatternError> {
        if bytes.len() != mask.len() {
            return Err(PatternError::LengthMismatch {
                bytes: bytes.len(),
                mask: mask.len(),
            });
        }
        if bytes.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self {
            bytes,
            mask,
            name: None,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PatternError> {
        Self::new(bytes.to_vec(), vec![true; bytes.len()])
    }

    /// Builds a pattern from bytes plus a textual mask where `?` marks a
    /// wildcard and anything else (conventionally `x`) a fixed byte.
    pub fn with_mask_str(bytes: &[u8], mask: &str) -> Result<Self, PatternError> {
        Self::new(bytes.to_vec(), mask.chars().map(|c| c != '?').collect())
    }

    /// Parses IDA-style text: `48 8B ?? 05 ? C3`.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let mut bytes = Vec::new();
        let mut mask = Vec::new();

        for token in text.split_whitespace() {
            if token.contains('?') {
                if !token.chars().all(|c| c == '?') || token.len() > 2 {
                    return Err(PatternError::InvalidToken(token.to_string()));
                }
                bytes.push(0);
                mask.push(false);
            } else if token.len() <= 2 {
                let byte = u8::from_str_radix(token, 16)
                    .map_err(|_| PatternError::InvalidToken(token.to_string()))?;
                bytes.push(byte);
                mask.push(true);
            } else {
                return Err(PatternError::InvalidToken(token.to_string()));
            }
        }

        Self::new(bytes, mask)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn is_wildcard(&self, index: usize) -> bool {
        !self.mask[index]
    }

    /// Index of the right-most fixed byte, `None` when every byte is a wildcard.
    pub fn anchor(&self) -> Option<usize> {
        self.mask.iter().rposition(|&fixed| fixed)
    }

    /// Whether every fixed byte matches `data` starting at `offset`.
    pub fn matches_at(&self, data: &[u8], offset: usize) -> bool {
        match data.get(offset..offset.saturating_add(self.len())) {
            Some(window) => self
                .bytes
                .iter()
                .zip(&self.mask)
                .zip(window)
                .all(|((&expected, &fixed), &actual)| !fixed || expected == actual),
            None => false,
        }
    }

    pub fn significant_byte_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn to_hex_string(&self) -> String {
        self.bytes
            .iter()
            .zip(self.mask.iter())
            .map(|(b, &m)| if m { format!("{:02X}", b) } else { "??".to_string() })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref name) = self.name {
            write!(f, "{}: ", name)?;
        }
        write!(f, "{}", self.to_hex_string())
    }
}

impl std::str::FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ida_text() {
        let pattern = Pattern::parse("48 8B ?? 05 ? c3").unwrap();
        assert_eq!(pattern.bytes(), &[0x48, 0x8B, 0x00, 0x05, 0x00, 0xC3]);
        assert_eq!(pattern.mask(), &[true, true, false, true, false, true]);
        assert_eq!(pattern.to_hex_string(), "48 8B ?? 05 ?? C3");
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        assert_eq!(Pattern::parse(""), Err(PatternError::Empty));
        assert_eq!(Pattern::parse("48 GG"), Err(PatternError::InvalidToken("GG".into())));
        assert_eq!(Pattern::parse("4?"), Err(PatternError::InvalidToken("4?".into())));
        assert_eq!(Pattern::parse("123"), Err(PatternError::InvalidToken("123".into())));
    }

    #[test]
    fn test_new_checks_lengths() {
        assert_eq!(
            Pattern::new(vec![1, 2], vec![true]),
            Err(PatternError::LengthMismatch { bytes: 2, mask: 1 })
        );
    }

    #[test]
    fn test_mask_string() {
        let pattern = Pattern::with_mask_str(&[0xAA, 0x00, 0xBB], "x?x").unwrap();
        assert_eq!(pattern.anchor(), Some(2));
        assert!(pattern.is_wildcard(1));
    }

    #[test]
    fn test_anchor_skips_trailing_wildcards() {
        let pattern = Pattern::parse("AA BB ?? ??").unwrap();
        assert_eq!(pattern.anchor(), Some(1));
        assert_eq!(Pattern::parse("?? ??").unwrap().anchor(), None);
    }

    #[test]
    fn test_matches_at_bounds() {
        let pattern = Pattern::parse("01 ?? 03").unwrap();
        assert!(pattern.matches_at(&[9, 1, 7, 3], 1));
        assert!(!pattern.matches_at(&[9, 1, 7], 1));
    }
}
