// Tue Jan 13 2026 - Alex

use crate::pattern::Pattern;

/// Masked Boyer-Moore-Horspool search over a local buffer.
///
/// The probe position (the anchor) is the right-most fixed byte of the
/// pattern, so the byte checked first can never be a wildcard. The shift for
/// a probed byte is the distance from the anchor back to its nearest fixed
/// occurrence, capped by the distance to the nearest wildcard before the
/// anchor, since a wildcard accepts any byte.
pub struct MaskedMatcher<'p> {
    pattern: &'p Pattern,
    anchor: Option<usize>,
    shift: [usize; 256],
}

impl<'p> MaskedMatcher<'p> {
    pub fn new(pattern: &'p Pattern) -> Self {
        let anchor = pattern.anchor();
        let mut shift = [1usize; 256];

        if let Some(anchor) = anchor {
            let mask = pattern.mask();
            let bytes = pattern.bytes();
            let wildcard = mask[..anchor].iter().rposition(|&fixed| !fixed);
            let default = match wildcard {
                Some(w) => anchor - w,
                None => anchor + 1,
            };
            shift = [default; 256];
            for i in wildcard.map_or(0, |w| w + 1)..anchor {
                shift[bytes[i] as usize] = anchor - i;
            }
        }

        Self { pattern, anchor, shift }
    }

    pub fn pattern(&self) -> &Pattern {
        self.pattern
    }

    /// First match at or after `start`, restricted to offsets that are a
    /// multiple of `alignment` (0 and 1 both mean unrestricted).
    pub fn search(&self, haystack: &[u8], start: usize, alignment: usize) -> Option<usize> {
        let len = self.pattern.len();
        debug_assert!(len > 0, "pattern must hold at least one byte");
        if len == 0 || haystack.len() < len {
            return None;
        }
        let last = haystack.len() - len;
        let alignment = alignment.max(1);
        let mut i = align_up(start, alignment)?;

        let Some(anchor) = self.anchor else {
            return (i <= last).then_some(i);
        };
        let expected = self.pattern.bytes()[anchor];

        while i <= last {
            let probe = haystack[i + anchor];
            if probe == expected && self.pattern.matches_at(haystack, i) {
                return Some(i);
            }
            i = align_up(i + self.shift[probe as usize].max(1), alignment)?;
        }

        None
    }

    /// Every match in increasing order, overlapping ones included.
    pub fn find_iter<'h>(&'h self, haystack: &'h [u8], alignment: usize) -> impl Iterator<Item = usize> + 'h {
        let mut next = Some(0usize);
        std::iter::from_fn(move || {
            let start = next?;
            let found = self.search(haystack, start, alignment);
            next = found.and_then(|offset| offset.checked_add(1));
            found
        })
    }
}

fn align_up(value: usize, alignment: usize) -> Option<usize> {
    match value % alignment {
        0 => Some(value),
        rem => value.checked_add(alignment - rem),
    }
}

/// One-shot form of [`MaskedMatcher::search`].
pub fn search(haystack: &[u8], pattern: &Pattern, start: usize, alignment: usize) -> Option<usize> {
    MaskedMatcher::new(pattern).search(haystack, start, alignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(haystack: &[u8], pattern: &Pattern, start: usize, alignment: usize) -> Option<usize> {
        let alignment = alignment.max(1);
        (start..=haystack.len().checked_sub(pattern.len())?)
            .filter(|i| i % alignment == 0)
            .find(|&i| pattern.matches_at(haystack, i))
    }

    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            self.0 >> 33
        }
    }

    #[test]
    fn test_exact_pattern() {
        let pattern = Pattern::parse("DE AD BE EF").unwrap();
        let haystack = [0u8, 0xDE, 0xAD, 0xDE, 0xAD, 0xBE, 0xEF, 0x00];
        assert_eq!(search(&haystack, &pattern, 0, 1), Some(3));
        assert_eq!(search(&haystack, &pattern, 4, 1), None);
    }

    #[test]
    fn test_wildcard_in_final_position() {
        let pattern = Pattern::parse("AA BB ??").unwrap();
        let haystack = [0x00, 0xAA, 0xBB, 0x11, 0xAA, 0xBB];
        assert_eq!(search(&haystack, &pattern, 0, 1), Some(1));
        // the second AA BB has no trailing byte
        assert_eq!(search(&haystack, &pattern, 2, 1), None);
    }

    #[test]
    fn test_wildcard_before_anchor_limits_shift() {
        let pattern = Pattern::parse("11 ?? 22").unwrap();
        let haystack = [0x11, 0x11, 0x33, 0x22];
        assert_eq!(search(&haystack, &pattern, 0, 1), Some(1));
    }

    #[test]
    fn test_all_wildcards() {
        let pattern = Pattern::parse("?? ?? ??").unwrap();
        let haystack = [1u8; 8];
        assert_eq!(search(&haystack, &pattern, 0, 1), Some(0));
        assert_eq!(search(&haystack, &pattern, 3, 4), Some(4));
        assert_eq!(search(&haystack, &pattern, 6, 1), None);
    }

    #[test]
    fn test_haystack_shorter_than_pattern() {
        let pattern = Pattern::parse("01 02 03").unwrap();
        assert_eq!(search(&[1, 2], &pattern, 0, 1), None);
        assert_eq!(search(&[], &pattern, 0, 1), None);
    }

    #[test]
    fn test_start_past_end() {
        let pattern = Pattern::parse("01").unwrap();
        assert_eq!(search(&[1, 1, 1], &pattern, 10, 1), None);
        assert_eq!(search(&[1, 1, 1], &pattern, usize::MAX, 8), None);
    }

    #[test]
    fn test_alignment_is_respected() {
        let pattern = Pattern::parse("CC").unwrap();
        let haystack = [0xCC, 0xCC, 0x00, 0x00, 0x00, 0xCC, 0x00, 0x00, 0xCC];
        assert_eq!(search(&haystack, &pattern, 1, 4), Some(8));
        assert_eq!(search(&haystack, &pattern, 0, 4), Some(0));
        assert_eq!(search(&haystack, &pattern, 0, 0), Some(0));
    }

    #[test]
    fn test_overlapping_matches_are_enumerated() {
        let pattern = Pattern::parse("AA AA").unwrap();
        let haystack = [0xAA, 0xAA, 0xAA, 0x00, 0xAA, 0xAA];
        let matcher = MaskedMatcher::new(&pattern);
        let found: Vec<_> = matcher.find_iter(&haystack, 1).collect();
        assert_eq!(found, vec![0, 1, 4]);
    }

    #[test]
    fn test_agrees_with_naive_search() {
        let mut rng = Lcg(0x5eed);
        for _ in 0..400 {
            let len = 1 + (rng.next() % 6) as usize;
            let bytes: Vec<u8> = (0..len).map(|_| (rng.next() % 4) as u8).collect();
            let mask: Vec<bool> = (0..len).map(|_| rng.next() % 3 != 0).collect();
            let pattern = Pattern::new(bytes, mask).unwrap();

            let haystack: Vec<u8> = (0..64).map(|_| (rng.next() % 4) as u8).collect();
            let alignment = 1 + (rng.next() % 4) as usize;
            let start = (rng.next() % 8) as usize;

            assert_eq!(
                search(&haystack, &pattern, start, alignment),
                naive(&haystack, &pattern, start, alignment),
                "pattern {} align {} start {}",
                pattern,
                alignment,
                start
            );

            let matcher = MaskedMatcher::new(&pattern);
            let all: Vec<_> = matcher.find_iter(&haystack, 1).collect();
            let expected: Vec<_> = (0..=haystack.len() - pattern.len())
                .filter(|&i| pattern.matches_at(&haystack, i))
                .collect();
            assert_eq!(all, expected);
        }
    }
}
