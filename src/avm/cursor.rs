// Wed Jan 15 2026 - Alex

use crate::avm::BytecodeError;

/// Little-endian fixed-width values readable by [`BinaryCursor::read_fixed`].
pub trait FixedWidth: Sized {
    const WIDTH: usize;
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! fixed_width {
    ($($ty:ty),*) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

fixed_width!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Position-tracked reader over a borrowed bytecode buffer.
///
/// Reading past the end is a caller bug: the buffer length is known up
/// front and well-formed input never overruns it. Every read still checks
/// and reports [`BytecodeError::UnexpectedEof`] instead of touching memory
/// outside the slice.
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn at(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], BytecodeError> {
        if self.remaining() < len {
            return Err(BytecodeError::UnexpectedEof {
                position: self.position,
                needed: len - self.remaining(),
            });
        }
        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    pub fn read_fixed<T: FixedWidth>(&mut self) -> Result<T, BytecodeError> {
        self.take(T::WIDTH).map(T::from_le_slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, BytecodeError> {
        self.read_fixed::<u8>()
    }

    pub fn peek_u8(&self) -> Result<u8, BytecodeError> {
        self.data.get(self.position).copied().ok_or(BytecodeError::UnexpectedEof {
            position: self.position,
            needed: 1,
        })
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BytecodeError> {
        self.take(len)
    }

    /// Reads up to a zero byte and steps past it.
    pub fn read_cstring(&mut self) -> Result<String, BytecodeError> {
        let rest = &self.data[self.position.min(self.data.len())..];
        let len = rest.iter().position(|&b| b == 0).ok_or(BytecodeError::UnexpectedEof {
            position: self.data.len(),
            needed: 1,
        })?;
        let bytes = self.take(len + 1)?;
        Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
    }

    /// Variable-length unsigned integer used for indices and counts.
    ///
    /// At most four bytes: the first three carry seven bits each plus a
    /// continuation flag in bit 7, and decoding stops at the first clear
    /// flag. A fourth byte, if reached, contributes all eight bits at
    /// bit 21 without a continuation check.
    pub fn read_varint(&mut self) -> Result<u32, BytecodeError> {
        let mut result = 0u32;
        for shift in [0u32, 7, 14] {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        let byte = self.read_u8()?;
        Ok(result | (byte as u32) << 21)
    }

    /// Full 32-bit variant used by the integer constant tables: up to five
    /// bytes, the fifth contributing its low four bits at bit 28.
    pub fn read_varint32(&mut self) -> Result<u32, BytecodeError> {
        let mut result = 0u32;
        for shift in [0u32, 7, 14, 21] {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        let byte = self.read_u8()?;
        Ok(result | ((byte & 0x0F) as u32) << 28)
    }

    /// Signed 24-bit little-endian value (branch offsets).
    pub fn read_s24(&mut self) -> Result<i32, BytecodeError> {
        let bytes = self.take(3)?;
        let raw = bytes[0] as i32 | (bytes[1] as i32) << 8 | (bytes[2] as i8 as i32) << 16;
        Ok(raw)
    }

    pub fn skip_varints(&mut self, count: u32) -> Result<(), BytecodeError> {
        for _ in 0..count {
            self.read_varint()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_continuation() {
        assert_eq!(BinaryCursor::new(&[0x96, 0x01]).read_varint(), Ok(150));
        assert_eq!(BinaryCursor::new(&[0x7F]).read_varint(), Ok(127));
        assert_eq!(BinaryCursor::new(&[0x00, 0xFF]).read_varint(), Ok(0));
    }

    #[test]
    fn test_varint_stops_after_four_bytes() {
        let mut cursor = BinaryCursor::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert_eq!(cursor.read_varint(), Ok(0x1FFF_FFFF));
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_varint32_reads_fifth_byte() {
        let mut cursor = BinaryCursor::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(cursor.read_varint32(), Ok(u32::MAX));
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_varint_overrun() {
        assert_eq!(
            BinaryCursor::new(&[0x80]).read_varint(),
            Err(BytecodeError::UnexpectedEof { position: 1, needed: 1 })
        );
    }

    #[test]
    fn test_fixed_width_reads() {
        let data = [0x34, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF0, 0x3F];
        let mut cursor = BinaryCursor::new(&data);
        assert_eq!(cursor.read_fixed::<u16>(), Ok(0x1234));
        assert_eq!(cursor.read_fixed::<f64>(), Ok(1.0));
        assert_eq!(
            cursor.read_fixed::<u32>(),
            Err(BytecodeError::UnexpectedEof { position: 10, needed: 4 })
        );
    }

    #[test]
    fn test_cstring_advances_past_terminator() {
        let mut cursor = BinaryCursor::new(b"abc\0de\0");
        assert_eq!(cursor.read_cstring().unwrap(), "abc");
        assert_eq!(cursor.position(), 4);
        assert_eq!(cursor.read_cstring().unwrap(), "de");
        assert!(cursor.read_cstring().is_err());
    }

    #[test]
    fn test_unterminated_cstring_is_an_error() {
        let mut cursor = BinaryCursor::new(b"abc");
        assert!(cursor.read_cstring().is_err());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_s24_sign_extension() {
        assert_eq!(BinaryCursor::new(&[0xFE, 0xFF, 0xFF]).read_s24(), Ok(-2));
        assert_eq!(BinaryCursor::new(&[0x10, 0x00, 0x00]).read_s24(), Ok(16));
    }
}
