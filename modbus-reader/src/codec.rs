use std::fmt::Debug;

pub use tokio_modbus::{Address, Quantity};

/// 16-bit value stored in Modbus register.
pub type Word = u16;

/// Number of bytes carried by a single register.
pub const BYTES_PER_WORD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytesCountError {
    pub expected: usize,
    pub actual: usize,
}

/// Decode a value from the leading bytes of a Big Endian-ordered register dump.
pub trait Decode: Sized {
    /// Number of bytes the value occupies.
    const SIZE: usize;

    /// Fails when fewer than [`Decode::SIZE`] bytes are available; trailing bytes are ignored.
    fn from_be_slice(bytes: &[u8]) -> Result<Self, BytesCountError>;
}

macro_rules! impl_decode {
    ($num_type:ty) => {
        impl Decode for $num_type {
            const SIZE: usize = std::mem::size_of::<$num_type>();

            fn from_be_slice(bytes: &[u8]) -> Result<Self, BytesCountError> {
                let err = BytesCountError {
                    expected: Self::SIZE,
                    actual: bytes.len(),
                };
                let array = bytes
                    .get(..Self::SIZE)
                    .ok_or(err)?
                    .try_into()
                    .or(Err(err))?;
                Ok(<$num_type>::from_be_bytes(array))
            }
        }
    };
}

impl_decode!(i16);
impl_decode!(i32);
impl_decode!(u16);
impl_decode!(u32);

/// Flatten registers into their big-endian byte representation.
pub fn words_to_bytes(words: &[Word]) -> Vec<u8> {
    words
        .iter()
        .copied()
        .flat_map(u16::to_be_bytes)
        .collect::<Vec<u8>>()
}

/// Split a byte sequence back into registers, padding an odd trailing byte with zero.
pub fn bytes_to_words(bytes: &[u8]) -> Vec<Word> {
    bytes
        .chunks(BYTES_PER_WORD)
        .map(|chunk| match *chunk {
            [hi, lo] => u16::from_be_bytes([hi, lo]),
            [hi] => u16::from_be_bytes([hi, 0]),
            _ => 0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_big_endian() {
        assert_eq!(u16::from_be_slice(&[0x01, 0x2C]), Ok(300));
        assert_eq!(u32::from_be_slice(&[0x00, 0x00, 0x01, 0x00]), Ok(256));
        assert_eq!(u32::from_be_slice(&[0xFF, 0xFF, 0xFF, 0xFF]), Ok(u32::MAX));
    }

    #[test]
    fn test_signed_twos_complement() {
        assert_eq!(i16::from_be_slice(&[0xFF, 0xFF]), Ok(-1));
        assert_eq!(i16::from_be_slice(&[0x80, 0x00]), Ok(-32768));
        assert_eq!(i16::from_be_slice(&[0x7F, 0xFF]), Ok(32767));
        assert_eq!(i32::from_be_slice(&[0xFF, 0xFF, 0xFF, 0xFE]), Ok(-2));
        assert_eq!(i32::from_be_slice(&[0x80, 0x00, 0x00, 0x00]), Ok(i32::MIN));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        assert_eq!(u16::from_be_slice(&[0x00, 0x0A, 0xFF, 0xFF]), Ok(10));
    }

    #[test]
    fn test_short_input_rejected() {
        assert_eq!(
            u32::from_be_slice(&[0x00, 0x01]),
            Err(BytesCountError {
                expected: 4,
                actual: 2
            })
        );
        assert_eq!(
            i16::from_be_slice(&[]),
            Err(BytesCountError {
                expected: 2,
                actual: 0
            })
        );
    }

    #[test]
    fn test_words_bytes_conversion() {
        assert_eq!(words_to_bytes(&[0x0102, 0xA0B0]), vec![0x01, 0x02, 0xA0, 0xB0]);
        assert_eq!(bytes_to_words(&[0x01, 0x02, 0x03]), vec![0x0102, 0x0300]);
    }
}
