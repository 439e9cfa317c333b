use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::catalog::RegisterDescriptor;
use crate::codec::{BytesCountError, Decode};

/// Register data types understood by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    U16,
    S16,
    U32,
    S32,
    Str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported data type {0:?}")]
pub struct UnknownDataType(pub String);

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "U16" => Ok(DataType::U16),
            "S16" => Ok(DataType::S16),
            "U32" => Ok(DataType::U32),
            "S32" => Ok(DataType::S32),
            "STR" => Ok(DataType::Str),
            other => Err(UnknownDataType(other.to_string())),
        }
    }
}

impl DataType {
    /// Byte count of a numeric type, `None` for variable-length text.
    pub fn byte_size(&self) -> Option<usize> {
        match self {
            DataType::U16 => Some(u16::SIZE),
            DataType::S16 => Some(i16::SIZE),
            DataType::U32 => Some(u32::SIZE),
            DataType::S32 => Some(i32::SIZE),
            DataType::Str => None,
        }
    }
}

/// Decoded register contents.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// Raw integer divided by the scale factor.
    Measurement { value: f64, units: String },
    Text(String),
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Measurement { value, units } if units.is_empty() => {
                write!(f, "{value:.2}")
            }
            DecodedValue::Measurement { value, units } => write!(f, "{value:.2} {units}"),
            DecodedValue::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported type {data_type} for {name}")]
    UnsupportedType { name: String, data_type: String },
    #[error("expected {expected} bytes, got {actual}")]
    TruncatedRead {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("scale factor is zero")]
    DivisionFault { name: String },
}

/// Convert the bytes read for `descriptor` into a value.
///
/// Multi-byte integers are big-endian. Numeric values are divided by the
/// descriptor's scale factor, which must be non-zero; text ignores it.
pub fn decode(descriptor: &RegisterDescriptor, bytes: &[u8]) -> Result<DecodedValue, DecodeError> {
    let data_type = descriptor
        .data_type
        .parse::<DataType>()
        .map_err(|UnknownDataType(data_type)| DecodeError::UnsupportedType {
            name: descriptor.name.clone(),
            data_type,
        })?;

    let raw = match data_type {
        DataType::U16 => u16::from_be_slice(bytes).map(f64::from),
        DataType::S16 => i16::from_be_slice(bytes).map(f64::from),
        DataType::U32 => u32::from_be_slice(bytes).map(f64::from),
        DataType::S32 => i32::from_be_slice(bytes).map(f64::from),
        DataType::Str => return decode_text(descriptor, bytes),
    }
    .map_err(|BytesCountError { expected, actual }| DecodeError::TruncatedRead {
        name: descriptor.name.clone(),
        expected,
        actual,
    })?;

    if descriptor.scale_factor == 0 {
        return Err(DecodeError::DivisionFault {
            name: descriptor.name.clone(),
        });
    }

    Ok(DecodedValue::Measurement {
        value: raw / f64::from(descriptor.scale_factor),
        units: descriptor.units.clone(),
    })
}

fn decode_text(descriptor: &RegisterDescriptor, bytes: &[u8]) -> Result<DecodedValue, DecodeError> {
    let expected = descriptor.byte_len();
    if bytes.len() < expected {
        return Err(DecodeError::TruncatedRead {
            name: descriptor.name.clone(),
            expected,
            actual: bytes.len(),
        });
    }
    // one char per byte, no UTF-8 validation
    Ok(DecodedValue::Text(
        bytes.iter().map(|&b| char::from(b)).collect::<String>(),
    ))
}

/// Bytes a numeric register reads beyond what its data type needs.
///
/// `None` when the length matches, for text, and for unsupported types.
pub fn surplus_bytes(descriptor: &RegisterDescriptor) -> Option<usize> {
    let size = descriptor.data_type.parse::<DataType>().ok()?.byte_size()?;
    descriptor.byte_len().checked_sub(size).filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(data_type: &str, length: u16, scale_factor: i32) -> RegisterDescriptor {
        RegisterDescriptor {
            address: 0x891C,
            name: "Vgrid".to_string(),
            data_type: data_type.to_string(),
            length,
            scale_factor,
            units: "V".to_string(),
            note: String::new(),
            valid_range: String::new(),
            property: "R".to_string(),
        }
    }

    fn measurement(value: f64) -> DecodedValue {
        DecodedValue::Measurement {
            value,
            units: "V".to_string(),
        }
    }

    #[test]
    fn test_u16_scaled() {
        let desc = descriptor("U16", 1, 10);
        let value = decode(&desc, &[0x08, 0xFC]).unwrap();
        assert_eq!(value, measurement(230.0));
        assert_eq!(value.to_string(), "230.00 V");

        let desc = descriptor("U16", 1, 1);
        assert_eq!(decode(&desc, &[0x01, 0x2C]).unwrap(), measurement(300.0));
    }

    #[test]
    fn test_u16_all_byte_pairs() {
        let desc = descriptor("U16", 1, 1);
        for hi in 0..=255u8 {
            for lo in [0u8, 1, 0x7F, 0x80, 0xFF] {
                let expected = f64::from(hi) * 256.0 + f64::from(lo);
                assert_eq!(decode(&desc, &[hi, lo]).unwrap(), measurement(expected));
            }
        }
    }

    #[test]
    fn test_s16_negative() {
        let desc = descriptor("S16", 1, 1);
        assert_eq!(decode(&desc, &[0xFF, 0xFF]).unwrap(), measurement(-1.0));
        assert_eq!(decode(&desc, &[0x80, 0x00]).unwrap(), measurement(-32768.0));
        assert_eq!(decode(&desc, &[0x7F, 0xFF]).unwrap(), measurement(32767.0));

        let desc = descriptor("S16", 1, 100);
        assert_eq!(decode(&desc, &[0xFF, 0x38]).unwrap().to_string(), "-2.00 V");
    }

    #[test]
    fn test_32_bit_types() {
        let desc = descriptor("U32", 2, 1);
        assert_eq!(
            decode(&desc, &[0x00, 0x00, 0x01, 0x00]).unwrap(),
            measurement(256.0)
        );
        assert_eq!(
            decode(&desc, &[0xFF, 0xFF, 0xFF, 0xFF]).unwrap(),
            measurement(4294967295.0)
        );

        let desc = descriptor("S32", 2, 1);
        assert_eq!(
            decode(&desc, &[0xFF, 0xFF, 0xFF, 0xFF]).unwrap(),
            measurement(-1.0)
        );
        assert_eq!(
            decode(&desc, &[0x80, 0x00, 0x00, 0x00]).unwrap(),
            measurement(-2147483648.0)
        );

        let desc = descriptor("S32", 2, 1000);
        assert_eq!(
            decode(&desc, &[0xFF, 0xFF, 0xFB, 0x2E]).unwrap().to_string(),
            "-1.23 V"
        );
    }

    #[test]
    fn test_two_decimal_rendering() {
        let desc = descriptor("U16", 1, 3);
        assert_eq!(decode(&desc, &[0x00, 0x0A]).unwrap().to_string(), "3.33 V");

        let mut desc = descriptor("U32", 2, 10);
        desc.units = String::new();
        assert_eq!(
            decode(&desc, &[0x00, 0x00, 0x08, 0xFC]).unwrap().to_string(),
            "230.00"
        );
    }

    #[test]
    fn test_zero_scale_factor_is_division_fault() {
        for (ty, bytes) in [
            ("U16", vec![0x00, 0x00]),
            ("S16", vec![0xFF, 0xFF]),
            ("U32", vec![0x00, 0x00, 0x00, 0x01]),
            ("S32", vec![0x80, 0x00, 0x00, 0x00]),
        ] {
            let desc = descriptor(ty, 2, 0);
            assert_eq!(
                decode(&desc, &bytes),
                Err(DecodeError::DivisionFault {
                    name: "Vgrid".to_string()
                })
            );
        }
    }

    #[test]
    fn test_text_ignores_scale_factor() {
        let bytes = b"GW5000-MS\0\0\0";
        for scale_factor in [0, 1, 10, -7] {
            let desc = descriptor("STR", 6, scale_factor);
            assert_eq!(
                decode(&desc, bytes).unwrap(),
                DecodedValue::Text("GW5000-MS\0\0\0".to_string())
            );
        }
    }

    #[test]
    fn test_text_keeps_high_bytes() {
        let desc = descriptor("STR", 1, 1);
        assert_eq!(
            decode(&desc, &[0x41, 0xB0]).unwrap(),
            DecodedValue::Text("A\u{B0}".to_string())
        );

        let desc = descriptor("STR", 2, 1);
        let text = match decode(&desc, &[0xFF, 0x80, 0xC3, 0x28]).unwrap() {
            DecodedValue::Text(text) => text,
            other => panic!("unexpected {other:?}"),
        };
        let codes = text.chars().map(u32::from).collect::<Vec<_>>();
        assert_eq!(codes, vec![0xFF, 0x80, 0xC3, 0x28]);
    }

    #[test]
    fn test_surplus_bytes() {
        assert_eq!(surplus_bytes(&descriptor("U16", 2, 1)), Some(2));
        assert_eq!(surplus_bytes(&descriptor("S32", 4, 1)), Some(4));
        assert_eq!(surplus_bytes(&descriptor("U16", 1, 1)), None);
        assert_eq!(surplus_bytes(&descriptor("U32", 2, 1)), None);
        // too short is a truncated read, not a surplus
        assert_eq!(surplus_bytes(&descriptor("U32", 1, 1)), None);
        assert_eq!(surplus_bytes(&descriptor("STR", 8, 1)), None);
        assert_eq!(surplus_bytes(&descriptor("F32", 4, 1)), None);
    }

    #[test]
    fn test_unsupported_type() {
        for ty in ["F32", "u16", "", "STRING"] {
            let desc = descriptor(ty, 1, 1);
            assert_eq!(
                decode(&desc, &[0x00, 0x01]),
                Err(DecodeError::UnsupportedType {
                    name: "Vgrid".to_string(),
                    data_type: ty.to_string(),
                })
            );
        }
    }

    #[test]
    fn test_truncated_reads() {
        let desc = descriptor("U32", 2, 1);
        assert_eq!(
            decode(&desc, &[0x00, 0x01]),
            Err(DecodeError::TruncatedRead {
                name: "Vgrid".to_string(),
                expected: 4,
                actual: 2,
            })
        );

        let desc = descriptor("S16", 1, 1);
        assert!(matches!(
            decode(&desc, &[]),
            Err(DecodeError::TruncatedRead { expected: 2, .. })
        ));

        let desc = descriptor("STR", 4, 1);
        assert!(matches!(
            decode(&desc, b"abc"),
            Err(DecodeError::TruncatedRead {
                expected: 8,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_truncation_checked_before_scale() {
        let desc = descriptor("U16", 1, 0);
        assert!(matches!(
            decode(&desc, &[0x01]),
            Err(DecodeError::TruncatedRead { .. })
        ));
    }

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::U16.byte_size(), Some(2));
        assert_eq!(DataType::S32.byte_size(), Some(4));
        assert_eq!(DataType::Str.byte_size(), None);
        assert_eq!("S16".parse::<DataType>(), Ok(DataType::S16));
    }
}
