//! Binary codecs for scalar values
//!
//! Integers are encoded in widths of 1, 2, 4, 8 and 16 bytes and floats in
//! widths of 2 (IEEE half), 4 (single), 8 (double) and 16 (binary128). Values
//! are laid out in host order and then reversed whenever the host order
//! differs from the machine's configured [`Endianness`].

use crate::interpreter::errors::{MachineError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    pub fn host() -> Self {
        if cfg!(target_endian = "little") {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Endianness::Little => Endianness::Big,
            Endianness::Big => Endianness::Little,
        }
    }

    fn differs_from_host(self) -> bool {
        self != Self::host()
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => f.write_str("little-endian"),
            Endianness::Big => f.write_str("big-endian"),
        }
    }
}

fn unsupported(what: &str, width: usize) -> MachineError {
    MachineError::runtime(format!("unsupported {} width {}", what, width))
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes).map_err(|_| unsupported("buffer", bytes.len()))
}

fn to_machine_order(mut bytes: Vec<u8>, endianness: Endianness) -> Vec<u8> {
    if endianness.differs_from_host() {
        bytes.reverse();
    }
    bytes
}

fn to_host_order(bytes: &[u8], endianness: Endianness) -> Vec<u8> {
    let mut buf = bytes.to_vec();
    if endianness.differs_from_host() {
        buf.reverse();
    }
    buf
}

/// Truncate `value` to `width` bytes, sign-extending when `signed`
pub fn wrap_int(value: i128, width: usize, signed: bool) -> i128 {
    if width >= 16 {
        return value;
    }
    let bits = width * 8;
    let truncated = value & ((1i128 << bits) - 1);
    if signed && truncated & (1i128 << (bits - 1)) != 0 {
        truncated - (1i128 << bits)
    } else {
        truncated
    }
}

pub fn encode_int(value: i128, width: usize, endianness: Endianness) -> Result<Vec<u8>> {
    let bytes = match width {
        1 => (value as u8).to_ne_bytes().to_vec(),
        2 => (value as u16).to_ne_bytes().to_vec(),
        4 => (value as u32).to_ne_bytes().to_vec(),
        8 => (value as u64).to_ne_bytes().to_vec(),
        16 => (value as u128).to_ne_bytes().to_vec(),
        _ => return Err(unsupported("integer", width)),
    };
    Ok(to_machine_order(bytes, endianness))
}

pub fn decode_int(bytes: &[u8], signed: bool, endianness: Endianness) -> Result<i128> {
    let buf = to_host_order(bytes, endianness);
    let value = match (buf.len(), signed) {
        (1, true) => i8::from_ne_bytes(fixed(&buf)?) as i128,
        (1, false) => u8::from_ne_bytes(fixed(&buf)?) as i128,
        (2, true) => i16::from_ne_bytes(fixed(&buf)?) as i128,
        (2, false) => u16::from_ne_bytes(fixed(&buf)?) as i128,
        (4, true) => i32::from_ne_bytes(fixed(&buf)?) as i128,
        (4, false) => u32::from_ne_bytes(fixed(&buf)?) as i128,
        (8, true) => i64::from_ne_bytes(fixed(&buf)?) as i128,
        (8, false) => u64::from_ne_bytes(fixed(&buf)?) as i128,
        // u128 values above i128::MAX wrap into the negative range
        (16, _) => i128::from_ne_bytes(fixed(&buf)?),
        (width, _) => return Err(unsupported("integer", width)),
    };
    Ok(value)
}

pub fn encode_float(value: f64, width: usize, endianness: Endianness) -> Result<Vec<u8>> {
    let bytes = match width {
        2 => f32_to_f16_bits(value as f32).to_ne_bytes().to_vec(),
        4 => (value as f32).to_ne_bytes().to_vec(),
        8 => value.to_ne_bytes().to_vec(),
        16 => f64_to_f128_bits(value).to_ne_bytes().to_vec(),
        _ => return Err(unsupported("float", width)),
    };
    Ok(to_machine_order(bytes, endianness))
}

pub fn decode_float(bytes: &[u8], endianness: Endianness) -> Result<f64> {
    let buf = to_host_order(bytes, endianness);
    let value = match buf.len() {
        2 => f16_bits_to_f32(u16::from_ne_bytes(fixed(&buf)?)) as f64,
        4 => f32::from_ne_bytes(fixed(&buf)?) as f64,
        8 => f64::from_ne_bytes(fixed(&buf)?),
        16 => f128_bits_to_f64(u128::from_ne_bytes(fixed(&buf)?)),
        width => return Err(unsupported("float", width)),
    };
    Ok(value)
}

/// Round-to-nearest conversion to IEEE half precision
fn f32_to_f16_bits(f: f32) -> u16 {
    let bits = f.to_bits();
    let sign = (bits >> 16) & 0x8000;
    let exp = ((bits >> 23) & 0xff) as i32;
    let mant = bits & 0x7f_ffff;

    if exp == 0xff {
        return (sign | 0x7c00 | if mant != 0 { 0x200 } else { 0 }) as u16;
    }

    let exp16 = exp - 127 + 15;
    if exp16 >= 0x1f {
        return (sign | 0x7c00) as u16;
    }
    if exp16 <= 0 {
        if exp16 < -10 {
            return sign as u16;
        }
        let full = mant | 0x80_0000;
        let shift = (14 - exp16) as u32;
        let half = (full + (1 << (shift - 1))) >> shift;
        return (sign | half) as u16;
    }

    // A carry out of the mantissa bumps the exponent, up to infinity
    let packed = (sign | ((exp16 as u32) << 10) | (mant >> 13)) + ((mant >> 12) & 1);
    packed as u16
}

fn f16_bits_to_f32(h: u16) -> f32 {
    let sign = ((h & 0x8000) as u32) << 16;
    let exp = ((h >> 10) & 0x1f) as u32;
    let mant = (h & 0x3ff) as u32;

    match exp {
        0 if mant == 0 => f32::from_bits(sign),
        0 => {
            let magnitude = mant as f32 / 16_777_216.0;
            if sign != 0 {
                -magnitude
            } else {
                magnitude
            }
        }
        0x1f => f32::from_bits(sign | 0x7f80_0000 | (mant << 13)),
        _ => f32::from_bits(sign | ((exp + 112) << 23) | (mant << 13)),
    }
}

const F128_MANTISSA_BITS: u32 = 112;
const F128_BIAS: i64 = 16383;
const F64_BIAS: i64 = 1023;

fn f64_to_f128_bits(x: f64) -> u128 {
    let bits = x.to_bits();
    let sign = ((bits >> 63) as u128) << 127;
    let exp = ((bits >> 52) & 0x7ff) as i64;
    let mant = (bits & 0x000f_ffff_ffff_ffff) as u128;

    if exp == 0x7ff {
        return sign | (0x7fff << F128_MANTISSA_BITS) | (mant << 60);
    }
    if exp == 0 {
        if mant == 0 {
            return sign;
        }
        // Subnormal doubles are normal in binary128
        let shift = mant.leading_zeros() - 75;
        let normalized = (mant << shift) & ((1u128 << 52) - 1);
        let biased = 1 - F64_BIAS - shift as i64 + F128_BIAS;
        return sign | ((biased as u128) << F128_MANTISSA_BITS) | (normalized << 60);
    }

    let biased = exp - F64_BIAS + F128_BIAS;
    sign | ((biased as u128) << F128_MANTISSA_BITS) | (mant << 60)
}

fn f128_bits_to_f64(b: u128) -> f64 {
    let sign = ((b >> 127) as u64) << 63;
    let exp = ((b >> F128_MANTISSA_BITS) & 0x7fff) as i64;
    let mant = b & ((1u128 << F128_MANTISSA_BITS) - 1);
    let top = (mant >> 60) as u64;

    if exp == 0x7fff {
        let nan_bits = if mant != 0 { (1 << 51) | top } else { 0 };
        return f64::from_bits(sign | 0x7ff0_0000_0000_0000 | nan_bits);
    }

    let biased = exp - F128_BIAS + F64_BIAS;
    if exp == 0 || biased <= -52 {
        return f64::from_bits(sign);
    }
    if biased <= 0 {
        let subnormal = ((1u64 << 52) | top) >> (1 - biased);
        return f64::from_bits(sign | subnormal);
    }
    if biased >= 0x7ff {
        return f64::from_bits(sign | 0x7ff0_0000_0000_0000);
    }
    f64::from_bits(sign | ((biased as u64) << 52) | top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_int_byte_order() {
        let little = encode_int(0x0102_0304, 4, Endianness::Little).unwrap();
        assert_eq!(little, vec![0x04, 0x03, 0x02, 0x01]);
        let big = encode_int(0x0102_0304, 4, Endianness::Big).unwrap();
        assert_eq!(big, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_signed_and_unsigned_decode() {
        let bytes = encode_int(-2, 2, Endianness::Little).unwrap();
        assert_eq!(bytes, vec![0xfe, 0xff]);
        assert_eq!(decode_int(&bytes, true, Endianness::Little).unwrap(), -2);
        assert_eq!(decode_int(&bytes, false, Endianness::Little).unwrap(), 0xfffe);
    }

    #[test]
    fn test_unsupported_widths() {
        assert!(encode_int(1, 3, Endianness::Little).is_err());
        assert!(decode_int(&[0; 5], true, Endianness::Big).is_err());
        assert!(encode_float(1.0, 1, Endianness::Little).is_err());
    }

    #[test]
    fn test_wrap_int() {
        assert_eq!(wrap_int(300, 1, false), 44);
        assert_eq!(wrap_int(200, 1, true), -56);
        assert_eq!(wrap_int(-1, 4, false), 0xffff_ffff);
        assert_eq!(wrap_int(0x1_0000_0005, 4, true), 5);
    }

    #[test]
    fn test_half_precision() {
        for value in [0.0, 1.0, -2.5, 0.333_251_95, 65504.0, 6.103_515_6e-5] {
            let bytes = encode_float(value, 2, Endianness::Big).unwrap();
            let back = decode_float(&bytes, Endianness::Big).unwrap();
            assert!((back - value).abs() <= value.abs() * 1e-3, "{} -> {}", value, back);
        }
        // 1.0 in half precision is 0x3c00
        assert_eq!(encode_float(1.0, 2, Endianness::Big).unwrap(), vec![0x3c, 0x00]);
        // Smallest subnormal
        let tiny = decode_float(&[0x01, 0x00], Endianness::Little).unwrap();
        assert_eq!(tiny, 2f64.powi(-24));
        assert!(decode_float(&[0x00, 0x7c], Endianness::Little)
            .unwrap()
            .is_infinite());
    }

    #[test]
    fn test_quad_precision() {
        let one = encode_float(1.0, 16, Endianness::Big).unwrap();
        assert_eq!(&one[..2], &[0x3f, 0xff]);
        assert!(one[2..].iter().all(|&b| b == 0));
        for value in [1.5, -1234.5678, f64::MIN_POSITIVE / 8.0, f64::MAX, 0.0] {
            let bytes = encode_float(value, 16, Endianness::Little).unwrap();
            assert_eq!(decode_float(&bytes, Endianness::Little).unwrap(), value);
        }
        let inf = encode_float(f64::NEG_INFINITY, 16, Endianness::Little).unwrap();
        assert_eq!(
            decode_float(&inf, Endianness::Little).unwrap(),
            f64::NEG_INFINITY
        );
    }

    proptest! {
        #[test]
        fn prop_int_round_trip(value in any::<i64>(), little in any::<bool>()) {
            let endianness = if little { Endianness::Little } else { Endianness::Big };
            for width in [1usize, 2, 4, 8, 16] {
                let expected = wrap_int(value as i128, width, true);
                let bytes = encode_int(value as i128, width, endianness).unwrap();
                prop_assert_eq!(bytes.len(), width);
                prop_assert_eq!(decode_int(&bytes, true, endianness).unwrap(), expected);

                let unsigned = wrap_int(value as i128, width, false);
                let bytes = encode_int(unsigned, width, endianness).unwrap();
                let decoded = decode_int(&bytes, false, endianness).unwrap();
                prop_assert_eq!(wrap_int(decoded, width, false), unsigned);
            }
        }

        #[test]
        fn prop_double_round_trip(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
            for endianness in [Endianness::Little, Endianness::Big] {
                let bytes = encode_float(value, 8, endianness).unwrap();
                prop_assert_eq!(decode_float(&bytes, endianness).unwrap(), value);
                let bytes = encode_float(value, 16, endianness).unwrap();
                prop_assert_eq!(decode_float(&bytes, endianness).unwrap(), value);
            }
        }

        #[test]
        fn prop_big_is_reversed_little(value in any::<i128>(), width in prop::sample::select(vec![2usize, 4, 8, 16])) {
            let mut little = encode_int(value, width, Endianness::Little).unwrap();
            little.reverse();
            prop_assert_eq!(little, encode_int(value, width, Endianness::Big).unwrap());
        }
    }
}
