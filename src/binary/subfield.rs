//! The basic field formats of the binary encoding.
//!
//! Binary-encoded Ion values are built from a small number of primitive
//! fields, separate from the Ion types visible to users:
//!
//! - **UInt / Int**: fixed-length big-endian integers, always used where the
//!   octet count is known from context. Ints are sign-and-magnitude, the
//!   sign being the high-order bit of the first octet, so 123456 and
//!   -123456 differ only in that bit.
//! - **VarUInt / VarInt**: self-delimiting integers carrying 7 payload bits
//!   per octet; the high-order bit is set on (and only on) the last octet.
//!   VarInts additionally reserve the second-highest bit of the *first*
//!   octet as the sign, which makes a negative zero representable — the
//!   encoding a timestamp uses for an unknown local offset.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::{BinaryFormatError, Error, Result};

/// Reads a VarUInt at `*pos`, advancing past it.
pub(crate) fn read_var_uint(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut magnitude: u64 = 0;
    loop {
        let byte = *data.get(*pos).ok_or(Error::UnexpectedEof)?;
        if magnitude > u64::MAX >> 7 {
            return Err(Error::malformed(
                BinaryFormatError::VarIntTooLarge(10),
                *pos,
            ));
        }
        magnitude = (magnitude << 7) | u64::from(byte & 0x7f);
        *pos += 1;
        if byte & 0x80 != 0 {
            return Ok(magnitude);
        }
    }
}

/// Reads a VarInt as (negative, magnitude), preserving negative zero.
pub(crate) fn read_var_int_parts(data: &[u8], pos: &mut usize) -> Result<(bool, u64)> {
    let first = *data.get(*pos).ok_or(Error::UnexpectedEof)?;
    let negative = first & 0x40 != 0;
    let mut magnitude = u64::from(first & 0x3f);
    *pos += 1;
    if first & 0x80 != 0 {
        return Ok((negative, magnitude));
    }
    loop {
        let byte = *data.get(*pos).ok_or(Error::UnexpectedEof)?;
        if magnitude > u64::MAX >> 7 {
            return Err(Error::malformed(
                BinaryFormatError::VarIntTooLarge(10),
                *pos,
            ));
        }
        magnitude = (magnitude << 7) | u64::from(byte & 0x7f);
        *pos += 1;
        if byte & 0x80 != 0 {
            return Ok((negative, magnitude));
        }
    }
}

/// Reads a VarInt, collapsing negative zero to zero.
pub(crate) fn read_var_int(data: &[u8], pos: &mut usize) -> Result<i64> {
    let at = *pos;
    let (negative, magnitude) = read_var_int_parts(data, pos)?;
    if magnitude > i64::MAX as u64 {
        return Err(Error::malformed(BinaryFormatError::VarIntTooLarge(10), at));
    }
    Ok(if negative {
        -(magnitude as i64)
    } else {
        magnitude as i64
    })
}

/// A UInt field: the whole slice as a big-endian magnitude.
pub(crate) fn read_uint(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// A UInt field that must fit a u64, as symbol ids must.
pub(crate) fn read_uint_u64(bytes: &[u8]) -> Option<u64> {
    if bytes.len() > 8 {
        return None;
    }
    let mut magnitude: u64 = 0;
    for byte in bytes {
        magnitude = (magnitude << 8) | u64::from(*byte);
    }
    Some(magnitude)
}

/// An Int field as (negative, magnitude). An empty slice is positive zero.
pub(crate) fn read_int_parts(bytes: &[u8]) -> (bool, BigUint) {
    match bytes.first() {
        None => (false, BigUint::zero()),
        Some(first) => {
            let negative = first & 0x80 != 0;
            let mut magnitude = bytes.to_vec();
            magnitude[0] &= 0x7f;
            (negative, BigUint::from_bytes_be(&magnitude))
        }
    }
}

pub(crate) fn write_var_uint(buf: &mut Vec<u8>, value: u64) {
    let mut groups = 1;
    while value >> (7 * groups) != 0 {
        groups += 1;
    }
    for index in (0..groups).rev() {
        let mut byte = ((value >> (7 * index)) & 0x7f) as u8;
        if index == 0 {
            byte |= 0x80;
        }
        buf.push(byte);
    }
}

/// Writes a VarInt in sign-and-magnitude form. `negative` with a zero
/// magnitude produces negative zero (a single `0xC0` octet).
pub(crate) fn write_var_int_parts(buf: &mut Vec<u8>, negative: bool, magnitude: u64) {
    // The first octet holds only 6 magnitude bits beside the sign.
    let mut groups = 1;
    while magnitude >> (7 * groups - 1) != 0 {
        groups += 1;
    }
    for index in (0..groups).rev() {
        let mut byte = ((magnitude >> (7 * index)) & 0x7f) as u8;
        if index == groups - 1 && negative {
            byte |= 0x40;
        }
        if index == 0 {
            byte |= 0x80;
        }
        buf.push(byte);
    }
}

pub(crate) fn write_var_int(buf: &mut Vec<u8>, value: i64) {
    write_var_int_parts(buf, value < 0, value.unsigned_abs());
}

/// Writes a UInt field. Zero has an empty representation; the enclosing
/// length carries that fact.
pub(crate) fn write_uint(buf: &mut Vec<u8>, value: &BigUint) {
    if !value.is_zero() {
        buf.extend_from_slice(&value.to_bytes_be());
    }
}

/// Writes an Int field in sign-and-magnitude form. Positive zero has an
/// empty representation; negative zero is the single octet `0x80`.
pub(crate) fn write_int_parts(buf: &mut Vec<u8>, negative: bool, magnitude: &BigUint) {
    if magnitude.is_zero() {
        if negative {
            buf.push(0x80);
        }
        return;
    }
    let mut bytes = magnitude.to_bytes_be();
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0);
    }
    if negative {
        bytes[0] |= 0x80;
    }
    buf.extend_from_slice(&bytes);
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use hex::decode;
    use num_bigint::BigInt;
    use pretty_assertions::assert_eq;

    use super::*;

    fn int_round_trip(hex: &str, expected: i128) {
        let bytes = decode(hex).unwrap();
        let (negative, magnitude) = read_int_parts(&bytes);
        let mut value = BigInt::from(magnitude);
        if negative {
            value = -value;
        }
        assert_eq!(value, BigInt::from(expected));

        let mut written = Vec::new();
        write_int_parts(&mut written, negative, &BigUint::from(expected.unsigned_abs()));
        assert_eq!(bytes, written);
    }

    /// Examples from the good/subfieldInt test vectors.
    #[test]
    fn test_subfieldInt() {
        int_round_trip("7f", 127);
        int_round_trip("7fff", 32767);
        int_round_trip("7fffff", 8_388_607);
        int_round_trip("7fffffff", 2_147_483_647);
        int_round_trip("7fffffffff", 549_755_813_887);
        int_round_trip("7fffffffffffffff", 9_223_372_036_854_775_807);
        int_round_trip("00ffffffffffffffff", 18_446_744_073_709_551_615);
        int_round_trip("7fffffffffffffffff", 2_361_183_241_434_822_606_847);
        int_round_trip("7fffffffffffffffffff", 604_462_909_807_314_587_353_087);
    }

    #[test]
    fn test_subfieldInt_sign_only_differs() {
        let mut positive = Vec::new();
        write_int_parts(&mut positive, false, &BigUint::from(123_456u32));
        let mut negative = Vec::new();
        write_int_parts(&mut negative, true, &BigUint::from(123_456u32));
        assert_eq!(positive.len(), negative.len());
        assert_eq!(positive[0] ^ negative[0], 0x80);
        assert_eq!(positive[1..], negative[1..]);
    }

    #[test]
    fn test_negative_zero_int() {
        let mut buf = Vec::new();
        write_int_parts(&mut buf, true, &BigUint::zero());
        assert_eq!(buf, vec![0x80]);
        assert_eq!(read_int_parts(&[0x80]), (true, BigUint::zero()));
        assert_eq!(read_int_parts(&[]), (false, BigUint::zero()));
    }

    fn uint_round_trip(hex: &str, expected: u128) {
        let bytes = decode(hex).unwrap();
        let magnitude = read_uint(&bytes);
        assert_eq!(magnitude, BigUint::from(expected));
        let mut written = Vec::new();
        write_uint(&mut written, &magnitude);
        assert_eq!(bytes, written);
    }

    /// Examples from the good/subfieldUint test vectors.
    #[test]
    fn test_subfieldUint() {
        uint_round_trip("ff", 255);
        uint_round_trip("ffff", 65535);
        uint_round_trip("ffffff", 16_777_215);
        uint_round_trip("ffffffff", 4_294_967_295);
        uint_round_trip("ffffffffffff", 281_474_976_710_655);
        uint_round_trip("ffffffffffffffff", 18_446_744_073_709_551_615);
        uint_round_trip("ffffffffffffffffffff", 1_208_925_819_614_629_174_706_175);
    }

    #[test]
    fn test_uint_u64_fast_path() {
        assert_eq!(read_uint_u64(&[]), Some(0));
        assert_eq!(read_uint_u64(&[0x01, 0x00]), Some(256));
        assert_eq!(read_uint_u64(&decode("ffffffffffffffff").unwrap()), Some(u64::MAX));
        assert_eq!(read_uint_u64(&decode("01ffffffffffffffff").unwrap()), None);
    }

    fn var_int_round_trip(hex: &str, expected: i64) {
        let bytes = decode(hex).unwrap();
        let mut pos = 0;
        let value = read_var_int(&bytes, &mut pos).unwrap();
        assert_eq!(pos, bytes.len());
        assert_eq!(value, expected);
        let mut written = Vec::new();
        write_var_int(&mut written, value);
        assert_eq!(bytes, written);
    }

    /// Examples from the good/subfieldVarInt test vectors.
    #[test]
    fn test_subfieldVarInt() {
        var_int_round_trip("bf", 63);
        var_int_round_trip("3fff", 8191);
        var_int_round_trip("3f7fff", 1_048_575);
        var_int_round_trip("3f7f7fff", 134_217_727);
        var_int_round_trip("077f7f7fff", 2_147_483_647);
        var_int_round_trip("a0", 32);
        var_int_round_trip("2080", 4096);
        var_int_round_trip("c1", -1);
    }

    #[test]
    fn test_var_int_negative_zero() {
        let mut pos = 0;
        assert_eq!(read_var_int_parts(&[0xc0], &mut pos).unwrap(), (true, 0));
        let mut buf = Vec::new();
        write_var_int_parts(&mut buf, true, 0);
        assert_eq!(buf, vec![0xc0]);
    }

    fn var_uint_round_trip(hex: &str, expected: u64) {
        let bytes = decode(hex).unwrap();
        let mut pos = 0;
        let value = read_var_uint(&bytes, &mut pos).unwrap();
        assert_eq!(pos, bytes.len());
        assert_eq!(value, expected);
        let mut written = Vec::new();
        write_var_uint(&mut written, value);
        assert_eq!(bytes, written);
    }

    /// Examples from the good/subfieldVarUint test vectors.
    #[test]
    fn test_subfieldVarUint() {
        var_uint_round_trip("80", 0);
        var_uint_round_trip("ff", 127);
        var_uint_round_trip("7fff", 16383);
        var_uint_round_trip("7f7fff", 2_097_151);
        var_uint_round_trip("7f7f7fff", 268_435_455);
        var_uint_round_trip("077f7f7fff", 2_147_483_647);
    }

    #[test]
    fn test_truncated_var_uint_is_eof() {
        let mut pos = 0;
        assert_eq!(
            read_var_uint(&[0x7f, 0x7f], &mut pos),
            Err(Error::UnexpectedEof)
        );
    }
}
