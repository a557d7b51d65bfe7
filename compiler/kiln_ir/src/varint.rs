//! LEB128 and zig-zag helpers shared by the codec and the debug sections.

use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum VarintError {
    #[error("truncated varint at byte {0}")]
    Truncated(usize),
    #[error("varint at byte {0} does not fit in 64 bits")]
    Overflow(usize),
}

/// Append `value` as unsigned LEB128.
pub fn write_unsigned(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Append `value` zig-zag mapped, then as unsigned LEB128.
pub fn write_signed(out: &mut Vec<u8>, value: i64) {
    write_unsigned(out, zigzag_encode(value));
}

/// Read an unsigned LEB128 value starting at `*pos`, advancing `*pos`.
pub fn read_unsigned(data: &[u8], pos: &mut usize) -> Result<u64, VarintError> {
    let start = *pos;
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        let Some(&byte) = data.get(*pos) else {
            return Err(VarintError::Truncated(start));
        };
        *pos += 1;
        let payload = u64::from(byte & 0x7F);
        if shift >= 64 || (shift == 63 && payload > 1) {
            return Err(VarintError::Overflow(start));
        }
        result |= payload << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Read a zig-zag LEB128 value starting at `*pos`, advancing `*pos`.
pub fn read_signed(data: &[u8], pos: &mut usize) -> Result<i64, VarintError> {
    read_unsigned(data, pos).map(zigzag_decode)
}

#[inline]
#[expect(
    clippy::cast_sign_loss,
    reason = "zig-zag reinterprets the two's-complement bits"
)]
pub const fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
#[expect(
    clippy::cast_possible_wrap,
    reason = "zig-zag reinterprets the two's-complement bits"
)]
pub const fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
