//! External debug file container.
//!
//! ```text
//! magic    u32 LE  0x67626474
//! version  u32 LE  1
//! records  name length (1 byte), ASCII name, LEB128 data length, data
//! ```

use kiln_ir::varint::read_unsigned;

use crate::{DebugFileError, DebugSection};

pub const DEBUG_FILE_MAGIC: u32 = 0x6762_6474;
pub const DEBUG_FILE_VERSION: u32 = 1;

pub fn write_debug_file(sections: &[DebugSection]) -> Result<Vec<u8>, DebugFileError> {
    let mut out = Vec::new();
    out.extend_from_slice(&DEBUG_FILE_MAGIC.to_le_bytes());
    out.extend_from_slice(&DEBUG_FILE_VERSION.to_le_bytes());
    for section in sections {
        let name_len = u8::try_from(section.name.len())
            .ok()
            .filter(|_| section.name.is_ascii())
            .ok_or_else(|| DebugFileError::InvalidName(section.name.clone()))?;
        out.push(name_len);
        out.extend_from_slice(section.name.as_bytes());
        kiln_ir::varint::write_unsigned(&mut out, section.data.len() as u64);
        out.extend_from_slice(&section.data);
    }
    Ok(out)
}

pub fn read_debug_file(data: &[u8]) -> Result<Vec<DebugSection>, DebugFileError> {
    let mut pos = 0;
    let magic = read_u32(data, &mut pos)?;
    if magic != DEBUG_FILE_MAGIC {
        return Err(DebugFileError::BadMagic(magic));
    }
    let version = read_u32(data, &mut pos)?;
    if version != DEBUG_FILE_VERSION {
        return Err(DebugFileError::UnsupportedVersion(version));
    }

    let mut sections = Vec::new();
    while pos < data.len() {
        let name_len = usize::from(data[pos]);
        pos += 1;
        let name = take(data, &mut pos, name_len)?;
        let name = String::from_utf8_lossy(name).into_owned();
        if !name.is_ascii() {
            return Err(DebugFileError::InvalidName(name));
        }

        let offset = pos;
        let len = usize::try_from(read_unsigned(data, &mut pos)?)
            .map_err(|_| DebugFileError::Truncated { offset })?;
        let bytes = take(data, &mut pos, len)?;
        sections.push(DebugSection::new(name, bytes.to_vec()));
    }
    Ok(sections)
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32, DebugFileError> {
    let bytes = take(data, pos, 4)?;
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    Ok(u32::from_le_bytes(word))
}

fn take<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], DebugFileError> {
    let offset = *pos;
    let bytes = offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(DebugFileError::Truncated { offset })?;
    *pos += len;
    Ok(bytes)
}

#[cfg(test)]
mod tests;
