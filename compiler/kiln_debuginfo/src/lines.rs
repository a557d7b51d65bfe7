//! Line table: a delta-coded stream mapping instruction pointers to source
//! positions.
//!
//! The writer tracks the last written pointer, file and line. A location whose
//! file is unchanged, whose pointer advanced by `1..32` and whose line moved by
//! at most three is a single compact byte:
//!
//! ```text
//! USER + 32 * (line delta + 3) + pointer delta
//! ```
//!
//! Anything else flushes the pointer (`PTR`, LEB128 delta), then writes `FILE`
//! (which resets the line to 1) and `LINE` (signed delta) as needed.
//!
//! `START method` and `END` bracket an inlined region. The reader pushes the
//! caller's `(file, line)` on `START` and restores it on `END`.

use kiln_ir::varint::{read_signed, read_unsigned, write_signed};

use crate::{write_unsigned, DebugFileError};

pub const START: u8 = 0;
pub const END: u8 = 1;
pub const LINE: u8 = 2;
pub const FILE: u8 = 3;
pub const PTR: u8 = 4;
pub const USER: u8 = 10;

const COMPACT_PTR_LIMIT: u32 = 32;
const COMPACT_LINE_RANGE: i64 = 3;

#[derive(Debug)]
pub struct DebugLines {
    section: Vec<u8>,
    ptr: u32,
    written_ptr: u32,
    file: u32,
    line: u32,
    inlined: Vec<(u32, u32)>,
}

impl Default for DebugLines {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugLines {
    pub fn new() -> Self {
        Self {
            section: Vec::new(),
            ptr: 0,
            written_ptr: 0,
            file: 0,
            line: 1,
            inlined: Vec::new(),
        }
    }

    /// Move the instruction pointer forward.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is behind the current pointer.
    pub fn advance(&mut self, ptr: u32) {
        assert!(
            ptr >= self.ptr,
            "line table pointer moved backward from {} to {ptr}",
            self.ptr
        );
        self.ptr = ptr;
    }

    /// Record that code at the current pointer comes from `file:line`.
    pub fn location(&mut self, file: u32, line: u32) {
        let line_delta = i64::from(line) - i64::from(self.line);
        if file == self.file && line_delta != 0 {
            let ptr_delta = self.ptr - self.written_ptr;
            if (1..COMPACT_PTR_LIMIT).contains(&ptr_delta)
                && line_delta.abs() <= COMPACT_LINE_RANGE
            {
                self.section.push(compact_opcode(ptr_delta, line_delta));
                self.written_ptr = self.ptr;
                self.line = line;
                return;
            }
        }

        if file != self.file {
            self.flush_ptr();
            self.section.push(FILE);
            write_unsigned(&mut self.section, file);
            self.file = file;
            self.line = 1;
        }
        if line != self.line {
            self.flush_ptr();
            self.section.push(LINE);
            write_signed(&mut self.section, i64::from(line) - i64::from(self.line));
            self.line = line;
        }
    }

    /// Enter an inlined body of `method`.
    pub fn start(&mut self, method: u32) {
        self.flush_ptr();
        self.section.push(START);
        write_unsigned(&mut self.section, method);
        self.inlined.push((self.file, self.line));
        self.file = 0;
        self.line = 1;
    }

    /// Leave the innermost inlined body, restoring the caller's position.
    pub fn end(&mut self) {
        self.flush_ptr();
        self.section.push(END);
        if let Some((file, line)) = self.inlined.pop() {
            self.file = file;
            self.line = line;
        }
    }

    pub fn ptr(&self) -> u32 {
        self.ptr
    }

    pub fn is_empty(&self) -> bool {
        self.section.is_empty()
    }

    pub fn section(&self) -> &[u8] {
        &self.section
    }

    pub(crate) fn into_section(self) -> Vec<u8> {
        self.section
    }

    fn flush_ptr(&mut self) {
        if self.ptr != self.written_ptr {
            self.section.push(PTR);
            write_unsigned(&mut self.section, self.ptr - self.written_ptr);
            self.written_ptr = self.ptr;
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "bounded by the compact form limits to at most 233"
)]
fn compact_opcode(ptr_delta: u32, line_delta: i64) -> u8 {
    let line_part = (line_delta + COMPACT_LINE_RANGE) as u32;
    (u32::from(USER) + COMPACT_PTR_LIMIT * line_part + ptr_delta) as u8
}

// ── Reader ──

/// One decoded line table event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineEntry {
    /// Code from `ptr` on comes from `file:line`.
    Location { ptr: u32, file: u32, line: u32 },
    InlineStart { ptr: u32, method: u32 },
    InlineEnd { ptr: u32 },
}

/// Iterates a line section as [`LineEntry`] rows.
///
/// A `FILE` immediately followed by `LINE` describes one position and yields
/// a single row. Iteration stops after the first error.
pub struct LineTableReader<'a> {
    data: &'a [u8],
    pos: usize,
    ptr: u32,
    file: u32,
    line: u32,
    inlined: Vec<(u32, u32)>,
}

impl<'a> LineTableReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            ptr: 0,
            file: 0,
            line: 1,
            inlined: Vec::new(),
        }
    }

    fn location(&self) -> LineEntry {
        LineEntry::Location {
            ptr: self.ptr,
            file: self.file,
            line: self.line,
        }
    }

    fn u32(&mut self, offset: usize) -> Result<u32, DebugFileError> {
        let value = read_unsigned(self.data, &mut self.pos)?;
        u32::try_from(value).map_err(|_| DebugFileError::OutOfRange { offset })
    }

    fn add_ptr(&mut self, delta: u32, offset: usize) -> Result<(), DebugFileError> {
        self.ptr = self
            .ptr
            .checked_add(delta)
            .ok_or(DebugFileError::OutOfRange { offset })?;
        Ok(())
    }

    fn add_line(&mut self, delta: i64, offset: usize) -> Result<(), DebugFileError> {
        self.line = i64::from(self.line)
            .checked_add(delta)
            .and_then(|line| u32::try_from(line).ok())
            .ok_or(DebugFileError::OutOfRange { offset })?;
        Ok(())
    }

    fn step(&mut self) -> Result<Option<LineEntry>, DebugFileError> {
        loop {
            let offset = self.pos;
            let Some(&opcode) = self.data.get(offset) else {
                return Ok(None);
            };
            self.pos += 1;
            match opcode {
                START => {
                    let method = self.u32(offset)?;
                    self.inlined.push((self.file, self.line));
                    self.file = 0;
                    self.line = 1;
                    return Ok(Some(LineEntry::InlineStart {
                        ptr: self.ptr,
                        method,
                    }));
                }
                END => {
                    if let Some((file, line)) = self.inlined.pop() {
                        self.file = file;
                        self.line = line;
                    }
                    return Ok(Some(LineEntry::InlineEnd { ptr: self.ptr }));
                }
                PTR => {
                    let delta = self.u32(offset)?;
                    self.add_ptr(delta, offset)?;
                }
                FILE => {
                    self.file = self.u32(offset)?;
                    self.line = 1;
                    if self.data.get(self.pos) != Some(&LINE) {
                        return Ok(Some(self.location()));
                    }
                }
                LINE => {
                    let delta = read_signed(self.data, &mut self.pos)?;
                    self.add_line(delta, offset)?;
                    return Ok(Some(self.location()));
                }
                USER.. => {
                    let value = u32::from(opcode - USER);
                    self.add_ptr(value % COMPACT_PTR_LIMIT, offset)?;
                    self.add_line(
                        i64::from(value / COMPACT_PTR_LIMIT) - COMPACT_LINE_RANGE,
                        offset,
                    )?;
                    return Ok(Some(self.location()));
                }
                _ => return Err(DebugFileError::UnknownOpcode { opcode, offset }),
            }
        }
    }
}

impl Iterator for LineTableReader<'_> {
    type Item = Result<LineEntry, DebugFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(entry) => entry.map(Ok),
            Err(error) => {
                self.pos = self.data.len();
                Some(Err(error))
            }
        }
    }
}
