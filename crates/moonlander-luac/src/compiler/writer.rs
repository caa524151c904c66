// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sequential byte sink for the chunk container format.
//!
//! The emitter fully materializes every function context before any
//! serialization begins, so the writer never backtracks: the header and
//! every section are written in one forward pass. All multi-byte values
//! are little-endian with the widths the chunk header declares
//! (4-byte ints, 8-byte sizes, 4-byte instructions, 8-byte integers and
//! floats).

/// A growing byte buffer with the container's fixed encodings.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends a single byte.
    pub fn write_byte(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Appends a 4-byte C `int`.
    pub fn write_int(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Appends a 4-byte instruction word.
    pub fn write_instruction(&mut self, word: u32) {
        self.buffer.extend_from_slice(&word.to_le_bytes());
    }

    /// Appends an 8-byte VM integer.
    pub fn write_integer(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Appends an 8-byte VM float.
    pub fn write_number(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Appends a string in the chunk dump format.
    ///
    /// `None` is a single zero byte. Otherwise a size prefix counting a
    /// trailing terminator (one byte, or `0xFF` plus an 8-byte size for
    /// long strings), followed by the bytes without the terminator.
    pub fn write_string(&mut self, value: Option<&str>) {
        match value {
            None => self.write_byte(0),
            Some(s) => {
                let size = s.len() + 1;
                if size < 0xFF {
                    self.write_byte(size as u8);
                } else {
                    self.write_byte(0xFF);
                    self.buffer.extend_from_slice(&(size as u64).to_le_bytes());
                }
                self.write_bytes(s.as_bytes());
            }
        }
    }

    /// Consumes the writer, returning the finished byte stream.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_byte_and_bytes() {
        let mut writer = BinaryWriter::new();
        writer.write_byte(0x1b);
        writer.write_bytes(&[0x4c, 0x75, 0x61]);
        assert_eq!(writer.into_bytes(), vec![0x1b, 0x4c, 0x75, 0x61]);
    }

    #[test]
    fn test_write_int_little_endian() {
        let mut writer = BinaryWriter::new();
        writer.write_int(1);
        writer.write_int(-1);
        assert_eq!(
            writer.into_bytes(),
            vec![1, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn test_write_integer_little_endian() {
        let mut writer = BinaryWriter::new();
        writer.write_integer(0x5678);
        assert_eq!(
            writer.into_bytes(),
            vec![0x78, 0x56, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_write_number_little_endian() {
        let mut writer = BinaryWriter::new();
        writer.write_number(370.5);
        assert_eq!(
            writer.into_bytes(),
            vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x28, 0x77, 0x40]
        );
    }

    #[test]
    fn test_write_string_none() {
        let mut writer = BinaryWriter::new();
        writer.write_string(None);
        assert_eq!(writer.into_bytes(), vec![0]);
    }

    #[test]
    fn test_write_string_short() {
        let mut writer = BinaryWriter::new();
        writer.write_string(Some("abc"));
        assert_eq!(writer.into_bytes(), vec![4, b'a', b'b', b'c']);
    }

    #[test]
    fn test_write_string_long() {
        let text = "x".repeat(300);
        let mut writer = BinaryWriter::new();
        writer.write_string(Some(&text));
        let bytes = writer.into_bytes();
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(&bytes[1..9], &301u64.to_le_bytes());
        assert_eq!(bytes.len(), 1 + 8 + 300);
    }

    #[test]
    fn test_write_string_boundary_stays_short() {
        // a 253-char string has size 254, the largest single-byte prefix
        let text = "y".repeat(253);
        let mut writer = BinaryWriter::new();
        writer.write_string(Some(&text));
        let bytes = writer.into_bytes();
        assert_eq!(bytes[0], 254);
        assert_eq!(bytes.len(), 1 + 253);
    }
}
