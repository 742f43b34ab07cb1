//! Byte-addressable data memory.

use alloc::{format, vec, vec::Vec};

use crate::{
    error::{MemoryAccessKind, MemoryError},
    snapshot::MemoryCell,
};

/// Default memory size in bytes.
pub const DEFAULT_MEMORY_SIZE: usize = 1024;

/// Fixed-size little-endian memory.
///
/// Addresses are `i64` so that a negative `base + offset` reaches the bounds
/// check instead of wrapping. A multi-byte access is checked as a whole before
/// any byte is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Create a zeroed memory of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Zero every byte.
    pub fn reset(&mut self) {
        self.bytes.fill(0);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Snapshot rows for every address.
    pub fn cells(&self) -> Vec<MemoryCell> {
        self.bytes
            .iter()
            .enumerate()
            .map(|(address, &value)| MemoryCell {
                address: address as u32,
                value,
                hex: format!("0x{:02X}", value),
            })
            .collect()
    }

    /// Validate `[address, address + width)` and return the start offset.
    fn range(
        &self,
        address: i64,
        width: usize,
        kind: MemoryAccessKind,
    ) -> Result<usize, MemoryError> {
        let size = self.bytes.len();
        if address < 0 || address as u64 + width as u64 > size as u64 {
            return Err(MemoryError {
                address,
                width,
                kind,
                size,
            });
        }
        Ok(address as usize)
    }

    fn read<const N: usize>(&self, address: i64) -> Result<[u8; N], MemoryError> {
        let start = self.range(address, N, MemoryAccessKind::Read)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.bytes[start..start + N]);
        Ok(buf)
    }

    fn write<const N: usize>(&mut self, address: i64, data: [u8; N]) -> Result<(), MemoryError> {
        let start = self.range(address, N, MemoryAccessKind::Write)?;
        self.bytes[start..start + N].copy_from_slice(&data);
        Ok(())
    }

    /// Read an unsigned byte.
    pub fn read_byte(&self, address: i64) -> Result<u8, MemoryError> {
        self.read::<1>(address).map(|[b]| b)
    }

    /// Read a byte and sign-extend it.
    pub fn read_byte_signed(&self, address: i64) -> Result<i32, MemoryError> {
        self.read_byte(address).map(|b| b as i8 as i32)
    }

    /// Read a half-word and sign-extend it.
    pub fn read_half(&self, address: i64) -> Result<i32, MemoryError> {
        self.read::<2>(address).map(|b| i16::from_le_bytes(b) as i32)
    }

    /// Read a half-word and zero-extend it.
    pub fn read_half_unsigned(&self, address: i64) -> Result<i32, MemoryError> {
        self.read::<2>(address).map(|b| u16::from_le_bytes(b) as i32)
    }

    pub fn read_word(&self, address: i64) -> Result<i32, MemoryError> {
        self.read::<4>(address).map(i32::from_le_bytes)
    }

    /// Write the low 8 bits of `value`.
    pub fn write_byte(&mut self, address: i64, value: i32) -> Result<(), MemoryError> {
        self.write(address, [value as u8])
    }

    /// Write the low 16 bits of `value`.
    pub fn write_half(&mut self, address: i64, value: i32) -> Result<(), MemoryError> {
        self.write(address, (value as u16).to_le_bytes())
    }

    pub fn write_word(&mut self, address: i64, value: i32) -> Result<(), MemoryError> {
        self.write(address, value.to_le_bytes())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}
