//! Observable machine state.

use alloc::{string::String, vec::Vec};

use serde::{Deserialize, Serialize};

/// One byte of memory as reported in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCell {
    pub address: u32,
    pub value: u8,
    /// `0x`-prefixed, two upper-case hex digits.
    pub hex: String,
}

/// Registers, pc, every memory byte, halt flag and steps taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub registers: [i32; 32],
    pub pc: u32,
    pub memory: Vec<MemoryCell>,
    pub halted: bool,
    pub step_count: u64,
}

impl Snapshot {
    /// `(index, value)` for every register that is not zero.
    pub fn nonzero_registers(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.registers
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, v)| v != 0)
    }

    /// Memory cells holding a non-zero byte.
    pub fn nonzero_memory(&self) -> impl Iterator<Item = &MemoryCell> {
        self.memory.iter().filter(|cell| cell.value != 0)
    }

    /// Little-endian word starting at `address`, if it lies inside the snapshot.
    pub fn word_at(&self, address: usize) -> Option<i32> {
        let bytes = self.memory.get(address..address.checked_add(4)?)?;
        Some(i32::from_le_bytes([
            bytes[0].value,
            bytes[1].value,
            bytes[2].value,
            bytes[3].value,
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn test_json_shape() {
        let mut mem = Memory::new(2);
        mem.write_byte(0, 0xAB).unwrap();
        let mut registers = [0; 32];
        registers[3] = 15;
        let snapshot = Snapshot {
            registers,
            pc: 4,
            memory: mem.cells(),
            halted: true,
            step_count: 4,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["pc"], 4);
        assert_eq!(json["halted"], true);
        assert_eq!(json["stepCount"], 4);
        assert_eq!(json["registers"][3], 15);
        assert_eq!(json["memory"][0]["hex"], "0xAB");
        assert_eq!(json["memory"][0]["value"], 171);
        assert_eq!(json["memory"][1]["address"], 1);

        let back: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_word_at() {
        let mut mem = Memory::new(8);
        mem.write_word(4, 42).unwrap();
        let snapshot = Snapshot {
            registers: [0; 32],
            pc: 0,
            memory: mem.cells(),
            halted: false,
            step_count: 0,
        };
        assert_eq!(snapshot.word_at(4), Some(42));
        assert_eq!(snapshot.word_at(5), None);
        assert_eq!(snapshot.word_at(usize::MAX - 1), None);
        assert_eq!(snapshot.word_at(usize::MAX), None);
        assert_eq!(snapshot.nonzero_memory().count(), 1);
        assert_eq!(snapshot.nonzero_registers().count(), 0);
    }
}
