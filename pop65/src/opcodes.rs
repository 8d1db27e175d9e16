//! 6502 opcode tables and initialization

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::addressing::AddrMode;

pub type ModeTable = HashMap<AddrMode, u8>;

pub struct OpcodeTables {
    /// Opcodes by mnemonic -> addressing mode -> opcode
    opcodes: HashMap<&'static str, ModeTable>,
}

static TABLES: LazyLock<OpcodeTables> = LazyLock::new(OpcodeTables::new);

/// Addressing modes and opcode bytes of a mnemonic (any case).
pub fn lookup(mnemonic: &str) -> Option<&'static ModeTable> {
    TABLES.get(mnemonic)
}

pub fn is_mnemonic(name: &str) -> bool {
    lookup(name).is_some()
}

impl OpcodeTables {
    pub fn new() -> Self {
        let mut tables = Self {
            opcodes: HashMap::new(),
        };
        tables.init_implied();
        tables.init_branches();
        tables.init_address_modes();
        tables
    }

    pub fn get(&self, mnemonic: &str) -> Option<&ModeTable> {
        self.opcodes.get(mnemonic.to_ascii_uppercase().as_str())
    }

    fn insert(&mut self, mnemonic: &'static str, modes: &[(AddrMode, u8)]) {
        self.opcodes
            .entry(mnemonic)
            .or_default()
            .extend(modes.iter().copied());
    }

    fn init_implied(&mut self) {
        for (mnemonic, opcode) in [
            ("BRK", 0x00), ("NOP", 0xEA), ("RTI", 0x40), ("RTS", 0x60),
            ("CLC", 0x18), ("SEC", 0x38), ("CLD", 0xD8), ("SED", 0xF8),
            ("CLI", 0x58), ("SEI", 0x78), ("CLV", 0xB8),
            ("TAX", 0xAA), ("TXA", 0x8A), ("TAY", 0xA8), ("TYA", 0x98),
            ("TSX", 0xBA), ("TXS", 0x9A),
            ("INX", 0xE8), ("INY", 0xC8), ("DEX", 0xCA), ("DEY", 0x88),
            ("PHA", 0x48), ("PLA", 0x68), ("PHP", 0x08), ("PLP", 0x28),
            // accumulator forms
            ("ASL", 0x0A), ("LSR", 0x4A), ("ROL", 0x2A), ("ROR", 0x6A),
        ] {
            self.insert(mnemonic, &[(AddrMode::Imp, opcode)]);
        }
    }

    fn init_branches(&mut self) {
        for (mnemonic, opcode) in [
            ("BCC", 0x90), ("BCS", 0xB0), ("BEQ", 0xF0), ("BMI", 0x30),
            ("BNE", 0xD0), ("BPL", 0x10), ("BVC", 0x50), ("BVS", 0x70),
        ] {
            self.insert(mnemonic, &[(AddrMode::Rel, opcode)]);
        }
    }

    fn init_address_modes(&mut self) {
        use AddrMode::*;

        self.insert("LDA", &[
            (Imm, 0xA9), (Zp, 0xA5), (ZpX, 0xB5),
            (Abs, 0xAD), (AbsX, 0xBD), (AbsY, 0xB9),
            (IndX, 0xA1), (IndY, 0xB1),
        ]);
        self.insert("LDX", &[
            (Imm, 0xA2), (Zp, 0xA6), (ZpY, 0xB6),
            (Abs, 0xAE), (AbsY, 0xBE),
        ]);
        self.insert("LDY", &[
            (Imm, 0xA0), (Zp, 0xA4), (ZpX, 0xB4),
            (Abs, 0xAC), (AbsX, 0xBC),
        ]);
        self.insert("STA", &[
            (Zp, 0x85), (ZpX, 0x95),
            (Abs, 0x8D), (AbsX, 0x9D), (AbsY, 0x99),
            (IndX, 0x81), (IndY, 0x91),
        ]);
        self.insert("STX", &[(Zp, 0x86), (ZpY, 0x96), (Abs, 0x8E)]);
        self.insert("STY", &[(Zp, 0x84), (ZpX, 0x94), (Abs, 0x8C)]);
        self.insert("ADC", &[
            (Imm, 0x69), (Zp, 0x65), (ZpX, 0x75),
            (Abs, 0x6D), (AbsX, 0x7D), (AbsY, 0x79),
            (IndX, 0x61), (IndY, 0x71),
        ]);
        self.insert("SBC", &[
            (Imm, 0xE9), (Zp, 0xE5), (ZpX, 0xF5),
            (Abs, 0xED), (AbsX, 0xFD), (AbsY, 0xF9),
            (IndX, 0xE1), (IndY, 0xF1),
        ]);
        self.insert("AND", &[
            (Imm, 0x29), (Zp, 0x25), (ZpX, 0x35),
            (Abs, 0x2D), (AbsX, 0x3D), (AbsY, 0x39),
            (IndX, 0x21), (IndY, 0x31),
        ]);
        self.insert("ORA", &[
            (Imm, 0x09), (Zp, 0x05), (ZpX, 0x15),
            (Abs, 0x0D), (AbsX, 0x1D), (AbsY, 0x19),
            (IndX, 0x01), (IndY, 0x11),
        ]);
        self.insert("EOR", &[
            (Imm, 0x49), (Zp, 0x45), (ZpX, 0x55),
            (Abs, 0x4D), (AbsX, 0x5D), (AbsY, 0x59),
            (IndX, 0x41), (IndY, 0x51),
        ]);
        self.insert("CMP", &[
            (Imm, 0xC9), (Zp, 0xC5), (ZpX, 0xD5),
            (Abs, 0xCD), (AbsX, 0xDD), (AbsY, 0xD9),
            (IndX, 0xC1), (IndY, 0xD1),
        ]);
        self.insert("CPX", &[(Imm, 0xE0), (Zp, 0xE4), (Abs, 0xEC)]);
        self.insert("CPY", &[(Imm, 0xC0), (Zp, 0xC4), (Abs, 0xCC)]);
        self.insert("BIT", &[(Zp, 0x24), (Abs, 0x2C)]);
        self.insert("ASL", &[(Zp, 0x06), (ZpX, 0x16), (Abs, 0x0E), (AbsX, 0x1E)]);
        self.insert("LSR", &[(Zp, 0x46), (ZpX, 0x56), (Abs, 0x4E), (AbsX, 0x5E)]);
        self.insert("ROL", &[(Zp, 0x26), (ZpX, 0x36), (Abs, 0x2E), (AbsX, 0x3E)]);
        self.insert("ROR", &[(Zp, 0x66), (ZpX, 0x76), (Abs, 0x6E), (AbsX, 0x7E)]);
        self.insert("DEC", &[(Zp, 0xC6), (ZpX, 0xD6), (Abs, 0xCE), (AbsX, 0xDE)]);
        self.insert("INC", &[(Zp, 0xE6), (ZpX, 0xF6), (Abs, 0xEE), (AbsX, 0xFE)]);
        self.insert("JMP", &[(Abs, 0x4C), (Ind, 0x6C)]);
        self.insert("JSR", &[(Abs, 0x20)]);
    }
}

impl Default for OpcodeTables {
    fn default() -> Self {
        Self::new()
    }
}
