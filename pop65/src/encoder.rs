//! Instruction encoding: addressing mode selection and operand bytes

use crate::addressing::{AddrMode, Operand};
use crate::error::{AsmError, ErrorKind, Result};
use crate::opcodes::{self, ModeTable};
use crate::parser::expression::Expr;

/// Resolved addressing mode and opcode byte of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    pub mode: AddrMode,
    pub opcode: u8,
}

impl Encoding {
    pub fn size(&self) -> u16 {
        self.mode.size()
    }
}

/// Pick the addressing mode for `mnemonic` with the given operand shape.
///
/// `known` evaluates an expression without forward references. A zero-page
/// form is only chosen when it yields a value that fits in one byte, so the
/// choice comes out the same in both passes.
pub fn select<F>(mnemonic: &str, operand: &Operand, known: F) -> Result<Encoding>
where
    F: Fn(&Expr) -> Option<u16>,
{
    let modes = opcodes::lookup(mnemonic)
        .ok_or_else(|| AsmError::syntax(format!("unknown instruction '{}'", mnemonic)))?;

    let mode = match operand {
        Operand::Implied => Some(AddrMode::Imp),
        Operand::Immediate(_) => Some(AddrMode::Imm),
        Operand::Direct(_) if modes.contains_key(&AddrMode::Rel) => Some(AddrMode::Rel),
        Operand::Direct(e) => zp_or_abs(modes, AddrMode::Zp, AddrMode::Abs, e, &known),
        Operand::IndexedX(e) => zp_or_abs(modes, AddrMode::ZpX, AddrMode::AbsX, e, &known),
        Operand::IndexedY(e) => zp_or_abs(modes, AddrMode::ZpY, AddrMode::AbsY, e, &known),
        Operand::Indirect(_) => Some(AddrMode::Ind),
        Operand::IndirectX(_) => Some(AddrMode::IndX),
        Operand::IndirectY(_) => Some(AddrMode::IndY),
    };

    mode.and_then(|mode| modes.get(&mode).map(|&opcode| Encoding { mode, opcode }))
        .ok_or_else(|| {
            AsmError::syntax(format!(
                "{} does not support {} addressing",
                mnemonic.to_ascii_uppercase(),
                shape_name(operand)
            ))
        })
}

fn zp_or_abs<F>(modes: &ModeTable, zp: AddrMode, abs: AddrMode, e: &Expr, known: &F) -> Option<AddrMode>
where
    F: Fn(&Expr) -> Option<u16>,
{
    let has_zp = modes.contains_key(&zp);
    if has_zp && known(e).is_some_and(|v| v <= 0xFF) {
        Some(zp)
    } else if modes.contains_key(&abs) {
        Some(abs)
    } else if has_zp {
        Some(zp)
    } else {
        None
    }
}

fn shape_name(operand: &Operand) -> &'static str {
    match operand {
        Operand::Implied => "implied",
        Operand::Immediate(_) => "immediate",
        Operand::Direct(_) => "absolute",
        Operand::IndexedX(_) => "absolute,X",
        Operand::IndexedY(_) => "absolute,Y",
        Operand::Indirect(_) => "indirect",
        Operand::IndirectX(_) => "indirect,X",
        Operand::IndirectY(_) => "indirect,Y",
    }
}

/// Emit the full instruction: opcode followed by its operand bytes.
pub fn encode(enc: Encoding, value: Option<u16>, pc: u16) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(enc.size() as usize);
    bytes.push(enc.opcode);
    match (enc.mode, value) {
        (AddrMode::Imp, _) => {}
        (_, None) => return Err(AsmError::syntax(format!("{} operand missing", enc.mode))),
        (AddrMode::Rel, Some(target)) => {
            let offset = target.wrapping_sub(pc.wrapping_add(2)) as i16;
            let byte = i8::try_from(offset).map_err(|_| {
                AsmError::new(
                    ErrorKind::Range,
                    format!("branch to ${:04X} is {} bytes away, limit is -128..127", target, offset),
                )
            })?;
            bytes.push(byte as u8);
        }
        (mode, Some(v)) if mode.size() == 2 => {
            let byte = u8::try_from(v).map_err(|_| {
                AsmError::new(ErrorKind::Range, format!("${:04X} does not fit {} operand", v, mode))
            })?;
            bytes.push(byte);
        }
        (_, Some(v)) => bytes.extend_from_slice(&v.to_le_bytes()),
    }
    Ok(bytes)
}
