use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::opcode::Opcode;
use crate::reg::{Reg, VReg};
use crate::vtype::VType;

/// The operand index of the `vtypei` immediate of `vsetvli`/`vsetivli`.
pub const VTYPEI_OPERAND: usize = 2;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Operand {
    Reg(Reg),
    VReg(VReg),
    Imm(i64),
    /// A memory reference, `offset(base)`.
    Mem { base: Reg, offset: i32 },
    /// The `v0.t` mask operand.
    Mask,
}

impl core::fmt::Display for Operand {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Operand::Reg(reg) => core::fmt::Display::fmt(reg, fmt),
            Operand::VReg(reg) => core::fmt::Display::fmt(reg, fmt),
            Operand::Imm(imm) => write!(fmt, "{imm}"),
            Operand::Mem { base, offset: 0 } => write!(fmt, "({base})"),
            Operand::Mem { base, offset } => write!(fmt, "{offset}({base})"),
            Operand::Mask => fmt.write_str("v0.t"),
        }
    }
}

/// A decoded instruction: an opcode and its operands.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Inst {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

impl Inst {
    pub fn new(opcode: Opcode, operands: impl Into<Vec<Operand>>) -> Self {
        Inst {
            opcode,
            operands: operands.into(),
        }
    }

    pub fn vsetvli(rd: Reg, rs1: Reg, vtype: VType) -> Self {
        Inst::new(
            Opcode::VSETVLI,
            [Operand::Reg(rd), Operand::Reg(rs1), Operand::Imm(i64::from(vtype.to_bits()))],
        )
    }

    pub fn vsetivli(rd: Reg, avl: u8, vtype: VType) -> Self {
        Inst::new(
            Opcode::VSETIVLI,
            [Operand::Reg(rd), Operand::Imm(i64::from(avl)), Operand::Imm(i64::from(vtype.to_bits()))],
        )
    }

    #[inline]
    pub fn operand(&self, index: usize) -> Option<Operand> {
        self.operands.get(index).copied()
    }

    #[inline]
    pub fn imm(&self, index: usize) -> Option<i64> {
        match self.operand(index)? {
            Operand::Imm(imm) => Some(imm),
            _ => None,
        }
    }

    /// Returns the `vtype` this instruction establishes, if it's known statically.
    ///
    /// Only `vsetvli` and `vsetivli` carry it as an immediate; `vsetvl` reads it
    /// from a register, and reserved encodings yield `None`.
    pub fn vtype(&self) -> Option<VType> {
        match self.opcode {
            Opcode::VSETVLI | Opcode::VSETIVLI => {
                let bits = u32::try_from(self.imm(VTYPEI_OPERAND)?).ok()?;
                VType::from_bits(bits)
            }
            _ => None,
        }
    }

    fn has_vtype_immediate(opcode: Opcode) -> bool {
        matches!(opcode, Opcode::VSETVLI | Opcode::VSETIVLI)
    }
}

impl core::fmt::Display for Inst {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.write_str(self.opcode.mnemonic())?;
        for (index, operand) in self.operands.iter().enumerate() {
            fmt.write_str(if index == 0 { " " } else { ", " })?;
            match (index, operand) {
                (VTYPEI_OPERAND, Operand::Imm(_)) if Self::has_vtype_immediate(self.opcode) => match self.vtype() {
                    Some(vtype) => write!(fmt, "{vtype}")?,
                    None => write!(fmt, "{operand}")?,
                },
                _ => write!(fmt, "{operand}")?,
            }
        }

        Ok(())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum InstParseError {
    Empty,
    UnknownOpcode(String),
    InvalidOperand(String),
    InvalidVType(&'static str),
    MissingVType,
}

impl core::fmt::Display for InstParseError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            InstParseError::Empty => fmt.write_str("expected an instruction"),
            InstParseError::UnknownOpcode(mnemonic) => write!(fmt, "unknown instruction: '{mnemonic}'"),
            InstParseError::InvalidOperand(operand) => write!(fmt, "invalid operand: '{operand}'"),
            InstParseError::InvalidVType(error) => write!(fmt, "invalid vector type: {error}"),
            InstParseError::MissingVType => fmt.write_str("missing vector type operand"),
        }
    }
}

impl core::error::Error for InstParseError {}

fn parse_imm(text: &str) -> Option<i64> {
    let (negative, text) = match text.strip_prefix('-') {
        Some(text) => (true, text),
        None => (false, text),
    };

    let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if text.starts_with(|ch: char| ch.is_ascii_digit()) {
        text.parse::<i64>().ok()?
    } else {
        return None;
    };

    Some(if negative { -value } else { value })
}

fn parse_operand(text: &str) -> Result<Operand, InstParseError> {
    let invalid = || InstParseError::InvalidOperand(text.to_string());

    if text == "v0.t" {
        return Ok(Operand::Mask);
    }

    if let Some(reg) = VReg::from_name(text) {
        return Ok(Operand::VReg(reg));
    }

    if let Some(reg) = Reg::from_name(text) {
        return Ok(Operand::Reg(reg));
    }

    if let Some((offset, rest)) = text.split_once('(') {
        let base = rest.strip_suffix(')').map(str::trim).and_then(Reg::from_name).ok_or_else(invalid)?;
        let offset = offset.trim();
        let offset = if offset.is_empty() {
            0
        } else {
            parse_imm(offset).and_then(|offset| i32::try_from(offset).ok()).ok_or_else(invalid)?
        };

        return Ok(Operand::Mem { base, offset });
    }

    parse_imm(text).map(Operand::Imm).ok_or_else(invalid)
}

impl core::str::FromStr for Inst {
    type Err = InstParseError;

    /// Parses a single instruction in assembly syntax, e.g. `vadd.vv v1, v2, v3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InstParseError::Empty);
        }

        let (mnemonic, rest) = match s.split_once(char::is_whitespace) {
            Some((mnemonic, rest)) => (mnemonic, rest.trim()),
            None => (s, ""),
        };

        let opcode: Opcode = mnemonic.parse().map_err(|_| InstParseError::UnknownOpcode(mnemonic.to_string()))?;
        let mut fields: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };

        let mut operands = Vec::with_capacity(fields.len());
        if Inst::has_vtype_immediate(opcode) {
            // Everything after the first two operands is the vector type, e.g. `e32, m2, ta, ma`.
            if fields.len() <= VTYPEI_OPERAND {
                return Err(InstParseError::MissingVType);
            }

            let vtype_fields = fields.split_off(VTYPEI_OPERAND);
            for field in fields {
                operands.push(parse_operand(field)?);
            }

            let vtype: VType = vtype_fields.join(",").parse().map_err(InstParseError::InvalidVType)?;
            operands.push(Operand::Imm(i64::from(vtype.to_bits())));
        } else {
            for field in fields {
                operands.push(parse_operand(field)?);
            }
        }

        Ok(Inst { opcode, operands })
    }
}
