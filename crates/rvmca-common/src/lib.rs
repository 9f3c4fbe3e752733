//! Shared vocabulary for the rvmca crates: opcodes, registers, the RVV `vtype`
//! encoding, decoded instruction records and the annotated listing reader.

#![no_std]
#![deny(unused_must_use)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod inst;
pub mod listing;
pub mod opcode;
pub mod reg;
pub mod vtype;

pub use crate::inst::{Inst, InstParseError, Operand};
pub use crate::opcode::{Opcode, OpcodeKind};
pub use crate::reg::{Reg, VReg};
pub use crate::vtype::{Lmul, Sew, VType, ELEN, VLEN};
