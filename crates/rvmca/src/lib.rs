//! Instrumentation-driven scheduling class resolution for RISC-V vector code.
//!
//! The cost of most RVV instructions depends on the active `vtype` (the
//! register group multiplier and the element width), which isn't encoded in
//! the opcode itself. Instruments attach that configuration to the
//! instruction stream, and an [`InstrumentManager`] uses them to pick the
//! scheduling class an instruction is actually simulated with.

#![deny(unused_must_use)]

mod analysis;
mod config;
mod error;
mod instrument;
mod manager;
mod pseudo_table;
mod sched;

pub use rvmca_common as common;

pub use crate::analysis::{analyze, Analysis, RegionReport, ResolvedInstruction};
pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::instrument::{ActiveInstruments, Instrument, InstrumentError, InstrumentKind, InstrumentOrigin};
pub use crate::manager::{DefaultInstrumentManager, InstrumentManager, ResolveError, RiscvInstrumentManager};
pub use crate::pseudo_table::{BaseOp, PseudoInfo, PseudoTable, PseudoTableRef};
pub use crate::sched::{ExecutionUnit, SchedClass, SchedClassId, SchedModel, SchedModelBuilder, VariantKey};
