use rvmca_common::{Inst, Lmul, Opcode, Sew, VType};

use crate::instrument::{Instrument, InstrumentError, InstrumentKind};
use crate::pseudo_table::{BaseOp, PseudoTable, PseudoTableRef};
use crate::sched::{SchedClassId, SchedModel, VariantKey};

/// The per-target hooks the analysis calls for every directive, instruction and region.
///
/// The defaults describe a target without any instrumentation support.
pub trait InstrumentManager {
    /// Whether directives should be dropped before they ever reach this manager.
    fn should_ignore_instruments(&self) -> bool {
        true
    }

    /// Whether this target recognizes instruments of the given kind.
    fn supports_instrument_type(&self, _name: &str) -> bool {
        false
    }

    /// Creates an instrument from a directive.
    fn create_instrument(&self, name: &str, _data: &str) -> Result<Instrument, InstrumentError> {
        Err(InstrumentError::UnsupportedKind { name: name.to_owned() })
    }

    /// Returns the instruments implied by an instruction, to be applied to the instructions which follow it.
    fn create_instruments(&self, _inst: &Inst) -> Vec<Instrument> {
        Vec::new()
    }

    /// Returns the scheduling class the instruction should be simulated with.
    ///
    /// This never fails; whatever can't be resolved is simulated with the opcode's nominal class.
    fn sched_class_id(&mut self, model: &SchedModel, inst: &Inst, _instruments: &[Instrument]) -> SchedClassId {
        model.sched_class_of(inst.opcode)
    }

    /// Called at the end of every region; returns whether the region used the vector pipeline.
    fn post_process_region(&mut self) -> bool {
        false
    }
}

impl<M> InstrumentManager for Box<M>
where
    M: InstrumentManager + ?Sized,
{
    fn should_ignore_instruments(&self) -> bool {
        (**self).should_ignore_instruments()
    }

    fn supports_instrument_type(&self, name: &str) -> bool {
        (**self).supports_instrument_type(name)
    }

    fn create_instrument(&self, name: &str, data: &str) -> Result<Instrument, InstrumentError> {
        (**self).create_instrument(name, data)
    }

    fn create_instruments(&self, inst: &Inst) -> Vec<Instrument> {
        (**self).create_instruments(inst)
    }

    fn sched_class_id(&mut self, model: &SchedModel, inst: &Inst, instruments: &[Instrument]) -> SchedClassId {
        (**self).sched_class_id(model, inst, instruments)
    }

    fn post_process_region(&mut self) -> bool {
        (**self).post_process_region()
    }
}

/// A manager for targets without instrumentation support.
#[derive(Copy, Clone, Default, Debug)]
pub struct DefaultInstrumentManager;

impl InstrumentManager for DefaultInstrumentManager {}

/// Why a vtype-dependent opcode couldn't be resolved into a concrete scheduling variant.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ResolveError {
    /// The opcode depends on `vtype` but has no pseudo table entry.
    UnresolvedPseudoOpcode { opcode: Opcode },
    /// An instrument the opcode's cost depends on isn't active.
    ResolutionRequiresInstrumentation { opcode: Opcode, kind: InstrumentKind },
    /// The scheduling model has no variant for the active configuration.
    UnresolvedVariant {
        opcode: Opcode,
        base: BaseOp,
        lmul: Lmul,
        sew: Option<Sew>,
    },
}

impl core::fmt::Display for ResolveError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ResolveError::UnresolvedPseudoOpcode { opcode } => {
                write!(fmt, "no pseudo table entry for '{opcode}'")
            }
            ResolveError::ResolutionRequiresInstrumentation { opcode, kind } => {
                write!(fmt, "'{opcode}' requires an active '{kind}' instrument")
            }
            ResolveError::UnresolvedVariant { opcode, base, lmul, sew } => {
                write!(fmt, "no '{base}' variant for '{opcode}' with LMUL={}", lmul.name())?;
                if let Some(sew) = sew {
                    write!(fmt, ", SEW={}", sew.bits())?;
                }

                Ok(())
            }
        }
    }
}

impl core::error::Error for ResolveError {}

/// The instrument manager for RISC-V cores with the vector extension.
///
/// One instance is meant to be used for a single analysis run; it tracks
/// whether the current region has used the vector pipeline so far.
#[derive(Clone, Debug)]
pub struct RiscvInstrumentManager {
    pseudo_table: PseudoTableRef,
    uses_vector_pipeline: bool,
}

impl Default for RiscvInstrumentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RiscvInstrumentManager {
    pub fn new() -> Self {
        Self::with_pseudo_table(PseudoTable::riscv())
    }

    pub fn with_pseudo_table(pseudo_table: impl Into<PseudoTableRef>) -> Self {
        RiscvInstrumentManager {
            pseudo_table: pseudo_table.into(),
            uses_vector_pipeline: false,
        }
    }

    pub fn pseudo_table(&self) -> &PseudoTable {
        &self.pseudo_table
    }

    /// Whether the current region has used the vector pipeline so far.
    pub fn is_vector_pipeline(&self) -> bool {
        self.uses_vector_pipeline
    }

    /// Resolves the scheduling class of an instruction without any side effects.
    ///
    /// When several instruments of the same kind are given the last one is used.
    pub fn resolve_sched_class(
        &self,
        model: &SchedModel,
        inst: &Inst,
        instruments: &[Instrument],
    ) -> Result<SchedClassId, ResolveError> {
        let opcode = inst.opcode;
        if !opcode.kind().depends_on_vtype() {
            return Ok(model.sched_class_of(opcode));
        }

        let Some(entry) = self.pseudo_table.get(opcode) else {
            return Err(ResolveError::UnresolvedPseudoOpcode { opcode });
        };

        let base = entry.base;
        let lmul = instruments.iter().rev().find_map(Instrument::lmul);
        let sew = instruments.iter().rev().find_map(Instrument::sew);

        let Some(lmul) = lmul else {
            return Err(ResolveError::ResolutionRequiresInstrumentation {
                opcode,
                kind: InstrumentKind::Lmul,
            });
        };

        if entry.requires_sew() && sew.is_none() {
            return Err(ResolveError::ResolutionRequiresInstrumentation {
                opcode,
                kind: InstrumentKind::Sew,
            });
        }

        let unresolved = || ResolveError::UnresolvedVariant { opcode, base, lmul, sew };
        if let Some(sew) = sew {
            if !VType::new(sew, lmul).is_legal() {
                return Err(unresolved());
            }
        }

        // Memory accesses are costed by the register group they actually touch.
        let group = match (entry.eew, sew) {
            (Some(eew), Some(sew)) => lmul.for_element_width(sew, eew).ok_or_else(unresolved)?,
            _ => lmul,
        };

        let key = VariantKey {
            base,
            lmul: group,
            sew: if base.depends_on_sew() { sew } else { None },
        };

        model.variant_class(&key).ok_or_else(unresolved)
    }
}

impl InstrumentManager for RiscvInstrumentManager {
    fn should_ignore_instruments(&self) -> bool {
        false
    }

    fn supports_instrument_type(&self, name: &str) -> bool {
        InstrumentKind::from_name(name).is_some()
    }

    fn create_instrument(&self, name: &str, data: &str) -> Result<Instrument, InstrumentError> {
        let Some(kind) = InstrumentKind::from_name(name) else {
            return Err(InstrumentError::UnsupportedKind { name: name.to_owned() });
        };

        Instrument::new(kind, data)
    }

    fn create_instruments(&self, inst: &Inst) -> Vec<Instrument> {
        match inst.vtype() {
            Some(vtype) => vec![Instrument::from_lmul(vtype.lmul), Instrument::from_sew(vtype.sew)],
            None => {
                if matches!(inst.opcode, Opcode::VSETVLI | Opcode::VSETIVLI) {
                    log::debug!("'{inst}' has a reserved vtype; no instruments implied");
                }

                Vec::new()
            }
        }
    }

    fn sched_class_id(&mut self, model: &SchedModel, inst: &Inst, instruments: &[Instrument]) -> SchedClassId {
        if inst.opcode.kind().is_vector() {
            self.uses_vector_pipeline = true;
        }

        match self.resolve_sched_class(model, inst, instruments) {
            Ok(class) => class,
            Err(error) => {
                let class = model.sched_class_of(inst.opcode);
                log::debug!("Falling back to scheduling class {class} for '{inst}': {error}");
                class
            }
        }
    }

    fn post_process_region(&mut self) -> bool {
        core::mem::replace(&mut self.uses_vector_pipeline, false)
    }
}

#[cfg(test)]
mod tests {
    use super::{DefaultInstrumentManager, InstrumentManager, ResolveError, RiscvInstrumentManager};
    use crate::instrument::{Instrument, InstrumentError, InstrumentKind};
    use crate::pseudo_table::{BaseOp, PseudoInfo, PseudoTable};
    use crate::sched::SchedModel;
    use rvmca_common::{Inst, Lmul, Opcode, Reg, Sew, VType};

    fn inst(text: &str) -> Inst {
        text.parse().unwrap()
    }

    fn instruments(lmul: &str, sew: &str) -> Vec<Instrument> {
        let manager = RiscvInstrumentManager::new();
        vec![
            manager.create_instrument("RISCV-LMUL", lmul).unwrap(),
            manager.create_instrument("RISCV-SEW", sew).unwrap(),
        ]
    }

    #[test]
    fn vector_add_resolves_to_its_variant() {
        let _ = env_logger::try_init();
        let model = SchedModel::riscv().unwrap();
        let mut manager = RiscvInstrumentManager::new();

        let vadd = inst("vadd.vv v1, v2, v3");
        let class = manager.sched_class_id(&model, &vadd, &instruments("M2", "E32"));
        assert_eq!(Some(class), model.find("WriteVIALUV_M2"));
        assert_ne!(class, model.sched_class_of(Opcode::VADD_VV));
        assert!(manager.is_vector_pipeline());

        // Same inputs, same answer; the flag stays set.
        assert_eq!(manager.sched_class_id(&model, &vadd, &instruments("M2", "E32")), class);
        assert!(manager.is_vector_pipeline());

        assert_ne!(manager.sched_class_id(&model, &vadd, &instruments("M4", "E32")), class);
    }

    #[test]
    fn scalar_opcodes_keep_their_static_class() {
        let _ = env_logger::try_init();
        let model = SchedModel::riscv().unwrap();
        let mut manager = RiscvInstrumentManager::new();

        for text in ["add a0, a1, a2", "ld t0, 8(sp)", "vsetvli a0, a1, e8, m1"] {
            let inst = inst(text);
            for active in [Vec::new(), instruments("M8", "E64")] {
                assert_eq!(manager.sched_class_id(&model, &inst, &active), model.sched_class_of(inst.opcode));
            }
        }

        assert!(!manager.is_vector_pipeline());
        assert!(!manager.post_process_region());
    }

    #[test]
    fn whole_register_moves_use_the_vector_pipeline() {
        let model = SchedModel::riscv().unwrap();
        let mut manager = RiscvInstrumentManager::new();
        let class = manager.sched_class_id(&model, &inst("vmv2r.v v2, v4"), &[]);
        assert_eq!(class, model.sched_class_of(Opcode::VMV2R_V));
        assert!(manager.post_process_region());
    }

    #[test]
    fn sew_is_only_required_where_it_matters() {
        let model = SchedModel::riscv().unwrap();
        let manager = RiscvInstrumentManager::new();
        let lmul_only = [Instrument::from_lmul(Lmul::M1)];

        assert_eq!(
            manager.resolve_sched_class(&model, &inst("vadd.vv v1, v2, v3"), &lmul_only),
            Ok(model.find("WriteVIALUV_M1").unwrap())
        );

        assert_eq!(
            manager.resolve_sched_class(&model, &inst("vdiv.vv v1, v2, v3"), &lmul_only),
            Err(ResolveError::ResolutionRequiresInstrumentation {
                opcode: Opcode::VDIV_VV,
                kind: InstrumentKind::Sew
            })
        );

        assert_eq!(
            manager.resolve_sched_class(&model, &inst("vdiv.vv v1, v2, v3"), &instruments("M1", "E16")),
            Ok(model.find("WriteVIDivV_M1_E16").unwrap())
        );
    }

    #[test]
    fn missing_instruments_fall_back_to_the_static_class() {
        let _ = env_logger::try_init();
        let model = SchedModel::riscv().unwrap();
        let mut manager = RiscvInstrumentManager::new();
        let vmul = inst("vmul.vv v1, v2, v3");

        assert_eq!(
            manager.resolve_sched_class(&model, &vmul, &[]),
            Err(ResolveError::ResolutionRequiresInstrumentation {
                opcode: Opcode::VMUL_VV,
                kind: InstrumentKind::Lmul
            })
        );

        assert_eq!(manager.sched_class_id(&model, &vmul, &[]), model.sched_class_of(Opcode::VMUL_VV));
        assert!(manager.is_vector_pipeline());
    }

    #[test]
    fn unresolved_configurations_fall_back_to_the_static_class() {
        let model = SchedModel::riscv().unwrap();
        let mut manager = RiscvInstrumentManager::new();

        // Floating point has no 8-bit elements.
        let vfadd = inst("vfadd.vv v1, v2, v3");
        assert_eq!(
            manager.resolve_sched_class(&model, &vfadd, &instruments("M1", "E8")),
            Err(ResolveError::UnresolvedVariant {
                opcode: Opcode::VFADD_VV,
                base: BaseOp::FpAlu,
                lmul: Lmul::M1,
                sew: Some(Sew::E8)
            })
        );
        assert_eq!(
            manager.sched_class_id(&model, &vfadd, &instruments("M1", "E8")),
            model.sched_class_of(Opcode::VFADD_VV)
        );

        // SEW=64 doesn't fit into a quarter of a register.
        let error = manager
            .resolve_sched_class(&model, &inst("vadd.vv v1, v2, v3"), &instruments("MF4", "E64"))
            .unwrap_err();
        assert_eq!(error.to_string(), "no 'WriteVIALUV' variant for 'vadd.vv' with LMUL=MF4, SEW=64");
    }

    #[test]
    fn memory_accesses_use_the_register_group_of_their_element_width() {
        let _ = env_logger::try_init();
        let model = SchedModel::riscv().unwrap();
        let mut manager = RiscvInstrumentManager::new();
        let e32_m4 = instruments("M4", "E32");

        for (text, expected) in [
            ("vle8.v v8, (a0)", "WriteVLDE_M1"),
            ("vle16.v v8, (a0)", "WriteVLDE_M2"),
            ("vle32.v v8, (a0)", "WriteVLDE_M4"),
            ("vle64.v v8, (a0)", "WriteVLDE_M8"),
            ("vse8.v v8, (a0)", "WriteVSTE_M1"),
        ] {
            assert_eq!(
                manager.resolve_sched_class(&model, &inst(text), &e32_m4),
                Ok(model.find(expected).unwrap()),
                "{text}"
            );
        }

        // 64-bit elements under e8, m2 would need a group of sixteen registers.
        let vle64 = inst("vle64.v v8, (a0)");
        assert_eq!(
            manager.resolve_sched_class(&model, &vle64, &instruments("M2", "E8")),
            Err(ResolveError::UnresolvedVariant {
                opcode: Opcode::VLE64_V,
                base: BaseOp::UnitStrideLoad,
                lmul: Lmul::M2,
                sew: Some(Sew::E8)
            })
        );
        assert_eq!(
            manager.sched_class_id(&model, &vle64, &instruments("M2", "E8")),
            model.sched_class_of(Opcode::VLE64_V)
        );

        assert_eq!(
            manager.resolve_sched_class(&model, &inst("vse16.v v8, (a0)"), &[Instrument::from_lmul(Lmul::M1)]),
            Err(ResolveError::ResolutionRequiresInstrumentation {
                opcode: Opcode::VSE16_V,
                kind: InstrumentKind::Sew
            })
        );
    }

    #[test]
    fn the_latest_instrument_of_a_kind_wins() {
        let model = SchedModel::riscv().unwrap();
        let manager = RiscvInstrumentManager::new();
        let mut active = instruments("M1", "E32");
        active.push(Instrument::from_lmul(Lmul::M8));

        assert_eq!(
            manager.resolve_sched_class(&model, &inst("vadd.vv v8, v16, v24"), &active),
            Ok(model.find("WriteVIALUV_M8").unwrap())
        );
    }

    #[test]
    fn custom_pseudo_table_without_an_entry() {
        let model = SchedModel::riscv().unwrap();
        let table = PseudoTable::new(vec![PseudoInfo::new(Opcode::VADD_VV, BaseOp::IntAlu)]).unwrap();

        let mut manager = RiscvInstrumentManager::with_pseudo_table(table);
        let vsub = inst("vsub.vv v1, v2, v3");
        assert_eq!(
            manager.resolve_sched_class(&model, &vsub, &instruments("M2", "E32")),
            Err(ResolveError::UnresolvedPseudoOpcode { opcode: Opcode::VSUB_VV })
        );
        assert_eq!(
            manager.sched_class_id(&model, &vsub, &instruments("M2", "E32")),
            model.sched_class_of(Opcode::VSUB_VV)
        );
        assert_eq!(manager.pseudo_table().len(), 1);
    }

    #[test]
    fn creating_instruments() {
        let manager = RiscvInstrumentManager::new();
        assert!(!manager.should_ignore_instruments());
        assert!(manager.supports_instrument_type("RISCV-LMUL"));
        assert!(manager.supports_instrument_type("RISCV-SEW"));
        assert!(!manager.supports_instrument_type("RISCV-VL"));

        for kind in InstrumentKind::ALL {
            for payload in kind.valid_payloads() {
                let instrument = manager.create_instrument(kind.name(), payload).unwrap();
                assert_eq!(instrument.kind(), kind);
                assert_eq!(instrument.data(), *payload);
            }
        }

        assert_eq!(
            manager.create_instrument("RISCV-LMUL", "M3"),
            Err(InstrumentError::InvalidInstrumentData {
                kind: InstrumentKind::Lmul,
                data: "M3".to_owned()
            })
        );
        assert_eq!(
            manager.create_instrument("RISCV-VL", "4"),
            Err(InstrumentError::UnsupportedKind {
                name: "RISCV-VL".to_owned()
            })
        );
    }

    #[test]
    fn instruments_implied_by_vector_configuration() {
        let mut manager = RiscvInstrumentManager::new();

        let vsetvli = inst("vsetvli a0, a1, e16, mf2, ta, ma");
        assert_eq!(
            manager.create_instruments(&vsetvli),
            [Instrument::from_lmul(Lmul::MF2), Instrument::from_sew(Sew::E16)]
        );

        let vsetivli = Inst::vsetivli(Reg::Zero, 8, VType::new(Sew::E64, Lmul::M4));
        assert_eq!(
            manager.create_instruments(&vsetivli),
            [Instrument::from_lmul(Lmul::M4), Instrument::from_sew(Sew::E64)]
        );

        assert!(manager.create_instruments(&inst("vsetvl a0, a1, a2")).is_empty());
        assert!(manager.create_instruments(&inst("vadd.vv v1, v2, v3")).is_empty());

        // Reserved vlmul encoding.
        let reserved = Inst::new(
            Opcode::VSETVLI,
            [
                rvmca_common::Operand::Reg(Reg::A0),
                rvmca_common::Operand::Reg(Reg::A1),
                rvmca_common::Operand::Imm(0b100),
            ],
        );
        assert!(manager.create_instruments(&reserved).is_empty());

        assert!(!manager.post_process_region());
    }

    #[test]
    fn post_process_region_resets_the_flag() {
        let model = SchedModel::riscv().unwrap();
        let mut manager = RiscvInstrumentManager::new();

        manager.sched_class_id(&model, &inst("vle32.v v8, (a0)"), &instruments("M1", "E32"));
        manager.sched_class_id(&model, &inst("addi a0, a0, 16"), &[]);
        assert!(manager.post_process_region());
        assert!(!manager.is_vector_pipeline());
        assert!(!manager.post_process_region());
    }

    #[test]
    fn default_manager_ignores_everything() {
        let model = SchedModel::riscv().unwrap();
        let mut manager: Box<dyn InstrumentManager> = Box::new(DefaultInstrumentManager);
        assert!(manager.should_ignore_instruments());
        assert!(!manager.supports_instrument_type("RISCV-LMUL"));
        assert!(manager.create_instrument("RISCV-LMUL", "M1").is_err());
        assert!(manager.create_instruments(&inst("vsetvli a0, a1, e8, m1")).is_empty());

        let vadd = inst("vadd.vv v1, v2, v3");
        assert_eq!(
            manager.sched_class_id(&model, &vadd, &instruments("M2", "E32")),
            model.sched_class_of(Opcode::VADD_VV)
        );
        assert!(!manager.post_process_region());
    }
}
