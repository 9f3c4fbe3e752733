//! The static scheduling model: latency and throughput facts per scheduling
//! class, the nominal class of every opcode, and the per-configuration
//! variants of every vector base operation.

use std::collections::BTreeMap;

use rvmca_common::{Lmul, Opcode, Sew, VType};

use crate::error::{bail, Error};
use crate::pseudo_table::{BaseOp, PseudoTable};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct SchedClassId(u16);

impl SchedClassId {
    /// The class every opcode starts out with before the model assigns it one.
    pub const INVALID: SchedClassId = SchedClassId(0);

    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl core::fmt::Display for SchedClassId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum ExecutionUnit {
    Alu,
    Mul,
    Div,
    Load,
    Store,
    Branch,
    VectorConfig,
    VectorAlu,
    VectorMul,
    VectorDiv,
    VectorFpu,
    VectorLoad,
    VectorStore,
    VectorPermute,
}

impl ExecutionUnit {
    pub const fn name(self) -> &'static str {
        match self {
            ExecutionUnit::Alu => "alu",
            ExecutionUnit::Mul => "mul",
            ExecutionUnit::Div => "div",
            ExecutionUnit::Load => "load",
            ExecutionUnit::Store => "store",
            ExecutionUnit::Branch => "branch",
            ExecutionUnit::VectorConfig => "vcfg",
            ExecutionUnit::VectorAlu => "valu",
            ExecutionUnit::VectorMul => "vmul",
            ExecutionUnit::VectorDiv => "vdiv",
            ExecutionUnit::VectorFpu => "vfpu",
            ExecutionUnit::VectorLoad => "vload",
            ExecutionUnit::VectorStore => "vstore",
            ExecutionUnit::VectorPermute => "vperm",
        }
    }
}

impl core::fmt::Display for ExecutionUnit {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.write_str(self.name())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SchedClass {
    pub name: String,
    pub latency: u32,
    /// How many cycles the unit stays busy; the inverse of throughput.
    pub reciprocal_throughput: u32,
    pub unit: ExecutionUnit,
}

/// Identifies one scheduling variant of a vector base operation.
///
/// `sew` is only set for operations whose cost depends on the element width.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct VariantKey {
    pub base: BaseOp,
    pub lmul: Lmul,
    pub sew: Option<Sew>,
}

impl core::fmt::Display for VariantKey {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{}_{}", self.base.sched_name(), self.lmul.name())?;
        if let Some(sew) = self.sew {
            write!(fmt, "_{}", sew.name())?;
        }

        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SchedModel {
    classes: Vec<SchedClass>,
    by_opcode: Vec<SchedClassId>,
    variants: BTreeMap<VariantKey, SchedClassId>,
}

impl SchedModel {
    pub fn builder() -> SchedModelBuilder {
        SchedModelBuilder::new()
    }

    /// The nominal class of an opcode; what's simulated when nothing more specific is known.
    #[inline]
    pub fn sched_class_of(&self, opcode: Opcode) -> SchedClassId {
        self.by_opcode[opcode.index()]
    }

    pub fn class(&self, id: SchedClassId) -> Option<&SchedClass> {
        self.classes.get(id.index())
    }

    pub fn find(&self, name: &str) -> Option<SchedClassId> {
        let index = self.classes.iter().position(|class| class.name == name)?;
        u16::try_from(index).ok().map(SchedClassId)
    }

    #[inline]
    pub fn variant_class(&self, key: &VariantKey) -> Option<SchedClassId> {
        self.variants.get(key).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = (SchedClassId, &SchedClass)> {
        // The builder guarantees the count fits in an `u16`.
        (0..=u16::MAX).map(SchedClassId).zip(self.classes.iter())
    }

    pub fn variants(&self) -> impl Iterator<Item = (VariantKey, SchedClassId)> + '_ {
        self.variants.iter().map(|(key, class)| (*key, *class))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

pub struct SchedModelBuilder {
    classes: Vec<SchedClass>,
    by_opcode: Vec<SchedClassId>,
    variants: BTreeMap<VariantKey, SchedClassId>,
}

impl Default for SchedModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedModelBuilder {
    pub fn new() -> Self {
        SchedModelBuilder {
            classes: vec![SchedClass {
                name: "NoSchedModel".to_owned(),
                latency: 1,
                reciprocal_throughput: 1,
                unit: ExecutionUnit::Alu,
            }],
            by_opcode: vec![SchedClassId::INVALID; Opcode::COUNT],
            variants: BTreeMap::new(),
        }
    }

    pub fn add_class(
        &mut self,
        name: impl Into<String>,
        latency: u32,
        reciprocal_throughput: u32,
        unit: ExecutionUnit,
    ) -> Result<SchedClassId, Error> {
        let name = name.into();
        if self.classes.iter().any(|class| class.name == name) {
            bail!("duplicate scheduling class: '{name}'");
        }

        let Ok(index) = u16::try_from(self.classes.len()) else {
            bail!("too many scheduling classes");
        };

        self.classes.push(SchedClass {
            name,
            latency,
            reciprocal_throughput,
            unit,
        });

        Ok(SchedClassId(index))
    }

    pub fn set_opcode_class(&mut self, opcode: Opcode, class: SchedClassId) -> &mut Self {
        self.by_opcode[opcode.index()] = class;
        self
    }

    /// Registers a variant; a later registration of the same key replaces the earlier one.
    pub fn add_variant(&mut self, key: VariantKey, class: SchedClassId) -> &mut Self {
        self.variants.insert(key, class);
        self
    }

    pub fn build(self) -> Result<SchedModel, Error> {
        let count = self.classes.len();
        if let Some(opcode) = Opcode::ALL.iter().find(|opcode| self.by_opcode[opcode.index()].index() >= count) {
            bail!("opcode '{opcode}' refers to an unknown scheduling class");
        }

        if let Some(key) = self.variants.iter().find(|(_, class)| class.index() >= count).map(|(key, _)| key) {
            bail!("variant '{key}' refers to an unknown scheduling class");
        }

        Ok(SchedModel {
            classes: self.classes,
            by_opcode: self.by_opcode,
            variants: self.variants,
        })
    }
}

struct VectorCost {
    latency: u32,
    reciprocal_throughput: u32,
    unit: ExecutionUnit,
}

fn vector_cost(base: BaseOp, lmul: Lmul, sew: Sew) -> VectorCost {
    let registers = lmul.register_count();
    let (latency, reciprocal_throughput, unit) = match base {
        BaseOp::IntAlu => (1, 1, ExecutionUnit::VectorAlu),
        BaseOp::IntMul => (3, 1, ExecutionUnit::VectorMul),
        BaseOp::IntDiv => (12, 12, ExecutionUnit::VectorDiv),
        BaseOp::FpAlu => (4, 1, ExecutionUnit::VectorFpu),
        BaseOp::FpMul => (5, 1, ExecutionUnit::VectorFpu),
        BaseOp::UnitStrideLoad => (4, 1, ExecutionUnit::VectorLoad),
        BaseOp::UnitStrideStore => (1, 1, ExecutionUnit::VectorStore),
        BaseOp::Permute => (2, 1, ExecutionUnit::VectorPermute),
        BaseOp::Reduction => {
            // A tree reduction over every element of the group.
            let vlmax = VType::new(sew, lmul).vlmax().max(1);
            return VectorCost {
                latency: 4 + vlmax.ilog2(),
                reciprocal_throughput: registers,
                unit: ExecutionUnit::VectorAlu,
            };
        }
    };

    let sew_factor = match base {
        BaseOp::IntDiv => sew.bits() / 8,
        BaseOp::FpAlu | BaseOp::FpMul if sew == Sew::E64 => 2,
        _ => 1,
    };

    VectorCost {
        latency: latency * sew_factor + registers - 1,
        reciprocal_throughput: reciprocal_throughput * sew_factor * registers,
        unit,
    }
}

/// Every variant key a base operation has, in a stable order.
fn variant_keys(base: BaseOp) -> impl Iterator<Item = (VariantKey, Sew)> {
    Lmul::ALL.into_iter().flat_map(move |lmul| {
        let sews = base.supported_sews().iter().copied().filter(move |&sew| base.is_defined_for(lmul, sew));
        let keys: Vec<(VariantKey, Sew)> = if base.depends_on_sew() {
            sews.map(|sew| (VariantKey { base, lmul, sew: Some(sew) }, sew)).collect()
        } else {
            // Costed at the widest element width the multiplier allows.
            sews.last()
                .map(|sew| (VariantKey { base, lmul, sew: None }, sew))
                .into_iter()
                .collect()
        };

        keys
    })
}

impl SchedModel {
    /// The reference model for a RISC-V core with the vector extension
    /// (`VLEN` = 128, `ELEN` = 64).
    ///
    /// Every vtype-dependent opcode's nominal class is its base operation's
    /// worst case; the per-configuration costs live in the variants.
    pub fn riscv() -> Result<Self, Error> {
        let mut builder = SchedModelBuilder::new();

        let scalar: [(&str, u32, u32, ExecutionUnit, &[Opcode]); 10] = [
            (
                "WriteIALU",
                1,
                1,
                ExecutionUnit::Alu,
                &[
                    Opcode::ADD,
                    Opcode::ADDI,
                    Opcode::SUB,
                    Opcode::AND,
                    Opcode::OR,
                    Opcode::XOR,
                    Opcode::SLLI,
                    Opcode::SRLI,
                    Opcode::LUI,
                ],
            ),
            ("WriteIMul", 3, 1, ExecutionUnit::Mul, &[Opcode::MUL, Opcode::MULH]),
            ("WriteIDiv", 20, 20, ExecutionUnit::Div, &[Opcode::DIV, Opcode::DIVU, Opcode::REM]),
            ("WriteLDW", 3, 1, ExecutionUnit::Load, &[Opcode::LW]),
            ("WriteLDD", 3, 1, ExecutionUnit::Load, &[Opcode::LD]),
            ("WriteSTW", 1, 1, ExecutionUnit::Store, &[Opcode::SW]),
            ("WriteSTD", 1, 1, ExecutionUnit::Store, &[Opcode::SD]),
            ("WriteJmp", 1, 1, ExecutionUnit::Branch, &[Opcode::BEQ, Opcode::BNE, Opcode::BLT]),
            ("WriteJal", 1, 1, ExecutionUnit::Branch, &[Opcode::JAL]),
            ("WriteJalr", 1, 1, ExecutionUnit::Branch, &[Opcode::JALR]),
        ];

        let vector: [(&str, u32, u32, ExecutionUnit, &[Opcode]); 9] = [
            ("WriteVSETVLI", 1, 1, ExecutionUnit::VectorConfig, &[Opcode::VSETVLI]),
            ("WriteVSETIVLI", 1, 1, ExecutionUnit::VectorConfig, &[Opcode::VSETIVLI]),
            ("WriteVSETVL", 2, 1, ExecutionUnit::VectorConfig, &[Opcode::VSETVL]),
            ("WriteVMov1V", 1, 1, ExecutionUnit::VectorAlu, &[Opcode::VMV1R_V]),
            ("WriteVMov2V", 2, 2, ExecutionUnit::VectorAlu, &[Opcode::VMV2R_V]),
            ("WriteVMov4V", 4, 4, ExecutionUnit::VectorAlu, &[Opcode::VMV4R_V]),
            ("WriteVMov8V", 8, 8, ExecutionUnit::VectorAlu, &[Opcode::VMV8R_V]),
            ("WriteVLD1R", 4, 1, ExecutionUnit::VectorLoad, &[Opcode::VL1RE8_V]),
            ("WriteVST1R", 1, 1, ExecutionUnit::VectorStore, &[Opcode::VS1R_V]),
        ];

        for (name, latency, reciprocal_throughput, unit, opcodes) in scalar.into_iter().chain(vector) {
            let class = builder.add_class(name, latency, reciprocal_throughput, unit)?;
            for &opcode in opcodes {
                builder.set_opcode_class(opcode, class);
            }
        }

        let pseudo_table = PseudoTable::riscv();
        for base in BaseOp::ALL {
            let mut worst_latency = 0;
            let mut worst_reciprocal_throughput = 0;
            let mut unit = ExecutionUnit::VectorAlu;
            for (key, sew) in variant_keys(base) {
                let cost = vector_cost(base, key.lmul, sew);
                worst_latency = worst_latency.max(cost.latency);
                worst_reciprocal_throughput = worst_reciprocal_throughput.max(cost.reciprocal_throughput);
                unit = cost.unit;

                let class = builder.add_class(key.to_string(), cost.latency, cost.reciprocal_throughput, cost.unit)?;
                builder.add_variant(key, class);
            }

            let worst_case = builder.add_class(
                format!("{}_WorstCase", base.sched_name()),
                worst_latency,
                worst_reciprocal_throughput,
                unit,
            )?;

            for entry in pseudo_table.entries().iter().filter(|entry| entry.base == base) {
                builder.set_opcode_class(entry.pseudo, worst_case);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::{ExecutionUnit, SchedClassId, SchedModel, SchedModelBuilder, VariantKey};
    use crate::pseudo_table::BaseOp;
    use rvmca_common::{Lmul, Opcode, Sew};

    #[test]
    fn every_opcode_has_a_class_in_the_riscv_model() {
        let model = SchedModel::riscv().unwrap();
        for &opcode in Opcode::ALL {
            let class = model.sched_class_of(opcode);
            assert_ne!(class, SchedClassId::INVALID, "{}", opcode.name());
            assert!(model.class(class).is_some());
        }

        assert_eq!(model.class(model.sched_class_of(Opcode::ADD)).unwrap().name, "WriteIALU");
        assert_eq!(
            model.class(model.sched_class_of(Opcode::VADD_VV)).unwrap().name,
            "WriteVIALUV_WorstCase"
        );
    }

    #[test]
    fn variants_exist_only_for_legal_configurations() {
        let model = SchedModel::riscv().unwrap();
        let key = |base, lmul, sew| VariantKey { base, lmul, sew };

        let class = model.variant_class(&key(BaseOp::IntAlu, Lmul::M2, None)).unwrap();
        assert_eq!(model.find("WriteVIALUV_M2"), Some(class));
        assert!(model.variant_class(&key(BaseOp::IntAlu, Lmul::M2, Some(Sew::E32))).is_none());

        assert!(model.variant_class(&key(BaseOp::IntDiv, Lmul::M1, Some(Sew::E64))).is_some());
        assert!(model.variant_class(&key(BaseOp::IntDiv, Lmul::MF2, Some(Sew::E64))).is_none());
        assert!(model.variant_class(&key(BaseOp::IntDiv, Lmul::M1, None)).is_none());
        assert!(model.variant_class(&key(BaseOp::FpMul, Lmul::M1, Some(Sew::E8))).is_none());
        assert!(model.find("WriteVFMulV_M4_E32").is_some());
    }

    #[test]
    fn cost_scales_with_the_configuration() {
        let model = SchedModel::riscv().unwrap();
        let cost = |name: &str| {
            let class = model.class(model.find(name).unwrap()).unwrap();
            (class.latency, class.reciprocal_throughput)
        };

        assert_eq!(cost("WriteVIALUV_MF2"), (1, 1));
        assert_eq!(cost("WriteVIALUV_M1"), (1, 1));
        assert_eq!(cost("WriteVIALUV_M8"), (8, 8));
        assert_eq!(cost("WriteVIALUV_WorstCase"), (8, 8));
        assert_eq!(cost("WriteVIDivV_M1_E8"), (12, 12));
        assert_eq!(cost("WriteVIDivV_M1_E64"), (96, 96));
        assert_eq!(cost("WriteVIRedV_M1_E32"), (6, 1));

        for (_, class) in model.classes() {
            assert!(class.latency > 0, "{}", class.name);
        }
    }

    #[test]
    fn builder_validation() {
        let mut builder = SchedModelBuilder::new();
        let alu = builder.add_class("Alu", 1, 1, ExecutionUnit::Alu).unwrap();
        assert_eq!(alu.get(), 1);
        assert_eq!(
            builder.add_class("Alu", 2, 2, ExecutionUnit::Alu).unwrap_err().to_string(),
            "duplicate scheduling class: 'Alu'"
        );

        builder.set_opcode_class(Opcode::ADD, alu);
        let model = builder.build().unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.sched_class_of(Opcode::ADD), alu);
        assert_eq!(model.sched_class_of(Opcode::SUB), SchedClassId::INVALID);
        assert_eq!(model.class(SchedClassId::INVALID).unwrap().name, "NoSchedModel");

        let mut other = SchedModelBuilder::new();
        other.add_variant(
            VariantKey {
                base: BaseOp::IntAlu,
                lmul: Lmul::M1,
                sew: None,
            },
            alu,
        );
        assert_eq!(
            other.build().unwrap_err().to_string(),
            "variant 'WriteVIALUV_M1' refers to an unknown scheduling class"
        );
    }
}
