//! The pseudo-to-base lookup: maps every vtype-dependent opcode to the base
//! operation whose scheduling variants it's costed with.

use std::borrow::Cow;
use std::sync::Arc;

use rvmca_common::{Lmul, Opcode, Sew, VType};

use crate::error::{bail, Error};

/// A vector base operation; every pseudo opcode is costed as one of these.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum BaseOp {
    IntAlu,
    IntMul,
    IntDiv,
    FpAlu,
    FpMul,
    UnitStrideLoad,
    UnitStrideStore,
    Reduction,
    Permute,
}

impl BaseOp {
    pub const ALL: [BaseOp; 9] = [
        BaseOp::IntAlu,
        BaseOp::IntMul,
        BaseOp::IntDiv,
        BaseOp::FpAlu,
        BaseOp::FpMul,
        BaseOp::UnitStrideLoad,
        BaseOp::UnitStrideStore,
        BaseOp::Reduction,
        BaseOp::Permute,
    ];

    /// The prefix of this operation's scheduling class names.
    pub const fn sched_name(self) -> &'static str {
        match self {
            BaseOp::IntAlu => "WriteVIALUV",
            BaseOp::IntMul => "WriteVIMulV",
            BaseOp::IntDiv => "WriteVIDivV",
            BaseOp::FpAlu => "WriteVFALUV",
            BaseOp::FpMul => "WriteVFMulV",
            BaseOp::UnitStrideLoad => "WriteVLDE",
            BaseOp::UnitStrideStore => "WriteVSTE",
            BaseOp::Reduction => "WriteVIRedV",
            BaseOp::Permute => "WriteVPermV",
        }
    }

    /// Whether the cost depends on the element width in addition to the group multiplier.
    pub const fn depends_on_sew(self) -> bool {
        matches!(self, BaseOp::IntDiv | BaseOp::FpAlu | BaseOp::FpMul | BaseOp::Reduction)
    }

    /// The element widths this operation is defined for.
    pub const fn supported_sews(self) -> &'static [Sew] {
        match self {
            BaseOp::FpAlu | BaseOp::FpMul => &[Sew::E16, Sew::E32, Sew::E64],
            _ => &Sew::ALL,
        }
    }

    /// Whether this operation accesses memory.
    pub const fn is_memory(self) -> bool {
        matches!(self, BaseOp::UnitStrideLoad | BaseOp::UnitStrideStore)
    }

    /// Whether this operation has a scheduling variant for the given configuration.
    pub fn is_defined_for(self, lmul: Lmul, sew: Sew) -> bool {
        self.supported_sews().contains(&sew) && VType::new(sew, lmul).is_legal()
    }
}

impl core::fmt::Display for BaseOp {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.write_str(self.sched_name())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct PseudoInfo {
    pub pseudo: Opcode,
    pub base: BaseOp,
    /// The element width encoded in the opcode itself, for memory accesses.
    ///
    /// Such an access operates on a register group of EEW / SEW * LMUL registers.
    pub eew: Option<Sew>,
}

impl PseudoInfo {
    pub const fn new(pseudo: Opcode, base: BaseOp) -> Self {
        PseudoInfo { pseudo, base, eew: None }
    }

    pub const fn with_element_width(pseudo: Opcode, base: BaseOp, eew: Sew) -> Self {
        PseudoInfo {
            pseudo,
            base,
            eew: Some(eew),
        }
    }

    /// Whether resolving this entry needs the active element width.
    pub const fn requires_sew(&self) -> bool {
        self.base.depends_on_sew() || self.eew.is_some()
    }
}

const fn entry(pseudo: Opcode, base: BaseOp) -> PseudoInfo {
    PseudoInfo::new(pseudo, base)
}

const fn memory(pseudo: Opcode, base: BaseOp, eew: Sew) -> PseudoInfo {
    PseudoInfo::with_element_width(pseudo, base, eew)
}

// Must stay sorted by opcode.
static RISCV_PSEUDOS: [PseudoInfo; 37] = [
    entry(Opcode::VADD_VV, BaseOp::IntAlu),
    entry(Opcode::VADD_VX, BaseOp::IntAlu),
    entry(Opcode::VADD_VI, BaseOp::IntAlu),
    entry(Opcode::VSUB_VV, BaseOp::IntAlu),
    entry(Opcode::VSUB_VX, BaseOp::IntAlu),
    entry(Opcode::VAND_VV, BaseOp::IntAlu),
    entry(Opcode::VOR_VV, BaseOp::IntAlu),
    entry(Opcode::VXOR_VV, BaseOp::IntAlu),
    entry(Opcode::VMV_V_V, BaseOp::IntAlu),
    entry(Opcode::VMV_V_X, BaseOp::IntAlu),
    entry(Opcode::VMV_V_I, BaseOp::IntAlu),
    entry(Opcode::VMUL_VV, BaseOp::IntMul),
    entry(Opcode::VMUL_VX, BaseOp::IntMul),
    entry(Opcode::VMACC_VV, BaseOp::IntMul),
    entry(Opcode::VDIV_VV, BaseOp::IntDiv),
    entry(Opcode::VDIVU_VV, BaseOp::IntDiv),
    entry(Opcode::VREM_VV, BaseOp::IntDiv),
    entry(Opcode::VREMU_VV, BaseOp::IntDiv),
    entry(Opcode::VFADD_VV, BaseOp::FpAlu),
    entry(Opcode::VFADD_VF, BaseOp::FpAlu),
    entry(Opcode::VFSUB_VV, BaseOp::FpAlu),
    entry(Opcode::VFMUL_VV, BaseOp::FpMul),
    entry(Opcode::VFMUL_VF, BaseOp::FpMul),
    entry(Opcode::VFMACC_VV, BaseOp::FpMul),
    entry(Opcode::VREDSUM_VS, BaseOp::Reduction),
    entry(Opcode::VREDMAX_VS, BaseOp::Reduction),
    entry(Opcode::VSLIDEUP_VI, BaseOp::Permute),
    entry(Opcode::VSLIDEDOWN_VI, BaseOp::Permute),
    entry(Opcode::VRGATHER_VV, BaseOp::Permute),
    memory(Opcode::VLE8_V, BaseOp::UnitStrideLoad, Sew::E8),
    memory(Opcode::VLE16_V, BaseOp::UnitStrideLoad, Sew::E16),
    memory(Opcode::VLE32_V, BaseOp::UnitStrideLoad, Sew::E32),
    memory(Opcode::VLE64_V, BaseOp::UnitStrideLoad, Sew::E64),
    memory(Opcode::VSE8_V, BaseOp::UnitStrideStore, Sew::E8),
    memory(Opcode::VSE16_V, BaseOp::UnitStrideStore, Sew::E16),
    memory(Opcode::VSE32_V, BaseOp::UnitStrideStore, Sew::E32),
    memory(Opcode::VSE64_V, BaseOp::UnitStrideStore, Sew::E64),
];

static RISCV_PSEUDO_TABLE: PseudoTable = PseudoTable {
    entries: Cow::Borrowed(&RISCV_PSEUDOS),
};

/// A read-only table of pseudo opcodes, sorted and unique by opcode.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PseudoTable {
    entries: Cow<'static, [PseudoInfo]>,
}

impl PseudoTable {
    /// Builds a table from arbitrary entries.
    ///
    /// Fails if an opcode appears more than once or isn't a vtype-dependent opcode.
    pub fn new(mut entries: Vec<PseudoInfo>) -> Result<Self, Error> {
        entries.sort_by_key(|entry| entry.pseudo);
        for pair in entries.windows(2) {
            if pair[0].pseudo == pair[1].pseudo {
                bail!("duplicate pseudo table entry for '{}'", pair[0].pseudo);
            }
        }

        if let Some(entry) = entries.iter().find(|entry| !entry.pseudo.kind().depends_on_vtype()) {
            bail!("'{}' is not a vector pseudo opcode", entry.pseudo);
        }

        if let Some(entry) = entries.iter().find(|entry| entry.eew.is_some() && !entry.base.is_memory()) {
            bail!("'{}' has an element width of its own but isn't a memory access", entry.pseudo);
        }

        Ok(PseudoTable {
            entries: Cow::Owned(entries),
        })
    }

    /// The table for the RISC-V vector extension.
    pub fn riscv() -> &'static PseudoTable {
        &RISCV_PSEUDO_TABLE
    }

    pub fn get(&self, opcode: Opcode) -> Option<&PseudoInfo> {
        let index = self.entries.binary_search_by_key(&opcode, |entry| entry.pseudo).ok()?;
        Some(&self.entries[index])
    }

    pub fn entries(&self) -> &[PseudoInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A handle to a pseudo table which is either `'static` or reference counted.
#[derive(Clone, Debug)]
pub enum PseudoTableRef {
    Static(&'static PseudoTable),
    Shared(Arc<PseudoTable>),
}

impl From<&'static PseudoTable> for PseudoTableRef {
    fn from(value: &'static PseudoTable) -> Self {
        PseudoTableRef::Static(value)
    }
}

impl From<Arc<PseudoTable>> for PseudoTableRef {
    fn from(value: Arc<PseudoTable>) -> Self {
        PseudoTableRef::Shared(value)
    }
}

impl From<PseudoTable> for PseudoTableRef {
    fn from(value: PseudoTable) -> Self {
        PseudoTableRef::Shared(Arc::new(value))
    }
}

impl core::ops::Deref for PseudoTableRef {
    type Target = PseudoTable;

    fn deref(&self) -> &Self::Target {
        match self {
            PseudoTableRef::Static(table) => *table,
            PseudoTableRef::Shared(table) => table.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BaseOp, PseudoInfo, PseudoTable, PseudoTableRef};
    use rvmca_common::{Lmul, Opcode, Sew};

    #[test]
    fn riscv_table_is_sorted_and_unique() {
        let table = PseudoTable::riscv();
        assert!(table.entries().windows(2).all(|pair| pair[0].pseudo < pair[1].pseudo));
        assert!(table.entries().iter().all(|entry| entry.pseudo.kind().depends_on_vtype()));
    }

    #[test]
    fn riscv_table_covers_every_pseudo_opcode() {
        let table = PseudoTable::riscv();
        for &opcode in Opcode::ALL {
            assert_eq!(
                table.get(opcode).is_some(),
                opcode.kind().depends_on_vtype(),
                "{}",
                opcode.name()
            );
        }

        assert_eq!(table.get(Opcode::VADD_VV).map(|entry| entry.base), Some(BaseOp::IntAlu));
        assert_eq!(table.get(Opcode::VFMACC_VV).map(|entry| entry.base), Some(BaseOp::FpMul));
        assert_eq!(table.get(Opcode::VLE32_V).map(|entry| entry.base), Some(BaseOp::UnitStrideLoad));
    }

    #[test]
    fn memory_accesses_carry_their_element_width() {
        let table = PseudoTable::riscv();
        for entry in table.entries() {
            assert_eq!(entry.eew.is_some(), entry.base.is_memory(), "{}", entry.pseudo);
            assert_eq!(entry.requires_sew(), entry.base.depends_on_sew() || entry.base.is_memory());
        }

        assert_eq!(table.get(Opcode::VLE8_V).and_then(|entry| entry.eew), Some(Sew::E8));
        assert_eq!(table.get(Opcode::VSE64_V).and_then(|entry| entry.eew), Some(Sew::E64));
        assert_eq!(table.get(Opcode::VADD_VV).and_then(|entry| entry.eew), None);
    }

    #[test]
    fn custom_tables_are_validated() {
        let table = PseudoTable::new(vec![
            PseudoInfo::new(Opcode::VMUL_VV, BaseOp::IntMul),
            PseudoInfo::new(Opcode::VADD_VV, BaseOp::IntAlu),
        ])
        .unwrap();

        assert_eq!(table.entries()[0].pseudo, Opcode::VADD_VV);
        assert!(table.get(Opcode::VSUB_VV).is_none());

        let table: PseudoTableRef = table.into();
        assert_eq!(table.len(), 2);

        let error = PseudoTable::new(vec![
            PseudoInfo::new(Opcode::VADD_VV, BaseOp::IntAlu),
            PseudoInfo::new(Opcode::VADD_VV, BaseOp::IntMul),
        ])
        .unwrap_err();
        assert_eq!(error.to_string(), "duplicate pseudo table entry for 'vadd.vv'");

        let error = PseudoTable::new(vec![PseudoInfo::new(Opcode::ADD, BaseOp::IntAlu)]).unwrap_err();
        assert_eq!(error.to_string(), "'add' is not a vector pseudo opcode");

        let error = PseudoTable::new(vec![PseudoInfo::with_element_width(Opcode::VADD_VV, BaseOp::IntAlu, Sew::E8)])
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "'vadd.vv' has an element width of its own but isn't a memory access"
        );
    }

    #[test]
    fn floating_point_has_no_byte_elements() {
        assert!(!BaseOp::FpAlu.is_defined_for(Lmul::M1, Sew::E8));
        assert!(BaseOp::FpAlu.is_defined_for(Lmul::M1, Sew::E16));
        assert!(BaseOp::IntAlu.is_defined_for(Lmul::MF8, Sew::E8));
        assert!(!BaseOp::IntAlu.is_defined_for(Lmul::MF8, Sew::E16));
    }
}
