/// How an opcode interacts with the vector unit.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum OpcodeKind {
    /// Executes entirely outside of the vector unit.
    Scalar,
    /// Establishes a new `vtype`/`vl` (`vsetvli` and friends).
    VectorConfig,
    /// Executes on the vector unit, but its cost doesn't depend on `vtype` (e.g. whole register moves).
    Vector,
    /// Executes on the vector unit and its cost depends on the active `vtype`.
    ///
    /// These are the pseudo opcodes which need to be resolved into a concrete
    /// scheduling class before they can be simulated.
    VectorPseudo,
}

impl OpcodeKind {
    #[inline]
    pub const fn is_vector(self) -> bool {
        matches!(self, OpcodeKind::Vector | OpcodeKind::VectorPseudo)
    }

    #[inline]
    pub const fn depends_on_vtype(self) -> bool {
        matches!(self, OpcodeKind::VectorPseudo)
    }
}

macro_rules! define_opcodes {
    ($($name:ident = $mnemonic:literal, $kind:ident;)+) => {
        #[allow(non_camel_case_types)]
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
        #[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
        #[repr(u16)]
        pub enum Opcode {
            $(
                $name,
            )+
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[
                $(Opcode::$name,)+
            ];

            pub const COUNT: usize = Self::ALL.len();

            /// The assembly mnemonic, e.g. `vadd.vv`.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(
                        Opcode::$name => $mnemonic,
                    )+
                }
            }

            /// The symbolic name, e.g. `VADD_VV`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(
                        Opcode::$name => stringify!($name),
                    )+
                }
            }

            pub const fn kind(self) -> OpcodeKind {
                match self {
                    $(
                        Opcode::$name => OpcodeKind::$kind,
                    )+
                }
            }

            /// A dense index usable to address per-opcode tables.
            #[inline]
            pub const fn index(self) -> usize {
                self as usize
            }
        }

        impl core::str::FromStr for Opcode {
            type Err = &'static str;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(match s {
                    $(
                        $mnemonic => Opcode::$name,
                    )+
                    _ => return Err("unknown opcode")
                })
            }
        }
    };
}

define_opcodes! {
    // Base integer ISA.
    ADD = "add", Scalar;
    ADDI = "addi", Scalar;
    SUB = "sub", Scalar;
    AND = "and", Scalar;
    OR = "or", Scalar;
    XOR = "xor", Scalar;
    SLLI = "slli", Scalar;
    SRLI = "srli", Scalar;
    LUI = "lui", Scalar;
    LW = "lw", Scalar;
    LD = "ld", Scalar;
    SW = "sw", Scalar;
    SD = "sd", Scalar;
    BEQ = "beq", Scalar;
    BNE = "bne", Scalar;
    BLT = "blt", Scalar;
    JAL = "jal", Scalar;
    JALR = "jalr", Scalar;

    // M extension.
    MUL = "mul", Scalar;
    MULH = "mulh", Scalar;
    DIV = "div", Scalar;
    DIVU = "divu", Scalar;
    REM = "rem", Scalar;

    // Vector configuration.
    VSETVLI = "vsetvli", VectorConfig;
    VSETIVLI = "vsetivli", VectorConfig;
    VSETVL = "vsetvl", VectorConfig;

    // Vector integer arithmetic.
    VADD_VV = "vadd.vv", VectorPseudo;
    VADD_VX = "vadd.vx", VectorPseudo;
    VADD_VI = "vadd.vi", VectorPseudo;
    VSUB_VV = "vsub.vv", VectorPseudo;
    VSUB_VX = "vsub.vx", VectorPseudo;
    VAND_VV = "vand.vv", VectorPseudo;
    VOR_VV = "vor.vv", VectorPseudo;
    VXOR_VV = "vxor.vv", VectorPseudo;
    VMV_V_V = "vmv.v.v", VectorPseudo;
    VMV_V_X = "vmv.v.x", VectorPseudo;
    VMV_V_I = "vmv.v.i", VectorPseudo;
    VMUL_VV = "vmul.vv", VectorPseudo;
    VMUL_VX = "vmul.vx", VectorPseudo;
    VMACC_VV = "vmacc.vv", VectorPseudo;
    VDIV_VV = "vdiv.vv", VectorPseudo;
    VDIVU_VV = "vdivu.vv", VectorPseudo;
    VREM_VV = "vrem.vv", VectorPseudo;
    VREMU_VV = "vremu.vv", VectorPseudo;

    // Vector floating point.
    VFADD_VV = "vfadd.vv", VectorPseudo;
    VFADD_VF = "vfadd.vf", VectorPseudo;
    VFSUB_VV = "vfsub.vv", VectorPseudo;
    VFMUL_VV = "vfmul.vv", VectorPseudo;
    VFMUL_VF = "vfmul.vf", VectorPseudo;
    VFMACC_VV = "vfmacc.vv", VectorPseudo;

    // Vector reductions.
    VREDSUM_VS = "vredsum.vs", VectorPseudo;
    VREDMAX_VS = "vredmax.vs", VectorPseudo;

    // Vector permutations.
    VSLIDEUP_VI = "vslideup.vi", VectorPseudo;
    VSLIDEDOWN_VI = "vslidedown.vi", VectorPseudo;
    VRGATHER_VV = "vrgather.vv", VectorPseudo;

    // Vector unit-stride memory accesses.
    VLE8_V = "vle8.v", VectorPseudo;
    VLE16_V = "vle16.v", VectorPseudo;
    VLE32_V = "vle32.v", VectorPseudo;
    VLE64_V = "vle64.v", VectorPseudo;
    VSE8_V = "vse8.v", VectorPseudo;
    VSE16_V = "vse16.v", VectorPseudo;
    VSE32_V = "vse32.v", VectorPseudo;
    VSE64_V = "vse64.v", VectorPseudo;

    // Whole register operations; these ignore `vtype`.
    VMV1R_V = "vmv1r.v", Vector;
    VMV2R_V = "vmv2r.v", Vector;
    VMV4R_V = "vmv4r.v", Vector;
    VMV8R_V = "vmv8r.v", Vector;
    VL1RE8_V = "vl1re8.v", Vector;
    VS1R_V = "vs1r.v", Vector;
}

impl core::fmt::Display for Opcode {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.write_str(self.mnemonic())
    }
}
