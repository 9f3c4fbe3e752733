#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[repr(u8)]
pub enum Reg {
    Zero = 0,
    RA,
    SP,
    GP,
    TP,
    T0,
    T1,
    T2,
    S0,
    S1,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
    S10,
    S11,
    T3,
    T4,
    T5,
    T6,
}

impl Reg {
    pub const ALL: [Reg; 32] = {
        use Reg::*;
        [
            Zero, RA, SP, GP, TP, T0, T1, T2, S0, S1, A0, A1, A2, A3, A4, A5, A6, A7, S2, S3, S4, S5, S6, S7, S8, S9, S10, S11, T3, T4,
            T5, T6,
        ]
    };

    pub const NAMES: &'static [&'static str] = &[
        "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "s2", "s3", "s4",
        "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4", "t5", "t6",
    ];

    pub fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    #[inline]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Parses either an ABI name (`a0`, `fp`) or a numeric name (`x10`).
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "fp" {
            return Some(Reg::S0);
        }

        if let Some(index) = name.strip_prefix('x') {
            // Reject things like `x01` and `x+1`.
            if index.is_empty() || (index.starts_with(['0', '+']) && index != "0") {
                return None;
            }

            return index.parse::<u8>().ok().and_then(Self::from_index);
        }

        Self::NAMES.iter().position(|&reg| reg == name).and_then(|index| Self::ALL.get(index).copied())
    }
}

impl core::fmt::Display for Reg {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.write_str(self.name())
    }
}

/// A vector register, `v0` through `v31`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct VReg(u8);

impl VReg {
    pub const COUNT: u8 = 32;

    #[inline]
    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(VReg(index))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let index = name.strip_prefix('v')?;
        if index.is_empty() || (index.starts_with(['0', '+']) && index != "0") {
            return None;
        }

        Self::new(index.parse().ok()?)
    }
}

impl core::fmt::Display for VReg {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "v{}", self.0)
    }
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for VReg {
    fn arbitrary(unstructured: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(VReg(unstructured.int_in_range(0..=Self::COUNT - 1)?))
    }
}
