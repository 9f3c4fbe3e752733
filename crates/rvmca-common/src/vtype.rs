//! The RISC-V vector type (`vtype`) configuration: register group multiplier,
//! selected element width and the tail/mask agnostic policy bits.
//!
//! Layout of the `vtypei` immediate accepted by `vsetvli`/`vsetivli`:
//!
//! ```text
//!   bits  | 2..0  | 5..3 |  6  |  7  | 10..8
//!   field | vlmul | vsew | vta | vma | reserved (must be zero)
//! ```

/// The largest supported element width, in bits.
pub const ELEN: u32 = 64;

/// The width of a single vector register, in bits.
pub const VLEN: u32 = 128;

/// Vector register group multiplier.
///
/// The discriminants are the `vlmul` field encodings; `0b100` is reserved.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[repr(u8)]
pub enum Lmul {
    M1 = 0,
    M2 = 1,
    M4 = 2,
    M8 = 3,
    MF8 = 5,
    MF4 = 6,
    MF2 = 7,
}

impl Lmul {
    /// Every legal multiplier, from the smallest to the largest.
    pub const ALL: [Lmul; 7] = [Lmul::MF8, Lmul::MF4, Lmul::MF2, Lmul::M1, Lmul::M2, Lmul::M4, Lmul::M8];

    #[inline]
    pub const fn from_encoding(vlmul: u8) -> Option<Self> {
        Some(match vlmul {
            0 => Lmul::M1,
            1 => Lmul::M2,
            2 => Lmul::M4,
            3 => Lmul::M8,
            5 => Lmul::MF8,
            6 => Lmul::MF4,
            7 => Lmul::MF2,
            _ => return None,
        })
    }

    #[inline]
    pub const fn encoding(self) -> u8 {
        self as u8
    }

    /// The upper-case name, as used by instrumentation payloads (`M2`, `MF4`).
    pub const fn name(self) -> &'static str {
        match self {
            Lmul::M1 => "M1",
            Lmul::M2 => "M2",
            Lmul::M4 => "M4",
            Lmul::M8 => "M8",
            Lmul::MF8 => "MF8",
            Lmul::MF4 => "MF4",
            Lmul::MF2 => "MF2",
        }
    }

    /// The lower-case name, as used by the assembly syntax (`m2`, `mf4`).
    pub const fn asm_name(self) -> &'static str {
        match self {
            Lmul::M1 => "m1",
            Lmul::M2 => "m2",
            Lmul::M4 => "m4",
            Lmul::M8 => "m8",
            Lmul::MF8 => "mf8",
            Lmul::MF4 => "mf4",
            Lmul::MF2 => "mf2",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lmul| lmul.name() == name)
    }

    pub fn from_asm_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lmul| lmul.asm_name() == name)
    }

    #[inline]
    pub const fn is_fractional(self) -> bool {
        matches!(self, Lmul::MF8 | Lmul::MF4 | Lmul::MF2)
    }

    /// The multiplier as a `(numerator, denominator)` pair.
    pub const fn ratio(self) -> (u32, u32) {
        match self {
            Lmul::M1 => (1, 1),
            Lmul::M2 => (2, 1),
            Lmul::M4 => (4, 1),
            Lmul::M8 => (8, 1),
            Lmul::MF8 => (1, 8),
            Lmul::MF4 => (1, 4),
            Lmul::MF2 => (1, 2),
        }
    }

    /// The multiplier for a `(numerator, denominator)` pair, if it's one of the legal ones.
    pub const fn from_ratio(numerator: u32, denominator: u32) -> Option<Self> {
        if numerator == 0 || denominator == 0 {
            return None;
        }

        if numerator >= denominator {
            if numerator % denominator != 0 {
                return None;
            }

            match numerator / denominator {
                1 => Some(Lmul::M1),
                2 => Some(Lmul::M2),
                4 => Some(Lmul::M4),
                8 => Some(Lmul::M8),
                _ => None,
            }
        } else {
            if denominator % numerator != 0 {
                return None;
            }

            match denominator / numerator {
                2 => Some(Lmul::MF2),
                4 => Some(Lmul::MF4),
                8 => Some(Lmul::MF8),
                _ => None,
            }
        }
    }

    /// The group multiplier of an operand with an element width of `eew` while `vtype`
    /// holds `sew` and `self` (EMUL = EEW / SEW * LMUL).
    pub const fn for_element_width(self, sew: Sew, eew: Sew) -> Option<Self> {
        let (numerator, denominator) = self.ratio();
        Self::from_ratio(eew.bits() * numerator, sew.bits() * denominator)
    }

    /// How many architectural vector registers a group occupies.
    ///
    /// A fractional group still occupies a whole register.
    #[inline]
    pub const fn register_count(self) -> u32 {
        self.ratio().0
    }
}

impl core::fmt::Display for Lmul {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.write_str(self.asm_name())
    }
}

/// Selected element width.
///
/// The discriminants are the widths in bits.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[repr(u8)]
pub enum Sew {
    E8 = 8,
    E16 = 16,
    E32 = 32,
    E64 = 64,
}

impl Sew {
    pub const ALL: [Sew; 4] = [Sew::E8, Sew::E16, Sew::E32, Sew::E64];

    #[inline]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub const fn from_bits(bits: u32) -> Option<Self> {
        Some(match bits {
            8 => Sew::E8,
            16 => Sew::E16,
            32 => Sew::E32,
            64 => Sew::E64,
            _ => return None,
        })
    }

    /// Decodes the `vsew` field; encodings `0b100` and above are reserved.
    #[inline]
    pub const fn from_encoding(vsew: u8) -> Option<Self> {
        Some(match vsew {
            0 => Sew::E8,
            1 => Sew::E16,
            2 => Sew::E32,
            3 => Sew::E64,
            _ => return None,
        })
    }

    #[inline]
    pub const fn encoding(self) -> u8 {
        match self {
            Sew::E8 => 0,
            Sew::E16 => 1,
            Sew::E32 => 2,
            Sew::E64 => 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Sew::E8 => "E8",
            Sew::E16 => "E16",
            Sew::E32 => "E32",
            Sew::E64 => "E64",
        }
    }

    pub const fn asm_name(self) -> &'static str {
        match self {
            Sew::E8 => "e8",
            Sew::E16 => "e16",
            Sew::E32 => "e32",
            Sew::E64 => "e64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sew| sew.name() == name)
    }

    pub fn from_asm_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sew| sew.asm_name() == name)
    }
}

impl core::fmt::Display for Sew {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.write_str(self.asm_name())
    }
}

const VLMUL_MASK: u32 = 0b111;
const VSEW_SHIFT: u32 = 3;
const VSEW_MASK: u32 = 0b111;
const VTA_BIT: u32 = 1 << 6;
const VMA_BIT: u32 = 1 << 7;
const RESERVED_MASK: u32 = !0xff;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct VType {
    pub sew: Sew,
    pub lmul: Lmul,
    pub tail_agnostic: bool,
    pub mask_agnostic: bool,
}

impl VType {
    /// Creates a configuration with the tail-undisturbed, mask-undisturbed policy.
    pub const fn new(sew: Sew, lmul: Lmul) -> Self {
        VType {
            sew,
            lmul,
            tail_agnostic: false,
            mask_agnostic: false,
        }
    }

    pub const fn with_policy(mut self, tail_agnostic: bool, mask_agnostic: bool) -> Self {
        self.tail_agnostic = tail_agnostic;
        self.mask_agnostic = mask_agnostic;
        self
    }

    /// Decodes a `vtypei` immediate; returns `None` for reserved encodings.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & RESERVED_MASK != 0 {
            return None;
        }

        let Some(lmul) = Lmul::from_encoding((bits & VLMUL_MASK) as u8) else {
            return None;
        };

        let Some(sew) = Sew::from_encoding(((bits >> VSEW_SHIFT) & VSEW_MASK) as u8) else {
            return None;
        };

        Some(VType {
            sew,
            lmul,
            tail_agnostic: bits & VTA_BIT != 0,
            mask_agnostic: bits & VMA_BIT != 0,
        })
    }

    pub const fn to_bits(self) -> u32 {
        let mut bits = (self.lmul.encoding() as u32) | ((self.sew.encoding() as u32) << VSEW_SHIFT);
        if self.tail_agnostic {
            bits |= VTA_BIT;
        }
        if self.mask_agnostic {
            bits |= VMA_BIT;
        }
        bits
    }

    /// Whether the hardware accepts this pairing: `SEW <= ELEN * LMUL`.
    pub const fn is_legal(self) -> bool {
        let (numerator, denominator) = self.lmul.ratio();
        self.sew.bits() * denominator <= ELEN * numerator
    }

    /// The maximum number of elements a single instruction operates on (VLMAX).
    pub const fn vlmax(self) -> u32 {
        let (numerator, denominator) = self.lmul.ratio();
        VLEN * numerator / (denominator * self.sew.bits())
    }
}

impl core::fmt::Display for VType {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            fmt,
            "{}, {}, {}, {}",
            self.sew,
            self.lmul,
            if self.tail_agnostic { "ta" } else { "tu" },
            if self.mask_agnostic { "ma" } else { "mu" }
        )
    }
}

impl core::str::FromStr for VType {
    type Err = &'static str;

    /// Parses the assembly form, e.g. `e32, m2, ta, ma`; the policy is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split(',').map(str::trim);
        let sew = fields
            .next()
            .and_then(Sew::from_asm_name)
            .ok_or("expected an element width ('e8', 'e16', 'e32' or 'e64')")?;
        let lmul = fields
            .next()
            .and_then(Lmul::from_asm_name)
            .ok_or("expected a register group multiplier ('mf8' through 'm8')")?;

        let mut vtype = VType::new(sew, lmul);
        match fields.next() {
            None => return Ok(vtype),
            Some("ta") => vtype.tail_agnostic = true,
            Some("tu") => vtype.tail_agnostic = false,
            Some(_) => return Err("expected a tail policy ('ta' or 'tu')"),
        }

        match fields.next() {
            Some("ma") => vtype.mask_agnostic = true,
            Some("mu") => vtype.mask_agnostic = false,
            _ => return Err("expected a mask policy ('ma' or 'mu')"),
        }

        if fields.next().is_some() {
            return Err("trailing fields after the mask policy");
        }

        Ok(vtype)
    }
}
