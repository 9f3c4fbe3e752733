//! Instrumentation: typed annotations which refine how an instruction is costed.

use rvmca_common::{Lmul, Sew};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum InstrumentKind {
    /// The vector register group multiplier (`RISCV-LMUL`).
    Lmul,
    /// The selected element width (`RISCV-SEW`).
    Sew,
}

struct InstrumentCodec {
    name: &'static str,
    payloads: &'static [&'static str],
    decode: fn(&str) -> Option<u8>,
}

fn decode_lmul(data: &str) -> Option<u8> {
    Lmul::from_name(data).map(Lmul::encoding)
}

fn decode_sew(data: &str) -> Option<u8> {
    Sew::from_name(data).map(|sew| sew as u8)
}

static CODECS: [InstrumentCodec; 2] = [
    InstrumentCodec {
        name: "RISCV-LMUL",
        payloads: &["M1", "M2", "M4", "M8", "MF2", "MF4", "MF8"],
        decode: decode_lmul,
    },
    InstrumentCodec {
        name: "RISCV-SEW",
        payloads: &["E8", "E16", "E32", "E64"],
        decode: decode_sew,
    },
];

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 2] = [InstrumentKind::Lmul, InstrumentKind::Sew];

    #[inline]
    fn codec(self) -> &'static InstrumentCodec {
        &CODECS[self as usize]
    }

    /// The name under which directives of this kind are written, e.g. `RISCV-LMUL`.
    pub fn name(self) -> &'static str {
        self.codec().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Every payload accepted by this kind.
    pub fn valid_payloads(self) -> &'static [&'static str] {
        self.codec().payloads
    }

    pub fn is_data_valid(self, data: &str) -> bool {
        (self.codec().decode)(data).is_some()
    }
}

impl core::fmt::Display for InstrumentKind {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.write_str(self.name())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum InstrumentError {
    /// The payload isn't one the kind accepts.
    InvalidInstrumentData { kind: InstrumentKind, data: String },
    /// No instrument kind goes by this name.
    UnsupportedKind { name: String },
}

impl core::fmt::Display for InstrumentError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            InstrumentError::InvalidInstrumentData { kind, data } => {
                write!(fmt, "invalid data for instrument '{kind}': '{data}' (expected one of: ")?;
                for (index, payload) in kind.valid_payloads().iter().enumerate() {
                    if index != 0 {
                        fmt.write_str(", ")?;
                    }
                    fmt.write_str(payload)?;
                }
                fmt.write_str(")")
            }
            InstrumentError::UnsupportedKind { name } => write!(fmt, "unsupported instrument kind: '{name}'"),
        }
    }
}

impl core::error::Error for InstrumentError {}

/// A validated instrument: its kind, the payload it was created from, and the decoded value.
///
/// For `RISCV-LMUL` the value is the `vlmul` encoding, for `RISCV-SEW` it's the width in bits.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Instrument {
    kind: InstrumentKind,
    data: Box<str>,
    value: u8,
}

impl Instrument {
    pub fn new(kind: InstrumentKind, data: &str) -> Result<Self, InstrumentError> {
        let Some(value) = (kind.codec().decode)(data) else {
            return Err(InstrumentError::InvalidInstrumentData {
                kind,
                data: data.to_owned(),
            });
        };

        Ok(Instrument {
            kind,
            data: data.into(),
            value,
        })
    }

    pub fn from_lmul(lmul: Lmul) -> Self {
        Instrument {
            kind: InstrumentKind::Lmul,
            data: lmul.name().into(),
            value: lmul.encoding(),
        }
    }

    pub fn from_sew(sew: Sew) -> Self {
        Instrument {
            kind: InstrumentKind::Sew,
            data: sew.name().into(),
            value: sew as u8,
        }
    }

    #[inline]
    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    #[inline]
    pub fn data(&self) -> &str {
        &self.data
    }

    #[inline]
    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn lmul(&self) -> Option<Lmul> {
        match self.kind {
            InstrumentKind::Lmul => Lmul::from_encoding(self.value),
            InstrumentKind::Sew => None,
        }
    }

    pub fn sew(&self) -> Option<Sew> {
        match self.kind {
            InstrumentKind::Sew => Sew::from_bits(u32::from(self.value)),
            InstrumentKind::Lmul => None,
        }
    }
}

impl core::fmt::Display for Instrument {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{} {}", self.kind, self.data)
    }
}

/// Where an active instrument came from.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum InstrumentOrigin {
    /// An explicit directive in the listing.
    Directive,
    /// Implied by a preceding instruction, e.g. the configuration set by `vsetvli`.
    Implied,
}

/// The instruments currently in effect, at most one per kind.
#[derive(Clone, Default, Debug)]
pub struct ActiveInstruments {
    instruments: Vec<Instrument>,
    origins: Vec<InstrumentOrigin>,
}

impl ActiveInstruments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `instrument` active, returning the instrument of the same kind it replaces.
    pub fn insert(&mut self, instrument: Instrument, origin: InstrumentOrigin) -> Option<Instrument> {
        match self.position(instrument.kind) {
            Some(index) => {
                self.origins[index] = origin;
                Some(core::mem::replace(&mut self.instruments[index], instrument))
            }
            None => {
                self.instruments.push(instrument);
                self.origins.push(origin);
                None
            }
        }
    }

    fn position(&self, kind: InstrumentKind) -> Option<usize> {
        self.instruments.iter().position(|instrument| instrument.kind == kind)
    }

    pub fn get(&self, kind: InstrumentKind) -> Option<&Instrument> {
        self.position(kind).map(|index| &self.instruments[index])
    }

    pub fn origin(&self, kind: InstrumentKind) -> Option<InstrumentOrigin> {
        self.position(kind).map(|index| self.origins[index])
    }

    /// Deactivates every instrument of the given origin; returns how many were removed.
    pub fn remove_from(&mut self, origin: InstrumentOrigin) -> usize {
        let count = self.len();
        let mut index = 0;
        while index < self.instruments.len() {
            if self.origins[index] == origin {
                self.instruments.remove(index);
                self.origins.remove(index);
            } else {
                index += 1;
            }
        }

        count - self.len()
    }

    pub fn as_slice(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn clear(&mut self) {
        self.instruments.clear();
        self.origins.clear();
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ActiveInstruments, Instrument, InstrumentError, InstrumentKind, InstrumentOrigin};
    use rvmca_common::{Lmul, Sew};

    #[test]
    fn every_lmul_payload_decodes_to_its_encoding() {
        for lmul in Lmul::ALL {
            assert!(InstrumentKind::Lmul.is_data_valid(lmul.name()));
            let instrument = Instrument::new(InstrumentKind::Lmul, lmul.name()).unwrap();
            assert_eq!(instrument.value(), lmul.encoding());
            assert_eq!(instrument.lmul(), Some(lmul));
            assert_eq!(instrument.sew(), None);
            assert_eq!(instrument, Instrument::from_lmul(lmul));
        }

        assert_eq!(InstrumentKind::Lmul.valid_payloads().len(), Lmul::ALL.len());
        assert_eq!(Instrument::new(InstrumentKind::Lmul, "M2").unwrap().value(), 1);
        assert_eq!(Instrument::new(InstrumentKind::Lmul, "MF8").unwrap().value(), 5);
    }

    #[test]
    fn every_sew_payload_decodes_to_its_width() {
        for (payload, bits) in [("E8", 8), ("E16", 16), ("E32", 32), ("E64", 64)] {
            let instrument = Instrument::new(InstrumentKind::Sew, payload).unwrap();
            assert_eq!(instrument.value(), bits);
            assert_eq!(instrument.sew().map(Sew::bits), Some(u32::from(bits)));
        }
    }

    #[test]
    fn invalid_payloads_are_rejected() {
        for payload in ["", "m2", "M3", "M16", "MF16", "E32", " M2", "M2 "] {
            assert!(!InstrumentKind::Lmul.is_data_valid(payload), "{payload:?}");
            assert!(Instrument::new(InstrumentKind::Lmul, payload).is_err());
        }

        for payload in ["", "e32", "E128", "E4", "32", "M1"] {
            assert!(!InstrumentKind::Sew.is_data_valid(payload), "{payload:?}");
        }

        let error = Instrument::new(InstrumentKind::Sew, "E128").unwrap_err();
        assert_eq!(
            error,
            InstrumentError::InvalidInstrumentData {
                kind: InstrumentKind::Sew,
                data: "E128".to_owned()
            }
        );
        assert_eq!(
            error.to_string(),
            "invalid data for instrument 'RISCV-SEW': 'E128' (expected one of: E8, E16, E32, E64)"
        );
    }

    #[test]
    fn kind_names() {
        assert_eq!(InstrumentKind::from_name("RISCV-LMUL"), Some(InstrumentKind::Lmul));
        assert_eq!(InstrumentKind::from_name("RISCV-SEW"), Some(InstrumentKind::Sew));
        assert_eq!(InstrumentKind::from_name("riscv-lmul"), None);
        assert_eq!(InstrumentKind::from_name("X86-VL"), None);
        assert_eq!(Instrument::from_sew(Sew::E16).to_string(), "RISCV-SEW E16");
    }

    #[test]
    fn latest_instrument_of_a_kind_wins() {
        use InstrumentOrigin::Directive;

        let mut active = ActiveInstruments::new();
        assert!(active.insert(Instrument::from_lmul(Lmul::M1), Directive).is_none());
        assert!(active.insert(Instrument::from_sew(Sew::E8), Directive).is_none());
        assert_eq!(
            active.insert(Instrument::from_lmul(Lmul::M4), Directive),
            Some(Instrument::from_lmul(Lmul::M1))
        );

        assert_eq!(active.len(), 2);
        assert_eq!(active.get(InstrumentKind::Lmul).and_then(Instrument::lmul), Some(Lmul::M4));
        assert_eq!(active.get(InstrumentKind::Sew).and_then(Instrument::sew), Some(Sew::E8));

        active.clear();
        assert!(active.is_empty());
        assert!(active.get(InstrumentKind::Lmul).is_none());
        assert!(active.origin(InstrumentKind::Lmul).is_none());
    }

    #[test]
    fn instruments_remember_where_they_came_from() {
        let mut active = ActiveInstruments::new();
        active.insert(Instrument::from_lmul(Lmul::M2), InstrumentOrigin::Directive);
        active.insert(Instrument::from_lmul(Lmul::M8), InstrumentOrigin::Implied);
        active.insert(Instrument::from_sew(Sew::E32), InstrumentOrigin::Implied);
        assert_eq!(active.origin(InstrumentKind::Lmul), Some(InstrumentOrigin::Implied));

        active.insert(Instrument::from_sew(Sew::E16), InstrumentOrigin::Directive);
        assert_eq!(active.origin(InstrumentKind::Sew), Some(InstrumentOrigin::Directive));

        assert_eq!(active.remove_from(InstrumentOrigin::Implied), 1);
        assert_eq!(active.as_slice(), [Instrument::from_sew(Sew::E16)]);
        assert_eq!(active.origin(InstrumentKind::Sew), Some(InstrumentOrigin::Directive));
        assert_eq!(active.remove_from(InstrumentOrigin::Implied), 0);
    }
}
