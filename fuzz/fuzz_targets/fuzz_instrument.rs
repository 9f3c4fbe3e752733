#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use rvmca::{Instrument, InstrumentKind, InstrumentManager, RiscvInstrumentManager, SchedModel, VariantKey};
use rvmca_common::{Inst, Lmul, Opcode, Operand, Reg, Sew, VType};

#[derive(Arbitrary, Debug)]
enum Directive {
    Lmul(String),
    Sew(String),
    Valid(Lmul, Sew),
    Unknown { name: String, data: String },
}

#[derive(Arbitrary, Debug)]
struct Input {
    directives: Vec<Directive>,
    opcode: Opcode,
    vtype_bits: u16,
}

fuzz_target!(|input: Input| {
    let model = SchedModel::riscv().unwrap();
    let mut manager = RiscvInstrumentManager::new();

    let mut instruments = Vec::new();
    for directive in input.directives {
        let (name, data) = match directive {
            Directive::Lmul(data) => ("RISCV-LMUL".to_owned(), data),
            Directive::Sew(data) => ("RISCV-SEW".to_owned(), data),
            Directive::Valid(lmul, sew) => {
                instruments.push(Instrument::from_lmul(lmul));
                instruments.push(Instrument::from_sew(sew));
                continue;
            }
            Directive::Unknown { name, data } => (name, data),
        };

        let kind = InstrumentKind::from_name(&name);
        assert_eq!(manager.supports_instrument_type(&name), kind.is_some());
        match manager.create_instrument(&name, &data) {
            Ok(instrument) => {
                let kind = kind.unwrap();
                assert!(kind.is_data_valid(&data));
                assert!(kind.valid_payloads().contains(&data.as_str()));
                assert_eq!(instrument.kind(), kind);
                assert_eq!(instrument.data(), data);
                instruments.push(instrument);
            }
            Err(_) => assert!(kind.map_or(true, |kind| !kind.is_data_valid(&data))),
        }
    }

    let config = Inst::new(
        Opcode::VSETVLI,
        [Operand::Reg(Reg::A0), Operand::Reg(Reg::A1), Operand::Imm(i64::from(input.vtype_bits))],
    );

    let implied = manager.create_instruments(&config);
    match VType::from_bits(u32::from(input.vtype_bits)) {
        Some(vtype) => {
            assert_eq!(implied, [Instrument::from_lmul(vtype.lmul), Instrument::from_sew(vtype.sew)]);
        }
        None => assert!(implied.is_empty()),
    }
    instruments.extend(implied);

    let inst = Inst::new(input.opcode, Vec::new());
    let static_class = model.sched_class_of(input.opcode);
    let resolved = manager.resolve_sched_class(&model, &inst, &instruments);
    let class = manager.sched_class_id(&model, &inst, &instruments);
    assert_eq!(class, manager.sched_class_id(&model, &inst, &instruments));
    assert_eq!(manager.is_vector_pipeline(), input.opcode.kind().is_vector());

    match resolved {
        Ok(resolved) => {
            assert_eq!(resolved, class);
            if input.opcode.kind().depends_on_vtype() {
                let entry = *manager.pseudo_table().get(input.opcode).unwrap();
                let base = entry.base;
                let active_sew = instruments.iter().rev().find_map(Instrument::sew);
                let mut lmul = instruments.iter().rev().find_map(Instrument::lmul).unwrap();
                if let Some(eew) = entry.eew {
                    lmul = lmul.for_element_width(active_sew.unwrap(), eew).unwrap();
                }

                let sew = if base.depends_on_sew() { active_sew } else { None };

                assert_eq!(model.variant_class(&VariantKey { base, lmul, sew }), Some(class));
                assert_ne!(class, static_class);
            } else {
                assert_eq!(class, static_class);
            }
        }
        Err(_) => assert_eq!(class, static_class),
    }

    assert_eq!(manager.post_process_region(), input.opcode.kind().is_vector());
    assert!(!manager.post_process_region());
});
