#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, OnceLock};

use rvmca::{Config, RiscvInstrumentManager, SchedModel};
use rvmca_common::listing::{parse_listing, ListingItem};

static MODEL: OnceLock<Arc<SchedModel>> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let Ok(listing) = parse_listing(text) else {
        return;
    };

    // Whatever was parsed must print back into something which parses the same way.
    for line in &listing {
        if let ListingItem::Instruction(inst) = &line.item {
            let reparsed: rvmca_common::Inst = inst.to_string().parse().unwrap();
            assert_eq!(&reparsed, inst);
        }
    }

    let model = MODEL.get_or_init(|| Arc::new(SchedModel::riscv().unwrap())).clone();
    let reports = rvmca::analyze(Config::new(), model, RiscvInstrumentManager::new(), text).unwrap();
    let instruction_count = listing
        .iter()
        .filter(|line| matches!(line.item, ListingItem::Instruction(_)))
        .count();

    assert_eq!(
        reports.iter().map(|report| report.instructions.len()).sum::<usize>(),
        instruction_count
    );
});
