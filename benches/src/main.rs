use criterion::{criterion_group, criterion_main, Criterion};
use rvmca::common::{Inst, Lmul, Opcode, Sew};
use rvmca::{analyze, Config, Instrument, InstrumentManager, RiscvInstrumentManager, SchedModel};
use std::hint::black_box;
use std::sync::Arc;

const SEED: u128 = 9324658635124;
const COUNT: usize = 100000;

fn random_instructions() -> Vec<(Inst, [Instrument; 2])> {
    let mut rng = oorandom::Rand64::new(SEED);
    let mut output = Vec::with_capacity(COUNT);
    for _ in 0..COUNT {
        let opcode = Opcode::ALL[rng.rand_range(0..Opcode::COUNT as u64) as usize];
        let lmul = Lmul::ALL[rng.rand_range(0..Lmul::ALL.len() as u64) as usize];
        let sew = Sew::ALL[rng.rand_range(0..Sew::ALL.len() as u64) as usize];
        output.push((
            Inst::new(opcode, Vec::new()),
            [Instrument::from_lmul(lmul), Instrument::from_sew(sew)],
        ));
    }

    output
}

fn resolve_benchmarks(c: &mut Criterion) {
    let model = SchedModel::riscv().unwrap();
    let instructions = random_instructions();

    c.bench_function("resolve random instructions", |b| {
        b.iter(|| {
            let mut manager = RiscvInstrumentManager::new();
            for (inst, instruments) in &instructions {
                black_box(manager.sched_class_id(&model, inst, instruments));
            }
            black_box(manager.post_process_region());
        })
    });

    let vadd: Inst = "vadd.vv v1, v2, v3".parse().unwrap();
    let instruments = [Instrument::from_lmul(Lmul::M2), Instrument::from_sew(Sew::E32)];
    c.bench_function("resolve vadd.vv", |b| {
        let mut manager = RiscvInstrumentManager::new();
        b.iter(|| black_box(manager.sched_class_id(&model, black_box(&vadd), black_box(&instruments))))
    });

    let add: Inst = "add a0, a1, a2".parse().unwrap();
    c.bench_function("resolve scalar add", |b| {
        let mut manager = RiscvInstrumentManager::new();
        b.iter(|| black_box(manager.sched_class_id(&model, black_box(&add), &[])))
    });

    let model = Arc::new(model);
    let mut listing = String::new();
    for n in 0..1000 {
        if n % 100 == 0 {
            listing.push_str("vsetvli t0, a0, e32, m4, ta, ma\n");
        }
        listing.push_str("vle32.v v8, (a1)\nvfmacc.vv v16, v24, v8\nvse32.v v16, (a2)\naddi a1, a1, 16\n");
    }

    c.bench_function("analyze listing", |b| {
        b.iter(|| analyze(Config::new(), model.clone(), RiscvInstrumentManager::new(), black_box(&listing)).unwrap())
    });
}

criterion_group!(benches, resolve_benchmarks);
criterion_main!(benches);
