#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]
#![allow(clippy::exit)]

use clap::Parser;
use rvmca::common::OpcodeKind;
use rvmca::{Config, DefaultInstrumentManager, InstrumentKind, InstrumentManager, RiscvInstrumentManager, SchedModel};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum Target {
    /// A RISC-V core with the vector extension; instruments are honored.
    #[clap(name = "riscv")]
    Riscv,
    /// A target without instrumentation support; every opcode uses its nominal class.
    #[clap(name = "generic")]
    Generic,
}

#[derive(Parser, Debug)]
#[clap(version)]
enum Args {
    /// Resolves the scheduling class of every instruction in an annotated assembly listing.
    Analyze {
        /// Drops every instrumentation directive.
        #[clap(long)]
        ignore_instruments: bool,

        /// Aborts on invalid or unsupported instrumentation directives instead of skipping them.
        #[clap(long)]
        strict: bool,

        /// Doesn't carry the configuration set by `vsetvli`/`vsetivli` over to the following instructions.
        #[clap(long)]
        no_carry_implied: bool,

        #[clap(short = 't', long, value_enum, default_value_t = Target::Riscv)]
        target: Target,

        /// Only prints the per-region summaries.
        #[clap(short = 'q', long)]
        quiet: bool,

        /// The input listing.
        input: PathBuf,
    },

    /// Lists the supported instrument kinds and their payloads.
    Instruments,

    /// Lists the scheduling classes of the reference model.
    Classes {
        /// Only lists classes used by vector instructions.
        #[clap(long)]
        vector_only: bool,
    },
}

macro_rules! bail {
    ($($arg:tt)*) => {
        return Err(format!($($arg)*))
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let result = match args {
        Args::Analyze {
            ignore_instruments,
            strict,
            no_carry_implied,
            target,
            quiet,
            input,
        } => main_analyze(input, target, ignore_instruments, strict, !no_carry_implied, quiet),
        Args::Instruments => {
            main_instruments();
            Ok(())
        }
        Args::Classes { vector_only } => main_classes(vector_only),
    };

    if let Err(error) = result {
        eprintln!("ERROR: {}", error);
        std::process::exit(1);
    }
}

fn load_model() -> Result<Arc<SchedModel>, String> {
    match SchedModel::riscv() {
        Ok(model) => {
            log::debug!("Loaded the reference model with {} scheduling classes", model.len());
            Ok(Arc::new(model))
        }
        Err(error) => bail!("failed to build the scheduling model: {error}"),
    }
}

fn main_analyze(
    input: PathBuf,
    target: Target,
    ignore_instruments: bool,
    strict: bool,
    carry_implied: bool,
    quiet: bool,
) -> Result<(), String> {
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            bail!("failed to load the configuration: {error}");
        }
    };

    if ignore_instruments {
        config.set_ignore_instruments(true);
    }
    if strict {
        config.set_strict_instruments(true);
    }
    if !carry_implied {
        config.set_carry_implied_instruments(false);
    }

    let text = match std::fs::read_to_string(&input) {
        Ok(text) => text,
        Err(error) => {
            bail!("failed to read {input:?}: {error}");
        }
    };

    let model = load_model()?;
    let manager: Box<dyn InstrumentManager> = match target {
        Target::Riscv => Box::new(RiscvInstrumentManager::new()),
        Target::Generic => Box::new(DefaultInstrumentManager),
    };

    let reports = match rvmca::analyze(config, model.clone(), manager, &text) {
        Ok(reports) => reports,
        Err(error) => {
            bail!("failed to analyze {input:?}: {error}");
        }
    };

    let class_name = |id| model.class(id).map_or("<unknown>", |class| class.name.as_str());
    for report in &reports {
        println!("[Region: {}]", report.display_name());
        if !quiet {
            for instruction in &report.instructions {
                let marker = if instruction.is_unresolved() {
                    " (unresolved)"
                } else {
                    ""
                };

                println!(
                    "  {line:>5}  {inst:<40} {static_class:>24} -> {sched_class}{marker}",
                    line = instruction.line,
                    inst = instruction.inst.to_string(),
                    static_class = class_name(instruction.static_class),
                    sched_class = class_name(instruction.sched_class),
                );
            }
        }

        println!("  Instructions:         {}", report.instructions.len());
        println!("  Unresolved:           {}", report.unresolved_count());
        println!("  Uses vector pipeline: {}", report.uses_vector_pipeline);
        println!("  Resource pressure:    {}", report.pressure);
        println!();
    }

    Ok(())
}

fn main_instruments() {
    for kind in InstrumentKind::ALL {
        println!("{}: {}", kind.name(), kind.valid_payloads().join(" "));
    }
}

fn main_classes(vector_only: bool) -> Result<(), String> {
    let model = load_model()?;
    let mut used_by_vector = vec![false; model.len()];
    for &opcode in rvmca::common::Opcode::ALL {
        if opcode.kind() != OpcodeKind::Scalar {
            used_by_vector[usize::from(model.sched_class_of(opcode).get())] = true;
        }
    }

    for (_, class) in model.variants() {
        used_by_vector[usize::from(class.get())] = true;
    }

    for (id, class) in model.classes() {
        if vector_only && !used_by_vector[usize::from(id.get())] {
            continue;
        }

        println!(
            "{id:>4}  {name:<28} latency={latency:<4} rthroughput={rthroughput:<4} unit={unit}",
            id = id.get(),
            name = class.name,
            latency = class.latency,
            rthroughput = class.reciprocal_throughput,
            unit = class.unit,
        );
    }

    Ok(())
}
