use std::sync::Arc;

use rvmca_common::listing::{parse_listing, ListingItem, ListingLine};
use rvmca_common::{Inst, Opcode, OpcodeKind};

use crate::config::Config;
use crate::error::{bail, bail_static, Error};
use crate::instrument::{ActiveInstruments, InstrumentOrigin};
use crate::manager::InstrumentManager;
use crate::sched::{SchedClassId, SchedModel};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ResolvedInstruction {
    /// 1-based line number within the listing; zero when the instruction wasn't read from one.
    pub line: usize,
    pub inst: Inst,
    /// The opcode's nominal class.
    pub static_class: SchedClassId,
    /// The class the instruction is simulated with.
    pub sched_class: SchedClassId,
}

impl ResolvedInstruction {
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.inst.opcode
    }

    /// Whether the cost of this instruction depends on `vtype` but it was simulated with its nominal class.
    pub fn is_unresolved(&self) -> bool {
        self.opcode().kind().depends_on_vtype() && self.sched_class == self.static_class
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RegionReport {
    /// `None` for instructions outside of any explicitly delimited region.
    pub name: Option<String>,
    pub instructions: Vec<ResolvedInstruction>,
    pub uses_vector_pipeline: bool,
    /// The sum of the reciprocal throughputs of every simulated class.
    pub pressure: u64,
}

impl RegionReport {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    pub fn unresolved_count(&self) -> usize {
        self.instructions.iter().filter(|instruction| instruction.is_unresolved()).count()
    }
}

struct OpenRegion {
    name: Option<String>,
    explicit: bool,
    instructions: Vec<ResolvedInstruction>,
}

impl OpenRegion {
    fn anonymous() -> Self {
        OpenRegion {
            name: None,
            explicit: false,
            instructions: Vec::new(),
        }
    }
}

/// Drives an instrument manager over a stream of instructions, directives and region markers.
pub struct Analysis<M> {
    config: Config,
    model: Arc<SchedModel>,
    manager: M,
    active: ActiveInstruments,
    region: OpenRegion,
    reports: Vec<RegionReport>,
}

impl<M> Analysis<M>
where
    M: InstrumentManager,
{
    pub fn new(config: Config, model: Arc<SchedModel>, manager: M) -> Self {
        Analysis {
            config,
            model,
            manager,
            active: ActiveInstruments::new(),
            region: OpenRegion::anonymous(),
            reports: Vec::new(),
        }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn model(&self) -> &SchedModel {
        &self.model
    }

    pub fn active_instruments(&self) -> &ActiveInstruments {
        &self.active
    }

    fn instruments_enabled(&self) -> bool {
        !self.config.ignore_instruments && !self.manager.should_ignore_instruments()
    }

    /// Applies an instrumentation directive to every instruction which follows it.
    ///
    /// Unsupported or invalid directives are skipped with a warning, unless strict mode is enabled.
    pub fn apply_directive(&mut self, kind: &str, data: &str, line: usize) -> Result<(), Error> {
        if !self.instruments_enabled() {
            log::trace!("Ignoring instrument on line {line}: {kind} {data}");
            return Ok(());
        }

        if !self.manager.supports_instrument_type(kind) {
            if self.config.strict_instruments {
                bail!("line {line}: unsupported instrument kind: '{kind}'");
            }

            log::warn!("Skipping unsupported instrument on line {line}: '{kind}'");
            return Ok(());
        }

        match self.manager.create_instrument(kind, data) {
            Ok(instrument) => {
                log::trace!("Line {line}: activating instrument: {instrument}");
                if let Some(previous) = self.active.insert(instrument, InstrumentOrigin::Directive) {
                    log::trace!("  Replaces: {previous}");
                }

                Ok(())
            }
            Err(error) if self.config.strict_instruments => Err(Error::from(error).context(format_args!("line {line}"))),
            Err(error) => {
                log::warn!("Skipping instrument on line {line}: {error}");
                Ok(())
            }
        }
    }

    /// Resolves the scheduling class of an instruction and appends it to the current region.
    pub fn push_instruction(&mut self, inst: Inst, line: usize) -> &ResolvedInstruction {
        let static_class = self.model.sched_class_of(inst.opcode);
        let sched_class = self.manager.sched_class_id(&self.model, &inst, self.active.as_slice());
        log::trace!("Line {line}: '{inst}': class {static_class} -> {sched_class}");

        if self.config.carry_implied_instruments && self.instruments_enabled() {
            let implied = self.manager.create_instruments(&inst);
            if implied.is_empty() && inst.opcode.kind() == OpcodeKind::VectorConfig {
                // The new configuration isn't known statically.
                let removed = self.active.remove_from(InstrumentOrigin::Implied);
                if removed > 0 {
                    log::trace!("  Drops {removed} implied instrument(s)");
                }
            }

            for instrument in implied {
                log::trace!("  Implies: {instrument}");
                self.active.insert(instrument, InstrumentOrigin::Implied);
            }
        }

        let instructions = &mut self.region.instructions;
        instructions.push(ResolvedInstruction {
            line,
            inst,
            static_class,
            sched_class,
        });

        &instructions[instructions.len() - 1]
    }

    fn close_region(&mut self) {
        let region = core::mem::replace(&mut self.region, OpenRegion::anonymous());
        let uses_vector_pipeline = self.manager.post_process_region();
        let pressure = region
            .instructions
            .iter()
            .filter_map(|instruction| self.model.class(instruction.sched_class))
            .map(|class| u64::from(class.reciprocal_throughput))
            .sum();

        let report = RegionReport {
            name: region.name,
            instructions: region.instructions,
            uses_vector_pipeline,
            pressure,
        };

        log::debug!(
            "Finished region '{}': {} instruction(s), vector pipeline used: {}, pressure: {}",
            report.display_name(),
            report.instructions.len(),
            report.uses_vector_pipeline,
            report.pressure
        );

        self.reports.push(report);
    }

    /// Starts an explicitly delimited region.
    ///
    /// Instructions seen since the previous region are reported as an anonymous region.
    pub fn begin_region(&mut self, name: Option<String>) -> Result<(), Error> {
        if self.region.explicit {
            bail_static!("regions cannot be nested");
        }

        if !self.region.instructions.is_empty() {
            self.close_region();
        }

        self.region = OpenRegion {
            name,
            explicit: true,
            instructions: Vec::new(),
        };

        Ok(())
    }

    pub fn end_region(&mut self) -> Result<(), Error> {
        if !self.region.explicit {
            bail_static!("found a region end without a matching region begin");
        }

        self.close_region();
        Ok(())
    }

    pub fn finish(mut self) -> Result<Vec<RegionReport>, Error> {
        if self.region.explicit {
            bail_static!("region is never terminated");
        }

        if !self.region.instructions.is_empty() {
            self.close_region();
        }

        Ok(self.reports)
    }

    /// Feeds every line of a parsed listing through the analysis.
    pub fn process(&mut self, listing: &[ListingLine]) -> Result<(), Error> {
        for line in listing {
            match &line.item {
                ListingItem::Instruction(inst) => {
                    self.push_instruction(inst.clone(), line.line);
                }
                ListingItem::Instrument { kind, data } => self.apply_directive(kind, data, line.line)?,
                ListingItem::RegionBegin { name } => self.begin_region(name.clone())?,
                ListingItem::RegionEnd => self.end_region()?,
            }
        }

        Ok(())
    }
}

/// Analyzes a textual listing from start to end.
pub fn analyze<M>(config: Config, model: Arc<SchedModel>, manager: M, text: &str) -> Result<Vec<RegionReport>, Error>
where
    M: InstrumentManager,
{
    let listing = parse_listing(text)?;
    let mut analysis = Analysis::new(config, model, manager);
    analysis.process(&listing)?;
    analysis.finish()
}
