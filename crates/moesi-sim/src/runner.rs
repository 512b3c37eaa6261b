//! Trace execution and result reporting.

use std::fmt;

use moesi_core::{AccessFault, CacheId, CacheSystem, HitStats, InvariantViolation, MemoryStats};

use crate::trace::{TraceLine, TraceOp};

/// Options controlling a trace run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Audit the whole system after every operation and stop at the first
    /// violation.
    pub audit: bool,
}

/// What one trace operation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome {
    /// A read completed with this value.
    Read(u64),
    /// A write completed.
    Written,
    /// The operation was rejected without changing any state.
    Fault(AccessFault),
}

/// Result of a single trace operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRecord {
    /// Source line and operation.
    pub trace: TraceLine,
    /// What happened.
    pub outcome: OpOutcome,
}

impl fmt::Display for OpRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.trace.line;
        match self.outcome {
            OpOutcome::Read(value) => {
                let digits = self.trace.op.width().bytes() as usize * 2;
                write!(f, "line {line}: {} = {value:#0w$x}", self.trace.op, w = digits + 2)
            }
            OpOutcome::Written => write!(f, "line {line}: {}", self.trace.op),
            OpOutcome::Fault(fault) => write!(f, "line {line}: {}: fault: {fault}", self.trace.op),
        }
    }
}

/// Everything a trace run observed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// One record per executed operation, in trace order.
    pub records: Vec<OpRecord>,
    /// Final counters of every cache, in configuration order.
    pub caches: Vec<(CacheId, HitStats)>,
    /// Final memory traffic.
    pub memory: MemoryStats,
    /// The first audit failure and the trace line after which it was found.
    pub audit_failure: Option<(usize, InvariantViolation)>,
}

impl RunReport {
    /// Number of faulted operations.
    #[must_use]
    pub fn faults(&self) -> usize {
        self.records
            .iter()
            .filter(|record| matches!(record.outcome, OpOutcome::Fault(_)))
            .count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            if !matches!(record.outcome, OpOutcome::Written) {
                writeln!(f, "{record}")?;
            }
        }
        for (id, stats) in &self.caches {
            let rate = stats
                .hit_rate()
                .map_or_else(|| "n/a".to_string(), |rate| format!("{:.2}%", rate * 100.0));
            writeln!(
                f,
                "cache {id}: {} accesses, {} hits, hit rate {rate}",
                stats.accesses(),
                stats.hits()
            )?;
        }
        write!(
            f,
            "memory: {} block reads, {} block writes",
            self.memory.block_reads, self.memory.block_writes
        )
    }
}

/// Runs `trace` against `system`.
///
/// Faulted operations are recorded and the run continues. With
/// [`RunOptions::audit`] the run stops after the first operation that leaves
/// the system violating an invariant.
pub fn run_trace(system: &mut CacheSystem, trace: &[TraceLine], options: RunOptions) -> RunReport {
    log::info!("running {} trace operations", trace.len());
    let mut records = Vec::with_capacity(trace.len());
    let mut audit_failure = None;

    for line in trace {
        let outcome = match line.op {
            TraceOp::Read { id, width, address } => system
                .read_sized(address, id, width)
                .map_or_else(OpOutcome::Fault, OpOutcome::Read),
            TraceOp::Write {
                id,
                width,
                address,
                value,
            } => system
                .write_sized(address, id, width, value)
                .map_or_else(OpOutcome::Fault, |()| OpOutcome::Written),
        };
        if let OpOutcome::Fault(fault) = outcome {
            log::warn!("line {}: {fault}", line.line);
        }
        records.push(OpRecord {
            trace: *line,
            outcome,
        });

        if options.audit {
            if let Err(violation) = system.audit() {
                log::error!("line {}: {violation}", line.line);
                audit_failure = Some((line.line, violation));
                break;
            }
        }
    }

    RunReport {
        records,
        caches: system
            .nodes()
            .iter()
            .map(|node| (node.id(), node.cache().stats()))
            .collect(),
        memory: system.memory().stats(),
        audit_failure,
    }
}
