/// Casts-per-proc counter for proc-activated windows.
///
/// Each eligible cast bumps the live counter. Every window trigger seals the
/// live value into history and starts again from zero. At stream end the live
/// value is sealed with `no_trigger_before_end` set: those casts are real, so
/// they count toward the total, but no proc followed them, so they are left
/// out of the per-proc distribution.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedCount {
    pub count:                 u32,
    pub no_trigger_before_end: bool,
}

#[derive(Debug, Default)]
pub struct ProcCounter {
    current: u32,
    history: Vec<SealedCount>,
}

/// Summary of eligible casts between procs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcStatistics {
    /// Sealed counters that ended in a proc.
    pub procs:          usize,
    pub min:            Option<u32>,
    pub max:            Option<u32>,
    pub median:         Option<f64>,
    pub total_eligible: u32,
    /// `total_eligible / benchmark`, the proc count a simulated player would expect.
    pub expected_procs: f64,
}

impl ProcCounter {
    pub fn increment(&mut self) {
        self.current += 1;
    }

    /// A trigger happened: close the running count.
    pub fn seal(&mut self) {
        self.history.push(SealedCount { count: self.current, no_trigger_before_end: false });
        self.current = 0;
    }

    /// The stream ended: close the running count without a trigger.
    pub fn seal_at_end(&mut self) {
        self.history.push(SealedCount { count: self.current, no_trigger_before_end: true });
        self.current = 0;
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn history(&self) -> &[SealedCount] {
        &self.history
    }

    pub fn statistics(&self, benchmark_casts_per_proc: f64) -> ProcStatistics {
        let counted: Vec<u32> = self
            .history
            .iter()
            .filter(|c| !c.no_trigger_before_end)
            .map(|c| c.count)
            .collect();

        let total_eligible = self.history.iter().map(|c| c.count).sum::<u32>() + self.current;
        let expected_procs = if benchmark_casts_per_proc > 0.0 {
            total_eligible as f64 / benchmark_casts_per_proc
        } else {
            0.0
        };

        ProcStatistics {
            procs: counted.len(),
            min: counted.iter().copied().min(),
            max: counted.iter().copied().max(),
            median: median(&counted),
            total_eligible,
            expected_procs,
        }
    }
}

/// Standard median; the mean of the two middle values for even lengths.
pub fn median(values: &[u32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let half = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[half] as f64)
    } else {
        Some((sorted[half - 1] as f64 + sorted[half] as f64) / 2.0)
    }
}
