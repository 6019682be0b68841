//! Cooperative job queue drained at a bounded rate per tick
//!
//! Long work (batch generation, payload application) is split into resumable jobs.
//! Each tick the host calls [`JobQueue::run_tick`]; jobs spend units from a shared
//! [`TickBudget`] and return [`JobStatus::Pending`] to yield until the next tick.

use std::collections::VecDeque;
use std::time::Duration;

use web_time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// More work remains; resume next tick
    Pending,
    /// Finished; drop the job
    Done,
}

/// Work allowance for one tick
#[derive(Debug, Clone)]
pub struct TickBudget {
    units: u32,
    deadline: Option<Instant>,
}

impl TickBudget {
    pub fn new(units: u32, time_slice: Option<Duration>) -> Self {
        Self {
            units,
            deadline: time_slice.map(|slice| Instant::now() + slice),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.units
    }

    pub fn is_exhausted(&self) -> bool {
        self.units == 0 || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Spend one unit; false when the budget is used up (yield now)
    pub fn try_spend(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.units -= 1;
        true
    }

    /// Spend up to `wanted` units, returning how many were granted
    pub fn take(&mut self, wanted: u32) -> u32 {
        if self.is_exhausted() {
            return 0;
        }
        let granted = wanted.min(self.units);
        self.units -= granted;
        granted
    }
}

/// A resumable unit of work operating on a context `C`
pub trait Job<C> {
    /// Do as much work as the budget allows
    fn step(&mut self, ctx: &mut C, budget: &mut TickBudget) -> JobStatus;

    fn label(&self) -> &str {
        "job"
    }
}

/// What one tick accomplished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub units_spent: u32,
    pub completed: usize,
    pub pending: usize,
}

/// FIFO of jobs; each tick every queued job gets at most one step, in order,
/// until the budget runs out
pub struct JobQueue<C> {
    jobs: VecDeque<Box<dyn Job<C>>>,
    units_per_tick: u32,
    time_slice: Option<Duration>,
}

impl<C> JobQueue<C> {
    pub fn new(units_per_tick: u32) -> Self {
        Self {
            jobs: VecDeque::new(),
            units_per_tick: units_per_tick.max(1),
            time_slice: None,
        }
    }

    /// Additionally stop handing out work once `slice` has elapsed within a tick
    pub fn with_time_slice(mut self, slice: Duration) -> Self {
        self.time_slice = Some(slice);
        self
    }

    pub fn units_per_tick(&self) -> u32 {
        self.units_per_tick
    }

    pub fn push(&mut self, job: impl Job<C> + 'static) {
        self.jobs.push_back(Box::new(job));
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn run_tick(&mut self, ctx: &mut C) -> TickReport {
        let mut budget = TickBudget::new(self.units_per_tick, self.time_slice);
        let mut report = TickReport::default();

        let mut remaining_turns = self.jobs.len();
        while remaining_turns > 0 && !budget.is_exhausted() {
            remaining_turns -= 1;
            let Some(mut job) = self.jobs.pop_front() else {
                break;
            };

            match job.step(ctx, &mut budget) {
                JobStatus::Done => {
                    log::trace!("[SCHED] {} finished", job.label());
                    report.completed += 1;
                }
                JobStatus::Pending => self.jobs.push_back(job),
            }
        }

        report.units_spent = self.units_per_tick - budget.remaining();
        report.pending = self.jobs.len();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts to `target`, one unit per increment
    struct Counter {
        name: &'static str,
        done: u32,
        target: u32,
    }

    impl Job<Vec<&'static str>> for Counter {
        fn step(&mut self, out: &mut Vec<&'static str>, budget: &mut TickBudget) -> JobStatus {
            while self.done < self.target {
                if !budget.try_spend() {
                    return JobStatus::Pending;
                }
                self.done += 1;
                out.push(self.name);
            }
            JobStatus::Done
        }
    }

    fn counter(name: &'static str, target: u32) -> Counter {
        Counter {
            name,
            done: 0,
            target,
        }
    }

    #[test]
    fn test_budget_limits_work_per_tick() {
        let mut queue = JobQueue::new(3);
        queue.push(counter("a", 7));
        let mut log = Vec::new();

        let report = queue.run_tick(&mut log);
        assert_eq!(report, TickReport { units_spent: 3, completed: 0, pending: 1 });
        queue.run_tick(&mut log);
        let report = queue.run_tick(&mut log);
        assert_eq!(report.completed, 1);
        assert_eq!(log.len(), 7);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_leftover_budget_flows_to_next_job() {
        let mut queue = JobQueue::new(4);
        queue.push(counter("a", 1));
        queue.push(counter("b", 5));
        let mut log = Vec::new();

        let report = queue.run_tick(&mut log);
        assert_eq!(log, vec!["a", "b", "b", "b"]);
        assert_eq!(report.completed, 1);
        assert_eq!(report.pending, 1);
    }

    #[test]
    fn test_take_partial() {
        let mut budget = TickBudget::new(5, None);
        assert_eq!(budget.take(3), 3);
        assert_eq!(budget.take(3), 2);
        assert_eq!(budget.take(1), 0);
        assert!(!budget.try_spend());
    }

    #[test]
    fn test_zero_units_clamped_to_one() {
        let queue: JobQueue<()> = JobQueue::new(0);
        assert_eq!(queue.units_per_tick(), 1);
    }
}
