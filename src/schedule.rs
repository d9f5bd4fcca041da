//! Ordered list of named per-tick stages.

use std::time::Instant;

use tracing::trace;

/// A stage receives the owning context and this tick's step length.
pub type StageFn<C> = fn(&mut C, f32);

pub struct Stage<C> {
    pub name: &'static str,
    pub run: StageFn<C>,
}

impl<C> Clone for Stage<C> {
    fn clone(&self) -> Self {
        Self { name: self.name, run: self.run }
    }
}

/// Stages run in insertion order, once per tick.
pub struct Schedule<C> {
    stages: Vec<Stage<C>>,
}

impl<C> Default for Schedule<C> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<C> Clone for Schedule<C> {
    fn clone(&self) -> Self {
        Self { stages: self.stages.clone() }
    }
}

impl<C> Schedule<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, name: &'static str, run: StageFn<C>) -> Self {
        self.push(name, run);
        self
    }

    pub fn push(&mut self, name: &'static str, run: StageFn<C>) {
        self.stages.push(Stage { name, run });
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|s| s.name)
    }

    /// Runs every stage against `ctx`. When `timed`, returns each stage's
    /// wall time in milliseconds; otherwise the list is empty.
    pub fn run(&self, ctx: &mut C, dt: f32, timed: bool) -> Vec<(&'static str, f64)> {
        let mut times = Vec::with_capacity(if timed { self.stages.len() } else { 0 });
        for stage in &self.stages {
            trace!(stage = stage.name, "stage");
            let t0 = if timed { Some(Instant::now()) } else { None };
            (stage.run)(ctx, dt);
            if let Some(t0) = t0 {
                times.push((stage.name, t0.elapsed().as_secs_f64() * 1000.0));
            }
        }
        times
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_a(log: &mut Vec<String>, dt: f32) {
        log.push(format!("a{dt}"));
    }

    fn push_b(log: &mut Vec<String>, _dt: f32) {
        log.push("b".to_string());
    }

    #[test]
    fn test_runs_in_order() {
        let s: Schedule<Vec<String>> = Schedule::new().with_stage("a", push_a).with_stage("b", push_b);
        let mut log = Vec::new();
        let times = s.run(&mut log, 0.5, false);
        assert_eq!(log, vec!["a0.5".to_string(), "b".to_string()]);
        assert!(times.is_empty());
        assert_eq!(s.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_timed_run_reports_each_stage() {
        let s: Schedule<Vec<String>> = Schedule::new().with_stage("a", push_a).with_stage("b", push_b);
        let mut log = Vec::new();
        let times = s.run(&mut log, 0.0, true);
        assert_eq!(times.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(times.iter().all(|(_, ms)| *ms >= 0.0));
    }
}
