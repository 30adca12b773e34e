//! Per-pass timing for the motion scheduler.
//!
//! Every tick records how long the placement pass, the movement pass and the
//! transform publication took. The scheduler keeps one `PassProfiler` per
//! round; summaries go out through `tracing`.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::info;

/// Section names recorded by the scheduler.
pub const PLACEMENT: &str = "placement";
pub const MOVEMENT: &str = "movement";
pub const PUBLISH: &str = "publish";

/// Statistics for a profiled section
#[derive(Debug, Default, Clone)]
pub struct SectionStats {
    pub total_time: Duration,
    pub call_count: u64,
    pub min_time: Option<Duration>,
    pub max_time: Option<Duration>,
}

impl SectionStats {
    pub fn avg_time(&self) -> Duration {
        if self.call_count == 0 {
            Duration::ZERO
        } else {
            self.total_time / self.call_count as u32
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.total_time += elapsed;
        self.call_count += 1;
        self.min_time = Some(self.min_time.map_or(elapsed, |m| m.min(elapsed)));
        self.max_time = Some(self.max_time.map_or(elapsed, |m| m.max(elapsed)));
    }
}

/// Accumulated section timings over a run of ticks.
#[derive(Debug, Default)]
pub struct PassProfiler {
    sections: HashMap<&'static str, SectionStats>,
    tick_count: u64,
}

impl PassProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time a section using a closure.
    pub fn time_section<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.sections.entry(name).or_default().record(start.elapsed());
        result
    }

    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn get_section(&self, name: &str) -> Option<&SectionStats> {
        self.sections.get(name)
    }

    pub fn section_names(&self) -> Vec<&'static str> {
        self.sections.keys().copied().collect()
    }

    /// Log one line per section, slowest first.
    pub fn log_summary(&self) {
        let mut sections: Vec<_> = self.sections.iter().collect();
        sections.sort_by(|a, b| b.1.total_time.cmp(&a.1.total_time));

        for (name, stats) in sections {
            info!(
                section = *name,
                ticks = self.tick_count,
                total = ?stats.total_time,
                avg = ?stats.avg_time(),
                min = ?stats.min_time.unwrap_or(Duration::ZERO),
                max = ?stats.max_time.unwrap_or(Duration::ZERO),
                "pass timing"
            );
        }
    }

    pub fn reset(&mut self) {
        self.sections.clear();
        self.tick_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_profiler_basic() {
        let mut profiler = PassProfiler::new();

        let value = profiler.time_section(PLACEMENT, || {
            sleep(Duration::from_millis(10));
            7
        });
        profiler.tick();

        assert_eq!(value, 7);
        let stats = profiler.get_section(PLACEMENT).unwrap();
        assert!(stats.total_time >= Duration::from_millis(10));
        assert_eq!(stats.call_count, 1);
        assert_eq!(stats.min_time, stats.max_time);
    }

    #[test]
    fn test_profiler_multiple_sections() {
        let mut profiler = PassProfiler::new();

        for _ in 0..5 {
            profiler.time_section(MOVEMENT, || sleep(Duration::from_millis(1)));
            profiler.time_section(PLACEMENT, || sleep(Duration::from_millis(5)));
            profiler.tick();
        }

        assert_eq!(profiler.tick_count(), 5);
        let movement = profiler.get_section(MOVEMENT).unwrap();
        let placement = profiler.get_section(PLACEMENT).unwrap();
        assert_eq!(movement.call_count, 5);
        assert_eq!(placement.call_count, 5);
        assert!(placement.total_time > movement.total_time);

        profiler.reset();
        assert_eq!(profiler.tick_count(), 0);
        assert!(profiler.section_names().is_empty());
    }
}
