use std::time::Instant;

/// 性能统计 Guard：记录 elapsed_ms + 迭代次数 + 放置次数
///
/// 使用方式：
/// ```ignore
/// let mut perf = completion_tally::perf::PerfGuard::new("plan_completion");
/// perf.iteration();
/// perf.placement();
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    iterations: u64,
    placements: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            iterations: 0,
            placements: 0,
        }
    }

    pub fn iteration(&mut self) {
        self.iterations = self.iterations.saturating_add(1);
    }

    pub fn placement(&mut self) {
        self.placements = self.placements.saturating_add(1);
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn placements(&self) -> u64 {
        self.placements
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            iterations = self.iterations,
            placements = self.placements,
            "done"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut perf = PerfGuard::new("test");
        perf.iteration();
        perf.iteration();
        perf.placement();
        assert_eq!(perf.iterations(), 2);
        assert_eq!(perf.placements(), 1);
    }
}
