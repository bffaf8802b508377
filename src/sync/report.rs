// SPDX-License-Identifier: GPL-3.0-only
use tracing::{info, warn};

/// Outcome of one sync cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Changed pages returned by the destination
    pub discovered: usize,
    /// Pages left after comparing with local state
    pub eligible: usize,
    pub processed: usize,
    pub failed: usize,
    /// More eligible pages than the per-cycle cap; the rest waits for the next cycle
    pub hit_rate_limit: bool,
    pub watermark_advanced: bool,
}

impl CycleReport {
    pub fn log(&self) {
        if self.failed > 0 {
            warn!(
                discovered = self.discovered,
                eligible = self.eligible,
                processed = self.processed,
                failed = self.failed,
                hit_rate_limit = self.hit_rate_limit,
                "Sync cycle finished with failures; watermark kept"
            );
        } else {
            info!(
                discovered = self.discovered,
                eligible = self.eligible,
                processed = self.processed,
                hit_rate_limit = self.hit_rate_limit,
                watermark_advanced = self.watermark_advanced,
                "Sync cycle finished"
            );
        }
    }
}
