// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the extraction engine, passed explicitly to
/// `JobScheduler::new`. There is no process-wide settings state; the caller
/// owns construction and teardown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of parallel worker slots for extraction jobs.
    pub worker_count: usize,
    /// Maximum number of submitted-but-not-yet-running jobs before new
    /// submissions are rejected with `QueueFull`.
    pub queue_depth: usize,
    /// Deadline for the preprocess + recognize stage of a single job, in
    /// milliseconds. Jobs that run past it fail with a recognition timeout.
    pub ocr_timeout_ms: u64,
    /// Default resolution for PDF page rasterization, in dots per inch.
    /// Higher values improve recognition accuracy at a proportional memory
    /// and time cost; there is no upper cap.
    pub render_dpi: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            queue_depth: 32,
            ocr_timeout_ms: 120_000,
            render_dpi: 300.0,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration, normalizing zero values up to usable
    /// minimums. A pool of zero workers or a zero-depth queue could never
    /// run anything.
    pub fn normalized(mut self) -> Self {
        if self.worker_count == 0 {
            self.worker_count = 1;
        }
        if self.queue_depth == 0 {
            self.queue_depth = 1;
        }
        if self.render_dpi <= 0.0 {
            self.render_dpi = 300.0;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = EngineConfig::default();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.queue_depth, 32);
        assert_eq!(config.ocr_timeout_ms, 120_000);
        assert_eq!(config.render_dpi, 300.0);
    }

    #[test]
    fn normalized_lifts_zero_values() {
        let config = EngineConfig {
            worker_count: 0,
            queue_depth: 0,
            ocr_timeout_ms: 1,
            render_dpi: -1.0,
        }
        .normalized();
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.queue_depth, 1);
        assert_eq!(config.render_dpi, 300.0);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let back: EngineConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.worker_count, config.worker_count);
        assert_eq!(back.ocr_timeout_ms, config.ocr_timeout_ms);
    }
}
