//! Running feedback averages per packaging material.
//!
//! Accumulates feedback points reported against packaging materials and
//! exposes their running averages. State lives in an explicit aggregator
//! object with an init/reset lifecycle; updates are guarded by a mutex so
//! concurrent handlers never race on the counters.
//!
//! The recommendation engine never reads these values directly; they feed
//! the category error rates it treats as opaque passenger data.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, Default)]
struct RunningPoint {
    total: i64,
    count: u64,
}

impl RunningPoint {
    fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.total as f64 / self.count as f64)
        }
    }
}

/// Accumulator for packaging-material feedback points.
#[derive(Debug, Default)]
pub struct FeedbackAggregator {
    points: Mutex<HashMap<String, RunningPoint>>,
}

/// Snapshot of one material's running average.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialAverage {
    pub packaging_material_id: String,
    pub average: f64,
    pub samples: u64,
}

impl FeedbackAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one feedback point for a packaging material.
    pub fn record(&self, packaging_material_id: &str, point: i32) {
        let mut points = self.lock();
        let entry = points
            .entry(packaging_material_id.to_string())
            .or_default();
        entry.total += point as i64;
        entry.count += 1;
    }

    /// Running average for one material, if any point was recorded.
    pub fn average(&self, packaging_material_id: &str) -> Option<f64> {
        self.lock()
            .get(packaging_material_id)
            .and_then(|p| p.average())
    }

    /// All running averages, sorted by material id for stable output.
    pub fn averages(&self) -> Vec<MaterialAverage> {
        let points = self.lock();
        let mut averages: Vec<MaterialAverage> = points
            .iter()
            .filter_map(|(id, point)| {
                point.average().map(|average| MaterialAverage {
                    packaging_material_id: id.clone(),
                    average,
                    samples: point.count,
                })
            })
            .collect();
        averages.sort_by(|a, b| a.packaging_material_id.cmp(&b.packaging_material_id));
        averages
    }

    /// Clears all accumulated points.
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, RunningPoint>> {
        match self.points.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
