//! Temperature segregation and weight-balanced partitioning.
//!
//! Splits an expanded unit list into a frozen and an ambient/refrigerated
//! stream, then recursively halves each stream until every partition fits the
//! per-box weight ceiling. The halving rule is the greedy descending-weight,
//! smaller-accumulator-first split; it is also reused by the orchestrator
//! when box selection fails for an already weight-bounded partition.

use crate::model::ProductUnit;
use crate::types::{total_weight, Weighted};

/// Splits units into a frozen stream and an ambient/refrigerated stream.
///
/// Stable partition by storage class: FROZEN units keep their relative order
/// in the first list, everything else keeps its order in the second.
pub fn segregate(units: Vec<ProductUnit>) -> (Vec<ProductUnit>, Vec<ProductUnit>) {
    units
        .into_iter()
        .partition(|unit| unit.storage_class().is_frozen())
}

/// Recursively partitions units so every sublist weighs at most `limit`.
///
/// A list already within the limit is returned as a single partition. A
/// single unit heavier than the limit cannot be subdivided further and is
/// emitted as an irreducible singleton; downstream box selection must treat
/// it as a candidate for infeasibility.
pub fn partition_by_weight(units: Vec<ProductUnit>, limit: u64) -> Vec<Vec<ProductUnit>> {
    if units.is_empty() {
        return Vec::new();
    }
    if units.len() == 1 || total_weight(&units) <= limit {
        return vec![units];
    }

    let (left, right) = halve_by_weight(units);
    let mut partitions = partition_by_weight(left, limit);
    partitions.extend(partition_by_weight(right, limit));
    partitions
}

/// Greedily splits units into two weight-balanced halves.
///
/// Sorts descending by weight (stable), then assigns each unit to whichever
/// accumulator currently holds the smaller running sum. Ties go to the first
/// accumulator. With at least two units both halves are non-empty, so every
/// recursive caller operates on a strict subset.
pub fn halve_by_weight(mut units: Vec<ProductUnit>) -> (Vec<ProductUnit>, Vec<ProductUnit>) {
    units.sort_by(|a, b| b.weight().cmp(&a.weight()));

    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut left_sum: u64 = 0;
    let mut right_sum: u64 = 0;

    for unit in units {
        let weight = unit.weight() as u64;
        if left_sum > right_sum {
            right_sum += weight;
            right.push(unit);
        } else {
            left_sum += weight;
            left.push(unit);
        }
    }

    (left, right)
}
