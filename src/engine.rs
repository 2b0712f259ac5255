//! Recommendation orchestrator.
//!
//! Drives one recommendation request end to end: expands order lines into
//! unit-level product instances, segregates them by temperature, partitions
//! each stream against the weight ceiling, selects a box per partition and
//! assembles the packed groups together with explicit failure descriptors.
//!
//! A request is a single synchronous computation over one immutable catalog
//! snapshot; given identical inputs it always produces identical output.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::{BoxSpec, CatalogSnapshot, OrderLine, PackedGroup, ProductUnit};
use crate::partition::{halve_by_weight, partition_by_weight, segregate};
use crate::selector::select_box;
use crate::types::{Texture, PACKING_EFFICIENCY, WEIGHT_CEILING};

/// Tunable parameters of the recommendation engine.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Maximum total unit weight per packed group.
    pub weight_ceiling: u64,
    /// Usable fraction of a box's raw volume.
    pub packing_efficiency: f64,
}

impl EngineConfig {
    pub const DEFAULT_WEIGHT_CEILING: u64 = WEIGHT_CEILING;
    pub const DEFAULT_PACKING_EFFICIENCY: f64 = PACKING_EFFICIENCY;
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weight_ceiling: Self::DEFAULT_WEIGHT_CEILING,
            packing_efficiency: Self::DEFAULT_PACKING_EFFICIENCY,
        }
    }
}

/// Request-aborting errors.
///
/// Unlike [`PackingFailure`], which is reported next to successful groups,
/// these abort the whole recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecommendError {
    #[error("Order resolved to zero product instances")]
    EmptyOrder,
    #[error("Product '{product_id}' is missing from the catalog")]
    MissingProductData { product_id: String },
}

/// Reason a partition could not be packed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// No box satisfies both the size prefilter and the feasibility oracle.
    InfeasiblePacking,
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::InfeasiblePacking => "infeasible_packing",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::InfeasiblePacking => {
                write!(f, "No box satisfies the size prefilter and feasibility oracle")
            }
        }
    }
}

/// A weight-bounded partition that could not be assigned any box.
#[derive(Clone, Debug)]
pub struct PackingFailure {
    pub units: Vec<ProductUnit>,
    pub reason: FailureReason,
}

/// Result of one recommendation request.
///
/// Ambient-stream groups precede frozen-stream groups. Every expanded unit
/// appears in exactly one group or exactly one failure, never both, never
/// neither.
#[derive(Clone, Debug, Default)]
pub struct RecommendOutcome {
    pub groups: Vec<PackedGroup>,
    pub failures: Vec<PackingFailure>,
}

impl RecommendOutcome {
    /// Whether every partition was assigned a box.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of packed groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Maps packed groups to output records, preserving group emission order
    /// and each group's internal unit order.
    pub fn to_records(&self) -> Vec<RecommendationRecord> {
        self.groups
            .iter()
            .map(|group| RecommendationRecord {
                box_name: group.box_spec.name.clone(),
                products: group
                    .units
                    .iter()
                    .map(|unit| PackedProductRecord {
                        product_id: unit.product.id.clone(),
                        product_name: unit.product.name.clone(),
                        packaging_material_name: unit.packaging_material_name.clone(),
                        packaging_material_quantity: unit.product.packaging_material_quantity,
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Output record for one packed group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecommendationRecord {
    pub box_name: String,
    pub products: Vec<PackedProductRecord>,
}

/// Output record for one packed product unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PackedProductRecord {
    pub product_id: String,
    pub product_name: String,
    pub packaging_material_name: String,
    pub packaging_material_quantity: u32,
}

/// Expands order lines into unit-level product instances.
///
/// Lines are processed in ascending product-id order so expansion never
/// depends on the caller's collection order. Each unit carries the resolved
/// packaging-material name and the category error rate as passenger data.
pub fn expand_order(
    lines: &[OrderLine],
    snapshot: &CatalogSnapshot,
) -> Result<Vec<ProductUnit>, RecommendError> {
    let mut sorted_lines: Vec<&OrderLine> = lines.iter().collect();
    sorted_lines.sort_by(|a, b| a.product_id.cmp(&b.product_id));

    let mut units = Vec::new();
    for line in sorted_lines {
        let product = snapshot.products.get(&line.product_id).ok_or_else(|| {
            RecommendError::MissingProductData {
                product_id: line.product_id.clone(),
            }
        })?;

        let material_name = snapshot
            .packaging_materials
            .get(&product.packaging_material_id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| product.packaging_material_id.clone());
        let error_rate = snapshot
            .categories
            .get(&product.category_type)
            .map(|c| c.error_rate);

        for _ in 0..line.count {
            units.push(ProductUnit {
                product: product.clone(),
                packaging_material_name: material_name.clone(),
                category_error_rate: error_rate,
            });
        }
    }

    if units.is_empty() {
        return Err(RecommendError::EmptyOrder);
    }
    Ok(units)
}

/// Packs one temperature stream against its texture-matched box pool.
///
/// Weight partitions that no box accepts are halved with the same greedy
/// rule as the partitioner and re-queued; an unresolvable singleton becomes
/// a failure descriptor instead of being silently dropped.
fn pack_stream(
    units: Vec<ProductUnit>,
    pool: &[&BoxSpec],
    config: &EngineConfig,
) -> (Vec<PackedGroup>, Vec<PackingFailure>) {
    let mut groups = Vec::new();
    let mut failures = Vec::new();

    let mut worklist: VecDeque<Vec<ProductUnit>> =
        partition_by_weight(units, config.weight_ceiling).into();

    while let Some(batch) = worklist.pop_front() {
        match select_box(&batch, pool, config.packing_efficiency) {
            Some(selected) => {
                groups.push(PackedGroup {
                    box_spec: selected.clone(),
                    units: batch,
                });
            }
            None if batch.len() <= 1 => {
                tracing::debug!(
                    units = batch.len(),
                    "partition has no feasible box, reporting failure"
                );
                failures.push(PackingFailure {
                    units: batch,
                    reason: FailureReason::InfeasiblePacking,
                });
            }
            None => {
                let (left, right) = halve_by_weight(batch);
                worklist.push_back(left);
                worklist.push_back(right);
            }
        }
    }

    (groups, failures)
}

/// Runs one full recommendation over an immutable catalog snapshot.
///
/// Streams are packed independently: an infeasible partition in one stream
/// never prevents the other stream's groups from being returned. Ambient
/// groups are emitted before frozen groups.
pub fn recommend(
    lines: &[OrderLine],
    snapshot: &CatalogSnapshot,
    config: &EngineConfig,
) -> Result<RecommendOutcome, RecommendError> {
    let units = expand_order(lines, snapshot)?;
    let (frozen, other) = segregate(units);

    let mut outcome = RecommendOutcome::default();
    for (stream, is_frozen) in [(other, false), (frozen, true)] {
        if stream.is_empty() {
            continue;
        }
        let pool = snapshot.texture_pool(Texture::for_frozen(is_frozen));
        let (groups, failures) = pack_stream(stream, &pool, config);
        outcome.groups.extend(groups);
        outcome.failures.extend(failures);
    }

    Ok(outcome)
}
