//! Box selection and the approximate packing feasibility oracle.
//!
//! The selector scans a texture-matched, volume-descending box pool and
//! returns the smallest box the oracle still accepts. Selection assumes
//! monotonicity: once a box that passed the size prefilter is rejected by the
//! oracle, every smaller box is expected to fail too, so scanning stops at
//! the first regression instead of trying the remaining candidates.

use crate::model::{BoxSpec, ProductUnit};
use crate::types::Dimensional;

/// Approximate admission test: can the given units fit inside the box.
///
/// Sorts units descending by maximal-orientation volume and admits them one
/// by one while `efficiency × box volume − Σ(admitted min volumes)` still
/// covers the next unit's minimal/compressed-orientation volume. Stops at the
/// first unit that no longer fits. Returns true iff every unit was admitted.
pub fn fits(units: &[ProductUnit], box_spec: &BoxSpec, efficiency: f64) -> bool {
    let mut pending: Vec<&ProductUnit> = units.iter().collect();
    pending.sort_by(|a, b| b.max_volume().cmp(&a.max_volume()));

    let usable_capacity = box_spec.volume() as f64 * efficiency;
    let mut arranged_min_volume: u64 = 0;

    for unit in &pending {
        let min_volume = unit.min_volume();
        if usable_capacity - arranged_min_volume as f64 >= min_volume as f64 {
            arranged_min_volume = arranged_min_volume.saturating_add(min_volume);
        } else {
            return false;
        }
    }

    true
}

/// Picks the smallest suitable box for a weight-bounded unit set.
///
/// `boxes` must be pre-filtered to the texture of the current stream and
/// sorted descending by volume. A candidate qualifies when its largest
/// interior dimension exceeds the largest single footprint dimension among
/// the units and its volume exceeds the summed maximal-orientation volumes;
/// qualifying candidates are then checked against [`fits`]. Returns `None`
/// when no candidate ever qualifies.
pub fn select_box<'a>(
    units: &[ProductUnit],
    boxes: &[&'a BoxSpec],
    efficiency: f64,
) -> Option<&'a BoxSpec> {
    let max_footprint = units
        .iter()
        .map(|u| u.dimensions().max_dimension())
        .max()
        .unwrap_or(0);
    // Saturating: a sum past u64::MAX can only make every candidate fail
    // the volume prefilter, which is the correct outcome anyway.
    let total_volume = units
        .iter()
        .fold(0u64, |acc, u| acc.saturating_add(u.max_volume()));

    let mut best: Option<&BoxSpec> = None;
    for candidate in boxes {
        if candidate.dims.max_dimension() > max_footprint && candidate.volume() > total_volume {
            if fits(units, candidate, efficiency) {
                // Smaller boxes come later in the scan and are preferred
                // when they also pass.
                best = Some(candidate);
            } else {
                return best;
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Product;
    use crate::types::{Dims, StorageClass, Texture};

    fn unit(id: &str, dims: Dims, compressed: Option<Dims>) -> ProductUnit {
        ProductUnit {
            product: Product::new(
                id,
                format!("Product {}", id),
                1_000,
                dims,
                compressed,
                StorageClass::Ambient,
                "produce",
                "m1",
                1,
            )
            .unwrap(),
            packaging_material_name: "Paper wrap".to_string(),
            category_error_rate: None,
        }
    }

    fn paper_box(id: &str, dims: Dims) -> BoxSpec {
        BoxSpec::new(id, format!("Box {}", id), dims, Texture::Paper).unwrap()
    }

    #[test]
    fn fits_admits_all_units_within_adjusted_capacity() {
        // 10x10x10 box: usable capacity is 0.8 * 1000 = 800.
        let box_spec = paper_box("b1", Dims::new(10, 10, 10));
        let units = vec![
            unit("a", Dims::new(10, 10, 5), Some(Dims::new(10, 10, 4))),
            unit("b", Dims::new(10, 10, 5), Some(Dims::new(10, 10, 4))),
        ];

        // 400 + 400 = 800 exactly; admission uses >=.
        assert!(fits(&units, &box_spec, 0.8));
    }

    #[test]
    fn fits_rejects_once_capacity_is_exhausted() {
        let box_spec = paper_box("b1", Dims::new(10, 10, 10));
        let units = vec![
            unit("a", Dims::new(10, 10, 7), None), // min volume 700
            unit("b", Dims::new(10, 10, 2), None), // min volume 200
        ];

        // 800 - 700 = 100 < 200, so the second unit is refused.
        assert!(!fits(&units, &box_spec, 0.8));
    }

    #[test]
    fn fits_checks_every_pending_unit_not_just_one() {
        let box_spec = paper_box("b1", Dims::new(10, 10, 10));
        let units = vec![
            unit("a", Dims::new(5, 5, 5), None),
            unit("b", Dims::new(5, 5, 5), None),
            unit("c", Dims::new(5, 5, 5), None),
            unit("d", Dims::new(5, 5, 5), None),
            unit("e", Dims::new(5, 5, 5), None),
            unit("f", Dims::new(5, 5, 5), None),
            unit("g", Dims::new(5, 5, 5), None),
        ];

        // 7 * 125 = 875 > 800: a single-residual check would admit six units
        // and miss the overflow; the full loop must reject.
        assert!(!fits(&units, &box_spec, 0.8));

        assert!(fits(&units[..6], &box_spec, 0.8));
    }

    #[test]
    fn fits_uses_compressed_volume_for_capacity_accounting() {
        let box_spec = paper_box("b1", Dims::new(10, 10, 10));
        // Max volume 1000 would never fit, compressed 500 does.
        let compressible = vec![unit("a", Dims::new(10, 10, 10), Some(Dims::new(10, 10, 5)))];
        assert!(fits(&compressible, &box_spec, 0.8));

        let rigid = vec![unit("a", Dims::new(10, 10, 10), None)];
        assert!(!fits(&rigid, &box_spec, 0.8));
    }

    #[test]
    fn selects_smallest_box_that_still_passes() {
        let large = paper_box("large", Dims::new(30, 30, 30));
        let medium = paper_box("medium", Dims::new(20, 20, 20));
        let small = paper_box("small", Dims::new(12, 12, 12));
        let pool = vec![&large, &medium, &small];

        // Three units of 500 volume each: total 1500, footprint 10.
        let units = vec![
            unit("a", Dims::new(10, 10, 5), None),
            unit("b", Dims::new(10, 10, 5), None),
            unit("c", Dims::new(10, 10, 5), None),
        ];

        // The small box passes the prefilter (1728 > 1500) but the oracle
        // rejects it (0.8 * 1728 = 1382.4 < 1500), which ends the scan with
        // the medium box as the recorded best.
        let selected = select_box(&units, &pool, 0.8).expect("a box must be selected");
        assert_eq!(selected.id, "medium");
    }

    #[test]
    fn prefilter_requires_strictly_larger_dimension_and_volume() {
        // Box max dimension equals the footprint: not a candidate.
        let boxes = vec![paper_box("b1", Dims::new(10, 10, 10))];
        let pool: Vec<&BoxSpec> = boxes.iter().collect();
        let units = vec![unit("a", Dims::new(10, 4, 4), None)];
        assert!(select_box(&units, &pool, 0.8).is_none());

        // Box volume equals the summed max volume: not a candidate either,
        // even though the compressed volumes would satisfy the oracle.
        let boxes = vec![paper_box("b2", Dims::new(11, 10, 10))];
        let pool: Vec<&BoxSpec> = boxes.iter().collect();
        let units = vec![
            unit("a", Dims::new(10, 10, 5), Some(Dims::new(5, 5, 5))),
            unit("b", Dims::new(10, 10, 5), Some(Dims::new(5, 5, 5))),
            unit("c", Dims::new(10, 10, 1), Some(Dims::new(5, 5, 1))),
        ];
        assert!(
            fits(&units, &boxes[0], 0.8),
            "oracle alone would admit the units"
        );
        assert!(select_box(&units, &pool, 0.8).is_none());
    }

    #[test]
    fn returns_none_when_no_candidate_qualifies() {
        let boxes = vec![
            paper_box("b1", Dims::new(10, 10, 10)),
            paper_box("b2", Dims::new(12, 12, 12)),
        ];
        let pool: Vec<&BoxSpec> = boxes.iter().collect();

        let units = vec![unit("a", Dims::new(40, 40, 40), None)];
        assert!(select_box(&units, &pool, 0.8).is_none());
    }

    #[test]
    fn oracle_rejection_on_the_largest_box_yields_none() {
        // Passes the prefilter (1100 > 900, 11 > 10) but the usable capacity
        // 880 cannot hold a rigid 900-volume unit.
        let boxes = vec![paper_box("b1", Dims::new(11, 10, 10))];
        let pool: Vec<&BoxSpec> = boxes.iter().collect();
        let units = vec![unit("a", Dims::new(10, 10, 9), None)];

        assert!(select_box(&units, &pool, 0.8).is_none());
    }

    #[test]
    fn summed_volumes_saturate_instead_of_overflowing() {
        // Twenty units at the 10^18 per-volume cap sum past u64::MAX; the
        // scan must reject them all without wrapping.
        let huge = Dims::new(
            Dims::MAX_DIMENSION,
            Dims::MAX_DIMENSION,
            Dims::MAX_DIMENSION,
        );
        let units: Vec<ProductUnit> = (0..20)
            .map(|i| unit(&format!("p{}", i), huge, None))
            .collect();
        let boxes = vec![paper_box("b1", huge)];
        let pool: Vec<&BoxSpec> = boxes.iter().collect();

        assert!(select_box(&units, &pool, 0.8).is_none());
    }

    #[test]
    fn selection_is_deterministic() {
        let boxes = vec![
            paper_box("b1", Dims::new(25, 25, 25)),
            paper_box("b2", Dims::new(20, 20, 20)),
        ];
        let pool: Vec<&BoxSpec> = boxes.iter().collect();
        let units = vec![
            unit("a", Dims::new(10, 10, 5), None),
            unit("b", Dims::new(10, 10, 5), None),
        ];

        let first = select_box(&units, &pool, 0.8).map(|b| b.id.clone());
        let second = select_box(&units, &pool, 0.8).map(|b| b.id.clone());
        assert_eq!(first, second);
    }
}
