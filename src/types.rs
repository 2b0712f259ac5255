//! Common types and traits for the recommendation engine.
//!
//! This module defines the shared vocabulary of the crate: integer box
//! dimensions, storage classes, box textures and the trait abstractions
//! used by the partitioning and selection algorithms.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maximum total item weight permitted in one packed group, in weight units.
pub const WEIGHT_CEILING: u64 = 20_000;

/// Fraction of a box's raw volume that is realistically usable for packing.
///
/// Applied by the feasibility oracle to approximate packing efficiency loss
/// versus raw geometric volume.
pub const PACKING_EFFICIENCY: f64 = 0.8;

/// Interior or footprint dimensions of a rectangular object.
///
/// All components are positive integer units, bounded by
/// [`Dims::MAX_DIMENSION`] so a volume always fits in `u64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Dims {
    pub width: u32,
    pub depth: u32,
    pub height: u32,
}

impl Dims {
    /// Upper bound for a single dimension component.
    ///
    /// Caps the product of the three components at 10^18, inside `u64`
    /// range. Summed volumes additionally use saturating addition.
    pub const MAX_DIMENSION: u32 = 1_000_000;

    /// Creates a new dimension triple.
    #[inline]
    pub const fn new(width: u32, depth: u32, height: u32) -> Self {
        Self {
            width,
            depth,
            height,
        }
    }

    /// Creates from tuple format.
    #[inline]
    pub const fn from_tuple(tuple: (u32, u32, u32)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    /// Converts to tuple format for DTO compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (u32, u32, u32) {
        (self.width, self.depth, self.height)
    }

    /// Calculates the volume (product of all components).
    #[inline]
    pub fn volume(&self) -> u64 {
        self.width as u64 * self.depth as u64 * self.height as u64
    }

    /// Returns the largest single dimension.
    #[inline]
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.depth).max(self.height)
    }

    /// Checks component-wise whether this triple fits within another.
    #[inline]
    pub fn fits_within(&self, other: &Self) -> bool {
        self.width <= other.width && self.depth <= other.depth && self.height <= other.height
    }

    /// Checks if all components are positive and at most [`Self::MAX_DIMENSION`].
    #[inline]
    pub fn is_valid_dimension(&self) -> bool {
        let in_range = |v: u32| v > 0 && v <= Self::MAX_DIMENSION;
        in_range(self.width) && in_range(self.depth) && in_range(self.height)
    }
}

impl From<(u32, u32, u32)> for Dims {
    #[inline]
    fn from(tuple: (u32, u32, u32)) -> Self {
        Self::from_tuple(tuple)
    }
}

impl From<Dims> for (u32, u32, u32) {
    #[inline]
    fn from(dims: Dims) -> Self {
        dims.as_tuple()
    }
}

/// Temperature storage class of a product.
///
/// Determines which box-texture pool and packed-group bucket a unit belongs
/// to: FROZEN units are packed separately from everything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageClass {
    Frozen,
    Refrigerated,
    Ambient,
}

impl StorageClass {
    /// Whether units of this class go into the frozen packing stream.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        matches!(self, StorageClass::Frozen)
    }
}

/// Box material category.
///
/// FOAM boxes are insulated and reserved for the frozen stream; PAPER boxes
/// carry everything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Texture {
    Foam,
    Paper,
}

impl Texture {
    /// The box texture matching a packing stream.
    #[inline]
    pub fn for_frozen(frozen: bool) -> Self {
        if frozen {
            Texture::Foam
        } else {
            Texture::Paper
        }
    }
}

/// Trait for objects with a weight.
pub trait Weighted {
    /// Returns the weight in weight units.
    fn weight(&self) -> u32;
}

/// Trait for objects with a rectangular footprint.
pub trait Dimensional {
    /// Returns the footprint dimensions.
    fn dimensions(&self) -> Dims;

    /// Calculates the footprint volume.
    fn volume(&self) -> u64 {
        self.dimensions().volume()
    }
}

/// Sums the weights of a slice of weighted objects.
pub fn total_weight<T: Weighted>(items: &[T]) -> u64 {
    items.iter().map(|item| item.weight() as u64).sum()
}
