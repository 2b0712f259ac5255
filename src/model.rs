//! Catalog entities and request-scoped data for the recommendation engine.
//!
//! All entities above [`PackedGroup`] are read-only snapshots fetched once per
//! recommendation request; packed groups are created and consumed entirely
//! within one request and never persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Dimensional, Dims, StorageClass, Texture, Weighted};

/// Validation error for catalog and order data.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid count: {0}")]
    InvalidCount(String),
    #[error("Invalid error rate: {0}")]
    InvalidErrorRate(String),
}

fn validate_dims(dims: Dims, name: &str) -> Result<(), ValidationError> {
    if !dims.is_valid_dimension() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must have width, depth and height within 1..={}, got: {:?}",
            name,
            Dims::MAX_DIMENSION,
            dims.as_tuple()
        )));
    }
    Ok(())
}

fn validate_weight(value: u32) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::InvalidWeight(
            "Weight must be positive".to_string(),
        ));
    }
    Ok(())
}

/// A catalog product.
///
/// Carries the footprint at its canonical orientation and, when the product
/// can be compacted, a compressed footprint used by the feasibility oracle's
/// capacity accounting.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub weight: u32,
    pub dims: Dims,
    /// Footprint once compressed or reoriented; `None` for rigid products.
    pub compressed_dims: Option<Dims>,
    pub storage_class: StorageClass,
    pub category_type: String,
    pub packaging_material_id: String,
    pub packaging_material_quantity: u32,
}

impl Product {
    /// Creates a new product with validation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        weight: u32,
        dims: Dims,
        compressed_dims: Option<Dims>,
        storage_class: StorageClass,
        category_type: impl Into<String>,
        packaging_material_id: impl Into<String>,
        packaging_material_quantity: u32,
    ) -> Result<Self, ValidationError> {
        validate_dims(dims, "Product footprint")?;
        validate_weight(weight)?;
        if let Some(compressed) = compressed_dims {
            validate_dims(compressed, "Compressed footprint")?;
            if !compressed.fits_within(&dims) {
                return Err(ValidationError::InvalidDimension(format!(
                    "Compressed footprint {:?} must not exceed footprint {:?}",
                    compressed.as_tuple(),
                    dims.as_tuple()
                )));
            }
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            weight,
            dims,
            compressed_dims,
            storage_class,
            category_type: category_type.into(),
            packaging_material_id: packaging_material_id.into(),
            packaging_material_quantity,
        })
    }

    /// Bounding-box volume at the canonical, non-compressed orientation.
    pub fn max_volume(&self) -> u64 {
        self.dims.volume()
    }

    /// Smallest volume the product occupies once compressed or reoriented.
    pub fn min_volume(&self) -> u64 {
        self.compressed_dims
            .map(|d| d.volume())
            .unwrap_or_else(|| self.dims.volume())
    }
}

impl Weighted for Product {
    fn weight(&self) -> u32 {
        self.weight
    }
}

impl Dimensional for Product {
    fn dimensions(&self) -> Dims {
        self.dims
    }
}

/// A shipping box from the catalog.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BoxSpec {
    pub id: String,
    pub name: String,
    pub dims: Dims,
    pub texture: Texture,
}

impl BoxSpec {
    /// Creates a new box with validation.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        dims: Dims,
        texture: Texture,
    ) -> Result<Self, ValidationError> {
        validate_dims(dims, "Box interior")?;
        Ok(Self {
            id: id.into(),
            name: name.into(),
            dims,
            texture,
        })
    }

    /// Interior volume of the box.
    pub fn volume(&self) -> u64 {
        self.dims.volume()
    }
}

impl Dimensional for BoxSpec {
    fn dimensions(&self) -> Dims {
        self.dims
    }
}

/// A product category carrying a historical error rate.
///
/// The error rate is attached to expanded units as passenger data; it is not
/// consulted by partitioning or box selection.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub type_key: String,
    pub error_rate: f64,
}

impl Category {
    /// Creates a new category with validation.
    pub fn new(type_key: impl Into<String>, error_rate: f64) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&error_rate) || error_rate.is_nan() {
            return Err(ValidationError::InvalidErrorRate(format!(
                "Error rate must be within [0, 1], got: {}",
                error_rate
            )));
        }
        Ok(Self {
            type_key: type_key.into(),
            error_rate,
        })
    }
}

/// A packaging material referenced by products.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PackagingMaterial {
    pub id: String,
    pub name: String,
}

/// One line of an order: a product and how many units of it were bought.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub product_id: String,
    pub count: u32,
}

impl OrderLine {
    /// Creates a new order line with validation.
    pub fn new(product_id: impl Into<String>, count: u32) -> Result<Self, ValidationError> {
        if count == 0 {
            return Err(ValidationError::InvalidCount(
                "Order line count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            product_id: product_id.into(),
            count,
        })
    }
}

/// One physically packed unit of a product.
///
/// An order line with count *n* expands to *n* units. Each unit carries the
/// resolved packaging-material name and the category error rate so that the
/// engine needs no further catalog lookups after expansion.
#[derive(Clone, Debug)]
pub struct ProductUnit {
    pub product: Product,
    pub packaging_material_name: String,
    pub category_error_rate: Option<f64>,
}

impl ProductUnit {
    /// Storage class of the underlying product.
    pub fn storage_class(&self) -> StorageClass {
        self.product.storage_class
    }

    /// Maximal-orientation volume of the underlying product.
    pub fn max_volume(&self) -> u64 {
        self.product.max_volume()
    }

    /// Minimal/compressed-orientation volume of the underlying product.
    pub fn min_volume(&self) -> u64 {
        self.product.min_volume()
    }
}

impl Weighted for ProductUnit {
    fn weight(&self) -> u32 {
        self.product.weight
    }
}

impl Dimensional for ProductUnit {
    fn dimensions(&self) -> Dims {
        self.product.dims
    }
}

/// A box paired with the product units assigned to it.
#[derive(Clone, Debug)]
pub struct PackedGroup {
    pub box_spec: BoxSpec,
    pub units: Vec<ProductUnit>,
}

impl PackedGroup {
    /// Total weight of all units in the group.
    pub fn total_weight(&self) -> u64 {
        crate::types::total_weight(&self.units)
    }

    /// Sum of the units' maximal-orientation volumes, saturating at `u64::MAX`.
    pub fn total_max_volume(&self) -> u64 {
        self.units
            .iter()
            .fold(0, |acc, u| acc.saturating_add(u.max_volume()))
    }
}

/// Read-only catalog snapshot shared by all requests.
///
/// The lookup maps mirror external stores that return unordered collections
/// keyed by identifier; every ordering the engine needs is imposed with
/// explicit sorts, never taken from map iteration order.
#[derive(Clone, Debug, Default)]
pub struct CatalogSnapshot {
    pub boxes: Vec<BoxSpec>,
    pub products: HashMap<String, Product>,
    pub categories: HashMap<String, Category>,
    pub packaging_materials: HashMap<String, PackagingMaterial>,
}

impl CatalogSnapshot {
    /// Builds a snapshot from catalog collections.
    pub fn new(
        boxes: Vec<BoxSpec>,
        products: Vec<Product>,
        categories: Vec<Category>,
        packaging_materials: Vec<PackagingMaterial>,
    ) -> Self {
        Self {
            boxes,
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
            categories: categories
                .into_iter()
                .map(|c| (c.type_key.clone(), c))
                .collect(),
            packaging_materials: packaging_materials
                .into_iter()
                .map(|m| (m.id.clone(), m))
                .collect(),
        }
    }

    /// Boxes of the given texture, sorted descending by volume.
    ///
    /// Equal volumes are ordered by ascending id so repeated runs always scan
    /// candidates in the same order.
    pub fn texture_pool(&self, texture: Texture) -> Vec<&BoxSpec> {
        let mut pool: Vec<&BoxSpec> = self
            .boxes
            .iter()
            .filter(|b| b.texture == texture)
            .collect();
        pool.sort_by(|a, b| {
            b.volume()
                .cmp(&a.volume())
                .then_with(|| a.id.cmp(&b.id))
        });
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(weight: u32, dims: (u32, u32, u32)) -> Result<Product, ValidationError> {
        Product::new(
            "p1",
            "Apples",
            weight,
            Dims::from_tuple(dims),
            None,
            StorageClass::Ambient,
            "produce",
            "m1",
            1,
        )
    }

    #[test]
    fn product_rejects_zero_dimension() {
        assert!(product(100, (0, 10, 10)).is_err());
        assert!(product(100, (10, 10, 10)).is_ok());
    }

    #[test]
    fn product_rejects_zero_weight() {
        assert!(product(0, (10, 10, 10)).is_err());
    }

    #[test]
    fn product_rejects_oversized_dimension() {
        assert!(product(100, (Dims::MAX_DIMENSION + 1, 10, 10)).is_err());
        assert!(product(100, (Dims::MAX_DIMENSION, 10, 10)).is_ok());
    }

    #[test]
    fn compressed_footprint_must_fit_inside_footprint() {
        let result = Product::new(
            "p1",
            "Pillow",
            500,
            Dims::new(10, 10, 10),
            Some(Dims::new(11, 10, 10)),
            StorageClass::Ambient,
            "home",
            "m1",
            1,
        );
        assert!(result.is_err());

        let ok = Product::new(
            "p1",
            "Pillow",
            500,
            Dims::new(10, 10, 10),
            Some(Dims::new(10, 10, 4)),
            StorageClass::Ambient,
            "home",
            "m1",
            1,
        )
        .unwrap();
        assert_eq!(ok.max_volume(), 1_000);
        assert_eq!(ok.min_volume(), 400);
    }

    #[test]
    fn min_volume_falls_back_to_footprint_volume() {
        let rigid = product(100, (10, 10, 10)).unwrap();
        assert_eq!(rigid.min_volume(), rigid.max_volume());
    }

    #[test]
    fn category_error_rate_must_be_a_fraction() {
        assert!(Category::new("produce", 0.0).is_ok());
        assert!(Category::new("produce", 1.0).is_ok());
        assert!(Category::new("produce", 1.5).is_err());
        assert!(Category::new("produce", -0.1).is_err());
        assert!(Category::new("produce", f64::NAN).is_err());
    }

    #[test]
    fn order_line_count_must_be_positive() {
        assert!(OrderLine::new("p1", 0).is_err());
        assert!(OrderLine::new("p1", 1).is_ok());
    }

    #[test]
    fn texture_pool_sorts_descending_by_volume() {
        let boxes = vec![
            BoxSpec::new("b1", "Small", Dims::new(10, 10, 10), Texture::Paper).unwrap(),
            BoxSpec::new("b2", "Large", Dims::new(30, 30, 30), Texture::Paper).unwrap(),
            BoxSpec::new("b3", "Foam", Dims::new(50, 50, 50), Texture::Foam).unwrap(),
            BoxSpec::new("b4", "Medium", Dims::new(20, 20, 20), Texture::Paper).unwrap(),
        ];
        let snapshot = CatalogSnapshot::new(boxes, vec![], vec![], vec![]);

        let paper: Vec<&str> = snapshot
            .texture_pool(Texture::Paper)
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(paper, vec!["b2", "b4", "b1"]);

        let foam: Vec<&str> = snapshot
            .texture_pool(Texture::Foam)
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(foam, vec!["b3"]);
    }

    #[test]
    fn texture_pool_breaks_volume_ties_by_id() {
        let boxes = vec![
            BoxSpec::new("z9", "Twin A", Dims::new(10, 10, 10), Texture::Paper).unwrap(),
            BoxSpec::new("a1", "Twin B", Dims::new(10, 10, 10), Texture::Paper).unwrap(),
        ];
        let snapshot = CatalogSnapshot::new(boxes, vec![], vec![], vec![]);

        let ids: Vec<&str> = snapshot
            .texture_pool(Texture::Paper)
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a1", "z9"]);
    }
}
