//! Read-only product catalog.
//!
//! Products are immutable apart from `stock`, which only checkout decrements.
//! The bundled catalog is compiled into the binary; a JSON file with the same
//! shape can replace it through `cart.catalog_path`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::{CartError, ProductRef};

const BUNDLED_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub rating: u8,
    pub comment: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub brand: String,
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub rating: f64,
    pub stock: u32,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Product {
    /// Availability is derived from stock, never stored.
    pub fn is_available(&self) -> bool {
        self.stock > 0
    }

    pub fn to_ref(&self) -> ProductRef {
        ProductRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// Text the recommendation search matches against.
    pub(crate) fn search_text(&self) -> String {
        format!("{} {} {}", self.name, self.description, self.category).to_lowercase()
    }
}

/// Find a product by exact id, else by case-insensitive exact name.
///
/// This is the only place that knows a caller may pass either form.
pub fn resolve_index(products: &[Product], id_or_name: &str) -> Option<usize> {
    let key = id_or_name.trim();
    products.iter().position(|p| p.id == key).or_else(|| {
        let lowered = key.to_lowercase();
        products
            .iter()
            .position(|p| p.name.to_lowercase() == lowered)
    })
}

pub struct Catalog {
    products: Mutex<Vec<Product>>,
}

impl Catalog {
    /// Build a catalog from a product list, rejecting duplicate ids and
    /// negative prices.
    pub fn new(products: Vec<Product>) -> Result<Self, CartError> {
        let mut seen = HashSet::new();
        for product in &products {
            if !seen.insert(product.id.as_str()) {
                return Err(CartError::Catalog(format!(
                    "duplicate product id {}",
                    product.id
                )));
            }
            if product.price.is_nan() || product.price < 0.0 {
                return Err(CartError::Catalog(format!(
                    "product {} has invalid price {}",
                    product.id, product.price
                )));
            }
        }
        Ok(Self {
            products: Mutex::new(products),
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, CartError> {
        let products: Vec<Product> =
            serde_json::from_str(raw).map_err(|e| CartError::Catalog(e.to_string()))?;
        Self::new(products)
    }

    /// The catalog shipped with the crate.
    pub fn bundled() -> Result<Self, CartError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self, CartError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CartError::Catalog(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), "Catalog loaded");
        Ok(catalog)
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Vec<Product>>, CartError> {
        self.products
            .lock()
            .map_err(|e| CartError::Storage(format!("Catalog mutex poisoned: {}", e)))
    }

    /// Resolve an id or exact product name to a snapshot of the product.
    pub fn resolve(&self, id_or_name: &str) -> Result<Option<Product>, CartError> {
        let products = self.lock()?;
        Ok(resolve_index(&products, id_or_name).map(|i| products[i].clone()))
    }

    pub fn summaries(&self) -> Result<Vec<ProductRef>, CartError> {
        Ok(self.lock()?.iter().map(Product::to_ref).collect())
    }

    pub fn snapshot(&self) -> Result<Vec<Product>, CartError> {
        Ok(self.lock()?.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_loads() {
        let catalog = Catalog::bundled().unwrap();
        assert_eq!(catalog.len(), 39);
        let headphones = catalog.resolve("e001").unwrap().unwrap();
        assert_eq!(headphones.name, "Wireless Bluetooth Headphones");
        assert_eq!(headphones.price, 79.99);
        assert_eq!(headphones.brand, "SoundWave");
        assert!(headphones.is_available());
    }

    #[test]
    fn test_resolve_by_name_is_case_insensitive() {
        let catalog = Catalog::bundled().unwrap();
        let by_name = catalog
            .resolve("wireless bluetooth HEADPHONES")
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, "e001");
        assert!(catalog.resolve("Headphones").unwrap().is_none());
        assert!(catalog.resolve("E001").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let raw = r#"[
            {"id":"a","name":"A","price":1.0,"category":"C","brand":"B","description":"d","rating":4.0,"stock":1},
            {"id":"a","name":"B","price":2.0,"category":"C","brand":"B","description":"d","rating":4.0,"stock":1}
        ]"#;
        assert!(matches!(Catalog::from_json(raw), Err(CartError::Catalog(_))));
    }

    #[test]
    fn test_negative_price_rejected() {
        let raw = r#"[
            {"id":"a","name":"A","price":-1.0,"category":"C","brand":"B","description":"d","rating":4.0,"stock":1}
        ]"#;
        assert!(matches!(Catalog::from_json(raw), Err(CartError::Catalog(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"id":"x1","name":"Thing","price":5.5,"category":"Misc","brand":"B","description":"d","rating":3.5,"stock":0}]"#,
        )
        .unwrap();
        let catalog = Catalog::load(&path).unwrap();
        let product = catalog.resolve("x1").unwrap().unwrap();
        assert!(!product.is_available());
        assert!(product.reviews.is_empty());
        assert!(Catalog::load(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_summaries_cover_every_product() {
        let catalog = Catalog::bundled().unwrap();
        let refs = catalog.summaries().unwrap();
        assert_eq!(refs.len(), catalog.len());
        assert!(refs.iter().any(|r| r.id == "s020"));
    }
}
