//! Product catalog: lookup, search, featured selection.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

/// A product as shipped in the deploy-time catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: u64,
  pub name: String,
  pub description: String,
  pub category: String,
  /// Price in the smallest currency unit.
  pub price: u64,
  /// Subscription duration shown to the buyer (e.g. "30 days").
  pub duration: String,
  #[serde(default)]
  pub featured: bool,
}

/// The fixed product catalog, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
  products: Vec<Product>,
}

impl Catalog {
  pub fn new(products: Vec<Product>) -> Self {
    Self { products }
  }

  /// Load a catalog from its YAML form.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let products: Vec<Product> =
      serde_yaml::from_str(contents).map_err(|e| eyre!("Failed to parse catalog: {}", e))?;
    Ok(Self::new(products))
  }

  pub fn products(&self) -> &[Product] {
    &self.products
  }

  pub fn get(&self, id: u64) -> Option<&Product> {
    self.products.iter().find(|p| p.id == id)
  }

  /// Case-insensitive substring search over name, description, and
  /// category. A blank query returns the whole catalog.
  pub fn search(&self, query: &str) -> Vec<&Product> {
    if query.trim().is_empty() {
      return self.products.iter().collect();
    }

    let term = query.to_lowercase();
    self
      .products
      .iter()
      .filter(|p| {
        p.name.to_lowercase().contains(&term)
          || p.description.to_lowercase().contains(&term)
          || p.category.to_lowercase().contains(&term)
      })
      .collect()
  }

  /// Up to three featured products, in catalog order.
  pub fn featured(&self) -> Vec<&Product> {
    self.products.iter().filter(|p| p.featured).take(3).collect()
  }
}
