//! Shopping cart, mirrored to the durable state store on every mutation.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::Product;
use crate::store::StateStore;

const CART_KEY: &str = "storefront_cart";

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
  pub product_id: u64,
  pub name: String,
  pub price: u64,
  pub quantity: u32,
  /// When the product was first added.
  pub added_at: DateTime<Utc>,
}

/// In-memory cart backed by the state store.
///
/// The in-memory list is authoritative during a session; every mutation
/// writes the whole list back so a restart picks up where the buyer
/// left off.
pub struct Cart<S: StateStore> {
  items: Vec<CartItem>,
  state: Arc<S>,
}

impl<S: StateStore> Cart<S> {
  /// Load the cart from the state store.
  ///
  /// A missing or unreadable stored cart starts empty rather than
  /// failing the session.
  pub fn load(state: Arc<S>) -> Self {
    let items = match state.get_value::<Vec<CartItem>>(CART_KEY) {
      Ok(Some(items)) => items,
      Ok(None) => Vec::new(),
      Err(e) => {
        tracing::warn!("stored cart unreadable, starting empty: {}", e);
        Vec::new()
      }
    };

    Self { items, state }
  }

  pub fn items(&self) -> &[CartItem] {
    &self.items
  }

  /// Total number of units across all lines.
  pub fn count(&self) -> u32 {
    self.items.iter().map(|item| item.quantity).sum()
  }

  /// Total price across all lines.
  pub fn total(&self) -> u64 {
    self
      .items
      .iter()
      .map(|item| item.price * u64::from(item.quantity))
      .sum()
  }

  /// Add one unit of a product, creating the line on first add.
  pub fn add(&mut self, product: &Product) -> Result<()> {
    match self.items.iter_mut().find(|i| i.product_id == product.id) {
      Some(item) => item.quantity += 1,
      None => self.items.push(CartItem {
        product_id: product.id,
        name: product.name.clone(),
        price: product.price,
        quantity: 1,
        added_at: Utc::now(),
      }),
    }

    self.persist()
  }

  /// Drop a product's line entirely, whatever its quantity.
  pub fn remove(&mut self, product_id: u64) -> Result<()> {
    self.items.retain(|item| item.product_id != product_id);
    self.persist()
  }

  pub fn clear(&mut self) -> Result<()> {
    self.items.clear();
    self.persist()
  }

  fn persist(&self) -> Result<()> {
    self.state.set_value(CART_KEY, &self.items)
  }
}
