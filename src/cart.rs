//! Shopping cart kept on the client.
//!
//! Quantities are clamped to the stock figure of the product snapshot held
//! in each entry; the backend has the final say when the order is placed.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{OrderLine, Product, ProductId};
use crate::storage::LocalStorage;

pub const CART_KEY: &str = "cart";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CartItem {
    pub id: ProductId,
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn subtotal(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug)]
pub struct Cart {
    items: BTreeMap<ProductId, CartItem>,
    storage: Arc<dyn LocalStorage>,
}

impl Cart {
    /// Restores the cart saved in `storage`. Anything unreadable is logged
    /// and replaced by an empty cart.
    pub fn load(storage: Arc<dyn LocalStorage>) -> Self {
        let saved = match storage.get_item(CART_KEY) {
            Ok(saved) => saved,
            Err(e) => {
                log::error!("failed to read saved cart: {}", e);
                None
            }
        };

        let mut items = BTreeMap::new();
        if let Some(raw) = saved {
            match serde_json::from_str::<Vec<CartItem>>(&raw) {
                Ok(saved_items) => {
                    for mut item in saved_items {
                        item.quantity = item.quantity.min(item.product.stock);
                        if item.quantity > 0 {
                            items.insert(item.id, item);
                        }
                    }
                }
                Err(e) => log::warn!("discarding unreadable saved cart: {}", e),
            }
        }

        Cart { items, storage }
    }

    /// Adds `quantity` of `product`, never going past its stock. The stored
    /// snapshot is refreshed so later clamping uses the newest stock figure.
    pub fn add(&mut self, product: &Product, quantity: u32) {
        let current = self.quantity(product.id);
        let wanted = current.saturating_add(quantity).min(product.stock);

        if wanted == 0 {
            self.items.remove(&product.id);
        } else {
            self.items.insert(
                product.id,
                CartItem {
                    id: product.id,
                    product: product.clone(),
                    quantity: wanted,
                },
            );
        }
        self.persist();
    }

    pub fn add_one(&mut self, product: &Product) {
        self.add(product, 1);
    }

    /// Sets the quantity of an entry already in the cart. Zero or less
    /// removes it.
    pub fn update_quantity(&mut self, id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove(id);
            return;
        }
        let Some(item) = self.items.get_mut(&id) else {
            return;
        };
        let capped = u32::try_from(quantity).unwrap_or(u32::MAX);
        item.quantity = capped.min(item.product.stock);
        if item.quantity == 0 {
            self.items.remove(&id);
        }
        self.persist();
    }

    pub fn remove(&mut self, id: ProductId) {
        if self.items.remove(&id).is_some() {
            self.persist();
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    pub fn quantity(&self, id: ProductId) -> u32 {
        self.items.get(&id).map(|item| item.quantity).unwrap_or(0)
    }

    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_items(&self) -> u64 {
        self.items.values().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn total_price(&self) -> Decimal {
        self.items.values().map(CartItem::subtotal).sum()
    }

    /// Lines in the shape `POST /orders/create` expects.
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.items
            .values()
            .map(|item| OrderLine {
                product_id: item.id.to_string(),
                quantity: item.quantity,
                price: item.product.price,
            })
            .collect()
    }

    fn persist(&self) {
        let snapshot: Vec<&CartItem> = self.items.values().collect();
        let result = serde_json::to_string(&snapshot)
            .map_err(|e| e.to_string())
            .and_then(|raw| self.storage.set_item(CART_KEY, &raw).map_err(|e| e.to_string()));
        if let Err(e) = result {
            log::error!("failed to save cart: {}", e);
        }
    }
}
