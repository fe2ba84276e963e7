use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId};
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartItemId(pub i64);

/// Per-user collection of pending line items. Created lazily on first cart
/// access and never otherwise; the `carts.user_id` unique index guarantees at
/// most one row per user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A (cart, product) pairing. While the row exists its quantity is >= 1; a
/// request that would drop it to zero or below deletes the row instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

/// A cart line joined with its product record, the shape the cart read path
/// returns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItemDetail {
    pub item: CartItem,
    pub product: Product,
}

/// Outcome of a quantity update. Removal is a distinct success, not an error:
/// setting quantity <= 0 is the deliberate deletion path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemUpdate {
    Updated(CartItem),
    Removed,
}

impl ItemUpdate {
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed)
    }
}
