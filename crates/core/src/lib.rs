pub mod auth;
pub mod config;
pub mod domain;

pub use auth::{hash_password, verify_password, AuthError, TokenClaims, TokenSigner};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::cart::{Cart, CartId, CartItem, CartItemDetail, CartItemId, ItemUpdate};
pub use domain::product::{NewProduct, Product, ProductId, ProductPatch};
pub use domain::user::{NewUser, User, UserId};

pub use chrono;
pub use rust_decimal;
