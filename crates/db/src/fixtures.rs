use chrono::Utc;

use minimart_core::hash_password;

use crate::repositories::StoreError;
use crate::DbPool;

/// Deterministic demo dataset: two sellers with a small catalog each, plus a
/// buyer with an empty account. Loading is idempotent, so a server configured
/// to seed on startup can be restarted freely.
const SEED_USERS: &[SeedUser] = &[
    SeedUser {
        name: "Ada Merchant",
        email: "ada@minimart.test",
        password: "ada-demo-password",
    },
    SeedUser {
        name: "Grace Merchant",
        email: "grace@minimart.test",
        password: "grace-demo-password",
    },
    SeedUser { name: "Bob Buyer", email: "bob@minimart.test", password: "bob-demo-password" },
];

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        seller_email: "ada@minimart.test",
        title: "Walnut Desk Organizer",
        description: Some("Five compartments, oiled finish."),
        price: "34.00",
        is_published: true,
    },
    SeedProduct {
        seller_email: "ada@minimart.test",
        title: "Brass Pen Holder",
        description: None,
        price: "12.50",
        is_published: true,
    },
    SeedProduct {
        seller_email: "grace@minimart.test",
        title: "Linen Tote Bag",
        description: Some("Natural linen, reinforced seams."),
        price: "18.75",
        is_published: true,
    },
    SeedProduct {
        seller_email: "grace@minimart.test",
        title: "Ceramic Mug Prototype",
        description: Some("Unglazed test run."),
        price: "9.99",
        is_published: false,
    },
];

#[derive(Debug, Clone, Copy)]
struct SeedUser {
    name: &'static str,
    email: &'static str,
    password: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct SeedProduct {
    seller_email: &'static str,
    title: &'static str,
    description: Option<&'static str>,
    price: &'static str,
    is_published: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub products_created: usize,
}

/// Loads the demo dataset, skipping rows that already exist. Users are keyed
/// by email, products by (seller, title).
pub async fn seed_demo_data(pool: &DbPool) -> Result<SeedSummary, StoreError> {
    let mut summary = SeedSummary::default();
    let now = Utc::now().to_rfc3339();

    for user in SEED_USERS {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
            .bind(user.email)
            .fetch_one(pool)
            .await?;
        if exists == 1 {
            continue;
        }

        let password_hash = hash_password(user.password)
            .map_err(|error| StoreError::Invalid(format!("seed password hash: {error}")))?;
        sqlx::query(
            "INSERT INTO users (name, email, password_hash, is_active, created_at)
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(user.name)
        .bind(user.email)
        .bind(&password_hash)
        .bind(&now)
        .execute(pool)
        .await?;
        summary.users_created += 1;
    }

    for product in SEED_PRODUCTS {
        let seller_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind(product.seller_email)
            .fetch_one(pool)
            .await?;

        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE seller_id = ? AND title = ?)",
        )
        .bind(seller_id)
        .bind(product.title)
        .fetch_one(pool)
        .await?;
        if exists == 1 {
            continue;
        }

        sqlx::query(
            "INSERT INTO products (title, description, price, is_published, seller_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(product.title)
        .bind(product.description)
        .bind(product.price)
        .bind(product.is_published)
        .bind(seller_id)
        .bind(&now)
        .execute(pool)
        .await?;
        summary.products_created += 1;
    }

    Ok(summary)
}
