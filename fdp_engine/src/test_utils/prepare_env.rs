use log::*;

use crate::{
    db_types::{NewOrder, Order, Pricing},
    helpers::generate_order_number,
    OrderManagement,
    SqliteDatabase,
};

/// Loads `.env.test`, starts logging and returns a freshly migrated in-memory database.
pub async fn prepare_test_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    SqliteDatabase::new_in_memory().await.expect("Error creating in-memory database")
}

pub fn sample_new_order(customer_id: &str, restaurant_id: &str, subtotal: i64) -> NewOrder {
    NewOrder {
        order_number: generate_order_number(chrono::Utc::now()),
        customer_id: customer_id.to_string(),
        restaurant_id: restaurant_id.to_string(),
        items: vec![],
        pricing: Pricing::new(subtotal.into(), 4000.into()).expect("Sample pricing overflowed"),
        payment_method: None,
        delivery_location: None,
        multi_restaurant_data: None,
        notes: None,
        created_at: chrono::Utc::now(),
    }
}

pub async fn insert_sample_order(db: &SqliteDatabase, customer_id: &str, restaurant_id: &str) -> Order {
    db.insert_order(sample_new_order(customer_id, restaurant_id, 1500)).await.expect("Error inserting order")
}
