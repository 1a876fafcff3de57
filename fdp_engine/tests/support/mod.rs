#![allow(dead_code)]

use fdp_common::{Money, Secret};
use fdp_engine::{
    db_types::{LineItem, Role},
    helpers::{WebhookVerifier, DEFAULT_TOLERANCE_SECS},
    jobs::{JobConsumers, JobQueues},
    order_objects::{AuthenticatedUser, OrderPlacement, PricingInput, RestaurantInput},
    realtime::EventHub,
    OrderFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
};

pub const WEBHOOK_SECRET: &str = "whsec_integration_tests";

pub struct TestSystem {
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub payments: PaymentFlowApi<SqliteDatabase>,
    pub hub: EventHub,
    pub queues: JobQueues,
    pub consumers: JobConsumers,
}

pub async fn prepare_test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    SqliteDatabase::new_in_memory().await.expect("Error creating in-memory database")
}

pub async fn test_system() -> TestSystem {
    let db = prepare_test_db().await;
    let (queues, consumers) = JobQueues::memory(32);
    let hub = EventHub::new();
    let orders = OrderFlowApi::new(db.clone(), queues.clone(), Some(hub.clone()));
    let payments = PaymentFlowApi::new(db.clone(), queues.clone(), Some(hub.clone()), verifier());
    TestSystem { db, orders, payments, hub, queues, consumers }
}

pub fn verifier() -> WebhookVerifier {
    WebhookVerifier::new(Secret::new(WEBHOOK_SECRET.to_string()), DEFAULT_TOLERANCE_SECS)
}

pub fn customer(id: &str) -> AuthenticatedUser {
    AuthenticatedUser::new(id, Role::Customer).with_name(format!("Customer {id}"))
}

pub fn superadmin() -> AuthenticatedUser {
    AuthenticatedUser::new("root", Role::SuperAdmin)
}

pub fn placement(restaurant: &str, subtotal: i64) -> OrderPlacement {
    OrderPlacement {
        restaurants: Some(vec![RestaurantInput::Id(restaurant.to_string())]),
        items: Some(vec![LineItem {
            product: "margherita".into(),
            name: Some("Margherita".into()),
            quantity: 2,
            price: Money::from(subtotal / 2),
        }]),
        pricing: Some(PricingInput { subtotal: Some(Money::from(subtotal)), delivery_fee: None, total: None }),
        ..Default::default()
    }
}
