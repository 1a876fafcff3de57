use log::*;
use sqlx::SqliteConnection;

use super::SqliteDatabaseError;
use crate::db_types::{RestaurantSummary, UserSummary};

pub async fn upsert_user(user: &UserSummary, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, phone, role) VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE SET name = excluded.name, email = excluded.email, phone = excluded.phone,
            role = excluded.role
        "#,
    )
    .bind(user.id.as_str())
    .bind(user.name.as_str())
    .bind(user.email.as_deref())
    .bind(user.phone.as_deref())
    .bind(user.role)
    .execute(conn)
    .await?;
    trace!("🗃️ Saved user {} ({})", user.id, user.role);
    Ok(())
}

pub async fn upsert_restaurant(
    restaurant: &RestaurantSummary,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO restaurants (id, name, address, phone) VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE SET name = excluded.name, address = excluded.address, phone = excluded.phone
        "#,
    )
    .bind(restaurant.id.as_str())
    .bind(restaurant.name.as_str())
    .bind(restaurant.address.as_deref())
    .bind(restaurant.phone.as_deref())
    .execute(conn)
    .await?;
    trace!("🗃️ Saved restaurant {}", restaurant.id);
    Ok(())
}

pub async fn fetch_user(id: &str, conn: &mut SqliteConnection) -> Result<Option<UserSummary>, SqliteDatabaseError> {
    let user = sqlx::query_as("SELECT id, name, email, phone, role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn fetch_restaurant(
    id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<RestaurantSummary>, SqliteDatabaseError> {
    let restaurant = sqlx::query_as("SELECT id, name, address, phone FROM restaurants WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(restaurant)
}
