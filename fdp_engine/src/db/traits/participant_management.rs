use crate::db_types::{RestaurantSummary, UserSummary};

/// Users and restaurants are owned by other services. The order store keeps a summary of each so that order queries
/// can show who is involved without a round trip.
#[allow(async_fn_in_trait)]
pub trait ParticipantManagement: Clone {
    type Error: std::error::Error;

    async fn upsert_user(&self, user: &UserSummary) -> Result<(), Self::Error>;

    async fn upsert_restaurant(&self, restaurant: &RestaurantSummary) -> Result<(), Self::Error>;

    async fn fetch_user(&self, id: &str) -> Result<Option<UserSummary>, Self::Error>;

    async fn fetch_restaurant(&self, id: &str) -> Result<Option<RestaurantSummary>, Self::Error>;
}
