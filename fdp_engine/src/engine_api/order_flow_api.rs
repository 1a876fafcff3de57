use std::fmt::Debug;

use chrono::Utc;
use fdp_common::Money;
use log::*;

use crate::{
    db::traits::{OrderQueryFilter, OrderStore, UpdateOrderResult},
    db_types::{
        NewOrder,
        Order,
        OrderDetails,
        OrderId,
        OrderStatus,
        Pricing,
        RestaurantEntry,
        RestaurantSummary,
        Role,
        GUEST_CUSTOMER_ID,
    },
    engine_api::{
        errors::OrderFlowError,
        order_objects::{
            AuthenticatedUser,
            OrderPlacement,
            OrderUpdate,
            PlacedOrder,
            PricingInput,
            SideEffects,
            UpdatedOrder,
        },
    },
    helpers::generate_order_number,
    jobs::{JobQueues, QueuedJob},
    lifecycle::{check_transition, force_transition, StatusChange},
    realtime::{EventHub, ServerEvent, SUPERADMIN_ROOM},
};

/// The delivery fee charged when the client does not supply one, in minor units.
pub const DEFAULT_DELIVERY_FEE: i64 = 4000;

/// `OrderFlowApi` runs the order lifecycle: it validates and stores orders, then hands the change off to the job
/// queues and the real-time hub.
///
/// The database write is the only step that can fail a request. Queueing and publishing happen afterwards, and their
/// failures are logged and reported in [`SideEffects`] but never undo the write.
pub struct OrderFlowApi<B> {
    db: B,
    queues: JobQueues,
    hub: Option<EventHub>,
    default_delivery_fee: Money,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> Clone for OrderFlowApi<B> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            queues: self.queues.clone(),
            hub: self.hub.clone(),
            default_delivery_fee: self.default_delivery_fee,
        }
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, queues: JobQueues, hub: Option<EventHub>) -> Self {
        Self { db, queues, hub, default_delivery_fee: Money::from(DEFAULT_DELIVERY_FEE) }
    }

    pub fn with_default_delivery_fee(mut self, fee: Money) -> Self {
        self.default_delivery_fee = fee;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderStore
{
    /// Validates and stores a new order, then queues an `ORDER_PLACED` job and announces the order.
    ///
    /// Orders placed without an authenticated user are recorded against the guest customer.
    pub async fn place_order(
        &self,
        placement: OrderPlacement,
        customer: Option<&AuthenticatedUser>,
    ) -> Result<PlacedOrder, OrderFlowError> {
        let customer_id = customer.map(|c| c.user_id.clone()).unwrap_or_else(|| GUEST_CUSTOMER_ID.to_string());
        let (new_order, restaurants) = self.validate_placement(placement, customer_id)?;
        self.remember_participants(customer, &restaurants).await;
        let order = self
            .db
            .insert_order(new_order)
            .await
            .map_err(|e| OrderFlowError::DatabaseError(e.to_string()))?;
        info!("🔄️📦️ Order {} ({}) placed by {}", order.order_number, order.id, order.customer_id);

        let mut side_effects = SideEffects::persisted();
        side_effects.queued = self.enqueue(QueuedJob::order_placed(order.id)).await;
        side_effects.notified = self.publish_all(&[
            (order.id.room(), ServerEvent::order_update(&order)),
            (SUPERADMIN_ROOM.to_string(), ServerEvent::new_order(&order)),
        ]);
        Ok(PlacedOrder { order, side_effects })
    }

    /// Applies a partial update to an order.
    ///
    /// Status changes must follow the status sequence unless a superadmin asks to override it. If the status actually
    /// changed, a `STATUS_CHANGED` job is queued and the change is announced. Updates that leave the status alone are
    /// saved quietly.
    pub async fn update_order(
        &self,
        id: OrderId,
        update: OrderUpdate,
        requester: &AuthenticatedUser,
    ) -> Result<UpdatedOrder, OrderFlowError> {
        let current = self.load_order(id).await?;
        if let Some(revision) = update.revision {
            if revision != current.revision {
                return Err(OrderFlowError::RevisionConflict { id, current: current.revision });
            }
        }
        let status_change = match update.status {
            None => StatusChange::Unchanged,
            Some(to) if update.override_transition => {
                if requester.role != Role::SuperAdmin {
                    warn!("🔄️📦️ {} ({}) tried to override the status of order {id}", requester.user_id, requester.role);
                    return Err(OrderFlowError::OverrideNotAllowed);
                }
                info!("🔄️📦️ {} is forcing order {id} from {} to {to}", requester.user_id, current.status);
                force_transition(current.status, to)
            },
            Some(to) => check_transition(current.status, to)?,
        };
        let expected_revision = current.revision;
        let merged = merge_update(current, update)?;
        let order = match self
            .db
            .update_order(&merged, expected_revision)
            .await
            .map_err(|e| OrderFlowError::DatabaseError(e.to_string()))?
        {
            UpdateOrderResult::Updated(order) => order,
            UpdateOrderResult::StaleRevision(current) => return Err(OrderFlowError::RevisionConflict { id, current }),
            UpdateOrderResult::NotFound => return Err(OrderFlowError::OrderNotFound(id)),
        };
        debug!("🔄️📦️ Order {id} updated by {} (revision {})", requester.user_id, order.revision);

        let mut side_effects = SideEffects::persisted();
        if let StatusChange::Changed { from, to } = status_change {
            info!("🔄️📦️ Order {id} status changed from {from} to {to}");
            side_effects.queued = self.enqueue(QueuedJob::status_changed(id, from, to)).await;
            side_effects.notified = self.publish_all(&[
                (id.room(), ServerEvent::order_update(&order)),
                (SUPERADMIN_ROOM.to_string(), ServerEvent::status_change(&order, from)),
            ]);
        }
        Ok(UpdatedOrder { order, side_effects, status_change })
    }

    /// Fetches an order with its participants expanded.
    pub async fn fetch_order(&self, id: OrderId) -> Result<OrderDetails, OrderFlowError> {
        self.db
            .fetch_order_details(id)
            .await
            .map_err(|e| OrderFlowError::DatabaseError(e.to_string()))?
            .ok_or(OrderFlowError::OrderNotFound(id))
    }

    pub async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<OrderDetails>, OrderFlowError> {
        self.db.search_orders(filter).await.map_err(|e| OrderFlowError::DatabaseError(e.to_string()))
    }

    /// Admins see every order. Everyone else sees the orders they are the customer, restaurant or delivery partner
    /// on.
    pub async fn orders_visible_to(
        &self,
        user: &AuthenticatedUser,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderDetails>, OrderFlowError> {
        let mut filter = OrderQueryFilter::default();
        if !user.is_admin() {
            filter = filter.with_participant(user.user_id.as_str());
        }
        if let Some(status) = status {
            filter = filter.with_status(status);
        }
        self.fetch_orders(filter).await
    }

    /// Removes an order. Its payments stay on record. Deleting does not queue jobs or publish events.
    pub async fn delete_order(&self, id: OrderId) -> Result<(), OrderFlowError> {
        let deleted = self.db.delete_order(id).await.map_err(|e| OrderFlowError::DatabaseError(e.to_string()))?;
        if deleted {
            info!("🔄️📦️ Order {id} deleted");
            Ok(())
        } else {
            Err(OrderFlowError::OrderNotFound(id))
        }
    }

    async fn load_order(&self, id: OrderId) -> Result<Order, OrderFlowError> {
        self.db
            .fetch_order(id)
            .await
            .map_err(|e| OrderFlowError::DatabaseError(e.to_string()))?
            .ok_or(OrderFlowError::OrderNotFound(id))
    }

    fn validate_placement(
        &self,
        placement: OrderPlacement,
        customer_id: String,
    ) -> Result<(NewOrder, Vec<RestaurantEntry>), OrderFlowError> {
        let restaurants = placement.restaurants.ok_or_else(|| OrderFlowError::validation("restaurants is required"))?;
        let items = placement.items.ok_or_else(|| OrderFlowError::validation("items is required"))?;
        let pricing = placement.pricing.ok_or_else(|| OrderFlowError::validation("pricing is required"))?;
        let restaurants = restaurants.into_iter().map(RestaurantEntry::from).collect::<Vec<_>>();
        let restaurant_id = restaurants
            .first()
            .map(|r| r.restaurant_id.clone())
            .ok_or_else(|| OrderFlowError::validation("restaurants must contain at least one restaurant"))?;
        let pricing = resolve_pricing(pricing, None, self.default_delivery_fee)?;
        let multi_restaurant_data = if restaurants.len() > 1 { Some(restaurants.clone()) } else { None };
        let order = NewOrder {
            order_number: generate_order_number(Utc::now()),
            customer_id,
            restaurant_id,
            items,
            pricing,
            payment_method: placement.payment_method,
            delivery_location: placement.delivery_location.or(placement.delivery_address),
            multi_restaurant_data,
            notes: placement.notes,
            created_at: Utc::now(),
        };
        Ok((order, restaurants))
    }

    /// Saves whatever participant details the request carried. Failures here never block the order.
    async fn remember_participants(&self, customer: Option<&AuthenticatedUser>, restaurants: &[RestaurantEntry]) {
        if let Some(summary) = customer.and_then(AuthenticatedUser::summary) {
            if let Err(e) = self.db.upsert_user(&summary).await {
                warn!("🔄️📦️ Could not save details for user {}: {e}", summary.id);
            }
        }
        for entry in restaurants {
            let Some(name) = entry.name.as_ref() else { continue };
            let summary =
                RestaurantSummary { id: entry.restaurant_id.clone(), name: name.clone(), address: None, phone: None };
            if let Err(e) = self.db.upsert_restaurant(&summary).await {
                warn!("🔄️📦️ Could not save details for restaurant {}: {e}", summary.id);
            }
        }
    }

    /// Returns true if a real queue accepted the job.
    async fn enqueue(&self, job: QueuedJob) -> bool {
        let kind = job.kind;
        let order_id = job.payload.order_id;
        if !self.queues.is_enabled(job.queue()) {
            if let Err(e) = self.queues.enqueue(job).await {
                warn!("🔄️📦️ Could not hand {kind} job for order {order_id} to the disabled queue: {e}");
            }
            return false;
        }
        match self.queues.enqueue(job).await {
            Ok(_) => true,
            Err(e) => {
                warn!("🔄️📦️ Could not queue {kind} job for order {order_id}: {e}");
                false
            },
        }
    }

    /// Returns true if there is a hub and every publish went through.
    fn publish_all(&self, events: &[(String, ServerEvent)]) -> bool {
        let Some(hub) = self.hub.as_ref() else {
            trace!("🔄️📡️ No event hub is configured. Skipping {} event(s)", events.len());
            return false;
        };
        let mut all_sent = true;
        for (room, event) in events {
            if let Err(e) = hub.publish(room, event.clone()) {
                warn!("🔄️📡️ Could not publish {} to {room}: {e}", event.name());
                all_sent = false;
            }
        }
        all_sent
    }
}

/// Fills in the delivery fee and recomputes the total. `existing` supplies values the input leaves out.
fn resolve_pricing(
    input: PricingInput,
    existing: Option<Pricing>,
    default_delivery_fee: Money,
) -> Result<Pricing, OrderFlowError> {
    let subtotal = input
        .subtotal
        .or(existing.map(|p| p.subtotal))
        .ok_or_else(|| OrderFlowError::validation("pricing.subtotal is required"))?;
    let delivery_fee = input.delivery_fee.or(existing.map(|p| p.delivery_fee)).unwrap_or(default_delivery_fee);
    if subtotal.is_negative() {
        return Err(OrderFlowError::validation("pricing.subtotal must not be negative"));
    }
    if delivery_fee.is_negative() {
        return Err(OrderFlowError::validation("pricing.deliveryFee must not be negative"));
    }
    Pricing::new(subtotal, delivery_fee).ok_or_else(|| OrderFlowError::validation("pricing total is out of range"))
}

fn merge_update(mut order: Order, update: OrderUpdate) -> Result<Order, OrderFlowError> {
    if let Some(status) = update.status {
        order.status = status;
    }
    if let Some(notes) = update.notes {
        order.notes = Some(notes);
    }
    if let Some(delivery_person_id) = update.delivery_person_id {
        order.delivery_person_id = Some(delivery_person_id);
    }
    if let Some(location) = update.delivery_location {
        order.delivery_location = Some(location);
    }
    if let Some(method) = update.payment_method {
        order.payment_method = Some(method);
    }
    if let Some(payment_status) = update.payment_status {
        order.payment_status = payment_status;
    }
    if let Some(items) = update.items {
        order.items = items;
    }
    if let Some(pricing) = update.pricing {
        order.pricing = resolve_pricing(pricing, Some(order.pricing), order.pricing.delivery_fee)?;
    }
    Ok(order)
}
