//! # FDP server
//! This module hosts the HTTP and websocket server for the food delivery platform. It is responsible for:
//! Accepting orders from customers, and guests, and running them through the order lifecycle.
//! Initiating payments and receiving payment confirmations from Stripe.
//! Pushing order and payment updates to connected clients in real time.
//! Feeding the background job queues that other services consume.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/socket`: The real-time websocket endpoint. Requires an access token.
//! * `/orders/guest`: Place an order without an access token.
//! * `/payments/webhook/stripe`: The webhook route for receiving payment events from Stripe.
//!
//! All routes under `/api` require an `Authorization: Bearer <token>` header:
//! * `POST /api/orders`, `GET /api/orders`: Place an order, or list the orders you can see.
//! * `GET /api/orders/{id}`, `PUT /api/orders/{id}`: Fetch or update a single order.
//! * `DELETE /api/orders/{id}`: Delete an order. Admins only.
//! * `POST /api/payments`, `GET /api/orders/{id}/payments`: Initiate a payment, or list an order's payments.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod socket;
pub mod workers;

#[cfg(test)]
mod endpoint_tests;
