use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use fdp_engine::{
    helpers::WebhookVerifier,
    jobs::JobQueues,
    payment_objects::PaymentGateway,
    realtime::EventHub,
    OrderFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    auth::TokenValidator,
    config::ServerConfig,
    errors::ServerError,
    integrations::stripe::StripeClient,
    middleware::JwtMiddlewareFactory,
    routes::{
        health,
        DeleteOrderRoute,
        InitiatePaymentRoute,
        OrderByIdRoute,
        OrderPaymentsRoute,
        OrdersRoute,
        PlaceGuestOrderRoute,
        PlaceOrderRoute,
        StripeWebhookRoute,
        UpdateOrderRoute,
    },
    socket::socket,
    workers::start_queue_workers,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let (queues, consumers) = JobQueues::from_url(config.queue.url.as_deref(), config.queue.buffer_size)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    match consumers {
        Some(consumers) if config.queue.run_workers => {
            let _handles = start_queue_workers(&queues, consumers, config.queue.max_attempts);
        },
        Some(_) => info!("📦️ FDP_RUN_WORKERS is off. Jobs will be left for an external worker."),
        None => {},
    }
    let hub = EventHub::new();
    let srv = create_server_instance(config, db, queues, hub.clone())?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    if let Err(e) = hub.shutdown() {
        warn!("📡️ Could not shut down the event hub cleanly. {e}");
    }
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    queues: JobQueues,
    hub: EventHub,
) -> Result<Server, ServerError> {
    let gateway = payment_gateway(&config)?;
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), queues.clone(), Some(hub.clone()))
            .with_default_delivery_fee(config.default_delivery_fee);
        let verifier = WebhookVerifier::new(config.stripe.webhook_secret.clone(), config.stripe.webhook_tolerance);
        let mut payments_api = PaymentFlowApi::new(db.clone(), queues.clone(), Some(hub.clone()), verifier)
            .with_currency(config.stripe.currency.as_str());
        if let Some(gateway) = &gateway {
            payments_api = payments_api.with_gateway(Arc::clone(gateway));
        }
        let validator = TokenValidator::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("fdp::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(hub.clone()))
            .app_data(web::Data::new(validator.clone()))
            .configure(configure_extractors);
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(validator))
            .service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(OrdersRoute::<SqliteDatabase>::new())
            .service(OrderPaymentsRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderRoute::<SqliteDatabase>::new())
            .service(DeleteOrderRoute::<SqliteDatabase>::new())
            .service(InitiatePaymentRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(socket)
            .service(PlaceGuestOrderRoute::<SqliteDatabase>::new())
            .service(StripeWebhookRoute::<SqliteDatabase>::new())
            .service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Renders extractor failures in the usual JSON error envelope.
pub fn configure_extractors(cfg: &mut ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|e, _| ServerError::InvalidRequestBody(e.to_string()).into()),
    )
    .app_data(web::PathConfig::default().error_handler(|e, _| ServerError::InvalidRequestPath(e.to_string()).into()))
    .app_data(web::QueryConfig::default().error_handler(|e, _| ServerError::InvalidQuery(e.to_string()).into()));
}

fn payment_gateway(config: &ServerConfig) -> Result<Option<Arc<dyn PaymentGateway>>, ServerError> {
    if !config.stripe.has_gateway() {
        info!("💳 No Stripe secret key is configured. Card payments will be refused.");
        return Ok(None);
    }
    let client = StripeClient::new(&config.stripe).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("💳 Card payments will be processed by Stripe");
    Ok(Some(Arc::new(client)))
}
