//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use fdp_engine::{
    db_types::{OrderId, Role},
    order_objects::{OrderPlacement, OrderUpdate},
    payment_objects::PaymentRequest,
    OrderFlowApi,
    OrderStore,
    PaymentFlowApi,
};
use log::*;

use crate::{
    auth::JwtClaims,
    data_objects::{
        DataResponse,
        JsonResponse,
        OrderCreatedResponse,
        OrderListParams,
        OrderUpdatedResponse,
        WebhookReceipt,
    },
    errors::ServerError,
};

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),*]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(place_guest_order => Post "/orders/guest" impl OrderStore);
/// Places an order without an access token. The order is recorded against the guest customer.
pub async fn place_guest_order<B: OrderStore>(
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<OrderPlacement>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received guest order");
    let placed = api.place_order(body.into_inner(), None).await?;
    Ok(HttpResponse::Created().json(OrderCreatedResponse::from(placed)))
}

route!(place_order => Post "/orders" impl OrderStore);
pub async fn place_order<B: OrderStore>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<OrderPlacement>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received order from {}", claims.sub);
    let user = claims.user();
    let placed = api.place_order(body.into_inner(), Some(&user)).await?;
    Ok(HttpResponse::Created().json(OrderCreatedResponse::from(placed)))
}

route!(orders => Get "/orders" impl OrderStore);
/// Admins see every order. Everyone else sees the orders they take part in.
pub async fn orders<B: OrderStore>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
    params: web::Query<OrderListParams>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Fetching orders for {} ({})", claims.sub, claims.role);
    let orders = api.orders_visible_to(&claims.user(), params.status).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(orders)))
}

route!(order_by_id => Get "/orders/{id}" impl OrderStore);
pub async fn order_by_id<B: OrderStore>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    trace!("💻️ {} requested order {id}", claims.sub);
    let order = api.fetch_order(id).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(order)))
}

route!(update_order => Put "/orders/{id}" impl OrderStore);
pub async fn update_order<B: OrderStore>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<OrderUpdate>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    debug!("💻️ {} ({}) is updating order {id}", claims.sub, claims.role);
    let updated = api.update_order(id, body.into_inner(), &claims.user()).await?;
    Ok(HttpResponse::Ok().json(OrderUpdatedResponse::from(updated)))
}

route!(delete_order => Delete "/orders/{id}" impl OrderStore where requires [Role::Admin]);
pub async fn delete_order<B: OrderStore>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    info!("💻️ {} is deleting order {id}", claims.sub);
    api.delete_order(id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Order deleted successfully")))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(initiate_payment => Post "/payments" impl OrderStore);
pub async fn initiate_payment<B: OrderStore>(
    claims: JwtClaims,
    api: web::Data<PaymentFlowApi<B>>,
    body: web::Json<PaymentRequest>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️💳 {} is paying for order {} by {}", claims.sub, request.order_id, request.method);
    let initiated = api.initiate_payment(request, &claims.user()).await?;
    Ok(HttpResponse::Created().json(DataResponse::new(initiated)))
}

route!(order_payments => Get "/orders/{id}/payments" impl OrderStore);
pub async fn order_payments<B: OrderStore>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    trace!("💻️ {} requested the payments for order {id}", claims.sub);
    let payments = api.payments_for_order(id).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(payments)))
}

route!(stripe_webhook => Post "/payments/webhook/stripe" impl OrderStore);
/// Stripe posts payment events here. The signature is computed over the raw body, so the body must not be parsed
/// before it has been checked.
pub async fn stripe_webhook<B: OrderStore>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️💳 Received Stripe webhook ({} bytes)", body.len());
    let signature = req.headers().get(STRIPE_SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let outcome = api.handle_webhook(signature, &body).await.map_err(|e| {
        warn!("💻️💳 Stripe webhook was rejected. {e}");
        ServerError::from(e)
    })?;
    debug!("💻️💳 Stripe webhook handled: {outcome:?}");
    Ok(HttpResponse::Ok().json(WebhookReceipt::received()))
}
