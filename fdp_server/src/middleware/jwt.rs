//! Bearer token middleware.
//!
//! Every request passing through this middleware must carry a valid `Authorization: Bearer <jwt>` header. The decoded
//! [`JwtClaims`] are stored in the request extensions, where handlers (and the ACL middleware) pick them up. Requests
//! without a valid token are answered with 401 Unauthorized and never reach the handler.

use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    auth::{bearer_token, TokenValidator},
    errors::AuthError,
};

pub struct JwtMiddlewareFactory {
    validator: Arc<TokenValidator>,
}

impl JwtMiddlewareFactory {
    pub fn new(validator: TokenValidator) -> Self {
        Self { validator: Arc::new(validator) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = JwtMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareService { validator: Arc::clone(&self.validator), service: Rc::new(service) }))
    }
}

pub struct JwtMiddlewareService<S> {
    validator: Arc<TokenValidator>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let validator = Arc::clone(&self.validator);
        Box::pin(async move {
            let token = bearer_token(req.headers()).ok_or_else(|| {
                trace!("🔐️ No bearer token on request for {}", req.path());
                AuthError::MissingToken
            })?;
            let claims = validator.validate(token)?;
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
