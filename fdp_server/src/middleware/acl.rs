//! Access control list middleware.
//!
//! This middleware can be placed on any route or service that sits behind the [`JwtMiddlewareFactory`]. It checks the
//! role in the caller's access token against the roles the route requires. A superadmin satisfies any requirement for
//! `admin`. If the caller lacks a required role, a 403 Forbidden response is returned.
//!
//! [`JwtMiddlewareFactory`]: super::JwtMiddlewareFactory

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use fdp_engine::db_types::Role;
use futures::future::LocalBoxFuture;
use log::*;

use crate::{auth::JwtClaims, errors::AuthError};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) }))
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
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
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let role = req.extensions().get::<JwtClaims>().map(|c| c.role).ok_or_else(|| {
                warn!("🔐️ No JWT claims found in request extensions. Is the ACL sitting outside the JWT middleware?");
                AuthError::MissingToken
            })?;
            if required_roles.iter().all(|r| role.satisfies(*r)) {
                service.call(req).await
            } else {
                debug!("🔐️ {role} does not have the required roles for {}", req.path());
                Err(AuthError::InsufficientPermissions(format!("This action requires the {} role", roles(&required_roles)))
                    .into())
            }
        })
    }
}

fn roles(required: &[Role]) -> String {
    required.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
}
