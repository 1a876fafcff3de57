use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use fdp_engine::{OrderFlowError, PaymentFlowError};
use log::error;
use thiserror::Error;

use crate::data_objects::JsonResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("Could not read query string: {0}")]
    InvalidQuery(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    WebhookError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::WebhookError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::CouldNotIssueToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ {self}");
        }
        HttpResponse::build(status).insert_header(ContentType::json()).json(JsonResponse::failure(self))
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided")]
    MissingToken,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Could not issue access token. {0}")]
    CouldNotIssueToken(String),
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        ServerError::AuthenticationError(self.clone()).status_code()
    }

    fn error_response(&self) -> HttpResponse {
        ServerError::AuthenticationError(self.clone()).error_response()
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(_) => Self::BackendError(e.to_string()),
            OrderFlowError::ValidationError(msg) => Self::ValidationError(msg),
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::InvalidTransition(_) => Self::Conflict(e.to_string()),
            OrderFlowError::RevisionConflict { .. } => Self::Conflict(e.to_string()),
            OrderFlowError::OverrideNotAllowed => Self::InsufficientPermissions(e.to_string()),
        }
    }
}

impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        match e {
            PaymentFlowError::DatabaseError(_) => Self::BackendError(e.to_string()),
            PaymentFlowError::ValidationError(msg) => Self::ValidationError(msg),
            PaymentFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            PaymentFlowError::GatewayNotConfigured => Self::ServiceUnavailable(e.to_string()),
            PaymentFlowError::GatewayError(_) => Self::BackendError(e.to_string()),
            PaymentFlowError::SignatureError(_) | PaymentFlowError::InvalidWebhookPayload(_) => {
                Self::WebhookError(e.to_string())
            },
        }
    }
}

#[cfg(test)]
mod test {
    use fdp_engine::{
        db_types::{OrderId, OrderStatus},
        helpers::SignatureError,
        lifecycle::TransitionError,
    };

    use super::*;

    #[test]
    fn engine_errors_map_to_status_codes() {
        let cases: Vec<(ServerError, StatusCode)> = vec![
            (OrderFlowError::validation("items is required").into(), StatusCode::BAD_REQUEST),
            (OrderFlowError::OrderNotFound(OrderId(1)).into(), StatusCode::NOT_FOUND),
            (OrderFlowError::RevisionConflict { id: OrderId(1), current: 3 }.into(), StatusCode::CONFLICT),
            (OrderFlowError::OverrideNotAllowed.into(), StatusCode::FORBIDDEN),
            (OrderFlowError::DatabaseError("disk full".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
            (PaymentFlowError::GatewayNotConfigured.into(), StatusCode::SERVICE_UNAVAILABLE),
            (PaymentFlowError::SignatureError(SignatureError::MissingHeader).into(), StatusCode::BAD_REQUEST),
            (AuthError::MissingToken.into(), StatusCode::UNAUTHORIZED),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
        let transition = TransitionError::NotAllowed { from: OrderStatus::Placed, to: OrderStatus::Delivered };
        let err: ServerError = OrderFlowError::InvalidTransition(transition).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn messages_are_passed_through() {
        let err: ServerError = OrderFlowError::validation("pricing is required").into();
        assert_eq!(err.to_string(), "pricing is required");
        let err: ServerError = PaymentFlowError::InvalidWebhookPayload("expected value".into()).into();
        assert_eq!(err.to_string(), "Webhook Error: expected value");
    }
}
