mod order_number;
mod webhook_signature;

pub use order_number::{generate_order_number, is_valid_order_number};
pub use webhook_signature::{SignatureError, SignatureHeader, WebhookVerifier, DEFAULT_TOLERANCE_SECS};
