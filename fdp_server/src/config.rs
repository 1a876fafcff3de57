use std::{env, io::Write, str::FromStr, time::Duration};

use fdp_common::{helpers::env_flag, Money, Secret, DEFAULT_CURRENCY_CODE};
use fdp_engine::{
    engine_api::order_flow_api::DEFAULT_DELIVERY_FEE,
    helpers::DEFAULT_TOLERANCE_SECS,
    jobs::DEFAULT_MAX_ATTEMPTS,
};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_FDP_HOST: &str = "127.0.0.1";
const DEFAULT_FDP_PORT: u16 = 8360;
const DEFAULT_FDP_DATABASE_URL: &str = "sqlite://data/fdp_orders.db";
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24);
const DEFAULT_QUEUE_BUFFER_SIZE: usize = 1024;
const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub queue: QueueConfig,
    pub stripe: StripeConfig,
    /// Charged when an order does not specify a delivery fee
    pub default_delivery_fee: Money,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FDP_HOST.to_string(),
            port: DEFAULT_FDP_PORT,
            database_url: DEFAULT_FDP_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            queue: QueueConfig::default(),
            stripe: StripeConfig::default(),
            default_delivery_fee: Money::from(DEFAULT_DELIVERY_FEE),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("FDP_HOST").ok().unwrap_or_else(|| DEFAULT_FDP_HOST.into());
        let port = parse_env("FDP_PORT", DEFAULT_FDP_PORT);
        let database_url = env::var("FDP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ FDP_DATABASE_URL is not set. Using the default, {DEFAULT_FDP_DATABASE_URL}.");
            DEFAULT_FDP_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let queue = QueueConfig::from_env_or_default();
        let stripe = StripeConfig::from_env_or_default();
        let default_delivery_fee = Money::from(parse_env("FDP_DEFAULT_DELIVERY_FEE", DEFAULT_DELIVERY_FEE));
        Self { host, port, database_url, auth, queue, stripe, default_delivery_fee }
    }
}

/// Reads and parses an environment variable, logging and falling back to `default` when it is missing or invalid.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The shared secret used to sign and verify access tokens (HS256).
    pub jwt_secret: Secret<String>,
    pub token_lifetime: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since every token will be invalidated when the server restarts. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => match writeln!(f, "FDP_JWT_SECRET={secret}") {
                Ok(()) => warn!(
                    "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, you \
                     are doing it wrong! Set the FDP_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                    p.to_str().unwrap_or("???")
                ),
                Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret.");
            },
        }
        Self { jwt_secret: Secret::new(secret), token_lifetime: DEFAULT_TOKEN_LIFETIME }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()), token_lifetime: DEFAULT_TOKEN_LIFETIME }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("FDP_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [FDP_JWT_SECRET]")))?;
        let jwt_secret = Secret::new(secret);
        if !jwt_secret.is_set() {
            return Err(ServerError::ConfigurationError("FDP_JWT_SECRET is blank".to_string()));
        }
        let token_lifetime = Duration::from_secs(parse_env("FDP_JWT_EXPIRY", DEFAULT_TOKEN_LIFETIME.as_secs()));
        Ok(Self { jwt_secret, token_lifetime })
    }
}

//-------------------------------------------------  QueueConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// `redis://...`, `memory://` or nothing at all, which disables background jobs.
    pub url: Option<String>,
    pub max_attempts: u32,
    /// Whether this process should also consume the queues it produces to.
    pub run_workers: bool,
    pub buffer_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { url: None, max_attempts: DEFAULT_MAX_ATTEMPTS, run_workers: true, buffer_size: DEFAULT_QUEUE_BUFFER_SIZE }
    }
}

impl QueueConfig {
    pub fn from_env_or_default() -> Self {
        let url = env::var("FDP_QUEUE_URL").ok().filter(|s| !s.trim().is_empty());
        if url.is_none() {
            info!("🪛️ FDP_QUEUE_URL is not set. Order jobs will not be queued.");
        }
        let max_attempts = parse_env("FDP_QUEUE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS);
        let run_workers = env_flag("FDP_RUN_WORKERS", true);
        Self { url, max_attempts, run_workers, buffer_size: DEFAULT_QUEUE_BUFFER_SIZE }
    }
}

//-------------------------------------------------  StripeConfig  -----------------------------------------------------
#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub api_url: String,
    /// Used to create payment intents. Card payments are unavailable without it.
    pub secret_key: Secret<String>,
    /// Used to verify the `Stripe-Signature` header on webhook deliveries.
    pub webhook_secret: Secret<String>,
    pub webhook_tolerance: i64,
    pub currency: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_STRIPE_API_URL.to_string(),
            secret_key: Secret::default(),
            webhook_secret: Secret::default(),
            webhook_tolerance: DEFAULT_TOLERANCE_SECS,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }
}

impl StripeConfig {
    pub fn from_env_or_default() -> Self {
        let api_url = env::var("FDP_STRIPE_API_URL").ok().unwrap_or_else(|| DEFAULT_STRIPE_API_URL.into());
        let secret_key = Secret::new(env::var("FDP_STRIPE_SECRET_KEY").ok().unwrap_or_else(|| {
            warn!("🪛️ FDP_STRIPE_SECRET_KEY is not set. Card payments are disabled.");
            String::default()
        }));
        let webhook_secret = Secret::new(env::var("FDP_STRIPE_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ FDP_STRIPE_WEBHOOK_SECRET is not set. Please set it to the signing secret for your Stripe webhook \
                 endpoint. Every webhook delivery will be rejected until you do."
            );
            String::default()
        }));
        let webhook_tolerance = parse_env("FDP_STRIPE_WEBHOOK_TOLERANCE", DEFAULT_TOLERANCE_SECS);
        let currency = env::var("FDP_CURRENCY")
            .ok()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        Self { api_url, secret_key, webhook_secret, webhook_tolerance, currency }
    }

    pub fn has_gateway(&self) -> bool {
        self.secret_key.is_set()
    }
}
