use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use zeroize::{Zeroize, Zeroizing};

/// The minimum length of the token signing secret in bytes.
const MIN_SECRET_BYTES: usize = 32;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The address the server listens on.
    pub bind_addr: SocketAddr,
    /// The URL of the PostgreSQL session database. Sessions are kept in memory when unset.
    pub database_url: Option<String>,
    /// The root URL of the issue#1 REST service.
    pub rest_base_url: String,
    /// The timeout of each REST request.
    pub rest_timeout: std::time::Duration,
    /// The name of the session cookie.
    pub cookie_name: String,
    /// The key CSRF tokens are signed with.
    pub token_signing_secret: Zeroizing<Vec<u8>>,
    pub csrf_token_lifetime: chrono::Duration,
    /// How long a session may go unused.
    pub session_idle_lifetime: chrono::Duration,
    /// How long a session lives regardless of use. Also the cookie `Max-Age`.
    pub session_hard_lifetime: chrono::Duration,
    /// The period of the expired session sweep.
    pub session_sweep_interval: std::time::Duration,
    /// Whether the site is served over TLS. Sets the `Secure` cookie flag.
    pub https: bool,
    /// The directory static assets are served from.
    pub asset_dir: PathBuf,
    /// Requests per second allowed per client on `/login` and `/signup`. Zero disables the limit.
    pub login_rate_limit_per_second: u64,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {name}: {raw:?}")),
        None => Ok(default),
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Creates a new `Config` from the variables `lookup` resolves.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut secret_hex = lookup("TOKEN_SIGNING_SECRET")
            .context("TOKEN_SIGNING_SECRET must be set (generate with: openssl rand -hex 32)")?;

        let secret_bytes = hex::decode(secret_hex.trim())
            .context("TOKEN_SIGNING_SECRET must be valid hexadecimal");

        secret_hex.zeroize();
        let secret = Zeroizing::new(secret_bytes?);

        if secret.len() < MIN_SECRET_BYTES {
            anyhow::bail!(
                "TOKEN_SIGNING_SECRET must be at least {MIN_SECRET_BYTES} bytes ({} hex characters)",
                MIN_SECRET_BYTES * 2
            );
        }

        let minutes = |name: &str, default: i64| -> Result<chrono::Duration> {
            Ok(chrono::Duration::minutes(parse_or(&lookup, name, default)?))
        };

        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 8081)))?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            rest_base_url: lookup("REST_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            rest_timeout: std::time::Duration::from_secs(parse_or(&lookup, "REST_TIMEOUT_SECS", 10)?),
            cookie_name: lookup("COOKIE_NAME").unwrap_or_else(|| "I1Session".to_string()),
            token_signing_secret: secret,
            csrf_token_lifetime: minutes("CSRF_TOKEN_LIFETIME_MINUTES", 7)?,
            session_idle_lifetime: chrono::Duration::hours(parse_or(
                &lookup,
                "SESSION_IDLE_LIFETIME_HOURS",
                168,
            )?),
            session_hard_lifetime: chrono::Duration::days(parse_or(
                &lookup,
                "SESSION_HARD_LIFETIME_DAYS",
                30,
            )?),
            session_sweep_interval: std::time::Duration::from_secs(
                60 * parse_or::<u64>(&lookup, "SESSION_SWEEP_INTERVAL_MINUTES", 60)?.max(1),
            ),
            https: parse_or(&lookup, "HTTPS", false)?,
            asset_dir: lookup("ASSET_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("web/assets")),
            login_rate_limit_per_second: parse_or(&lookup, "LOGIN_RATE_LIMIT_PER_SECOND", 5)?,
        })
    }
}
