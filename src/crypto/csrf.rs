use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The size of the per-token nonce in bytes.
const NONCE_SIZE: usize = 16;

/// Errors raised while issuing a CSRF token.
#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("CSRF token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by a CSRF token.
#[derive(Debug, Serialize, Deserialize)]
struct CsrfClaims {
    iat: i64,
    exp: i64,
    /// Random nonce, so two tokens issued within the same second still differ.
    jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
}

/// Issues a signed, short-lived CSRF token.
///
/// # Arguments
///
/// * `subject` - Optional subject claim. Login and signup forms carry none.
/// * `secret` - The process-wide signing secret.
/// * `lifetime` - Time until the token expires.
///
/// # Returns
///
/// A compact HS512 JWT.
pub fn issue_token(
    subject: Option<&str>,
    secret: &[u8],
    lifetime: Duration,
) -> Result<String, CsrfError> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let now = Utc::now();
    let claims = CsrfClaims {
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
        jti: general_purpose::URL_SAFE_NO_PAD.encode(nonce),
        sub: subject.filter(|s| !s.is_empty()).map(str::to_owned),
    };

    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(secret),
    )?;
    Ok(token)
}

/// Checks the signature, algorithm and expiry of a CSRF token.
///
/// Never errors: anything that is not a valid, unexpired token signed with
/// `secret` yields `false`.
pub fn verify_token(token: &str, secret: &[u8]) -> bool {
    if token.is_empty() {
        return false;
    }

    let mut validation = Validation::new(Algorithm::HS512);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    jsonwebtoken::decode::<CsrfClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .is_ok()
}
