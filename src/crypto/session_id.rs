use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;

/// The number of random bytes behind a session identifier.
const SESSION_ID_SIZE: usize = 32;

/// Generates a new random session identifier.
///
/// # Returns
///
/// A URL-safe base64-encoded identifier without padding.
pub fn generate_session_id() -> String {
    let mut id = [0u8; SESSION_ID_SIZE];
    OsRng.fill_bytes(&mut id);

    general_purpose::URL_SAFE_NO_PAD.encode(id)
}
