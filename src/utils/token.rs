use rand::{rngs::OsRng, RngCore};

/// Bytes of entropy behind auth keys and reset-token prefixes.
pub const RANDOM_KEY_BYTES: usize = 32;

/// Hex-encoded random string from the OS CSPRNG.
pub fn generate_random_key() -> String {
    let mut bytes = [0u8; RANDOM_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// `<random>_<unix timestamp>`.
pub fn generate_reset_token(issued_at: i64) -> String {
    format!("{}_{}", generate_random_key(), issued_at)
}

/// Extracts the issuance timestamp from a reset token. `None` when the
/// token is empty, has no `_`, or the suffix is not all ASCII digits.
pub fn reset_token_timestamp(token: &str) -> Option<i64> {
    let (_, suffix) = token.rsplit_once('_')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}
