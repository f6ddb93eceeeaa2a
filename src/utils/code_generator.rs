//! Short code generation.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of a generated short code.
pub const CODE_LENGTH: usize = 7;

/// Generates a random short code: exactly 7 characters drawn uniformly
/// from `[A-Za-z0-9]`. Collisions are handled by the caller's insert-retry.
pub fn generate_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}
