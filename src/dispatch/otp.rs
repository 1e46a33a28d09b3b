use rand::rngs::OsRng;
use rand::Rng;

use crate::error::AppError;

pub const CODE_LEN: usize = 5;

/// Generates one 5-digit handoff code from the OS entropy source. Two
/// independent codes are issued per ride, one for the store pickup and one
/// for the customer delivery.
pub fn generate_code() -> String {
    let value: u32 = OsRng.gen_range(0..100_000);
    format!("{value:05}")
}

/// Exact-match verification. A mismatch is a validation failure and must
/// leave the ride untouched; the caller only advances state on `Ok`.
pub fn verify(expected: &str, presented: &str) -> Result<(), AppError> {
    if expected == presented {
        Ok(())
    } else {
        Err(AppError::Validation("handoff code mismatch".to_string()))
    }
}
