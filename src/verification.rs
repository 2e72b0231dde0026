//! Verification Codes
//!
//! Five-digit one-time codes mailed to new accounts.

use crate::error::AuthError;

use rand::{rngs::OsRng, RngCore};

/// Smallest code that can be issued
pub const CODE_MIN: u32 = 10_000;

/// Largest code that can be issued
pub const CODE_MAX: u32 = 99_999;

const CODE_SPAN: u32 = CODE_MAX - CODE_MIN + 1;

// Largest multiple of CODE_SPAN that fits in u32; draws at or above it are rejected
const ACCEPT_ZONE: u32 = u32::MAX - (u32::MAX % CODE_SPAN);

/// Generate a verification code uniformly from `CODE_MIN..=CODE_MAX` using the OS CSPRNG
pub fn generate_code() -> Result<String, AuthError> {
    generate_code_with(&mut OsRng)
}

pub(crate) fn generate_code_with<R: RngCore>(rng: &mut R) -> Result<String, AuthError> {
    let mut buf = [0u8; 4];

    loop {
        rng.try_fill_bytes(&mut buf).map_err(|e| {
            tracing::error!("Secure random source unavailable: {e}");
            AuthError::Internal
        })?;

        let draw = u32::from_le_bytes(buf);
        if draw < ACCEPT_ZONE {
            return Ok(format!("{:05}", CODE_MIN + draw % CODE_SPAN));
        }
    }
}
