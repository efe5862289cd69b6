//! Random material and timing-safe comparison

use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{CityError, CityResult};

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

/// Secure random fill
pub fn secure_fill(buffer: &mut [u8]) -> CityResult<()> {
    SystemRandom::new()
        .fill(buffer)
        .map_err(|_| CityError::Crypto("system random source unavailable".into()))
}

/// Generate secure random bytes using ring
pub fn secure_random_bytes(len: usize) -> CityResult<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    secure_fill(&mut bytes)?;
    Ok(bytes)
}
