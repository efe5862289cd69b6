//! Device token authentication

use std::collections::HashMap;

use super::secure_memory::{constant_time_compare, secure_random_bytes};
use crate::error::CityResult;

/// Result of checking a presented token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// No token on file; one was issued and the attempt is refused
    FirstContact,
    Valid,
    Invalid,
}

/// Per-device token store
#[derive(Default)]
pub struct DeviceAuthenticator {
    tokens: HashMap<String, String>,
}

impl DeviceAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue (or rotate) a device token: 32 random bytes, hex encoded
    pub fn issue_token(&mut self, device_id: &str) -> CityResult<String> {
        let token = generate_device_token()?;
        self.tokens.insert(device_id.to_string(), token.clone());
        Ok(token)
    }

    pub fn token(&self, device_id: &str) -> Option<&str> {
        self.tokens.get(device_id).map(String::as_str)
    }

    pub fn verify(&mut self, device_id: &str, presented: &str) -> CityResult<AuthOutcome> {
        match self.tokens.get(device_id) {
            None => {
                self.issue_token(device_id)?;
                Ok(AuthOutcome::FirstContact)
            }
            Some(stored) if constant_time_compare(stored.as_bytes(), presented.as_bytes()) => {
                Ok(AuthOutcome::Valid)
            }
            Some(_) => Ok(AuthOutcome::Invalid),
        }
    }

    /// Number of devices holding a token
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Generate a device token
pub fn generate_device_token() -> CityResult<String> {
    Ok(hex::encode(secure_random_bytes(32)?))
}
