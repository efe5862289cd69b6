// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Error types surfaced to hosts embedding the simulation

use thiserror::Error;

/// Failures a host (HTTP layer, socket layer, test harness) can observe.
///
/// Lookups of unknown ids map to the `*NotFound` variants so callers can
/// answer with a 404-equivalent; nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum CityError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("edge node not found: {0}")]
    EdgeNodeNotFound(String),

    #[error("department not found: {0}")]
    DepartmentNotFound(String),

    #[error("alert not found: {0}")]
    AlertNotFound(String),

    #[error("simulation must be started from within a tokio runtime")]
    NoRuntime,

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CityError {
    /// True for the lookup failures a host should report as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CityError::DeviceNotFound(_)
                | CityError::EdgeNodeNotFound(_)
                | CityError::DepartmentNotFound(_)
                | CityError::AlertNotFound(_)
        )
    }
}

pub type CityResult<T> = std::result::Result<T, CityError>;
