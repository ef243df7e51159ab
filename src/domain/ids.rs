use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::AppError;

fn well_formed(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 255
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Order identifier assigned by the payment processor at order creation.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Result<Self, AppError> {
        let id = id.into();
        if !well_formed(&id) {
            return Err(AppError::Validation(format!("malformed order id: {id:?}")));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Capture (transaction) identifier assigned by the processor when an order
/// is captured.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureId(String);

impl CaptureId {
    pub fn new(id: impl Into<String>) -> Result<Self, AppError> {
        let id = id.into();
        if !well_formed(&id) {
            return Err(AppError::Validation(format!(
                "malformed capture id: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
