//! Request parameter DTOs for the relay endpoints

use serde::Deserialize;

use crate::error::{RelayError, Result};

/// Query string of `GET /icinga/check_state` and `GET /icinga/check_result`
///
/// # Fields
/// - `object_type`: `host` or `service`
/// - `filter`: Icinga filter expression selecting the objects
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

impl FilterParams {
    /// Returns `(object_type, filter)` or the parameter that is missing.
    pub fn require(&self) -> Result<(&str, &str)> {
        let object_type = required("object_type", self.object_type.as_deref())?;
        let filter = required("filter", self.filter.as_deref())?;
        Ok((object_type, filter))
    }
}

fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RelayError::ParameterInvalid(format!(
            "missing query parameter '{}'",
            name
        ))),
    }
}
