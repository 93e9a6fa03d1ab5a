//! Model identifier parsing

use std::fmt;

use crate::utils::error::{BridgeError, Result};

/// A parsed `"provider/model"` identifier
///
/// Matching against the registry is exact and case-sensitive: model names
/// are upstream identifiers and upstream treats their case as significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelIdentifier {
    pub provider: String,
    pub model: String,
}

impl ModelIdentifier {
    /// Parse a raw identifier string
    ///
    /// Splits on the first `/`; both sides must be non-empty. Only the
    /// first separator is structural, so model names may themselves
    /// contain `/` (org-scoped upstream ids). There is no default
    /// provider: an identifier without a separator is an error.
    pub fn parse(raw: &str) -> Result<Self> {
        let Some((provider, model)) = raw.split_once('/') else {
            return Err(BridgeError::MalformedIdentifier(format!(
                "expected \"provider/model\", got {raw:?}"
            )));
        };
        if provider.is_empty() || model.is_empty() {
            return Err(BridgeError::MalformedIdentifier(format!(
                "provider and model must be non-empty in {raw:?}"
            )));
        }
        Ok(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}
