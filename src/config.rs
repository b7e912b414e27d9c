//! Manager configuration.
//!
//! [`ManagerConfig`] is `Deserialize` so hosts can embed it in whatever settings file
//! they already load. Only `shared_secret` is required.

use crate::model::ProductId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential forwarded to the receipt verifier. Redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedSecret(String);

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(***)")
    }
}

fn default_request_buffer() -> usize {
    32
}

fn default_event_capacity() -> usize {
    64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub shared_secret: SharedSecret,

    /// Refreshed on every `update_products` in addition to the activators' claims.
    #[serde(default)]
    pub product_identifiers: Vec<ProductId>,

    /// Capacity of the manager's request queue.
    #[serde(default = "default_request_buffer")]
    pub request_buffer: usize,

    /// Events a slow subscriber may lag behind before it starts missing them.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl ManagerConfig {
    pub fn new(shared_secret: impl Into<String>) -> Self {
        Self {
            shared_secret: SharedSecret::new(shared_secret),
            product_identifiers: Vec::new(),
            request_buffer: default_request_buffer(),
            event_capacity: default_event_capacity(),
        }
    }

    pub fn with_product_identifiers<I, P>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ProductId>,
    {
        self.product_identifiers = ids.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_deserializing() {
        let config: ManagerConfig =
            serde_json::from_str(r#"{ "shared_secret": "abc123" }"#).unwrap();

        assert_eq!(config.shared_secret.expose(), "abc123");
        assert!(config.product_identifiers.is_empty());
        assert_eq!(config.request_buffer, 32);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_product_identifiers_deserialize_as_strings() {
        let config: ManagerConfig = serde_json::from_str(
            r#"{ "shared_secret": "s", "product_identifiers": ["pro_upgrade"], "request_buffer": 4 }"#,
        )
        .unwrap();

        assert_eq!(config.product_identifiers, vec![ProductId::from("pro_upgrade")]);
        assert_eq!(config.request_buffer, 4);
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = ManagerConfig::new("top-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("SharedSecret(***)"));
    }
}
