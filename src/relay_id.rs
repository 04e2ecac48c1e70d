// src/relay_id.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation id attached to every relay call's log lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayId(pub String);

impl RelayId {
    pub fn new() -> Self {
        Self(format!("relay_{}", Uuid::new_v4()))
    }
}

impl Default for RelayId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = RelayId::new();
        let b = RelayId::new();

        assert!(a.to_string().starts_with("relay_"));
        assert_ne!(a, b);
    }
}
