//! Replayable application actions.
//!
//! Besides raw HTTP requests, the offline queue can hold application-level
//! actions captured while offline. Each action is a variant of
//! [`ReplayableOperation`]; the host registers one handler per
//! [`OperationKind`] to re-dispatch it during sync.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Actions that may be captured offline and replayed later.
///
/// Serialized as `{"kind": "cart/addToCart", "payload": {...}}` so persisted
/// queues stay readable by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum ReplayableOperation {
    #[serde(rename = "cart/addToCart")]
    AddToCart { product_id: u64, quantity: u32 },
    #[serde(rename = "cart/removeFromCart")]
    RemoveFromCart { product_id: u64 },
    #[serde(rename = "cart/updateQuantity")]
    UpdateQuantity { product_id: u64, quantity: u32 },
}

impl ReplayableOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            ReplayableOperation::AddToCart { .. } => OperationKind::AddToCart,
            ReplayableOperation::RemoveFromCart { .. } => OperationKind::RemoveFromCart,
            ReplayableOperation::UpdateQuantity { .. } => OperationKind::UpdateQuantity,
        }
    }
}

/// Discriminant of [`ReplayableOperation`], used as the handler lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    AddToCart,
    RemoveFromCart,
    UpdateQuantity,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::AddToCart,
        OperationKind::RemoveFromCart,
        OperationKind::UpdateQuantity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::AddToCart => "cart/addToCart",
            OperationKind::RemoveFromCart => "cart/removeFromCart",
            OperationKind::UpdateQuantity => "cart/updateQuantity",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown operation kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_serializes_with_kind_tag() {
        let op = ReplayableOperation::AddToCart {
            product_id: 7,
            quantity: 2,
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"kind": "cart/addToCart", "payload": {"product_id": 7, "quantity": 2}})
        );
    }

    #[test]
    fn test_kind_matches_serialized_tag() {
        let ops = [
            ReplayableOperation::AddToCart {
                product_id: 1,
                quantity: 1,
            },
            ReplayableOperation::RemoveFromCart { product_id: 1 },
            ReplayableOperation::UpdateQuantity {
                product_id: 1,
                quantity: 3,
            },
        ];
        for op in ops {
            let value = serde_json::to_value(&op).unwrap();
            assert_eq!(value["kind"], op.kind().as_str());
        }
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(
            "cart/updateQuantity".parse::<OperationKind>().unwrap(),
            OperationKind::UpdateQuantity
        );
        assert!("cart/checkout".parse::<OperationKind>().is_err());
    }
}
