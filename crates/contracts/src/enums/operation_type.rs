use serde::{Deserialize, Serialize};

/// Operation type carried by every envelope message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Update,
    Delete,
    PartialUpdate,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::PartialUpdate => "PartialUpdate",
        }
    }
}

impl Default for OperationType {
    fn default() -> Self {
        Self::Update
    }
}
