//! Roster entries supplied by the roster provider.

use crate::types::EntityId;
use serde::{Deserialize, Serialize};

/// One selectable entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: EntityId,
    pub display_name: String,
}

impl RosterEntry {
    #[must_use]
    pub fn new(id: u32, display_name: impl Into<String>) -> Self {
        Self {
            id: EntityId(id),
            display_name: display_name.into(),
        }
    }
}
