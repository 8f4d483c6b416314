use serde::{Deserialize, Serialize};

use crate::shared::models::NodeId;

/// Definition of `variable` at `from` may reach its read at `to`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataDependence {
    pub from: NodeId,
    pub to: NodeId,
    pub variable: String,
}
