use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vodca::{AsRefln, Fromln};

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Fromln, AsRefln)]
pub struct PurchaseId(Uuid);

impl PurchaseId {
    pub fn new(id: impl Into<Uuid>) -> Self {
        Self(id.into())
    }
}
