use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vodca::{AsRefln, Fromln};

/// Identity of the listing owner as issued by the identity provider. The
/// kernel never resolves it to a user record; the display name travels with
/// the listing.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Fromln, AsRefln)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new(id: impl Into<Uuid>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Fromln, AsRefln)]
pub struct OwnerName(String);

impl OwnerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}
