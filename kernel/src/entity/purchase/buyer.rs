use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vodca::{AsRefln, Fromln};

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Fromln, AsRefln)]
pub struct BuyerId(Uuid);

impl BuyerId {
    pub fn new(id: impl Into<Uuid>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Fromln, AsRefln)]
pub struct BuyerName(String);

impl BuyerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Fromln, AsRefln)]
pub struct BuyerEmail(String);

impl BuyerEmail {
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }
}
