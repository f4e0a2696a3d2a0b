use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vodca::{AsRefln, Fromln};

/// Agreed unit price, captured when the purchase is created.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Fromln, AsRefln)]
pub struct PurchasePrice(Decimal);

impl PurchasePrice {
    pub fn new(price: impl Into<Decimal>) -> Self {
        Self(price.into())
    }
}
