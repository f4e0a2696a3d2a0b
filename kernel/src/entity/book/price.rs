use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vodca::{AsRefln, Fromln};

/// Unit price in the shop currency. Held as an exact decimal so repeated
/// arithmetic never drifts the way binary floats would.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Fromln, AsRefln)]
pub struct BookPrice(Decimal);

impl BookPrice {
    pub fn new(price: impl Into<Decimal>) -> Self {
        Self(price.into())
    }
}
