mod book;
mod common;
mod purchase;

pub use self::{book::*, common::*, purchase::*};
