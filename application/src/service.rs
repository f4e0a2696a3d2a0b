mod book;
mod purchase;
mod statistics;

pub use self::{book::*, purchase::*, statistics::*};
