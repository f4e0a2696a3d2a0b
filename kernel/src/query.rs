mod book;
mod purchase;
mod statistics;

pub use self::{book::*, purchase::*, statistics::*};

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}
