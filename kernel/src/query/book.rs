use rust_decimal::Decimal;

use crate::database::Transaction;
use crate::entity::{Book, BookCategory, BookId, OwnerId, SelectLimit, SelectOffset};
use crate::query::SortOrder;
use crate::KernelError;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum BookSortKey {
    #[default]
    CreatedAt,
    Price,
    Title,
    Quantity,
}

/// Recognized catalog filters. All present criteria combine conjunctively.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Case-insensitive substring match over title, description and owner
    /// name.
    pub search: Option<String>,
    pub category: Option<BookCategory>,
    pub owner_id: Option<OwnerId>,
    pub available_only: bool,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub sort_by: BookSortKey,
    pub sort_order: SortOrder,
    pub limit: SelectLimit,
    pub offset: SelectOffset,
}

#[async_trait::async_trait]
pub trait BookQuery<Connection: Transaction>: Sync + Send + 'static {
    async fn find_by_id(
        &self,
        con: &mut Connection,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError>;
    async fn find_with_filters(
        &self,
        con: &mut Connection,
        filter: &BookFilter,
    ) -> error_stack::Result<Vec<Book>, KernelError>;
    async fn categories(
        &self,
        con: &mut Connection,
    ) -> error_stack::Result<Vec<BookCategory>, KernelError>;
}

pub trait DependOnBookQuery<Connection: Transaction>: Sync + Send + 'static {
    type BookQuery: BookQuery<Connection>;
    fn book_query(&self) -> &Self::BookQuery;
}
