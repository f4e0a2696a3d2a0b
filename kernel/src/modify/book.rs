use crate::database::Transaction;
use crate::entity::{Book, BookId, BookQuantity};
use crate::KernelError;

#[async_trait::async_trait]
pub trait BookModifier<Connection: Transaction>: 'static + Sync + Send {
    async fn create(
        &self,
        con: &mut Connection,
        book: &Book,
    ) -> error_stack::Result<(), KernelError>;
    async fn update(
        &self,
        con: &mut Connection,
        book: &Book,
    ) -> error_stack::Result<(), KernelError>;
    async fn delete(
        &self,
        con: &mut Connection,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError>;
    /// Conditionally decrements stock. The store must perform check and
    /// decrement as one atomic step; callers treat "nothing updated" as
    /// `BookNotAvailable` even when an earlier read said otherwise.
    async fn decrease_stock(
        &self,
        con: &mut Connection,
        book_id: &BookId,
        amount: &BookQuantity,
    ) -> error_stack::Result<Book, KernelError>;
    /// Unconditional atomic increment. The catalog ceiling is enforced at
    /// create/update only, not here.
    async fn increase_stock(
        &self,
        con: &mut Connection,
        book_id: &BookId,
        amount: &BookQuantity,
    ) -> error_stack::Result<Book, KernelError>;
}

pub trait DependOnBookModifier<Connection: Transaction>: 'static + Sync + Send {
    type BookModifier: BookModifier<Connection>;
    fn book_modifier(&self) -> &Self::BookModifier;
}
