use std::cmp::Ordering;
use std::collections::BTreeSet;

use error_stack::Report;
use time::OffsetDateTime;

use kernel::interface::query::{BookFilter, BookQuery, BookSortKey, SortOrder};
use kernel::interface::update::BookModifier;
use kernel::prelude::entity::{Book, BookCategory, BookId, BookQuantity};
use kernel::{KernelError, KernelErrorAttachments};

use crate::database::memory::MemoryTransaction;

pub struct MemoryBookRepository;

fn matches_search(book: &Book, search: &str) -> bool {
    let needle = search.to_lowercase();
    let title: &String = book.title().as_ref();
    if title.to_lowercase().contains(&needle) {
        return true;
    }
    if let Some(description) = book.description() {
        let description: &String = description.as_ref();
        if description.to_lowercase().contains(&needle) {
            return true;
        }
    }
    let owner_name: &String = book.owner_name().as_ref();
    owner_name.to_lowercase().contains(&needle)
}

fn matches_filter(book: &Book, filter: &BookFilter) -> bool {
    if let Some(search) = &filter.search {
        if !matches_search(book, search) {
            return false;
        }
    }
    if let Some(category) = &filter.category {
        if book.category().as_ref() != Some(category) {
            return false;
        }
    }
    if let Some(owner_id) = &filter.owner_id {
        if book.owner_id() != owner_id {
            return false;
        }
    }
    if filter.available_only && !book.is_available() {
        return false;
    }
    if let Some(price_min) = filter.price_min {
        if *book.price().as_ref() < price_min {
            return false;
        }
    }
    if let Some(price_max) = filter.price_max {
        if *book.price().as_ref() > price_max {
            return false;
        }
    }
    true
}

fn compare(a: &Book, b: &Book, key: BookSortKey) -> Ordering {
    match key {
        BookSortKey::CreatedAt => {
            let left: &OffsetDateTime = a.created_at().as_ref();
            let right: &OffsetDateTime = b.created_at().as_ref();
            left.cmp(right)
        }
        BookSortKey::Price => a.price().as_ref().cmp(b.price().as_ref()),
        BookSortKey::Title => a.title().as_ref().cmp(b.title().as_ref()),
        BookSortKey::Quantity => a.quantity().as_ref().cmp(b.quantity().as_ref()),
    }
}

#[async_trait::async_trait]
impl BookQuery<MemoryTransaction> for MemoryBookRepository {
    async fn find_by_id(
        &self,
        con: &mut MemoryTransaction,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        let books = con.books().read().await;
        Ok(books.get(id.as_ref()).cloned())
    }

    async fn find_with_filters(
        &self,
        con: &mut MemoryTransaction,
        filter: &BookFilter,
    ) -> error_stack::Result<Vec<Book>, KernelError> {
        let books = con.books().read().await;
        let mut found: Vec<Book> = books
            .values()
            .filter(|book| matches_filter(book, filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            let ordering = compare(a, b, filter.sort_by);
            match filter.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        let offset = *filter.offset.as_ref() as usize;
        let limit = *filter.limit.as_ref() as usize;
        Ok(found.into_iter().skip(offset).take(limit).collect())
    }

    async fn categories(
        &self,
        con: &mut MemoryTransaction,
    ) -> error_stack::Result<Vec<BookCategory>, KernelError> {
        let books = con.books().read().await;
        let categories: BTreeSet<String> = books
            .values()
            .filter_map(|book| book.category().clone())
            .map(Into::into)
            .collect();
        Ok(categories.into_iter().map(BookCategory::new).collect())
    }
}

#[async_trait::async_trait]
impl BookModifier<MemoryTransaction> for MemoryBookRepository {
    async fn create(
        &self,
        con: &mut MemoryTransaction,
        book: &Book,
    ) -> error_stack::Result<(), KernelError> {
        let mut books = con.books().write().await;
        books.insert(*book.id().as_ref(), book.clone());
        Ok(())
    }

    async fn update(
        &self,
        con: &mut MemoryTransaction,
        book: &Book,
    ) -> error_stack::Result<(), KernelError> {
        let mut books = con.books().write().await;
        books.insert(*book.id().as_ref(), book.clone());
        Ok(())
    }

    async fn delete(
        &self,
        con: &mut MemoryTransaction,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        let mut books = con.books().write().await;
        books.remove(book_id.as_ref());
        Ok(())
    }

    async fn decrease_stock(
        &self,
        con: &mut MemoryTransaction,
        book_id: &BookId,
        amount: &BookQuantity,
    ) -> error_stack::Result<Book, KernelError> {
        // Single write guard: check and decrement cannot interleave with a
        // competing buyer.
        let mut books = con.books().write().await;
        let book = books.get_mut(book_id.as_ref()).ok_or_else(|| {
            Report::new(KernelError::NotFound).attach_missing_record("book", *book_id.as_ref())
        })?;
        let available = *book.quantity().as_ref();
        let requested = *amount.as_ref();
        if available < requested {
            return Err(Report::new(KernelError::BookNotAvailable)
                .attach_stock_shortage(available, requested));
        }
        book.substitute(|b| *b.quantity = BookQuantity::new(available - requested));
        Ok(book.clone())
    }

    async fn increase_stock(
        &self,
        con: &mut MemoryTransaction,
        book_id: &BookId,
        amount: &BookQuantity,
    ) -> error_stack::Result<Book, KernelError> {
        let mut books = con.books().write().await;
        let book = books.get_mut(book_id.as_ref()).ok_or_else(|| {
            Report::new(KernelError::NotFound).attach_missing_record("book", *book_id.as_ref())
        })?;
        let quantity = *book.quantity().as_ref() + *amount.as_ref();
        book.substitute(|b| *b.quantity = BookQuantity::new(quantity));
        Ok(book.clone())
    }
}
