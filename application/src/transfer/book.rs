use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::prelude::entity::{Book, DestructBook};

#[derive(Debug, Clone)]
pub struct BookDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub category: Option<String>,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

impl From<Book> for BookDto {
    fn from(value: Book) -> Self {
        let DestructBook {
            id,
            title,
            description,
            price,
            quantity,
            category,
            owner_id,
            owner_name,
            created_at,
            updated_at,
        } = value.into_destruct();
        Self {
            id: id.into(),
            title: title.into(),
            description: description.map(Into::into),
            price: price.into(),
            quantity: quantity.into(),
            category: category.map(Into::into),
            owner_id: owner_id.into(),
            owner_name: owner_name.into(),
            created_at: *created_at.as_ref(),
            updated_at: updated_at.map(|at| *at.as_ref()),
        }
    }
}

pub struct GetBookDto {
    pub id: Uuid,
}

pub struct CreateBookDto {
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub category: Option<String>,
    pub owner_id: Uuid,
    pub owner_name: String,
}

/// Partial update; `None` leaves the field untouched.
pub struct UpdateBookDto {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub category: Option<String>,
    pub owner_name: Option<String>,
}

pub struct DeleteBookDto {
    pub id: Uuid,
}

pub struct RestockBookDto {
    pub id: Uuid,
    pub amount: i32,
}
