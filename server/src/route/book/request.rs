use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use application::transfer::{CreateBookDto, DeleteBookDto, GetBookDto, UpdateBookDto};
use kernel::interface::query::{BookFilter, BookSortKey, SortOrder};
use kernel::prelude::entity::{BookCategory, OwnerId, SelectLimit, SelectOffset};

use crate::controller::Intake;

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    title: String,
    description: Option<String>,
    price: Decimal,
    quantity: i32,
    category: Option<String>,
    owner_id: Uuid,
    owner_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    title: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    quantity: Option<i32>,
    category: Option<String>,
    owner_name: Option<String>,
}

#[derive(Debug)]
pub struct GetRequest {
    id: Uuid,
}

impl GetRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug)]
pub struct DeleteRequest {
    id: Uuid,
}

impl DeleteRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug)]
pub struct PurchasesRequest {
    id: Uuid,
}

impl PurchasesRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

// I want to use primitive type(i32) in these fields, but default attribute not supported for literals(https://github.com/serde-rs/serde/issues/368)
#[derive(Debug, Deserialize)]
pub struct ListRequest {
    search: Option<String>,
    category: Option<String>,
    owner_id: Option<Uuid>,
    #[serde(default)]
    available_only: bool,
    price_min: Option<Decimal>,
    price_max: Option<Decimal>,
    sort_by: Option<String>,
    sort_order: Option<String>,
    #[serde(default)]
    limit: SelectLimit,
    #[serde(default)]
    offset: SelectOffset,
}

// Unrecognized sort fields fall back to the defaults rather than failing the
// request.
fn sort_key(value: Option<&str>) -> BookSortKey {
    match value {
        Some("price") => BookSortKey::Price,
        Some("title") => BookSortKey::Title,
        Some("quantity") => BookSortKey::Quantity,
        _ => BookSortKey::CreatedAt,
    }
}

fn sort_order(value: Option<&str>) -> SortOrder {
    match value {
        Some("asc") | Some("ASC") => SortOrder::Asc,
        _ => SortOrder::Desc,
    }
}

pub struct Transformer;

impl Intake<CreateRequest> for Transformer {
    type To = CreateBookDto;
    fn emit(&self, input: CreateRequest) -> Self::To {
        CreateBookDto {
            title: input.title,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
            category: input.category,
            owner_id: input.owner_id,
            owner_name: input.owner_name,
        }
    }
}

impl Intake<(Uuid, UpdateRequest)> for Transformer {
    type To = UpdateBookDto;
    fn emit(&self, input: (Uuid, UpdateRequest)) -> Self::To {
        let (id, input) = input;
        UpdateBookDto {
            id,
            title: input.title,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
            category: input.category,
            owner_name: input.owner_name,
        }
    }
}

impl Intake<GetRequest> for Transformer {
    type To = GetBookDto;
    fn emit(&self, input: GetRequest) -> Self::To {
        GetBookDto { id: input.id }
    }
}

impl Intake<DeleteRequest> for Transformer {
    type To = DeleteBookDto;
    fn emit(&self, input: DeleteRequest) -> Self::To {
        DeleteBookDto { id: input.id }
    }
}

impl Intake<PurchasesRequest> for Transformer {
    type To = Uuid;
    fn emit(&self, input: PurchasesRequest) -> Self::To {
        input.id
    }
}

impl Intake<ListRequest> for Transformer {
    type To = BookFilter;
    fn emit(&self, input: ListRequest) -> Self::To {
        BookFilter {
            search: input.search,
            category: input.category.map(BookCategory::new),
            owner_id: input.owner_id.map(OwnerId::new),
            available_only: input.available_only,
            price_min: input.price_min,
            price_max: input.price_max,
            sort_by: sort_key(input.sort_by.as_deref()),
            sort_order: sort_order(input.sort_order.as_deref()),
            limit: input.limit,
            offset: input.offset,
        }
    }
}
