use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use application::transfer::{BulkCompletionDto, PurchaseDto};
use kernel::interface::query::{BuyerStatistics, PlatformStatistics, SellerStatistics};
use kernel::prelude::entity::PurchaseStatus;

use crate::controller::Exhaust;

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    id: Uuid,
    book_id: Uuid,
    buyer_id: Uuid,
    buyer_name: String,
    buyer_email: String,
    quantity: i32,
    price: Decimal,
    total_price: Decimal,
    status: PurchaseStatus,
    notes: Option<String>,
    payment_method: Option<String>,
    transaction_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    completed_at: Option<OffsetDateTime>,
}

impl From<PurchaseDto> for PurchaseResponse {
    fn from(value: PurchaseDto) -> Self {
        Self {
            id: value.id,
            book_id: value.book_id,
            buyer_id: value.buyer_id,
            buyer_name: value.buyer_name,
            buyer_email: value.buyer_email,
            quantity: value.quantity,
            price: value.price,
            total_price: value.total_price,
            status: value.status,
            notes: value.notes,
            payment_method: value.payment_method,
            transaction_id: value.transaction_id,
            created_at: value.created_at,
            completed_at: value.completed_at,
        }
    }
}

impl IntoResponse for PurchaseResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct BulkCompletionErrorResponse {
    id: Uuid,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct BulkCompletionResponse {
    completed: Vec<PurchaseResponse>,
    errors: Vec<BulkCompletionErrorResponse>,
}

#[derive(Debug, Serialize)]
pub struct BuyerStatisticsResponse {
    total_purchases: i64,
    total_books: i64,
    total_spent: Decimal,
    completed_purchases: i64,
    pending_purchases: i64,
}

#[derive(Debug, Serialize)]
pub struct SellerStatisticsResponse {
    total_sales: i64,
    total_books_sold: i64,
    total_revenue: Decimal,
    completed_sales: i64,
    pending_sales: i64,
}

#[derive(Debug, Serialize)]
pub struct PlatformStatisticsResponse {
    total_purchases: i64,
    total_books: i64,
    total_revenue: Decimal,
    completed_purchases: i64,
    pending_purchases: i64,
    cancelled_purchases: i64,
    total_buyers: i64,
}

pub struct Presenter;

impl Exhaust<PurchaseDto> for Presenter {
    type To = PurchaseResponse;
    fn emit(&self, input: PurchaseDto) -> Self::To {
        PurchaseResponse::from(input)
    }
}

impl Exhaust<Vec<PurchaseDto>> for Presenter {
    type To = Json<Vec<PurchaseResponse>>;
    fn emit(&self, input: Vec<PurchaseDto>) -> Self::To {
        let result = input
            .into_iter()
            .map(PurchaseResponse::from)
            .collect::<Vec<_>>();

        Json::from(result)
    }
}

impl Exhaust<BulkCompletionDto> for Presenter {
    type To = Json<BulkCompletionResponse>;
    fn emit(&self, input: BulkCompletionDto) -> Self::To {
        Json::from(BulkCompletionResponse {
            completed: input
                .completed
                .into_iter()
                .map(PurchaseResponse::from)
                .collect(),
            errors: input
                .errors
                .into_iter()
                .map(|error| BulkCompletionErrorResponse {
                    id: error.id,
                    message: error.message,
                })
                .collect(),
        })
    }
}

impl Exhaust<BuyerStatistics> for Presenter {
    type To = Json<BuyerStatisticsResponse>;
    fn emit(&self, input: BuyerStatistics) -> Self::To {
        Json::from(BuyerStatisticsResponse {
            total_purchases: input.total_purchases,
            total_books: input.total_books,
            total_spent: input.total_spent,
            completed_purchases: input.completed_purchases,
            pending_purchases: input.pending_purchases,
        })
    }
}

impl Exhaust<SellerStatistics> for Presenter {
    type To = Json<SellerStatisticsResponse>;
    fn emit(&self, input: SellerStatistics) -> Self::To {
        Json::from(SellerStatisticsResponse {
            total_sales: input.total_sales,
            total_books_sold: input.total_books_sold,
            total_revenue: input.total_revenue,
            completed_sales: input.completed_sales,
            pending_sales: input.pending_sales,
        })
    }
}

impl Exhaust<PlatformStatistics> for Presenter {
    type To = Json<PlatformStatisticsResponse>;
    fn emit(&self, input: PlatformStatistics) -> Self::To {
        Json::from(PlatformStatisticsResponse {
            total_purchases: input.total_purchases,
            total_books: input.total_books,
            total_revenue: input.total_revenue,
            completed_purchases: input.completed_purchases,
            pending_purchases: input.pending_purchases,
            cancelled_purchases: input.cancelled_purchases,
            total_buyers: input.total_buyers,
        })
    }
}
