use std::fmt::Display;

use error_stack::{Context, Report};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::entity::PurchaseStatus;

#[derive(Debug)]
pub enum KernelError {
    Validation,
    NotFound,
    BookNotAvailable,
    PriceMismatch,
    InvalidState,
    Timeout,
    Internal,
}

impl Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelError::Validation => write!(f, "Invalid input"),
            KernelError::NotFound => write!(f, "Record not found"),
            KernelError::BookNotAvailable => write!(f, "Book not available in requested quantity"),
            KernelError::PriceMismatch => {
                write!(f, "Purchase price does not match current book price")
            }
            KernelError::InvalidState => write!(f, "Illegal state transition"),
            KernelError::Timeout => write!(f, "Process timed out"),
            KernelError::Internal => write!(f, "Internal kernel error"),
        }
    }
}

impl Context for KernelError {}

/// Structured failure details carried as printable report attachments so the
/// HTTP layer can render an actionable message.
#[derive(Debug)]
pub struct FieldViolation {
    field: &'static str,
    reason: String,
}

impl Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "field `{}`: {}", self.field, self.reason)
    }
}

#[derive(Debug)]
pub struct StockShortage {
    available: i32,
    requested: i32,
}

impl Display for StockShortage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "available: {}, requested: {}",
            self.available, self.requested
        )
    }
}

#[derive(Debug)]
pub struct PriceDeviation {
    current: Decimal,
    proposed: Decimal,
}

impl Display for PriceDeviation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "current: {:.2}, provided: {:.2}",
            self.current, self.proposed
        )
    }
}

#[derive(Debug)]
pub struct StatusConflict {
    current: PurchaseStatus,
    requested: PurchaseStatus,
}

impl Display for StatusConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot transition from `{}` to `{}`",
            self.current, self.requested
        )
    }
}

#[derive(Debug)]
pub struct MissingRecord {
    entity: &'static str,
    id: Uuid,
}

impl Display for MissingRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} `{}` does not exist", self.entity, self.id)
    }
}

/// Collects the printable detail messages a report carries, most recently
/// attached first. The HTTP layer folds these into the client-facing
/// message.
pub fn report_details(report: &Report<KernelError>) -> Vec<String> {
    let mut details = Vec::new();
    for frame in report.frames() {
        if let Some(violation) = frame.downcast_ref::<FieldViolation>() {
            details.push(violation.to_string());
        } else if let Some(shortage) = frame.downcast_ref::<StockShortage>() {
            details.push(shortage.to_string());
        } else if let Some(deviation) = frame.downcast_ref::<PriceDeviation>() {
            details.push(deviation.to_string());
        } else if let Some(conflict) = frame.downcast_ref::<StatusConflict>() {
            details.push(conflict.to_string());
        } else if let Some(missing) = frame.downcast_ref::<MissingRecord>() {
            details.push(missing.to_string());
        } else if let Some(message) = frame.downcast_ref::<String>() {
            details.push(message.clone());
        }
    }
    details
}

pub trait KernelErrorAttachments: Sized {
    fn attach_field_violation(self, field: &'static str, reason: impl Into<String>) -> Self;
    fn attach_stock_shortage(self, available: i32, requested: i32) -> Self;
    fn attach_price_deviation(self, current: Decimal, proposed: Decimal) -> Self;
    fn attach_status_conflict(self, current: PurchaseStatus, requested: PurchaseStatus) -> Self;
    fn attach_missing_record(self, entity: &'static str, id: Uuid) -> Self;
}

impl KernelErrorAttachments for Report<KernelError> {
    fn attach_field_violation(self, field: &'static str, reason: impl Into<String>) -> Self {
        self.attach_printable(FieldViolation {
            field,
            reason: reason.into(),
        })
    }

    fn attach_stock_shortage(self, available: i32, requested: i32) -> Self {
        self.attach_printable(StockShortage {
            available,
            requested,
        })
    }

    fn attach_price_deviation(self, current: Decimal, proposed: Decimal) -> Self {
        self.attach_printable(PriceDeviation { current, proposed })
    }

    fn attach_status_conflict(self, current: PurchaseStatus, requested: PurchaseStatus) -> Self {
        self.attach_printable(StatusConflict { current, requested })
    }

    fn attach_missing_record(self, entity: &'static str, id: Uuid) -> Self {
        self.attach_printable(MissingRecord { entity, id })
    }
}
