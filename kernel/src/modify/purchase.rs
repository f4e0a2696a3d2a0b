use vodca::References;

use crate::database::Transaction;
use crate::entity::{CompletedAt, Purchase, PurchaseId, PurchaseStatus, TransactionId};
use crate::KernelError;

/// Target state of a `pending → terminal` step. `completed_at` and
/// `transaction_id` only apply when moving to `Completed`.
#[derive(Debug, Clone, References)]
pub struct PurchaseTransition {
    status: PurchaseStatus,
    completed_at: Option<CompletedAt<Purchase>>,
    transaction_id: Option<TransactionId>,
}

impl PurchaseTransition {
    pub fn new(
        status: PurchaseStatus,
        completed_at: Option<CompletedAt<Purchase>>,
        transaction_id: Option<TransactionId>,
    ) -> Self {
        Self {
            status,
            completed_at,
            transaction_id,
        }
    }
}

#[async_trait::async_trait]
pub trait PurchaseModifier<Connection: Transaction>: 'static + Sync + Send {
    async fn create(
        &self,
        con: &mut Connection,
        purchase: &Purchase,
    ) -> error_stack::Result<(), KernelError>;
    /// Applies a transition guarded on the row still being `pending`; the
    /// store decides atomically. A raced-away or terminal row reports
    /// `InvalidState`, an absent one `NotFound`.
    async fn transition(
        &self,
        con: &mut Connection,
        id: &PurchaseId,
        transition: &PurchaseTransition,
    ) -> error_stack::Result<Purchase, KernelError>;
}

pub trait DependOnPurchaseModifier<Connection: Transaction>: 'static + Sync + Send {
    type PurchaseModifier: PurchaseModifier<Connection>;
    fn purchase_modifier(&self) -> &Self::PurchaseModifier;
}
