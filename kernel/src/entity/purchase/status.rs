use std::fmt::Display;
use std::str::FromStr;

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::{KernelError, KernelErrorAttachments};

/// Lifecycle of a purchase order. `Pending` is the only non-terminal state;
/// the two terminal states accept no further transition.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PurchaseStatus::Pending)
    }

    pub fn can_transition_to(&self, next: PurchaseStatus) -> bool {
        matches!(
            (self, next),
            (PurchaseStatus::Pending, PurchaseStatus::Completed)
                | (PurchaseStatus::Pending, PurchaseStatus::Cancelled)
        )
    }
}

impl Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = Report<KernelError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(PurchaseStatus::Pending),
            "completed" => Ok(PurchaseStatus::Completed),
            "cancelled" => Ok(PurchaseStatus::Cancelled),
            other => Err(Report::new(KernelError::Validation).attach_field_violation(
                "status",
                format!("unknown status `{other}`, valid: pending, completed, cancelled"),
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::PurchaseStatus;

    #[test]
    fn pending_reaches_both_terminals() {
        assert!(PurchaseStatus::Pending.can_transition_to(PurchaseStatus::Completed));
        assert!(PurchaseStatus::Pending.can_transition_to(PurchaseStatus::Cancelled));
    }

    #[test]
    fn terminal_states_are_frozen() {
        for terminal in [PurchaseStatus::Completed, PurchaseStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in [
                PurchaseStatus::Pending,
                PurchaseStatus::Completed,
                PurchaseStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn no_self_or_backward_transition() {
        assert!(!PurchaseStatus::Pending.can_transition_to(PurchaseStatus::Pending));
        assert!(!PurchaseStatus::Completed.can_transition_to(PurchaseStatus::Pending));
    }

    #[test]
    fn parses_wire_values() {
        assert_eq!(
            "pending".parse::<PurchaseStatus>().unwrap(),
            PurchaseStatus::Pending
        );
        assert!("refunded".parse::<PurchaseStatus>().is_err());
    }
}
