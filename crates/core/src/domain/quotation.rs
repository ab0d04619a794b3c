use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::AccountId;
use crate::domain::product::ServiceId;
use crate::domain::proposal::ProposalId;
use crate::errors::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotationId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotationStatus {
    Pending,
    Open,
    Assigned,
    Completed,
    Cancelled,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Open => "OPEN",
            Self::Assigned => "ASSIGNED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "OPEN" => Some(Self::Open),
            "ASSIGNED" => Some(Self::Assigned),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Contact block submitted with a quotation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
}

/// A client's request for a quoted price on a service, tracked through the
/// bidding lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub id: QuotationId,
    pub service_id: ServiceId,
    /// Registered requester, when the submission was authenticated. Guest
    /// submissions leave this unset and are later matched by email.
    pub user_id: Option<AccountId>,
    pub contact: QuotationContact,
    pub description: String,
    pub preferred_timeline: Option<String>,
    pub status: QuotationStatus,
    pub selected_proposal_id: Option<ProposalId>,
    pub created_at: DateTime<Utc>,
}

/// Submission payload for a new quotation. No role restriction: guests
/// submit with `requester` unset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuotation {
    pub service_id: ServiceId,
    pub requester: Option<AccountId>,
    pub contact: QuotationContact,
    pub description: String,
    pub preferred_timeline: Option<String>,
}

/// Admin partial update. Only supplied fields overwrite; a supplied
/// `selected_proposal_id` of zero (or negative) clears the selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationPatch {
    pub status: Option<QuotationStatus>,
    pub selected_proposal_id: Option<i64>,
}

impl Quotation {
    /// Forward-only lifecycle guard. Cancellation is reachable from any
    /// non-terminal state; everything else moves strictly forward.
    pub fn can_transition_to(&self, next: QuotationStatus) -> bool {
        matches!(
            (self.status, next),
            (QuotationStatus::Pending, QuotationStatus::Open)
                | (QuotationStatus::Pending, QuotationStatus::Assigned)
                | (QuotationStatus::Open, QuotationStatus::Assigned)
                | (QuotationStatus::Assigned, QuotationStatus::Completed)
                | (QuotationStatus::Pending, QuotationStatus::Cancelled)
                | (QuotationStatus::Open, QuotationStatus::Cancelled)
                | (QuotationStatus::Assigned, QuotationStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: QuotationStatus) -> Result<(), EngineError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }
        Err(EngineError::Conflict(format!(
            "quotation cannot move from {} to {}",
            self.status.as_str(),
            next.as_str()
        )))
    }

    /// Pure merge of an admin patch into a new quotation state.
    ///
    /// The status overwrite is the unconstrained admin override and bypasses
    /// the lifecycle guard. The caller must have validated that a positive
    /// `selected_proposal_id` references a proposal of this quotation.
    pub fn apply_patch(&self, patch: &QuotationPatch) -> Quotation {
        let mut next = self.clone();

        if let Some(status) = patch.status {
            next.status = status;
        }

        match patch.selected_proposal_id {
            Some(id) if id > 0 => {
                next.selected_proposal_id = Some(ProposalId(id));
                // Selecting a proposal promotes a still-open quotation.
                if matches!(next.status, QuotationStatus::Pending | QuotationStatus::Open) {
                    next.status = QuotationStatus::Assigned;
                }
            }
            Some(_) => next.selected_proposal_id = None,
            None => {}
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::product::ServiceId;
    use crate::domain::proposal::ProposalId;

    use super::{Quotation, QuotationContact, QuotationId, QuotationPatch, QuotationStatus};

    fn quotation(status: QuotationStatus) -> Quotation {
        Quotation {
            id: QuotationId(1),
            service_id: ServiceId(1),
            user_id: None,
            contact: QuotationContact {
                first_name: "Nadia".to_string(),
                last_name: "Ben Salah".to_string(),
                email: "nadia@example.com".to_string(),
                phone: "+216 20 000 000".to_string(),
                address: "12 rue des Oliviers".to_string(),
                city: "Tunis".to_string(),
                postal_code: Some("1002".to_string()),
            },
            description: "Garden terrace renovation".to_string(),
            preferred_timeline: None,
            status,
            selected_proposal_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let mut q = quotation(QuotationStatus::Pending);
        q.transition_to(QuotationStatus::Open).expect("pending -> open");
        q.transition_to(QuotationStatus::Assigned).expect("open -> assigned");
        q.transition_to(QuotationStatus::Completed).expect("assigned -> completed");

        let error = q.transition_to(QuotationStatus::Open).expect_err("completed -> open");
        assert!(matches!(error, crate::errors::EngineError::Conflict(_)));
    }

    #[test]
    fn cancellation_is_reachable_sideways_but_terminal() {
        let mut q = quotation(QuotationStatus::Open);
        q.transition_to(QuotationStatus::Cancelled).expect("open -> cancelled");
        assert!(q.transition_to(QuotationStatus::Open).is_err());
    }

    #[test]
    fn patch_selecting_a_proposal_auto_promotes_open_quotations() {
        let q = quotation(QuotationStatus::Open);
        let patched =
            q.apply_patch(&QuotationPatch { status: None, selected_proposal_id: Some(9) });

        assert_eq!(patched.selected_proposal_id, Some(ProposalId(9)));
        assert_eq!(patched.status, QuotationStatus::Assigned);
    }

    #[test]
    fn patch_with_zero_selection_clears_without_promotion() {
        let mut q = quotation(QuotationStatus::Assigned);
        q.selected_proposal_id = Some(ProposalId(4));

        let patched =
            q.apply_patch(&QuotationPatch { status: None, selected_proposal_id: Some(0) });

        assert_eq!(patched.selected_proposal_id, None);
        assert_eq!(patched.status, QuotationStatus::Assigned);
    }

    #[test]
    fn patch_status_overwrite_is_an_admin_override() {
        let q = quotation(QuotationStatus::Assigned);
        let patched = q.apply_patch(&QuotationPatch {
            status: Some(QuotationStatus::Open),
            selected_proposal_id: None,
        });

        // Deliberately bypasses the forward-only guard.
        assert_eq!(patched.status, QuotationStatus::Open);
    }

    #[test]
    fn patch_without_fields_changes_nothing() {
        let q = quotation(QuotationStatus::Pending);
        assert_eq!(q.apply_patch(&QuotationPatch::default()), q);
    }

    #[test]
    fn status_encoding_round_trips() {
        for status in [
            QuotationStatus::Pending,
            QuotationStatus::Open,
            QuotationStatus::Assigned,
            QuotationStatus::Completed,
            QuotationStatus::Cancelled,
        ] {
            assert_eq!(QuotationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(QuotationStatus::parse("ARCHIVED"), None);
    }
}
