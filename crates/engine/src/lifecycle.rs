//! Quotation & proposal lifecycle: creation, invitation, bidding, acceptance,
//! administrative edits, deletion.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use souk_core::domain::actor::Actor;
use souk_core::domain::freelancer::FreelancerId;
use souk_core::domain::proposal::{Proposal, ProposalId};
use souk_core::domain::quotation::{NewQuotation, Quotation, QuotationId, QuotationPatch};
use souk_core::errors::EngineError;
use souk_core::policy::Policy;
use souk_core::visibility::{can_view_quotation, quotation_scope};
use souk_db::repositories::{
    FreelancerRepository, QuotationRepository, RepositoryError, ServiceRepository,
};

const INVITE_MESSAGE: &str = "Invited by Admin";

/// Role gates for each lifecycle mutation. Constructed explicitly so the
/// wiring is visible at the composition root.
#[derive(Clone, Copy, Debug)]
pub struct LifecyclePolicies {
    pub invite: Policy,
    pub bid: Policy,
    pub accept: Policy,
    pub admin_update: Policy,
    pub delete: Policy,
}

impl Default for LifecyclePolicies {
    fn default() -> Self {
        Self {
            invite: Policy::admin_only(),
            bid: Policy::freelancer_only(),
            accept: Policy::admin_only(),
            admin_update: Policy::admin_only(),
            delete: Policy::admin_only(),
        }
    }
}

/// A quotation together with its proposals, as returned by single reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuotationDetail {
    pub quotation: Quotation,
    pub proposals: Vec<Proposal>,
}

/// Result of an invite call. The duplicate case is an idempotent success,
/// not an error.
#[derive(Clone, Debug, PartialEq)]
pub enum InviteOutcome {
    Invited(Proposal),
    AlreadyInvited(Proposal),
}

pub struct LifecycleManager {
    quotations: Arc<dyn QuotationRepository>,
    services: Arc<dyn ServiceRepository>,
    freelancers: Arc<dyn FreelancerRepository>,
    policies: LifecyclePolicies,
}

impl LifecycleManager {
    pub fn new(
        quotations: Arc<dyn QuotationRepository>,
        services: Arc<dyn ServiceRepository>,
        freelancers: Arc<dyn FreelancerRepository>,
        policies: LifecyclePolicies,
    ) -> Self {
        Self { quotations, services, freelancers, policies }
    }

    /// Submit a new quotation. Open to guests: when `actor` is present its
    /// account id becomes the registered requester, otherwise the quotation
    /// is later matched by email.
    pub async fn create(
        &self,
        actor: Option<&Actor>,
        mut submission: NewQuotation,
    ) -> Result<Quotation, EngineError> {
        self.services
            .find_by_id(submission.service_id)
            .await?
            .ok_or_else(|| EngineError::not_found("service", submission.service_id.0))?;

        submission.requester = actor.and_then(|actor| actor.account_id);

        let quotation = self.quotations.insert(submission).await?;
        info!(
            event_name = "quotation.created",
            quotation_id = quotation.id.0,
            service_id = quotation.service_id.0,
        );
        Ok(quotation)
    }

    /// List quotations visible to the actor.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<Quotation>, EngineError> {
        let scope = quotation_scope(actor)?;
        Ok(self.quotations.list(&scope).await?)
    }

    /// Read one quotation with its proposals, enforcing the visibility rule.
    pub async fn read(
        &self,
        actor: &Actor,
        id: QuotationId,
    ) -> Result<QuotationDetail, EngineError> {
        let quotation = self
            .quotations
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("quotation", id.0))?;
        let proposals = self.quotations.proposals_for(id).await?;

        if !can_view_quotation(actor, &quotation, &proposals) {
            return Err(EngineError::forbidden(
                "you do not have permission to view this quotation",
            ));
        }
        Ok(QuotationDetail { quotation, proposals })
    }

    /// Invite a freelancer to bid. Creates a pending zero-price proposal and
    /// opens the quotation; inviting the same pair twice is an idempotent
    /// already-invited result.
    pub async fn invite(
        &self,
        actor: &Actor,
        quotation_id: QuotationId,
        freelancer_id: FreelancerId,
    ) -> Result<InviteOutcome, EngineError> {
        self.policies.invite.authorize(actor)?;

        self.quotations
            .find_by_id(quotation_id)
            .await?
            .ok_or_else(|| EngineError::not_found("quotation", quotation_id.0))?;
        self.freelancers
            .find_by_id(freelancer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("freelancer", freelancer_id.0))?;

        if let Some(existing) = self.quotations.find_proposal(quotation_id, freelancer_id).await? {
            return Ok(InviteOutcome::AlreadyInvited(existing));
        }

        match self.quotations.create_invitation(quotation_id, freelancer_id, INVITE_MESSAGE).await
        {
            Ok(proposal) => {
                info!(
                    event_name = "quotation.invited",
                    quotation_id = quotation_id.0,
                    freelancer_id = freelancer_id.0,
                    proposal_id = proposal.id.0,
                );
                Ok(InviteOutcome::Invited(proposal))
            }
            // A concurrent invite won the unique index; surface it as the
            // same idempotent result.
            Err(RepositoryError::Conflict(_)) => {
                let existing = self
                    .quotations
                    .find_proposal(quotation_id, freelancer_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("proposal", quotation_id.0))?;
                Ok(InviteOutcome::AlreadyInvited(existing))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Record an invited freelancer's bid. Requires a prior invitation; the
    /// quotation status is unchanged by a bid.
    pub async fn bid(
        &self,
        actor: &Actor,
        quotation_id: QuotationId,
        price: Decimal,
        message: Option<String>,
    ) -> Result<Proposal, EngineError> {
        self.policies.bid.authorize(actor)?;
        let freelancer_id = actor.freelancer_id.ok_or_else(|| {
            EngineError::forbidden("account is not linked to a freelancer profile")
        })?;
        if price <= Decimal::ZERO {
            return Err(EngineError::validation("bid price must be positive"));
        }

        self.quotations
            .find_by_id(quotation_id)
            .await?
            .ok_or_else(|| EngineError::not_found("quotation", quotation_id.0))?;

        let invitation = self
            .quotations
            .find_proposal(quotation_id, freelancer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("invitation", quotation_id.0))?;

        let proposal = self.quotations.record_bid(invitation.id, price, message).await?;
        info!(
            event_name = "quotation.bid",
            quotation_id = quotation_id.0,
            proposal_id = proposal.id.0,
            freelancer_id = freelancer_id.0,
        );
        Ok(proposal)
    }

    /// Accept a proposal: the proposal becomes ACCEPTED, the quotation is
    /// assigned to it. Rival proposals are left untouched. A concurrent
    /// accept that loses the conditional update gets `Conflict`.
    pub async fn accept(
        &self,
        actor: &Actor,
        quotation_id: QuotationId,
        proposal_id: ProposalId,
    ) -> Result<Quotation, EngineError> {
        self.policies.accept.authorize(actor)?;

        self.quotations
            .find_by_id(quotation_id)
            .await?
            .ok_or_else(|| EngineError::not_found("quotation", quotation_id.0))?;
        let proposal = self
            .quotations
            .find_proposal_by_id(proposal_id)
            .await?
            .ok_or_else(|| EngineError::not_found("proposal", proposal_id.0))?;
        if proposal.quotation_id != quotation_id {
            return Err(EngineError::not_found("proposal", proposal_id.0));
        }

        self.quotations.accept_proposal(quotation_id, proposal_id).await?;
        info!(
            event_name = "quotation.accepted",
            quotation_id = quotation_id.0,
            proposal_id = proposal_id.0,
        );

        self.quotations
            .find_by_id(quotation_id)
            .await?
            .ok_or_else(|| EngineError::not_found("quotation", quotation_id.0))
    }

    /// Administrative partial update. A supplied status is a free-form
    /// overwrite; a positive selected proposal id must belong to the
    /// quotation and auto-promotes a still-open quotation to ASSIGNED.
    pub async fn admin_update(
        &self,
        actor: &Actor,
        quotation_id: QuotationId,
        patch: QuotationPatch,
    ) -> Result<Quotation, EngineError> {
        self.policies.admin_update.authorize(actor)?;

        let quotation = self
            .quotations
            .find_by_id(quotation_id)
            .await?
            .ok_or_else(|| EngineError::not_found("quotation", quotation_id.0))?;

        if let Some(proposal_id) = patch.selected_proposal_id.filter(|id| *id > 0) {
            let proposal = self
                .quotations
                .find_proposal_by_id(ProposalId(proposal_id))
                .await?
                .ok_or_else(|| EngineError::not_found("proposal", proposal_id))?;
            if proposal.quotation_id != quotation_id {
                return Err(EngineError::not_found("proposal", proposal_id));
            }
        }

        let patched = quotation.apply_patch(&patch);
        self.quotations.save(&patched).await?;
        info!(
            event_name = "quotation.admin_updated",
            quotation_id = quotation_id.0,
            status = patched.status.as_str(),
        );
        Ok(patched)
    }

    /// Delete a quotation and all of its proposals.
    pub async fn delete(&self, actor: &Actor, id: QuotationId) -> Result<(), EngineError> {
        self.policies.delete.authorize(actor)?;

        self.quotations
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("quotation", id.0))?;

        self.quotations.delete(id).await?;
        info!(event_name = "quotation.deleted", quotation_id = id.0);
        Ok(())
    }
}
