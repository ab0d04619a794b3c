use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::freelancer::FreelancerId;
use crate::errors::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Client,
    Freelancer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Client => "client",
            Self::Freelancer => "freelancer",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "guest" => Some(Self::Guest),
            "client" => Some(Self::Client),
            "freelancer" => Some(Self::Freelancer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The resolved identity of the caller making a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub account_id: Option<AccountId>,
    pub email: Option<String>,
    pub role: Role,
    pub freelancer_id: Option<FreelancerId>,
}

impl Actor {
    pub fn client(account_id: AccountId, email: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id),
            email: Some(email.into()),
            role: Role::Client,
            freelancer_id: None,
        }
    }

    pub fn admin(account_id: AccountId, email: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id),
            email: Some(email.into()),
            role: Role::Admin,
            freelancer_id: None,
        }
    }

    pub fn freelancer(
        account_id: AccountId,
        email: impl Into<String>,
        freelancer_id: Option<FreelancerId>,
    ) -> Self {
        Self {
            account_id: Some(account_id),
            email: Some(email.into()),
            role: Role::Freelancer,
            freelancer_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn email_matches(&self, email: &str) -> bool {
        self.email.as_deref().is_some_and(|own| own.eq_ignore_ascii_case(email))
    }
}

/// External collaborator that maps a presented credential to an `Actor`.
///
/// An unknown credential resolves to `Ok(None)`; callers decide whether the
/// operation tolerates an absent actor (guest submission does) or fails with
/// `Unauthenticated`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<Option<Actor>, EngineError>;
}
