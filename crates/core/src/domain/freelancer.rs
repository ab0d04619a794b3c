use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FreelancerId(pub i64);

/// Directory entry for a freelancer eligible to receive invitations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freelancer {
    pub id: FreelancerId,
    pub name: String,
    pub email: String,
}
