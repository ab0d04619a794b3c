use crate::domain::actor::{Actor, Role};
use crate::errors::EngineError;

/// Stateless role-to-action authorization policy: a set of allowed roles,
/// explicitly constructed and injected into each engine operation. Ownership
/// checks are resource-scoped and handled by the visibility rules, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Policy {
    allowed: &'static [Role],
}

impl Policy {
    pub const fn new(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub const fn admin_only() -> Self {
        Self::new(&[Role::Admin])
    }

    pub const fn freelancer_only() -> Self {
        Self::new(&[Role::Freelancer])
    }

    pub const fn any_authenticated() -> Self {
        Self::new(&[Role::Client, Role::Freelancer, Role::Admin])
    }

    pub fn authorize(&self, actor: &Actor) -> Result<(), EngineError> {
        if self.allowed.contains(&actor.role) {
            return Ok(());
        }
        Err(EngineError::forbidden("you do not have permission to perform this action"))
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::actor::{AccountId, Actor};
    use crate::errors::EngineError;

    use super::Policy;

    #[test]
    fn admin_only_denies_clients_and_freelancers() {
        let policy = Policy::admin_only();
        assert!(policy.authorize(&Actor::admin(AccountId(1), "a@souk.test")).is_ok());

        let denied = policy.authorize(&Actor::client(AccountId(2), "c@souk.test"));
        assert!(matches!(denied, Err(EngineError::Forbidden(_))));

        let denied = policy.authorize(&Actor::freelancer(AccountId(3), "f@souk.test", None));
        assert!(matches!(denied, Err(EngineError::Forbidden(_))));
    }

    #[test]
    fn freelancer_only_admits_the_freelancer_role_regardless_of_profile_link() {
        // The linked-profile requirement is a separate engine check; the
        // policy object only gates on role.
        let policy = Policy::freelancer_only();
        assert!(policy.authorize(&Actor::freelancer(AccountId(3), "f@souk.test", None)).is_ok());
        assert!(policy.authorize(&Actor::admin(AccountId(1), "a@souk.test")).is_err());
    }
}
