//! Authenticated caller and the membership gate.
//!
//! Credentials are checked upstream; services receive an `Identity` that is
//! already trusted and only decide whether its membership lets it through.

use academy_core::model::LearnerId;
use chrono::{DateTime, Utc};

use crate::Clock;
use crate::error::ForbiddenReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Member,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    learner_id: LearnerId,
    role: Role,
    membership_expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// A member whose access ends at `expires_at`; `None` is a lifetime membership.
    #[must_use]
    pub fn member(learner_id: LearnerId, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            learner_id,
            role: Role::Member,
            membership_expires_at: expires_at,
        }
    }

    #[must_use]
    pub fn admin(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            role: Role::Admin,
            membership_expires_at: None,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[must_use]
    pub fn membership_expires_at(&self) -> Option<DateTime<Utc>> {
        self.membership_expires_at
    }

    /// Admins always pass; members pass until their expiry instant.
    #[must_use]
    pub fn has_active_membership(&self, now: DateTime<Utc>) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Member => self.membership_expires_at.is_none_or(|expiry| expiry > now),
        }
    }
}

pub(crate) fn require_membership(identity: &Identity, clock: Clock) -> Result<(), ForbiddenReason> {
    if identity.has_active_membership(clock.now()) {
        Ok(())
    } else {
        tracing::warn!(learner = %identity.learner_id(), "membership inactive");
        Err(ForbiddenReason::MembershipInactive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn lifetime_members_always_pass() {
        let identity = Identity::member(LearnerId::random(), None);
        assert!(identity.has_active_membership(fixed_now()));
    }

    #[test]
    fn expiry_is_exclusive() {
        let now = fixed_now();
        let learner = LearnerId::random();
        assert!(Identity::member(learner, Some(now + Duration::seconds(1))).has_active_membership(now));
        assert!(!Identity::member(learner, Some(now)).has_active_membership(now));
        assert!(
            !Identity::member(learner, Some(now - Duration::days(3))).has_active_membership(now)
        );
    }

    #[test]
    fn admins_bypass_the_gate() {
        let admin = Identity::admin(LearnerId::random());
        assert!(admin.is_admin());
        assert_eq!(require_membership(&admin, Clock::fixed(fixed_now())), Ok(()));
    }

    #[test]
    fn lapsed_member_is_forbidden() {
        let lapsed = Identity::member(LearnerId::random(), Some(fixed_now() - Duration::hours(1)));
        assert_eq!(
            require_membership(&lapsed, Clock::fixed(fixed_now())),
            Err(ForbiddenReason::MembershipInactive)
        );
    }
}
