// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ulid::Ulid;

use crate::InvalidTransitionError;

/// A link between a local user and an account on an external identity
/// provider, which may still be waiting for its confirmation token to be used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedLogin {
    pub id: Ulid,
    pub user_id: Ulid,
    pub issuer_id: Ulid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Ulid>,
    pub confirm_token_expires_at: Option<DateTime<Utc>>,
}

impl LinkedLogin {
    /// The expiry of the pending confirmation token, if any
    ///
    /// An expiry at the Unix epoch stands for "no token" and is reported as
    /// [`None`].
    #[must_use]
    pub fn confirmation_expiry(&self) -> Option<DateTime<Utc>> {
        self.confirm_token_expires_at
            .filter(|expires_at| *expires_at != DateTime::UNIX_EPOCH)
    }

    /// Whether this link still waits for its confirmation token to be used
    #[must_use]
    pub fn is_pending_confirmation(&self) -> bool {
        self.confirmation_expiry().is_some()
    }

    /// Whether the confirmation token of this link expired before `now`
    ///
    /// Links without a pending confirmation token never expire.
    #[must_use]
    pub fn is_confirmation_expired(&self, now: DateTime<Utc>) -> bool {
        match self.confirmation_expiry() {
            Some(expires_at) => expires_at < now,
            None => false,
        }
    }

    /// Mark the confirmation token of this link as used
    ///
    /// # Errors
    ///
    /// Returns an error if the link was not waiting for a confirmation
    pub fn confirm(
        mut self,
        confirmed_at: DateTime<Utc>,
        confirmed_by: Ulid,
    ) -> Result<Self, InvalidTransitionError> {
        if !self.is_pending_confirmation() {
            return Err(InvalidTransitionError);
        }

        self.confirm_token_expires_at = None;
        self.modified_at = Some(confirmed_at);
        self.modified_by = Some(confirmed_by);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::clock::{Clock, MockClock};

    fn link(confirm_token_expires_at: Option<DateTime<Utc>>) -> LinkedLogin {
        let clock = MockClock::default();
        LinkedLogin {
            id: Ulid::nil(),
            user_id: Ulid::nil(),
            issuer_id: Ulid::nil(),
            username: "alice".to_owned(),
            email: "email@example.com".to_owned(),
            created_at: clock.now(),
            modified_at: None,
            modified_by: None,
            confirm_token_expires_at,
        }
    }

    #[test]
    fn test_confirmation_expiry() {
        let clock = MockClock::default();
        let now = clock.now();

        let expired = link(Some(now - Duration::minutes(1)));
        assert!(expired.is_pending_confirmation());
        assert!(expired.is_confirmation_expired(now));

        let future = link(Some(now + Duration::minutes(40)));
        assert!(future.is_pending_confirmation());
        assert!(!future.is_confirmation_expired(now));

        // Expiring exactly now is not expired yet
        let boundary = link(Some(now));
        assert!(!boundary.is_confirmation_expired(now));
        assert!(boundary.is_confirmation_expired(now + Duration::milliseconds(1)));

        let confirmed = link(None);
        assert!(!confirmed.is_pending_confirmation());
        assert!(!confirmed.is_confirmation_expired(now + Duration::days(365 * 100)));
    }

    #[test]
    fn test_confirm() {
        let clock = MockClock::default();
        let now = clock.now();
        let confirmer = Ulid::from_parts(1, 1);

        let pending = link(Some(now + Duration::minutes(40)));
        let confirmed = pending.confirm(now, confirmer).unwrap();
        assert!(!confirmed.is_pending_confirmation());
        assert_eq!(confirmed.modified_at, Some(now));
        assert_eq!(confirmed.modified_by, Some(confirmer));

        // Confirming twice is not a valid transition
        assert!(confirmed.confirm(now, confirmer).is_err());
    }

    #[test]
    fn test_epoch_expiry_means_no_token() {
        let clock = MockClock::default();
        let now = clock.now();

        let sentinel = link(Some(DateTime::UNIX_EPOCH));
        assert_eq!(sentinel.confirmation_expiry(), None);
        assert!(!sentinel.is_pending_confirmation());
        assert!(!sentinel.is_confirmation_expired(now));
        assert!(sentinel.confirm(now, Ulid::from_parts(1, 1)).is_err());

        // A millisecond after the epoch is a real, long expired, token
        let ancient = link(Some(DateTime::UNIX_EPOCH + Duration::milliseconds(1)));
        assert!(ancient.is_pending_confirmation());
        assert!(ancient.is_confirmation_expired(now));
    }
}
