// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Repository to interact with [`LinkedLogin`]s

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oalink_data_model::LinkedLogin;
use rand_core::RngCore;
use ulid::Ulid;

use crate::{Clock, repository_impl};

/// Filter parameters for listing and counting linked logins
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LinkedLoginFilter<'a> {
    user: Option<Ulid>,
    issuer: Option<Ulid>,
    email: Option<&'a str>,
    pending_confirmation: Option<bool>,
    confirmation_expired_before: Option<DateTime<Utc>>,
}

impl<'a> LinkedLoginFilter<'a> {
    /// Create a new [`LinkedLoginFilter`] with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the local user who owns the linked logins
    #[must_use]
    pub const fn for_user(mut self, user_id: Ulid) -> Self {
        self.user = Some(user_id);
        self
    }

    /// Get the user filter
    ///
    /// Returns [`None`] if no filter was set
    #[must_use]
    pub const fn user(&self) -> Option<Ulid> {
        self.user
    }

    /// Set the external identity provider of the linked logins
    #[must_use]
    pub const fn for_issuer(mut self, issuer_id: Ulid) -> Self {
        self.issuer = Some(issuer_id);
        self
    }

    /// Get the issuer filter
    ///
    /// Returns [`None`] if no filter was set
    #[must_use]
    pub const fn issuer(&self) -> Option<Ulid> {
        self.issuer
    }

    /// Set the email filter
    #[must_use]
    pub const fn for_email(mut self, email: &'a str) -> Self {
        self.email = Some(email);
        self
    }

    /// Get the email filter
    ///
    /// Returns [`None`] if no filter was set
    #[must_use]
    pub const fn email(&self) -> Option<&str> {
        self.email
    }

    /// Only keep linked logins which still wait for their confirmation
    #[must_use]
    pub const fn pending_confirmation_only(mut self) -> Self {
        self.pending_confirmation = Some(true);
        self
    }

    /// Only keep linked logins which don't wait for a confirmation
    #[must_use]
    pub const fn confirmed_only(mut self) -> Self {
        self.pending_confirmation = Some(false);
        self
    }

    /// Get the pending confirmation filter
    ///
    /// Returns [`None`] if no filter was set
    #[must_use]
    pub const fn pending_confirmation(&self) -> Option<bool> {
        self.pending_confirmation
    }

    /// Only keep linked logins with a confirmation token which expired
    /// strictly before the given instant
    ///
    /// This matches exactly what
    /// [`LinkedLoginRepository::delete_expired_confirmation_tokens`] deletes.
    #[must_use]
    pub const fn confirmation_expired_before(mut self, now: DateTime<Utc>) -> Self {
        self.confirmation_expired_before = Some(now);
        self
    }

    /// Get the confirmation expiry filter
    ///
    /// Returns [`None`] if no filter was set
    #[must_use]
    pub const fn confirmation_expired_before_value(&self) -> Option<DateTime<Utc>> {
        self.confirmation_expired_before
    }
}

/// Parameters used to create a new [`LinkedLogin`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedLoginParams {
    /// The local user the external account is linked to
    pub user_id: Ulid,

    /// The external identity provider
    pub issuer_id: Ulid,

    /// The username reported by the identity provider
    pub username: String,

    /// The email address reported by the identity provider
    pub email: String,

    /// When the confirmation token of the link expires, if the link still
    /// needs to be confirmed
    pub confirm_token_expires_at: Option<DateTime<Utc>>,
}

/// A [`LinkedLoginRepository`] helps interacting with [`LinkedLogin`] saved in
/// the storage backend
#[async_trait]
pub trait LinkedLoginRepository: Send {
    /// The error type returned by the repository
    type Error;

    /// Lookup a linked login by its ID
    ///
    /// Returns `None` if the linked login does not exist
    ///
    /// # Parameters
    ///
    /// * `id`: The ID of the linked login to lookup
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn lookup(&mut self, id: Ulid) -> Result<Option<LinkedLogin>, Self::Error>;

    /// Add a new linked login
    ///
    /// Returns the newly created linked login, with an ID generated from the
    /// clock and the random number generator
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator to use
    /// * `clock`: The clock used to generate timestamps
    /// * `params`: The attributes of the linked login
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        params: LinkedLoginParams,
    ) -> Result<LinkedLogin, Self::Error>;

    /// List the [`LinkedLogin`]s matching the given filter, ordered by ID
    ///
    /// # Parameters
    ///
    /// * `filter`: The filter to apply
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn list(
        &mut self,
        filter: LinkedLoginFilter<'_>,
    ) -> Result<Vec<LinkedLogin>, Self::Error>;

    /// Count the number of [`LinkedLogin`] with the given filter
    ///
    /// # Parameters
    ///
    /// * `filter`: The filter to apply
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn count(&mut self, filter: LinkedLoginFilter<'_>) -> Result<usize, Self::Error>;

    /// Mark the confirmation token of a [`LinkedLogin`] as used
    ///
    /// Returns the updated linked login, which no longer expires
    ///
    /// # Parameters
    ///
    /// * `clock`: The clock used to generate timestamps
    /// * `linked_login`: The [`LinkedLogin`] to confirm
    /// * `confirmed_by`: The user who confirmed the link
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails, or if the
    /// linked login was not waiting for a confirmation
    async fn mark_confirmed(
        &mut self,
        clock: &dyn Clock,
        linked_login: LinkedLogin,
        confirmed_by: Ulid,
    ) -> Result<LinkedLogin, Self::Error>;

    /// Delete a [`LinkedLogin`]
    ///
    /// # Parameters
    ///
    /// * `linked_login`: The [`LinkedLogin`] to delete
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn remove(&mut self, linked_login: LinkedLogin) -> Result<(), Self::Error>;

    /// Delete every [`LinkedLogin`] whose confirmation token expired strictly
    /// before `now`
    ///
    /// Linked logins without a pending confirmation token are never deleted.
    /// Returns the number of deleted linked logins.
    ///
    /// # Parameters
    ///
    /// * `now`: The current time
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn delete_expired_confirmation_tokens(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<usize, Self::Error>;
}

repository_impl!(LinkedLoginRepository:
    async fn lookup(&mut self, id: Ulid) -> Result<Option<LinkedLogin>, Self::Error>;

    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        params: LinkedLoginParams,
    ) -> Result<LinkedLogin, Self::Error>;

    async fn list(
        &mut self,
        filter: LinkedLoginFilter<'_>,
    ) -> Result<Vec<LinkedLogin>, Self::Error>;

    async fn count(&mut self, filter: LinkedLoginFilter<'_>) -> Result<usize, Self::Error>;

    async fn mark_confirmed(
        &mut self,
        clock: &dyn Clock,
        linked_login: LinkedLogin,
        confirmed_by: Ulid,
    ) -> Result<LinkedLogin, Self::Error>;

    async fn remove(&mut self, linked_login: LinkedLogin) -> Result<(), Self::Error>;

    async fn delete_expired_confirmation_tokens(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<usize, Self::Error>;
);
