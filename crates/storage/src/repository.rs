// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use futures_util::{FutureExt, TryFutureExt, future::BoxFuture};
use thiserror::Error;

use crate::{MapErr, linked_login::LinkedLoginRepository};

/// A [`RepositoryFactory`] is a factory that can create a [`BoxRepository`]
#[async_trait]
pub trait RepositoryFactory {
    /// Create a new [`BoxRepository`]
    async fn create(&self) -> Result<BoxRepository, RepositoryError>;
}

/// A type-erased [`RepositoryFactory`]
pub type BoxRepositoryFactory = Box<dyn RepositoryFactory + Send + Sync + 'static>;

#[async_trait]
impl<F> RepositoryFactory for Box<F>
where
    F: RepositoryFactory + Send + Sync + ?Sized,
{
    async fn create(&self) -> Result<BoxRepository, RepositoryError> {
        (**self).create().await
    }
}

/// A [`Repository`] helps interacting with the underlying storage backend.
pub trait Repository<E>:
    RepositoryAccess<Error = E> + RepositoryTransaction<Error = E> + Send
where
    E: std::error::Error + Send + Sync + 'static,
{
}

/// An opaque, type-erased error
#[derive(Debug, Error)]
#[error(transparent)]
pub struct RepositoryError {
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl RepositoryError {
    /// Construct a [`RepositoryError`] from any error kind
    pub fn from_error<E>(value: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            source: Box::new(value),
        }
    }
}

/// A type-erased [`Repository`]
pub type BoxRepository = Box<dyn Repository<RepositoryError> + Send + 'static>;

/// A [`RepositoryTransaction`] can be saved or cancelled, after a series
/// of operations.
pub trait RepositoryTransaction {
    /// The error type used by the [`Self::save`] and [`Self::cancel`] functions
    type Error;

    /// Commit the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage backend failed to commit the
    /// transaction.
    fn save(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>>;

    /// Rollback the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage backend failed to rollback
    /// the transaction.
    fn cancel(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>>;
}

/// Access the various repositories the backend implements.
///
/// All the methods return a boxed trait object, which can be used to access a
/// particular repository. The lifetime of the returned object is bound to the
/// lifetime of the whole repository, so that only one mutable reference to the
/// repository is used at a time.
pub trait RepositoryAccess: Send {
    /// The backend-specific error type used by each repository.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Get a [`LinkedLoginRepository`]
    fn linked_login<'c>(
        &'c mut self,
    ) -> Box<dyn LinkedLoginRepository<Error = Self::Error> + 'c>;
}

impl<R, F, E1, E2> Repository<E2> for MapErr<R, F>
where
    R: Repository<E1> + RepositoryAccess<Error = E1> + RepositoryTransaction<Error = E1>,
    F: FnMut(E1) -> E2 + Send + 'static,
    E1: std::error::Error + Send + Sync + 'static,
    E2: std::error::Error + Send + Sync + 'static,
{
}

impl<R, F, E> RepositoryTransaction for MapErr<R, F>
where
    R: RepositoryTransaction,
    R::Error: 'static,
    F: FnMut(R::Error) -> E + Send + 'static,
    E: std::error::Error,
{
    type Error = E;

    fn save(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        Box::new(self.inner).save().map_err(self.mapper).boxed()
    }

    fn cancel(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        Box::new(self.inner).cancel().map_err(self.mapper).boxed()
    }
}

impl<R, F, E> RepositoryAccess for MapErr<R, F>
where
    R: RepositoryAccess,
    R::Error: 'static,
    F: FnMut(R::Error) -> E + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn linked_login<'c>(
        &'c mut self,
    ) -> Box<dyn LinkedLoginRepository<Error = Self::Error> + 'c> {
        Box::new(MapErr::new(self.inner.linked_login(), &mut self.mapper))
    }
}
