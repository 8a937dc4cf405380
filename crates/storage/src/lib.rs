// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Interactions with the storage backend
//!
//! This crate provides a set of traits that can be implemented to interact with
//! the storage backend. Those traits are called repositories and are grouped by
//! the type of data they manage. For now there is a single one, the
//! [`LinkedLoginRepository`], which stores the links between local users and
//! accounts on external identity providers.
//!
//! Repositories are accessed via the [`RepositoryAccess`] trait, on a
//! [`Repository`] which represents a single transaction on the backend. Changes
//! are only persisted once [`RepositoryTransaction::save`] is called.
//!
//! The trait can be wrapped in a [`BoxRepository`] to use it without caring
//! about the underlying storage backend, and without carrying around the
//! generic type parameter. A [`RepositoryFactory`] hands out such boxed
//! repositories.
//!
//! Operations which need the current time take a [`Clock`], re-exported from
//! [`oalink_data_model`].
//!
//! [`LinkedLoginRepository`]: crate::linked_login::LinkedLoginRepository

#![deny(clippy::future_not_send, missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod linked_login;
pub(crate) mod repository;
mod utils;

pub use oalink_data_model::{Clock, SystemClock, clock};

pub use self::{
    repository::{
        BoxRepository, BoxRepositoryFactory, Repository, RepositoryAccess, RepositoryError,
        RepositoryFactory, RepositoryTransaction,
    },
    utils::MapErr,
};
