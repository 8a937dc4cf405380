// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! An implementation of the storage interface for a SQLite database
//!
//! This crate provides a concrete implementation of the `oalink-storage`
//! repositories, using a SQLite database as backend.
//!
//! # Usage
//!
//! ```no_run
//! use oalink_storage::{RepositoryAccess, RepositoryTransaction, linked_login::LinkedLoginFilter};
//! use oalink_storage_sqlite::SqliteRepository;
//! # use oalink_storage_sqlite::DatabaseError;
//!
//! # async fn run(pool: sqlx::SqlitePool) -> Result<(), DatabaseError> {
//! let mut repo = SqliteRepository::from_pool(&pool).await?;
//! let _pending = repo
//!     .linked_login()
//!     .count(LinkedLoginFilter::new().pending_confirmation_only())
//!     .await?;
//! Box::new(repo).save().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The schema lives in the `migrations` directory and is embedded in the
//! [`MIGRATOR`]. It has to be applied before the repositories are used.

#![deny(clippy::future_not_send, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use sqlx::migrate::Migrator;

mod errors;
pub(crate) mod filter;
pub(crate) mod iden;
mod linked_login;
mod repository;
pub(crate) mod telemetry;
pub(crate) mod tracing;

pub use self::{
    errors::{DatabaseError, DatabaseInconsistencyError},
    linked_login::SqliteLinkedLoginRepository,
    repository::{SqliteRepository, SqliteRepositoryFactory},
    tracing::ExecuteExt,
};

/// Embedded migrations, allowing them to run on startup
pub static MIGRATOR: Migrator = sqlx::migrate!();
