// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Maintenance tasks running against the storage backend
//!
//! The [`ExpiredTokenReaper`] deletes linked logins whose confirmation token
//! expired. It can be run once, or periodically through a [`ReaperWorker`].

use std::sync::LazyLock;

use opentelemetry::metrics::Meter;

mod cleanup;
mod worker;

pub use self::{cleanup::ExpiredTokenReaper, worker::ReaperWorker};

static METER: LazyLock<Meter> = LazyLock::new(|| {
    let scope = opentelemetry::InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(opentelemetry_semantic_conventions::SCHEMA_URL)
        .build();

    opentelemetry::global::meter_with_scope(scope)
});
