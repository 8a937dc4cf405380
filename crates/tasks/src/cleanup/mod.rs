// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Database cleanup tasks

mod linked_login;

pub use self::linked_login::ExpiredTokenReaper;
