// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Table and column identifiers used by [`sea_query`]

#[derive(sea_query::Iden)]
pub enum LinkedLogins {
    Table,
    LinkedLoginId,
    UserId,
    IssuerId,
    Username,
    Email,
    CreatedAt,
    ModifiedAt,
    ModifiedBy,
    ConfirmTokenExpiresAt,
}
