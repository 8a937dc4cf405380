// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

/// A filter which can be applied to a query
pub(crate) trait Filter {
    /// Generate a condition for the filter
    fn generate_condition(&self) -> impl sea_query::IntoCondition;
}

pub(crate) trait StatementExt {
    /// Apply the filter to the query
    fn apply_filter<F: Filter>(&mut self, filter: F) -> &mut Self;
}

impl StatementExt for sea_query::SelectStatement {
    fn apply_filter<F: Filter>(&mut self, filter: F) -> &mut Self {
        let condition = filter.generate_condition();
        self.cond_where(condition)
    }
}

impl StatementExt for sea_query::DeleteStatement {
    fn apply_filter<F: Filter>(&mut self, filter: F) -> &mut Self {
        let condition = filter.generate_condition();
        self.cond_where(condition)
    }
}
