// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use oalink_data_model::{Clock, LinkedLogin};
use oalink_storage::linked_login::{LinkedLoginFilter, LinkedLoginParams, LinkedLoginRepository};
use rand::RngCore;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder, enum_def};
use sea_query_binder::SqlxBinder;
use sqlx::SqliteConnection;
use ulid::Ulid;

use crate::{
    DatabaseError, DatabaseInconsistencyError,
    filter::{Filter, StatementExt},
    iden::LinkedLogins,
    tracing::ExecuteExt,
};

/// An implementation of [`LinkedLoginRepository`] for a SQLite connection
pub struct SqliteLinkedLoginRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SqliteLinkedLoginRepository<'c> {
    /// Create a new [`SqliteLinkedLoginRepository`] from an active SQLite
    /// connection
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }
}

#[derive(sqlx::FromRow)]
#[enum_def]
struct LinkedLoginLookup {
    linked_login_id: String,
    user_id: String,
    issuer_id: String,
    username: String,
    email: String,
    created_at: i64,
    modified_at: Option<i64>,
    modified_by: Option<String>,
    confirm_token_expires_at: Option<i64>,
}

fn parse_timestamp(
    value: i64,
    column: &'static str,
    row: Ulid,
) -> Result<DateTime<Utc>, DatabaseInconsistencyError> {
    DateTime::from_timestamp_millis(value).ok_or_else(|| {
        DatabaseInconsistencyError::on("linked_logins")
            .column(column)
            .row(row)
    })
}

fn parse_ulid(
    value: &str,
    column: &'static str,
    row: Option<Ulid>,
) -> Result<Ulid, DatabaseInconsistencyError> {
    Ulid::from_string(value).map_err(|e| {
        let error = DatabaseInconsistencyError::on("linked_logins").column(column);
        let error = match row {
            Some(row) => error.row(row),
            None => error,
        };
        error.source(e)
    })
}

impl TryFrom<LinkedLoginLookup> for LinkedLogin {
    type Error = DatabaseInconsistencyError;

    fn try_from(value: LinkedLoginLookup) -> Result<Self, Self::Error> {
        let id = parse_ulid(&value.linked_login_id, "linked_login_id", None)?;
        let user_id = parse_ulid(&value.user_id, "user_id", Some(id))?;
        let issuer_id = parse_ulid(&value.issuer_id, "issuer_id", Some(id))?;
        let modified_by = value
            .modified_by
            .as_deref()
            .map(|modified_by| parse_ulid(modified_by, "modified_by", Some(id)))
            .transpose()?;

        let created_at = parse_timestamp(value.created_at, "created_at", id)?;
        let modified_at = value
            .modified_at
            .map(|modified_at| parse_timestamp(modified_at, "modified_at", id))
            .transpose()?;
        // 0 is the "no pending token" sentinel
        let confirm_token_expires_at = value
            .confirm_token_expires_at
            .filter(|expires_at| *expires_at != 0)
            .map(|expires_at| parse_timestamp(expires_at, "confirm_token_expires_at", id))
            .transpose()?;

        Ok(LinkedLogin {
            id,
            user_id,
            issuer_id,
            username: value.username,
            email: value.email,
            created_at,
            modified_at,
            modified_by,
            confirm_token_expires_at,
        })
    }
}

/// Both NULL and 0 mean that there is no pending confirmation token
fn has_pending_token() -> sea_query::SimpleExpr {
    let column = || Expr::col((LinkedLogins::Table, LinkedLogins::ConfirmTokenExpiresAt));
    column().is_not_null().and(column().ne(0))
}

impl Filter for LinkedLoginFilter<'_> {
    fn generate_condition(&self) -> impl sea_query::IntoCondition {
        sea_query::Condition::all()
            .add_option(self.user().map(|user_id| {
                Expr::col((LinkedLogins::Table, LinkedLogins::UserId)).eq(user_id.to_string())
            }))
            .add_option(self.issuer().map(|issuer_id| {
                Expr::col((LinkedLogins::Table, LinkedLogins::IssuerId))
                    .eq(issuer_id.to_string())
            }))
            .add_option(
                self.email()
                    .map(|email| Expr::col((LinkedLogins::Table, LinkedLogins::Email)).eq(email)),
            )
            .add_option(self.pending_confirmation().map(|pending| {
                if pending {
                    has_pending_token()
                } else {
                    has_pending_token().not()
                }
            }))
            .add_option(self.confirmation_expired_before_value().map(|now| {
                has_pending_token().and(
                    Expr::col((LinkedLogins::Table, LinkedLogins::ConfirmTokenExpiresAt))
                        .lt(now.timestamp_millis()),
                )
            }))
    }
}

#[async_trait]
impl LinkedLoginRepository for SqliteLinkedLoginRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.linked_login.lookup",
        skip_all,
        fields(
            db.query.text,
            linked_login.id = %id,
        ),
        err,
    )]
    async fn lookup(&mut self, id: Ulid) -> Result<Option<LinkedLogin>, Self::Error> {
        let res: Option<LinkedLoginLookup> = sqlx::query_as(
            r"
                SELECT
                    linked_login_id,
                    user_id,
                    issuer_id,
                    username,
                    email,
                    created_at,
                    modified_at,
                    modified_by,
                    confirm_token_expires_at
                FROM linked_logins
                WHERE linked_login_id = ?1
            ",
        )
        .bind(id.to_string())
        .traced()
        .fetch_optional(&mut *self.conn)
        .await?;

        let Some(res) = res else { return Ok(None) };

        Ok(Some(res.try_into()?))
    }

    #[tracing::instrument(
        name = "db.linked_login.add",
        skip_all,
        fields(
            db.query.text,
            linked_login.id,
            linked_login.user_id = %params.user_id,
            linked_login.issuer_id = %params.issuer_id,
        ),
        err,
    )]
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        params: LinkedLoginParams,
    ) -> Result<LinkedLogin, Self::Error> {
        // Timestamps are stored with millisecond precision
        let created_at = clock.now().trunc_subsecs(3);
        let confirm_token_expires_at = params
            .confirm_token_expires_at
            .map(|expires_at| expires_at.trunc_subsecs(3))
            .filter(|expires_at| *expires_at != DateTime::UNIX_EPOCH);
        let id = Ulid::from_datetime_with_source(created_at.into(), rng);
        tracing::Span::current().record("linked_login.id", tracing::field::display(id));

        sqlx::query(
            r"
                INSERT INTO linked_logins (
                    linked_login_id,
                    user_id,
                    issuer_id,
                    username,
                    email,
                    created_at,
                    modified_at,
                    modified_by,
                    confirm_token_expires_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL, ?7)
            ",
        )
        .bind(id.to_string())
        .bind(params.user_id.to_string())
        .bind(params.issuer_id.to_string())
        .bind(&params.username)
        .bind(&params.email)
        .bind(created_at.timestamp_millis())
        .bind(confirm_token_expires_at.map(|expires_at| expires_at.timestamp_millis()))
        .traced()
        .execute(&mut *self.conn)
        .await?;

        Ok(LinkedLogin {
            id,
            user_id: params.user_id,
            issuer_id: params.issuer_id,
            username: params.username,
            email: params.email,
            created_at,
            modified_at: None,
            modified_by: None,
            confirm_token_expires_at,
        })
    }

    #[tracing::instrument(
        name = "db.linked_login.list",
        skip_all,
        fields(
            db.query.text,
        ),
        err,
    )]
    async fn list(
        &mut self,
        filter: LinkedLoginFilter<'_>,
    ) -> Result<Vec<LinkedLogin>, Self::Error> {
        let (sql, arguments) = Query::select()
            .expr_as(
                Expr::col((LinkedLogins::Table, LinkedLogins::LinkedLoginId)),
                LinkedLoginLookupIden::LinkedLoginId,
            )
            .expr_as(
                Expr::col((LinkedLogins::Table, LinkedLogins::UserId)),
                LinkedLoginLookupIden::UserId,
            )
            .expr_as(
                Expr::col((LinkedLogins::Table, LinkedLogins::IssuerId)),
                LinkedLoginLookupIden::IssuerId,
            )
            .expr_as(
                Expr::col((LinkedLogins::Table, LinkedLogins::Username)),
                LinkedLoginLookupIden::Username,
            )
            .expr_as(
                Expr::col((LinkedLogins::Table, LinkedLogins::Email)),
                LinkedLoginLookupIden::Email,
            )
            .expr_as(
                Expr::col((LinkedLogins::Table, LinkedLogins::CreatedAt)),
                LinkedLoginLookupIden::CreatedAt,
            )
            .expr_as(
                Expr::col((LinkedLogins::Table, LinkedLogins::ModifiedAt)),
                LinkedLoginLookupIden::ModifiedAt,
            )
            .expr_as(
                Expr::col((LinkedLogins::Table, LinkedLogins::ModifiedBy)),
                LinkedLoginLookupIden::ModifiedBy,
            )
            .expr_as(
                Expr::col((LinkedLogins::Table, LinkedLogins::ConfirmTokenExpiresAt)),
                LinkedLoginLookupIden::ConfirmTokenExpiresAt,
            )
            .from(LinkedLogins::Table)
            .apply_filter(filter)
            .order_by((LinkedLogins::Table, LinkedLogins::LinkedLoginId), Order::Asc)
            .build_sqlx(SqliteQueryBuilder);

        let edges: Vec<LinkedLoginLookup> = sqlx::query_as_with(&sql, arguments)
            .traced()
            .fetch_all(&mut *self.conn)
            .await?;

        let links = edges
            .into_iter()
            .map(LinkedLogin::try_from)
            .collect::<Result<_, _>>()?;

        Ok(links)
    }

    #[tracing::instrument(
        name = "db.linked_login.count",
        skip_all,
        fields(
            db.query.text,
        ),
        err,
    )]
    async fn count(&mut self, filter: LinkedLoginFilter<'_>) -> Result<usize, Self::Error> {
        let (sql, arguments) = Query::select()
            .expr(Expr::col((LinkedLogins::Table, LinkedLogins::LinkedLoginId)).count())
            .from(LinkedLogins::Table)
            .apply_filter(filter)
            .build_sqlx(SqliteQueryBuilder);

        let count: i64 = sqlx::query_scalar_with(&sql, arguments)
            .traced()
            .fetch_one(&mut *self.conn)
            .await?;

        count
            .try_into()
            .map_err(DatabaseError::to_invalid_operation)
    }

    #[tracing::instrument(
        name = "db.linked_login.mark_confirmed",
        skip_all,
        fields(
            db.query.text,
            %linked_login.id,
            linked_login.confirmed_by = %confirmed_by,
        ),
        err,
    )]
    async fn mark_confirmed(
        &mut self,
        clock: &dyn Clock,
        linked_login: LinkedLogin,
        confirmed_by: Ulid,
    ) -> Result<LinkedLogin, Self::Error> {
        let linked_login = linked_login
            .confirm(clock.now().trunc_subsecs(3), confirmed_by)
            .map_err(DatabaseError::to_invalid_operation)?;

        let res = sqlx::query(
            r"
                UPDATE linked_logins
                SET confirm_token_expires_at = NULL,
                    modified_at = ?2,
                    modified_by = ?3
                WHERE linked_login_id = ?1
                  AND confirm_token_expires_at IS NOT NULL
                  AND confirm_token_expires_at <> 0
            ",
        )
        .bind(linked_login.id.to_string())
        .bind(linked_login.modified_at.map(|at| at.timestamp_millis()))
        .bind(confirmed_by.to_string())
        .traced()
        .execute(&mut *self.conn)
        .await?;

        DatabaseError::ensure_affected_rows(&res, 1)?;

        Ok(linked_login)
    }

    #[tracing::instrument(
        name = "db.linked_login.remove",
        skip_all,
        fields(
            db.query.text,
            %linked_login.id,
        ),
        err,
    )]
    async fn remove(&mut self, linked_login: LinkedLogin) -> Result<(), Self::Error> {
        let res = sqlx::query(
            r"
                DELETE FROM linked_logins
                WHERE linked_login_id = ?1
            ",
        )
        .bind(linked_login.id.to_string())
        .traced()
        .execute(&mut *self.conn)
        .await?;

        DatabaseError::ensure_affected_rows(&res, 1)?;

        Ok(())
    }

    #[tracing::instrument(
        name = "db.linked_login.delete_expired_confirmation_tokens",
        skip_all,
        fields(
            db.query.text,
            %now,
        ),
        err,
    )]
    async fn delete_expired_confirmation_tokens(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<usize, Self::Error> {
        let (sql, arguments) = Query::delete()
            .from_table(LinkedLogins::Table)
            .apply_filter(LinkedLoginFilter::new().confirmation_expired_before(now))
            .build_sqlx(SqliteQueryBuilder);

        let res = sqlx::query_with(&sql, arguments)
            .traced()
            .execute(&mut *self.conn)
            .await?;

        Ok(res.rows_affected().try_into().unwrap_or(usize::MAX))
    }
}
