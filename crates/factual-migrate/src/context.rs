//! Traced access to the migration transaction.
//!
//! Every statement a step issues goes through [`MigrationContext`], which
//! wraps it in a `tracing::debug_span!` and tallies affected rows.

use tokio_postgres::types::ToSql;
use tokio_postgres::{Error, Row, Statement, Transaction};
use tracing::Instrument;

use crate::config::RelatedSource;

/// A statement prepared once and executed per row.
pub struct Prepared {
    sql: String,
    statement: Statement,
}

/// The transaction a step runs in, plus per-step bookkeeping.
pub struct MigrationContext<'t> {
    tx: &'t Transaction<'t>,
    related_source: RelatedSource,
    affected: u64,
}

impl<'t> MigrationContext<'t> {
    pub(crate) fn new(tx: &'t Transaction<'t>, related_source: RelatedSource) -> Self {
        Self {
            tx,
            related_source,
            affected: 0,
        }
    }

    pub fn related_source(&self) -> RelatedSource {
        self.related_source
    }

    /// Rows affected so far by `execute` calls in this step.
    pub fn affected(&self) -> u64 {
        self.affected
    }

    /// Execute a statement, returning the number of rows affected.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Error> {
        let span = tracing::debug_span!(
            "db.execute",
            sql = %sql,
            params = params.len(),
            affected = tracing::field::Empty,
        );
        let affected = self
            .tx
            .execute(sql, params)
            .instrument(span.clone())
            .await?;
        span.record("affected", affected);
        self.affected += affected;
        Ok(affected)
    }

    /// Run one or more `;`-separated statements without parameters.
    pub async fn batch_execute(&mut self, sql: &str) -> Result<(), Error> {
        let span = tracing::debug_span!("db.batch", sql = %sql);
        self.tx.batch_execute(sql).instrument(span).await
    }

    /// Execute a query, returning all rows.
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Error> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let rows = self.tx.query(sql, params).instrument(span.clone()).await?;
        span.record("rows", rows.len());
        Ok(rows)
    }

    /// Execute a query, returning exactly one row.
    pub async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Row, Error> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = 1u64,
        );
        self.tx.query_one(sql, params).instrument(span).await
    }

    pub async fn prepare(&self, sql: &str) -> Result<Prepared, Error> {
        let span = tracing::debug_span!("db.prepare", sql = %sql);
        let statement = self.tx.prepare(sql).instrument(span).await?;
        Ok(Prepared {
            sql: sql.to_owned(),
            statement,
        })
    }

    /// Execute a prepared statement, returning the number of rows affected.
    pub async fn execute_prepared(
        &mut self,
        prepared: &Prepared,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Error> {
        let span = tracing::trace_span!(
            "db.execute",
            sql = %prepared.sql,
            params = params.len(),
            affected = tracing::field::Empty,
        );
        let affected = self
            .tx
            .execute(&prepared.statement, params)
            .instrument(span.clone())
            .await?;
        span.record("affected", affected);
        self.affected += affected;
        Ok(affected)
    }
}
