//! Pickled `BYTEA` columns to `JSONB`: stage, transcode, validate, swap.

use serde_json::Value as Json;

use crate::config::RelatedSource;
use crate::error::{Error, MigrationError};
use crate::schema::{LEGACY_COLUMNS, LegacyColumn, RELATED_LITERAL};
use crate::{MigrationContext, MigrationResult, StepFuture, decode_legacy, sql};

pub(super) fn add_staging_columns<'a>(ctx: &'a mut MigrationContext<'_>) -> StepFuture<'a> {
    Box::pin(async move {
        for column in LEGACY_COLUMNS {
            ctx.execute(&sql::add_staging_column(column), &[]).await?;
        }
        Ok(())
    })
}

pub(super) fn transcode_legacy_columns<'a>(ctx: &'a mut MigrationContext<'_>) -> StepFuture<'a> {
    Box::pin(async move {
        for column in LEGACY_COLUMNS {
            if column.is_related() && ctx.related_source() == RelatedSource::Literal {
                fill_related_literal(ctx, column).await?;
            } else {
                transcode_column(ctx, column).await?;
            }
        }
        Ok(())
    })
}

/// Unpickle every non-null value of `column` and store it as JSON in the
/// staging column. The first value that fails to transcode aborts the run.
async fn transcode_column(
    ctx: &mut MigrationContext<'_>,
    column: &LegacyColumn,
) -> MigrationResult<()> {
    let rows = ctx.query(&sql::select_legacy(column), &[]).await?;
    let update = ctx.prepare(&sql::update_staging(column)).await?;

    for row in &rows {
        let id: i64 = row.try_get(0)?;
        let pickled: &[u8] = row.try_get(1)?;
        let json = decode_legacy(pickled).map_err(|source| Error::Transcode {
            table: column.table,
            column: column.legacy,
            id,
            source,
        })?;
        ctx.execute_prepared(&update, &[&json, &id]).await?;
    }

    tracing::info!(
        table = column.table,
        column = column.legacy,
        rows = rows.len(),
        "transcoded pickled column"
    );
    Ok(())
}

/// Legacy behavior: every post gets the JSON string `"similar"`.
async fn fill_related_literal(
    ctx: &mut MigrationContext<'_>,
    column: &LegacyColumn,
) -> MigrationResult<()> {
    tracing::warn!(
        table = column.table,
        column = column.legacy,
        "filling {} with the literal {:?} for every row instead of transcoding {:?}; \
         set MIGRATE_RELATED_SOURCE=column to transcode the column",
        column.target,
        RELATED_LITERAL,
        column.legacy,
    );
    let literal = Json::String(RELATED_LITERAL.to_owned());
    let rows = ctx.execute(&sql::fill_staging(column), &[&literal]).await?;
    tracing::info!(table = column.table, column = column.target, rows, "filled literal");
    Ok(())
}

/// Refuse to promote a required column while any row is missing its
/// transcoded value, then swap the columns in one batch.
pub(super) fn swap_columns<'a>(ctx: &'a mut MigrationContext<'_>) -> StepFuture<'a> {
    Box::pin(async move {
        for column in LEGACY_COLUMNS.iter().filter(|c| c.required) {
            let row = ctx.query_one(&sql::count_unstaged(column), &[]).await?;
            let missing: i64 = row.try_get(0)?;
            if missing > 0 {
                return Err(MigrationError::from(Error::Validation(format!(
                    "{}.{} has {missing} row(s) without a value; it cannot be made NOT NULL",
                    column.table, column.target
                ))));
            }
        }

        ctx.batch_execute(&sql::swap_columns(LEGACY_COLUMNS)).await?;
        Ok(())
    })
}
