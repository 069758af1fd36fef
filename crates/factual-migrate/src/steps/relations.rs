//! Referential cleanup and constraint hardening for `post_fave` / `post_like`.

use crate::schema::RELATION_TABLES;
use crate::{MigrationContext, StepFuture, sql};

pub(super) fn delete_orphans<'a>(ctx: &'a mut MigrationContext<'_>) -> StepFuture<'a> {
    Box::pin(async move {
        for table in RELATION_TABLES {
            let missing_post = ctx.execute(&sql::delete_orphans_by_post(table), &[]).await?;
            let missing_user = ctx.execute(&sql::delete_orphans_by_user(table), &[]).await?;
            tracing::info!(table, missing_post, missing_user, "deleted orphaned relations");
        }
        Ok(())
    })
}

/// Lowest id wins; ids are assigned monotonically, so that is the earliest row.
pub(super) fn dedupe<'a>(ctx: &'a mut MigrationContext<'_>) -> StepFuture<'a> {
    Box::pin(async move {
        for table in RELATION_TABLES {
            let deleted = ctx.execute(&sql::dedupe_relation(table), &[]).await?;
            tracing::info!(table, deleted, "deleted duplicate relations");
        }
        Ok(())
    })
}

/// Fails if orphans or duplicates survived the previous two steps.
pub(super) fn harden_constraints<'a>(ctx: &'a mut MigrationContext<'_>) -> StepFuture<'a> {
    Box::pin(async move {
        for table in RELATION_TABLES {
            ctx.batch_execute(&sql::harden_relation(table)).await?;
        }
        Ok(())
    })
}
