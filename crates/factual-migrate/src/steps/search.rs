use crate::{MigrationContext, StepFuture, sql};

/// Trigram extension, `search_vector` column, trigger, indexes, backfill.
///
/// The backfill runs last and uses the same expression as the trigger.
pub(super) fn install_post_search<'a>(ctx: &'a mut MigrationContext<'_>) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.batch_execute(&sql::create_trigram_extension()).await?;
        ctx.batch_execute(&sql::add_search_column()).await?;
        ctx.batch_execute(&sql::create_search_function()).await?;
        ctx.batch_execute(&sql::create_search_trigger()).await?;
        ctx.batch_execute(&sql::create_search_indexes()).await?;
        let backfilled = ctx.execute(&sql::backfill_search_vector(), &[]).await?;
        tracing::info!(posts = backfilled, "backfilled search vectors");
        Ok(())
    })
}
