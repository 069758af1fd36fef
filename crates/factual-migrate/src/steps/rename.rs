use crate::{MigrationContext, StepFuture, sql};

/// `"user"` is a reserved word; move the table and its sequence out of the way.
pub(super) fn rename_user_table<'a>(ctx: &'a mut MigrationContext<'_>) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.batch_execute(&sql::rename_user_table()).await?;
        Ok(())
    })
}

pub(super) fn drop_alembic_version<'a>(ctx: &'a mut MigrationContext<'_>) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.execute(&sql::drop_alembic_version(), &[]).await?;
        Ok(())
    })
}
