use std::time::{Duration, Instant};

use tokio_postgres::{Client, NoTls};
use tracing::Instrument;

use crate::config::{DbConfig, RelatedSource};
use crate::context::MigrationContext;
use crate::error::{Error, MigrationError};
use crate::steps::STEPS;
use crate::verify::verify;

/// Open the single connection the migration runs on.
///
/// The connection driver is spawned onto the current tokio runtime.
pub async fn connect(config: &DbConfig) -> Result<Client, Error> {
    tracing::info!(db = %config.display_target(), "connecting to postgres");
    let (client, connection) = config.pg_config().connect(NoTls).await.map_err(Error::Connect)?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("connection error: {}", e);
        }
    });

    Ok(client)
}

/// What a step did.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: &'static str,
    /// Rows affected by row-counting statements; DDL batches count zero.
    pub rows: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    pub elapsed: Duration,
}

/// Runs every step in [`STEPS`] inside one transaction.
///
/// ```ignore
/// let runner = MigrationRunner::new(&mut client);
/// runner.run().await?;
/// ```
pub struct MigrationRunner<'c> {
    client: &'c mut Client,
    related_source: RelatedSource,
}

impl<'c> MigrationRunner<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        Self {
            client,
            related_source: RelatedSource::default(),
        }
    }

    pub fn with_related_source(mut self, related_source: RelatedSource) -> Self {
        self.related_source = related_source;
        self
    }

    /// Run all steps, verify, commit.
    ///
    /// On error the transaction is dropped without committing, which rolls
    /// it back; nothing the run did is left behind.
    pub async fn run(self) -> Result<RunReport, MigrationError> {
        let started = Instant::now();
        let tx = self.client.transaction().await?;
        let mut steps = Vec::with_capacity(STEPS.len());

        for step in STEPS {
            let step_started = Instant::now();
            let mut ctx = MigrationContext::new(&tx, self.related_source);
            let span = tracing::info_span!("step", name = step.name);
            (step.run)(&mut ctx)
                .instrument(span)
                .await
                .map_err(|e| e.in_step(step.name))?;

            let report = StepReport {
                name: step.name,
                rows: ctx.affected(),
                elapsed: step_started.elapsed(),
            };
            tracing::info!(
                step = report.name,
                rows = report.rows,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "step done"
            );
            steps.push(report);
        }

        verify(&tx)
            .await
            .map_err(|e| MigrationError::from(e).in_step("verify"))?;
        tx.commit().await?;

        Ok(RunReport {
            steps,
            elapsed: started.elapsed(),
        })
    }
}
