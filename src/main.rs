use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use s3_migration_runner::config::RunnerConfig;
use s3_migration_runner::create_runner;
use s3_migration_runner::models::MigrationEvent;
use s3_migration_runner::services::migrator::MigrationRunner;
use tracing::{Instrument, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // CloudWatch stamps every line, so no timestamps here
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "s3_migration_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let config = RunnerConfig::from_env();
    info!(
        "🚀 Starting S3 migration runner (region: {}, staging root: {})",
        config.aws_region.as_deref().unwrap_or("<unset>"),
        config.staging_root.display()
    );

    let runner = create_runner(&config);

    run(service_fn(|event| handle_event(&runner, event))).await
}

async fn handle_event(
    runner: &MigrationRunner,
    event: LambdaEvent<MigrationEvent>,
) -> Result<String, Error> {
    let (payload, context) = event.into_parts();
    let span = tracing::info_span!("invocation", request_id = %context.request_id);

    runner
        .handle(&payload)
        .instrument(span)
        .await
        .map_err(|e| {
            error!(phase = %e.phase(), "❌ {}", e);
            e.into()
        })
}
