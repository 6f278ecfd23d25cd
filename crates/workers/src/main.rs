use std::sync::Arc;

use pulse_common::nats_config::StreamConfig;
use pulse_common::retry::{retry_async, RetryConfig};
use pulse_workers::api;
use pulse_workers::config;
use pulse_workers::consumer::{
    connect_jetstream, create_pull_consumer, ensure_stream, ConsumerLoop, JetStreamSource,
    NatsOutcomePublisher, OutcomeHandler,
};
use pulse_workers::incident::IncidentMachine;
use pulse_workers::metrics::WorkerMetrics;
use pulse_workers::notifier::{DefaultNotifierFactory, Mailer, NotificationDispatcher};
use pulse_workers::probe::HttpProbe;
use pulse_workers::runner::{JobRunner, QueueAdapter, TickLoop};
use pulse_workers::schedule::{JobQueue, PgJobQueue};
use pulse_workers::shutdown::wait_for_shutdown;
use pulse_workers::storage::{self, migrator};
use pulse_workers::store::Stores;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let cfg = config::load()?;
    let worker_metrics = WorkerMetrics::new();
    let boot_retry = RetryConfig::default();

    tracing::info!("connecting to Postgres");
    let pool = retry_async(&boot_retry, || {
        storage::create_pool(&cfg.database_url, cfg.max_connections)
    })
    .await?;
    let applied = migrator::run_migrations(&pool).await?;
    tracing::info!(applied = applied.len(), "database ready");

    tracing::info!(url = %cfg.nats_url, "connecting to NATS JetStream");
    let js = retry_async(&boot_retry, || connect_jetstream(&cfg.nats_url)).await?;
    let stream_config = StreamConfig::named(&cfg.stream.name);
    ensure_stream(&js, &stream_config).await?;
    let consumer = create_pull_consumer(
        &js,
        &cfg.stream.name,
        &cfg.stream.consumer_name,
        cfg.stream.ack_wait(),
        cfg.stream.max_deliver,
    )
    .await?;
    tracing::info!(stream = %cfg.stream.name, consumer = %cfg.stream.consumer_name, "stream ready");

    let stores = Stores::postgres(pool.clone());
    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool, cfg.probe.lease()));

    let delivery = cfg.delivery.policy();
    let mailer = cfg.smtp.as_ref().map(Mailer::from_settings).transpose()?;
    if mailer.is_none() {
        tracing::info!("no SMTP settings, email channels will be skipped");
    }
    let factory = DefaultNotifierFactory::new(delivery.timeout, mailer)?;
    let dispatcher = NotificationDispatcher::new(
        stores.channels.clone(),
        Arc::new(factory),
        delivery,
        worker_metrics.clone(),
    );
    let machine = IncidentMachine::new(
        stores.incidents.clone(),
        stores.monitors.clone(),
        Arc::new(dispatcher),
        worker_metrics.clone(),
    );

    let runner = JobRunner::new(
        Arc::new(HttpProbe::new()?),
        Arc::new(NatsOutcomePublisher::new(js)),
        worker_metrics.clone(),
    );
    let adapter = QueueAdapter::new(
        queue.clone(),
        stores.monitors.clone(),
        machine.clone(),
        worker_metrics.clone(),
    );
    let tick_loop = TickLoop::new(queue, Arc::new(runner), Arc::new(adapter), cfg.probe.concurrency)
        .with_claim_batch(cfg.probe.claim_batch)
        .with_poll_interval(cfg.probe.poll_interval());

    let handler = OutcomeHandler::new(stores, machine, worker_metrics.clone());
    let consumer_loop = ConsumerLoop::new(
        JetStreamSource::new(consumer),
        handler,
        cfg.stream.batch_size,
        worker_metrics.clone(),
    )
    .with_error_pause(cfg.stream.error_pause());

    let listener = tokio::net::TcpListener::bind(&cfg.api_addr).await?;
    tracing::info!(api_addr = %cfg.api_addr, "worker API server starting");
    let api_handle = tokio::spawn(api::serve(listener, worker_metrics.clone()));
    let tick_handle = tokio::spawn(async move { tick_loop.run().await });
    let consumer_handle = tokio::spawn(async move { consumer_loop.run().await });

    worker_metrics.set_ready(true);
    tracing::info!(concurrency = cfg.probe.concurrency, "worker running");

    tokio::select! {
        _ = wait_for_shutdown() => tracing::info!("shutdown signal received"),
        r = api_handle => {
            match r {
                Ok(Ok(())) => tracing::warn!("API server stopped"),
                Ok(Err(e)) => tracing::error!("API: {e}"),
                Err(e) => tracing::error!("API join: {e}"),
            }
        }
        r = tick_handle => { if let Err(e) = r { tracing::error!("tick loop join: {e}"); } }
        r = consumer_handle => { if let Err(e) = r { tracing::error!("consumer join: {e}"); } }
    }

    worker_metrics.set_ready(false);
    Ok(())
}
