pub mod server;

use containers::RootChainEvent;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics output is not utf8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Clone)]
pub struct RootChainMetrics {
    registry: Registry,
    current_fork: IntGauge,
    current_epoch: IntGauge,
    last_block: IntGauge,
    last_finalized_block: IntGauge,
    blocks_submitted: IntCounterVec,
    epochs_prepared: IntCounterVec,
    epochs_finalized: IntCounterVec,
    requests_created: IntCounterVec,
    requests_finalized: IntCounterVec,
    requests_challenged: IntCounterVec,
    forks_created: IntCounterVec,
    finalization_batch_size: HistogramVec,
}

fn register<T: prometheus::core::Collector + Clone + 'static>(
    registry: &Registry,
    collector: T,
) -> Result<T, MetricsError> {
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

impl RootChainMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let current_fork = register(
            &registry,
            IntGauge::with_opts(Opts::new("plasma_current_fork", "Number of the active fork"))?,
        )?;
        let current_epoch = register(
            &registry,
            IntGauge::with_opts(Opts::new(
                "plasma_current_epoch",
                "Epoch being filled on the active fork",
            ))?,
        )?;
        let last_block = register(
            &registry,
            IntGauge::with_opts(Opts::new("plasma_last_block", "Last submitted block"))?,
        )?;
        let last_finalized_block = register(
            &registry,
            IntGauge::with_opts(Opts::new(
                "plasma_last_finalized_block",
                "Last finalized block on the active fork",
            ))?,
        )?;

        let blocks_submitted = register(
            &registry,
            IntCounterVec::new(
                Opts::new("plasma_blocks_submitted_total", "Total number of submitted blocks"),
                &["class"],
            )?,
        )?;
        let epochs_prepared = register(
            &registry,
            IntCounterVec::new(
                Opts::new("plasma_epochs_prepared_total", "Total number of prepared epochs"),
                &["kind"],
            )?,
        )?;
        let epochs_finalized = register(
            &registry,
            IntCounterVec::new(
                Opts::new("plasma_epochs_finalized_total", "Total number of finalized epochs"),
                &[],
            )?,
        )?;

        // Requests
        let requests_created = register(
            &registry,
            IntCounterVec::new(
                Opts::new("plasma_requests_created_total", "Total number of created requests"),
                &["category", "type"],
            )?,
        )?;
        let requests_finalized = register(
            &registry,
            IntCounterVec::new(
                Opts::new("plasma_requests_finalized_total", "Total number of applied requests"),
                &["category", "outcome"],
            )?,
        )?;
        let requests_challenged = register(
            &registry,
            IntCounterVec::new(
                Opts::new("plasma_requests_challenged_total", "Total number of challenged exits"),
                &["category"],
            )?,
        )?;

        let forks_created = register(
            &registry,
            IntCounterVec::new(
                Opts::new("plasma_forks_created_total", "Total number of user-activated forks"),
                &[],
            )?,
        )?;
        let finalization_batch_size = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "plasma_finalization_batch_size",
                    "Blocks finalized by one finalization call",
                )
                .buckets(vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0]),
                &[],
            )?,
        )?;

        Ok(Self {
            registry,
            current_fork,
            current_epoch,
            last_block,
            last_finalized_block,
            blocks_submitted,
            epochs_prepared,
            epochs_finalized,
            requests_created,
            requests_finalized,
            requests_challenged,
            forks_created,
            finalization_batch_size,
        })
    }

    pub fn gather(&self) -> Result<String, MetricsError> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::<u8>::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn set_current_fork(&self, v: i64) {
        self.current_fork.set(v);
    }

    pub fn set_current_epoch(&self, v: i64) {
        self.current_epoch.set(v);
    }

    pub fn set_last_finalized_block(&self, v: i64) {
        self.last_finalized_block.set(v);
    }

    pub fn observe_finalization_batch(&self, blocks: u64) {
        self.finalization_batch_size
            .with_label_values::<&str>(&[])
            .observe(blocks as f64);
    }

    /// Updates counters from one emitted event.
    pub fn observe_event(&self, event: &RootChainEvent) {
        match event {
            RootChainEvent::BlockSubmitted {
                block_number,
                is_request,
                user_activated,
                ..
            } => {
                let class = match (is_request, user_activated) {
                    (_, true) => "urb",
                    (true, false) => "orb",
                    (false, false) => "nrb",
                };
                self.blocks_submitted.with_label_values(&[class]).inc();
                self.last_block.set(*block_number as i64);
            }
            RootChainEvent::EpochPrepared {
                epoch_number, kind, ..
            }
            | RootChainEvent::EpochRebased {
                epoch_number, kind, ..
            } => {
                self.epochs_prepared.with_label_values(&[kind.label()]).inc();
                self.current_epoch.set(*epoch_number as i64);
            }
            RootChainEvent::BlockFinalized { block_number, .. } => {
                self.last_finalized_block.set(*block_number as i64);
            }
            RootChainEvent::EpochFinalized {
                end_block_number, ..
            } => {
                self.epochs_finalized.with_label_values::<&str>(&[]).inc();
                self.last_finalized_block.set(*end_block_number as i64);
            }
            RootChainEvent::RequestCreated {
                category, is_exit, ..
            } => {
                let category = category.to_string();
                let kind = if *is_exit { "exit" } else { "enter" };
                self.requests_created
                    .with_label_values(&[category.as_str(), kind])
                    .inc();
            }
            RootChainEvent::RequestFinalized {
                category,
                challenged,
                ..
            } => {
                let category = category.to_string();
                let outcome = if *challenged { "challenged" } else { "applied" };
                self.requests_finalized
                    .with_label_values(&[category.as_str(), outcome])
                    .inc();
            }
            RootChainEvent::RequestChallenged { category, .. } => {
                self.requests_challenged
                    .with_label_values(&[category.to_string()])
                    .inc();
            }
            RootChainEvent::Forked { new_fork, .. } => {
                self.forks_created.with_label_values::<&str>(&[]).inc();
                self.current_fork.set(*new_fork as i64);
            }
        }
    }
}

pub type SharedMetrics = Arc<RootChainMetrics>;
