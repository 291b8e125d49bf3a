use std::sync::Arc;

/// Structured, in-process event hook for observability.
///
/// The reader never logs on its own. Callers that want diagnostics provide an implementation
/// that forwards these events to `tracing`, `log`, metrics, or custom sinks.
pub trait BlockEventListener: std::fmt::Debug + Send + Sync + 'static {
    fn on_event(&self, event: BlockEvent);
}

/// Structured events emitted by the readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockEvent {
    IndexOpened {
        label_indices: usize,
        postings_entries: usize,
    },
    IndexOpenFailed {
        error: String,
    },
    SeriesReaderOpenFailed {
        error: String,
    },

    ChecksumMismatch {
        offset: u32,
        expected: u32,
        actual: u32,
    },
    SeriesDecodeFailed {
        series_ref: u32,
        error: String,
    },
}

#[derive(Debug)]
pub struct NoopEventListener;

impl BlockEventListener for NoopEventListener {
    #[inline]
    fn on_event(&self, _event: BlockEvent) {}
}

pub fn noop_event_listener() -> Arc<dyn BlockEventListener> {
    Arc::new(NoopEventListener)
}

/// Metrics instrumentation and in-process scraping.
///
/// Recording is a no-op until a recorder is installed, so the library stays silent by default.
pub mod block_metrics {
    use ::metrics::{describe_counter, Unit};

    #[cfg(feature = "prometheus")]
    use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
    #[cfg(feature = "prometheus")]
    use std::sync::atomic::{AtomicBool, Ordering};
    #[cfg(feature = "prometheus")]
    use std::sync::{Arc, Mutex};
    #[cfg(feature = "prometheus")]
    use std::thread::JoinHandle;
    #[cfg(feature = "prometheus")]
    use std::time::Duration;

    // Counters are exposed as `<name>_total` by the Prometheus exporter.

    pub const SERIES_DECODED: &str = "tsblock_series_decoded";
    pub const SERIES_NOT_IN_RANGE: &str = "tsblock_series_not_in_range";
    pub const CHUNKS_SKIPPED: &str = "tsblock_chunks_skipped";
    pub const POSTINGS_LOOKUPS: &str = "tsblock_postings_lookups";
    pub const CHUNK_READS: &str = "tsblock_chunk_reads";
    pub const DECODE_ERRORS: &str = "tsblock_decode_errors";

    /// Handle to the in-process Prometheus recorder/scrape renderer.
    ///
    /// This does **not** start an HTTP server. Call [`InProcessPrometheus::render`] to scrape.
    #[cfg(feature = "prometheus")]
    #[derive(Debug)]
    pub struct InProcessPrometheus {
        handle: PrometheusHandle,
        stop: Arc<AtomicBool>,
        upkeep_thread: Mutex<Option<JoinHandle<()>>>,
    }

    #[cfg(feature = "prometheus")]
    impl InProcessPrometheus {
        /// Installs a global Prometheus recorder (once per process) and starts a small upkeep thread.
        pub fn install(upkeep_interval: Duration) -> Result<Self, MetricsInitError> {
            describe_all();

            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(MetricsInitError::from_build_error)?;

            let stop = Arc::new(AtomicBool::new(false));
            let stop_clone = stop.clone();
            let handle_clone = handle.clone();
            let upkeep_thread = std::thread::Builder::new()
                .name("tsblock-metrics-upkeep".to_string())
                .spawn(move || {
                    while !stop_clone.load(Ordering::Relaxed) {
                        std::thread::sleep(upkeep_interval);
                        handle_clone.run_upkeep();
                    }
                })
                .map_err(|e| MetricsInitError::ThreadSpawn(e.to_string()))?;

            Ok(Self {
                handle,
                stop,
                upkeep_thread: Mutex::new(Some(upkeep_thread)),
            })
        }

        /// Renders the current metrics in the Prometheus text exposition format.
        pub fn render(&self) -> String {
            self.handle.render()
        }
    }

    #[cfg(feature = "prometheus")]
    impl Drop for InProcessPrometheus {
        fn drop(&mut self) {
            self.stop.store(true, Ordering::Relaxed);
            if let Ok(mut guard) = self.upkeep_thread.lock() {
                if let Some(t) = guard.take() {
                    let _ = t.join();
                }
            }
        }
    }

    #[cfg(feature = "prometheus")]
    #[derive(Debug, thiserror::Error)]
    pub enum MetricsInitError {
        #[error("metrics recorder already installed")]
        AlreadyInstalled,
        #[error("failed to install prometheus recorder: {0}")]
        Install(String),
        #[error("failed to spawn upkeep thread: {0}")]
        ThreadSpawn(String),
    }

    #[cfg(feature = "prometheus")]
    impl MetricsInitError {
        fn from_build_error(e: BuildError) -> Self {
            match e {
                BuildError::FailedToSetGlobalRecorder(_) => MetricsInitError::AlreadyInstalled,
                other => MetricsInitError::Install(other.to_string()),
            }
        }
    }

    #[inline]
    pub fn record_series_decoded(chunks_kept: usize, chunks_skipped: usize) {
        if chunks_kept == 0 {
            ::metrics::counter!(SERIES_NOT_IN_RANGE).increment(1);
        } else {
            ::metrics::counter!(SERIES_DECODED).increment(1);
        }
        if chunks_skipped > 0 {
            ::metrics::counter!(CHUNKS_SKIPPED).increment(chunks_skipped as u64);
        }
    }

    #[inline]
    pub fn record_postings_lookup() {
        ::metrics::counter!(POSTINGS_LOOKUPS).increment(1);
    }

    #[inline]
    pub fn record_chunk_read() {
        ::metrics::counter!(CHUNK_READS).increment(1);
    }

    #[inline]
    pub fn record_decode_error() {
        ::metrics::counter!(DECODE_ERRORS).increment(1);
    }

    pub fn describe_all() {
        describe_counter!(
            SERIES_DECODED,
            Unit::Count,
            "Series records decoded with at least one chunk in the queried range."
        );
        describe_counter!(
            SERIES_NOT_IN_RANGE,
            Unit::Count,
            "Series records decoded with no chunk in the queried range."
        );
        describe_counter!(
            CHUNKS_SKIPPED,
            Unit::Count,
            "Chunk metas dropped by time filtering (before or after the queried range)."
        );
        describe_counter!(
            POSTINGS_LOOKUPS,
            Unit::Count,
            "Postings lists resolved from the postings hashmap."
        );
        describe_counter!(
            CHUNK_READS,
            Unit::Count,
            "Chunks read from the series-data buffer and handed to the codec."
        );
        describe_counter!(
            DECODE_ERRORS,
            Unit::Count,
            "Index or chunk decode operations that failed on malformed input."
        );
    }
}
