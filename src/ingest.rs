//! Ingestion orchestrator - acquire, decode, normalize, emit
//!
//! Entries are streamed to the sink as soon as they are built, in source
//! order. Every `progress_every` entries the sink gets a progress update and
//! the task yields to the scheduler.

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::acquire::StrategyChain;
use crate::config::Config;
use crate::decode::locate_records;
use crate::error::IngestError;
use crate::normalize::{CatalogEntry, Normalizer};

/// Receives the ingestion stream
pub trait IngestSink {
    /// Called once per normalized, deduplicated entry
    fn on_entry(&mut self, entry: CatalogEntry);

    /// Called at start, periodically, and on completion
    fn on_progress(&mut self, status: &str, count: usize);
}

/// Adapts a pair of closures to [`IngestSink`]
pub struct Callbacks<E, P> {
    pub on_entry: E,
    pub on_progress: P,
}

impl<E, P> IngestSink for Callbacks<E, P>
where
    E: FnMut(CatalogEntry),
    P: FnMut(&str, usize),
{
    fn on_entry(&mut self, entry: CatalogEntry) {
        (self.on_entry)(entry)
    }

    fn on_progress(&mut self, status: &str, count: usize) {
        (self.on_progress)(status, count)
    }
}

/// What a completed run did
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub strategy: Option<String>,
    pub records: usize,
    pub emitted: usize,
    pub finished_at: DateTime<Local>,
}

/// One configured ingestion pipeline. Each `run` starts from scratch.
pub struct Ingestor {
    chain: StrategyChain,
    endpoint: String,
    fallback_url: String,
    progress_every: usize,
}

impl Ingestor {
    pub fn new(chain: StrategyChain, config: &Config) -> Self {
        Self {
            chain,
            endpoint: config.endpoint.clone(),
            fallback_url: config.fallback_url.clone(),
            progress_every: config.progress_every.max(1),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let chain = StrategyChain::from_config(config)?;
        Ok(Self::new(chain, config))
    }

    pub async fn run(&self, sink: &mut dyn IngestSink) -> Result<IngestSummary, IngestError> {
        tracing::info!("Starting ingestion from {}", self.endpoint);
        sink.on_progress("Fetching catalog", 0);

        let acquired = self.chain.fetch(&self.endpoint).await?;
        let mut summary = process(&acquired.value, &self.fallback_url, self.progress_every, sink).await?;
        summary.strategy = Some(acquired.strategy);
        Ok(summary)
    }
}

/// Decode and normalize an already-acquired document
pub async fn process(
    value: &Value,
    fallback_url: &str,
    progress_every: usize,
    sink: &mut dyn IngestSink,
) -> Result<IngestSummary, IngestError> {
    let records = locate_records(value)
        .records()
        .filter(|r| !r.is_empty())
        .ok_or(IngestError::EmptyCatalog)?;

    tracing::info!("Processing {} raw records", records.len());
    sink.on_progress(&format!("Processing {} products", records.len()), 0);

    let progress_every = progress_every.max(1);
    let mut normalizer = Normalizer::new(fallback_url);
    let mut emitted = 0usize;

    for raw in &records {
        if let Some(entry) = normalizer.entry(raw) {
            sink.on_entry(entry);
            emitted += 1;

            if emitted % progress_every == 0 {
                sink.on_progress(&format!("Loaded {} colors", emitted), emitted);
                tokio::task::yield_now().await;
            }
        }
    }

    if emitted == 0 {
        tracing::error!("None of {} records produced a valid color", records.len());
        return Err(IngestError::NoValidEntries);
    }

    tracing::info!("Ingested {} entries from {} records", emitted, records.len());
    sink.on_progress(&format!("Loaded {} colors", emitted), emitted);

    Ok(IngestSummary {
        strategy: None,
        records: records.len(),
        emitted,
        finished_at: Local::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    use crate::acquire::tests::{Fake, FakeStrategy};
    use crate::category::Category;

    #[derive(Default)]
    struct Recorder {
        entries: Vec<CatalogEntry>,
        progress: Vec<(String, usize)>,
    }

    impl IngestSink for Recorder {
        fn on_entry(&mut self, entry: CatalogEntry) {
            self.entries.push(entry);
        }

        fn on_progress(&mut self, status: &str, count: usize) {
            self.progress.push((status.to_string(), count));
        }
    }

    fn ingestor(strategies: Vec<Box<dyn crate::acquire::Strategy>>) -> Ingestor {
        let config = Config {
            progress_every: 2,
            ..Config::default()
        };
        Ingestor::new(StrategyChain::new(strategies, Duration::from_secs(5)), &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_strategy_scenario() {
        let body = json!({"products": [{"id": "1", "hex": "#FF0000", "product": "X", "color": "Red"}]});
        let ingestor = ingestor(vec![
            FakeStrategy::boxed("slow", Fake::Hang),
            FakeStrategy::boxed("ok", Fake::Respond(body)),
        ]);

        let mut sink = Recorder::default();
        let summary = ingestor.run(&mut sink).await.unwrap();

        assert_eq!(sink.entries.len(), 1);
        assert_eq!(sink.entries[0].category(), Category::Other);
        assert_eq!(sink.entries[0].hex(), "#FF0000");
        assert_eq!(summary.strategy.as_deref(), Some("ok"));
        assert_eq!(summary.emitted, 1);
        assert_eq!(sink.progress.first().unwrap().1, 0);
        assert_eq!(sink.progress.last().unwrap().1, 1);
    }

    #[tokio::test]
    async fn test_stream_order_dedup_and_progress() {
        let value = json!([
            {"id": "b", "hex": "#111"},
            {"id": "a", "hex": "nope"},
            {"id": "c", "hex": "222"},
            {"id": "b", "hex": "#333"},
            null,
            {"id": "d", "hex": "#444"},
            {"id": "e", "hex": "#555"}
        ]);
        let mut sink = Recorder::default();
        let summary = process(&value, "https://x", 2, &mut sink).await.unwrap();

        let ids: Vec<&str> = sink.entries.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["b", "c", "d", "e"]);
        assert_eq!(sink.entries[0].hex(), "#111");
        assert_eq!(summary.records, 7);
        assert_eq!(summary.emitted, 4);

        let counts: Vec<usize> = sink.progress.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![0, 2, 4, 4]);
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let mut sink = Recorder::default();
        assert!(matches!(
            process(&json!({"foo": "bar"}), "https://x", 10, &mut sink).await,
            Err(IngestError::EmptyCatalog)
        ));
        assert!(matches!(
            process(&json!({"data": []}), "https://x", 10, &mut sink).await,
            Err(IngestError::EmptyCatalog)
        ));
        assert!(sink.entries.is_empty());
    }

    #[tokio::test]
    async fn test_no_valid_entries() {
        let mut sink = Recorder::default();
        let value = json!({"items": [{"name": "no hex"}, {"hex": "#xyz", "id": 1}]});
        assert!(matches!(
            process(&value, "https://x", 10, &mut sink).await,
            Err(IngestError::NoValidEntries)
        ));
    }

    #[tokio::test]
    async fn test_single_anonymous_record() {
        let mut sink = Recorder::default();
        let summary = process(&json!([{"hex": "#f00"}, {"hex": "#0f0"}]), "https://x", 10, &mut sink)
            .await
            .unwrap();
        assert_eq!(summary.emitted, 1);
        assert_eq!(sink.entries[0].hex(), "#f00");
    }

    #[tokio::test]
    async fn test_summary_timestamp() {
        let before = Local::now();
        let mut sink = Recorder::default();
        let summary = process(&json!([{"id": "t", "hex": "#fff"}]), "https://x", 10, &mut sink)
            .await
            .unwrap();
        let after = Local::now();

        assert!(summary.finished_at >= before);
        assert!(summary.finished_at <= after);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_failure_propagates() {
        let ingestor = ingestor(vec![
            FakeStrategy::boxed("a", Fake::Fail(404)),
            FakeStrategy::boxed("b", Fake::Hang),
        ]);
        let mut sink = Recorder::default();
        let err = ingestor.run(&mut sink).await.unwrap_err();
        assert_eq!(err.to_string(), "could not reach the data source (2 strategies failed)");
        assert_eq!(sink.progress.len(), 1);
    }

    #[tokio::test]
    async fn test_closure_sink() {
        let mut found = Vec::new();
        let mut last = 0;
        {
            let mut sink = Callbacks {
                on_entry: |e: CatalogEntry| found.push(e.id().to_string()),
                on_progress: |_: &str, count: usize| last = count,
            };
            process(&json!([{"id": "z", "hex": "#abc"}]), "https://x", 10, &mut sink)
                .await
                .unwrap();
        }
        assert_eq!(found, vec!["z"]);
        assert_eq!(last, 1);
    }
}
