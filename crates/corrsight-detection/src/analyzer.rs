//! Tiered pairwise correlation analyzer.
//!
//! One tick walks the metric catalog in three priority tiers, fetches
//! the series for each candidate pair, and accepts the pairs whose
//! Pearson statistics pass that tier's thresholds. Tier order, pair
//! order within a tier, and per-pair awaits are all sequential, so a
//! tick over identical inputs yields an identical run.

use crate::history::AnalysisHistory;
use crate::impact::assess_business_impact;
use crate::sink::{pair_label, AnalyzerSink};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use corrsight_core::catalog::{MetricCatalog, MetricCategory};
use corrsight_core::config::{AnalyzerConfig, TierThresholds};
use corrsight_core::events::{
    AnalysisRun, CorrelationEvent, CorrelationType, EventCategory, Significance,
};
use corrsight_core::stats::{align_series, pairwise_stats, MetricSample};
use std::sync::Arc;
use tracing::{debug, info};

/// Source of per-metric time series over a window.
///
/// The production implementation is the ingestion fetcher; tests swap
/// in an in-memory map. Fetch failures surface as empty series.
#[async_trait]
pub trait SeriesSource: std::fmt::Debug + Send + Sync {
    async fn fetch_series(
        &self,
        metric: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<MetricSample>;
}

#[async_trait]
impl SeriesSource for corrsight_ingestion::fetch::SeriesFetcher {
    async fn fetch_series(
        &self,
        metric: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<MetricSample> {
        self.fetch(metric, start, end).await
    }
}

/// The correlation analysis engine. One instance per service; the
/// analysis loop drives it once per tick.
#[derive(Debug)]
pub struct CorrelationAnalyzer {
    source: Arc<dyn SeriesSource>,
    catalog: MetricCatalog,
    config: AnalyzerConfig,
    sink: Arc<dyn AnalyzerSink>,
    history: Arc<AnalysisHistory>,
}

impl CorrelationAnalyzer {
    pub fn new(
        source: Arc<dyn SeriesSource>,
        catalog: MetricCatalog,
        config: AnalyzerConfig,
        sink: Arc<dyn AnalyzerSink>,
        history: Arc<AnalysisHistory>,
    ) -> Self {
        Self {
            source,
            catalog,
            config,
            sink,
            history,
        }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<AnalysisHistory> {
        &self.history
    }

    /// Run one full analysis tick at `now` and append the run to history.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> AnalysisRun {
        let started = std::time::Instant::now();
        let start = now - Duration::minutes(self.config.lookback_minutes);

        let mut events = Vec::new();

        let tier1 = self.analyze_business_pairs(start, now).await;
        let tier1_count = tier1.len();
        events.extend(tier1);

        events.extend(self.analyze_cross_domain_pairs(start, now).await);

        // Infrastructure-internal pairs are noise when business signal
        // is plentiful; only scan them on quiet ticks.
        if tier1_count < self.config.infra_tier_trigger {
            events.extend(self.analyze_infrastructure_pairs(start, now).await);
        } else {
            debug!(
                business_events = tier1_count,
                "skipping infrastructure tier, business tier saturated"
            );
        }

        for event in &events {
            self.sink.correlation_event(event.correlation_type.as_str());
            self.sink.pair_confidence(
                &pair_label(&event.metric1, &event.metric2),
                event.confidence,
            );
        }

        let elapsed = started.elapsed().as_secs_f64();
        self.sink.tick_duration(elapsed);

        let run = AnalysisRun::new(now, events);
        info!(
            total = run.analysis_summary.total_correlations,
            business = run.analysis_summary.business_correlations,
            cross_domain = run.analysis_summary.cross_domain_correlations,
            infrastructure = run.analysis_summary.infrastructure_correlations,
            elapsed_secs = elapsed,
            "analysis tick complete"
        );
        self.history.push(run.clone());
        run
    }

    /// Tier 1: leading metrics of every distinct business group pair
    async fn analyze_business_pairs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<CorrelationEvent> {
        let groups: Vec<(MetricCategory, &[String])> = self.catalog.business_groups().collect();
        let fanout = self.config.business_fanout;

        let mut events = Vec::new();
        for (i, (cat1, metrics1)) in groups.iter().enumerate() {
            for (cat2, metrics2) in &groups[i + 1..] {
                let group = format!("{cat1}_to_{cat2}");
                for m1 in leading(metrics1, fanout) {
                    for m2 in leading(metrics2, fanout) {
                        if let Some(event) = self
                            .evaluate_pair(
                                m1,
                                m2,
                                start,
                                end,
                                TierThresholds::BUSINESS,
                                EventCategory::Business,
                                &group,
                            )
                            .await
                        {
                            events.push(event);
                        }
                    }
                }
            }
        }
        events
    }

    /// Tier 2: leading infrastructure metrics against the leading
    /// metrics of each business group
    async fn analyze_cross_domain_pairs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<CorrelationEvent> {
        let infra = leading(self.catalog.infrastructure(), self.config.cross_domain_infra_fanout);
        let business_fanout = self.config.cross_domain_business_fanout;

        let mut events = Vec::new();
        for infra_metric in infra {
            for (category, metrics) in self.catalog.business_groups() {
                let group = format!("infrastructure_to_{category}");
                for business_metric in leading(metrics, business_fanout) {
                    if let Some(event) = self
                        .evaluate_pair(
                            infra_metric,
                            business_metric,
                            start,
                            end,
                            TierThresholds::CROSS_DOMAIN,
                            EventCategory::CrossDomain,
                            &group,
                        )
                        .await
                    {
                        events.push(event);
                    }
                }
            }
        }
        events
    }

    /// Tier 3: each leading infrastructure metric against its next few
    /// neighbors in catalog order
    async fn analyze_infrastructure_pairs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<CorrelationEvent> {
        let infra = leading(self.catalog.infrastructure(), self.config.infra_fanout);
        let span = self.config.infra_pair_span;

        let mut events = Vec::new();
        for (i, m1) in infra.iter().enumerate() {
            for m2 in infra.iter().skip(i + 1).take(span) {
                if let Some(event) = self
                    .evaluate_pair(
                        m1,
                        m2,
                        start,
                        end,
                        TierThresholds::INFRASTRUCTURE,
                        EventCategory::Infrastructure,
                        "infrastructure_internal",
                    )
                    .await
                {
                    events.push(event);
                }
            }
        }
        events
    }

    /// Fetch, align, and test one metric pair against tier thresholds.
    ///
    /// `None` covers every rejection: missing data, too few aligned
    /// samples, undefined correlation, or thresholds not met.
    async fn evaluate_pair(
        &self,
        metric1: &str,
        metric2: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        thresholds: TierThresholds,
        category: EventCategory,
        correlation_group: &str,
    ) -> Option<CorrelationEvent> {
        let series1 = self.source.fetch_series(metric1, start, end).await;
        let series2 = self.source.fetch_series(metric2, start, end).await;

        let (values1, values2) = align_series(&series1, &series2);
        if values1.len() < self.config.min_samples {
            debug!(
                metric1,
                metric2,
                aligned = values1.len(),
                need = self.config.min_samples,
                "insufficient aligned samples"
            );
            return None;
        }

        let stats = pairwise_stats(&values1, &values2)?;
        if !thresholds.accepts(stats.coefficient, stats.p_value) {
            return None;
        }

        let cat1 = self
            .catalog
            .category_of(metric1)
            .unwrap_or(MetricCategory::Infrastructure);
        let cat2 = self
            .catalog
            .category_of(metric2)
            .unwrap_or(MetricCategory::Infrastructure);

        debug!(
            metric1,
            metric2,
            coefficient = stats.coefficient,
            p_value = stats.p_value,
            samples = stats.sample_size,
            %category,
            "correlation accepted"
        );

        Some(CorrelationEvent {
            metric1: metric1.to_string(),
            metric2: metric2.to_string(),
            correlation_coefficient: stats.coefficient,
            p_value: stats.p_value,
            confidence: stats.coefficient.abs(),
            correlation_type: CorrelationType::from_coefficient(stats.coefficient),
            sample_size: stats.sample_size,
            category,
            correlation_group: correlation_group.to_string(),
            business_impact: assess_business_impact(cat1, cat2, stats.coefficient),
            statistical_significance: Significance::from_p_value(stats.p_value),
            timestamp: end,
        })
    }
}

fn leading(metrics: &[String], n: usize) -> &[String] {
    &metrics[..n.min(metrics.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NoopSink;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct MapSource {
        series: HashMap<String, Vec<MetricSample>>,
    }

    impl MapSource {
        fn with(mut self, metric: &str, values: &[f64]) -> Self {
            let samples = values
                .iter()
                .enumerate()
                .map(|(i, v)| MetricSample::new(i as i64 * 60_000, *v))
                .collect();
            self.series.insert(metric.to_string(), samples);
            self
        }
    }

    #[async_trait]
    impl SeriesSource for MapSource {
        async fn fetch_series(
            &self,
            metric: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Vec<MetricSample> {
            self.series.get(metric).cloned().unwrap_or_default()
        }
    }

    fn small_catalog() -> MetricCatalog {
        MetricCatalog::new(vec![
            (
                MetricCategory::Transaction,
                vec!["txn_rate".to_string(), "txn_failures".to_string()],
            ),
            (MetricCategory::Database, vec!["db_pool".to_string()]),
            (
                MetricCategory::Infrastructure,
                vec!["cpu".to_string(), "memory".to_string()],
            ),
        ])
    }

    fn analyzer(source: MapSource, config: AnalyzerConfig) -> CorrelationAnalyzer {
        CorrelationAnalyzer::new(
            Arc::new(source),
            small_catalog(),
            config,
            Arc::new(NoopSink),
            Arc::new(AnalysisHistory::new(100)),
        )
    }

    const RISING: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    const RISING_X2: [f64; 6] = [2.0, 4.0, 6.0, 8.0, 10.0, 12.0];
    const FALLING: [f64; 6] = [6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
    const FLAT: [f64; 6] = [3.0, 3.0, 3.0, 3.0, 3.0, 3.0];

    #[tokio::test]
    async fn accepts_correlated_business_pair() {
        let source = MapSource::default()
            .with("txn_rate", &RISING)
            .with("db_pool", &RISING_X2);
        let analyzer = analyzer(source, AnalyzerConfig::default());

        let run = analyzer.run_tick(Utc::now()).await;

        let event = run
            .correlations
            .iter()
            .find(|e| e.metric1 == "txn_rate" && e.metric2 == "db_pool")
            .expect("correlated business pair accepted");
        assert_eq!(event.category, EventCategory::Business);
        assert_eq!(event.correlation_group, "transaction_to_database");
        assert_eq!(event.correlation_type, CorrelationType::Positive);
        assert_eq!(event.statistical_significance, Significance::High);
        assert_eq!(event.sample_size, 6);
        assert!(event.correlation_coefficient > 0.99);
        assert!(event.business_impact.starts_with("CRITICAL - "));
    }

    #[tokio::test]
    async fn negative_correlation_is_typed_negative() {
        let source = MapSource::default()
            .with("txn_rate", &RISING)
            .with("db_pool", &FALLING);
        let analyzer = analyzer(source, AnalyzerConfig::default());

        let run = analyzer.run_tick(Utc::now()).await;
        let event = run
            .correlations
            .iter()
            .find(|e| e.metric1 == "txn_rate" && e.metric2 == "db_pool")
            .expect("anti-correlated pair accepted");
        assert_eq!(event.correlation_type, CorrelationType::Negative);
        assert!(event.correlation_coefficient < -0.99);
        assert!((event.confidence - event.correlation_coefficient.abs()).abs() < 1e-12);
    }

    #[tokio::test]
    async fn constant_series_is_rejected() {
        let source = MapSource::default()
            .with("txn_rate", &RISING)
            .with("db_pool", &FLAT);
        let analyzer = analyzer(source, AnalyzerConfig::default());

        let run = analyzer.run_tick(Utc::now()).await;
        assert!(run
            .correlations
            .iter()
            .all(|e| !(e.metric1 == "txn_rate" && e.metric2 == "db_pool")));
    }

    #[tokio::test]
    async fn too_few_aligned_samples_is_rejected() {
        let source = MapSource::default()
            .with("txn_rate", &RISING[..4])
            .with("db_pool", &RISING_X2[..4]);
        let analyzer = analyzer(source, AnalyzerConfig::default());

        let run = analyzer.run_tick(Utc::now()).await;
        assert!(run.correlations.is_empty());
    }

    #[tokio::test]
    async fn missing_metric_yields_no_event() {
        let source = MapSource::default().with("txn_rate", &RISING);
        let analyzer = analyzer(source, AnalyzerConfig::default());

        let run = analyzer.run_tick(Utc::now()).await;
        assert!(run.correlations.is_empty());
    }

    #[tokio::test]
    async fn infrastructure_tier_runs_on_quiet_ticks() {
        // No business data at all, so tier 1 accepts nothing and the
        // infrastructure tier must run.
        let source = MapSource::default()
            .with("cpu", &RISING)
            .with("memory", &RISING_X2);
        let analyzer = analyzer(source, AnalyzerConfig::default());

        let run = analyzer.run_tick(Utc::now()).await;
        let event = run
            .correlations
            .iter()
            .find(|e| e.category == EventCategory::Infrastructure)
            .expect("infrastructure pair accepted");
        assert_eq!(event.correlation_group, "infrastructure_internal");
        assert_eq!(event.business_impact, "LOW - General infrastructure correlation");
    }

    #[tokio::test]
    async fn infrastructure_tier_skipped_when_business_tier_saturated() {
        let source = MapSource::default()
            .with("txn_rate", &RISING)
            .with("db_pool", &RISING_X2)
            .with("cpu", &RISING)
            .with("memory", &RISING_X2);
        let mut config = AnalyzerConfig::default();
        config.infra_tier_trigger = 1;
        let analyzer = analyzer(source, config);

        let run = analyzer.run_tick(Utc::now()).await;
        assert!(run
            .analysis_summary
            .business_correlations
            >= 1);
        assert_eq!(run.analysis_summary.infrastructure_correlations, 0);
    }

    #[tokio::test]
    async fn cross_domain_pairs_use_stricter_thresholds() {
        let source = MapSource::default()
            .with("cpu", &RISING)
            .with("txn_rate", &RISING_X2);
        let analyzer = analyzer(source, AnalyzerConfig::default());

        let run = analyzer.run_tick(Utc::now()).await;
        let event = run
            .correlations
            .iter()
            .find(|e| e.category == EventCategory::CrossDomain)
            .expect("cross-domain pair accepted");
        assert_eq!(event.metric1, "cpu");
        assert_eq!(event.metric2, "txn_rate");
        assert_eq!(event.correlation_group, "infrastructure_to_transaction");
        assert_eq!(event.business_impact, "LOW - Infrastructure correlation with transaction");
    }

    #[tokio::test]
    async fn identical_inputs_produce_identical_runs() {
        let build = || {
            MapSource::default()
                .with("txn_rate", &[1.0, 3.0, 2.0, 5.0, 4.0, 6.0])
                .with("txn_failures", &[2.0, 4.0, 3.0, 7.0, 6.0, 9.0])
                .with("db_pool", &[1.5, 3.5, 2.5, 5.5, 4.5, 6.5])
                .with("cpu", &RISING)
                .with("memory", &FALLING)
        };
        let now = Utc::now();

        let first = analyzer(build(), AnalyzerConfig::default())
            .run_tick(now)
            .await;
        let second = analyzer(build(), AnalyzerConfig::default())
            .run_tick(now)
            .await;

        assert_eq!(first.correlations.len(), second.correlations.len());
        for (a, b) in first.correlations.iter().zip(&second.correlations) {
            assert_eq!(a.metric1, b.metric1);
            assert_eq!(a.metric2, b.metric2);
            assert_eq!(
                a.correlation_coefficient.to_bits(),
                b.correlation_coefficient.to_bits()
            );
            assert_eq!(a.p_value.to_bits(), b.p_value.to_bits());
        }
    }

    #[tokio::test]
    async fn run_is_appended_to_history() {
        let source = MapSource::default()
            .with("txn_rate", &RISING)
            .with("db_pool", &RISING_X2);
        let analyzer = analyzer(source, AnalyzerConfig::default());

        assert!(analyzer.history().is_empty());
        let run = analyzer.run_tick(Utc::now()).await;
        let latest = analyzer.history().latest().expect("run recorded");
        assert_eq!(
            latest.analysis_summary.total_correlations,
            run.analysis_summary.total_correlations
        );
    }
}
