/*!
Test Harness pour le collector Refocus

Facilite l'écriture de tests de cycles heartbeat avec:
- Un dossier de générateurs temporaire
- Un transport simulé partagé avec le reconciler
- Des helpers pour lancer un cycle à une date donnée
*/

use crate::fixtures::GeneratorDir;
use crate::mock_transport::MockTransport;
use anyhow::Result;
use chrono::{DateTime, Utc};
use refocus_collector::{
    CollectorConfig, CollectorError, CollectorState, CycleReport, MetadataSnapshot, Reconciler,
    RefocusConfig,
};
use serde_json::Value;
use std::path::Path;

pub const TEST_COLLECTOR: &str = "test-collector";
pub const TEST_TOKEN: &str = "test-token";

/// Config complète pointant vers `dir` et le contrôleur `url`
pub fn collector_config(dir: &Path, url: &str, token: &str) -> CollectorConfig {
    CollectorConfig {
        name: Some(TEST_COLLECTOR.to_string()),
        generators_dir: dir.to_path_buf(),
        refocus: RefocusConfig {
            url: Some(url.to_string()),
            collector_token: Some(token.to_string()),
            ..RefocusConfig::default()
        },
        ..CollectorConfig::default()
    }
}

/// Construit un snapshot de métadonnées
pub fn snapshot(pairs: &[(&str, Value)]) -> MetadataSnapshot {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Harness de test complet pour les cycles heartbeat
pub struct TestHarness {
    pub generators: GeneratorDir,
    pub transport: MockTransport,
    reconciler: Reconciler<MockTransport>,
}

impl TestHarness {
    /// Crée un nouveau harness (transport en mode echo)
    pub fn new() -> Result<Self> {
        Self::with_transport(MockTransport::new())
    }

    pub fn with_transport(transport: MockTransport) -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let generators = GeneratorDir::new()?;
        let config = collector_config(generators.path(), "http://mock-controller", TEST_TOKEN);
        let reconciler = Reconciler::new(config, transport.clone());

        Ok(Self {
            generators,
            transport,
            reconciler,
        })
    }

    /// Remplace la config (le dossier de générateurs reste celui du harness
    /// si `config.generators_dir` est vide)
    pub fn with_config(mut self, mut config: CollectorConfig) -> Self {
        if config.generators_dir.as_os_str().is_empty() {
            config.generators_dir = self.generators.path().to_path_buf();
        }
        let state = self.reconciler.state().clone();
        self.reconciler = Reconciler::new(config, self.transport.clone()).with_state(state);
        self
    }

    pub fn with_state(mut self, state: CollectorState) -> Self {
        let config = self.reconciler.config().clone();
        self.reconciler = Reconciler::new(config, self.transport.clone()).with_state(state);
        self
    }

    pub fn state(&self) -> &CollectorState {
        self.reconciler.state()
    }

    /// Lance un cycle maintenant, sans métadonnées
    pub async fn cycle(&mut self) -> Result<CycleReport, CollectorError> {
        self.reconciler.run_cycle(&MetadataSnapshot::new()).await
    }

    /// Lance un cycle à la date `at`
    pub async fn cycle_at(&mut self, at: DateTime<Utc>) -> Result<CycleReport, CollectorError> {
        self.reconciler.run_cycle_at(&MetadataSnapshot::new(), at).await
    }

    /// Lance un cycle avec un snapshot de métadonnées
    pub async fn cycle_with(
        &mut self,
        metadata: &MetadataSnapshot,
        at: DateTime<Utc>,
    ) -> Result<CycleReport, CollectorError> {
        self.reconciler.run_cycle_at(metadata, at).await
    }
}

/// Noms des générateurs d'une liste (pour assertions)
pub fn names(generators: &[refocus_collector::Generator]) -> Vec<String> {
    let mut names: Vec<String> = generators.iter().map(|g| g.name.clone()).collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_harness_runs_a_cycle() {
        let mut harness = TestHarness::new().unwrap();
        harness.generators.write_generator("cpu", json!({})).unwrap();

        let report = harness.cycle().await.unwrap();

        assert_eq!(names(&report.payload.generators_added), vec!["cpu"]);
        assert_eq!(harness.transport.sent_count(), 1);
        assert_eq!(harness.transport.sent()[0].target.name, TEST_COLLECTOR);
        assert!(harness.state().generators.contains("cpu"));
    }

    #[test]
    fn test_snapshot_helper() {
        let snap = snapshot(&[("a", json!(1))]);
        assert_eq!(snap["a"], json!(1));
    }
}
