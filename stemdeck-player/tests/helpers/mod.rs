//! Shared fixtures for stemdeck-player integration tests

#![allow(dead_code)]

pub mod audio_generator;

use audio_generator::{generate_sine_wav, TEST_SAMPLE_RATE};
use std::sync::Arc;
use stemdeck_common::config::{reference_manifest, ManifestEntry};
use stemdeck_player::config::EngineConfig;
use stemdeck_player::engine::{BundleResolver, ManualClock, OfflineGraph, Transport};
use tempfile::TempDir;

/// The four reference stems written into a temp asset directory
pub struct StemFixture {
    pub dir: TempDir,
    pub manifest: Vec<ManifestEntry>,
}

impl StemFixture {
    /// Reference manifest, every stem `duration_ms` long
    pub fn reference(duration_ms: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let manifest = reference_manifest();
        for (i, entry) in manifest.iter().enumerate() {
            generate_sine_wav(
                dir.path().join(&entry.filename),
                duration_ms,
                110.0 * (i + 1) as f32,
                0.5,
            )
            .unwrap();
        }
        Self { dir, manifest }
    }

    pub fn resolver(&self) -> BundleResolver {
        BundleResolver::new(self.dir.path())
    }
}

/// Transport over an offline graph and a manual clock
///
/// Returns handles to the graph and clock so tests can drive time.
pub fn offline_transport(fixture: &StemFixture) -> (Transport, OfflineGraph, ManualClock) {
    offline_transport_with_graph(fixture, OfflineGraph::new(TEST_SAMPLE_RATE))
}

pub fn offline_transport_with_graph(
    fixture: &StemFixture,
    graph: OfflineGraph,
) -> (Transport, OfflineGraph, ManualClock) {
    let clock = ManualClock::new();
    let transport = Transport::new(
        Box::new(graph.clone()),
        Box::new(fixture.resolver()),
        Arc::new(clock.clone()),
        EngineConfig::default(),
    );
    (transport, graph, clock)
}
