//! Registered target recordings and the per-target breeding guard.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::analysis::{AnalysisError, FeatureExtractor, FeatureSummary};
use crate::audio::RawAudioBuffer;

/// Process-unique target identity, issued by the owning [`PathogenStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PathogenId(pub u64);

impl fmt::Display for PathogenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pg#{}", self.0)
    }
}

/// A recorded target. The buffer is immutable; features are computed at most once.
#[derive(Debug)]
pub struct Pathogen {
    id: PathogenId,
    buffer: RawAudioBuffer,
    features: OnceLock<FeatureSummary>,
}

impl Pathogen {
    fn new(id: PathogenId, buffer: RawAudioBuffer) -> Self {
        Self {
            id,
            buffer,
            features: OnceLock::new(),
        }
    }

    pub fn id(&self) -> PathogenId {
        self.id
    }

    /// Memoized features, analyzing the buffer on first use.
    pub fn features(
        &self,
        extractor: &dyn FeatureExtractor,
    ) -> Result<&FeatureSummary, AnalysisError> {
        if let Some(features) = self.features.get() {
            return Ok(features);
        }
        let summary = extractor.analyze(&self.buffer)?;
        Ok(self.features.get_or_init(|| summary))
    }

    pub fn cached_features(&self) -> Option<&FeatureSummary> {
        self.features.get()
    }
}

/// Live targets keyed by id, plus which of them have a breeding round in flight.
#[derive(Debug, Default)]
pub struct PathogenStore {
    next_id: u64,
    pathogens: BTreeMap<PathogenId, Arc<Pathogen>>,
    breeding: HashSet<PathogenId>,
}

impl PathogenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze `buffer` and register it. Nothing is stored when analysis fails.
    pub fn insert_analyzed(
        &mut self,
        buffer: RawAudioBuffer,
        extractor: &dyn FeatureExtractor,
    ) -> Result<Arc<Pathogen>, AnalysisError> {
        let pathogen = Pathogen::new(PathogenId(self.next_id), buffer);
        pathogen.features(extractor)?;
        self.next_id += 1;
        let pathogen = Arc::new(pathogen);
        self.pathogens.insert(pathogen.id, Arc::clone(&pathogen));
        Ok(pathogen)
    }

    pub fn get(&self, id: PathogenId) -> Option<Arc<Pathogen>> {
        self.pathogens.get(&id).cloned()
    }

    pub fn contains(&self, id: PathogenId) -> bool {
        self.pathogens.contains_key(&id)
    }

    /// Drop a target and its breeding flag.
    pub fn remove(&mut self, id: PathogenId) -> Option<Arc<Pathogen>> {
        self.breeding.remove(&id);
        self.pathogens.remove(&id)
    }

    /// Ids in registration order.
    pub fn ids(&self) -> Vec<PathogenId> {
        self.pathogens.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.pathogens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pathogens.is_empty()
    }

    /// Claim the breeding slot for `id`. False if the target is unknown or already breeding.
    pub fn try_begin_breeding(&mut self, id: PathogenId) -> bool {
        self.pathogens.contains_key(&id) && self.breeding.insert(id)
    }

    pub fn finish_breeding(&mut self, id: PathogenId) {
        self.breeding.remove(&id);
    }

    pub fn is_breeding(&self, id: PathogenId) -> bool {
        self.breeding.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingExtractor {
        calls: AtomicUsize,
    }

    impl FeatureExtractor for CountingExtractor {
        fn analyze(&self, buffer: &RawAudioBuffer) -> Result<FeatureSummary, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let first = buffer.samples().first().ok_or(AnalysisError::EmptyBuffer)?;
            Ok(FeatureSummary::new(vec![*first as f64], vec![1.0, 0.5]))
        }
    }

    fn buffer(value: f32) -> RawAudioBuffer {
        RawAudioBuffer::new(vec![value; 4], 44_100)
    }

    #[test]
    fn ids_increase_and_failed_analysis_stores_nothing() {
        let extractor = CountingExtractor::default();
        let mut store = PathogenStore::new();
        let first = store.insert_analyzed(buffer(220.0), &extractor).unwrap();
        let failed = store.insert_analyzed(RawAudioBuffer::new(Vec::new(), 44_100), &extractor);
        assert!(matches!(failed, Err(AnalysisError::EmptyBuffer)));
        let second = store.insert_analyzed(buffer(440.0), &extractor).unwrap();
        assert_eq!(first.id(), PathogenId(0));
        assert_eq!(second.id(), PathogenId(1));
        assert_eq!(store.ids(), vec![PathogenId(0), PathogenId(1)]);
    }

    #[test]
    fn features_are_computed_once() {
        let extractor = CountingExtractor::default();
        let mut store = PathogenStore::new();
        let pathogen = store.insert_analyzed(buffer(330.0), &extractor).unwrap();
        let peaks = pathogen.features(&extractor).unwrap().peaks.clone();
        pathogen.features(&extractor).unwrap();
        assert_eq!(peaks, vec![330.0]);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert!(pathogen.cached_features().is_some());
    }

    #[test]
    fn breeding_guard_admits_one_round_per_target() {
        let extractor = CountingExtractor::default();
        let mut store = PathogenStore::new();
        let id = store.insert_analyzed(buffer(100.0), &extractor).unwrap().id();
        assert!(store.try_begin_breeding(id));
        assert!(!store.try_begin_breeding(id));
        assert!(store.is_breeding(id));
        store.finish_breeding(id);
        assert!(store.try_begin_breeding(id));
        assert!(!store.try_begin_breeding(PathogenId(99)));
    }

    #[test]
    fn removal_clears_breeding_flag() {
        let extractor = CountingExtractor::default();
        let mut store = PathogenStore::new();
        let id = store.insert_analyzed(buffer(100.0), &extractor).unwrap().id();
        assert!(store.try_begin_breeding(id));
        assert!(store.remove(id).is_some());
        assert!(!store.is_breeding(id));
        assert!(!store.contains(id));
        assert!(store.is_empty());
    }
}
