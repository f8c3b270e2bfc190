//! Read-only view of the population for display and logging.

use serde::Serialize;

use super::antibody::{AntibodyId, AntibodyState};
use super::pathogens::PathogenId;
use crate::audio::Position;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    /// Logical time in seconds.
    pub clock: f64,
    pub rounds_in_flight: usize,
    pub targets: Vec<TargetSnapshot>,
    pub candidates: Vec<CandidateSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetSnapshot {
    pub id: PathogenId,
    pub breeding: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSnapshot {
    pub id: AntibodyId,
    pub state: AntibodyState,
    pub position: Position,
    /// Amplitude times envelope at the snapshot time; zero while silent.
    pub level: f64,
    pub plays: u32,
    pub marked_for_deletion: bool,
}

impl Snapshot {
    pub fn playing(&self) -> usize {
        self.candidates.iter().filter(|c| c.level > 0.0).count()
    }

    /// Compact single-line JSON for log output.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
