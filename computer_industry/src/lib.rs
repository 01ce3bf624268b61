//! History-friendly model of the computer industry.
//!
//! A discrete-time, agent-based simulation of firm entry, R&D-driven
//! innovation, market competition and exit, in the tradition of the
//! "history-friendly" industrial dynamics literature. Heterogeneous firms
//! invest in R&D along a cost/performance trajectory, innovate
//! stochastically against a technology frontier, compete for buyers in one
//! or more demand segments through a discrete-choice allocation rule, and
//! exit when staying in the industry stops paying.
//!
//! Runs are bit-reproducible: every stochastic draw flows through a single
//! seeded [`rng::JavaRandom`] per model instance, so a given seed yields an
//! identical trajectory on any platform.

use serde::{Deserialize, Serialize};

// ============================================================================
// Modules
// ============================================================================

pub mod batch;
pub mod firm;
pub mod industry;
pub mod model;
pub mod params;
pub mod rng;
pub mod snapshot;
pub mod statistics;
pub mod technology;
pub mod user_class;

pub use batch::{run_batch, RunSummary};
pub use firm::Firm;
pub use industry::Industry;
pub use model::Model;
pub use params::{
    AdoptionWindow, DiversificationRule, GenerationEntry, IndustryParams, ParamsError, SimParams,
    UserClassParams,
};
pub use rng::JavaRandom;
pub use snapshot::{from_json, to_json};
pub use statistics::{ClassRecord, PeriodRecord, StatisticsRecorder};
pub use technology::Technology;
pub use user_class::{Buyer, UserClass};

// ============================================================================
// Shared types
// ============================================================================

/// Entry cohort of a firm.
///
/// First-generation firms are founded at model start on the initial
/// technology; second-generation firms enter at a scheduled period with a
/// superior technology; diversified firms are spin-offs of incumbents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Generation {
    First,
    Second,
    Diversified,
}

impl Generation {
    /// Stable slot used when tallying firms by cohort.
    pub fn index(self) -> usize {
        match self {
            Generation::First => 0,
            Generation::Second => 1,
            Generation::Diversified => 2,
        }
    }
}
