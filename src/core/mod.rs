mod distribution;
mod engine;
mod rng;
mod stats;
mod types;

pub use distribution::{ReturnDistribution, SHARE_TOLERANCE};
pub use engine::Simulator;
pub use rng::{Rng, derive_seed};
pub use stats::{achievement_ratio, crash_ratio, quantile_transition, totals_in_year};
pub use types::{
    AllocationWeight, AssetPlanEntry, InitialConditions, InvestAllocation, QuantileBand,
    QuantileTransition, SimError, SimulationState, TrialMatrix, TrialResult, YearRatio, YearRecord,
};
