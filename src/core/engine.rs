use tracing::{debug, info};

use super::distribution::ReturnDistribution;
use super::rng::{Rng, derive_seed};
use super::types::{
    AssetPlanEntry, InitialConditions, InvestAllocation, SimError, SimulationState, TrialMatrix,
    TrialResult, YearRecord,
};

const PROGRESS_CHUNK: u32 = 100;

// Allocation weights resolved to distribution indices at construction, so the
// per-year sampling loop never does name lookups.
#[derive(Debug, Clone)]
struct ResolvedAllocation {
    weights: Vec<(usize, f64)>,
}

#[derive(Debug)]
pub struct Simulator {
    distributions: Vec<ReturnDistribution>,
    asset_plan: Vec<AssetPlanEntry>,
    invest_plan: Vec<ResolvedAllocation>,
    initial: InitialConditions,
}

impl Simulator {
    pub fn new(
        distributions: Vec<ReturnDistribution>,
        asset_plan: Vec<AssetPlanEntry>,
        invest_plan: Vec<InvestAllocation>,
        initial: InitialConditions,
    ) -> Result<Self, SimError> {
        if asset_plan.len() != invest_plan.len() {
            return Err(SimError::PlanAlignment(format!(
                "asset plan covers {} years but invest plan covers {}",
                asset_plan.len(),
                invest_plan.len()
            )));
        }

        for (idx, dist) in distributions.iter().enumerate() {
            if distributions[..idx]
                .iter()
                .any(|other| other.asset() == dist.asset())
            {
                return Err(SimError::Distribution(format!(
                    "duplicate distribution for asset class {}",
                    dist.asset()
                )));
            }
        }

        let mut resolved = Vec::with_capacity(invest_plan.len());
        for (year_offset, allocation) in invest_plan.iter().enumerate() {
            let mut weights = Vec::with_capacity(allocation.weights.len());
            for entry in &allocation.weights {
                let Some(dist_index) = distributions
                    .iter()
                    .position(|d| d.asset() == entry.asset)
                else {
                    return Err(SimError::PlanAlignment(format!(
                        "year {}: no return distribution for asset class {}",
                        initial.year + 1 + year_offset as i32,
                        entry.asset
                    )));
                };
                weights.push((dist_index, entry.weight));
            }
            resolved.push(ResolvedAllocation { weights });
        }

        Ok(Self {
            distributions,
            asset_plan,
            invest_plan: resolved,
            initial,
        })
    }

    pub fn initial_year(&self) -> i32 {
        self.initial.year
    }

    pub fn horizon(&self) -> usize {
        self.asset_plan.len()
    }

    // One simulation-year. The step order is load-bearing: inflation, then
    // shortfall absorption, then returns on the pre-contribution balance,
    // then the saving/invest waterfall.
    fn advance_one_year(
        &self,
        state: &mut SimulationState,
        entry: &AssetPlanEntry,
        allocation: &ResolvedAllocation,
        rng: &mut Rng,
    ) -> (f64, f64) {
        state.year += 1;

        let inflation_coeff = self
            .initial
            .inflation_rate
            .powi(state.year - self.initial.year);
        let cost = entry.cost * inflation_coeff;

        // Depleted cash liquidates investments; if those run out too, the
        // remaining deficit stays on the cash side and the portfolio is ruined.
        if state.cash_asset <= 0.0 {
            let combined = state.invest_asset + state.cash_asset;
            if combined >= 0.0 {
                state.invest_asset = combined;
                state.cash_asset = 0.0;
            } else {
                state.cash_asset = combined;
                state.invest_asset = 0.0;
            }
        }

        // Returns accrue on the balance held before this year's contributions.
        let invested_base = state.invest_asset;
        let mut invest_profit = 0.0;
        let mut blended_rate = 0.0;
        for &(dist_index, weight) in &allocation.weights {
            let rate = self.distributions[dist_index].sample(rng);
            invest_profit += invested_base * weight * rate;
            blended_rate += weight * rate;
        }
        state.invest_asset += invest_profit;

        let raw_profit = entry.income - cost;

        // Saving target fills first, then invest up to its target, then any
        // remaining surplus falls back to cash.
        if raw_profit <= entry.saving_target {
            state.cash_asset += raw_profit;
        } else if raw_profit <= entry.saving_target + entry.invest_target {
            state.cash_asset += entry.saving_target;
            state.invest_asset += raw_profit - entry.saving_target;
        } else {
            state.cash_asset += raw_profit - entry.invest_target;
            state.invest_asset += entry.invest_target;
        }

        state.total_asset = state.cash_asset + state.invest_asset;
        (invest_profit, blended_rate)
    }

    fn run_trial(&self, rng: &mut Rng) -> TrialResult {
        let mut state =
            SimulationState::new(self.initial.year, self.initial.cash, self.initial.invest);
        let mut records = Vec::with_capacity(self.asset_plan.len());

        for (entry, allocation) in self.asset_plan.iter().zip(&self.invest_plan) {
            let (profit, rate) = self.advance_one_year(&mut state, entry, allocation, rng);
            records.push(YearRecord {
                year: state.year,
                cash: state.cash_asset,
                invest: state.invest_asset,
                total: state.total_asset,
                profit,
                rate,
            });
        }

        TrialResult { records }
    }

    pub fn run_single_trial(&self) -> TrialResult {
        let mut rng = Rng::new(derive_seed(self.initial.seed, 0));
        self.run_trial(&mut rng)
    }

    pub fn run_ensemble(&self, trials: u32) -> TrialMatrix {
        let years = (1..=self.horizon() as i32)
            .map(|offset| self.initial.year + offset)
            .collect();
        let mut matrix = TrialMatrix::with_horizon(years);

        for trial in 0..trials {
            let mut rng = Rng::new(derive_seed(self.initial.seed, trial));
            let result = self.run_trial(&mut rng);
            let totals: Vec<f64> = result.records.iter().map(|r| r.total).collect();
            matrix.push_trial(&totals);

            if (trial + 1) % PROGRESS_CHUNK == 0 {
                debug!(completed = trial + 1, total = trials, "ensemble progress");
            }
        }

        info!(trials, horizon = self.horizon(), "ensemble complete");
        matrix
    }
}
