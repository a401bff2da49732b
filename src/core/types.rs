use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid return distribution: {0}")]
    Distribution(String),
    #[error("plan misalignment: {0}")]
    PlanAlignment(String),
    #[error("invalid query: {0}")]
    Query(String),
}

#[derive(Debug, Clone, Copy)]
pub struct AssetPlanEntry {
    pub cost: f64,
    pub income: f64,
    pub saving_target: f64,
    pub invest_target: f64,
}

#[derive(Debug, Clone)]
pub struct AllocationWeight {
    pub asset: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default)]
pub struct InvestAllocation {
    pub weights: Vec<AllocationWeight>,
}

impl InvestAllocation {
    pub fn new(weights: Vec<AllocationWeight>) -> Self {
        Self { weights }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InitialConditions {
    pub year: i32,
    pub cash: f64,
    pub invest: f64,
    pub inflation_rate: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct SimulationState {
    pub year: i32,
    pub cash_asset: f64,
    pub invest_asset: f64,
    pub total_asset: f64,
}

impl SimulationState {
    pub fn new(year: i32, cash_asset: f64, invest_asset: f64) -> Self {
        Self {
            year,
            cash_asset,
            invest_asset,
            total_asset: cash_asset + invest_asset,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: i32,
    pub cash: f64,
    pub invest: f64,
    pub total: f64,
    pub profit: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialResult {
    pub records: Vec<YearRecord>,
}

#[derive(Debug, Clone)]
pub struct TrialMatrix {
    years: Vec<i32>,
    rows: Vec<Vec<f64>>,
    trials: usize,
}

impl TrialMatrix {
    pub(crate) fn with_horizon(years: Vec<i32>) -> Self {
        let rows = years.iter().map(|_| Vec::new()).collect();
        Self {
            years,
            rows,
            trials: 0,
        }
    }

    // One call per trial; each trial fills a disjoint column.
    pub(crate) fn push_trial(&mut self, totals: &[f64]) {
        debug_assert_eq!(totals.len(), self.years.len());
        for (row, &total) in self.rows.iter_mut().zip(totals) {
            row.push(total);
        }
        self.trials += 1;
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn horizon(&self) -> usize {
        self.years.len()
    }

    pub fn trial_count(&self) -> usize {
        self.trials
    }

    pub(crate) fn row_at(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub(crate) fn year_index(&self, year: i32) -> Option<usize> {
        self.years.iter().position(|&y| y == year)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRatio {
    pub year: i32,
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantileBand {
    pub percent: f64,
    pub totals: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantileTransition {
    pub years: Vec<i32>,
    pub bands: Vec<QuantileBand>,
}
