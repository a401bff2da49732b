use super::types::{QuantileBand, QuantileTransition, SimError, TrialMatrix, YearRatio};

pub fn achievement_ratio(matrix: &TrialMatrix, threshold: f64) -> Vec<YearRatio> {
    let trials = matrix.trial_count();
    matrix
        .years()
        .iter()
        .enumerate()
        .map(|(index, &year)| {
            let hits = matrix
                .row_at(index)
                .iter()
                .filter(|&&total| total >= threshold)
                .count();
            YearRatio {
                year,
                ratio: hits as f64 / trials as f64,
            }
        })
        .collect()
}

pub fn crash_ratio(matrix: &TrialMatrix) -> Vec<YearRatio> {
    achievement_ratio(matrix, 0.0)
        .into_iter()
        .map(|entry| YearRatio {
            year: entry.year,
            ratio: 1.0 - entry.ratio,
        })
        .collect()
}

// Band exceeded with probability percent/100: the (1 - percent/100)-quantile
// of each year's ensemble totals.
pub fn quantile_transition(matrix: &TrialMatrix, percents: &[f64]) -> QuantileTransition {
    let bands = percents
        .iter()
        .map(|&percent| {
            let totals = (0..matrix.horizon())
                .map(|index| {
                    let mut row = matrix.row_at(index).to_vec();
                    percentile(&mut row, 100.0 - percent)
                })
                .collect();
            QuantileBand { percent, totals }
        })
        .collect();

    QuantileTransition {
        years: matrix.years().to_vec(),
        bands,
    }
}

pub fn totals_in_year(matrix: &TrialMatrix, year: i32) -> Result<&[f64], SimError> {
    let Some(index) = matrix.year_index(year) else {
        return Err(SimError::Query(format!(
            "year {year} is outside the simulated horizon"
        )));
    };
    Ok(matrix.row_at(index))
}

fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}
