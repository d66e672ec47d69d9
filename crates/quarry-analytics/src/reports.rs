//! The derived reports.
//!
//! Every report is a pure function of its inputs and iterates in a fixed
//! order, so equal inputs always give bit-identical output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::input::{PopulationRecord, SeriesRow};

/// Mean and sample standard deviation of population over a year range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub start_year: i32,
    pub end_year: i32,
    /// Distinct years that contributed a value, ascending.
    pub years: Vec<i32>,
    pub count: usize,
    /// `None` without any values.
    pub mean: Option<f64>,
    /// `None` with fewer than two values.
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestYear {
    pub series_id: String,
    pub year: i32,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRow {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    pub value: f64,
    pub population: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedReport {
    pub series_id: String,
    pub period: String,
    pub rows: Vec<CombinedRow>,
    pub records_with_population: usize,
}

/// Population statistics for `start_year..=end_year`.
#[must_use]
pub fn population_stats(
    records: &[PopulationRecord],
    start_year: i32,
    end_year: i32,
) -> PopulationStats {
    let mut in_range: Vec<(i32, f64)> = records
        .iter()
        .filter(|r| (start_year..=end_year).contains(&r.year))
        .filter_map(|r| r.population.map(|p| (r.year, p)))
        .collect();
    in_range.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let values: Vec<f64> = in_range.iter().map(|(_, p)| *p).collect();
    let mut years: Vec<i32> = in_range.iter().map(|(y, _)| *y).collect();
    years.dedup();

    let (mean, std_dev) = mean_and_sample_std(&values);
    PopulationStats {
        start_year,
        end_year,
        years,
        count: values.len(),
        mean,
        std_dev,
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_and_sample_std(values: &[f64]) -> (Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (Some(mean), None);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (Some(mean), Some(variance.sqrt()))
}

/// For each series, the year whose quarterly values (period starting with
/// `Q`) sum highest. Ties go to the earliest year. Sorted by series id.
#[must_use]
pub fn best_years(rows: &[SeriesRow]) -> Vec<BestYear> {
    let mut sums: BTreeMap<(&str, i32), f64> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.period.starts_with('Q')) {
        *sums.entry((row.series_id.as_str(), row.year)).or_insert(0.0) += row.value;
    }

    let mut best: BTreeMap<&str, (i32, f64)> = BTreeMap::new();
    // Keys iterate by (series, year) ascending, so a strict comparison keeps
    // the earliest year on ties.
    for ((series, year), total) in sums {
        best.entry(series)
            .and_modify(|current| {
                if total > current.1 {
                    *current = (year, total);
                }
            })
            .or_insert((year, total));
    }

    best.into_iter()
        .map(|(series_id, (year, total_value))| BestYear {
            series_id: series_id.to_string(),
            year,
            total_value,
        })
        .collect()
}

/// Rows for `series_id`/`period`, left-joined with population by year.
///
/// When the snapshot holds several records for one year, the first one
/// with a value is used.
#[must_use]
pub fn combined_report(
    rows: &[SeriesRow],
    population: &[PopulationRecord],
    series_id: &str,
    period: &str,
) -> CombinedReport {
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for record in population {
        if let Some(value) = record.population {
            by_year.entry(record.year).or_insert(value);
        }
    }

    let mut joined: Vec<CombinedRow> = rows
        .iter()
        .filter(|r| r.series_id == series_id && r.period == period)
        .map(|r| CombinedRow {
            series_id: r.series_id.clone(),
            year: r.year,
            period: r.period.clone(),
            value: r.value,
            population: by_year.get(&r.year).copied(),
        })
        .collect();
    joined.sort_by_key(|r| r.year);

    CombinedReport {
        series_id: series_id.to_string(),
        period: period.to_string(),
        records_with_population: joined.iter().filter(|r| r.population.is_some()).count(),
        rows: joined,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn row(series: &str, year: i32, period: &str, value: f64) -> SeriesRow {
        SeriesRow {
            series_id: series.into(),
            year,
            period: period.into(),
            value,
        }
    }

    fn pop(year: i32, population: f64) -> PopulationRecord {
        PopulationRecord {
            year,
            population: Some(population),
        }
    }

    #[test]
    fn population_stats_over_inclusive_range() {
        let records = vec![
            pop(2012, 1_000.0),
            pop(2013, 10.0),
            pop(2014, 20.0),
            pop(2018, 30.0),
            pop(2019, 1_000.0),
        ];
        let stats = population_stats(&records, 2013, 2018);
        assert_eq!(stats.years, vec![2013, 2014, 2018]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, Some(20.0));
        assert_eq!(stats.std_dev, Some(10.0));
    }

    #[test]
    fn population_stats_degenerate_inputs() {
        let none = population_stats(&[], 2013, 2018);
        assert_eq!((none.mean, none.std_dev), (None, None));
        let one = population_stats(&[pop(2015, 7.0)], 2013, 2018);
        assert_eq!((one.mean, one.std_dev), (Some(7.0), None));
    }

    #[test]
    fn best_year_sums_quarters_only() {
        let rows = vec![
            row("A", 2000, "Q01", 1.0),
            row("A", 2000, "Q02", 1.0),
            row("A", 2001, "Q01", 1.5),
            row("A", 2001, "M13", 10.0),
            row("B", 1999, "Q03", 4.0),
        ];
        assert_eq!(
            best_years(&rows),
            vec![
                BestYear {
                    series_id: "A".into(),
                    year: 2000,
                    total_value: 2.0,
                },
                BestYear {
                    series_id: "B".into(),
                    year: 1999,
                    total_value: 4.0,
                },
            ]
        );
    }

    #[test]
    fn best_year_ties_go_to_earliest_year() {
        let rows = vec![row("A", 2005, "Q01", 3.0), row("A", 2003, "Q01", 3.0)];
        assert_eq!(best_years(&rows)[0].year, 2003);
    }

    #[test]
    fn combined_report_left_joins_population() {
        let rows = vec![
            row("PRS30006032", 2019, "Q01", -0.4),
            row("PRS30006032", 2018, "Q01", 1.9),
            row("PRS30006032", 2018, "Q02", 0.5),
            row("PRS30006011", 2018, "Q01", 9.9),
        ];
        let population = vec![pop(2018, 327_167_439.0)];

        let report = combined_report(&rows, &population, "PRS30006032", "Q01");

        assert_eq!(report.records_with_population, 1);
        assert_eq!(
            report.rows,
            vec![
                CombinedRow {
                    series_id: "PRS30006032".into(),
                    year: 2018,
                    period: "Q01".into(),
                    value: 1.9,
                    population: Some(327_167_439.0),
                },
                CombinedRow {
                    series_id: "PRS30006032".into(),
                    year: 2019,
                    period: "Q01".into(),
                    value: -0.4,
                    population: None,
                },
            ]
        );
    }
}
