//! Parsing of the two latest dataset objects.
//!
//! Both parsers are lenient about individual values and strict about shape:
//! a row with an unparseable number is skipped, but a file without the
//! expected columns (or JSON without a record array) is malformed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observation from the website's tab-separated series file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    pub value: f64,
}

/// Parsed series file plus the number of rows skipped as unparseable.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    pub rows: Vec<SeriesRow>,
    pub skipped: usize,
}

/// One population record from the API snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub year: i32,
    /// `None` when the upstream value is not numeric.
    pub population: Option<f64>,
}

const SERIES_COLUMNS: [&str; 4] = ["series_id", "year", "period", "value"];

/// Parse the tab-separated series file. Headers and cells are trimmed.
///
/// # Errors
///
/// Returns a reason string if the file is not UTF-8 TSV with a header row
/// naming `series_id`, `year`, `period`, and `value`.
pub fn parse_series(bytes: &[u8]) -> Result<SeriesTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| format!("unreadable header row: {e}"))?
        .clone();
    let mut index = [0usize; 4];
    for (slot, column) in index.iter_mut().zip(SERIES_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| format!("missing column '{column}'"))?;
    }
    let mut rows = Vec::new();
    let mut skipped = 0;
    for record in reader.records() {
        let record = record.map_err(|e| format!("unreadable row: {e}"))?;
        match parse_row(&record, index) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }
    Ok(SeriesTable { rows, skipped })
}

fn parse_row(
    record: &csv::StringRecord,
    [series, year, period, value]: [usize; 4],
) -> Option<SeriesRow> {
    Some(SeriesRow {
        series_id: record.get(series)?.to_string(),
        year: record.get(year)?.parse().ok()?,
        period: record.get(period)?.to_string(),
        value: record
            .get(value)?
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())?,
    })
}

/// Parse a population snapshot.
///
/// Records are read from `data.data`, or from `data` when it is already an
/// array. `Year` and `Population` may be numbers or numeric strings; a
/// record without a usable year is skipped.
///
/// # Errors
///
/// Returns a reason string if the document is not JSON or has no record
/// array.
pub fn parse_population(bytes: &[u8]) -> Result<Vec<PopulationRecord>, String> {
    let document: Value = serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {e}"))?;
    let data = document.get("data").ok_or("missing 'data' field")?;
    let records = data
        .get("data")
        .unwrap_or(data)
        .as_array()
        .ok_or("'data' holds no record array")?;

    Ok(records
        .iter()
        .filter_map(|record| {
            let year = number(record.get("Year")?)?;
            if year.fract() != 0.0 || year < f64::from(i32::MIN) || year > f64::from(i32::MAX) {
                return None;
            }
            #[allow(clippy::cast_possible_truncation)]
            let year = year as i32;
            Some(PopulationRecord {
                year,
                population: record.get("Population").and_then(number),
            })
        })
        .collect())
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    const SERIES: &str = "series_id        \tyear\tperiod\t       value\tfootnote_codes\n\
PRS30006011        \t1995\tQ01\t          2.6\t\n\
PRS30006011        \t1995\tQ02\t          2.1\t\n\
PRS30006012        \t1996\tQ05\t           -\t\n\
PRS30006032        \t2018\tQ01\t          1.9\tR\n";

    #[test]
    fn parses_padded_tsv() {
        let table = parse_series(SERIES.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.skipped, 1);
        assert_eq!(
            table.rows[0],
            SeriesRow {
                series_id: "PRS30006011".into(),
                year: 1995,
                period: "Q01".into(),
                value: 2.6,
            }
        );
    }

    #[test]
    fn missing_column_is_malformed() {
        let err = parse_series(b"series_id\tyear\tvalue\nA\t2000\t1\n").unwrap_err();
        assert!(err.contains("period"));
    }

    #[test]
    fn empty_file_is_malformed() {
        assert!(parse_series(b"").is_err());
    }

    #[rstest]
    #[case::envelope(json!({
        "metadata": {},
        "data": {"data": [{"Year": 2015, "Population": "321418821"}]}
    }))]
    #[case::plain(json!({"data": [{"Year": "2015", "Population": 321418821}]}))]
    fn population_records_are_located(#[case] document: Value) {
        let records = parse_population(document.to_string().as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![PopulationRecord {
                year: 2015,
                population: Some(321_418_821.0),
            }]
        );
    }

    #[test]
    fn non_numeric_population_is_kept_as_none() {
        let document = json!({"data": [{"Year": "2016", "Population": "n/a"}, {"Year": "x"}]});
        let records = parse_population(document.to_string().as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![PopulationRecord {
                year: 2016,
                population: None,
            }]
        );
    }

    #[rstest]
    #[case::not_json(b"not json".as_slice())]
    #[case::no_data(br#"{"metadata": {}}"#.as_slice())]
    #[case::not_array(br#"{"data": {"data": 5}}"#.as_slice())]
    fn malformed_population_is_rejected(#[case] bytes: &[u8]) {
        assert!(parse_population(bytes).is_err());
    }
}
