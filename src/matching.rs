use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::aggregation::EmployeeSummary;
use crate::error::LinkError;
use crate::schema::matching;

/// One row of matcher input: the blocking key (last-name initial +
/// university) plus the identity fields the external assignment program
/// scores on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRow {
    pub last_initial: String,
    pub university: String,
    pub employee_id: i64,
    pub last_name: String,
    pub first_name: String,
    pub match_year: i32,
}

impl MatchRow {
    fn from_summary(s: &EmployeeSummary, match_year: i32) -> Self {
        Self {
            last_initial: s
                .last_name
                .chars()
                .next()
                .map(|c| c.to_string())
                .unwrap_or_default(),
            university: s.university.clone(),
            employee_id: s.employee_id,
            last_name: s.last_name.clone(),
            first_name: s.first_name.clone(),
            match_year,
        }
    }
}

fn university_allowed(university: &str, filter: Option<&[String]>) -> bool {
    filter.map_or(true, |list| list.iter().any(|u| u == university))
}

/// Graduate-only matcher rows: employees with an observed graduate
/// transaction, keyed by the last graduate year. Lazy and restartable;
/// iteration follows the summary mapping's own order.
pub fn grad_rows<'a>(
    summaries: &'a BTreeMap<i64, EmployeeSummary>,
    universities: Option<&'a [String]>,
) -> impl Iterator<Item = MatchRow> + 'a {
    summaries
        .values()
        .filter(move |s| university_allowed(&s.university, universities))
        .filter_map(|s| s.max_grad_year.map(|year| MatchRow::from_summary(s, year)))
}

/// All-employee matcher rows; the year falls back to the last observed
/// period end for employees never seen as graduates.
pub fn all_rows<'a>(
    summaries: &'a BTreeMap<i64, EmployeeSummary>,
    universities: Option<&'a [String]>,
) -> impl Iterator<Item = MatchRow> + 'a {
    summaries
        .values()
        .filter(move |s| university_allowed(&s.university, universities))
        .map(|s| MatchRow::from_summary(s, s.match_year()))
}

/// Materialize matcher rows as a DataFrame in projection column order.
pub fn rows_frame(rows: impl Iterator<Item = MatchRow>) -> Result<DataFrame, LinkError> {
    let mut last_initials = Vec::new();
    let mut universities = Vec::new();
    let mut employee_ids = Vec::new();
    let mut last_names = Vec::new();
    let mut first_names = Vec::new();
    let mut match_years = Vec::new();

    for row in rows {
        last_initials.push(row.last_initial);
        universities.push(row.university);
        employee_ids.push(row.employee_id);
        last_names.push(row.last_name);
        first_names.push(row.first_name);
        match_years.push(row.match_year);
    }

    let df = DataFrame::new(vec![
        Column::new(matching::LAST_INITIAL.into(), &last_initials),
        Column::new(matching::UNIVERSITY.into(), &universities),
        Column::new(matching::EMPLOYEE_ID.into(), &employee_ids),
        Column::new(matching::LAST_NAME.into(), &last_names),
        Column::new(matching::FIRST_NAME.into(), &first_names),
        Column::new(matching::MATCH_YEAR.into(), &match_years),
    ])?;

    Ok(df)
}

/// Write matcher rows as a headerless CSV, the flat-row shape the external
/// assignment program reads.
pub fn write_rows_csv(
    path: &Path,
    rows: impl Iterator<Item = MatchRow>,
) -> Result<(), LinkError> {
    let mut df = rows_frame(rows)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(false)
        .finish(&mut df)?;
    Ok(())
}

/// Write both matcher input files into `directory`.
pub fn write_matching_inputs(
    directory: &Path,
    summaries: &BTreeMap<i64, EmployeeSummary>,
    universities: Option<&[String]>,
) -> Result<(), LinkError> {
    write_rows_csv(
        &directory.join(matching::GRAD_FILE),
        grad_rows(summaries, universities),
    )?;
    write_rows_csv(
        &directory.join(matching::ALL_FILE),
        all_rows(summaries, universities),
    )?;
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{aggregate, Transaction};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tx(
        id: i64,
        university: &str,
        last_name: &str,
        occup: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Transaction {
        Transaction {
            employee_id: id,
            university: university.to_string(),
            last_name: last_name.to_string(),
            first_name: "JANE".to_string(),
            period_start: start,
            period_end: end,
            bucketed_occup: occup.to_string(),
            orig_occup: occup.to_string(),
            agency_code: 0,
            is_nih: false,
        }
    }

    fn summaries() -> BTreeMap<i64, crate::aggregation::EmployeeSummary> {
        aggregate(vec![
            tx(
                1,
                "STATE U",
                "DOE",
                "Graduate Student",
                d(2017, 9, 1),
                d(2018, 5, 31),
            ),
            tx(1, "STATE U", "DOE", "Postdoc", d(2019, 1, 1), d(2019, 12, 31)),
            tx(2, "TECH", "ROE", "Postdoc", d(2020, 1, 1), d(2020, 12, 31)),
        ])
        .unwrap()
    }

    #[test]
    fn grad_rows_keep_only_observed_graduates() {
        let summaries = summaries();
        let rows: Vec<MatchRow> = grad_rows(&summaries, None).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].employee_id, 1);
        assert_eq!(rows[0].last_initial, "D");
        assert_eq!(rows[0].match_year, 2018);
    }

    #[test]
    fn all_rows_fall_back_to_last_period_end_year() {
        let summaries = summaries();
        let rows: Vec<MatchRow> = all_rows(&summaries, None).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].match_year, 2018); // graduate year wins
        assert_eq!(rows[1].match_year, 2020); // fallback
        assert_eq!(rows[1].last_initial, "R");
    }

    #[test]
    fn university_filter_restricts_both_projections() {
        let summaries = summaries();
        let filter = vec!["TECH".to_string()];
        assert_eq!(grad_rows(&summaries, Some(&filter)).count(), 0);
        let rows: Vec<MatchRow> = all_rows(&summaries, Some(&filter)).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].university, "TECH");
    }

    #[test]
    fn projections_are_restartable() {
        let summaries = summaries();
        let first: Vec<MatchRow> = all_rows(&summaries, None).collect();
        let second: Vec<MatchRow> = all_rows(&summaries, None).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn rows_frame_has_projection_shape() {
        let summaries = summaries();
        let df = rows_frame(all_rows(&summaries, None)).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 6);
        assert_eq!(
            df.get_column_names_str(),
            vec![
                matching::LAST_INITIAL,
                matching::UNIVERSITY,
                matching::EMPLOYEE_ID,
                matching::LAST_NAME,
                matching::FIRST_NAME,
                matching::MATCH_YEAR,
            ]
        );
    }

    #[test]
    fn matching_input_files_are_headerless() {
        let dir = tempfile::tempdir().unwrap();
        let summaries = summaries();
        write_matching_inputs(dir.path(), &summaries, None).unwrap();

        let grad = std::fs::read_to_string(dir.path().join(matching::GRAD_FILE)).unwrap();
        let all = std::fs::read_to_string(dir.path().join(matching::ALL_FILE)).unwrap();

        assert_eq!(grad.lines().count(), 1);
        assert_eq!(all.lines().count(), 2);
        assert!(grad.starts_with("D,STATE U,1,DOE,JANE,2018"));
        assert!(!all.contains(matching::LAST_INITIAL));
    }
}
