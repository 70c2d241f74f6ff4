use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::*;

use crate::error::LinkError;
use crate::schema::{agency, summary, transaction};

// Fixed tenure policy thresholds, in days.
pub const SIX_MONTHS_DAYS: i64 = 180;
pub const TWELVE_MONTHS_DAYS: i64 = 360;
pub const TWO_YEARS_DAYS: i64 = 2 * 365;

const GRADUATE_PREFIX: &str = "graduate";

/// A bucketed occupation label counts as graduate employment iff it starts
/// with "graduate", case-insensitively. "Post-Graduate Fellow" does not.
pub fn is_graduate(label: &str) -> bool {
    label.to_lowercase().starts_with(GRADUATE_PREFIX)
}

pub fn is_nsf(agency_code: i32) -> bool {
    agency_code == agency::NSF
}

pub fn is_usda(agency_code: i32) -> bool {
    agency_code == agency::USDA
}

// ── Input ───────────────────────────────────────────────────────────────────

/// One employment transaction: a contiguous period worked by one employee on
/// one award. Names arrive upper-cased from the loading layer.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub employee_id: i64,
    pub university: String,
    pub last_name: String,
    pub first_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub bucketed_occup: String,
    pub orig_occup: String,
    pub agency_code: i32,
    pub is_nih: bool,
}

impl Transaction {
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.period_end < self.period_start {
            return Err(LinkError::MalformedTransaction(format!(
                "period_end_date {} precedes period_start_date {} for employee {}",
                self.period_end, self.period_start, self.employee_id
            )));
        }
        Ok(())
    }

    /// Exclusive day span of the period. The inclusive +1 for the first
    /// transaction folded per employee is applied by the accumulator.
    fn day_span(&self) -> i64 {
        (self.period_end - self.period_start).num_days()
    }
}

// ── Accumulator ─────────────────────────────────────────────────────────────

/// Occupation captured at the moment a first/last boundary date was set.
#[derive(Debug, Clone)]
struct BoundaryCapture {
    date: NaiveDate,
    bucketed_occup: String,
    orig_occup: String,
}

/// Raw occupation captured at a graduate-only boundary. Absent until the
/// first graduate-classified transaction arrives.
#[derive(Debug, Clone)]
struct GradCapture {
    date: NaiveDate,
    orig_occup: String,
}

/// Running per-employee state for the fold. One accumulator per employee id;
/// the fold is order-tolerant except for which transaction receives the
/// inclusive first-fold day credit.
#[derive(Debug)]
pub struct EmployeeAccumulator {
    employee_id: i64,
    university: String,
    last_name: String,
    first_name: String,

    first: Option<BoundaryCapture>,
    last: Option<BoundaryCapture>,
    first_grad: Option<GradCapture>,
    last_grad: Option<GradCapture>,

    days_by_occup: HashMap<String, i64>,
    total_days_worked: i64,
    days_on_nih: i64,
    days_on_nsf: i64,
    days_on_usda: i64,

    // Consumed by the first apply(); grants that transaction its +1.
    seeded: bool,
}

impl EmployeeAccumulator {
    pub fn new(tx: &Transaction) -> Self {
        Self {
            employee_id: tx.employee_id,
            university: tx.university.clone(),
            last_name: tx.last_name.clone(),
            first_name: tx.first_name.clone(),
            first: None,
            last: None,
            first_grad: None,
            last_grad: None,
            days_by_occup: HashMap::new(),
            total_days_worked: 0,
            days_on_nih: 0,
            days_on_nsf: 0,
            days_on_usda: 0,
            seeded: false,
        }
    }

    /// Fold one transaction into the running state.
    ///
    /// The first transaction applied is credited `(end - start).days + 1`
    /// (both endpoints inclusive); every later one `(end - start).days`.
    /// The asymmetry matches the legacy pipeline exactly; changing it would
    /// shift every downstream tenure threshold.
    pub fn apply(&mut self, tx: &Transaction) {
        let days = if self.seeded {
            tx.day_span()
        } else {
            tx.day_span() + 1
        };
        self.seeded = true;

        // Strictly-earlier start wins; equal dates never overwrite.
        if self.first.as_ref().map_or(true, |b| tx.period_start < b.date) {
            self.first = Some(BoundaryCapture {
                date: tx.period_start,
                bucketed_occup: tx.bucketed_occup.clone(),
                orig_occup: tx.orig_occup.clone(),
            });
        }

        if self.last.as_ref().map_or(true, |b| tx.period_end > b.date) {
            self.last = Some(BoundaryCapture {
                date: tx.period_end,
                bucketed_occup: tx.bucketed_occup.clone(),
                orig_occup: tx.orig_occup.clone(),
            });
        }

        if is_graduate(&tx.bucketed_occup) {
            if self
                .first_grad
                .as_ref()
                .map_or(true, |g| tx.period_start < g.date)
            {
                self.first_grad = Some(GradCapture {
                    date: tx.period_start,
                    orig_occup: tx.orig_occup.clone(),
                });
            }

            if self
                .last_grad
                .as_ref()
                .map_or(true, |g| tx.period_end > g.date)
            {
                self.last_grad = Some(GradCapture {
                    date: tx.period_end,
                    orig_occup: tx.orig_occup.clone(),
                });
            }
        }

        *self
            .days_by_occup
            .entry(tx.bucketed_occup.clone())
            .or_insert(0) += days;
        self.total_days_worked += days;

        if tx.is_nih {
            self.days_on_nih += days;
        }

        if is_nsf(tx.agency_code) {
            self.days_on_nsf += days;
        }

        if is_usda(tx.agency_code) {
            self.days_on_usda += days;
        }
    }

    /// Compute the derived metrics and emit the immutable summary.
    pub fn into_summary(self) -> EmployeeSummary {
        let first = self
            .first
            .expect("accumulator holds at least one transaction");
        let last = self
            .last
            .expect("accumulator holds at least one transaction");

        let days_spanned = (last.date - first.date).num_days();
        let work_6_months_over_2_years =
            days_spanned > TWO_YEARS_DAYS && self.total_days_worked > SIX_MONTHS_DAYS;
        let work_12_months_over_2_years =
            days_spanned > TWO_YEARS_DAYS && self.total_days_worked > TWELVE_MONTHS_DAYS;

        let days_worked_as_grad: i64 = self
            .days_by_occup
            .iter()
            .filter(|(k, _)| is_graduate(k))
            .map(|(_, v)| v)
            .sum();

        // Tally lookups use the final bucketed boundary labels, so a label
        // incremented by other transactions reports its full accumulated
        // total. Explicit zero default for labels never tallied.
        let days_worked_under_first_occup = self
            .days_by_occup
            .get(&first.bucketed_occup)
            .copied()
            .unwrap_or(0);
        let days_worked_under_last_occup = self
            .days_by_occup
            .get(&last.bucketed_occup)
            .copied()
            .unwrap_or(0);

        // Graduate fields are emitted only when a graduate transaction was
        // observed, gated on the raw-occupation capture rather than on
        // days_worked_as_grad.
        let (first_grad_date, first_grad_occup) = match self.first_grad {
            Some(g) => (Some(g.date), Some(g.orig_occup)),
            None => (None, None),
        };
        let (last_grad_date, last_grad_occup, max_grad_year) = match self.last_grad {
            Some(g) => (Some(g.date), Some(g.orig_occup), Some(g.date.year())),
            None => (None, None, None),
        };

        EmployeeSummary {
            employee_id: self.employee_id,
            university: self.university,
            last_name: self.last_name,
            first_name: self.first_name,
            max_grad_year,
            min_period_start_date: first.date,
            max_period_end_date: last.date,
            days_worked: self.total_days_worked,
            work_6_months_over_2_years,
            work_12_months_over_2_years,
            work_lt_6_months_or_lt_2_years: !(work_6_months_over_2_years
                || work_12_months_over_2_years),
            first_appear_bucketed_occup: first.bucketed_occup,
            first_appear_orig_occup: first.orig_occup,
            first_appear_date: first.date,
            days_worked_under_first_occup,
            first_appear_as_grad_date: first_grad_date,
            first_appear_as_grad_orig_occup: first_grad_occup,
            last_appear_as_grad_date: last_grad_date,
            last_appear_as_grad_orig_occup: last_grad_occup,
            days_worked_as_grad,
            last_appear_bucketed_occup: last.bucketed_occup,
            last_appear_orig_occup: last.orig_occup,
            days_worked_under_last_occup,
            work_6_months_on_nih: self.days_on_nih > SIX_MONTHS_DAYS,
            work_6_months_on_nsf: self.days_on_nsf > SIX_MONTHS_DAYS,
            work_6_months_on_usda: self.days_on_usda > SIX_MONTHS_DAYS,
        }
    }
}

// ── Output ──────────────────────────────────────────────────────────────────

/// One summary record per employee, emitted only after every transaction for
/// that employee has been folded.
#[derive(Debug, Clone)]
pub struct EmployeeSummary {
    pub employee_id: i64,
    pub university: String,
    pub last_name: String,
    pub first_name: String,
    pub max_grad_year: Option<i32>,
    pub min_period_start_date: NaiveDate,
    pub max_period_end_date: NaiveDate,
    pub days_worked: i64,
    pub work_6_months_over_2_years: bool,
    pub work_12_months_over_2_years: bool,
    pub work_lt_6_months_or_lt_2_years: bool,
    pub first_appear_bucketed_occup: String,
    pub first_appear_orig_occup: String,
    pub first_appear_date: NaiveDate,
    pub days_worked_under_first_occup: i64,
    pub first_appear_as_grad_date: Option<NaiveDate>,
    pub first_appear_as_grad_orig_occup: Option<String>,
    pub last_appear_as_grad_date: Option<NaiveDate>,
    pub last_appear_as_grad_orig_occup: Option<String>,
    pub days_worked_as_grad: i64,
    pub last_appear_bucketed_occup: String,
    pub last_appear_orig_occup: String,
    pub days_worked_under_last_occup: i64,
    pub work_6_months_on_nih: bool,
    pub work_6_months_on_nsf: bool,
    pub work_6_months_on_usda: bool,
}

impl EmployeeSummary {
    /// Year used by the all-employees matching projection: the last graduate
    /// year when present, otherwise the year of the last observed period end.
    pub fn match_year(&self) -> i32 {
        self.max_grad_year
            .unwrap_or_else(|| self.max_period_end_date.year())
    }
}

// ── Fold ────────────────────────────────────────────────────────────────────

/// Fold an unordered transaction stream into one summary per employee.
///
/// A malformed transaction (inverted period) aborts the whole run; callers
/// are expected to clean upstream. The BTreeMap keeps output order
/// deterministic across runs.
pub fn aggregate<I>(transactions: I) -> Result<BTreeMap<i64, EmployeeSummary>, LinkError>
where
    I: IntoIterator<Item = Transaction>,
{
    let mut accumulators: BTreeMap<i64, EmployeeAccumulator> = BTreeMap::new();

    for tx in transactions {
        tx.validate()?;
        accumulators
            .entry(tx.employee_id)
            .or_insert_with(|| EmployeeAccumulator::new(&tx))
            .apply(&tx);
    }

    Ok(accumulators
        .into_iter()
        .map(|(id, acc)| (id, acc.into_summary()))
        .collect())
}

// ── Frame extraction / emission ─────────────────────────────────────────────

fn date_from_days(days: i32, column: &str, row: usize) -> Result<NaiveDate, LinkError> {
    NaiveDate::default()
        .checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| {
            LinkError::MalformedTransaction(format!("{column} out of range at row {row}"))
        })
}

fn days_from_date(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

/// Extract transactions from a loaded DataFrame. Date columns may be Date or
/// raw epoch-day Int32; integer columns are cast as needed.
pub fn transactions_from_frame(df: &DataFrame) -> Result<Vec<Transaction>, LinkError> {
    let ids = df
        .column(transaction::EMPLOYEE_ID)?
        .cast(&DataType::Int64)?;
    let ids = ids.i64()?;
    let universities = df.column(transaction::UNIVERSITY)?.str()?;
    let last_names = df.column(transaction::LAST_NAME)?.str()?;
    let first_names = df.column(transaction::FIRST_NAME)?.str()?;
    let starts = df
        .column(transaction::PERIOD_START_DATE)?
        .cast(&DataType::Int32)?;
    let starts = starts.i32()?;
    let ends = df
        .column(transaction::PERIOD_END_DATE)?
        .cast(&DataType::Int32)?;
    let ends = ends.i32()?;
    let occups = df
        .column(transaction::OCCUPATIONAL_CLASSIFICATION)?
        .str()?;
    let orig_occups = df
        .column(transaction::X_OCCUPATIONAL_CLASSIFICATION)?
        .str()?;
    let agency_codes = df
        .column(transaction::AGENCY_CODE)?
        .cast(&DataType::Int32)?;
    let agency_codes = agency_codes.i32()?;
    let nih_flags = df.column(transaction::IS_NIH)?.cast(&DataType::Int32)?;
    let nih_flags = nih_flags.i32()?;

    let mut transactions = Vec::with_capacity(df.height());

    for i in 0..df.height() {
        let employee_id = ids.get(i).ok_or_else(|| {
            LinkError::MalformedTransaction(format!("null employee_id at row {i}"))
        })?;
        let start = starts.get(i).ok_or_else(|| {
            LinkError::MalformedTransaction(format!("null period_start_date at row {i}"))
        })?;
        let end = ends.get(i).ok_or_else(|| {
            LinkError::MalformedTransaction(format!("null period_end_date at row {i}"))
        })?;
        let bucketed_occup = occups.get(i).ok_or_else(|| {
            LinkError::General(format!("null occupational_classification at row {i}"))
        })?;

        transactions.push(Transaction {
            employee_id,
            university: universities.get(i).unwrap_or("").to_string(),
            last_name: last_names.get(i).unwrap_or("").to_string(),
            first_name: first_names.get(i).unwrap_or("").to_string(),
            period_start: date_from_days(start, transaction::PERIOD_START_DATE, i)?,
            period_end: date_from_days(end, transaction::PERIOD_END_DATE, i)?,
            bucketed_occup: bucketed_occup.to_string(),
            orig_occup: orig_occups.get(i).unwrap_or("").to_string(),
            agency_code: agency_codes.get(i).unwrap_or(0),
            is_nih: nih_flags.get(i) == Some(1),
        });
    }

    Ok(transactions)
}

/// Extract and fold in one step.
pub fn aggregate_frame(df: &DataFrame) -> Result<BTreeMap<i64, EmployeeSummary>, LinkError> {
    aggregate(transactions_from_frame(df)?)
}

/// Materialize the summary mapping as a DataFrame, one row per employee in
/// mapping order, columns in the downstream insert order.
pub fn summaries_frame(
    summaries: &BTreeMap<i64, EmployeeSummary>,
) -> Result<DataFrame, LinkError> {
    let n = summaries.len();
    let mut employee_ids = Vec::with_capacity(n);
    let mut universities = Vec::with_capacity(n);
    let mut last_names = Vec::with_capacity(n);
    let mut first_names = Vec::with_capacity(n);
    let mut max_grad_years: Vec<Option<i32>> = Vec::with_capacity(n);
    let mut min_starts = Vec::with_capacity(n);
    let mut max_ends = Vec::with_capacity(n);
    let mut days_worked = Vec::with_capacity(n);
    let mut work_6_over_2 = Vec::with_capacity(n);
    let mut work_12_over_2 = Vec::with_capacity(n);
    let mut work_lt = Vec::with_capacity(n);
    let mut first_bucketed = Vec::with_capacity(n);
    let mut first_orig = Vec::with_capacity(n);
    let mut first_dates = Vec::with_capacity(n);
    let mut days_first_occup = Vec::with_capacity(n);
    let mut first_grad_dates: Vec<Option<i32>> = Vec::with_capacity(n);
    let mut first_grad_origs: Vec<Option<String>> = Vec::with_capacity(n);
    let mut last_grad_dates: Vec<Option<i32>> = Vec::with_capacity(n);
    let mut last_grad_origs: Vec<Option<String>> = Vec::with_capacity(n);
    let mut days_as_grad = Vec::with_capacity(n);
    let mut last_bucketed = Vec::with_capacity(n);
    let mut last_orig = Vec::with_capacity(n);
    let mut days_last_occup = Vec::with_capacity(n);
    let mut on_nih = Vec::with_capacity(n);
    let mut on_nsf = Vec::with_capacity(n);
    let mut on_usda = Vec::with_capacity(n);

    for s in summaries.values() {
        employee_ids.push(s.employee_id);
        universities.push(s.university.clone());
        last_names.push(s.last_name.clone());
        first_names.push(s.first_name.clone());
        max_grad_years.push(s.max_grad_year);
        min_starts.push(days_from_date(s.min_period_start_date));
        max_ends.push(days_from_date(s.max_period_end_date));
        days_worked.push(s.days_worked);
        work_6_over_2.push(s.work_6_months_over_2_years);
        work_12_over_2.push(s.work_12_months_over_2_years);
        work_lt.push(s.work_lt_6_months_or_lt_2_years);
        first_bucketed.push(s.first_appear_bucketed_occup.clone());
        first_orig.push(s.first_appear_orig_occup.clone());
        first_dates.push(days_from_date(s.first_appear_date));
        days_first_occup.push(s.days_worked_under_first_occup);
        first_grad_dates.push(s.first_appear_as_grad_date.map(days_from_date));
        first_grad_origs.push(s.first_appear_as_grad_orig_occup.clone());
        last_grad_dates.push(s.last_appear_as_grad_date.map(days_from_date));
        last_grad_origs.push(s.last_appear_as_grad_orig_occup.clone());
        days_as_grad.push(s.days_worked_as_grad);
        last_bucketed.push(s.last_appear_bucketed_occup.clone());
        last_orig.push(s.last_appear_orig_occup.clone());
        days_last_occup.push(s.days_worked_under_last_occup);
        on_nih.push(s.work_6_months_on_nih);
        on_nsf.push(s.work_6_months_on_nsf);
        on_usda.push(s.work_6_months_on_usda);
    }

    let df = DataFrame::new(vec![
        Column::new(summary::EMPLOYEE_ID.into(), &employee_ids),
        Column::new(summary::UNIVERSITY.into(), &universities),
        Column::new(summary::LAST_NAME.into(), &last_names),
        Column::new(summary::FIRST_NAME.into(), &first_names),
        Column::new(summary::MAX_GRAD_YEAR.into(), &max_grad_years),
        Column::new(summary::MIN_PERIOD_START_DATE.into(), &min_starts),
        Column::new(summary::MAX_PERIOD_END_DATE.into(), &max_ends),
        Column::new(summary::DAYS_WORKED.into(), &days_worked),
        Column::new(summary::WORK_6_MONTHS_OVER_2_YEARS.into(), &work_6_over_2),
        Column::new(summary::WORK_12_MONTHS_OVER_2_YEARS.into(), &work_12_over_2),
        Column::new(summary::WORK_LT_6_MONTHS_OR_LT_2_YEARS.into(), &work_lt),
        Column::new(summary::FIRST_APPEAR_BUCKETED_OCCUP.into(), &first_bucketed),
        Column::new(summary::FIRST_APPEAR_ORIG_OCCUP.into(), &first_orig),
        Column::new(summary::FIRST_APPEAR_DATE.into(), &first_dates),
        Column::new(
            summary::DAYS_WORKED_UNDER_FIRST_OCCUP.into(),
            &days_first_occup,
        ),
        Column::new(summary::FIRST_APPEAR_AS_GRAD_DATE.into(), &first_grad_dates),
        Column::new(
            summary::FIRST_APPEAR_AS_GRAD_ORIG_OCCUP.into(),
            &first_grad_origs,
        ),
        Column::new(summary::LAST_APPEAR_AS_GRAD_DATE.into(), &last_grad_dates),
        Column::new(
            summary::LAST_APPEAR_AS_GRAD_ORIG_OCCUP.into(),
            &last_grad_origs,
        ),
        Column::new(summary::DAYS_WORKED_AS_GRAD.into(), &days_as_grad),
        Column::new(summary::LAST_APPEAR_BUCKETED_OCCUP.into(), &last_bucketed),
        Column::new(summary::LAST_APPEAR_ORIG_OCCUP.into(), &last_orig),
        Column::new(
            summary::DAYS_WORKED_UNDER_LAST_OCCUP.into(),
            &days_last_occup,
        ),
        Column::new(summary::WORK_6_MONTHS_ON_NIH.into(), &on_nih),
        Column::new(summary::WORK_6_MONTHS_ON_NSF.into(), &on_nsf),
        Column::new(summary::WORK_6_MONTHS_ON_USDA.into(), &on_usda),
    ])?;

    let df = df
        .lazy()
        .with_columns([
            col(summary::MIN_PERIOD_START_DATE).cast(DataType::Date),
            col(summary::MAX_PERIOD_END_DATE).cast(DataType::Date),
            col(summary::FIRST_APPEAR_DATE).cast(DataType::Date),
            col(summary::FIRST_APPEAR_AS_GRAD_DATE).cast(DataType::Date),
            col(summary::LAST_APPEAR_AS_GRAD_DATE).cast(DataType::Date),
        ])
        .collect()?;

    Ok(df)
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tx(id: i64, occup: &str, start: NaiveDate, end: NaiveDate) -> Transaction {
        Transaction {
            employee_id: id,
            university: "STATE U".to_string(),
            last_name: "DOE".to_string(),
            first_name: "JANE".to_string(),
            period_start: start,
            period_end: end,
            bucketed_occup: occup.to_string(),
            orig_occup: occup.to_string(),
            agency_code: 0,
            is_nih: false,
        }
    }

    fn one(summaries: BTreeMap<i64, EmployeeSummary>) -> EmployeeSummary {
        assert_eq!(summaries.len(), 1);
        summaries.into_values().next().unwrap()
    }

    #[test]
    fn single_day_transaction_counts_one_day() {
        let day = d(2020, 3, 15);
        let s = one(aggregate(vec![tx(1, "Postdoc", day, day)]).unwrap());
        assert_eq!(s.days_worked, 1);
        assert_eq!(s.min_period_start_date, day);
        assert_eq!(s.max_period_end_date, day);
    }

    #[test]
    fn first_transaction_gets_inclusive_day_credit() {
        let t1 = tx(1, "Postdoc", d(2020, 1, 1), d(2020, 1, 10));
        let t2 = tx(1, "Postdoc", d(2020, 2, 1), d(2020, 2, 5));
        let s = one(aggregate(vec![t1, t2]).unwrap());
        // 9 + 1 for the first fold, 4 for the second.
        assert_eq!(s.days_worked, 14);
    }

    #[test]
    fn total_days_invariant_under_fold_order() {
        let t1 = tx(1, "Postdoc", d(2020, 1, 1), d(2020, 1, 10));
        let t2 = tx(1, "Postdoc", d(2020, 2, 1), d(2020, 2, 5));
        let forward = one(aggregate(vec![t1.clone(), t2.clone()]).unwrap());
        let reversed = one(aggregate(vec![t2, t1]).unwrap());
        assert_eq!(forward.days_worked, reversed.days_worked);
    }

    #[test]
    fn per_occupation_tally_depends_on_which_transaction_is_first() {
        let grad = tx(1, "Graduate Student", d(2020, 1, 1), d(2020, 1, 10));
        let postdoc = tx(1, "Postdoc", d(2020, 2, 1), d(2020, 2, 5));
        let grad_first = one(aggregate(vec![grad.clone(), postdoc.clone()]).unwrap());
        let postdoc_first = one(aggregate(vec![postdoc, grad]).unwrap());

        // The inclusive day credit follows the fold order, so the per-label
        // split shifts by one while the total does not.
        assert_eq!(grad_first.days_worked, postdoc_first.days_worked);
        assert_eq!(grad_first.days_worked_as_grad, 10);
        assert_eq!(postdoc_first.days_worked_as_grad, 9);
    }

    #[test]
    fn boundary_fields_invariant_under_fold_order() {
        let t1 = tx(1, "Graduate Student", d(2018, 9, 1), d(2019, 5, 31));
        let t2 = tx(1, "Research Assistant", d(2019, 6, 1), d(2019, 8, 31));
        let t3 = tx(1, "Postdoc", d(2020, 1, 1), d(2020, 12, 31));

        let a = one(aggregate(vec![t1.clone(), t2.clone(), t3.clone()]).unwrap());
        let b = one(aggregate(vec![t3, t1, t2]).unwrap());

        assert_eq!(a.min_period_start_date, b.min_period_start_date);
        assert_eq!(a.max_period_end_date, b.max_period_end_date);
        assert_eq!(a.first_appear_bucketed_occup, b.first_appear_bucketed_occup);
        assert_eq!(a.last_appear_bucketed_occup, b.last_appear_bucketed_occup);
        assert_eq!(a.first_appear_as_grad_date, b.first_appear_as_grad_date);
        assert_eq!(a.last_appear_as_grad_date, b.last_appear_as_grad_date);
        assert_eq!(a.max_grad_year, b.max_grad_year);
        assert_eq!(a.first_appear_bucketed_occup, "Graduate Student");
        assert_eq!(a.last_appear_bucketed_occup, "Postdoc");
    }

    #[test]
    fn equal_boundary_dates_do_not_overwrite() {
        let t1 = tx(1, "Graduate Student", d(2020, 1, 1), d(2020, 6, 30));
        let t2 = tx(1, "Postdoc", d(2020, 1, 1), d(2020, 6, 30));
        let s = one(aggregate(vec![t1, t2]).unwrap());
        assert_eq!(s.first_appear_bucketed_occup, "Graduate Student");
        assert_eq!(s.last_appear_bucketed_occup, "Graduate Student");
    }

    #[test]
    fn graduate_detection_is_case_insensitive_prefix() {
        assert!(is_graduate("Graduate Student"));
        assert!(is_graduate("GRADUATE"));
        assert!(is_graduate("graduate research assistant"));
        assert!(!is_graduate("Post-Graduate Fellow"));
        assert!(!is_graduate("Undergraduate"));
    }

    #[test]
    fn no_graduate_transaction_leaves_grad_fields_unset() {
        let s = one(aggregate(vec![tx(1, "Postdoc", d(2020, 1, 1), d(2022, 6, 30))]).unwrap());
        assert_eq!(s.max_grad_year, None);
        assert_eq!(s.first_appear_as_grad_date, None);
        assert_eq!(s.last_appear_as_grad_date, None);
        assert_eq!(s.first_appear_as_grad_orig_occup, None);
        assert_eq!(s.last_appear_as_grad_orig_occup, None);
        assert_eq!(s.days_worked_as_grad, 0);
    }

    #[test]
    fn span_threshold_is_strict() {
        // 2018-01-01..2020-01-01 spans exactly 730 days.
        let s = one(aggregate(vec![tx(1, "Postdoc", d(2018, 1, 1), d(2020, 1, 1))]).unwrap());
        assert_eq!(
            (s.max_period_end_date - s.min_period_start_date).num_days(),
            730
        );
        assert!(!s.work_6_months_over_2_years);
        assert!(s.work_lt_6_months_or_lt_2_years);
    }

    #[test]
    fn span_731_with_181_days_satisfies_six_months_over_two_years() {
        let txs = vec![
            tx(1, "Postdoc", d(2018, 1, 1), d(2018, 1, 1)), // first fold: 1 day
            tx(1, "Postdoc", d(2018, 6, 1), d(2018, 11, 28)), // 180 days
            tx(1, "Postdoc", d(2020, 1, 2), d(2020, 1, 2)), // 0 days, extends span to 731
        ];
        let s = one(aggregate(txs).unwrap());
        assert_eq!(s.days_worked, 181);
        assert!(s.work_6_months_over_2_years);
        assert!(!s.work_12_months_over_2_years);
        assert!(!s.work_lt_6_months_or_lt_2_years);
    }

    #[test]
    fn exactly_180_days_worked_fails_six_month_test() {
        let txs = vec![
            tx(1, "Postdoc", d(2018, 1, 1), d(2018, 1, 1)),
            tx(1, "Postdoc", d(2018, 6, 1), d(2018, 11, 27)), // 179 days
            tx(1, "Postdoc", d(2020, 1, 2), d(2020, 1, 2)),
        ];
        let s = one(aggregate(txs).unwrap());
        assert_eq!(s.days_worked, 180);
        assert!(!s.work_6_months_over_2_years);
        assert!(s.work_lt_6_months_or_lt_2_years);
    }

    #[test]
    fn agency_sums_follow_code_and_nih_flag_independently() {
        let mut nsf = tx(1, "Postdoc", d(2018, 1, 1), d(2018, 12, 31));
        nsf.agency_code = agency::NSF;
        let mut usda = tx(1, "Postdoc", d(2019, 1, 1), d(2019, 12, 31));
        usda.agency_code = agency::USDA;
        let mut nih = tx(1, "Postdoc", d(2020, 1, 1), d(2020, 12, 31));
        nih.is_nih = true;
        nih.agency_code = 99;

        let s = one(aggregate(vec![nsf, usda, nih]).unwrap());
        assert!(s.work_6_months_on_nsf);
        assert!(s.work_6_months_on_usda);
        assert!(s.work_6_months_on_nih);
    }

    #[test]
    fn nsf_code_counts_even_when_nih_flag_set() {
        let mut t = tx(1, "Postdoc", d(2018, 1, 1), d(2018, 12, 31));
        t.agency_code = agency::NSF;
        t.is_nih = true;
        let s = one(aggregate(vec![t]).unwrap());
        assert!(s.work_6_months_on_nsf);
        assert!(s.work_6_months_on_nih);
        assert!(!s.work_6_months_on_usda);
    }

    #[test]
    fn short_nsf_stint_does_not_set_six_month_flag() {
        let mut t = tx(1, "Postdoc", d(2018, 1, 1), d(2018, 6, 29)); // 179 + 1 = 180
        t.agency_code = agency::NSF;
        let s = one(aggregate(vec![t]).unwrap());
        assert!(!s.work_6_months_on_nsf);
    }

    #[test]
    fn grad_then_postdoc_end_to_end() {
        let mut grad = tx(1, "Graduate Student", d(2018, 1, 1), d(2018, 6, 30));
        grad.agency_code = agency::NSF;
        grad.orig_occup = "GRAD RSCH ASST".to_string();
        let mut postdoc = tx(1, "Postdoc", d(2019, 1, 1), d(2019, 12, 31));
        postdoc.is_nih = true;

        let s = one(aggregate(vec![grad, postdoc]).unwrap());

        assert_eq!(
            s.first_appear_as_grad_orig_occup.as_deref(),
            Some("GRAD RSCH ASST")
        );
        assert_eq!(s.max_grad_year, Some(2018));
        assert_eq!(s.first_appear_as_grad_date, Some(d(2018, 1, 1)));
        assert_eq!(s.last_appear_as_grad_date, Some(d(2018, 6, 30)));
        // 180 + 1 inclusive first-fold days on NSF, 364 on NIH.
        assert_eq!(s.days_worked_as_grad, 181);
        assert!(s.work_6_months_on_nsf);
        assert!(s.work_6_months_on_nih);
        assert_eq!(s.days_worked, 181 + 364);
        assert_eq!(s.first_appear_bucketed_occup, "Graduate Student");
        assert_eq!(s.last_appear_bucketed_occup, "Postdoc");
        assert_eq!(s.days_worked_under_first_occup, 181);
        assert_eq!(s.days_worked_under_last_occup, 364);
    }

    #[test]
    fn boundary_occupation_lookup_reports_full_accumulated_tally() {
        let txs = vec![
            tx(1, "Postdoc", d(2020, 1, 1), d(2020, 1, 10)),
            tx(1, "Graduate Student", d(2019, 1, 1), d(2019, 6, 1)),
            tx(1, "Graduate Student", d(2021, 1, 1), d(2021, 1, 31)),
        ];
        let s = one(aggregate(txs).unwrap());
        assert_eq!(s.first_appear_bucketed_occup, "Graduate Student");
        assert_eq!(s.last_appear_bucketed_occup, "Graduate Student");
        // 151 + 30 days across both Graduate Student stints.
        assert_eq!(s.days_worked_under_first_occup, 181);
        assert_eq!(s.days_worked_under_last_occup, 181);
        assert_eq!(s.days_worked_as_grad, 181);
    }

    #[test]
    fn inverted_period_aborts_the_run() {
        let bad = tx(1, "Postdoc", d(2020, 2, 1), d(2020, 1, 1));
        let good = tx(2, "Postdoc", d(2020, 1, 1), d(2020, 2, 1));
        let err = aggregate(vec![good, bad]).unwrap_err();
        assert!(matches!(err, LinkError::MalformedTransaction(_)));
    }

    #[test]
    fn multiple_employees_fold_independently() {
        let txs = vec![
            tx(1, "Graduate Student", d(2018, 1, 1), d(2018, 6, 30)),
            tx(2, "Postdoc", d(2019, 1, 1), d(2019, 6, 30)),
            tx(1, "Postdoc", d(2019, 1, 1), d(2019, 6, 30)),
        ];
        let summaries = aggregate(txs).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[&1].max_grad_year, Some(2018));
        assert_eq!(summaries[&2].max_grad_year, None);
    }

    fn transactions_df() -> DataFrame {
        let starts: Vec<i32> = vec![
            days_from_date(d(2018, 1, 1)),
            days_from_date(d(2019, 1, 1)),
            days_from_date(d(2019, 1, 1)),
        ];
        let ends: Vec<i32> = vec![
            days_from_date(d(2018, 6, 30)),
            days_from_date(d(2019, 12, 31)),
            days_from_date(d(2019, 6, 30)),
        ];
        DataFrame::new(vec![
            Column::new(transaction::EMPLOYEE_ID.into(), &[1i64, 1, 2]),
            Column::new(
                transaction::UNIVERSITY.into(),
                &["STATE U", "STATE U", "TECH"],
            ),
            Column::new(transaction::LAST_NAME.into(), &["DOE", "DOE", "ROE"]),
            Column::new(transaction::FIRST_NAME.into(), &["JANE", "JANE", "RICHARD"]),
            Column::new(transaction::PERIOD_START_DATE.into(), &starts),
            Column::new(transaction::PERIOD_END_DATE.into(), &ends),
            Column::new(
                transaction::OCCUPATIONAL_CLASSIFICATION.into(),
                &["Graduate Student", "Postdoc", "Postdoc"],
            ),
            Column::new(
                transaction::X_OCCUPATIONAL_CLASSIFICATION.into(),
                &["GRAD RSCH ASST", "POST DOC", "POST DOC"],
            ),
            Column::new(transaction::AGENCY_CODE.into(), &[47i32, 99, 10]),
            Column::new(transaction::IS_NIH.into(), &[0i32, 1, 0]),
        ])
        .unwrap()
    }

    #[test]
    fn aggregate_frame_folds_rows_per_employee() {
        let summaries = aggregate_frame(&transactions_df()).unwrap();
        assert_eq!(summaries.len(), 2);

        let s1 = &summaries[&1];
        assert_eq!(s1.university, "STATE U");
        assert_eq!(s1.max_grad_year, Some(2018));
        assert!(s1.work_6_months_on_nsf);
        assert!(s1.work_6_months_on_nih);

        let s2 = &summaries[&2];
        assert_eq!(s2.max_grad_year, None);
        assert!(s2.work_6_months_on_usda); // 180 + 1 inclusive first-fold days
    }

    #[test]
    fn null_employee_id_fails_extraction() {
        let ids: Vec<Option<i64>> = vec![Some(1), None];
        let starts: Vec<i32> = vec![days_from_date(d(2020, 1, 1)); 2];
        let ends: Vec<i32> = vec![days_from_date(d(2020, 6, 30)); 2];
        let df = DataFrame::new(vec![
            Column::new(transaction::EMPLOYEE_ID.into(), &ids),
            Column::new(transaction::UNIVERSITY.into(), &["STATE U", "STATE U"]),
            Column::new(transaction::LAST_NAME.into(), &["DOE", "DOE"]),
            Column::new(transaction::FIRST_NAME.into(), &["JANE", "JANE"]),
            Column::new(transaction::PERIOD_START_DATE.into(), &starts),
            Column::new(transaction::PERIOD_END_DATE.into(), &ends),
            Column::new(
                transaction::OCCUPATIONAL_CLASSIFICATION.into(),
                &["Postdoc", "Postdoc"],
            ),
            Column::new(
                transaction::X_OCCUPATIONAL_CLASSIFICATION.into(),
                &["POST DOC", "POST DOC"],
            ),
            Column::new(transaction::AGENCY_CODE.into(), &[0i32, 0]),
            Column::new(transaction::IS_NIH.into(), &[0i32, 0]),
        ])
        .unwrap();

        let err = aggregate_frame(&df).unwrap_err();
        assert!(matches!(err, LinkError::MalformedTransaction(_)));
    }

    #[test]
    fn summaries_frame_has_one_row_per_employee_in_id_order() {
        let summaries = aggregate_frame(&transactions_df()).unwrap();
        let df = summaries_frame(&summaries).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 26);

        let ids: Vec<i64> = df
            .column(summary::EMPLOYEE_ID)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(ids, vec![1, 2]);

        assert_eq!(
            df.column(summary::MIN_PERIOD_START_DATE).unwrap().dtype(),
            &DataType::Date
        );
        let grad_years: Vec<Option<i32>> = df
            .column(summary::MAX_GRAD_YEAR)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(grad_years, vec![Some(2018), None]);
    }
}
