use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use polars::prelude::StrptimeOptions;
use polars::prelude::*;

use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::aggregation::{self, EmployeeSummary};
use crate::error::LinkError;
use crate::matching;
use crate::schema::transaction;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[pyclass]
pub struct LinkModel {
    base_path: PathBuf,
    transactions: Option<DataFrame>,
    summaries: Option<BTreeMap<i64, EmployeeSummary>>,
}

#[pymethods]
impl LinkModel {
    #[new]
    fn new(base_path: String) -> Self {
        Self {
            base_path: PathBuf::from(base_path),
            transactions: None,
            summaries: None,
        }
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load any CSV into a Polars DataFrame with all columns as strings.
    /// Optionally rename columns via a map.
    #[pyo3(signature = (filename, rename=None))]
    fn load_csv(
        &self,
        filename: &str,
        rename: Option<HashMap<String, String>>,
    ) -> PyResult<PyDataFrame> {
        let df = self.read_csv_as_strings(filename, rename)?;
        Ok(PyDataFrame(df))
    }

    /// Load the employment-transaction CSV.
    ///
    /// Required columns: employee_id, university, last_name, first_name,
    /// period_start_date, period_end_date, occupational_classification,
    /// x_occupational_classification, agency_code, is_nih.
    ///
    /// Dates are parsed as %Y-%m-%d; names are upper-cased so the engine
    /// receives case-normalized identity fields; id and flag columns are cast
    /// to integers. All other columns are preserved as strings.
    #[pyo3(signature = (filename=None))]
    fn load_transactions(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let fname = filename.unwrap_or("transactions.csv");
        let raw = self.read_csv_as_strings(fname, None)?;

        Self::require_columns(&raw, &transaction::REQUIRED)?;

        let df = raw
            .lazy()
            .with_columns([
                col(transaction::EMPLOYEE_ID).cast(DataType::Int64),
                col(transaction::AGENCY_CODE).cast(DataType::Int32),
                col(transaction::IS_NIH).cast(DataType::Int32),
                col(transaction::LAST_NAME).str().to_uppercase(),
                col(transaction::FIRST_NAME).str().to_uppercase(),
            ])
            .collect()
            .map_err(LinkError::from)?;

        let df = Self::parse_date_column(df, transaction::PERIOD_START_DATE, DATE_FORMAT)?;
        let df = Self::parse_date_column(df, transaction::PERIOD_END_DATE, DATE_FORMAT)?;

        self.transactions = Some(df.clone());
        self.summaries = None;
        Ok(PyDataFrame(df))
    }

    // ── Aggregation ─────────────────────────────────────────────────────────

    /// Fold the loaded transactions into one summary row per employee.
    ///
    /// The fold is restartable: reloading transactions invalidates the cached
    /// summaries and the next call re-aggregates.
    fn aggregate_employees(&mut self) -> PyResult<PyDataFrame> {
        let summaries = self.get_or_build_summaries()?;
        let df = aggregation::summaries_frame(summaries).map_err(PyErr::from)?;
        Ok(PyDataFrame(df))
    }

    // ── Matching inputs ─────────────────────────────────────────────────────

    /// Matcher input restricted to employees observed as graduate students,
    /// keyed by the last graduate year.
    #[pyo3(signature = (universities=None))]
    fn matching_grad_input(
        &mut self,
        universities: Option<Vec<String>>,
    ) -> PyResult<PyDataFrame> {
        let summaries = self.get_or_build_summaries()?;
        let df = matching::rows_frame(matching::grad_rows(summaries, universities.as_deref()))
            .map_err(PyErr::from)?;
        Ok(PyDataFrame(df))
    }

    /// Matcher input covering every employee; the year falls back to the last
    /// observed period end when no graduate transaction was seen.
    #[pyo3(signature = (universities=None))]
    fn matching_all_input(
        &mut self,
        universities: Option<Vec<String>>,
    ) -> PyResult<PyDataFrame> {
        let summaries = self.get_or_build_summaries()?;
        let df = matching::rows_frame(matching::all_rows(summaries, universities.as_deref()))
            .map_err(PyErr::from)?;
        Ok(PyDataFrame(df))
    }

    /// Write the two matcher input CSVs (headerless, as the external
    /// assignment program expects) into `directory` under the base path.
    #[pyo3(signature = (directory=None, universities=None))]
    fn create_matching_input_files(
        &mut self,
        directory: Option<&str>,
        universities: Option<Vec<String>>,
    ) -> PyResult<()> {
        let dir = self.base_path.join(directory.unwrap_or("."));
        let summaries = self.get_or_build_summaries()?;
        matching::write_matching_inputs(&dir, summaries, universities.as_deref())
            .map_err(PyErr::from)?;
        Ok(())
    }

    // ── Parse helpers ───────────────────────────────────────────────────────

    /// Parse a string column to Date using the given format string.
    ///
    /// Example formats: "%Y-%m-%d", "%d/%m/%Y"
    #[staticmethod]
    fn parse_date(df: PyDataFrame, column: &str, format: &str) -> PyResult<PyDataFrame> {
        let result = Self::parse_date_column(df.0, column, format)?;
        Ok(PyDataFrame(result))
    }

    /// Parse a string column to Float64.
    #[staticmethod]
    fn parse_float(df: PyDataFrame, column: &str) -> PyResult<PyDataFrame> {
        let result =
            df.0.lazy()
                .with_columns([col(column)
                    .str()
                    .strip_chars(lit(" \t\r\n"))
                    .cast(DataType::Float64)])
                .collect()
                .map_err(LinkError::from)?;
        Ok(PyDataFrame(result))
    }

    /// Parse a string column to Int64.
    #[staticmethod]
    fn parse_int(df: PyDataFrame, column: &str) -> PyResult<PyDataFrame> {
        let result =
            df.0.lazy()
                .with_columns([col(column)
                    .str()
                    .strip_chars(lit(" \t\r\n"))
                    .cast(DataType::Int64)])
                .collect()
                .map_err(LinkError::from)?;
        Ok(PyDataFrame(result))
    }

    // ── Column mapping utility ──────────────────────────────────────────────

    /// Left-join a lookup table onto `df`, used from Python for the
    /// pass-through joins (gender probabilities, agency crosswalks) that stay
    /// outside the engine.
    #[pyo3(signature = (df, source_column, lookup_df, lookup_key, lookup_value, new_column=None))]
    fn map_column(
        &self,
        df: PyDataFrame,
        source_column: &str,
        lookup_df: PyDataFrame,
        lookup_key: &str,
        lookup_value: &str,
        new_column: Option<&str>,
    ) -> PyResult<PyDataFrame> {
        let target = new_column.unwrap_or(lookup_value);

        let result =
            df.0.lazy()
                .join(
                    lookup_df
                        .0
                        .lazy()
                        .select([col(lookup_key), col(lookup_value)]),
                    [col(source_column)],
                    [col(lookup_key)],
                    JoinArgs::new(JoinType::Left),
                )
                .rename([lookup_value], [target], true)
                .collect()
                .map_err(LinkError::from)?;

        Ok(PyDataFrame(result))
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn transactions_df(&self) -> PyResult<Option<PyDataFrame>> {
        Ok(self.transactions.clone().map(PyDataFrame))
    }

    #[getter]
    fn summaries_df(&self) -> PyResult<Option<PyDataFrame>> {
        match &self.summaries {
            Some(map) => {
                let df = aggregation::summaries_frame(map).map_err(PyErr::from)?;
                Ok(Some(PyDataFrame(df)))
            }
            None => Ok(None),
        }
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

impl LinkModel {
    /// Read a CSV file with all columns as String dtype.
    /// Trims whitespace from column names and applies optional rename.
    fn read_csv_as_strings(
        &self,
        filename: &str,
        rename: Option<HashMap<String, String>>,
    ) -> Result<DataFrame, LinkError> {
        let path = self.base_path.join(filename);
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path))?
            .finish()?;

        // Trim whitespace from column names
        let trimmed: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        df.set_column_names(trimmed.as_slice())?;

        if let Some(map) = rename {
            let old: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
            let new: Vec<&str> = map.values().map(|s| s.as_str()).collect();
            df = df.lazy().rename(old, new, true).collect()?;
        }

        Ok(df)
    }

    fn get_or_build_summaries(&mut self) -> Result<&BTreeMap<i64, EmployeeSummary>, LinkError> {
        if self.summaries.is_none() {
            let transactions = self
                .transactions
                .as_ref()
                .ok_or_else(|| LinkError::NotLoaded("transactions".into()))?;
            self.summaries = Some(aggregation::aggregate_frame(transactions)?);
        }
        Ok(self.summaries.as_ref().unwrap())
    }

    fn require_columns(df: &DataFrame, required: &[&str]) -> PyResult<()> {
        for &col_name in required {
            if df.column(col_name).is_err() {
                return Err(LinkError::MissingColumn(col_name.to_string()).into());
            }
        }
        Ok(())
    }

    /// Parse a string column to Date. Columns already parsed are left alone.
    fn parse_date_column(
        df: DataFrame,
        column: &str,
        format: &str,
    ) -> Result<DataFrame, LinkError> {
        let is_string = df
            .column(column)
            .map(|c| c.dtype() == &DataType::String)
            .unwrap_or(false);

        if is_string {
            let df = df
                .lazy()
                .with_columns([col(column)
                    .str()
                    .strip_chars(lit(" \t\r\n"))
                    .str()
                    .to_date(StrptimeOptions {
                        format: Some(format.into()),
                        strict: true,
                        ..Default::default()
                    })])
                .collect()?;
            Ok(df)
        } else {
            Ok(df)
        }
    }
}
