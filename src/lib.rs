use pyo3::prelude::*;
use pyo3::types::PyModule;

mod aggregation;
mod error;
mod matching;
mod model;
mod schema;

use model::LinkModel;

/// Export schema constants as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Transaction
    let transaction = PyModule::new(m.py(), "transaction")?;
    transaction.add("EMPLOYEE_ID", schema::transaction::EMPLOYEE_ID)?;
    transaction.add("UNIVERSITY", schema::transaction::UNIVERSITY)?;
    transaction.add("LAST_NAME", schema::transaction::LAST_NAME)?;
    transaction.add("FIRST_NAME", schema::transaction::FIRST_NAME)?;
    transaction.add("PERIOD_START_DATE", schema::transaction::PERIOD_START_DATE)?;
    transaction.add("PERIOD_END_DATE", schema::transaction::PERIOD_END_DATE)?;
    transaction.add(
        "OCCUPATIONAL_CLASSIFICATION",
        schema::transaction::OCCUPATIONAL_CLASSIFICATION,
    )?;
    transaction.add(
        "X_OCCUPATIONAL_CLASSIFICATION",
        schema::transaction::X_OCCUPATIONAL_CLASSIFICATION,
    )?;
    transaction.add("AGENCY_CODE", schema::transaction::AGENCY_CODE)?;
    transaction.add("IS_NIH", schema::transaction::IS_NIH)?;
    m.add_submodule(&transaction)?;

    // Summary
    let summary = PyModule::new(m.py(), "summary")?;
    summary.add("EMPLOYEE_ID", schema::summary::EMPLOYEE_ID)?;
    summary.add("UNIVERSITY", schema::summary::UNIVERSITY)?;
    summary.add("LAST_NAME", schema::summary::LAST_NAME)?;
    summary.add("FIRST_NAME", schema::summary::FIRST_NAME)?;
    summary.add("MAX_GRAD_YEAR", schema::summary::MAX_GRAD_YEAR)?;
    summary.add(
        "MIN_PERIOD_START_DATE",
        schema::summary::MIN_PERIOD_START_DATE,
    )?;
    summary.add("MAX_PERIOD_END_DATE", schema::summary::MAX_PERIOD_END_DATE)?;
    summary.add("DAYS_WORKED", schema::summary::DAYS_WORKED)?;
    summary.add(
        "WORK_6_MONTHS_OVER_2_YEARS",
        schema::summary::WORK_6_MONTHS_OVER_2_YEARS,
    )?;
    summary.add(
        "WORK_12_MONTHS_OVER_2_YEARS",
        schema::summary::WORK_12_MONTHS_OVER_2_YEARS,
    )?;
    summary.add(
        "WORK_LT_6_MONTHS_OR_LT_2_YEARS",
        schema::summary::WORK_LT_6_MONTHS_OR_LT_2_YEARS,
    )?;
    summary.add(
        "FIRST_APPEAR_BUCKETED_OCCUP",
        schema::summary::FIRST_APPEAR_BUCKETED_OCCUP,
    )?;
    summary.add(
        "FIRST_APPEAR_ORIG_OCCUP",
        schema::summary::FIRST_APPEAR_ORIG_OCCUP,
    )?;
    summary.add("FIRST_APPEAR_DATE", schema::summary::FIRST_APPEAR_DATE)?;
    summary.add(
        "DAYS_WORKED_UNDER_FIRST_OCCUP",
        schema::summary::DAYS_WORKED_UNDER_FIRST_OCCUP,
    )?;
    summary.add(
        "FIRST_APPEAR_AS_GRAD_DATE",
        schema::summary::FIRST_APPEAR_AS_GRAD_DATE,
    )?;
    summary.add(
        "FIRST_APPEAR_AS_GRAD_ORIG_OCCUP",
        schema::summary::FIRST_APPEAR_AS_GRAD_ORIG_OCCUP,
    )?;
    summary.add(
        "LAST_APPEAR_AS_GRAD_DATE",
        schema::summary::LAST_APPEAR_AS_GRAD_DATE,
    )?;
    summary.add(
        "LAST_APPEAR_AS_GRAD_ORIG_OCCUP",
        schema::summary::LAST_APPEAR_AS_GRAD_ORIG_OCCUP,
    )?;
    summary.add("DAYS_WORKED_AS_GRAD", schema::summary::DAYS_WORKED_AS_GRAD)?;
    summary.add(
        "LAST_APPEAR_BUCKETED_OCCUP",
        schema::summary::LAST_APPEAR_BUCKETED_OCCUP,
    )?;
    summary.add(
        "LAST_APPEAR_ORIG_OCCUP",
        schema::summary::LAST_APPEAR_ORIG_OCCUP,
    )?;
    summary.add(
        "DAYS_WORKED_UNDER_LAST_OCCUP",
        schema::summary::DAYS_WORKED_UNDER_LAST_OCCUP,
    )?;
    summary.add(
        "WORK_6_MONTHS_ON_NIH",
        schema::summary::WORK_6_MONTHS_ON_NIH,
    )?;
    summary.add(
        "WORK_6_MONTHS_ON_NSF",
        schema::summary::WORK_6_MONTHS_ON_NSF,
    )?;
    summary.add(
        "WORK_6_MONTHS_ON_USDA",
        schema::summary::WORK_6_MONTHS_ON_USDA,
    )?;
    m.add_submodule(&summary)?;

    // Matching
    let matching = PyModule::new(m.py(), "matching")?;
    matching.add("LAST_INITIAL", schema::matching::LAST_INITIAL)?;
    matching.add("UNIVERSITY", schema::matching::UNIVERSITY)?;
    matching.add("EMPLOYEE_ID", schema::matching::EMPLOYEE_ID)?;
    matching.add("LAST_NAME", schema::matching::LAST_NAME)?;
    matching.add("FIRST_NAME", schema::matching::FIRST_NAME)?;
    matching.add("MATCH_YEAR", schema::matching::MATCH_YEAR)?;
    matching.add("GRAD_FILE", schema::matching::GRAD_FILE)?;
    matching.add("ALL_FILE", schema::matching::ALL_FILE)?;
    m.add_submodule(&matching)?;

    // Agency codes
    let agency = PyModule::new(m.py(), "agency")?;
    agency.add("NSF", schema::agency::NSF)?;
    agency.add("USDA", schema::agency::USDA)?;
    m.add_submodule(&agency)?;

    Ok(())
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<LinkModel>()?;
    add_schema_exports(m)?;
    Ok(())
}
