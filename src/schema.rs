/// Column-name constants for the grad-linkkit schema.
/// Single source of truth - exported to Python via PyO3.

// ── Transaction columns ─────────────────────────────────────────────────────
pub mod transaction {
    pub const EMPLOYEE_ID: &str = "employee_id";
    pub const UNIVERSITY: &str = "university";
    pub const LAST_NAME: &str = "last_name";
    pub const FIRST_NAME: &str = "first_name";
    pub const PERIOD_START_DATE: &str = "period_start_date";
    pub const PERIOD_END_DATE: &str = "period_end_date";
    pub const OCCUPATIONAL_CLASSIFICATION: &str = "occupational_classification";
    pub const X_OCCUPATIONAL_CLASSIFICATION: &str = "x_occupational_classification";
    pub const AGENCY_CODE: &str = "agency_code";
    pub const IS_NIH: &str = "is_nih";

    pub const REQUIRED: [&str; 10] = [
        EMPLOYEE_ID,
        UNIVERSITY,
        LAST_NAME,
        FIRST_NAME,
        PERIOD_START_DATE,
        PERIOD_END_DATE,
        OCCUPATIONAL_CLASSIFICATION,
        X_OCCUPATIONAL_CLASSIFICATION,
        AGENCY_CODE,
        IS_NIH,
    ];
}

// ── Summary columns ─────────────────────────────────────────────────────────
pub mod summary {
    pub const EMPLOYEE_ID: &str = "employee_id";
    pub const UNIVERSITY: &str = "university";
    pub const LAST_NAME: &str = "last_name";
    pub const FIRST_NAME: &str = "first_name";
    pub const MAX_GRAD_YEAR: &str = "max_grad_year";
    pub const MIN_PERIOD_START_DATE: &str = "min_period_start_date";
    pub const MAX_PERIOD_END_DATE: &str = "max_period_end_date";
    pub const DAYS_WORKED: &str = "days_worked";
    pub const WORK_6_MONTHS_OVER_2_YEARS: &str = "work_6_months_over_2_years";
    pub const WORK_12_MONTHS_OVER_2_YEARS: &str = "work_12_months_over_2_years";
    pub const WORK_LT_6_MONTHS_OR_LT_2_YEARS: &str = "work_lt_6_months_or_lt_2_years";
    pub const FIRST_APPEAR_BUCKETED_OCCUP: &str = "first_appear_bucketed_occup";
    pub const FIRST_APPEAR_ORIG_OCCUP: &str = "first_appear_orig_occup";
    pub const FIRST_APPEAR_DATE: &str = "first_appear_date";
    pub const DAYS_WORKED_UNDER_FIRST_OCCUP: &str = "days_worked_under_first_occup";
    pub const FIRST_APPEAR_AS_GRAD_DATE: &str = "first_appear_as_grad_date";
    pub const FIRST_APPEAR_AS_GRAD_ORIG_OCCUP: &str = "first_appear_as_grad_orig_occup";
    pub const LAST_APPEAR_AS_GRAD_DATE: &str = "last_appear_as_grad_date";
    pub const LAST_APPEAR_AS_GRAD_ORIG_OCCUP: &str = "last_appear_as_grad_orig_occup";
    pub const DAYS_WORKED_AS_GRAD: &str = "days_worked_as_grad";
    pub const LAST_APPEAR_BUCKETED_OCCUP: &str = "last_appear_bucketed_occup";
    pub const LAST_APPEAR_ORIG_OCCUP: &str = "last_appear_orig_occup";
    pub const DAYS_WORKED_UNDER_LAST_OCCUP: &str = "days_worked_under_last_occup";
    pub const WORK_6_MONTHS_ON_NIH: &str = "work_6_months_on_nih";
    pub const WORK_6_MONTHS_ON_NSF: &str = "work_6_months_on_nsf";
    pub const WORK_6_MONTHS_ON_USDA: &str = "work_6_months_on_usda";
}

// ── Matching-input columns ──────────────────────────────────────────────────
pub mod matching {
    pub const LAST_INITIAL: &str = "last_initial";
    pub const UNIVERSITY: &str = "university";
    pub const EMPLOYEE_ID: &str = "employee_id";
    pub const LAST_NAME: &str = "last_name";
    pub const FIRST_NAME: &str = "first_name";
    pub const MATCH_YEAR: &str = "match_year";

    pub const GRAD_FILE: &str = "smnames_grad.csv";
    pub const ALL_FILE: &str = "smnames_all.csv";
}

// ── Funding agency codes ────────────────────────────────────────────────────
pub mod agency {
    pub const NSF: i32 = 47;
    pub const USDA: i32 = 10;
}
