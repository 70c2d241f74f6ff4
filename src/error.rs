use pyo3::exceptions::PyRuntimeError;
use pyo3::PyErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Data not loaded: {0}")]
    NotLoaded(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    General(String),
}

impl From<LinkError> for PyErr {
    fn from(err: LinkError) -> PyErr {
        PyRuntimeError::new_err(err.to_string())
    }
}
