use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid configuration value for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("invalid fee table: {0}")]
    InvalidFeeTable(String),
}
