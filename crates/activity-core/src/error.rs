use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid week key '{0}': expected YYYY-Www")]
    InvalidWeekKey(String),

    #[error("week {week} out of range for {year}: must be 1..=53")]
    WeekOutOfRange { year: i32, week: u32 },

    #[error("invalid year: {0}")]
    InvalidYear(i32),

    #[error("no user matches '{0}'")]
    IdentityNotFound(String),

    #[error("identity is empty after sanitizing: '{0}'")]
    EmptyIdentity(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
