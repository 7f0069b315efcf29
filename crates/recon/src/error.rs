use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing canonical field, bad compare list, etc.).
    ConfigInvalid(String),
    /// A table exceeds the configured row limit.
    InputTooLarge { role: String, rows: usize, limit: usize },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigInvalid(msg) => write!(f, "invalid configuration: {msg}"),
            Self::InputTooLarge { role, rows, limit } => {
                write!(f, "{role} table has {rows} rows, limit is {limit}")
            }
        }
    }
}

impl std::error::Error for ReconError {}
