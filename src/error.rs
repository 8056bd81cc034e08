use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("insufficient data: at least {required} values required, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    /// The initial and plateau levels of a response curve coincide, so no fraction of the
    /// span can be located.
    #[error("degenerate response: initial and final level are both {level}")]
    DegenerateResponse { level: f64 },
    #[error("missing field `{field}`{}", on_line(.line))]
    MissingField {
        field: &'static str,
        line: Option<u64>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}

fn on_line(line: &Option<u64>) -> String {
    line.map_or_else(String::new, |line| format!(" on line {line}"))
}

impl Error {
    pub(crate) const fn insufficient(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }
}
