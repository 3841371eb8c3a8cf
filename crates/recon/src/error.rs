use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty column name, overlapping labels, etc.).
    ConfigValidation(String),
    /// A configured column is not present in the decoded feed.
    MissingColumn { feed: String, column: String },
    /// A non-empty price cell that is not a plain decimal.
    PriceParse { feed: String, vin: String, column: String, value: String },
    /// Type string matched neither vocabulary (only under `unknown_type = "error"`).
    UnknownVehicleType { feed: String, vin: String, value: String },
    /// VIN seen twice in the dealer-filtered comparison feed (only under `on_duplicate_vin = "error"`).
    DuplicateVin { feed: String, vin: String },
}

impl ReconError {
    /// True for errors caused by the mapping configuration rather than the data.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::MissingColumn { .. }
        )
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { feed, column } => {
                write!(f, "{feed} feed: configured column '{column}' not found")
            }
            Self::PriceParse { feed, vin, column, value } => {
                write!(f, "{feed} feed, VIN '{vin}': cannot parse price '{value}' in column '{column}'")
            }
            Self::UnknownVehicleType { feed, vin, value } => {
                write!(f, "{feed} feed, VIN '{vin}': vehicle type '{value}' is neither new nor used")
            }
            Self::DuplicateVin { feed, vin } => {
                write!(f, "{feed} feed: VIN '{vin}' appears more than once")
            }
        }
    }
}

impl std::error::Error for ReconError {}
