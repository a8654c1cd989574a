//! Error taxonomy for city generation.

/// Errors that can occur while configuring or running a generation.
#[derive(Debug)]
pub enum CityError {
    /// A coordinate lies outside `[0, width) x [0, height)`
    OutOfRange { x: f64, y: f64, width: f64, height: f64 },
    /// The domain is too small to generate anything useful
    InvalidDomain { width: u32, height: u32 },
    /// An edge endpoint is in range but no vertex exists there
    MissingVertex { x: f64, y: f64 },
    /// A bounded retry loop ran out of attempts before meeting its target
    GenerationExhausted { stage: &'static str, attempts: usize },
    /// A configuration parameter is missing, of the wrong type, or invalid
    ConfigKey { key: String, reason: String },
    /// IO error while reading a configuration file
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, CityError>;

/// Smallest accepted domain side, in world units.
pub const MIN_DOMAIN_SIZE: u32 = 10;

impl CityError {
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        CityError::ConfigKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// True for outcomes the caller may accept as a best-effort result.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CityError::OutOfRange { .. } | CityError::GenerationExhausted { .. }
        )
    }
}

impl std::fmt::Display for CityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CityError::OutOfRange { x, y, width, height } => write!(
                f,
                "Coordinate ({}, {}) out of range for {}x{} domain",
                x, y, width, height
            ),
            CityError::InvalidDomain { width, height } => write!(
                f,
                "Invalid domain size {}x{} (minimum {}x{})",
                width, height, MIN_DOMAIN_SIZE, MIN_DOMAIN_SIZE
            ),
            CityError::MissingVertex { x, y } => write!(f, "No vertex at ({}, {})", x, y),
            CityError::GenerationExhausted { stage, attempts } => write!(
                f,
                "{} generation gave up after {} attempts",
                stage, attempts
            ),
            CityError::ConfigKey { key, reason } => {
                write!(f, "Config error for '{}': {}", key, reason)
            }
            CityError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for CityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CityError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CityError {
    fn from(e: std::io::Error) -> Self {
        CityError::Io(e)
    }
}
