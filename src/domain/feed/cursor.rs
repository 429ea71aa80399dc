use crate::shared::error::AppError;
use std::fmt;

/// Literal token for an absent boundary field.
pub const UNDEFINED: &str = "undefined";

/// Maximal rank sentinel emitted on first-page responses so the next request
/// enters continuation mode with an effectively unbounded starting rank.
pub const SENTINEL_RANK: &str = "99999999";

/// The opaque pagination token: the session seed plus one boundary per
/// stream. Boundary values are carried verbatim as strings so a decode of an
/// encoded cursor reproduces them exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub seed: u64,
    pub home: Option<String>,
    pub discover: Option<String>,
    pub follows: Option<String>,
}

impl Cursor {
    pub fn first_page(seed: u64) -> Self {
        Self {
            seed,
            home: None,
            discover: None,
            follows: None,
        }
    }

    /// A continuation cursor needs both rank boundaries; anything less means
    /// the previous response was a first page (or a degraded error page) and
    /// this request starts over.
    pub fn is_continuation(&self) -> bool {
        self.home.is_some() && self.discover.is_some()
    }

    pub fn decode(raw: &str) -> Result<Self, AppError> {
        let parts: Vec<&str> = raw.split("::").collect();
        let malformed = || AppError::InvalidInput("malformed cursor".to_string());

        if parts.len() < 2 {
            return Err(malformed());
        }
        let seed = parts[0].parse::<u64>().map_err(|_| malformed())?;
        if parts[1].is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            seed,
            home: decode_field(parts.get(1)),
            discover: decode_field(parts.get(2)),
            follows: decode_field(parts.get(3)),
        })
    }
}

fn decode_field(part: Option<&&str>) -> Option<String> {
    match part {
        Some(&value) if !value.is_empty() && value != UNDEFINED => Some(value.to_string()),
        _ => None,
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| UNDEFINED.to_string());
        write!(
            f,
            "{}::{}::{}::{}",
            self.seed,
            field(&self.home),
            field(&self.discover),
            field(&self.follows)
        )
    }
}

/// Seeds a fresh pagination session from wall-clock sub-second entropy, the
/// only place a seed is ever generated.
pub fn fresh_seed() -> u64 {
    chrono::Utc::now().timestamp_subsec_millis() as u64
}
