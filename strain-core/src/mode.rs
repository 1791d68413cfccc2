//! Operating modes and the response ceilings derived from them.
//!
//! | Mode   | Numeric response cap | Server-stream message cap |
//! |--------|----------------------|---------------------------|
//! | Test   | 4 MiB / 8 bytes      | unbounded                 |
//! | Public | 1 element            | 10 messages               |

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Largest numeric response in test mode: a 4 MiB body in 8-byte elements.
pub const TEST_RESPONSE_CAP: usize = 4 * 1024 * 1024 / 8;

/// Numeric response length in public mode, whatever the request asks for.
pub const PUBLIC_RESPONSE_CAP: usize = 1;

/// Most messages a single server stream may emit in public mode.
pub const PUBLIC_STREAM_CAP: u64 = 10;

// ---------------------------------------------------------------------------
// ServiceMode
// ---------------------------------------------------------------------------

/// Operating mode, chosen once at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServiceMode {
    /// Permissive mode for internal benchmarking, loopback only.
    #[default]
    Test,
    /// Restrictive mode for externally reachable deployments.
    Public,
}

#[derive(Debug, Error)]
#[error("unknown service mode {0:?} (expected \"test\" or \"public\")")]
pub struct ParseModeError(String);

impl ServiceMode {
    pub fn is_public(self) -> bool {
        matches!(self, ServiceMode::Public)
    }

    /// Ceilings enforced by every handler running in this mode.
    pub fn limits(self) -> ServiceLimits {
        match self {
            ServiceMode::Test => ServiceLimits {
                public:       false,
                response_cap: TEST_RESPONSE_CAP,
                stream_cap:   None,
            },
            ServiceMode::Public => ServiceLimits {
                public:       true,
                response_cap: PUBLIC_RESPONSE_CAP,
                stream_cap:   Some(PUBLIC_STREAM_CAP),
            },
        }
    }
}

impl FromStr for ServiceMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test"   => Ok(ServiceMode::Test),
            "public" => Ok(ServiceMode::Public),
            other    => Err(ParseModeError(other.to_owned())),
        }
    }
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceMode::Test   => f.write_str("test"),
            ServiceMode::Public => f.write_str("public"),
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceLimits
// ---------------------------------------------------------------------------

/// Immutable per-mode ceilings. `Copy`, so every handler gets its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceLimits {
    pub public: bool,
    /// Maximum length of a numeric response.
    pub response_cap: usize,
    /// Maximum number of messages in one server stream, if bounded.
    pub stream_cap: Option<u64>,
}

impl ServiceLimits {
    /// Number of messages a server stream actually emits for `requested`.
    pub fn stream_len(&self, requested: u64) -> u64 {
        match self.stream_cap {
            Some(cap) => requested.min(cap),
            None      => requested,
        }
    }
}
