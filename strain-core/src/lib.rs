pub mod mode;
pub mod payload;
pub mod response;
pub mod stats;
pub mod stress;

pub use mode::{ServiceLimits, ServiceMode};
pub use payload::generate_payload;
pub use response::build_numeric_response;
pub use stats::{Statistics, Trial};
pub use stress::{LegacyAggregate, StressAggregate, StressError, StressSpec};
