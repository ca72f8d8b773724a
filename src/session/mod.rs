pub mod aggregator;
pub mod rate;
pub mod types;

pub use aggregator::{SessionAggregator, SessionAggregatorConfig};
pub use types::{BlinkEvent, BlinkRatePoint, FaceLostPeriod, SessionData, SessionQuality};
