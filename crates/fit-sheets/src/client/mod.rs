pub mod api;
pub mod token;

pub use api::{FitClient, HEART_RATE_TYPE, SLEEP_SEGMENT_SOURCE, STEP_COUNT_TYPE};
pub use token::AccessToken;
