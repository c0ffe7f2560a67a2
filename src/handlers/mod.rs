pub mod health;
pub mod metrics;
pub mod signup;
pub mod welcome;

pub use health::*;
pub use metrics::*;
pub use signup::*;
pub use welcome::*;
