// Re-export all model types
pub use self::errors::*;
pub use self::signup::*;

mod errors;
mod signup;
