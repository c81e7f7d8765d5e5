pub mod error;

pub use error::{CheckInError, Result};
