pub mod format;
pub mod required;

pub use format::FormatValidator;
pub use required::RequiredFieldValidator;
