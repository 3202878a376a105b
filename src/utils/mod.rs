pub mod error;

pub use error::CcodeError;
