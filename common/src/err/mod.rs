pub mod decode_error;

pub use decode_error::ReError;

pub type CResult<T> = Result<T, ReError>;
