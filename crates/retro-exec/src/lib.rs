mod error;
pub use error::ExecError;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "subprocess")]
pub mod subprocess;
