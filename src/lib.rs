#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod analysis;
pub mod calibration;
pub mod classify;
pub mod config;
pub mod error;
pub mod math;
pub mod response;
pub mod run;
pub mod summary;
pub mod tail;
pub mod uncertainty;

pub use error::Error;

pub type Result<T> = ::std::result::Result<T, Error>;
