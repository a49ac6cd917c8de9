//! A small runtime for exported artifacts, independent of the `arch` module.

mod ops;
mod session;

pub use session::Session;
