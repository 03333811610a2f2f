// Application layer - the operations any front end drives.

pub mod error;
mod service;

pub use error::*;
pub use service::*;
