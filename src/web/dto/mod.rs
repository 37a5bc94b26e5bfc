//! Data Transfer Objects for the stats service.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
