//! Application services layer.

pub mod error;
pub mod poller;
pub mod syndication;
