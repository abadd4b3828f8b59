//! Feedrelay mirrors tagged posts from an upstream content API into an
//! in-memory store and republishes them as Atom feeds over HTTP.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
