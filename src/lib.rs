//! Form builder backend
//!
//! Owners create shareable forms, collect submissions and read per-form
//! analytics. Storage is an embedded redb database; identity comes from an
//! upstream proxy.

pub mod analytics;
pub mod config;
pub mod database;
pub mod error;
pub mod forms;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod route;
pub mod submissions;
