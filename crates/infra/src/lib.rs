//! Infrastructure layer: storage, change notification, repository and config.

pub mod config;
pub mod notify;
pub mod repository;
pub mod service;
pub mod store;
