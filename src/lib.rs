//! Paralympics statistics dashboard: data access, chart builders, reactive
//! input bindings and the HTTP service that serves them.

pub mod aggregate;
pub mod bindings;
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod pages;
pub mod server;
pub mod views;

#[cfg(test)]
mod fixtures;
