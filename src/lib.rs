//! playground - JSON:API CRUD endpoints for declaratively configured models
//!
//! A model is exposed by declaring which attributes, relationships, write
//! operations, filters and pagination it allows. Requests are answered by
//! the [`playground::Dispatcher`] against whatever [`playground::RecordStore`]
//! backs the model.

pub mod auth;
pub mod cli;
pub mod config;
pub mod http_server;
pub mod observability;
pub mod playground;
