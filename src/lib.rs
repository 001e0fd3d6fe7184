pub mod app;
pub mod config;
pub mod error;
pub mod mcp_server;
pub mod media;
pub mod object_store;
pub mod presets;
pub mod reconcile;
pub mod session;
pub mod storage;
pub mod tools;
pub mod url_validation;
pub mod web;
pub mod webhook;
