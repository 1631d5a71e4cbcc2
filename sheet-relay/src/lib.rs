//! Relay an HTML inspection form into a Google Sheets spreadsheet.
//!
//! The [`services::relay`] module holds the field-to-cell mapping, [`api`]
//! talks to the Sheets service and [`server`] exposes both over HTTP.

pub mod api;
pub mod cli;
pub mod config;
pub mod server;
pub mod services;
