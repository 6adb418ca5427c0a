//! Apollo Leads Library
//!
//! Lead-generation front end over the Apollo.io API: company and people
//! search, contact enrichment, and spreadsheet export behind an operator
//! login.
//!
//! # Modules
//!
//! - `apollo_client`: Apollo API client (search, bulk enrichment, tags).
//! - `auth`: Operator credential check and signed session cookies.
//! - `config`: Configuration management.
//! - `credits`: Estimated Apollo credit accounting.
//! - `errors`: Error handling types.
//! - `export`: Per-company xlsx workbooks bundled into a zip.
//! - `handlers`: JSON API handlers and shared state.
//! - `models`: Records, request inputs, and responses.
//! - `normalize`: Apollo response flattening and enrichment merge.
//! - `payloads`: Filter to Apollo payload translation.
//! - `routes`: Router assembly.
//! - `web`: Login and company search pages.

pub mod apollo_client;
pub mod auth;
pub mod config;
pub mod credits;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod payloads;
pub mod routes;
pub mod web;
