//! Noisemap - crowdsourced noise-pollution reporting and analytics.
//!
//! # Overview
//!
//! Citizens submit noise measurements (decibel level, location, category).
//! Noisemap stores them and turns any filtered subset into the structures the
//! map and chart views render: daily trend buckets, a category distribution,
//! heatmap points and summary statistics.
//!
//! Control flow for a query: filter parameters become a [`filter::ReportFilter`],
//! the [`storage::ReportStore`] yields every report, the filter keeps the
//! matching ones, and [`aggregation`] reduces them. Only the store fetch does
//! I/O; filtering and aggregation are pure.
//!
//! # Modules
//!
//! - [`model`]: Reports, categories, statuses and aggregate result types
//! - [`filter`]: Filter parsing (lenient or strict) and report predicates
//! - [`aggregation`]: Time series, category distribution, heat points, summaries
//! - [`sample`]: Synthetic report generation for demos and empty stores
//! - [`storage`]: In-memory and SQLite report stores
//! - [`config`]: Environment configuration
//! - [`error`]: Error types and their HTTP mapping
//! - [`api`]: HTTP API handlers

pub mod aggregation;
pub mod api;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod sample;
pub mod storage;
