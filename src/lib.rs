//! Tin Moi - a concurrent news feed digest
//!
//! Sweeps a fixed set of feeds in parallel, aggregates the newest items into a
//! timestamped report, and lets an operator annotate items with their own
//! summaries and opinions before saving the annotated report to disk.

pub mod cli;
pub mod config;
pub mod crawler;
pub mod display;
pub mod error;
pub mod fetcher;
pub mod overlay;
pub mod report;
pub mod routes;
pub mod service;
pub mod store;
