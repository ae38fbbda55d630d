//! Crop production and yield dashboard: loads a district-level crop table
//! and state boundaries, filters and aggregates them, and draws the results
//! in the terminal or to PNG files.

pub mod aggregate;
pub mod app;
pub mod cache;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod event;
pub mod filter;
pub mod geo;
pub mod names;
pub mod render;
pub mod ui;
