//! stock-dash: client for a stock OHLCV backend.
//!
//! Records are fetched into a [`store::RecordStore`], shaped for display by
//! [`table`] and [`chart`], and written back through [`gateway`]. The
//! [`app::Dashboard`] owns all of it.

pub mod api;
pub mod app;
pub mod chart;
pub mod config;
pub mod gateway;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod store;
pub mod table;
pub mod utils;
