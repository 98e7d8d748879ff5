//! Core domain logic for the SupplyInsights dashboard.
//!
//! The library is organized around four pieces of reusable logic: the
//! supplier performance scorer, the review sentiment engine, the login
//! throttle, and the visit logger. Storage, credential checks, and sentiment
//! back-ends all sit behind traits so the HTTP service and the test suites
//! can supply their own implementations.

pub mod config;
pub mod error;
pub mod reviews;
pub mod scoring;
pub mod sentiment;
pub mod telemetry;
pub mod throttle;
pub mod visit;
