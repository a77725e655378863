//! Savings-goal tracking library.
//!
//! Records income and expense transactions against a single savings goal
//! and derives the views a presentation layer needs from them: the running
//! balance, the clamped goal progress, per-day income/expense aggregates and
//! a month calendar grid for heat-map rendering.
//!
//! Persistence is pluggable through the [`storage`] traits. The derived
//! state lives in [`aggregation`] and [`calendar`] and is pure: it never
//! performs I/O and never fails.

pub mod aggregation;
pub mod calendar;
pub mod config;
pub mod error;
pub mod models;
pub mod snapshot;
pub mod storage;
pub mod tracker;
