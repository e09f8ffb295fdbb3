//! Homotopy class trajectory planner.
//!
//! Discovers topologically distinct candidate trajectories between a start
//! and a goal pose in a planar workspace, keeps one elastic band candidate
//! per homotopy class alive across planning cycles, optimizes the whole pool
//! and commits to the cheapest survivor.

#[macro_use]
extern crate log;

pub mod error;
pub mod instrumentation;
pub mod pose;
pub mod obstacle;
pub mod planner_param;
pub mod hsignature;
pub mod graph;
pub mod teb;
pub mod pool;
pub mod optimizer;
pub mod planner;
pub mod planner_hcp;
