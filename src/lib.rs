//! Splitrun - a multi-pane terminal UI for running scripts side by side
//!
//! This library provides the core functionality for discovering executable
//! scripts, supervising up to two concurrently running processes, and
//! rendering their live output in a resizable three-pane terminal interface.

pub mod config;
pub mod error;
pub mod logging;
pub mod process;
pub mod runner;
pub mod ui;
