//! Trading Hub Monitor
//!
//! Native dashboard frontend for the AlgoTrading hub: keeps a live WebSocket
//! channel to the backend status feed, relays start/stop commands to the
//! control API, and serves a server-rendered live view plus a backtest
//! results viewer on a local mirror port.

pub mod backtest;
pub mod config;
pub mod control;
pub mod dashboard;
pub mod model;
pub mod render;
pub mod sync;
