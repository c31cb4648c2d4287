pub mod agents;
pub mod classify;
pub mod config;
pub mod consts;
pub mod error;
pub mod events;
pub mod hooks;
pub mod normalize;
pub mod resolver;
pub mod runner;
