pub mod config;
pub mod draw;
pub mod engine;
pub mod error;
pub mod history;
pub mod probability;
pub mod report;
pub mod strategy;
