// src/lib.rs
pub mod matching;
pub mod models;
pub mod persistence;
pub mod pipeline;
pub mod sources;
pub mod utils;
