//! Phenology Core: shared configuration schema and error types
//!
//! This crate provides the configuration types (crop phase lists and
//! daily driver schedules) and the configuration error types shared by
//! the `phenology` engine, its loader and its CLI.

pub mod config;
pub mod error;
