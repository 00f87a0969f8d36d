//! imaging-service: upload medical images, run AI analysis, keep the reports.
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
