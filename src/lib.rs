// src/lib.rs

//! newswatch: keyword-driven crawler for Indonesian news sites.
//!
//! The engine expands keywords x sites into crawl jobs, walks each site's
//! search pagination until a date threshold, and funnels extracted articles
//! through a bounded queue into one collected batch.

pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod models;
pub mod output;
pub mod sites;
pub mod utils;
