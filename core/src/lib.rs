pub mod broadcast;
pub mod config;
pub mod error;
pub mod ethereum;
pub mod http;
pub mod metadata;
pub mod metrics;
pub mod model;
pub mod persist;
pub mod scheduler;
pub mod service;
pub mod util;
