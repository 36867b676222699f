pub mod config;
pub mod format;
pub mod generator;
pub mod logger;
pub mod mode;
pub mod profiler;
pub mod visualization;
