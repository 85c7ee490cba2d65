pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod load;
pub mod logging;
pub mod models;
pub mod mutator;
pub mod parameters;  // Field mapping, classification and path substitution
pub mod registry;
pub mod reporting;
pub mod response_analysis;
pub mod runner;
pub mod stats;
pub mod suites;
pub mod verdict;

// Re-export commonly used items
pub use config::*;
pub use dataset::*;
pub use engine::*;
pub use error::*;
pub use load::*;
pub use logging::*;
pub use models::*;
pub use mutator::*;
pub use parameters::*;  // Re-exports all parameter functionality
pub use registry::*;
pub use reporting::*;
pub use response_analysis::*;
pub use runner::*;
pub use stats::*;
pub use suites::*;
pub use verdict::*;
