// Field Analysis & Manipulation Module
//
// - classifier: value -> FieldType by ordered pattern matching
// - mapper: body / query -> FieldMapping
// - substitution: path-addressed replacement during probe construction
//
// Architecture:
//   classifier.rs (leaf)
//       ↑
//   mapper.rs (uses classifier and substitution's path helpers)
//
//   substitution.rs (independent, runtime)

pub mod classifier;
pub mod mapper;
pub mod substitution;

pub use classifier::*;
pub use mapper::*;
pub use substitution::*;
