// zipline/src/pipeline/mod.rs

//! A small named-step runner used to split each order transition into a
//! required commit step and a tail of best-effort side effects.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{Handler, Pipeline};
pub use step::{SkipCondition, StepDef};
