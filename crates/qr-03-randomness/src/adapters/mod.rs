//! Adapters for the pipeline ports.

pub mod mock;
pub mod process;

pub use mock::{RecordingSigner, ScriptedEntropySource, ScriptedEvaluator};
pub use process::{EvaluatorCommand, GeneratorCommand, ProcessEntropySource, ProcessQualityEvaluator};
