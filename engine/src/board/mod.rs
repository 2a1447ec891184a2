//! Board orchestration
//!
//! A board run takes a decision memo through a normalizer persona, a panel
//! of reviewer personas consulted in parallel, and a synthesizer persona
//! that merges their reviews into one recommendation.

pub mod assembler;
pub mod memo;
pub mod orchestrator;
pub mod personas;
pub mod types;

pub use assembler::{NormalizationRecord, ReviewRecord, RunRecords, SynthesisRecord};
pub use memo::{build_synthesis_input, render_memo};
pub use orchestrator::Orchestrator;
pub use personas::{PersonaDescriptor, PersonaRegistry, PersonaRole};
pub use types::{BoardRunResult, OrchestrationError, Phase, RunState};
