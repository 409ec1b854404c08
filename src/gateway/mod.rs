//! Gateway orchestration

mod builder;
mod interpreter;

pub use builder::{Urania, UraniaBuilder};
pub use interpreter::{Interpretation, InterpretationGateway, StoredInterpretation};
