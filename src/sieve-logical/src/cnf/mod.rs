//! Conjunctive normal form model and conversion.

mod converter;
mod model;

pub use converter::CnfConverter;
pub use model::{AtomicFormula, CnfQuery, OrGroup};
