mod candidates;
mod types;

// Re-export from types
pub use types::{Candidate, Prediction, PredictOptions};
// Re-export from candidates
pub use candidates::{candidates_from_tensors, predict_instances};
