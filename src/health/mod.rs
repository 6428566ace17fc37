pub mod probe;
pub mod score;

pub use probe::HealthProbe;
pub use score::{compute_score, ScoreThresholds};
