mod guards;
mod handlers;
mod state;

pub use guards::{evaluate, GuardDecision};
pub use handlers::{MovieDetailView, RecommendationsView, NO_RECOMMENDATIONS_MESSAGE};
pub use state::AppState;
