pub mod movie;
pub mod user;

pub use movie::{Movie, MovieForm, MovieId, MovieSummary, NewMovie, NewRating, Rating, Recommendation};
pub use user::{Credentials, Identity, NewUser, TokenResponse};

/// Number of movies requested per listing page
pub const PAGE_SIZE: usize = 10;
