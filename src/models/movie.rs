use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal catalog identifier of a movie
pub type MovieId = i64;

/// A movie as returned by the listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub resource_url: Option<String>,
    #[serde(default)]
    pub movie_lens_id: Option<i64>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub num_ratings: Option<u32>,
}

/// A single rating attached to a movie detail response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: MovieId,
    pub rating: f64,
    pub timestamp: i64,
}

/// Full movie detail, including its ratings and aggregates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub resource_url: Option<String>,
    #[serde(default)]
    pub movie_lens_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub num_ratings: Option<u32>,
}

/// Payload for the admin create-movie call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub genres: Option<String>,
    pub resource_url: Option<String>,
    pub movie_lens_id: Option<i64>,
}

/// Raw admin form input, validated into a [`NewMovie`]
#[derive(Debug, Clone, Default)]
pub struct MovieForm {
    pub title: String,
    pub genres: String,
    pub resource_url: String,
    pub movie_lens_id: String,
}

impl MovieForm {
    /// Validates the form without touching the network
    ///
    /// Blank optional fields become `None`; a non-blank MovieLens id must be an integer.
    pub fn validate(&self) -> Result<NewMovie, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("Title is required.".to_string());
        }

        let movie_lens_id = match self.movie_lens_id.trim() {
            "" => None,
            raw => Some(
                raw.parse::<i64>()
                    .map_err(|_| "MovieLens ID must be a number if provided.".to_string())?,
            ),
        };

        Ok(NewMovie {
            title: title.to_string(),
            genres: non_blank(&self.genres),
            resource_url: non_blank(&self.resource_url),
            movie_lens_id,
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Rating submission body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewRating {
    pub movie_id: MovieId,
    pub rating: f64,
    /// Unix seconds
    pub timestamp: i64,
}

/// Entry of the personalized recommendation listing
///
/// The server identifies entries by `movie_id`; some payloads nest the movie instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(default, alias = "id")]
    pub movie_id: Option<MovieId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub resource_url: Option<String>,
    #[serde(default)]
    pub movie_lens_id: Option<i64>,
    #[serde(default)]
    pub movie: Option<MovieSummary>,
}

impl Recommendation {
    /// Identifier of the recommended movie, wherever the payload put it
    pub fn id(&self) -> Option<MovieId> {
        self.movie.as_ref().map(|m| m.id).or(self.movie_id)
    }

    /// Normalises the entry to the listing shape
    pub fn into_summary(self) -> Option<MovieSummary> {
        if let Some(movie) = self.movie {
            return Some(movie);
        }
        Some(MovieSummary {
            id: self.movie_id?,
            title: self.title.unwrap_or_default(),
            genres: self.genres,
            resource_url: self.resource_url,
            movie_lens_id: self.movie_lens_id,
            average_rating: None,
            num_ratings: None,
        })
    }
}
