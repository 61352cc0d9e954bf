/// Typed wrappers over the movie catalog endpoints
///
/// Each method is one transport call. Tokens are passed in by the caller;
/// nothing here reads or writes the persisted session.
use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        Credentials, Identity, Movie, MovieId, MovieSummary, NewMovie, NewRating,
        NewUser, Recommendation, TokenResponse,
    },
    services::transport::{RequestOptions, Transport},
};

/// Filter applied to the movie listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MovieFilter {
    pub search: String,
    /// Comma-separated genres; the server requires all of them to match
    pub genres: String,
}

impl MovieFilter {
    pub fn new(search: impl Into<String>, genres: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            genres: genres.into(),
        }
    }
}

#[derive(Clone)]
pub struct CatalogApi {
    transport: Arc<dyn Transport>,
}

impl CatalogApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Creates an account; the caller logs in separately
    pub async fn register(&self, credentials: &Credentials) -> ApiResult<()> {
        let body = serde_json::to_value(NewUser {
            email: &credentials.email,
            password: &credentials.password,
        })?;
        self.transport
            .call("/api/v1/users/register", RequestOptions::post().json(body))
            .await?;
        Ok(())
    }

    /// Exchanges credentials for a bearer token (form-encoded)
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<TokenResponse> {
        let fields = vec![
            ("username".to_string(), credentials.email.clone()),
            ("password".to_string(), credentials.password.clone()),
        ];
        let payload = self
            .transport
            .call("/api/v1/users/login/token", RequestOptions::post().form(fields))
            .await?;
        decode(payload)
    }

    /// Fetches the identity behind `token`
    pub async fn current_user(&self, token: &str) -> ApiResult<Identity> {
        let payload = self
            .transport
            .call("/api/v1/users/me", RequestOptions::get().bearer(Some(token)))
            .await?;
        decode(payload)
    }

    /// One page of the catalog listing
    pub async fn list_movies(
        &self,
        skip: usize,
        limit: usize,
        filter: &MovieFilter,
        token: Option<&str>,
    ) -> ApiResult<Vec<MovieSummary>> {
        let path = movies_path(skip, limit, filter)?;
        let payload = self
            .transport
            .call(&path, RequestOptions::get().bearer(token))
            .await?;
        decode_list(payload)
    }

    pub async fn get_movie(&self, movie_id: MovieId, token: Option<&str>) -> ApiResult<Movie> {
        let path = format!("/api/v1/movies/{}", movie_id);
        let payload = self
            .transport
            .call(&path, RequestOptions::get().bearer(token))
            .await?;
        decode(payload)
    }

    pub async fn create_movie(&self, movie: &NewMovie, token: &str) -> ApiResult<Movie> {
        let body = serde_json::to_value(movie)?;
        let payload = self
            .transport
            .call(
                "/api/v1/movies/",
                RequestOptions::post().json(body).bearer(Some(token)),
            )
            .await?;
        decode(payload)
    }

    pub async fn rate_movie(&self, rating: &NewRating, token: &str) -> ApiResult<Option<Value>> {
        let body = serde_json::to_value(rating)?;
        self.transport
            .call(
                "/api/v1/ratings/",
                RequestOptions::post().json(body).bearer(Some(token)),
            )
            .await
    }

    pub async fn recommendations(
        &self,
        token: &str,
        count: u32,
        exclude_watched: bool,
    ) -> ApiResult<Vec<Recommendation>> {
        let path = format!(
            "/api/v1/recommendations/user/me?count={}&exclude_watched={}",
            count, exclude_watched
        );
        let payload = self
            .transport
            .call(&path, RequestOptions::get().bearer(Some(token)))
            .await?;
        decode_list(payload)
    }

    /// Fire-and-forget from the client's perspective; any body is ignored
    pub async fn trigger_retrain(&self, token: &str) -> ApiResult<()> {
        self.transport
            .call(
                "/trigger-retrain-model",
                RequestOptions::post().bearer(Some(token)),
            )
            .await?;
        Ok(())
    }

    /// Deleting movies has no server contract
    ///
    /// No request is sent; callers get an explicit error instead of a simulated success.
    pub async fn delete_movie(&self, movie_id: MovieId, _token: &str) -> ApiResult<()> {
        tracing::warn!(movie_id = movie_id, "Movie deletion requested but not supported by the API");
        Err(ApiError::Unsupported(format!(
            "Deleting movie {} is not supported by the server.",
            movie_id
        )))
    }
}

fn movies_path(skip: usize, limit: usize, filter: &MovieFilter) -> ApiResult<String> {
    // Only the path and query are kept; the origin belongs to the transport
    let mut url = Url::parse("http://catalog.invalid/api/v1/movies/")
        .map_err(|e| ApiError::Validation(format!("Invalid listing URL: {}", e)))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string());
        if !filter.search.is_empty() {
            query.append_pair("search", &filter.search);
        }
        if !filter.genres.is_empty() {
            query.append_pair("genres", &filter.genres);
        }
    }
    Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
}

fn decode<T: DeserializeOwned>(payload: Option<Value>) -> ApiResult<T> {
    let value = payload
        .ok_or_else(|| ApiError::MalformedResponse("expected a JSON body, got none".to_string()))?;
    Ok(serde_json::from_value(value)?)
}

/// Lists treat an empty body as an empty page
fn decode_list<T: DeserializeOwned>(payload: Option<Value>) -> ApiResult<Vec<T>> {
    match payload {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

/// JSON body for a rating, stamped with the current Unix time
pub fn rating_body(movie_id: MovieId, stars: u8) -> NewRating {
    NewRating {
        movie_id,
        rating: f64::from(stars),
        timestamp: chrono::Utc::now().timestamp(),
    }
}
