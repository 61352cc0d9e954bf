use crate::{
    error::{ApiError, ApiResult},
    models::{Credentials, Movie, MovieForm, MovieId, MovieSummary},
    services::{catalog::rating_body, navigation::View, pagination::MovieQuery},
};

use super::AppState;

/// Listing size the admin panel asks for
pub const ADMIN_LISTING_LIMIT: usize = 100;
/// Recommendations requested per call, for both the listing and the detail page
pub const RECOMMENDATION_COUNT: u32 = 5;
/// Shown on a detail page once the current movie is filtered out
pub const DETAIL_RECOMMENDATION_LIMIT: usize = 4;

pub const NO_RECOMMENDATIONS_MESSAGE: &str =
    "No recommendations available yet. Rate some movies to get started!";

/// What the recommendations view renders
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationsView {
    /// Logged out; the view shows a prompt instead of fetching
    RequiresLogin,
    Loaded(Vec<MovieSummary>),
    Empty,
    Failed(String),
}

impl RecommendationsView {
    pub fn notice(&self) -> Option<&str> {
        match self {
            RecommendationsView::RequiresLogin => Some("Please log in to see recommendations."),
            RecommendationsView::Empty => Some(NO_RECOMMENDATIONS_MESSAGE),
            RecommendationsView::Failed(message) => Some(message),
            RecommendationsView::Loaded(_) => None,
        }
    }
}

/// Detail page payload
#[derive(Debug, Clone, PartialEq)]
pub struct MovieDetailView {
    pub movie: Movie,
    pub recommendations: Vec<MovieSummary>,
}

impl AppState {
    /// Logs in, resolves the identity and lands on Home
    ///
    /// On failure the session is left untouched and the error is returned
    /// for the form to display inline.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<()> {
        let token = self.api.login(credentials).await?;
        let identity = self.api.current_user(&token.access_token).await?;

        self.session.login(token.access_token, identity)?;
        self.navigation.navigate(View::Home, None);
        self.notifier.success("Login successful!");
        Ok(())
    }

    pub async fn register(&self, credentials: &Credentials) -> ApiResult<()> {
        self.api.register(credentials).await?;
        tracing::info!(email = %credentials.email, "Registered new account");

        self.navigation.navigate(View::Login, None);
        self.notifier.success("Registration successful! Please log in.");
        Ok(())
    }

    pub fn logout(&self) {
        self.session.logout();
        self.navigation.navigate(View::Login, None);
        self.notifier.success("You have been logged out.");
    }

    /// Submits a 1-5 star rating, then reloads `listing` so averages update
    pub async fn rate_movie(
        &self,
        movie_id: MovieId,
        title: &str,
        stars: u8,
        listing: Option<&MovieQuery>,
    ) -> ApiResult<()> {
        let Some(token) = self.session.token() else {
            let message = "Please log in to rate movies.";
            self.notifier.error(message);
            self.navigation.navigate(View::Login, None);
            return Err(ApiError::Validation(message.to_string()));
        };

        if !(1..=5).contains(&stars) {
            let message = "Please select a rating.";
            self.notifier.error(message);
            return Err(ApiError::Validation(message.to_string()));
        }

        match self.api.rate_movie(&rating_body(movie_id, stars), &token).await {
            Ok(_) => {
                self.notifier
                    .success(format!("Rated \"{}\" {} stars!", title, stars));
                if let Some(listing) = listing {
                    listing.refresh();
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(movie_id = movie_id, error = %e, "Failed to submit rating");
                self.notifier
                    .error(format!("Failed to submit rating: {}", e.user_message()));
                Err(e)
            }
        }
    }

    /// Validates and uploads a movie from the admin form
    pub async fn upload_movie(&self, form: &MovieForm) -> ApiResult<Movie> {
        let token = self.admin_token()?;

        let new_movie = form.validate().map_err(|message| {
            self.notifier.error(message.clone());
            ApiError::Validation(message)
        })?;

        match self.api.create_movie(&new_movie, &token).await {
            Ok(movie) => {
                tracing::info!(movie_id = movie.id, "Movie uploaded");
                self.notifier
                    .success(format!("Movie \"{}\" uploaded successfully!", movie.title));
                Ok(movie)
            }
            Err(e) => {
                self.notifier
                    .error(format!("Failed to upload movie: {}", e.user_message()));
                Err(e)
            }
        }
    }

    /// Unfiltered catalog for the admin table; failures yield an empty table
    pub async fn admin_movies(&self) -> Vec<MovieSummary> {
        let token = self.session.token();
        match self
            .api
            .list_movies(0, ADMIN_LISTING_LIMIT, &Default::default(), token.as_deref())
            .await
        {
            Ok(movies) => movies,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load admin movie list");
                self.notifier
                    .error(format!("Failed to load movies: {}", e.user_message()));
                Vec::new()
            }
        }
    }

    pub async fn trigger_retrain(&self) -> ApiResult<()> {
        let token = self.admin_token()?;

        match self.api.trigger_retrain(&token).await {
            Ok(()) => {
                self.notifier
                    .success("Model retraining process started successfully!");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Retrain trigger failed");
                self.notifier
                    .error(format!("Failed to trigger retraining: {}", e.user_message()));
                Err(e)
            }
        }
    }

    pub async fn delete_movie(&self, movie_id: MovieId) -> ApiResult<()> {
        let token = self.admin_token()?;

        let result = self.api.delete_movie(movie_id, &token).await;
        if let Err(e) = &result {
            self.notifier.error(e.user_message());
        }
        result
    }

    /// Personalized recommendations for the recommendations view
    pub async fn load_recommendations(&self) -> RecommendationsView {
        let Some(token) = self.session.token() else {
            return RecommendationsView::RequiresLogin;
        };

        match self
            .api
            .recommendations(&token, RECOMMENDATION_COUNT, true)
            .await
        {
            Ok(entries) => {
                let movies: Vec<MovieSummary> = entries
                    .into_iter()
                    .filter_map(|entry| entry.into_summary())
                    .collect();
                if movies.is_empty() {
                    RecommendationsView::Empty
                } else {
                    RecommendationsView::Loaded(movies)
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load recommendations");
                RecommendationsView::Failed(format!(
                    "Failed to load recommendations: {}",
                    e.user_message()
                ))
            }
        }
    }

    /// Loads the movie named by the current route
    ///
    /// Returns `Ok(None)` when the route carries no id; the user is sent Home.
    /// Recommendation failures degrade to an empty list.
    pub async fn load_movie_detail(&self) -> ApiResult<Option<MovieDetailView>> {
        let route = self.navigation.current();
        let movie_id = match (route.view, route.param) {
            (View::MovieDetail, Some(id)) => id,
            _ => {
                self.navigation.navigate(View::Home, None);
                return Ok(None);
            }
        };

        let token = self.session.token();
        let movie = match self.api.get_movie(movie_id, token.as_deref()).await {
            Ok(movie) => movie,
            Err(e) => {
                tracing::error!(movie_id = movie_id, error = %e, "Failed to load movie");
                return Err(e);
            }
        };

        let recommendations = match token {
            Some(token) => match self
                .api
                .recommendations(&token, RECOMMENDATION_COUNT, true)
                .await
            {
                Ok(entries) => entries
                    .into_iter()
                    .filter_map(|entry| entry.into_summary())
                    .filter(|m| m.id != movie_id)
                    .take(DETAIL_RECOMMENDATION_LIMIT)
                    .collect(),
                Err(e) => {
                    tracing::warn!(movie_id = movie_id, error = %e, "Detail recommendations unavailable");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Ok(Some(MovieDetailView {
            movie,
            recommendations,
        }))
    }

    /// Token of an admin session, or a notified error
    fn admin_token(&self) -> ApiResult<String> {
        let session = self.session.snapshot();
        match session.token {
            Some(token) if session.is_admin => Ok(token),
            Some(_) => {
                let message = "You do not have permission to perform this action.";
                self.notifier.error(message);
                Err(ApiError::Validation(message.to_string()))
            }
            None => {
                let message = "Please log in to access the admin panel.";
                self.notifier.error(message);
                Err(ApiError::Validation(message.to_string()))
            }
        }
    }
}
