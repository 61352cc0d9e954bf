use std::fmt::Display;
use std::str::FromStr;

use tokio::sync::watch;

use crate::models::MovieId;

/// Logical screens of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Login,
    Register,
    Recommendations,
    Admin,
    MovieDetail,
    Unknown,
}

impl View {
    /// Views that only make sense for a logged-in user
    pub fn requires_auth(self) -> bool {
        matches!(self, View::Recommendations | View::Admin)
    }

    pub fn requires_admin(self) -> bool {
        matches!(self, View::Admin)
    }
}

impl Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            View::Home => "home",
            View::Login => "login",
            View::Register => "register",
            View::Recommendations => "recommendations",
            View::Admin => "admin",
            View::MovieDetail => "movie_detail",
            View::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for View {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "home" => View::Home,
            "login" => View::Login,
            "register" => View::Register,
            "recommendations" => View::Recommendations,
            "admin" => View::Admin,
            "moviedetail" | "movie_detail" | "movie-detail" => View::MovieDetail,
            _ => View::Unknown,
        })
    }
}

/// A view plus its optional parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub view: View,
    pub param: Option<MovieId>,
}

impl Default for Route {
    fn default() -> Self {
        Route::home()
    }
}

impl Route {
    pub fn home() -> Self {
        Self {
            view: View::Home,
            param: None,
        }
    }

    /// Normalises a navigation request into a resolvable route
    ///
    /// A detail view without an id falls back to Home; other views carry no parameter.
    pub fn resolve(view: View, param: Option<MovieId>) -> Self {
        match (view, param) {
            (View::MovieDetail, Some(id)) => Self {
                view,
                param: Some(id),
            },
            (View::MovieDetail, None) => Self::home(),
            (view, _) => Self { view, param: None },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    pub current: Route,
    /// Single back-navigation slot, overwritten on every actual view change
    pub previous: Route,
    pub mobile_menu_open: bool,
    /// Incremented on every navigation; renderers scroll to top when it moves
    pub scroll_resets: u64,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            current: Route::home(),
            previous: Route::home(),
            mobile_menu_open: false,
            scroll_resets: 0,
        }
    }
}

/// In-memory view navigation, no URL router
pub struct NavigationController {
    state: watch::Sender<NavigationState>,
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationController {
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(NavigationState::default());
        Self { state }
    }

    /// Moves to `view`, remembering the current route as the back target when it changes
    pub fn navigate(&self, view: View, param: Option<MovieId>) -> Route {
        let target = Route::resolve(view, param);

        self.state.send_modify(|state| {
            if state.current != target {
                state.previous = state.current;
                state.current = target;
            }
            state.mobile_menu_open = false;
            state.scroll_resets += 1;
        });

        tracing::debug!(view = %target.view, param = ?target.param, "Navigated");
        target
    }

    pub fn navigate_to(&self, route: Route) -> Route {
        self.navigate(route.view, route.param)
    }

    /// Returns to whatever the single back slot holds
    pub fn back(&self) -> Route {
        let previous = self.state.borrow().previous;
        self.navigate_to(previous)
    }

    pub fn set_mobile_menu_open(&self, open: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.mobile_menu_open != open;
            state.mobile_menu_open = open;
            changed
        });
    }

    pub fn toggle_mobile_menu(&self) {
        self.state
            .send_modify(|state| state.mobile_menu_open = !state.mobile_menu_open);
    }

    pub fn current(&self) -> Route {
        self.state.borrow().current
    }

    pub fn previous(&self) -> Route {
        self.state.borrow().previous
    }

    pub fn snapshot(&self) -> NavigationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NavigationState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let nav = NavigationController::new();
        assert_eq!(nav.current(), Route::home());
        assert_eq!(nav.previous(), Route::home());
        assert!(!nav.snapshot().mobile_menu_open);
    }

    #[test]
    fn test_previous_tracks_last_distinct_route() {
        let nav = NavigationController::new();

        nav.navigate(View::MovieDetail, Some(5));
        assert_eq!(nav.previous(), Route::home());

        nav.navigate(View::MovieDetail, Some(8));
        assert_eq!(nav.previous(), Route::resolve(View::MovieDetail, Some(5)));

        nav.navigate(View::Login, None);
        assert_eq!(nav.previous(), Route::resolve(View::MovieDetail, Some(8)));
    }

    #[test]
    fn test_same_route_does_not_overwrite_previous() {
        let nav = NavigationController::new();
        nav.navigate(View::Recommendations, None);
        nav.navigate(View::Admin, None);
        nav.navigate(View::Admin, None);

        assert_eq!(nav.current().view, View::Admin);
        assert_eq!(nav.previous().view, View::Recommendations);
    }

    #[test]
    fn test_previous_invariant_over_sequence() {
        let nav = NavigationController::new();
        let steps = [
            (View::Home, None),
            (View::MovieDetail, Some(1)),
            (View::MovieDetail, Some(1)),
            (View::Register, None),
            (View::Login, Some(99)),
            (View::Login, None),
            (View::MovieDetail, Some(2)),
            (View::Home, None),
        ];

        let mut expected_previous = Route::home();
        for (view, param) in steps {
            let before = nav.current();
            let target = nav.navigate(view, param);
            if target != before {
                expected_previous = before;
            }
            assert_eq!(nav.previous(), expected_previous);
        }
    }

    #[test]
    fn test_detail_without_id_resolves_home() {
        let nav = NavigationController::new();
        nav.navigate(View::Login, None);

        let route = nav.navigate(View::MovieDetail, None);
        assert_eq!(route, Route::home());
        assert_eq!(nav.current(), Route::home());
        assert_eq!(nav.previous().view, View::Login);
    }

    #[test]
    fn test_param_dropped_for_plain_views() {
        assert_eq!(Route::resolve(View::Home, Some(3)), Route::home());
    }

    #[test]
    fn test_navigate_closes_menu_and_resets_scroll() {
        let nav = NavigationController::new();
        nav.toggle_mobile_menu();
        assert!(nav.snapshot().mobile_menu_open);

        nav.navigate(View::Home, None);
        let state = nav.snapshot();
        assert!(!state.mobile_menu_open);
        assert_eq!(state.scroll_resets, 1);
    }

    #[test]
    fn test_back_uses_single_slot() {
        let nav = NavigationController::new();
        nav.navigate(View::Recommendations, None);
        nav.navigate(View::MovieDetail, Some(4));

        nav.back();
        assert_eq!(nav.current().view, View::Recommendations);
        assert_eq!(nav.previous(), Route::resolve(View::MovieDetail, Some(4)));

        // Going back again just swaps; there is no deeper history
        nav.back();
        assert_eq!(nav.current(), Route::resolve(View::MovieDetail, Some(4)));
    }

    #[test]
    fn test_view_from_str() {
        assert_eq!("movieDetail".parse::<View>().unwrap(), View::MovieDetail);
        assert_eq!("ADMIN".parse::<View>().unwrap(), View::Admin);
        assert_eq!("settings".parse::<View>().unwrap(), View::Unknown);
    }
}
