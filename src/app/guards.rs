use tokio::task::JoinHandle;

use crate::services::{navigation::View, session::Readiness};

use super::AppState;

/// Outcome of one guard pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect { to: View, message: &'static str },
}

/// Route guard as a pure function of the view and session facts
pub fn evaluate(view: View, is_authenticated: bool, is_admin: bool, readiness: Readiness) -> GuardDecision {
    if readiness == Readiness::Initializing {
        return GuardDecision::Allow;
    }

    match view {
        View::Recommendations if !is_authenticated => GuardDecision::Redirect {
            to: View::Login,
            message: "Please log in to see recommendations.",
        },
        View::Admin if !is_authenticated => GuardDecision::Redirect {
            to: View::Login,
            message: "Please log in to access the admin panel.",
        },
        View::Admin if !is_admin => GuardDecision::Redirect {
            to: View::Home,
            message: "You do not have permission to access the admin page.",
        },
        _ => GuardDecision::Allow,
    }
}

impl AppState {
    /// Runs one guard pass against the current session and navigation state
    pub fn enforce_guards(&self) -> GuardDecision {
        let session = self.session.snapshot();
        let view = self.navigation.current().view;

        let decision = evaluate(
            view,
            session.is_authenticated(),
            session.is_admin,
            session.readiness,
        );

        if let GuardDecision::Redirect { to, message } = decision {
            tracing::info!(from = %view, to = %to, "Route guard redirect");
            self.notifier.error(message);
            self.navigation.navigate(to, None);
        }
        decision
    }

    /// Re-evaluates guards whenever session or navigation state changes
    ///
    /// Session state can change after a view was entered (late revalidation),
    /// so guards are driven by subscriptions rather than by `navigate` calls.
    pub fn spawn_guard_watcher(&self) -> JoinHandle<()> {
        let state = self.clone();
        let mut session_rx = self.session.subscribe();
        let mut navigation_rx = self.navigation.subscribe();

        tokio::spawn(async move {
            state.enforce_guards();

            loop {
                tokio::select! {
                    changed = session_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = navigation_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                state.enforce_guards();
            }
            tracing::debug!("Guard watcher stopped");
        })
    }
}
