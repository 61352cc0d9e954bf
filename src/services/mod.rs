pub mod catalog;
pub mod navigation;
pub mod notifications;
pub mod pagination;
pub mod session;
pub mod transport;

pub use catalog::{CatalogApi, MovieFilter};
pub use navigation::{NavigationController, NavigationState, Route, View};
pub use notifications::{Notification, NotificationKind, Notifier};
pub use pagination::{CatalogSource, MovieQuery, MovieSource, QueryState, QueryStatus};
pub use session::{Readiness, SessionManager, SessionSnapshot};
pub use transport::{HttpTransport, RequestBody, RequestOptions, Transport};
