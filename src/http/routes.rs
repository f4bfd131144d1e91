use crate::app::AppContext;
use axum::Router;

/// A group of routes mounted into the [`App`](crate::App) router
///
/// Handlers reach shared state through `State<AppContext>`; state is applied
/// once by the App, so modules return an unstated `Router<AppContext>`.
///
/// # Example
///
/// ```ignore
/// struct LedgerAdminModule;
///
/// impl RouteModule for LedgerAdminModule {
///     fn routes(&self) -> Router<AppContext> {
///         Router::new().route("/intents/:external_id", get(list_intents))
///     }
///
///     fn prefix(&self) -> Option<&str> {
///         Some("/admin")
///     }
/// }
/// ```
pub trait RouteModule {
    fn routes(&self) -> Router<AppContext>
    where
        Self: Sized;

    /// Path prefix to nest the routes under
    fn prefix(&self) -> Option<&str> {
        None
    }

    /// Merge (or nest, when a prefix is set) this module into `router`
    fn register(self, router: Router<AppContext>) -> Router<AppContext>
    where
        Self: Sized,
    {
        let routes = self.routes();

        match self.prefix() {
            Some(prefix) => router.nest(prefix, routes),
            None => router.merge(routes),
        }
    }
}
