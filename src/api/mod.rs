pub mod client;
pub mod models;

use futures::future::BoxFuture;

pub use client::{PageClient, SurfaceError};
pub use models::SurfaceOptions;

/// The embedded page the user browses. Only navigation, readiness and the
/// current title are needed by the download flow.
pub trait PageSurface: Send + Sync {
    /// Navigate to `url`; resolves once the page is usable.
    fn load(&self, url: String) -> BoxFuture<'static, Result<(), SurfaceError>>;

    /// Evaluate the current page's title.
    ///
    /// [`PageClient`] reads the `<title>` the server sends. It runs no
    /// scripts, so a single-page app that sets `document.title` on the
    /// client reads as its static shell title. That is usually the bare
    /// site name, which the query rules reject as generic.
    fn evaluate_title(&self) -> BoxFuture<'static, Result<String, SurfaceError>>;
}
