//! Seam between the resolver and whatever answers "latest version" queries

use crate::error::Result;

/// Anything that can answer "what is the latest published version of X".
///
/// [`crate::NpmRegistry`] is the production implementation; tests inject
/// in-memory sources.
#[async_trait::async_trait]
pub trait LatestVersionSource: Send + Sync {
    /// Latest published version string for `package_name`.
    ///
    /// # Errors
    /// Returns [`crate::Error::PackageNotFound`] when the registry has no such
    /// package, or a transport error. Callers decide whether to retry using
    /// [`crate::Error::is_retryable`].
    async fn latest_version(&self, package_name: &str) -> Result<String>;

    /// Cheap reachability probe run once before a resolution stage.
    ///
    /// # Errors
    /// Returns [`crate::Error::Unreachable`] when no lookup can possibly succeed.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: LatestVersionSource + ?Sized> LatestVersionSource for std::sync::Arc<S> {
    async fn latest_version(&self, package_name: &str) -> Result<String> {
        (**self).latest_version(package_name).await
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }
}
