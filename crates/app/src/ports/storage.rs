//! Storage port — repository trait for chamber persistence.

use std::future::Future;

use fermhub_domain::chamber::Chamber;
use fermhub_domain::error::FermHubError;
use fermhub_domain::id::ChamberId;

/// Persistent store of chamber definitions.
///
/// The store is assumed to be single-writer safe; the chamber manager
/// serializes every write anyway.
pub trait ChamberRepository: Send + Sync {
    /// Load every stored chamber.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Chamber>, FermHubError>> + Send;

    /// Load one chamber, `None` when it does not exist.
    fn get_by_id(
        &self,
        id: ChamberId,
    ) -> impl Future<Output = Result<Option<Chamber>, FermHubError>> + Send;

    /// Insert or replace a chamber, keyed by its id.
    fn save(&self, chamber: Chamber) -> impl Future<Output = Result<Chamber, FermHubError>> + Send;

    /// Remove a chamber. Removing a missing chamber is not an error.
    fn delete(&self, id: ChamberId) -> impl Future<Output = Result<(), FermHubError>> + Send;
}

impl<T: ChamberRepository> ChamberRepository for std::sync::Arc<T> {
    fn get_all(&self) -> impl Future<Output = Result<Vec<Chamber>, FermHubError>> + Send {
        (**self).get_all()
    }

    fn get_by_id(
        &self,
        id: ChamberId,
    ) -> impl Future<Output = Result<Option<Chamber>, FermHubError>> + Send {
        (**self).get_by_id(id)
    }

    fn save(&self, chamber: Chamber) -> impl Future<Output = Result<Chamber, FermHubError>> + Send {
        (**self).save(chamber)
    }

    fn delete(&self, id: ChamberId) -> impl Future<Output = Result<(), FermHubError>> + Send {
        (**self).delete(id)
    }
}
