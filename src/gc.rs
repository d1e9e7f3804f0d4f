use std::future::Future;
use steam_vent::NetworkError;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GcError {
    #[error("network error: {0:#}")]
    Network(#[from] NetworkError),
    #[error("timed out waiting for the game coordinator")]
    Timeout,
}

/// Item customization events pushed by the game coordinator.
///
/// Only the casket related requests are mapped, everything else passes through
/// as [`CasketNotification::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasketNotification {
    TooFull,
    /// Contents of a casket have been loaded into the session's item cache.
    Contents,
    ItemAdded,
    ItemRemoved,
    /// The casket's inventory is full, nothing more can be added to it.
    InventoryFull,
    Other(u32),
}

impl CasketNotification {
    pub fn from_request(request: u32) -> Self {
        match request {
            1011 => CasketNotification::TooFull,
            1012 => CasketNotification::Contents,
            1013 => CasketNotification::ItemAdded,
            1014 => CasketNotification::ItemRemoved,
            1015 => CasketNotification::InventoryFull,
            other => CasketNotification::Other(other),
        }
    }
}

/// One item customization notification with the item ids it applies to.
///
/// For casket events the first id names the casket or the moved item,
/// depending on the request.
#[derive(Debug, Clone)]
pub struct ItemCustomization {
    pub item_ids: Vec<u64>,
    pub notification: CasketNotification,
}

/// The casket capabilities of the external game coordinator client.
///
/// `add_to_casket` and `remove_from_casket` are fire-and-forget: the GC sends
/// no acknowledgment for them, success is only observable through the item
/// customization notifications.
pub trait CasketClient {
    fn add_to_casket(
        &self,
        casket_id: u64,
        item_id: u64,
    ) -> impl Future<Output = Result<(), GcError>> + Send;

    fn remove_from_casket(
        &self,
        casket_id: u64,
        item_id: u64,
    ) -> impl Future<Output = Result<(), GcError>> + Send;

    /// Requests the asset ids currently stored inside the casket, waiting for
    /// the game coordinator to answer.
    fn casket_contents(
        &self,
        casket_id: u64,
    ) -> impl Future<Output = Result<Vec<u64>, GcError>> + Send;

    /// Subscribe to the item customization notifications of this session.
    fn notifications(&self) -> broadcast::Receiver<ItemCustomization>;
}
