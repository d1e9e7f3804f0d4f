use crate::gc::{CasketClient, CasketNotification, GcError, ItemCustomization};
use crate::inventory::{Inventory, InventorySource, WebInventory};
use crate::session::{SessionEvent, SessionState};
use crate::storage::{loose_asset_ids, resolve_storage_unit, ResolveError};
use crate::vent::{establish_session, VentClient};
use std::sync::Arc;
use std::time::Duration;
use steamid_ng::SteamID;
use thiserror::Error;
use tokio::spawn;
use tokio::sync::{broadcast, Mutex};
use tokio::time::sleep;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, instrument, warn};

/// Fixed capacity of every storage unit.
pub const CASKET_CAPACITY: u32 = 1000;

/// Delay between consecutive GC calls of a transfer, to avoid flooding the
/// session.
const PACING: Duration = Duration::from_millis(500);

type Result<T, E = HelperError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HelperError {
    #[error("not logged in or no game coordinator session")]
    NotReady,
    #[error("another transfer is already in progress")]
    Busy,
    #[error("no inventory snapshot available")]
    NoInventory,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("no loose items found with name {0}")]
    NoMatchingItems(String),
    #[error("no items found in the storage unit")]
    EmptyStorageUnit,
    #[error("game coordinator call failed: {0:#}")]
    Gc(#[from] GcError),
}

struct GcContext<C> {
    client: C,
    steam_id: SteamID,
}

/// Moves items of one type in and out of named storage units.
///
/// One helper drives one account. Transfers are serialized: a second transfer
/// started while one is running aborts with [`HelperError::Busy`] instead of
/// racing the first over the inventory snapshot.
pub struct StorageHelper<C = VentClient, I = WebInventory> {
    session: Arc<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    inventory_source: I,
    context: Arc<Mutex<Option<GcContext<C>>>>,
    // latest snapshot, the lock doubles as the transfer-in-progress guard
    snapshot: Mutex<Option<Inventory>>,
}

impl StorageHelper {
    pub fn new() -> Self {
        StorageHelper::with_source(WebInventory::new())
    }
}

impl Default for StorageHelper {
    fn default() -> Self {
        StorageHelper::new()
    }
}

impl<I: InventorySource> StorageHelper<VentClient, I> {
    pub fn with_source(inventory_source: I) -> Self {
        StorageHelper {
            session: Arc::default(),
            events: broadcast::channel(16).0,
            inventory_source,
            context: Arc::default(),
            snapshot: Mutex::new(None),
        }
    }

    /// Logs into steam and connects to the CS:GO game coordinator.
    ///
    /// Returns immediately, the login flow runs in the background.
    /// [`SessionEvent::Ready`] is emitted on [`events`](StorageHelper::events)
    /// once operations can be issued, failures are logged.
    pub fn login(&self, account: &str, password: &str) {
        let account = account.to_string();
        let password = password.to_string();
        let session = Arc::clone(&self.session);
        let context = Arc::clone(&self.context);
        let events = self.events.clone();
        spawn(async move {
            match establish_session(&account, &password, &session).await {
                Ok(client) => {
                    let steam_id = client.steam_id();
                    spawn_notification_logger(client.notifications());
                    *context.lock().await = Some(GcContext { client, steam_id });
                    events.send(SessionEvent::Ready).ok();
                }
                Err(error) => error!(%error, "failed to establish session"),
            }
        });
    }
}

impl<C: CasketClient, I: InventorySource> StorageHelper<C, I> {
    /// Wraps an already established game coordinator client.
    ///
    /// The session starts out ready. Must be called from within a tokio
    /// runtime, the notification listener is spawned immediately.
    pub fn from_client(client: C, inventory_source: I, steam_id: SteamID) -> Self {
        spawn_notification_logger(client.notifications());
        let helper = StorageHelper {
            session: Arc::default(),
            events: broadcast::channel(16).0,
            inventory_source,
            context: Arc::new(Mutex::new(Some(GcContext { client, steam_id }))),
            snapshot: Mutex::new(None),
        };
        helper.session.set_logged_in();
        helper.session.set_gc_connected();
        helper
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Moves loose items with the given display name into the named storage
    /// unit.
    ///
    /// The transfer count is bound by the number of matching loose items, the
    /// remaining capacity of the unit and `max` (a max of zero is ignored).
    /// Returns the number of add requests issued. The GC sends no per-item
    /// acknowledgment for adds, delivery is only observable through the item
    /// customization notifications.
    #[instrument(skip(self))]
    pub async fn add_items(
        &self,
        unit_name: &str,
        item_name: &str,
        max: Option<u32>,
    ) -> Result<usize> {
        if !self.session.is_ready() {
            return Err(HelperError::NotReady);
        }
        let Ok(mut snapshot) = self.snapshot.try_lock() else {
            warn!("another transfer is already in progress");
            return Err(HelperError::Busy);
        };
        let context = self.context.lock().await;
        let Some(context) = context.as_ref() else {
            return Err(HelperError::NotReady);
        };

        self.refresh(&mut snapshot, context.steam_id).await;
        let Some(inventory) = snapshot.as_ref() else {
            error!("no inventory snapshot available");
            return Err(HelperError::NoInventory);
        };

        let unit = resolve_storage_unit(inventory, unit_name).map_err(|error| {
            warn!(%error, "failed to resolve storage unit");
            error
        })?;
        let matched = loose_asset_ids(inventory, item_name);
        if matched.is_empty() {
            warn!(item = item_name, "no loose items found with the given name");
            return Err(HelperError::NoMatchingItems(item_name.into()));
        }

        let capacity = CASKET_CAPACITY.saturating_sub(unit.current_quantity) as usize;
        let mut count = matched.len().min(capacity);
        if let Some(max) = max {
            if max > 0 {
                count = count.min(max as usize);
            }
        }
        debug!(
            unit = unit.id,
            matched = matched.len(),
            capacity,
            count,
            "moving items into storage unit"
        );

        for (index, asset_id) in matched[..count].iter().copied().enumerate() {
            context.client.add_to_casket(unit.id, asset_id).await?;
            if index + 1 < count {
                sleep(PACING).await;
            }
        }
        Ok(count)
    }

    /// Retrieves items from the named storage unit back into the loose
    /// inventory.
    ///
    /// The transfer count is bound by the number of stored items and `max`
    /// (a max of zero is ignored). Returns the number of remove requests
    /// issued, with the same fire-and-forget caveat as
    /// [`add_items`](StorageHelper::add_items).
    #[instrument(skip(self))]
    pub async fn retrieve_items(&self, unit_name: &str, max: Option<u32>) -> Result<usize> {
        if !self.session.is_ready() {
            return Err(HelperError::NotReady);
        }
        let Ok(mut snapshot) = self.snapshot.try_lock() else {
            warn!("another transfer is already in progress");
            return Err(HelperError::Busy);
        };
        let context = self.context.lock().await;
        let Some(context) = context.as_ref() else {
            return Err(HelperError::NotReady);
        };

        self.refresh(&mut snapshot, context.steam_id).await;
        let Some(inventory) = snapshot.as_ref() else {
            error!("no inventory snapshot available");
            return Err(HelperError::NoInventory);
        };

        let unit = resolve_storage_unit(inventory, unit_name).map_err(|error| {
            warn!(%error, "failed to resolve storage unit");
            error
        })?;
        let contents = match context.client.casket_contents(unit.id).await {
            Ok(contents) => contents,
            Err(error) => {
                error!(%error, "failed to list storage unit contents");
                Vec::new()
            }
        };
        if contents.is_empty() {
            warn!(unit = unit.id, "no items found in storage unit");
            return Err(HelperError::EmptyStorageUnit);
        }

        let mut count = contents.len();
        if let Some(max) = max {
            if max > 0 {
                count = count.min(max as usize);
            }
        }
        debug!(
            unit = unit.id,
            stored = contents.len(),
            count,
            "retrieving items from storage unit"
        );

        for (index, item_id) in contents[..count].iter().copied().enumerate() {
            context.client.remove_from_casket(unit.id, item_id).await?;
            if index + 1 < count {
                sleep(PACING).await;
            }
        }
        Ok(count)
    }

    /// Replaces the snapshot with a fresh fetch, keeping the previous one
    /// when the fetch fails.
    async fn refresh(&self, snapshot: &mut Option<Inventory>, steam_id: SteamID) {
        match self.inventory_source.fetch(steam_id).await {
            Ok(inventory) => *snapshot = Some(inventory),
            Err(error) => error!(%error, "failed to fetch inventory"),
        }
    }
}

fn spawn_notification_logger(notifications: broadcast::Receiver<ItemCustomization>) {
    spawn(async move {
        let mut notifications = BroadcastStream::new(notifications).filter_map(|res| res.ok());
        while let Some(event) = notifications.next().await {
            match event.notification {
                CasketNotification::InventoryFull => {
                    warn!(unit = ?event.item_ids.first(), "storage unit is full");
                }
                CasketNotification::ItemAdded => debug!("item added to storage unit"),
                CasketNotification::ItemRemoved => debug!("item removed from storage unit"),
                _ => {}
            }
        }
    });
}
