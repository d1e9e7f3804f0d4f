mod gc;
mod helper;
mod inventory;
mod session;
mod storage;
mod vent;

/// Steam app id of CS:GO.
pub const CSGO_APP_ID: u32 = 730;

pub use gc::{CasketClient, CasketNotification, GcError, ItemCustomization};
pub use helper::{HelperError, StorageHelper, CASKET_CAPACITY};
pub use inventory::{
    Asset, DescriptionLine, Inventory, InventoryError, InventorySource, ItemDescription,
    WebInventory, INVENTORY_PAGE_SIZE,
};
pub use session::SessionEvent;
pub use storage::{loose_asset_ids, resolve_storage_unit, ResolveError, StorageUnit};
pub use vent::{ConnectError, VentClient};
