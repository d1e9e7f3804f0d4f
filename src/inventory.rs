use crate::CSGO_APP_ID;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use std::future::Future;
use steamid_ng::SteamID;
use thiserror::Error;
use tracing::debug;

/// The community inventory endpoint returns at most this many items per request.
///
/// Inventories larger than this are truncated, items past the first page are
/// never considered.
pub const INVENTORY_PAGE_SIZE: u32 = 1000;

const CSGO_CONTEXT_ID: u32 = 2;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InventoryError {
    #[error("failed to send inventory request: {0:#}")]
    Network(#[from] reqwest::Error),
    #[error("inventory request returned status {0}")]
    Status(StatusCode),
    #[error("malformed inventory body: {0:#}")]
    Malformed(#[from] serde_json::Error),
}

/// A wholesale copy of the remote inventory, replaced on every refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct Inventory {
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub descriptions: Vec<ItemDescription>,
}

/// One concrete item instance in the inventory.
///
/// An asset carrying a `casket_id` currently sits inside a storage unit.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    #[serde(rename = "assetid", deserialize_with = "id_from_string")]
    pub asset_id: u64,
    #[serde(rename = "classid")]
    pub class_id: String,
    #[serde(default)]
    pub casket_id: Option<String>,
}

/// The shared template data referenced by all assets of the same class id.
///
/// The inventory service repurposes two free-text fields: the first fraud
/// warning of a storage unit carries its user-assigned name tag, and the third
/// description line carries its current item count.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemDescription {
    #[serde(rename = "classid")]
    pub class_id: String,
    pub name: String,
    #[serde(rename = "fraudwarnings", default)]
    pub fraud_warnings: Vec<String>,
    #[serde(default)]
    pub descriptions: Vec<DescriptionLine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptionLine {
    #[serde(default)]
    pub value: String,
}

fn id_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// Source of inventory snapshots for an account.
pub trait InventorySource {
    fn fetch(
        &self,
        steam_id: SteamID,
    ) -> impl Future<Output = Result<Inventory, InventoryError>> + Send;
}

/// Fetches inventories from the public community endpoint.
///
/// A single GET per refresh, no retry and only the transport's default
/// timeouts. See [`INVENTORY_PAGE_SIZE`] for the pagination limitation.
#[derive(Debug, Clone, Default)]
pub struct WebInventory {
    client: Client,
}

impl WebInventory {
    pub fn new() -> Self {
        WebInventory::default()
    }

    pub fn with_client(client: Client) -> Self {
        WebInventory { client }
    }
}

impl InventorySource for WebInventory {
    async fn fetch(&self, steam_id: SteamID) -> Result<Inventory, InventoryError> {
        let url = format!(
            "https://steamcommunity.com/inventory/{}/{}/{}?l=english&count={}",
            u64::from(steam_id),
            CSGO_APP_ID,
            CSGO_CONTEXT_ID,
            INVENTORY_PAGE_SIZE
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(InventoryError::Status(response.status()));
        }
        let body = response.text().await?;
        let inventory: Inventory = serde_json::from_str(&body)?;
        debug!(
            assets = inventory.assets.len(),
            descriptions = inventory.descriptions.len(),
            "fetched inventory"
        );
        Ok(inventory)
    }
}
