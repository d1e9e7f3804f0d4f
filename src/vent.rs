use crate::gc::{CasketClient, CasketNotification, GcError, ItemCustomization};
use crate::session::SessionState;
use crate::CSGO_APP_ID;
use protobuf::Message;
use std::fmt::{Debug, Formatter};
use std::io::{Cursor, Read, Write};
use std::pin::pin;
use std::time::Duration;
use steam_vent::auth::{
    AuthConfirmationHandler, ConsoleAuthConfirmationHandler, DeviceConfirmationHandler,
    FileGuardDataStore,
};
use steam_vent::{
    Connection, ConnectionError, ConnectionTrait, GameCoordinator, NetworkError,
    ServerDiscoveryError, ServerList,
};
use steam_vent_proto::csgo::base_gcmessages::CSOEconItem;
use steam_vent_proto::csgo::econ_gcmessages::{
    CMsgCasketItem, CMsgGCItemCustomizationNotification, EGCItemMsg,
};
use steam_vent_proto::csgo::gcsdk_gcmessages::CMsgSOCacheSubscribed;
use steam_vent_proto::{RpcMessage, RpcMessageWithKind};
use steamid_ng::SteamID;
use thiserror::Error;
use tokio::spawn;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_stream::StreamExt;
use tracing::{debug, info};

/// Shared object type id of econ items within a cache subscription.
const ITEM_TYPE_ID: i32 = 1;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectError {
    #[error(transparent)]
    Discovery(#[from] ServerDiscoveryError),
    #[error("failed to log into steam: {0:#}")]
    Login(#[from] ConnectionError),
    #[error("failed to establish the game coordinator session: {0:#}")]
    GameCoordinator(#[from] NetworkError),
}

/// [`CasketClient`] backed by a steam-vent game coordinator session.
pub struct VentClient {
    gc: GameCoordinator,
    // keeps the underlying connection (and its heartbeat) alive for as long
    // as the client exists
    connection: Connection,
    notifications: broadcast::Sender<ItemCustomization>,
    timeout: Duration,
}

impl Debug for VentClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VentClient").finish_non_exhaustive()
    }
}

impl VentClient {
    /// Starts playing CS:GO on the connected account and performs the GC
    /// handshake.
    pub async fn new(connection: &Connection) -> Result<Self, NetworkError> {
        let gc = GameCoordinator::new(connection, CSGO_APP_ID).await?;

        let (tx, _) = broadcast::channel(16);
        let sender = tx.clone();
        let customizations = gc.on::<CMsgGCItemCustomizationNotification>();
        spawn(async move {
            let mut customizations = pin!(customizations);
            while let Some(customization) = customizations.next().await {
                if let Ok(customization) = customization {
                    let notification = CasketNotification::from_request(customization.request());
                    debug!(
                        ?notification,
                        item_ids = ?customization.item_id,
                        "received item customization notification"
                    );
                    sender
                        .send(ItemCustomization {
                            item_ids: customization.item_id,
                            notification,
                        })
                        .ok();
                }
            }
        });

        Ok(VentClient {
            gc,
            connection: connection.clone(),
            notifications: tx,
            timeout: Duration::from_secs(10),
        })
    }

    pub fn steam_id(&self) -> SteamID {
        self.connection.steam_id()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

/// Logs into steam and brings up a CS:GO GC session, flipping the session
/// flags as each stage completes.
pub(crate) async fn establish_session(
    account: &str,
    password: &str,
    session: &SessionState,
) -> Result<VentClient, ConnectError> {
    let server_list = ServerList::discover().await?;
    let connection = Connection::login(
        &server_list,
        account,
        password,
        FileGuardDataStore::user_cache(),
        ConsoleAuthConfirmationHandler::default().or(DeviceConfirmationHandler),
    )
    .await?;
    info!(account, "logged into steam");
    session.set_logged_in();

    let client = VentClient::new(&connection).await?;
    session.set_gc_connected();
    info!("connected to the game coordinator");
    Ok(client)
}

impl CasketClient for VentClient {
    async fn add_to_casket(&self, casket_id: u64, item_id: u64) -> Result<(), GcError> {
        debug!(casket_id, item_id, "sending casket add");
        self.gc
            .send(CasketItemMessage::new(casket_id, item_id))
            .await?;
        Ok(())
    }

    async fn remove_from_casket(&self, casket_id: u64, item_id: u64) -> Result<(), GcError> {
        debug!(casket_id, item_id, "sending casket extract");
        self.gc
            .send_with_kind(
                CasketItemMessage::new(casket_id, item_id),
                EGCItemMsg::k_EMsgGCCasketItemExtract,
            )
            .await?;
        Ok(())
    }

    async fn casket_contents(&self, casket_id: u64) -> Result<Vec<u64>, GcError> {
        // the GC answers the load request by subscribing us to the casket's
        // own item cache
        let subscription = self.gc.one::<CMsgSOCacheSubscribed>();
        self.gc
            .send_with_kind(
                CasketItemMessage::for_casket(casket_id),
                EGCItemMsg::k_EMsgGCCasketItemLoadContents,
            )
            .await?;
        let cache = timeout(self.timeout, subscription)
            .await
            .map_err(|_| GcError::Timeout)??;

        let mut contents = Vec::new();
        for object in cache.objects.iter() {
            if object.type_id() == ITEM_TYPE_ID {
                for object_data in object.object_data.iter() {
                    if let Ok(item) = CSOEconItem::parse(&mut Cursor::new(object_data)) {
                        contents.push(item.id());
                    }
                }
            }
        }
        debug!(casket_id, items = contents.len(), "loaded casket contents");
        Ok(contents)
    }

    fn notifications(&self) -> broadcast::Receiver<ItemCustomization> {
        self.notifications.subscribe()
    }
}

/// `CMsgCasketItem` is shared between the add, extract and load-contents
/// operations. The wrapper carries the add kind, the other two are sent with
/// an explicit kind override.
#[derive(Debug)]
struct CasketItemMessage(CMsgCasketItem);

impl CasketItemMessage {
    fn new(casket_id: u64, item_id: u64) -> Self {
        CasketItemMessage(CMsgCasketItem {
            casket_item_id: Some(casket_id),
            item_item_id: Some(item_id),
            ..CMsgCasketItem::default()
        })
    }

    fn for_casket(casket_id: u64) -> Self {
        CasketItemMessage(CMsgCasketItem {
            casket_item_id: Some(casket_id),
            ..CMsgCasketItem::default()
        })
    }
}

impl RpcMessage for CasketItemMessage {
    fn parse(reader: &mut dyn Read) -> protobuf::Result<Self> {
        let data = <CMsgCasketItem as Message>::parse_from_reader(reader)?;
        Ok(CasketItemMessage(data))
    }

    fn write(&self, writer: &mut dyn Write) -> protobuf::Result<()> {
        self.0.write_to_writer(writer)
    }

    fn encode_size(&self) -> usize {
        self.0.compute_size() as usize
    }
}

impl RpcMessageWithKind for CasketItemMessage {
    type KindEnum = EGCItemMsg;
    const KIND: Self::KindEnum = EGCItemMsg::k_EMsgGCCasketItemAdd;
}
