use ipc_channel::ipc::{IpcReceiver, IpcSender};
use serde::{Deserialize, Serialize};

use crate::keys::{Key, KeySequence, Modifiers};
use crate::registry::{MatchType, ShortcutEvent, ShortcutInfo};
use crate::service::{ActionId, ServiceError, SetKeysFlags, ShortcutsChanged};
use crate::session::{
    Delta, DeviceType, PointerAxisDirection, PointerButtons, SessionEvent, SessionTrigger,
};

/// Calls a client can make on the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrokerRequest {
    AllMainComponents,
    AllActionsForComponent(ActionId),
    ActionList(KeySequence),
    ShortcutKeys(ActionId),
    DefaultShortcutKeys(ActionId),
    SetShortcutKeys {
        action: ActionId,
        keys: Vec<KeySequence>,
        flags: SetKeysFlags,
    },
    SetForeignShortcutKeys {
        action: ActionId,
        keys: Vec<KeySequence>,
    },
    GlobalShortcutsByKey {
        key: KeySequence,
        match_type: MatchType,
    },
    IsGlobalShortcutAvailable {
        key: KeySequence,
        component: String,
    },
    BlockGlobalShortcuts(bool),
    DoRegister(ActionId),
    Unregister {
        component: String,
        action: String,
    },
    SetInactive(ActionId),
    ActivateGlobalShortcutContext {
        component: String,
        context: String,
    },
    GetComponent(String),
    ShortcutNames {
        component: String,
        context: String,
    },
    AllShortcutInfos {
        component: String,
        context: String,
    },
    ContextNames(String),
    InvokeShortcut {
        component: String,
        action: String,
        context: String,
    },
    CleanUp(String),
    IsActive(String),

    /// Input forwarded by the compositor; the reply says whether it was consumed
    KeyPressed {
        modifiers: Modifiers,
        key: Key,
        timestamp: u64,
    },
    KeyReleased {
        modifiers: Modifiers,
        key: Key,
        timestamp: u64,
    },
    PointerPressed {
        modifiers: Modifiers,
        buttons: PointerButtons,
    },
    Axis {
        modifiers: Modifiers,
        direction: PointerAxisDirection,
    },
    SwipeStart {
        device: DeviceType,
        finger_count: u32,
    },
    SwipeUpdate {
        device: DeviceType,
        delta: Delta,
    },
    SwipeCancel(DeviceType),
    SwipeEnd(DeviceType),
    PinchStart {
        finger_count: u32,
    },
    PinchUpdate {
        scale: f64,
        angle_delta: f64,
        delta: Delta,
    },
    PinchCancel,
    PinchEnd,

    RegisterSessionShortcut {
        name: String,
        trigger: SessionTrigger,
        realtime: bool,
    },
    RemoveSessionShortcut(String),
}

/// Answer to a [`BrokerRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrokerReply {
    Done,
    Bool(bool),
    Keys(Vec<KeySequence>),
    Action(Option<ActionId>),
    Actions(Vec<ActionId>),
    Infos(Vec<ShortcutInfo>),
    Names(Vec<String>),
    ObjectPath(String),
    Error(ServiceError),
}

/// Messages sent from a client to the broker
#[derive(Debug, Serialize, Deserialize)]
pub enum ClientMessage {
    /// A request and the channel its reply goes to
    Call(BrokerRequest, IpcSender<BrokerReply>),
    /// Flush pending writes and exit
    Shutdown,
}

/// Messages sent from the broker to its client
#[derive(Debug, Serialize, Deserialize)]
pub enum BrokerMessage {
    Shortcut(ShortcutEvent),
    ShortcutsChanged(ShortcutsChanged),
    Session(SessionEvent),
    /// Broker encountered an error
    Error(String),
}

/// The bootstrap payload sent over the initial server channel.
/// Contains the channel for sending calls and the channel for receiving notifications.
pub type BootstrapMessage = (IpcSender<ClientMessage>, IpcReceiver<BrokerMessage>);
