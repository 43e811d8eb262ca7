// sync/mod.rs
//
// Shadow state synchronizer: reconciles the locally desired light state
// against the device's reported state, from the startup snapshot and from
// live subscription messages, and turns user toggles into desired-state
// commands. The disabled control is the only concurrency guard; there is at
// most one in-flight desired-state transaction.
use std::sync::{Arc, Mutex};

use metrics::counter;
use tracing::{debug, error, info, warn};

use crate::models::{LightState, QoS, ShadowDocument};
use crate::panel::Panel;
use crate::session::Session;
use crate::shadow::InitialState;

/// Narrow publish capability the synchronizer holds. It can send one command
/// document; it cannot touch the connection otherwise.
pub trait CommandSink: Send + Sync {
    fn publish_desired(&self, topic: &str, document: ShadowDocument);
}

impl CommandSink for Session {
    fn publish_desired(&self, topic: &str, document: ShadowDocument) {
        match serde_json::to_value(&document) {
            Ok(payload) => self.publish(topic, payload, QoS::AtLeastOnce),
            Err(e) => error!("Error encoding command document: {e}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Synced { reported: LightState },
    AwaitingAck { desired: LightState },
}

struct Inner {
    state: SyncState,
    /// Pre-computed target of the next toggle: the inverse of the last
    /// reported value seen from the cloud.
    next_toggle: Option<LightState>,
    subscribed: bool,
    enabled: bool,
    /// Set once any live message delivered a reported value; from then on
    /// the startup snapshot is stale and must not overwrite it.
    seen_live_message: bool,
}

/// Session context for one panel run. Created at startup, dropped on exit;
/// replaces the ambient module-level state of older panel builds.
pub struct Synchronizer {
    inner: Mutex<Inner>,
    sink: Arc<dyn CommandSink>,
    panel: Arc<dyn Panel>,
    publish_topic: String,
}

impl Synchronizer {
    pub fn new(sink: Arc<dyn CommandSink>, panel: Arc<dyn Panel>, publish_topic: String) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SyncState::Uninitialized,
                next_toggle: None,
                subscribed: false,
                enabled: false,
                seen_live_message: false,
            }),
            sink,
            panel,
            publish_topic,
        }
    }

    /// Applies the startup snapshot. A reported value that already arrived
    /// over the subscription wins over the snapshot value.
    pub fn handle_snapshot(&self, initial: InitialState) {
        let mut inner = self.lock();
        if inner.seen_live_message {
            debug!("Snapshot superseded by a live shadow message");
        } else {
            inner.state = SyncState::Synced {
                reported: initial.reported,
            };
            inner.next_toggle = Some(initial.desired);
            self.panel.render(initial.reported);
        }
        self.refresh_enabled(&mut inner);
    }

    /// Marks the `<topic>/accepted` subscription as live. The control only
    /// becomes usable once both a reported value and this ack are in,
    /// whichever lands last.
    pub fn handle_subscribed(&self) {
        let mut inner = self.lock();
        inner.subscribed = true;
        self.refresh_enabled(&mut inner);
    }

    /// User toggle. Ignored while the control is disabled; that disabled
    /// flag is the sole guard against a second in-flight command.
    pub fn handle_toggle(&self) {
        let command = {
            let mut inner = self.lock();
            if !inner.enabled {
                debug!("Toggle ignored, control disabled");
                return;
            }
            let Some(desired) = inner.next_toggle else {
                return;
            };
            inner.state = SyncState::AwaitingAck { desired };
            inner.enabled = false;
            self.panel.set_enabled(false);
            ShadowDocument::desired_update(desired)
        };
        // Published outside the lock: the loopback transport delivers the
        // acceptance synchronously on this call stack.
        info!(topic = %self.publish_topic, "Publishing desired state");
        self.sink.publish_desired(&self.publish_topic, command);
    }

    /// Inbound message on the accepted topic. Last message wins, with no
    /// sequence reconciliation; duplicates are harmless because the
    /// transition is idempotent. Documents without `state.reported` cause
    /// no transition. The `/rejected` channel is never routed here.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) {
        counter!("panel_messages_received_total").increment(1);
        let doc: ShadowDocument = match serde_json::from_slice(payload) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(%topic, "Ignoring unparseable shadow message: {e}");
                return;
            }
        };
        let Some(reported) = doc.reported_status() else {
            debug!(%topic, "Shadow message without reported state, ignoring");
            return;
        };

        let mut inner = self.lock();
        inner.seen_live_message = true;
        inner.state = SyncState::Synced { reported };
        inner.next_toggle = Some(reported.inverse());
        self.panel.render(reported);
        self.refresh_enabled(&mut inner);
    }

    pub fn state(&self) -> SyncState {
        self.lock().state
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    fn refresh_enabled(&self, inner: &mut Inner) {
        let usable = inner.subscribed && matches!(inner.state, SyncState::Synced { .. });
        if usable != inner.enabled {
            inner.enabled = usable;
            self.panel.set_enabled(usable);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Callbacks never hold this across a publish, so poisoning is the
        // only way this fails.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
