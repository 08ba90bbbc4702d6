//! The bridge task between a [`Store`] and the external debugger.
//!
//! Outbound, every successful publish is mirrored as an action
//! descriptor plus the resulting state snapshot. Inbound commands are
//! handled one at a time in arrival order; a failing command is logged
//! and never takes the bridge down.

use std::sync::Arc;

use log::Level;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use fluxor_store::{DispatchEvent, LogDefinitions, LogType, Store, StoreError, StoreState};

use crate::protocol::{DevToolsMessage, DispatchPayload, OutboundAction};

/// The external debugger as the store sees it: a peer that can be
/// re-baselined (`init`) and receives mirrored dispatches (`send`).
/// Transport (websocket, extension port, test fake) is up to the
/// implementation.
pub trait DevToolsConnector: Send + Sync {
    /// Re-baseline the debugger's recorded history to `state`.
    fn init(&self, state: Value);

    /// Mirror a dispatched action and the state it produced.
    fn send(&self, action: OutboundAction, state: Value);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DevToolsOptions {
    /// Skip bridge setup entirely.
    pub disable: bool,
}

/// Wire the bridge up unless disabled. Returns the bridge task handle.
pub fn setup<T>(
    store: Store<T>,
    connector: Arc<dyn DevToolsConnector>,
    inbound: mpsc::UnboundedReceiver<DevToolsMessage>,
    options: DevToolsOptions,
    log_definitions: LogDefinitions,
) -> Option<JoinHandle<()>>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    let level = log_definitions.level(LogType::DevToolsStatus, Level::Debug);
    if options.disable {
        log::log!(level, "DevTools bridge disabled by configuration");
        return None;
    }
    log::log!(level, "DevTools bridge starting");
    Some(DevToolsBridge::new(store, connector, log_definitions).spawn(inbound))
}

pub struct DevToolsBridge<T> {
    store: Store<T>,
    connector: Arc<dyn DevToolsConnector>,
    log_definitions: LogDefinitions,
}

impl<T> DevToolsBridge<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    pub fn new(
        store: Store<T>,
        connector: Arc<dyn DevToolsConnector>,
        log_definitions: LogDefinitions,
    ) -> Self {
        Self {
            store,
            connector,
            log_definitions,
        }
    }

    /// Start the bridge: re-baseline the debugger to the store's
    /// initial state, then pump mirrored dispatches out and remote
    /// commands in until either side goes away.
    pub fn spawn(self, mut inbound: mpsc::UnboundedReceiver<DevToolsMessage>) -> JoinHandle<()> {
        let level = self
            .log_definitions
            .level(LogType::DevToolsStatus, Level::Debug);
        let mut events = self.store.subscribe_dispatches();

        match serde_json::to_value(&self.store.initial_state()) {
            Ok(snapshot) => self.connector.init(snapshot),
            Err(e) => log::warn!("failed to serialize initial state for DevTools: {e}"),
        }

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(event) => self.mirror(event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            log::warn!("DevTools bridge lagged, skipped {skipped} dispatch events");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    message = inbound.recv() => match message {
                        Some(message) => {
                            log::log!(level, "DevTools sent change {message:?}");
                            if let Err(e) = self.handle_message(message).await {
                                log::log!(level, "DevTools command failed: {e}");
                            }
                        }
                        None => break,
                    },
                }
            }
            log::log!(level, "DevTools bridge stopping");
        })
    }

    fn mirror(&self, event: DispatchEvent<T>) {
        match serde_json::to_value(&event.state) {
            Ok(snapshot) => self.connector.send(
                OutboundAction {
                    kind: event.name,
                    params: event.params,
                },
                snapshot,
            ),
            Err(e) => log::warn!("failed to serialize state for DevTools: {e}"),
        }
    }

    /// Apply one remote command. Public so embedders driving their own
    /// message loop can reuse the command semantics.
    pub async fn handle_message(&self, message: DevToolsMessage) -> Result<(), StoreError> {
        match message {
            DevToolsMessage::Action { payload } => {
                if !self.store.is_action_registered(payload.name.as_str()) {
                    return Err(StoreError::UnregisteredAction(payload.name));
                }
                if payload.args.is_empty() {
                    return Err(StoreError::MissingArguments(
                        "no action arguments provided".to_string(),
                    ));
                }
                // args[0] is the debugger's state placeholder
                let params = payload.args[1..]
                    .iter()
                    .map(|arg| serde_json::from_str(arg))
                    .collect::<Result<Vec<Value>, _>>()?;
                self.store.dispatch(payload.name.as_str(), params).await
            }
            DevToolsMessage::Dispatch { payload, state } => match payload {
                DispatchPayload::JumpToState | DispatchPayload::JumpToAction => {
                    let snapshot = parse_snapshot::<T>(state)?;
                    self.store.reset_to_state(snapshot);
                    Ok(())
                }
                DispatchPayload::Commit => {
                    self.connector
                        .init(serde_json::to_value(&self.store.current_state())?);
                    Ok(())
                }
                DispatchPayload::Reset => {
                    let initial = self.store.initial_state();
                    self.connector.init(serde_json::to_value(&initial)?);
                    self.store.reset_to_state(initial);
                    Ok(())
                }
                DispatchPayload::Rollback => {
                    let snapshot = parse_snapshot::<T>(state)?;
                    self.connector.init(serde_json::to_value(&snapshot)?);
                    self.store.reset_to_state(snapshot);
                    Ok(())
                }
            },
        }
    }
}

fn parse_snapshot<T: DeserializeOwned>(
    state: Option<String>,
) -> Result<StoreState<T>, StoreError> {
    let raw = state.ok_or_else(|| {
        StoreError::MissingArguments("command requires a state snapshot".to_string())
    })?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ActionPayload;
    use fluxor_store::{FnReducer, ReducerOutcome, StoreOptions};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: i64,
    }

    #[derive(Default)]
    struct MockConnector {
        inits: Mutex<Vec<Value>>,
        sent: Mutex<Vec<(OutboundAction, Value)>>,
    }

    impl MockConnector {
        fn inits(&self) -> Vec<Value> {
            self.inits.lock().unwrap().clone()
        }

        fn sent(&self) -> Vec<(OutboundAction, Value)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl DevToolsConnector for MockConnector {
        fn init(&self, state: Value) {
            self.inits.lock().unwrap().push(state);
        }

        fn send(&self, action: OutboundAction, state: Value) {
            self.sent.lock().unwrap().push((action, state));
        }
    }

    fn counter_store() -> Store<Counter> {
        let store = Store::new(StoreOptions::new(Counter { count: 0 }));
        store
            .register_action(
                "add",
                FnReducer::new(2, |state: StoreState<Counter>, params: &[Value]| {
                    let amount = params
                        .first()
                        .and_then(Value::as_i64)
                        .ok_or_else(|| anyhow::anyhow!("add expects a number"))?;
                    Ok(ReducerOutcome::Continue(state.update(|c| Counter {
                        count: c.count + amount,
                    })))
                }),
            )
            .unwrap();
        store
    }

    fn bridge(store: &Store<Counter>) -> (DevToolsBridge<Counter>, Arc<MockConnector>) {
        let connector = Arc::new(MockConnector::default());
        let bridge = DevToolsBridge::new(
            store.clone(),
            connector.clone(),
            LogDefinitions::default(),
        );
        (bridge, connector)
    }

    #[tokio::test]
    async fn remote_action_replays_through_the_dispatch_path() {
        let store = counter_store();
        let (bridge, _connector) = bridge(&store);

        bridge
            .handle_message(DevToolsMessage::Action {
                payload: ActionPayload {
                    name: "add".to_string(),
                    args: vec!["{}".to_string(), "5".to_string()],
                },
            })
            .await
            .unwrap();

        assert_eq!(store.current_state().present().count, 5);
    }

    #[tokio::test]
    async fn remote_action_without_arguments_is_rejected() {
        let store = counter_store();
        let (bridge, _connector) = bridge(&store);

        let err = bridge
            .handle_message(DevToolsMessage::Action {
                payload: ActionPayload {
                    name: "add".to_string(),
                    args: vec![],
                },
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::MissingArguments(_)));
        assert_eq!(store.current_state().present().count, 0);
    }

    #[tokio::test]
    async fn remote_action_with_unknown_name_is_rejected() {
        let store = counter_store();
        let (bridge, _connector) = bridge(&store);

        let err = bridge
            .handle_message(DevToolsMessage::Action {
                payload: ActionPayload {
                    name: "nope".to_string(),
                    args: vec!["{}".to_string()],
                },
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::UnregisteredAction(_)));
    }

    #[tokio::test]
    async fn malformed_remote_arguments_are_rejected() {
        let store = counter_store();
        let (bridge, _connector) = bridge(&store);

        let err = bridge
            .handle_message(DevToolsMessage::Action {
                payload: ActionPayload {
                    name: "add".to_string(),
                    args: vec!["{}".to_string(), "not json".to_string()],
                },
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::MalformedPayload(_)));
        assert_eq!(store.current_state().present().count, 0);
    }

    #[tokio::test]
    async fn jump_to_state_replaces_the_current_state_directly() {
        let store = counter_store();
        let (bridge, _connector) = bridge(&store);

        bridge
            .handle_message(DevToolsMessage::Dispatch {
                payload: DispatchPayload::JumpToState,
                state: Some("{\"count\":7}".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(store.current_state().present().count, 7);
    }

    #[tokio::test]
    async fn jump_without_a_snapshot_is_rejected() {
        let store = counter_store();
        let (bridge, _connector) = bridge(&store);

        let err = bridge
            .handle_message(DevToolsMessage::Dispatch {
                payload: DispatchPayload::JumpToAction,
                state: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::MissingArguments(_)));
    }

    #[tokio::test]
    async fn commit_rebaselines_to_the_current_state() {
        let store = counter_store();
        store.dispatch("add", vec![json!(3)]).await.unwrap();
        let (bridge, connector) = bridge(&store);

        bridge
            .handle_message(DevToolsMessage::Dispatch {
                payload: DispatchPayload::Commit,
                state: None,
            })
            .await
            .unwrap();

        assert_eq!(connector.inits(), vec![json!({ "count": 3 })]);
    }

    #[tokio::test]
    async fn reset_restores_the_initial_state_and_rebaselines() {
        let store = counter_store();
        store.dispatch("add", vec![json!(3)]).await.unwrap();
        let (bridge, connector) = bridge(&store);

        bridge
            .handle_message(DevToolsMessage::Dispatch {
                payload: DispatchPayload::Reset,
                state: None,
            })
            .await
            .unwrap();

        assert_eq!(store.current_state().present().count, 0);
        assert_eq!(connector.inits(), vec![json!({ "count": 0 })]);
    }

    #[tokio::test]
    async fn rollback_resets_to_the_snapshot_and_rebaselines() {
        let store = counter_store();
        store.dispatch("add", vec![json!(3)]).await.unwrap();
        let (bridge, connector) = bridge(&store);

        bridge
            .handle_message(DevToolsMessage::Dispatch {
                payload: DispatchPayload::Rollback,
                state: Some("{\"count\":1}".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(store.current_state().present().count, 1);
        assert_eq!(connector.inits(), vec![json!({ "count": 1 })]);
    }

    #[tokio::test]
    async fn published_dispatches_are_mirrored_to_the_connector() {
        let _ = env_logger::builder().is_test(true).try_init();

        let store = counter_store();
        let connector = Arc::new(MockConnector::default());
        let (_inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let handle = setup(
            store.clone(),
            connector.clone(),
            inbound_rx,
            DevToolsOptions::default(),
            LogDefinitions::default(),
        )
        .expect("bridge should start");

        store.dispatch("add", vec![json!(2)]).await.unwrap();

        // the bridge task mirrors asynchronously
        for _ in 0..100 {
            if !connector.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let sent = connector.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.kind, "add");
        assert_eq!(sent[0].0.params, vec![json!(2)]);
        assert_eq!(sent[0].1, json!({ "count": 2 }));
        assert_eq!(connector.inits(), vec![json!({ "count": 0 })]);

        handle.abort();
    }

    #[tokio::test]
    async fn disabled_options_skip_bridge_setup() {
        let store = counter_store();
        let connector = Arc::new(MockConnector::default());
        let (_tx, rx) = mpsc::unbounded_channel();

        let handle = setup(
            store,
            connector.clone(),
            rx,
            DevToolsOptions { disable: true },
            LogDefinitions::default(),
        );

        assert!(handle.is_none());
        assert!(connector.inits().is_empty());
    }
}
