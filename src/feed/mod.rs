use crate::api::{ApiError, ApiResult, EnvConfig};
use leptos::prelude::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// The channel is dropped server-side without periodic keepalive frames.
pub(crate) const HEARTBEAT_INTERVAL_MS: i32 = 30_000;

fn socket_url(base: &str, anon_key: &str) -> String {
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!(
        "{ws_base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
        urlencoding::encode(anon_key)
    )
}

fn channel_topic(user_id: &str) -> String {
    format!("realtime:bookmarks-{user_id}")
}

/// Channel join frame: row-level changes on `bookmarks`, any event type,
/// filtered server-side to the signed-in identity's rows.
fn join_message(topic: &str, user_id: &str, access_token: &str, join_ref: u64) -> String {
    serde_json::json!({
        "topic": topic,
        "event": "phx_join",
        "ref": join_ref.to_string(),
        "payload": {
            "config": {
                "postgres_changes": [{
                    "event": "*",
                    "schema": "public",
                    "table": "bookmarks",
                    "filter": format!("user_id=eq.{user_id}"),
                }],
            },
            "access_token": access_token,
        },
    })
    .to_string()
}

fn heartbeat_message(heartbeat_ref: u64) -> String {
    serde_json::json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "ref": heartbeat_ref.to_string(),
        "payload": {},
    })
    .to_string()
}

/// Replies, presence frames and acks all arrive on the same socket; only
/// row-change notifications may trigger a reload.
fn is_change_notification(raw: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| {
            v.get("event")
                .and_then(|e| e.as_str())
                .map(|e| e == "postgres_changes")
        })
        .unwrap_or(false)
}

/// One live push subscription. Releasing it closes the socket and stops the
/// heartbeat; omitting the release leaks a standing connection.
pub(crate) struct FeedSubscription {
    socket: web_sys::WebSocket,
    heartbeat_id: Option<i32>,
    _on_open: Closure<dyn FnMut()>,
    _on_message: Closure<dyn FnMut(web_sys::MessageEvent)>,
    _heartbeat: Closure<dyn FnMut()>,
}

impl FeedSubscription {
    pub fn unsubscribe(self) {
        if let (Some(window), Some(id)) = (web_sys::window(), self.heartbeat_id) {
            window.clear_interval_with_handle(id);
        }
        // Detach handlers before closing so a late frame cannot fire into
        // dropped closures.
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        let _ = self.socket.close();
    }
}

/// Wraps the hosted realtime service. The callback is a trigger, not a
/// payload consumer: every notification re-reads the authoritative list.
#[derive(Clone)]
pub(crate) struct ChangeFeed {
    config: EnvConfig,
}

impl ChangeFeed {
    pub fn new(config: EnvConfig) -> Self {
        Self { config }
    }

    pub fn subscribe(
        &self,
        user_id: &str,
        access_token: &str,
        on_change: Callback<()>,
    ) -> ApiResult<FeedSubscription> {
        let url = socket_url(&self.config.url, &self.config.anon_key);
        let socket = web_sys::WebSocket::new(&url)
            .map_err(|_| ApiError::network("failed to open the realtime connection"))?;

        let topic = channel_topic(user_id);
        let join = join_message(&topic, user_id, access_token, 1);
        let join_socket = socket.clone();
        let on_open = Closure::wrap(Box::new(move || {
            let _ = join_socket.send_with_str(&join);
        }) as Box<dyn FnMut()>);
        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let on_message = Closure::wrap(Box::new(move |ev: web_sys::MessageEvent| {
            if let Some(raw) = ev.data().as_string() {
                if is_change_notification(&raw) {
                    on_change.run(());
                }
            }
        }) as Box<dyn FnMut(web_sys::MessageEvent)>);
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let heartbeat_socket = socket.clone();
        let mut heartbeat_ref = 2u64;
        let heartbeat = Closure::wrap(Box::new(move || {
            if heartbeat_socket.ready_state() == web_sys::WebSocket::OPEN {
                let _ = heartbeat_socket.send_with_str(&heartbeat_message(heartbeat_ref));
                heartbeat_ref += 1;
            }
        }) as Box<dyn FnMut()>);
        let heartbeat_id = web_sys::window().and_then(|w| {
            w.set_interval_with_callback_and_timeout_and_arguments_0(
                heartbeat.as_ref().unchecked_ref(),
                HEARTBEAT_INTERVAL_MS,
            )
            .ok()
        });

        Ok(FeedSubscription {
            socket,
            heartbeat_id,
            _on_open: on_open,
            _on_message: on_message,
            _heartbeat: heartbeat,
        })
    }
}
