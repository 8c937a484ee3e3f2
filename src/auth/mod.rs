use crate::api::{ApiError, ApiErrorKind, ApiResult, EnvConfig};
use crate::models::{AuthUser, Session};
use crate::storage::{clear_session, load_session, save_session};
use crate::util::{now_s, page_origin};
use leptos::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Provider query parameters sent along with the OAuth redirect.
const PROVIDER_PARAMS: &str = "access_type=offline&prompt=consent";

pub(crate) fn authorize_url(base: &str, provider: &str, redirect_to: &str) -> String {
    format!(
        "{}/auth/v1/authorize?provider={}&redirect_to={}&{}",
        base,
        urlencoding::encode(provider),
        urlencoding::encode(redirect_to),
        PROVIDER_PARAMS
    )
}

/// Tokens handed back in the URL fragment after the OAuth round trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FragmentTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

fn fragment_pairs(fragment: &str) -> Vec<(String, String)> {
    fragment
        .trim_start_matches('#')
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

pub(crate) fn parse_fragment_tokens(fragment: &str) -> Option<FragmentTokens> {
    let pairs = fragment_pairs(fragment);
    let get = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
    };

    let access_token = get("access_token")?;
    let refresh_token = get("refresh_token")?;
    let expires_in = get("expires_in")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(3600);

    Some(FragmentTokens {
        access_token,
        refresh_token,
        expires_in,
    })
}

/// Auth error relayed through the callback fragment
/// (`#error=…&error_description=…`).
pub(crate) fn parse_fragment_error(fragment: &str) -> Option<String> {
    let pairs = fragment_pairs(fragment);
    let get = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
    };

    get("error")?;
    let description = get("error_description")
        .unwrap_or_else(|| "Sign-in was not completed.".to_string());
    let decoded = match urlencoding::decode(&description) {
        Ok(s) => s.into_owned(),
        Err(_) => description.clone(),
    };
    Some(decoded.replace('+', " "))
}

/// Removes one listener registration; must be called when the view that
/// registered it is torn down.
pub(crate) struct AuthSubscription {
    id: u64,
    listeners: Arc<Mutex<HashMap<u64, Callback<Option<Session>>>>>,
}

impl AuthSubscription {
    pub fn unsubscribe(self) {
        if let Ok(mut map) = self.listeners.lock() {
            map.remove(&self.id);
        }
    }
}

/// Wraps the hosted auth service: session recovery, the OAuth redirect,
/// sign-out, and identity-change notifications.
#[derive(Clone)]
pub(crate) struct SessionClient {
    config: EnvConfig,
    listeners: Arc<Mutex<HashMap<u64, Callback<Option<Session>>>>>,
    next_listener_id: Arc<AtomicU64>,
}

impl SessionClient {
    pub fn new(config: EnvConfig) -> Self {
        Self {
            config,
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_listener_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Recover the signed-in identity, in order: tokens from the OAuth
    /// callback fragment, then the persisted session. Returns `Ok(None)`
    /// when signed out; any error leaves the caller signed out too.
    pub async fn resolve(&self) -> ApiResult<Option<Session>> {
        let fragment = current_fragment();

        if let Some(message) = fragment.as_deref().and_then(parse_fragment_error) {
            strip_fragment();
            return Err(ApiError {
                kind: ApiErrorKind::Http,
                message,
            });
        }

        if let Some(tokens) = fragment.as_deref().and_then(parse_fragment_tokens) {
            strip_fragment();
            let user = self.fetch_user(&tokens.access_token).await?;
            let session = Session {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                expires_at: now_s() + tokens.expires_in,
                user,
            };
            save_session(&session);
            return Ok(Some(session));
        }

        let Some(stored) = load_session() else {
            return Ok(None);
        };

        // Revalidate the persisted token and refresh the user it names.
        match self.fetch_user(&stored.access_token).await {
            Ok(user) => {
                let session = Session { user, ..stored };
                save_session(&session);
                Ok(Some(session))
            }
            Err(e) => {
                if e.kind == ApiErrorKind::Unauthorized {
                    clear_session();
                }
                Err(e)
            }
        }
    }

    async fn fetch_user(&self, access_token: &str) -> ApiResult<AuthUser> {
        let client = reqwest::Client::new();
        let res = client
            .get(format!("{}/auth/v1/user", self.config.url))
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(ApiError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(ApiError::parse)
        } else if res.status().as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, "Failed to load session"))
        }
    }

    /// Starts the redirect-based OAuth flow. On success the browser
    /// navigates away; on failure nothing navigates and the error is
    /// returned for display.
    pub fn sign_in_with_oauth(&self, provider: &str) -> ApiResult<()> {
        let origin = page_origin()
            .ok_or_else(|| ApiError::network("browser window is unavailable"))?;
        let url = authorize_url(&self.config.url, provider, &format!("{origin}/"));

        let window = web_sys::window()
            .ok_or_else(|| ApiError::network("browser window is unavailable"))?;
        window
            .location()
            .set_href(&url)
            .map_err(|_| ApiError::network("failed to open the sign-in page"))
    }

    /// Terminates the session; listeners observe the signed-out state.
    pub async fn sign_out(&self, session: &Session) -> ApiResult<()> {
        let client = reqwest::Client::new();
        let res = client
            .post(format!("{}/auth/v1/logout", self.config.url))
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await
            .map_err(ApiError::network)?;

        if !res.status().is_success() && res.status().as_u16() != 401 {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::http(status, body, "Sign-out failed"));
        }

        clear_session();
        self.notify(None);
        Ok(())
    }

    /// Registers a persistent identity-change listener. The subscription
    /// must be released when the registering view is discarded.
    pub fn on_identity_change(&self, callback: Callback<Option<Session>>) -> AuthSubscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut map) = self.listeners.lock() {
            map.insert(id, callback);
        }
        AuthSubscription {
            id,
            listeners: Arc::clone(&self.listeners),
        }
    }

    fn notify(&self, session: Option<Session>) {
        // Collect first so a listener that unsubscribes mid-notification
        // cannot deadlock the registry.
        let callbacks: Vec<Callback<Option<Session>>> = match self.listeners.lock() {
            Ok(map) => map.values().copied().collect(),
            Err(_) => Vec::new(),
        };
        for callback in callbacks {
            callback.run(session.clone());
        }
    }
}

fn current_fragment() -> Option<String> {
    let hash = web_sys::window()?.location().hash().ok()?;
    if hash.is_empty() {
        None
    } else {
        Some(hash)
    }
}

/// Drops the token fragment from the address bar once consumed.
fn strip_fragment() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let location = window.location();
    let path = location.pathname().unwrap_or_else(|_| "/".to_string());
    let search = location.search().unwrap_or_default();
    if let Ok(history) = window.history() {
        let _ = history.replace_state_with_url(
            &wasm_bindgen::JsValue::NULL,
            "",
            Some(&format!("{path}{search}")),
        );
    }
}
