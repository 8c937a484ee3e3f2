use crate::models::Bookmark;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    Parse,
    Validation,
}

#[derive(Clone, Debug)]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ApiError {
    pub(crate) fn network(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    pub(crate) fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    pub(crate) fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    pub(crate) fn validation(message: &str) -> Self {
        Self {
            kind: ApiErrorKind::Validation,
            message: message.to_string(),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub url: String,
    pub anon_key: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        let mut config = Self {
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
        };

        // We support BOTH `window.ENV.SUPABASE_URL` (documented in README) and
        // `window.ENV.supabase_url` (legacy/implementation detail) for
        // compatibility, and likewise for the anon key.
        if let Some(window) = web_sys::window() {
            if let Some(env) = window.get("ENV") {
                if !env.is_undefined() && env.is_object() {
                    if let Some(url) = read_env_key(&env, "SUPABASE_URL", "supabase_url") {
                        config.url = url;
                    }
                    if let Some(key) = read_env_key(&env, "SUPABASE_ANON_KEY", "supabase_anon_key")
                    {
                        config.anon_key = key;
                    }
                }
            }
        }

        config
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn read_env_key(env: &wasm_bindgen::JsValue, primary: &str, fallback: &str) -> Option<String> {
    for key in [primary, fallback] {
        if let Ok(value) = js_sys::Reflect::get(env, &key.into()) {
            if let Some(s) = value.as_string() {
                return Some(s);
            }
        }
    }
    None
}

pub(crate) const REQUIRED_FIELDS_MESSAGE: &str = "Title and URL are required.";

/// A validated, trimmed title/url pair ready to be written.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct BookmarkDraft {
    pub title: String,
    pub url: String,
}

impl BookmarkDraft {
    /// Trims both fields; fails fast (no network call) when either is empty
    /// after trimming.
    pub fn parse(title: &str, url: &str) -> ApiResult<Self> {
        let title = title.trim();
        let url = url.trim();
        if title.is_empty() || url.is_empty() {
            return Err(ApiError::validation(REQUIRED_FIELDS_MESSAGE));
        }
        Ok(Self {
            title: title.to_string(),
            url: url.to_string(),
        })
    }
}

fn table_url(base: &str) -> String {
    format!("{base}/rest/v1/bookmarks")
}

/// Read query for one identity's rows, newest first. Reads are filtered by
/// `user_id` explicitly even though row-level security already scopes them.
fn list_url(base: &str, user_id: &str) -> String {
    format!(
        "{}?select=*&user_id=eq.{}&order=created_at.desc",
        table_url(base),
        urlencoding::encode(user_id)
    )
}

fn row_url(base: &str, id: &str) -> String {
    format!("{}?id=eq.{}", table_url(base), urlencoding::encode(id))
}

/// With `Prefer: return=representation` the store answers with an array of
/// affected rows; single-row writes take the first element.
fn single_row(rows: Vec<Bookmark>, ctx: &str) -> ApiResult<Bookmark> {
    rows.into_iter()
        .next()
        .ok_or_else(|| ApiError::parse(format!("{ctx}: response contained no rows")))
}

/// Scoped CRUD against the `bookmarks` table.
///
/// Writes never set `user_id`; the storage layer derives it from the bearer
/// token and its row policies validate ownership.
#[derive(Clone)]
pub(crate) struct BookmarkRepository {
    config: EnvConfig,
    access_token: String,
}

impl BookmarkRepository {
    pub fn new(config: EnvConfig, access_token: String) -> Self {
        Self {
            config,
            access_token,
        }
    }

    fn with_auth_headers(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", self.access_token))
    }

    async fn send_rows(
        req: reqwest::RequestBuilder,
        ctx: &str,
    ) -> ApiResult<Vec<Bookmark>> {
        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(ApiError::parse)
        } else if res.status().as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, ctx))
        }
    }

    async fn send_no_content(req: reqwest::RequestBuilder, ctx: &str) -> ApiResult<()> {
        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            Ok(())
        } else if res.status().as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, ctx))
        }
    }

    pub async fn list(&self, user_id: &str) -> ApiResult<Vec<Bookmark>> {
        let client = reqwest::Client::new();
        let req = self.with_auth_headers(client.get(list_url(&self.config.url, user_id)));
        Self::send_rows(req, "Failed to load bookmarks").await
    }

    pub async fn insert(&self, draft: &BookmarkDraft) -> ApiResult<Bookmark> {
        let client = reqwest::Client::new();
        let req = self
            .with_auth_headers(client.post(table_url(&self.config.url)))
            .header("Prefer", "return=representation")
            .json(draft);
        let rows = Self::send_rows(req, "Failed to save bookmark").await?;
        single_row(rows, "Failed to save bookmark")
    }

    pub async fn update(&self, id: &str, draft: &BookmarkDraft) -> ApiResult<Bookmark> {
        let client = reqwest::Client::new();
        let req = self
            .with_auth_headers(client.patch(row_url(&self.config.url, id)))
            .header("Prefer", "return=representation")
            .json(draft);
        let rows = Self::send_rows(req, "Failed to update bookmark").await?;
        single_row(rows, "Failed to update bookmark")
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let client = reqwest::Client::new();
        let req = self.with_auth_headers(client.delete(row_url(&self.config.url, id)));
        Self::send_no_content(req, "Failed to delete bookmark").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_parse_trims_both_fields() {
        let draft = BookmarkDraft::parse(" My Docs ", " https://x.test ").expect("should parse");
        assert_eq!(draft.title, "My Docs");
        assert_eq!(draft.url, "https://x.test");
    }

    #[test]
    fn test_draft_parse_rejects_blank_title() {
        let err = BookmarkDraft::parse("   ", "https://x.test").unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert_eq!(err.message, REQUIRED_FIELDS_MESSAGE);
    }

    #[test]
    fn test_draft_parse_rejects_blank_url() {
        let err = BookmarkDraft::parse("My Docs", "").unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Validation);
    }

    #[test]
    fn test_draft_serializes_only_title_and_url() {
        let draft = BookmarkDraft::parse("My Docs", "https://x.test").expect("should parse");
        let v = serde_json::to_value(draft).expect("should serialize");
        assert_eq!(v, serde_json::json!({"title": "My Docs", "url": "https://x.test"}));
    }

    #[test]
    fn test_list_url_filters_and_orders() {
        let url = list_url("http://localhost:54321", "user-1");
        assert_eq!(
            url,
            "http://localhost:54321/rest/v1/bookmarks?select=*&user_id=eq.user-1&order=created_at.desc"
        );
    }

    #[test]
    fn test_row_url_encodes_id() {
        let url = row_url("http://localhost:54321", "a b");
        assert_eq!(url, "http://localhost:54321/rest/v1/bookmarks?id=eq.a%20b");
    }

    #[test]
    fn test_single_row_takes_first_of_representation() {
        let rows: Vec<Bookmark> = serde_json::from_str(
            r#"[{"id": "b1", "user_id": "u1", "title": "T", "url": "https://x.test",
                 "created_at": "2026-07-01T00:00:00Z"}]"#,
        )
        .expect("rows should parse");
        let row = single_row(rows, "ctx").expect("should take first row");
        assert_eq!(row.id, "b1");
    }

    #[test]
    fn test_single_row_errors_on_empty_representation() {
        let err = single_row(Vec::new(), "Failed to save bookmark").unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Parse);
        assert!(err.message.contains("Failed to save bookmark"));
    }
}
