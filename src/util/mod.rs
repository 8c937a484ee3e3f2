pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Unix seconds, used for session expiry bookkeeping.
pub(crate) fn now_s() -> i64 {
    now_ms() / 1000
}

/// Origin of the running page, e.g. `https://app.example.com`.
pub(crate) fn page_origin() -> Option<String> {
    web_sys::window().and_then(|w| w.location().origin().ok())
}
