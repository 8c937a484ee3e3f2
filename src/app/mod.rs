use crate::api::EnvConfig;
use crate::auth::SessionClient;
use crate::pages::BookmarkPage;
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

/// Shared by every component under the router: the environment config and
/// the one session client whose listener registry outlives page instances.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub config: EnvConfig,
    pub auth: SessionClient,
}

#[component]
pub fn App() -> impl IntoView {
    let config = EnvConfig::new();
    provide_context(AppContext {
        config: config.clone(),
        auth: SessionClient::new(config),
    });

    // IMPORTANT:
    // - Leptos CSR requires the `csr` feature on `leptos`.
    // - router hooks require a <Router> context.
    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("") view=BookmarkPage />
            </Routes>
        </Router>
    }
}
