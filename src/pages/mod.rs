use crate::api::{BookmarkRepository, EnvConfig};
use crate::app::AppContext;
use crate::components::ui::{
    Alert, AlertDescription, Avatar, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardHeader, CardItem, CardList, CardTitle, Input, Label, Spinner,
};
use crate::feed::{ChangeFeed, FeedSubscription};
use crate::models::{Bookmark, Session};
use crate::state::{Phase, ViewState};
use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;

fn load_bookmarks(
    config: EnvConfig,
    user_id: String,
    access_token: String,
    state: RwSignal<ViewState>,
) {
    spawn_local(async move {
        let repo = BookmarkRepository::new(config, access_token);
        match repo.list(&user_id).await {
            Ok(rows) => state.update(|s| s.list_loaded(rows)),
            Err(e) => state.update(|s| s.list_failed(e.to_string())),
        }
    });
}

/// Full reload of the signed-in identity's list; a no-op when signed out.
/// This is the convergence path for every remote change notification.
fn reload_current(
    config: &EnvConfig,
    session: RwSignal<Option<Session>>,
    state: RwSignal<ViewState>,
) {
    let Some((user_id, access_token)) = session.with_untracked(|s| {
        s.as_ref()
            .map(|s| (s.user.id.clone(), s.access_token.clone()))
    }) else {
        return;
    };
    load_bookmarks(config.clone(), user_id, access_token, state);
}

fn current_access_token(session: RwSignal<Option<Session>>) -> Option<String> {
    session.with_untracked(|s| s.as_ref().map(|s| s.access_token.clone()))
}

#[component]
pub fn BookmarkPage() -> impl IntoView {
    let app = expect_context::<AppContext>();
    let config = app.config.clone();
    let auth = app.auth.clone();

    let state: RwSignal<ViewState> = RwSignal::new(ViewState::new());
    let session: RwSignal<Option<Session>> = RwSignal::new(None);
    let feed_handle = StoredValue::new_local(None::<FeedSubscription>);

    // Identity transitions come exclusively through this listener; the view
    // never guesses the outcome of an auth call. Released on teardown.
    {
        let config = config.clone();
        let subscription = auth.on_identity_change(Callback::new(move |next: Option<Session>| {
            state.update(|s| s.identity_changed(next.as_ref().map(|n| &n.user)));
            session.set(next);
            reload_current(&config, session, state);
        }));
        on_cleanup(move || subscription.unsubscribe());
    }

    // Session bootstrap: leave Loading for SignedIn/SignedOut exactly once.
    {
        let config = config.clone();
        let auth = auth.clone();
        Effect::new(move |_| {
            let auth = auth.clone();
            let config = config.clone();
            spawn_local(async move {
                match auth.resolve().await {
                    Ok(next) => {
                        state.update(|s| s.identity_changed(next.as_ref().map(|n| &n.user)));
                        session.set(next);
                        reload_current(&config, session, state);
                    }
                    Err(e) => {
                        session.set(None);
                        state.update(|s| s.resolution_failed(e.to_string()));
                    }
                }
            });
        });
    }

    // One live feed subscription per signed-in identity: the previous one is
    // always torn down before a new one opens, and on teardown.
    let identity = Memo::new(move |_| state.with(|s| s.identity_id.clone()));
    {
        let config = config.clone();
        Effect::new(move |_| {
            let current = identity.get();

            feed_handle.update_value(|slot| {
                if let Some(prev) = slot.take() {
                    prev.unsubscribe();
                }
            });

            let Some(user_id) = current else {
                return;
            };
            let Some(access_token) = current_access_token(session) else {
                return;
            };

            let reload_config = config.clone();
            let on_change = Callback::new(move |_: ()| {
                reload_current(&reload_config, session, state);
            });

            match ChangeFeed::new(config.clone()).subscribe(&user_id, &access_token, on_change) {
                Ok(sub) => feed_handle.set_value(Some(sub)),
                Err(e) => state.update(|s| s.list_failed(e.to_string())),
            }
        });

        on_cleanup(move || {
            feed_handle.try_update_value(|slot| {
                if let Some(prev) = slot.take() {
                    prev.unsubscribe();
                }
            });
        });
    }

    let _esc_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if ev.key() == "Escape" {
            state.update(|s| s.menu_closed());
        }
    });

    let on_sign_in = {
        let auth = auth.clone();
        Callback::new(move |_: ()| {
            state.update(|s| s.sign_in_started());
            if let Err(e) = auth.sign_in_with_oauth("google") {
                state.update(|s| s.sign_in_failed(e.to_string()));
            }
        })
    };

    let on_sign_out = {
        let auth = auth.clone();
        Callback::new(move |_: ()| {
            let Some(current) = session.get_untracked() else {
                return;
            };
            let auth = auth.clone();
            spawn_local(async move {
                // Success clears the view through the identity-change
                // listener; only the failure path is handled here.
                if let Err(e) = auth.sign_out(&current).await {
                    state.update(|s| s.sign_out_failed(e.to_string()));
                }
            });
        })
    };

    let on_add_submit = {
        let config = config.clone();
        Callback::new(move |ev: web_sys::SubmitEvent| {
            ev.prevent_default();
            let Some(draft) = state.try_update(|s| s.submit_add()).flatten() else {
                return;
            };
            let Some(access_token) = current_access_token(session) else {
                return;
            };
            let repo = BookmarkRepository::new(config.clone(), access_token);
            spawn_local(async move {
                match repo.insert(&draft).await {
                    Ok(row) => state.update(|s| s.added(row)),
                    Err(e) => state.update(|s| s.add_failed(e.to_string())),
                }
            });
        })
    };

    let on_edit_save = {
        let config = config.clone();
        Callback::new(move |_: ()| {
            let Some((id, draft)) = state.try_update(|s| s.submit_edit()).flatten() else {
                return;
            };
            let Some(access_token) = current_access_token(session) else {
                return;
            };
            let repo = BookmarkRepository::new(config.clone(), access_token);
            spawn_local(async move {
                match repo.update(&id, &draft).await {
                    Ok(row) => state.update(|s| s.saved(row)),
                    Err(e) => state.update(|s| s.save_failed(e.to_string())),
                }
            });
        })
    };

    let on_delete = {
        let config = config.clone();
        Callback::new(move |id: String| {
            let Some(access_token) = current_access_token(session) else {
                return;
            };
            // Optimistic removal with a compensating restore on failure.
            let prior = state
                .try_update(|s| s.remove_requested(&id))
                .unwrap_or_default();
            let repo = BookmarkRepository::new(config.clone(), access_token);
            spawn_local(async move {
                if let Err(e) = repo.delete(&id).await {
                    state.update(|s| s.remove_failed(prior, e.to_string()));
                }
            });
        })
    };

    let on_draft_title = Callback::new(move |v: String| state.update(|s| s.draft_title_changed(v)));
    let on_draft_url = Callback::new(move |v: String| state.update(|s| s.draft_url_changed(v)));
    let on_edit_start = Callback::new(move |id: String| state.update(|s| s.edit_started(&id)));
    let on_edit_title = Callback::new(move |v: String| state.update(|s| s.edit_title_changed(v)));
    let on_edit_url = Callback::new(move |v: String| state.update(|s| s.edit_url_changed(v)));
    let on_edit_cancel = Callback::new(move |_: ()| state.update(|s| s.edit_cancelled()));
    let on_menu_toggle = Callback::new(move |_: ()| state.update(|s| s.menu_toggled()));

    let phase = Memo::new(move |_| state.with(|s| s.phase));
    let error_message = Memo::new(move |_| state.with(|s| s.error.clone()));
    let profile_name = Memo::new(move |_| state.with(|s| s.profile.name.clone()));
    let profile_avatar = Memo::new(move |_| state.with(|s| s.profile.avatar_url.clone()));
    let profile_initial = Memo::new(move |_| state.with(|s| s.profile.initial()));
    let menu_open = Memo::new(move |_| state.with(|s| s.menu_open));
    let bookmarks = Memo::new(move |_| state.with(|s| s.bookmarks.clone()));
    let editing_id = Memo::new(move |_| state.with(|s| s.editing.as_ref().map(|e| e.id.clone())));
    let edit_title = Memo::new(move |_| {
        state.with(|s| s.editing.as_ref().map(|e| e.title.clone()).unwrap_or_default())
    });
    let edit_url = Memo::new(move |_| {
        state.with(|s| s.editing.as_ref().map(|e| e.url.clone()).unwrap_or_default())
    });
    let draft_title = Memo::new(move |_| state.with(|s| s.draft_title.clone()));
    let draft_url = Memo::new(move |_| state.with(|s| s.draft_url.clone()));

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto w-full max-w-[760px] px-4 py-8">
                <div class="mb-6 space-y-1">
                    <h1 class="text-xl font-semibold">"Linkshelf"</h1>
                    <p class="text-xs text-muted-foreground">"Private bookmarks, synced live."</p>
                </div>

                {move || match phase.get() {
                    Phase::Loading => view! {
                        <Card>
                            <CardContent>
                                <div class="inline-flex items-center gap-2 text-sm text-muted-foreground">
                                    <Spinner />
                                    "Loading session..."
                                </div>
                            </CardContent>
                        </Card>
                    }
                    .into_any(),
                    Phase::SignedOut => view! {
                        <SignedOutCard error=error_message on_sign_in=on_sign_in />
                    }
                    .into_any(),
                    Phase::SignedIn => view! {
                        <div class="space-y-4">
                            <div class="flex justify-end">
                                <ProfileControl
                                    name=profile_name
                                    avatar=profile_avatar
                                    initial=profile_initial
                                    menu_open=menu_open
                                    on_toggle=on_menu_toggle
                                    on_sign_out=on_sign_out
                                />
                            </div>

                            <ErrorBanner error=error_message />

                            <Card class="border-primary/20 bg-primary/5">
                                <CardContent>
                                    <p class="text-xs font-semibold uppercase tracking-wider">"Live updates"</p>
                                    <p class="mt-1 text-sm text-muted-foreground">
                                        "Changes sync automatically between open tabs."
                                    </p>
                                </CardContent>
                            </Card>

                            <AddBookmarkForm
                                title=draft_title
                                url=draft_url
                                on_title=on_draft_title
                                on_url=on_draft_url
                                on_submit=on_add_submit
                            />

                            <BookmarkList
                                bookmarks=bookmarks
                                editing_id=editing_id
                                edit_title=edit_title
                                edit_url=edit_url
                                on_edit_start=on_edit_start
                                on_edit_title=on_edit_title
                                on_edit_url=on_edit_url
                                on_edit_save=on_edit_save
                                on_edit_cancel=on_edit_cancel
                                on_delete=on_delete
                            />
                        </div>
                    }
                    .into_any(),
                }}
            </div>
        </div>
    }
}

#[component]
fn ErrorBanner(error: Memo<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || error.get().is_some() fallback=|| ().into_view()>
            {move || {
                error.get().map(|e| view! {
                    <Alert class="border-destructive/30">
                        <AlertDescription class="text-destructive">{e}</AlertDescription>
                    </Alert>
                })
            }}
        </Show>
    }
}

#[component]
fn SignedOutCard(error: Memo<Option<String>>, on_sign_in: Callback<()>) -> impl IntoView {
    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-2xl">"Private bookmarks, zero clutter"</CardTitle>
                <CardDescription>
                    "Sign in with Google to add, sync, and delete your own bookmarks."
                </CardDescription>
            </CardHeader>
            <CardContent>
                <Button on:click=move |_| on_sign_in.run(())>"Continue with Google"</Button>
                <div class="mt-4">
                    <ErrorBanner error=error />
                </div>
            </CardContent>
        </Card>
    }
}

#[component]
fn ProfileControl(
    name: Memo<String>,
    avatar: Memo<String>,
    initial: Memo<String>,
    menu_open: Memo<bool>,
    on_toggle: Callback<()>,
    on_sign_out: Callback<()>,
) -> impl IntoView {
    view! {
        <div class="relative">
            <Button
                variant=ButtonVariant::Outline
                class="h-11 rounded-full px-2.5"
                on:click=move |_| on_toggle.run(())
            >
                <span class="inline-flex items-center gap-3">
                    <Avatar src=avatar fallback=initial />
                    <span class="max-w-[180px] truncate text-sm font-semibold">
                        {move || name.get()}
                    </span>
                </span>
            </Button>

            <Show when=move || menu_open.get() fallback=|| ().into_view()>
                <div class="absolute right-0 z-10 mt-2 w-44 rounded-xl border bg-card p-2 shadow-sm">
                    <Button
                        variant=ButtonVariant::Ghost
                        class="w-full justify-start"
                        on:click=move |_| on_sign_out.run(())
                    >
                        "Sign out"
                    </Button>
                </div>
            </Show>
        </div>
    }
}

#[component]
fn AddBookmarkForm(
    title: Memo<String>,
    url: Memo<String>,
    on_title: Callback<String>,
    on_url: Callback<String>,
    on_submit: Callback<web_sys::SubmitEvent>,
) -> impl IntoView {
    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">"Add a bookmark"</CardTitle>
            </CardHeader>
            <CardContent>
                <form class="flex flex-col gap-3" on:submit=move |ev: web_sys::SubmitEvent| on_submit.run(ev)>
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="bookmark-title" class="text-xs">"Title"</Label>
                        <Input
                            id="bookmark-title"
                            r#type="text"
                            placeholder="Title (e.g. Project docs)"
                            value=title
                            on_value=on_title
                            required=true
                        />
                    </div>

                    <div class="flex flex-col gap-1.5">
                        <Label html_for="bookmark-url" class="text-xs">"URL"</Label>
                        <Input
                            id="bookmark-url"
                            r#type="url"
                            placeholder="https://example.com"
                            value=url
                            on_value=on_url
                            required=true
                        />
                    </div>

                    <Button class="w-fit">"Save bookmark"</Button>
                </form>
            </CardContent>
        </Card>
    }
}

#[component]
fn BookmarkList(
    bookmarks: Memo<Vec<Bookmark>>,
    editing_id: Memo<Option<String>>,
    edit_title: Memo<String>,
    edit_url: Memo<String>,
    on_edit_start: Callback<String>,
    on_edit_title: Callback<String>,
    on_edit_url: Callback<String>,
    on_edit_save: Callback<()>,
    on_edit_cancel: Callback<()>,
    on_delete: Callback<String>,
) -> impl IntoView {
    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">"My bookmarks"</CardTitle>
                <CardDescription>
                    {move || format!("{} total", bookmarks.get().len())}
                    " · private to your account only"
                </CardDescription>
            </CardHeader>

            <CardContent>
                <Show
                    when=move || !bookmarks.get().is_empty()
                    fallback=|| view! {
                        <div class="rounded-md border border-dashed p-4 text-sm text-muted-foreground">
                            "No bookmarks yet."
                        </div>
                    }
                >
                    <CardList>
                        {move || {
                            bookmarks
                                .get()
                                .into_iter()
                                .map(|bookmark| {
                                    view! {
                                        <BookmarkRow
                                            bookmark=bookmark
                                            editing_id=editing_id
                                            edit_title=edit_title
                                            edit_url=edit_url
                                            on_edit_start=on_edit_start
                                            on_edit_title=on_edit_title
                                            on_edit_url=on_edit_url
                                            on_edit_save=on_edit_save
                                            on_edit_cancel=on_edit_cancel
                                            on_delete=on_delete
                                        />
                                    }
                                })
                                .collect_view()
                        }}
                    </CardList>
                </Show>
            </CardContent>
        </Card>
    }
}

#[component]
fn BookmarkRow(
    bookmark: Bookmark,
    editing_id: Memo<Option<String>>,
    edit_title: Memo<String>,
    edit_url: Memo<String>,
    on_edit_start: Callback<String>,
    on_edit_title: Callback<String>,
    on_edit_url: Callback<String>,
    on_edit_save: Callback<()>,
    on_edit_cancel: Callback<()>,
    on_delete: Callback<String>,
) -> impl IntoView {
    let row_id = StoredValue::new(bookmark.id.clone());
    let title = bookmark.title.clone();
    let url = bookmark.url.clone();

    let is_editing = move || editing_id.get().as_deref() == Some(row_id.get_value().as_str());

    view! {
        <CardItem class="flex-col items-stretch gap-3 rounded-md border px-4 py-3">
            <Show
                when=is_editing
                fallback=move || view! {
                    <div class="flex flex-col gap-3 sm:flex-row sm:items-start sm:justify-between">
                        <div class="min-w-0">
                            <p class="truncate text-sm font-semibold">{title.clone()}</p>
                            <a
                                class="mt-1 block truncate text-sm text-primary underline underline-offset-4"
                                href=url.clone()
                                target="_blank"
                                rel="noreferrer"
                            >
                                {url.clone()}
                            </a>
                        </div>
                        <div class="flex shrink-0 gap-2">
                            <Button
                                size=ButtonSize::Sm
                                variant=ButtonVariant::Outline
                                on:click=move |_| on_edit_start.run(row_id.get_value())
                            >
                                "Edit"
                            </Button>
                            <Button
                                size=ButtonSize::Sm
                                variant=ButtonVariant::Destructive
                                on:click=move |_| on_delete.run(row_id.get_value())
                            >
                                "Delete"
                            </Button>
                        </div>
                    </div>
                }
            >
                <div class="flex flex-col gap-3">
                    <Input
                        r#type="text"
                        class="h-8 text-sm"
                        value=edit_title
                        on_value=on_edit_title
                        required=true
                    />
                    <Input
                        r#type="url"
                        class="h-8 text-sm"
                        value=edit_url
                        on_value=on_edit_url
                        required=true
                    />
                    <div class="flex gap-2">
                        <Button size=ButtonSize::Sm on:click=move |_| on_edit_save.run(())>
                            "Save"
                        </Button>
                        <Button
                            size=ButtonSize::Sm
                            variant=ButtonVariant::Outline
                            on:click=move |_| on_edit_cancel.run(())
                        >
                            "Cancel"
                        </Button>
                    </div>
                </div>
            </Show>
        </CardItem>
    }
}
