#![allow(dead_code)]

use leptos::prelude::*;
use tw_merge::tw_merge;

/// Avatar image with an initials-badge fallback when no picture is set.
#[allow(dead_code)]
#[component]
pub fn Avatar(
    #[prop(into, optional)] class: String,
    #[prop(into)] src: Signal<String>,
    #[prop(into)] fallback: Signal<String>,
) -> impl IntoView {
    let image_class = tw_merge!("size-9 shrink-0 rounded-full object-cover", class.clone());
    let badge_class = tw_merge!(
        "flex size-9 shrink-0 items-center justify-center rounded-full bg-accent text-sm font-semibold text-accent-foreground",
        class
    );

    view! {
        {move || {
            let src_value = src.get();
            if src_value.is_empty() {
                view! { <div class=badge_class.clone()>{fallback.get()}</div> }.into_any()
            } else {
                view! {
                    <img class=image_class.clone() src=src_value alt=fallback.get() />
                }
                .into_any()
            }
        }}
    }
}
