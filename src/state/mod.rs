use crate::api::BookmarkDraft;
use crate::models::{AuthUser, Bookmark, Profile};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Loading,
    SignedOut,
    SignedIn,
}

/// In-flight inline edit; at most one row is editable at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EditDraft {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// The whole screen's state in one structure.
///
/// Every mutation goes through one of the named handlers below; the page
/// component holds this in a single signal and never pokes fields directly.
/// The structure is rebuilt from scratch on every identity change.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ViewState {
    pub phase: Phase,
    pub identity_id: Option<String>,
    pub profile: Profile,
    pub bookmarks: Vec<Bookmark>,
    pub error: Option<String>,
    pub draft_title: String,
    pub draft_url: String,
    pub editing: Option<EditDraft>,
    pub menu_open: bool,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
            identity_id: None,
            profile: Profile::default(),
            bookmarks: Vec::new(),
            error: None,
            draft_title: String::new(),
            draft_url: String::new(),
            editing: None,
            menu_open: false,
        }
    }

    /// Identity resolution completed, or the identity-change listener fired.
    /// Everything except the transient error slot is rebuilt.
    pub fn identity_changed(&mut self, user: Option<&AuthUser>) {
        self.phase = if user.is_some() {
            Phase::SignedIn
        } else {
            Phase::SignedOut
        };
        self.identity_id = user.map(|u| u.id.clone());
        self.profile = Profile::from_user(user);
        self.bookmarks = Vec::new();
        self.draft_title = String::new();
        self.draft_url = String::new();
        self.editing = None;
        self.menu_open = false;
    }

    /// Identity resolution failed: surface the message and fall back to the
    /// signed-out state rather than staying stuck loading.
    pub fn resolution_failed(&mut self, message: String) {
        self.identity_changed(None);
        self.error = Some(message);
    }

    pub fn list_loaded(&mut self, rows: Vec<Bookmark>) {
        self.bookmarks = rows;
        self.error = None;
    }

    /// Load failure leaves the current list untouched.
    pub fn list_failed(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn draft_title_changed(&mut self, value: String) {
        self.draft_title = value;
    }

    pub fn draft_url_changed(&mut self, value: String) {
        self.draft_url = value;
    }

    /// Validates the add form. Returns the payload to insert, or records the
    /// validation message and returns `None` (no network call is made).
    pub fn submit_add(&mut self) -> Option<BookmarkDraft> {
        self.error = None;
        match BookmarkDraft::parse(&self.draft_title, &self.draft_url) {
            Ok(draft) => Some(draft),
            Err(e) => {
                self.error = Some(e.message);
                None
            }
        }
    }

    /// Insert succeeded: prepend to keep newest-first order without a round
    /// trip, and clear the draft fields.
    pub fn added(&mut self, row: Bookmark) {
        self.bookmarks.insert(0, row);
        self.draft_title = String::new();
        self.draft_url = String::new();
        self.error = None;
    }

    /// Insert failed: the draft fields stay intact for another attempt.
    pub fn add_failed(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Seeds the edit draft from the row's current values. Starting an edit
    /// on another row silently abandons any unsaved edit.
    pub fn edit_started(&mut self, id: &str) {
        self.error = None;
        if let Some(row) = self.bookmarks.iter().find(|b| b.id == id) {
            self.editing = Some(EditDraft {
                id: row.id.clone(),
                title: row.title.clone(),
                url: row.url.clone(),
            });
        }
    }

    pub fn edit_title_changed(&mut self, value: String) {
        if let Some(edit) = self.editing.as_mut() {
            edit.title = value;
        }
    }

    pub fn edit_url_changed(&mut self, value: String) {
        if let Some(edit) = self.editing.as_mut() {
            edit.url = value;
        }
    }

    /// Discards the edit draft unconditionally.
    pub fn edit_cancelled(&mut self) {
        self.editing = None;
    }

    /// Validates the edit form. Returns the row id plus payload, or records
    /// the validation message and keeps the edit open.
    pub fn submit_edit(&mut self) -> Option<(String, BookmarkDraft)> {
        self.error = None;
        let edit = self.editing.as_ref()?;
        match BookmarkDraft::parse(&edit.title, &edit.url) {
            Ok(draft) => Some((edit.id.clone(), draft)),
            Err(e) => {
                self.error = Some(e.message);
                None
            }
        }
    }

    /// Update succeeded: merge the returned row into the list by id.
    pub fn saved(&mut self, row: Bookmark) {
        for bookmark in self.bookmarks.iter_mut() {
            if bookmark.id == row.id {
                *bookmark = row.clone();
            }
        }
        self.editing = None;
        self.error = None;
    }

    /// Update failed: the edit draft stays open and intact.
    pub fn save_failed(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Optimistically removes the row and returns the exact prior list for
    /// the compensating restore on failure.
    pub fn remove_requested(&mut self, id: &str) -> Vec<Bookmark> {
        self.error = None;
        let prior = self.bookmarks.clone();
        self.bookmarks.retain(|b| b.id != id);
        prior
    }

    /// Delete failed: restore the snapshot taken before the optimistic
    /// removal. The restored row may have been removed remotely in the
    /// meantime; the next feed-triggered reload corrects that drift.
    pub fn remove_failed(&mut self, prior: Vec<Bookmark>, message: String) {
        self.bookmarks = prior;
        self.error = Some(message);
    }

    /// Clears any stale message before the redirect attempt.
    pub fn sign_in_started(&mut self) {
        self.error = None;
    }

    /// Sign-in could not start (nothing navigated).
    pub fn sign_in_failed(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Sign-out failed remotely; the profile menu still closes.
    pub fn sign_out_failed(&mut self, message: String) {
        self.error = Some(message);
        self.menu_open = false;
    }

    pub fn menu_toggled(&mut self) {
        self.menu_open = !self.menu_open;
    }

    pub fn menu_closed(&mut self) {
        self.menu_open = false;
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::REQUIRED_FIELDS_MESSAGE;

    fn user(id: &str) -> AuthUser {
        AuthUser {
            id: id.to_string(),
            email: Some(format!("{id}@example.com")),
            user_metadata: serde_json::json!({"full_name": "Uma User"}),
        }
    }

    fn bookmark(id: &str, created_at: &str) -> Bookmark {
        Bookmark {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: format!("title-{id}"),
            url: format!("https://x.test/{id}"),
            created_at: created_at.to_string(),
        }
    }

    fn signed_in() -> ViewState {
        let mut state = ViewState::new();
        state.identity_changed(Some(&user("u1")));
        state.list_loaded(vec![
            bookmark("b3", "2026-07-03T00:00:00Z"),
            bookmark("b2", "2026-07-02T00:00:00Z"),
            bookmark("b1", "2026-07-01T00:00:00Z"),
        ]);
        state
    }

    #[test]
    fn test_resolution_with_identity_enters_signed_in() {
        let mut state = ViewState::new();
        assert_eq!(state.phase, Phase::Loading);

        state.identity_changed(Some(&user("u1")));
        assert_eq!(state.phase, Phase::SignedIn);
        assert_eq!(state.identity_id.as_deref(), Some("u1"));
        assert_eq!(state.profile.name, "Uma User");
    }

    #[test]
    fn test_resolution_without_identity_enters_signed_out() {
        let mut state = ViewState::new();
        state.identity_changed(None);
        assert_eq!(state.phase, Phase::SignedOut);
        assert!(state.identity_id.is_none());
    }

    #[test]
    fn test_resolution_failure_is_not_stuck_loading() {
        let mut state = ViewState::new();
        state.resolution_failed("boom".to_string());
        assert_eq!(state.phase, Phase::SignedOut);
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert!(state.bookmarks.is_empty());
    }

    #[test]
    fn test_signed_out_clears_everything_regardless_of_prior_state() {
        let mut state = signed_in();
        state.draft_title_changed("pending".to_string());
        state.edit_started("b2");
        state.menu_toggled();

        state.identity_changed(None);
        assert_eq!(state.phase, Phase::SignedOut);
        assert!(state.bookmarks.is_empty());
        assert_eq!(state.profile, Profile::default());
        assert!(state.editing.is_none());
        assert!(!state.menu_open);
        assert!(state.draft_title.is_empty());
    }

    #[test]
    fn test_add_trims_and_prepends() {
        let mut state = signed_in();
        state.draft_title_changed(" My Docs ".to_string());
        state.draft_url_changed(" https://x.test ".to_string());

        let draft = state.submit_add().expect("valid draft should submit");
        assert_eq!(draft.title, "My Docs");
        assert_eq!(draft.url, "https://x.test");

        state.added(bookmark("b4", "2026-07-04T00:00:00Z"));
        assert_eq!(state.bookmarks[0].id, "b4");
        assert_eq!(state.bookmarks.len(), 4);
        assert!(state.draft_title.is_empty());
        assert!(state.draft_url.is_empty());
    }

    #[test]
    fn test_add_with_empty_field_sets_required_notice_and_no_payload() {
        let mut state = signed_in();
        state.draft_title_changed("   ".to_string());
        state.draft_url_changed("https://x.test".to_string());

        assert!(state.submit_add().is_none());
        assert_eq!(state.error.as_deref(), Some(REQUIRED_FIELDS_MESSAGE));
        // Drafts stay put for correction.
        assert_eq!(state.draft_url, "https://x.test");
    }

    #[test]
    fn test_add_failure_keeps_draft_fields() {
        let mut state = signed_in();
        state.draft_title_changed("My Docs".to_string());
        state.draft_url_changed("https://x.test".to_string());
        let _ = state.submit_add();

        state.add_failed("insert failed".to_string());
        assert_eq!(state.error.as_deref(), Some("insert failed"));
        assert_eq!(state.draft_title, "My Docs");
        assert_eq!(state.draft_url, "https://x.test");
    }

    #[test]
    fn test_delete_is_optimistic_and_rolls_back_in_order() {
        let mut state = signed_in();
        let prior = state.remove_requested("b2");

        assert_eq!(
            state.bookmarks.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            vec!["b3", "b1"]
        );

        state.remove_failed(prior, "delete failed".to_string());
        assert_eq!(
            state.bookmarks.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            vec!["b3", "b2", "b1"]
        );
        assert_eq!(state.error.as_deref(), Some("delete failed"));
    }

    #[test]
    fn test_edit_seeds_draft_from_row() {
        let mut state = signed_in();
        state.edit_started("b2");

        let edit = state.editing.as_ref().expect("edit should start");
        assert_eq!(edit.id, "b2");
        assert_eq!(edit.title, "title-b2");
        assert_eq!(edit.url, "https://x.test/b2");
    }

    #[test]
    fn test_switching_edited_row_abandons_unsaved_changes_silently() {
        let mut state = signed_in();
        state.edit_started("b1");
        state.edit_title_changed("half-typed".to_string());

        state.edit_started("b3");
        let edit = state.editing.as_ref().expect("second edit should start");
        assert_eq!(edit.id, "b3");
        assert_eq!(edit.title, "title-b3");
        assert!(state.error.is_none());
        // The abandoned row keeps its stored values.
        assert_eq!(state.bookmarks[2].title, "title-b1");
    }

    #[test]
    fn test_save_merges_returned_row_by_id() {
        let mut state = signed_in();
        state.edit_started("b2");
        state.edit_title_changed(" Renamed ".to_string());

        let (id, draft) = state.submit_edit().expect("valid edit should submit");
        assert_eq!(id, "b2");
        assert_eq!(draft.title, "Renamed");

        let mut updated = bookmark("b2", "2026-07-02T00:00:00Z");
        updated.title = "Renamed".to_string();
        state.saved(updated);

        assert!(state.editing.is_none());
        assert_eq!(state.bookmarks[1].title, "Renamed");
        // Order is untouched by an in-place merge.
        assert_eq!(
            state.bookmarks.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            vec!["b3", "b2", "b1"]
        );
    }

    #[test]
    fn test_save_validation_failure_keeps_edit_open() {
        let mut state = signed_in();
        state.edit_started("b2");
        state.edit_url_changed("  ".to_string());

        assert!(state.submit_edit().is_none());
        assert_eq!(state.error.as_deref(), Some(REQUIRED_FIELDS_MESSAGE));
        assert!(state.editing.is_some());
    }

    #[test]
    fn test_save_remote_failure_keeps_edit_open() {
        let mut state = signed_in();
        state.edit_started("b2");
        state.save_failed("update failed".to_string());
        assert_eq!(state.editing.as_ref().map(|e| e.id.as_str()), Some("b2"));
        assert_eq!(state.error.as_deref(), Some("update failed"));
    }

    #[test]
    fn test_cancel_discards_draft_unconditionally() {
        let mut state = signed_in();
        state.edit_started("b2");
        state.edit_title_changed("half-typed".to_string());
        state.edit_cancelled();
        assert!(state.editing.is_none());
        assert_eq!(state.bookmarks[1].title, "title-b2");
    }

    #[test]
    fn test_reload_is_idempotent() {
        let mut state = signed_in();
        let rows = state.bookmarks.clone();

        state.list_loaded(rows.clone());
        let first = state.clone();
        state.list_loaded(rows);
        assert_eq!(state, first);
    }

    #[test]
    fn test_reload_replaces_error_slot() {
        let mut state = signed_in();
        state.list_failed("transient".to_string());
        assert!(state.error.is_some());
        state.list_loaded(Vec::new());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_list_failure_leaves_list_unchanged() {
        let mut state = signed_in();
        let before = state.bookmarks.clone();
        state.list_failed("offline".to_string());
        assert_eq!(state.bookmarks, before);
    }

    #[test]
    fn test_sign_in_attempt_replaces_stale_error() {
        let mut state = ViewState::new();
        state.resolution_failed("stale".to_string());
        state.sign_in_started();
        assert!(state.error.is_none());

        state.sign_in_failed("redirect failed".to_string());
        assert_eq!(state.error.as_deref(), Some("redirect failed"));
    }

    #[test]
    fn test_sign_out_failure_still_closes_menu() {
        let mut state = signed_in();
        state.menu_toggled();
        assert!(state.menu_open);

        state.sign_out_failed("logout failed".to_string());
        assert!(!state.menu_open);
        assert_eq!(state.error.as_deref(), Some("logout failed"));
        // Still signed in; only the listener clears the view.
        assert_eq!(state.phase, Phase::SignedIn);
    }

    #[test]
    fn test_menu_toggles() {
        let mut state = signed_in();
        state.menu_toggled();
        assert!(state.menu_open);
        state.menu_toggled();
        assert!(!state.menu_open);
        state.menu_toggled();
        state.menu_closed();
        assert!(!state.menu_open);
    }
}
