//! The dispatcher's action vocabulary.
//!
//! Every dispatchable event — user intents, follow-up notices, and cache
//! operations — is a variant of [`Action`]. The dispatcher matches
//! exhaustively, so an unknown event kind cannot exist.

use huddle_core::types::DbId;
use huddle_core::Category;
use serde_json::Value;

use crate::types::{ActionItem, Item, Retro};

/// Classification of an HTTP response status.
///
/// Every response falls into exactly one class, and every intent maps
/// each class to exactly one follow-up action. Transport failures that
/// never produced a status are classified as [`StatusClass::OtherFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200–399.
    Success,
    /// 403 — recoverable by logging into the retro.
    NeedsAuth,
    /// 404 — generally terminal for the current view.
    NotFound,
    /// 422 — carries server-supplied field errors.
    ValidationFailed,
    /// Everything else. Never retried.
    OtherFailure,
}

/// Classify a status code into its [`StatusClass`].
pub fn classify(status: u16) -> StatusClass {
    match status {
        200..=399 => StatusClass::Success,
        403 => StatusClass::NeedsAuth,
        404 => StatusClass::NotFound,
        422 => StatusClass::ValidationFailed,
        _ => StatusClass::OtherFailure,
    }
}

/// A dispatchable event: an intent, a follow-up notice, or a cache
/// operation.
///
/// `retro_id` fields carry the retro's slug — the client addresses retros
/// the way URLs do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // -----------------------------------------------------------------
    // Intents: issue HTTP calls and classify the response
    // -----------------------------------------------------------------
    CreateRetro {
        name: String,
        slug: String,
        password: Option<String>,
    },
    GetRetro {
        id: String,
    },
    GetRetros,
    GetRetroSettings {
        id: String,
    },
    GetRetroLogin {
        retro_id: String,
    },
    LoginToRetro {
        retro_id: String,
        password: String,
    },
    CreateRetroItem {
        retro_id: String,
        category: Category,
        description: String,
    },
    UpdateRetroItem {
        retro_id: String,
        item_id: DbId,
        description: String,
    },
    DeleteRetroItem {
        retro_id: String,
        item: Item,
    },
    VoteRetroItem {
        retro_id: String,
        item: Item,
    },
    DoneRetroItem {
        retro_id: String,
        item_id: DbId,
        done: bool,
    },
    NextRetroItem {
        retro_id: String,
    },
    HighlightRetroItem {
        retro_id: String,
        item_id: DbId,
    },
    UnhighlightRetroItem {
        retro_id: String,
    },
    ArchiveRetro {
        retro_id: String,
        send_archive_email: bool,
    },
    CreateRetroActionItem {
        retro_id: String,
        description: String,
    },
    EditRetroActionItem {
        retro_id: String,
        action_item_id: DbId,
        description: String,
    },
    DoneRetroActionItem {
        retro_id: String,
        action_item_id: DbId,
        done: bool,
    },
    DeleteRetroActionItem {
        retro_id: String,
        action_item: ActionItem,
    },
    GetRetroArchives {
        retro_id: String,
    },
    GetRetroArchive {
        retro_id: String,
        archive_id: DbId,
    },
    CreateSession {
        access_token: String,
    },
    CreateUser {
        access_token: String,
        full_name: Option<String>,
        company_name: Option<String>,
    },
    UpdateRetroSettings {
        retro_id: String,
        old_slug: String,
        name: Option<String>,
        new_slug: Option<String>,
        is_private: Option<bool>,
        video_link: Option<String>,
    },
    UpdateRetroPassword {
        retro_id: String,
        current_password: String,
        new_password: String,
    },
    /// A broadcast message arrived on the realtime channel. The payload is
    /// forwarded verbatim; reconciliation happens in the state layer.
    RetroDataReceived {
        payload: Value,
    },

    // -----------------------------------------------------------------
    // Notices: mutate the state tree
    // -----------------------------------------------------------------
    RetroSuccessfullyCreated {
        retro: Retro,
    },
    RetroUnsuccessfullyCreated {
        errors: Value,
    },
    RetroSuccessfullyFetched {
        retro: Retro,
    },
    RetrosSuccessfullyFetched {
        retros: Vec<Retro>,
    },
    RetroSettingsSuccessfullyFetched {
        retro: Value,
    },
    RetroLoginSuccessfullyFetched {
        retro: Value,
    },
    RetroSuccessfullyLoggedIn {
        retro_id: String,
    },
    RetroLoginFailed,
    RequireRetroLogin {
        retro_id: String,
    },
    RetroNotFound,
    NotFound,
    RetroItemSuccessfullyCreated {
        item: Item,
        retro_id: String,
    },
    RetroItemSuccessfullyEdited {
        item: Item,
    },
    RetroItemSuccessfullyDeleted {
        item: Item,
    },
    RetroItemSuccessfullyVoted {
        item: Item,
    },
    RetroItemSuccessfullyDone {
        item_id: DbId,
        done: bool,
    },
    RetroItemSuccessfullyHighlighted {
        retro: Retro,
    },
    RetroItemSuccessfullyUnhighlighted,
    ArchiveRetroSuccessfullyDone {
        retro: Retro,
    },
    RetroSettingsSuccessfullyUpdated {
        retro: Retro,
    },
    RetroSettingsUnsuccessfullyUpdated {
        errors: Value,
    },
    RetroPasswordSuccessfullyUpdated {
        retro_id: String,
    },
    RetroPasswordUnsuccessfullyUpdated {
        errors: Value,
    },
    RetroArchivesSuccessfullyFetched {
        archives: Value,
    },
    RetroArchiveSuccessfullyFetched {
        retro: Value,
    },
    RetroActionItemSuccessfullyCreated {
        action_item: ActionItem,
    },
    RetroActionItemSuccessfullyEdited {
        action_item: ActionItem,
    },
    RetroActionItemSuccessfullyToggled {
        action_item: ActionItem,
    },
    RetroActionItemSuccessfullyDeleted {
        action_item: ActionItem,
    },
    UserLoggedInSuccessfully {
        new_user: bool,
    },
    RedirectToRegistration {
        access_token: String,
    },
    UserCreated,
    /// Generic failure notice for classes an operation has no specific
    /// reaction to. `status` is `None` for transport-level failures.
    ApiCallFailed {
        status: Option<u16>,
    },
    ShowAlert {
        message: String,
    },

    // -----------------------------------------------------------------
    // Cache operations: durable write, then in-memory mirror
    // -----------------------------------------------------------------
    SetAuthToken {
        auth_token: String,
    },
    SetApiToken {
        slug: String,
        api_token: String,
    },
    MigrateApiToken {
        old_slug: String,
        new_slug: String,
    },
    MarkRetroLoginNeeded {
        slug: String,
        changed: bool,
    },
    SetHomeTermsDismissed,
    SetRetroTermsDismissed {
        slug: String,
    },
    ReloadLocalStorage,
    ClearLocalStorage,
}

impl Action {
    /// The action's kind as a stable name, for logging and test
    /// assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::CreateRetro { .. } => "createRetro",
            Action::GetRetro { .. } => "getRetro",
            Action::GetRetros => "getRetros",
            Action::GetRetroSettings { .. } => "getRetroSettings",
            Action::GetRetroLogin { .. } => "getRetroLogin",
            Action::LoginToRetro { .. } => "loginToRetro",
            Action::CreateRetroItem { .. } => "createRetroItem",
            Action::UpdateRetroItem { .. } => "updateRetroItem",
            Action::DeleteRetroItem { .. } => "deleteRetroItem",
            Action::VoteRetroItem { .. } => "voteRetroItem",
            Action::DoneRetroItem { .. } => "doneRetroItem",
            Action::NextRetroItem { .. } => "nextRetroItem",
            Action::HighlightRetroItem { .. } => "highlightRetroItem",
            Action::UnhighlightRetroItem { .. } => "unhighlightRetroItem",
            Action::ArchiveRetro { .. } => "archiveRetro",
            Action::CreateRetroActionItem { .. } => "createRetroActionItem",
            Action::EditRetroActionItem { .. } => "editRetroActionItem",
            Action::DoneRetroActionItem { .. } => "doneRetroActionItem",
            Action::DeleteRetroActionItem { .. } => "deleteRetroActionItem",
            Action::GetRetroArchives { .. } => "getRetroArchives",
            Action::GetRetroArchive { .. } => "getRetroArchive",
            Action::CreateSession { .. } => "createSession",
            Action::CreateUser { .. } => "createUser",
            Action::UpdateRetroSettings { .. } => "updateRetroSettings",
            Action::UpdateRetroPassword { .. } => "updateRetroPassword",
            Action::RetroDataReceived { .. } => "retroDataReceived",
            Action::RetroSuccessfullyCreated { .. } => "retroSuccessfullyCreated",
            Action::RetroUnsuccessfullyCreated { .. } => "retroUnsuccessfullyCreated",
            Action::RetroSuccessfullyFetched { .. } => "retroSuccessfullyFetched",
            Action::RetrosSuccessfullyFetched { .. } => "retrosSuccessfullyFetched",
            Action::RetroSettingsSuccessfullyFetched { .. } => "retroSettingsSuccessfullyFetched",
            Action::RetroLoginSuccessfullyFetched { .. } => "retroLoginSuccessfullyFetched",
            Action::RetroSuccessfullyLoggedIn { .. } => "retroSuccessfullyLoggedIn",
            Action::RetroLoginFailed => "retroLoginFailed",
            Action::RequireRetroLogin { .. } => "requireRetroLogin",
            Action::RetroNotFound => "retroNotFound",
            Action::NotFound => "notFound",
            Action::RetroItemSuccessfullyCreated { .. } => "retroItemSuccessfullyCreated",
            Action::RetroItemSuccessfullyEdited { .. } => "retroItemSuccessfullyEdited",
            Action::RetroItemSuccessfullyDeleted { .. } => "retroItemSuccessfullyDeleted",
            Action::RetroItemSuccessfullyVoted { .. } => "retroItemSuccessfullyVoted",
            Action::RetroItemSuccessfullyDone { .. } => "retroItemSuccessfullyDone",
            Action::RetroItemSuccessfullyHighlighted { .. } => "retroItemSuccessfullyHighlighted",
            Action::RetroItemSuccessfullyUnhighlighted => "retroItemSuccessfullyUnhighlighted",
            Action::ArchiveRetroSuccessfullyDone { .. } => "archiveRetroSuccessfullyDone",
            Action::RetroSettingsSuccessfullyUpdated { .. } => "retroSettingsSuccessfullyUpdated",
            Action::RetroSettingsUnsuccessfullyUpdated { .. } => {
                "retroSettingsUnsuccessfullyUpdated"
            }
            Action::RetroPasswordSuccessfullyUpdated { .. } => "retroPasswordSuccessfullyUpdated",
            Action::RetroPasswordUnsuccessfullyUpdated { .. } => {
                "retroPasswordUnsuccessfullyUpdated"
            }
            Action::RetroArchivesSuccessfullyFetched { .. } => "retroArchivesSuccessfullyFetched",
            Action::RetroArchiveSuccessfullyFetched { .. } => "retroArchiveSuccessfullyFetched",
            Action::RetroActionItemSuccessfullyCreated { .. } => {
                "retroActionItemSuccessfullyCreated"
            }
            Action::RetroActionItemSuccessfullyEdited { .. } => "retroActionItemSuccessfullyEdited",
            Action::RetroActionItemSuccessfullyToggled { .. } => {
                "retroActionItemSuccessfullyToggled"
            }
            Action::RetroActionItemSuccessfullyDeleted { .. } => {
                "retroActionItemSuccessfullyDeleted"
            }
            Action::UserLoggedInSuccessfully { .. } => "userLoggedInSuccessfully",
            Action::RedirectToRegistration { .. } => "redirectToRegistration",
            Action::UserCreated => "userCreated",
            Action::ApiCallFailed { .. } => "apiCallFailed",
            Action::ShowAlert { .. } => "showAlert",
            Action::SetAuthToken { .. } => "setAuthToken",
            Action::SetApiToken { .. } => "setApiToken",
            Action::MigrateApiToken { .. } => "migrateApiToken",
            Action::MarkRetroLoginNeeded { .. } => "markRetroLoginNeeded",
            Action::SetHomeTermsDismissed => "setHomeTermsDismissed",
            Action::SetRetroTermsDismissed { .. } => "setRetroTermsDismissed",
            Action::ReloadLocalStorage => "reloadLocalStorage",
            Action::ClearLocalStorage => "clearLocalStorage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_every_class() {
        assert_eq!(classify(200), StatusClass::Success);
        assert_eq!(classify(201), StatusClass::Success);
        assert_eq!(classify(304), StatusClass::Success);
        assert_eq!(classify(399), StatusClass::Success);
        assert_eq!(classify(403), StatusClass::NeedsAuth);
        assert_eq!(classify(404), StatusClass::NotFound);
        assert_eq!(classify(422), StatusClass::ValidationFailed);
        assert_eq!(classify(400), StatusClass::OtherFailure);
        assert_eq!(classify(401), StatusClass::OtherFailure);
        assert_eq!(classify(409), StatusClass::OtherFailure);
        assert_eq!(classify(500), StatusClass::OtherFailure);
        assert_eq!(classify(502), StatusClass::OtherFailure);
    }
}
