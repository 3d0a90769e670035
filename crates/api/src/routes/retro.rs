//! Route definitions for the `/retros` resource and its nested
//! collections.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{action_item, archive, discussion, item, retro};
use crate::state::AppState;

/// Routes mounted at `/retros`.
///
/// ```text
/// GET    /                                  -> list (user auth)
/// POST   /                                  -> create (user auth)
/// GET    /{id}                              -> show
/// PATCH  /{id}                              -> update_settings
/// GET    /{id}/settings                     -> settings
/// PATCH  /{id}/password                     -> update_password
/// GET    /{id}/sessions/new                 -> login_info (public)
/// POST   /{id}/sessions                     -> login (public)
///
/// POST   /{id}/items                        -> create
/// PATCH  /{id}/items/{item_id}              -> update
/// DELETE /{id}/items/{item_id}              -> delete
/// POST   /{id}/items/{item_id}/vote         -> vote
/// PATCH  /{id}/items/{item_id}/done         -> set_done
///
/// POST   /{id}/discussion                   -> highlight
/// DELETE /{id}/discussion                   -> unhighlight
/// POST   /{id}/discussion/transitions       -> transition (NEXT)
///
/// POST   /{id}/action_items                 -> create
/// PATCH  /{id}/action_items/{aid}           -> update
/// DELETE /{id}/action_items/{aid}           -> delete
///
/// POST   /{id}/archives                     -> create
/// GET    /{id}/archives                     -> list
/// GET    /{id}/archives/{archive_id}        -> show
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(retro::list).post(retro::create))
        .route("/{id}", get(retro::show).patch(retro::update_settings))
        .route("/{id}/settings", get(retro::settings))
        .route("/{id}/password", patch(retro::update_password))
        .route("/{id}/sessions/new", get(retro::login_info))
        .route("/{id}/sessions", post(retro::login))
        .route("/{id}/items", post(item::create))
        .route(
            "/{id}/items/{item_id}",
            patch(item::update).delete(item::delete),
        )
        .route("/{id}/items/{item_id}/vote", post(item::vote))
        .route("/{id}/items/{item_id}/done", patch(item::set_done))
        .route(
            "/{id}/discussion",
            post(discussion::highlight).delete(discussion::unhighlight),
        )
        .route("/{id}/discussion/transitions", post(discussion::transition))
        .route("/{id}/action_items", post(action_item::create))
        .route(
            "/{id}/action_items/{action_item_id}",
            patch(action_item::update).delete(action_item::delete),
        )
        .route("/{id}/archives", get(archive::list).post(archive::create))
        .route("/{id}/archives/{archive_id}", get(archive::show))
}
