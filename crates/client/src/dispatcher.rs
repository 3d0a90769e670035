//! The action dispatcher.
//!
//! One mediator owns the HTTP client, the state tree, the local cache,
//! and an explicit FIFO queue of follow-up actions. Intents issue HTTP
//! calls; each response status is classified into exactly one
//! [`StatusClass`] and each class maps to exactly one follow-up action.
//!
//! Mutations happen in two phases:
//!
//! 1. Durable writes (persistent cache + in-memory mirror) run inside the
//!    intent handler, before it returns.
//! 2. State-tree updates and UI notifications are follow-up actions on
//!    the queue, consumed only after phase 1 is complete.
//!
//! This makes orderings like "write new token, delete old token, THEN
//! notify UI" structural rather than a scheduling accident.
//!
//! Each action is processed to completion before the next is admitted.
//! Ordering between two different in-flight HTTP requests is NOT
//! guaranteed; reconciliation of the `retro` subtree is last-write-wins.

use std::collections::VecDeque;

use serde_json::{json, Value};

use crate::actions::{classify, Action, StatusClass};
use crate::api::{ApiResponse, RetroApi, TransportError};
use crate::cache::LocalCache;
use crate::store::StateTree;
use crate::types::{ActionItem, Item, Retro};

/// The single-owner action dispatcher.
pub struct Dispatcher {
    api: RetroApi,
    store: StateTree,
    cache: LocalCache,
    queue: VecDeque<Action>,
}

impl Dispatcher {
    /// Build a dispatcher over an API client and a (pre-loaded) cache.
    pub fn new(api: RetroApi, cache: LocalCache) -> Self {
        Self {
            api,
            store: StateTree::new(),
            cache,
            queue: VecDeque::new(),
        }
    }

    /// The shared observable state tree (read-only to callers).
    pub fn store(&self) -> &StateTree {
        &self.store
    }

    /// The local cache mirror (read-only to callers).
    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Dispatch an action and drain every follow-up it produces.
    ///
    /// Actions are processed strictly in enqueue order, each to
    /// completion (including its HTTP call) before the next is admitted.
    pub async fn dispatch(&mut self, action: Action) {
        self.queue.push_back(action);
        while let Some(next) = self.queue.pop_front() {
            tracing::debug!(kind = next.kind(), "dispatch");
            let followups = self.handle(next).await;
            self.queue.extend(followups);
        }
    }

    /// Process one action, returning its follow-ups in order.
    ///
    /// Split out from [`dispatch`](Self::dispatch) so tests can assert the
    /// exact follow-up set per (operation, status) pair.
    async fn handle(&mut self, action: Action) -> Vec<Action> {
        match action {
            // ---------------------------------------------------------
            // Intents
            // ---------------------------------------------------------
            Action::CreateRetro {
                name,
                slug,
                password,
            } => {
                let auth = self.cache.auth_token().map(String::from);
                let result = self
                    .api
                    .create_retro(&name, &slug, password.as_deref(), auth.as_deref())
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => match parse_retro(&response.body) {
                            Some(retro) => {
                                if let Some(token) = response.body["token"].as_str() {
                                    self.cache.set_api_token(&retro.slug, token);
                                }
                                vec![Action::RetroSuccessfullyCreated { retro }]
                            }
                            None => malformed("createRetro", &response),
                        },
                        StatusClass::ValidationFailed => vec![Action::RetroUnsuccessfullyCreated {
                            errors: errors_of(&response.body),
                        }],
                        StatusClass::NeedsAuth
                        | StatusClass::NotFound
                        | StatusClass::OtherFailure => failed(&response),
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::GetRetro { id } => {
                let token = self.cache.api_token(&id).map(String::from);
                let result = self.api.get_retro(&id, token.as_deref()).await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => match parse_retro(&response.body) {
                            Some(retro) => vec![Action::RetroSuccessfullyFetched { retro }],
                            None => malformed("getRetro", &response),
                        },
                        StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id: id }],
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::ValidationFailed | StatusClass::OtherFailure => {
                            failed(&response)
                        }
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::GetRetros => {
                let auth = self.cache.auth_token().map(String::from);
                let result = self.api.get_retros(auth.as_deref()).await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => {
                            match serde_json::from_value::<Vec<Retro>>(
                                response.body["retros"].clone(),
                            ) {
                                Ok(retros) => vec![Action::RetrosSuccessfullyFetched { retros }],
                                Err(_) => malformed("getRetros", &response),
                            }
                        }
                        _ => failed(&response),
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::GetRetroSettings { id } => {
                let token = self.cache.api_token(&id).map(String::from);
                let result = self.api.get_retro_settings(&id, token.as_deref()).await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => vec![Action::RetroSettingsSuccessfullyFetched {
                            retro: response.body["retro"].clone(),
                        }],
                        StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id: id }],
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::ValidationFailed | StatusClass::OtherFailure => {
                            failed(&response)
                        }
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::GetRetroLogin { retro_id } => {
                let result = self.api.get_retro_login(&retro_id).await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => vec![Action::RetroLoginSuccessfullyFetched {
                            retro: response.body["retro"].clone(),
                        }],
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::NeedsAuth
                        | StatusClass::ValidationFailed
                        | StatusClass::OtherFailure => failed(&response),
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::LoginToRetro { retro_id, password } => {
                let result = self.api.login_to_retro(&retro_id, &password).await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => {
                            if let Some(token) = response.body["token"].as_str() {
                                self.cache.set_api_token(&retro_id, token);
                            }
                            vec![Action::RetroSuccessfullyLoggedIn { retro_id }]
                        }
                        // Any failure is a failed login; the form retries.
                        _ => vec![Action::RetroLoginFailed],
                    },
                    Outcome::TransportFailed => vec![Action::RetroLoginFailed],
                }
            }

            Action::CreateRetroItem {
                retro_id,
                category,
                description,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .create_retro_item(&retro_id, category, &description, token.as_deref())
                    .await;
                item_response("createRetroItem", retro_id, result, |item, retro_id| {
                    Action::RetroItemSuccessfullyCreated { item, retro_id }
                })
            }

            Action::UpdateRetroItem {
                retro_id,
                item_id,
                description,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .update_retro_item(&retro_id, item_id, &description, token.as_deref())
                    .await;
                item_response("updateRetroItem", retro_id, result, |item, _| {
                    Action::RetroItemSuccessfullyEdited { item }
                })
            }

            Action::DeleteRetroItem { retro_id, item } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .delete_retro_item(&retro_id, item.id, token.as_deref())
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => {
                            vec![Action::RetroItemSuccessfullyDeleted { item }]
                        }
                        StatusClass::NeedsAuth => {
                            vec![Action::RequireRetroLogin { retro_id }]
                        }
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::ValidationFailed | StatusClass::OtherFailure => {
                            failed(&response)
                        }
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::VoteRetroItem { retro_id, item } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .vote_retro_item(&retro_id, item.id, token.as_deref())
                    .await;
                item_response("voteRetroItem", retro_id, result, |item, _| {
                    Action::RetroItemSuccessfullyVoted { item }
                })
            }

            Action::DoneRetroItem {
                retro_id,
                item_id,
                done,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .set_retro_item_done(&retro_id, item_id, done, token.as_deref())
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => {
                            vec![Action::RetroItemSuccessfullyDone { item_id, done }]
                        }
                        StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::ValidationFailed | StatusClass::OtherFailure => {
                            failed(&response)
                        }
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::NextRetroItem { retro_id } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self.api.next_retro_item(&retro_id, token.as_deref()).await;
                discussion_response("nextRetroItem", retro_id, result)
            }

            Action::HighlightRetroItem { retro_id, item_id } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .highlight_retro_item(&retro_id, item_id, token.as_deref())
                    .await;
                discussion_response("highlightRetroItem", retro_id, result)
            }

            Action::UnhighlightRetroItem { retro_id } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .unhighlight_retro_item(&retro_id, token.as_deref())
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => vec![Action::RetroItemSuccessfullyUnhighlighted],
                        StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::ValidationFailed | StatusClass::OtherFailure => {
                            failed(&response)
                        }
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::ArchiveRetro {
                retro_id,
                send_archive_email,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .archive_retro(&retro_id, send_archive_email, token.as_deref())
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => match parse_retro(&response.body) {
                            Some(retro) => vec![Action::ArchiveRetroSuccessfullyDone { retro }],
                            None => malformed("archiveRetro", &response),
                        },
                        StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::ValidationFailed | StatusClass::OtherFailure => {
                            failed(&response)
                        }
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::CreateRetroActionItem {
                retro_id,
                description,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .create_retro_action_item(&retro_id, &description, token.as_deref())
                    .await;
                action_item_response("createRetroActionItem", retro_id, result, |ai| {
                    Action::RetroActionItemSuccessfullyCreated { action_item: ai }
                })
            }

            Action::EditRetroActionItem {
                retro_id,
                action_item_id,
                description,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .update_retro_action_item(
                        &retro_id,
                        action_item_id,
                        json!({ "description": description }),
                        token.as_deref(),
                    )
                    .await;
                action_item_response("editRetroActionItem", retro_id, result, |ai| {
                    Action::RetroActionItemSuccessfullyEdited { action_item: ai }
                })
            }

            Action::DoneRetroActionItem {
                retro_id,
                action_item_id,
                done,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .update_retro_action_item(
                        &retro_id,
                        action_item_id,
                        json!({ "done": done }),
                        token.as_deref(),
                    )
                    .await;
                action_item_response("doneRetroActionItem", retro_id, result, |ai| {
                    Action::RetroActionItemSuccessfullyToggled { action_item: ai }
                })
            }

            Action::DeleteRetroActionItem {
                retro_id,
                action_item,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .delete_retro_action_item(&retro_id, action_item.id, token.as_deref())
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => {
                            vec![Action::RetroActionItemSuccessfullyDeleted { action_item }]
                        }
                        StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::ValidationFailed | StatusClass::OtherFailure => {
                            failed(&response)
                        }
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::GetRetroArchives { retro_id } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .get_retro_archives(&retro_id, token.as_deref())
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => vec![Action::RetroArchivesSuccessfullyFetched {
                            archives: response.body["archives"].clone(),
                        }],
                        StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::ValidationFailed | StatusClass::OtherFailure => {
                            failed(&response)
                        }
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::GetRetroArchive {
                retro_id,
                archive_id,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .get_retro_archive(&retro_id, archive_id, token.as_deref())
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => vec![Action::RetroArchiveSuccessfullyFetched {
                            retro: response.body["retro"].clone(),
                        }],
                        StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
                        // A missing archive is not a missing retro.
                        StatusClass::NotFound => vec![Action::NotFound],
                        StatusClass::ValidationFailed | StatusClass::OtherFailure => {
                            failed(&response)
                        }
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::CreateSession { access_token } => {
                let result = self.api.create_session(&access_token).await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => {
                            if let Some(token) = response.body["auth_token"].as_str() {
                                self.cache.set_auth_token(token);
                            }
                            let new_user =
                                response.body["new_user"].as_bool().unwrap_or(false);
                            vec![Action::UserLoggedInSuccessfully { new_user }]
                        }
                        StatusClass::NotFound => {
                            vec![Action::RedirectToRegistration { access_token }]
                        }
                        StatusClass::NeedsAuth
                        | StatusClass::ValidationFailed
                        | StatusClass::OtherFailure => failed(&response),
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::CreateUser {
                access_token,
                full_name,
                company_name,
            } => {
                let result = self
                    .api
                    .create_user(
                        &access_token,
                        full_name.as_deref(),
                        company_name.as_deref(),
                    )
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => {
                            if let Some(token) = response.body["auth_token"].as_str() {
                                self.cache.set_auth_token(token);
                            }
                            vec![Action::UserCreated]
                        }
                        _ => failed(&response),
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::UpdateRetroSettings {
                retro_id,
                old_slug,
                name,
                new_slug,
                is_private,
                video_link,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let mut settings = serde_json::Map::new();
                if let Some(name) = &name {
                    settings.insert("name".into(), json!(name));
                }
                if let Some(slug) = &new_slug {
                    settings.insert("slug".into(), json!(slug));
                }
                if let Some(is_private) = is_private {
                    settings.insert("is_private".into(), json!(is_private));
                }
                if let Some(video_link) = &video_link {
                    settings.insert("video_link".into(), json!(video_link));
                }

                let result = self
                    .api
                    .update_retro(&retro_id, Value::Object(settings), token.as_deref())
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => match parse_retro(&response.body) {
                            Some(retro) => {
                                // Phase 1: migrate the cached token to the
                                // server-confirmed slug before any notice
                                // is visible.
                                if retro.slug != old_slug {
                                    self.cache.migrate_api_token(&old_slug, &retro.slug);
                                }
                                vec![
                                    Action::RetroSettingsSuccessfullyUpdated { retro },
                                    Action::ShowAlert {
                                        message: "Settings saved!".into(),
                                    },
                                ]
                            }
                            None => malformed("updateRetroSettings", &response),
                        },
                        StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::ValidationFailed => {
                            vec![Action::RetroSettingsUnsuccessfullyUpdated {
                                errors: errors_of(&response.body),
                            }]
                        }
                        StatusClass::OtherFailure => failed(&response),
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::UpdateRetroPassword {
                retro_id,
                current_password,
                new_password,
            } => {
                let token = self.cache.api_token(&retro_id).map(String::from);
                let result = self
                    .api
                    .update_retro_password(
                        &retro_id,
                        &current_password,
                        &new_password,
                        token.as_deref(),
                    )
                    .await;
                match outcome(result) {
                    Outcome::Response(response) => match classify(response.status) {
                        StatusClass::Success => {
                            if let Some(token) = response.body["token"].as_str() {
                                self.cache.set_api_token(&retro_id, token);
                            }
                            vec![
                                Action::RetroPasswordSuccessfullyUpdated { retro_id },
                                Action::ShowAlert {
                                    message: "Password changed".into(),
                                },
                            ]
                        }
                        StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
                        StatusClass::NotFound => vec![Action::RetroNotFound],
                        StatusClass::ValidationFailed => {
                            vec![Action::RetroPasswordUnsuccessfullyUpdated {
                                errors: errors_of(&response.body),
                            }]
                        }
                        StatusClass::OtherFailure => failed(&response),
                    },
                    Outcome::TransportFailed => transport_failed(),
                }
            }

            Action::RetroDataReceived { payload } => {
                // Broadcast payloads replace the retro subtree wholesale:
                // last-write-wins between remote pushes and local
                // responses.
                match serde_json::from_value::<Retro>(payload["retro"].clone()) {
                    Ok(retro) => self.put_retro(retro),
                    Err(e) => {
                        tracing::warn!(error = %e, "Unrecognized broadcast payload, ignoring");
                    }
                }
                vec![]
            }

            // ---------------------------------------------------------
            // Notices: fold into the state tree
            // ---------------------------------------------------------
            Action::RetroSuccessfullyCreated { retro } => {
                let slug = retro.slug.clone();
                self.put_retro(retro);
                self.store.set(&["route"], json!(format!("/retros/{slug}")));
                vec![]
            }
            Action::RetroUnsuccessfullyCreated { errors } => {
                self.store.merge(&["ui"], json!({ "retro_create_errors": errors }));
                vec![]
            }
            Action::RetroSuccessfullyFetched { retro } => {
                self.put_retro(retro);
                vec![]
            }
            Action::RetrosSuccessfullyFetched { retros } => {
                self.store
                    .set(&["retros"], serde_json::to_value(retros).unwrap_or_default());
                vec![]
            }
            Action::RetroSettingsSuccessfullyFetched { retro }
            | Action::RetroLoginSuccessfullyFetched { retro } => {
                self.store.merge(&["retro"], retro);
                vec![]
            }
            Action::RetroSuccessfullyLoggedIn { retro_id } => {
                self.store.merge(&["ui"], json!({ "login_failed": false }));
                self.store
                    .set(&["route"], json!(format!("/retros/{retro_id}")));
                vec![]
            }
            Action::RetroLoginFailed => {
                self.store.merge(&["ui"], json!({ "login_failed": true }));
                vec![]
            }
            Action::RequireRetroLogin { retro_id } => {
                self.cache.mark_login_needed(&retro_id, false);
                self.store
                    .set(&["route"], json!(format!("/retros/{retro_id}/login")));
                vec![]
            }
            Action::RetroNotFound => {
                self.store.merge(&["ui"], json!({ "retro_not_found": true }));
                vec![]
            }
            Action::NotFound => {
                self.store.merge(&["ui"], json!({ "not_found": true }));
                vec![]
            }
            Action::RetroItemSuccessfullyCreated { item, .. } => {
                self.mutate_retro(|retro| retro.items.push(item));
                vec![]
            }
            Action::RetroItemSuccessfullyEdited { item }
            | Action::RetroItemSuccessfullyVoted { item } => {
                self.mutate_retro(|retro| {
                    if let Some(slot) = retro.items.iter_mut().find(|i| i.id == item.id) {
                        *slot = item;
                    }
                });
                vec![]
            }
            Action::RetroItemSuccessfullyDeleted { item } => {
                self.mutate_retro(|retro| retro.items.retain(|i| i.id != item.id));
                vec![]
            }
            Action::RetroItemSuccessfullyDone { item_id, done } => {
                self.mutate_retro(|retro| {
                    if let Some(item) = retro.items.iter_mut().find(|i| i.id == item_id) {
                        item.done = done;
                    }
                });
                vec![]
            }
            Action::RetroItemSuccessfullyHighlighted { retro } => {
                self.put_retro(retro);
                vec![]
            }
            Action::RetroItemSuccessfullyUnhighlighted => {
                self.mutate_retro(|retro| retro.highlighted_item_id = None);
                vec![]
            }
            Action::ArchiveRetroSuccessfullyDone { retro } => {
                let slug = retro.slug.clone();
                self.put_retro(retro);
                self.store
                    .set(&["route"], json!(format!("/retros/{slug}/archives")));
                vec![]
            }
            Action::RetroSettingsSuccessfullyUpdated { retro } => {
                self.put_retro(retro);
                vec![]
            }
            Action::RetroSettingsUnsuccessfullyUpdated { errors } => {
                self.store.merge(&["ui"], json!({ "settings_errors": errors }));
                vec![]
            }
            Action::RetroPasswordSuccessfullyUpdated { retro_id } => {
                self.store
                    .set(&["route"], json!(format!("/retros/{retro_id}/settings")));
                vec![]
            }
            Action::RetroPasswordUnsuccessfullyUpdated { errors } => {
                self.store.merge(&["ui"], json!({ "password_errors": errors }));
                vec![]
            }
            Action::RetroArchivesSuccessfullyFetched { archives } => {
                self.store.set(&["archives"], archives);
                vec![]
            }
            Action::RetroArchiveSuccessfullyFetched { retro } => {
                self.store.set(&["archive"], retro);
                vec![]
            }
            Action::RetroActionItemSuccessfullyCreated { action_item } => {
                self.mutate_retro(|retro| retro.action_items.push(action_item));
                vec![]
            }
            Action::RetroActionItemSuccessfullyEdited { action_item }
            | Action::RetroActionItemSuccessfullyToggled { action_item } => {
                self.mutate_retro(|retro| {
                    if let Some(slot) = retro
                        .action_items
                        .iter_mut()
                        .find(|a| a.id == action_item.id)
                    {
                        *slot = action_item;
                    }
                });
                vec![]
            }
            Action::RetroActionItemSuccessfullyDeleted { action_item } => {
                self.mutate_retro(|retro| {
                    retro.action_items.retain(|a| a.id != action_item.id)
                });
                vec![]
            }
            Action::UserLoggedInSuccessfully { new_user } => {
                self.store
                    .merge(&["session"], json!({ "logged_in": true, "new_user": new_user }));
                vec![]
            }
            Action::RedirectToRegistration { access_token } => {
                self.store
                    .merge(&["registration"], json!({ "access_token": access_token }));
                self.store.set(&["route"], json!("/registration"));
                vec![]
            }
            Action::UserCreated => {
                self.store.merge(&["session"], json!({ "logged_in": true }));
                self.store.set(&["route"], json!("/retros/new"));
                vec![]
            }
            Action::ApiCallFailed { status } => {
                self.store.merge(&["ui"], json!({ "api_error": status }));
                vec![]
            }
            Action::ShowAlert { message } => {
                self.store.set(&["alert"], json!({ "message": message }));
                vec![]
            }

            // ---------------------------------------------------------
            // Cache operations
            // ---------------------------------------------------------
            Action::SetAuthToken { auth_token } => {
                self.cache.set_auth_token(&auth_token);
                vec![]
            }
            Action::SetApiToken { slug, api_token } => {
                self.cache.set_api_token(&slug, &api_token);
                vec![]
            }
            Action::MigrateApiToken { old_slug, new_slug } => {
                self.cache.migrate_api_token(&old_slug, &new_slug);
                vec![]
            }
            Action::MarkRetroLoginNeeded { slug, changed } => {
                self.cache.mark_login_needed(&slug, changed);
                vec![]
            }
            Action::SetHomeTermsDismissed => {
                self.cache.set_home_terms_dismissed();
                vec![]
            }
            Action::SetRetroTermsDismissed { slug } => {
                self.cache.set_retro_terms_dismissed(&slug);
                vec![]
            }
            Action::ReloadLocalStorage => {
                self.cache.reload();
                vec![]
            }
            Action::ClearLocalStorage => {
                self.cache.clear();
                vec![]
            }
        }
    }

    // -----------------------------------------------------------------
    // State-tree helpers
    // -----------------------------------------------------------------

    fn put_retro(&mut self, mut retro: Retro) {
        retro.sort_items();
        self.store.set(
            &["retro"],
            serde_json::to_value(retro).expect("a retro serializes"),
        );
    }

    fn mutate_retro(&mut self, mutate: impl FnOnce(&mut Retro)) {
        let Some(mut retro) = self.store.get_as::<Retro>(&["retro"]) else {
            return;
        };
        mutate(&mut retro);
        self.put_retro(retro);
    }
}

// ---------------------------------------------------------------------
// Shared response shapes
// ---------------------------------------------------------------------

/// Standard handling for operations whose success body is an
/// `{"item": ...}` envelope.
fn item_response(
    op: &'static str,
    retro_id: String,
    result: Result<ApiResponse, TransportError>,
    on_success: impl FnOnce(Item, String) -> Action,
) -> Vec<Action> {
    match outcome(result) {
        Outcome::Response(response) => match classify(response.status) {
            StatusClass::Success => match parse_item(&response.body) {
                Some(item) => vec![on_success(item, retro_id)],
                None => malformed(op, &response),
            },
            StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
            StatusClass::NotFound => vec![Action::RetroNotFound],
            StatusClass::ValidationFailed | StatusClass::OtherFailure => failed(&response),
        },
        Outcome::TransportFailed => transport_failed(),
    }
}

/// Standard handling for operations whose success body is an
/// `{"action_item": ...}` envelope.
fn action_item_response(
    op: &'static str,
    retro_id: String,
    result: Result<ApiResponse, TransportError>,
    on_success: impl FnOnce(ActionItem) -> Action,
) -> Vec<Action> {
    match outcome(result) {
        Outcome::Response(response) => match classify(response.status) {
            StatusClass::Success => match parse_action_item(&response.body) {
                Some(action_item) => vec![on_success(action_item)],
                None => malformed(op, &response),
            },
            StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
            StatusClass::NotFound => vec![Action::RetroNotFound],
            StatusClass::ValidationFailed | StatusClass::OtherFailure => failed(&response),
        },
        Outcome::TransportFailed => transport_failed(),
    }
}

/// Standard handling for discussion operations whose success body is the
/// full `{"retro": ...}` envelope.
fn discussion_response(
    op: &'static str,
    retro_id: String,
    result: Result<ApiResponse, TransportError>,
) -> Vec<Action> {
    match outcome(result) {
        Outcome::Response(response) => match classify(response.status) {
            StatusClass::Success => match parse_retro(&response.body) {
                Some(retro) => vec![Action::RetroItemSuccessfullyHighlighted { retro }],
                None => malformed(op, &response),
            },
            StatusClass::NeedsAuth => vec![Action::RequireRetroLogin { retro_id }],
            StatusClass::NotFound => vec![Action::RetroNotFound],
            StatusClass::ValidationFailed | StatusClass::OtherFailure => failed(&response),
        },
        Outcome::TransportFailed => transport_failed(),
    }
}

// ---------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------

enum Outcome {
    Response(ApiResponse),
    TransportFailed,
}

fn outcome(result: Result<ApiResponse, TransportError>) -> Outcome {
    match result {
        Ok(response) => Outcome::Response(response),
        Err(e) => {
            tracing::warn!(error = %e, "API call failed at the transport level");
            Outcome::TransportFailed
        }
    }
}

fn parse_retro(body: &Value) -> Option<Retro> {
    serde_json::from_value(body.get("retro")?.clone()).ok()
}

fn parse_item(body: &Value) -> Option<Item> {
    serde_json::from_value(body.get("item")?.clone()).ok()
}

fn parse_action_item(body: &Value) -> Option<ActionItem> {
    serde_json::from_value(body.get("action_item")?.clone()).ok()
}

fn errors_of(body: &Value) -> Value {
    body.get("errors").cloned().unwrap_or(Value::Null)
}

fn failed(response: &ApiResponse) -> Vec<Action> {
    vec![Action::ApiCallFailed {
        status: Some(response.status),
    }]
}

fn transport_failed() -> Vec<Action> {
    vec![Action::ApiCallFailed { status: None }]
}

fn malformed(op: &'static str, response: &ApiResponse) -> Vec<Action> {
    tracing::error!(op, status = response.status, "Malformed success body");
    failed(response)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use huddle_core::Category;
    use serde_json::json;

    use super::*;
    use crate::api::{ApiRequest, AuthScheme, Transport};
    use crate::cache::MemoryStore;

    /// Transport serving canned responses in order and recording every
    /// request it sees.
    #[derive(Clone, Default)]
    struct MockTransport {
        responses: Arc<Mutex<VecDeque<Result<ApiResponse, String>>>>,
        requests: Arc<Mutex<Vec<ApiRequest>>>,
    }

    impl MockTransport {
        fn respond(&self, status: u16, body: Value) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(ApiResponse { status, body }));
        }

        fn fail_transport(&self) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err("connection refused".to_string()));
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("a canned response for every request")
                .map_err(TransportError)
        }
    }

    fn dispatcher() -> (Dispatcher, MockTransport) {
        let transport = MockTransport::default();
        let api = RetroApi::new(Box::new(transport.clone()));
        let cache = LocalCache::new(Box::new(MemoryStore::new()));
        (Dispatcher::new(api, cache), transport)
    }

    fn kinds(actions: &[Action]) -> Vec<&'static str> {
        actions.iter().map(Action::kind).collect()
    }

    fn retro_body(slug: &str) -> Value {
        json!({ "retro": {
            "id": 1,
            "slug": slug,
            "name": "Team Retro",
            "items": [],
            "action_items": [],
        }})
    }

    fn item_body(id: i64, description: &str) -> Value {
        json!({ "item": {
            "id": id,
            "category": "happy",
            "description": description,
            "vote_count": 0,
            "done": false,
            "created_at": "2024-01-01T00:00:00Z",
        }})
    }

    // -----------------------------------------------------------------
    // End-to-end item creation
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn create_retro_item_maps_success_to_created_notice() {
        let (mut d, transport) = dispatcher();
        transport.respond(200, item_body(9, "x"));

        let followups = d
            .handle(Action::CreateRetroItem {
                retro_id: "r1".into(),
                category: Category::Happy,
                description: "x".into(),
            })
            .await;

        assert_eq!(followups.len(), 1, "exactly one follow-up");
        match &followups[0] {
            Action::RetroItemSuccessfullyCreated { item, retro_id } => {
                assert_eq!(item.id, 9);
                assert_eq!(item.description, "x");
                assert_eq!(item.category, Category::Happy);
                assert_eq!(retro_id, "r1");
            }
            other => panic!("unexpected follow-up: {}", other.kind()),
        }

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, reqwest::Method::POST);
        assert_eq!(requests[0].path, "/retros/r1/items");
    }

    #[tokio::test]
    async fn create_retro_item_lands_in_sorted_state_tree() {
        let (mut d, transport) = dispatcher();
        d.dispatch(Action::RetroDataReceived {
            payload: json!({ "retro": {
                "id": 1, "slug": "r1", "name": "R",
                "items": [{
                    "id": 1, "category": "sad", "description": "old",
                    "vote_count": 5, "done": false,
                    "created_at": "2024-01-01T00:00:00Z",
                }],
                "action_items": [],
            }}),
        })
        .await;

        transport.respond(200, item_body(9, "x"));
        d.dispatch(Action::CreateRetroItem {
            retro_id: "r1".into(),
            category: Category::Happy,
            description: "x".into(),
        })
        .await;

        let retro: Retro = d.store().get_as(&["retro"]).expect("retro in tree");
        assert_eq!(retro.items.len(), 2);
        // The 5-vote item stays first; the new zero-vote item sorts last.
        assert_eq!(retro.items[0].id, 1);
        assert_eq!(retro.items[1].id, 9);
    }

    // -----------------------------------------------------------------
    // Classification table
    // -----------------------------------------------------------------

    /// Every (operation, status) pair yields exactly the mapped follow-up
    /// kinds and nothing else.
    #[tokio::test]
    async fn classification_table() {
        let sad_item = || Item {
            id: 4,
            category: Category::Sad,
            description: "d".into(),
            vote_count: 0,
            done: false,
            created_at: chrono::Utc::now(),
        };
        let get_retro = || Action::GetRetro { id: "r1".into() };
        let create_item = || Action::CreateRetroItem {
            retro_id: "r1".into(),
            category: Category::Happy,
            description: "x".into(),
        };
        let login = || Action::LoginToRetro {
            retro_id: "r1".into(),
            password: "pw".into(),
        };
        let create_retro = || Action::CreateRetro {
            name: "n".into(),
            slug: "r1".into(),
            password: None,
        };
        let vote = || Action::VoteRetroItem {
            retro_id: "r1".into(),
            item: sad_item(),
        };
        let archive = || Action::ArchiveRetro {
            retro_id: "r1".into(),
            send_archive_email: true,
        };
        let settings = || Action::UpdateRetroSettings {
            retro_id: "r1".into(),
            old_slug: "r1".into(),
            name: Some("n".into()),
            new_slug: None,
            is_private: None,
            video_link: None,
        };
        let password = || Action::UpdateRetroPassword {
            retro_id: "r1".into(),
            current_password: "a".into(),
            new_password: "b".into(),
        };
        let session = || Action::CreateSession {
            access_token: "at".into(),
        };
        let get_archive = || Action::GetRetroArchive {
            retro_id: "r1".into(),
            archive_id: 7,
        };

        let cases: Vec<(Action, u16, Value, Vec<&str>)> = vec![
            // getRetro
            (get_retro(), 200, retro_body("r1"), vec!["retroSuccessfullyFetched"]),
            (get_retro(), 403, json!({}), vec!["requireRetroLogin"]),
            (get_retro(), 404, json!({}), vec!["retroNotFound"]),
            (get_retro(), 422, json!({}), vec!["apiCallFailed"]),
            (get_retro(), 500, json!({}), vec!["apiCallFailed"]),
            // createRetro
            (create_retro(), 201, json!({"retro": retro_body("r1")["retro"].clone(), "token": "T"}), vec!["retroSuccessfullyCreated"]),
            (create_retro(), 422, json!({"errors": {"slug": ["taken"]}}), vec!["retroUnsuccessfullyCreated"]),
            (create_retro(), 403, json!({}), vec!["apiCallFailed"]),
            (create_retro(), 404, json!({}), vec!["apiCallFailed"]),
            (create_retro(), 500, json!({}), vec!["apiCallFailed"]),
            // createRetroItem
            (create_item(), 200, item_body(9, "x"), vec!["retroItemSuccessfullyCreated"]),
            (create_item(), 403, json!({}), vec!["requireRetroLogin"]),
            (create_item(), 404, json!({}), vec!["retroNotFound"]),
            (create_item(), 422, json!({}), vec!["apiCallFailed"]),
            (create_item(), 502, json!({}), vec!["apiCallFailed"]),
            // loginToRetro: every failure class is a failed login
            (login(), 200, json!({"token": "T"}), vec!["retroSuccessfullyLoggedIn"]),
            (login(), 403, json!({}), vec!["retroLoginFailed"]),
            (login(), 404, json!({}), vec!["retroLoginFailed"]),
            (login(), 422, json!({}), vec!["retroLoginFailed"]),
            (login(), 500, json!({}), vec!["retroLoginFailed"]),
            // voteRetroItem
            (vote(), 200, item_body(4, "d"), vec!["retroItemSuccessfullyVoted"]),
            (vote(), 403, json!({}), vec!["requireRetroLogin"]),
            // archiveRetro
            (archive(), 200, retro_body("r1"), vec!["archiveRetroSuccessfullyDone"]),
            (archive(), 403, json!({}), vec!["requireRetroLogin"]),
            (archive(), 404, json!({}), vec!["retroNotFound"]),
            // updateRetroSettings
            (settings(), 200, retro_body("r1"), vec!["retroSettingsSuccessfullyUpdated", "showAlert"]),
            (settings(), 403, json!({}), vec!["requireRetroLogin"]),
            (settings(), 422, json!({"errors": {"slug": ["taken"]}}), vec!["retroSettingsUnsuccessfullyUpdated"]),
            // updateRetroPassword
            (password(), 200, json!({"token": "T2"}), vec!["retroPasswordSuccessfullyUpdated", "showAlert"]),
            (password(), 422, json!({"errors": {"current_password": ["is incorrect"]}}), vec!["retroPasswordUnsuccessfullyUpdated"]),
            // createSession
            (session(), 200, json!({"auth_token": "A", "new_user": true}), vec!["userLoggedInSuccessfully"]),
            (session(), 404, json!({}), vec!["redirectToRegistration"]),
            (session(), 500, json!({}), vec!["apiCallFailed"]),
            // getRetroArchive: a missing archive is notFound, not retroNotFound
            (get_archive(), 200, json!({"retro": {"id": 7}}), vec!["retroArchiveSuccessfullyFetched"]),
            (get_archive(), 404, json!({}), vec!["notFound"]),
            (get_archive(), 403, json!({}), vec!["requireRetroLogin"]),
        ];

        for (action, status, body, expected) in cases {
            let (mut d, transport) = dispatcher();
            let op = action.kind();
            transport.respond(status, body);

            let followups = d.handle(action).await;

            assert_eq!(
                kinds(&followups),
                expected,
                "({op}, {status}) produced the wrong follow-ups"
            );
        }
    }

    #[tokio::test]
    async fn transport_failure_maps_to_statusless_api_call_failed() {
        let (mut d, transport) = dispatcher();
        transport.fail_transport();

        let followups = d.handle(Action::GetRetro { id: "r1".into() }).await;

        assert_eq!(followups, vec![Action::ApiCallFailed { status: None }]);
    }

    // -----------------------------------------------------------------
    // Token handling
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn rename_migrates_token_before_the_notice_is_visible() {
        let (mut d, transport) = dispatcher();
        d.dispatch(Action::SetApiToken {
            slug: "old-slug".into(),
            api_token: "T".into(),
        })
        .await;

        transport.respond(200, retro_body("new-slug"));
        let followups = d
            .handle(Action::UpdateRetroSettings {
                retro_id: "old-slug".into(),
                old_slug: "old-slug".into(),
                name: Some("the new retro name".into()),
                new_slug: Some("new-slug".into()),
                is_private: None,
                video_link: None,
            })
            .await;

        // Phase 1 happened already: the token lives under the new slug
        // and the old key is gone, while the settings-updated notice is
        // still unconsumed.
        assert_eq!(d.cache().api_token("new-slug"), Some("T"));
        assert_eq!(d.cache().api_token("old-slug"), None);
        assert_eq!(
            kinds(&followups),
            vec!["retroSettingsSuccessfullyUpdated", "showAlert"]
        );
    }

    #[tokio::test]
    async fn rename_without_slug_change_keeps_the_token_key() {
        let (mut d, transport) = dispatcher();
        d.dispatch(Action::SetApiToken {
            slug: "same-slug".into(),
            api_token: "T".into(),
        })
        .await;

        transport.respond(200, retro_body("same-slug"));
        d.dispatch(Action::UpdateRetroSettings {
            retro_id: "same-slug".into(),
            old_slug: "same-slug".into(),
            name: Some("renamed".into()),
            new_slug: None,
            is_private: None,
            video_link: None,
        })
        .await;

        assert_eq!(d.cache().api_token("same-slug"), Some("T"));
    }

    #[tokio::test]
    async fn created_retro_stores_its_token_under_the_server_slug() {
        let (mut d, transport) = dispatcher();
        transport.respond(
            201,
            json!({"retro": retro_body("fresh")["retro"].clone(), "token": "T9"}),
        );

        d.dispatch(Action::CreateRetro {
            name: "Fresh".into(),
            slug: "fresh".into(),
            password: None,
        })
        .await;

        assert_eq!(d.cache().api_token("fresh"), Some("T9"));
        assert_eq!(
            d.store().get(&["route"]),
            Some(&json!("/retros/fresh"))
        );
    }

    #[tokio::test]
    async fn requests_carry_the_cached_retro_token_as_bearer() {
        let (mut d, transport) = dispatcher();
        d.dispatch(Action::SetApiToken {
            slug: "r1".into(),
            api_token: "SECRET".into(),
        })
        .await;

        transport.respond(200, retro_body("r1"));
        d.dispatch(Action::GetRetro { id: "r1".into() }).await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].auth, AuthScheme::Bearer("SECRET".into()));
    }

    #[tokio::test]
    async fn mark_login_needed_is_idempotent_through_the_dispatcher() {
        let (mut d, _transport) = dispatcher();
        d.dispatch(Action::SetApiToken {
            slug: "s".into(),
            api_token: "T".into(),
        })
        .await;

        d.dispatch(Action::MarkRetroLoginNeeded {
            slug: "s".into(),
            changed: false,
        })
        .await;
        d.dispatch(Action::MarkRetroLoginNeeded {
            slug: "s".into(),
            changed: false,
        })
        .await;

        assert_eq!(d.cache().api_token("s"), None);
        assert!(d.cache().login_needed("s").is_some());
    }

    #[tokio::test]
    async fn a_403_drops_the_token_and_routes_to_login() {
        let (mut d, transport) = dispatcher();
        d.dispatch(Action::SetApiToken {
            slug: "r1".into(),
            api_token: "stale".into(),
        })
        .await;

        transport.respond(403, json!({}));
        d.dispatch(Action::GetRetro { id: "r1".into() }).await;

        assert_eq!(d.cache().api_token("r1"), None);
        assert!(d.cache().login_needed("r1").is_some());
        assert_eq!(
            d.store().get(&["route"]),
            Some(&json!("/retros/r1/login"))
        );
    }

    // -----------------------------------------------------------------
    // Broadcast reconciliation
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn broadcast_payloads_are_last_write_wins() {
        let (mut d, _transport) = dispatcher();

        d.dispatch(Action::RetroDataReceived {
            payload: json!({"retro": {"id": 1, "slug": "r1", "name": "first"}}),
        })
        .await;
        d.dispatch(Action::RetroDataReceived {
            payload: json!({"retro": {"id": 1, "slug": "r1", "name": "second"}}),
        })
        .await;

        let retro: Retro = d.store().get_as(&["retro"]).unwrap();
        assert_eq!(retro.name, "second");
    }

    #[tokio::test]
    async fn unrecognized_broadcast_payload_is_ignored() {
        let (mut d, _transport) = dispatcher();

        d.dispatch(Action::RetroDataReceived {
            payload: json!({"something": "else"}),
        })
        .await;

        assert_eq!(d.store().get(&["retro"]), None);
    }

    #[tokio::test]
    async fn broadcast_items_are_sorted_for_display() {
        let (mut d, _transport) = dispatcher();

        d.dispatch(Action::RetroDataReceived {
            payload: json!({"retro": {
                "id": 1, "slug": "r1", "name": "R",
                "items": [
                    {"id": 1, "category": "happy", "description": "few",
                     "vote_count": 1, "done": false,
                     "created_at": "2024-01-02T00:00:00Z"},
                    {"id": 2, "category": "sad", "description": "many",
                     "vote_count": 7, "done": false,
                     "created_at": "2024-01-03T00:00:00Z"},
                ],
                "action_items": [],
            }}),
        })
        .await;

        let retro: Retro = d.store().get_as(&["retro"]).unwrap();
        assert_eq!(retro.items[0].id, 2, "highest votes first");
    }
}
