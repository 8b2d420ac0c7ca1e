//! Overlay Store - sole owner of the overlay collection
//!
//! Every mutation is applied locally first and hands back a [`SyncOp`] for the
//! caller to send to the backend. The backend's answer comes back through
//! [`OverlayStore::reconcile`], which never rolls a local change back: a failed
//! sync leaves the local state as it is and reports [`SyncOutcome::KeptLocal`].

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::{RemoteError, StoreError};
use crate::types::{Overlay, OverlayDraft, OverlayId, OverlayPatch, Position};

/// One pending backend write, tagged with the local revision it carries
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOp {
    pub id: OverlayId,
    pub revision: u64,
    pub action: SyncAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    Create { overlay: Overlay },
    Update { remote_key: String, overlay: Overlay },
    Delete { remote_key: String },
}

impl SyncAction {
    pub fn label(&self) -> &'static str {
        match self {
            SyncAction::Create { .. } => "create",
            SyncAction::Update { .. } => "update",
            SyncAction::Delete { .. } => "delete",
        }
    }
}

/// Successful backend answer to a [`SyncOp`]
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAck {
    Created { remote_key: String },
    /// The backend may echo the stored overlay back
    Updated { echo: Option<Overlay> },
    Deleted,
}

/// What reconciling a sync result did to the local collection
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Backend and local state agree
    Confirmed,
    /// Local state moved on while the sync was in flight. `follow_up` carries
    /// the write that brings the backend up to date, if one is needed.
    Superseded { follow_up: Option<SyncOp> },
    /// Sync failed. The local mutation is retained and nothing is surfaced.
    KeptLocal(RemoteError),
}

#[derive(Debug, Clone)]
struct Entry {
    overlay: Overlay,
    revision: u64,
    /// Backend identifier, once the backend knows about this overlay
    remote_key: Option<String>,
    create_in_flight: bool,
}

#[derive(Debug, Default)]
pub struct OverlayStore {
    entries: Vec<Entry>,
    next_local: u64,
    /// Local ids deleted while their create was still in flight
    pending_deletes: HashSet<OverlayId>,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlays in insertion order
    pub fn list(&self) -> Vec<Overlay> {
        self.entries.iter().map(|e| e.overlay.clone()).collect()
    }

    pub fn get(&self, id: &OverlayId) -> Option<&Overlay> {
        self.entry(id).map(|e| &e.overlay)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Backend identifier recorded for an overlay
    pub fn remote_key(&self, id: &OverlayId) -> Option<&str> {
        self.entry(id).and_then(|e| e.remote_key.as_deref())
    }

    /// Replace the whole collection with overlays the backend already stores.
    /// Their backend id doubles as the remote key.
    pub fn replace_all(&mut self, overlays: Vec<Overlay>) {
        self.pending_deletes.clear();
        self.entries = overlays
            .into_iter()
            .map(|mut overlay| {
                overlay.position = overlay.position.clamped();
                Entry {
                    remote_key: Some(overlay.id.as_str().to_string()),
                    overlay,
                    revision: 0,
                    create_in_flight: false,
                }
            })
            .collect();
        debug!(count = self.entries.len(), "Overlay collection replaced");
    }

    /// Fold a backend overlay list into the collection. Entries created or
    /// changed locally win over the list; the rest is taken from the backend.
    pub fn merge_remote(&mut self, overlays: Vec<Overlay>) {
        let mut local: Vec<Entry> = std::mem::take(&mut self.entries)
            .into_iter()
            .filter(|e| e.revision > 0 || e.create_in_flight)
            .collect();

        for mut overlay in overlays {
            let remote_key = overlay.id.as_str().to_string();
            if let Some(index) = local
                .iter()
                .position(|e| e.remote_key.as_deref() == Some(remote_key.as_str()))
            {
                self.entries.push(local.remove(index));
                continue;
            }
            overlay.position = overlay.position.clamped();
            self.entries.push(Entry {
                overlay,
                revision: 0,
                remote_key: Some(remote_key),
                create_in_flight: false,
            });
        }

        debug!(count = self.entries.len(), local_only = local.len(), "Overlay list merged");
        self.entries.extend(local);
    }

    /// Add overlays that exist only locally (no backend copy yet)
    pub fn seed_local(&mut self, drafts: Vec<OverlayDraft>) {
        for draft in drafts {
            let id = self.mint_id();
            self.entries.push(Entry {
                overlay: Overlay::from_draft(id, draft),
                revision: 0,
                remote_key: None,
                create_in_flight: false,
            });
        }
    }

    /// Validate and insert a new overlay under a fresh local id
    pub fn create(&mut self, draft: OverlayDraft) -> Result<(Overlay, Option<SyncOp>), StoreError> {
        draft.validate()?;

        let id = self.mint_id();
        let overlay = Overlay::from_draft(id.clone(), draft);
        self.entries.push(Entry {
            overlay: overlay.clone(),
            revision: 1,
            remote_key: None,
            create_in_flight: true,
        });

        debug!(overlay = %id, name = %overlay.name, "Overlay created locally");
        let op = SyncOp {
            id,
            revision: 1,
            action: SyncAction::Create {
                overlay: overlay.clone(),
            },
        };
        Ok((overlay, Some(op)))
    }

    /// Apply a patch. The merged overlay is validated before anything changes.
    pub fn update(
        &mut self,
        id: &OverlayId,
        patch: OverlayPatch,
    ) -> Result<(Overlay, Option<SyncOp>), StoreError> {
        let current = self.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let merged = patch.merged_with(current);
        merged.validate()?;

        self.mutate(id, |overlay| *overlay = Overlay::from_draft(overlay.id.clone(), merged))
    }

    pub fn set_visible(
        &mut self,
        id: &OverlayId,
        visible: bool,
    ) -> Result<(Overlay, Option<SyncOp>), StoreError> {
        self.mutate(id, |overlay| overlay.visible = visible)
    }

    /// Move an overlay. The position is clamped into range, never rejected.
    pub fn set_position(
        &mut self,
        id: &OverlayId,
        position: Position,
    ) -> Result<(Overlay, Option<SyncOp>), StoreError> {
        let position = position.clamped();
        self.mutate(id, |overlay| overlay.position = position)
    }

    /// Change an overlay's place in the stacking order
    pub fn reorder(
        &mut self,
        id: &OverlayId,
        z_index: i32,
    ) -> Result<(Overlay, Option<SyncOp>), StoreError> {
        self.mutate(id, |overlay| overlay.z_index = z_index)
    }

    pub fn delete(&mut self, id: &OverlayId) -> Result<Option<SyncOp>, StoreError> {
        let index = self
            .entries
            .iter()
            .position(|e| &e.overlay.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let entry = self.entries.remove(index);

        debug!(overlay = %id, "Overlay deleted locally");
        if entry.create_in_flight {
            // The backend key is not known yet; the delete goes out once the create confirms
            self.pending_deletes.insert(id.clone());
            return Ok(None);
        }

        Ok(entry.remote_key.map(|remote_key| SyncOp {
            id: id.clone(),
            revision: entry.revision + 1,
            action: SyncAction::Delete { remote_key },
        }))
    }

    /// Fold a backend answer into the local collection
    pub fn reconcile(&mut self, op: &SyncOp, result: Result<SyncAck, RemoteError>) -> SyncOutcome {
        let ack = match result {
            Ok(ack) => ack,
            Err(err) => return self.keep_local(op, err),
        };

        match (&op.action, ack) {
            (SyncAction::Create { .. }, SyncAck::Created { remote_key }) => {
                self.confirm_create(op, remote_key)
            }
            (SyncAction::Update { .. }, SyncAck::Updated { echo }) => {
                let Some(entry) = self.entry_mut(&op.id) else {
                    return SyncOutcome::Superseded { follow_up: None };
                };
                if entry.revision != op.revision {
                    // A newer local write has its own sync in flight
                    return SyncOutcome::Superseded { follow_up: None };
                }
                if let Some(mut echo) = echo {
                    echo.id = entry.overlay.id.clone();
                    echo.position = echo.position.clamped();
                    entry.overlay = echo;
                }
                SyncOutcome::Confirmed
            }
            (SyncAction::Delete { .. }, SyncAck::Deleted) => SyncOutcome::Confirmed,
            (action, ack) => {
                let err = RemoteError::Unavailable(format!(
                    "unexpected acknowledgement {ack:?} for {}",
                    action.label()
                ));
                self.keep_local(op, err)
            }
        }
    }

    fn confirm_create(&mut self, op: &SyncOp, remote_key: String) -> SyncOutcome {
        if self.pending_deletes.remove(&op.id) {
            debug!(overlay = %op.id, remote_key = %remote_key, "Overlay removed before its create confirmed");
            return SyncOutcome::Superseded {
                follow_up: Some(SyncOp {
                    id: op.id.clone(),
                    revision: op.revision + 1,
                    action: SyncAction::Delete { remote_key },
                }),
            };
        }

        let Some(entry) = self.entry_mut(&op.id) else {
            return SyncOutcome::Superseded { follow_up: None };
        };
        entry.remote_key = Some(remote_key.clone());
        entry.create_in_flight = false;

        if entry.revision == op.revision {
            return SyncOutcome::Confirmed;
        }

        debug!(overlay = %op.id, revision = entry.revision, "Local edits made during create, sending follow-up");
        SyncOutcome::Superseded {
            follow_up: Some(SyncOp {
                id: op.id.clone(),
                revision: entry.revision,
                action: SyncAction::Update {
                    remote_key,
                    overlay: entry.overlay.clone(),
                },
            }),
        }
    }

    fn keep_local(&mut self, op: &SyncOp, err: RemoteError) -> SyncOutcome {
        if let SyncAction::Create { .. } = op.action {
            self.pending_deletes.remove(&op.id);
            if let Some(entry) = self.entry_mut(&op.id) {
                entry.create_in_flight = false;
            }
        }

        warn!(
            overlay = %op.id,
            operation = op.action.label(),
            error = %err,
            "Overlay sync failed, keeping local state"
        );
        SyncOutcome::KeptLocal(err)
    }

    /// Apply a local change, bump the revision and work out the sync it needs
    fn mutate(
        &mut self,
        id: &OverlayId,
        change: impl FnOnce(&mut Overlay),
    ) -> Result<(Overlay, Option<SyncOp>), StoreError> {
        let entry = self
            .entry_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        change(&mut entry.overlay);
        entry.revision += 1;

        let action = if entry.create_in_flight {
            None
        } else if let Some(remote_key) = &entry.remote_key {
            Some(SyncAction::Update {
                remote_key: remote_key.clone(),
                overlay: entry.overlay.clone(),
            })
        } else {
            // Never reached the backend; try creating it again
            entry.create_in_flight = true;
            Some(SyncAction::Create {
                overlay: entry.overlay.clone(),
            })
        };

        let op = action.map(|action| SyncOp {
            id: id.clone(),
            revision: entry.revision,
            action,
        });
        Ok((entry.overlay.clone(), op))
    }

    fn mint_id(&mut self) -> OverlayId {
        self.next_local += 1;
        OverlayId::local(self.next_local)
    }

    fn entry(&self, id: &OverlayId) -> Option<&Entry> {
        self.entries.iter().find(|e| &e.overlay.id == id)
    }

    fn entry_mut(&mut self, id: &OverlayId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| &e.overlay.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::types::IconRef;

    fn offline() -> RemoteError {
        RemoteError::Unavailable("connection refused".to_string())
    }

    fn loaded_store() -> OverlayStore {
        let mut store = OverlayStore::new();
        store.replace_all(vec![Overlay::from_draft(
            OverlayId::new("srv-1"),
            OverlayDraft::text("LIVE", "LIVE").at(10.0, 10.0),
        )]);
        store
    }

    #[test]
    fn test_create_assigns_local_ids_and_emits_create() {
        let mut store = OverlayStore::new();
        let (first, op) = store.create(OverlayDraft::text("LIVE", "LIVE")).unwrap();
        let (second, _) = store.create(OverlayDraft::icon("Heart", IconRef::Heart)).unwrap();

        assert_eq!(first.id.as_str(), "local-1");
        assert_eq!(second.id.as_str(), "local-2");
        assert!(first.id.is_local());
        let op = op.unwrap();
        assert!(matches!(op.action, SyncAction::Create { .. }));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_invalid_create_leaves_collection_unchanged() {
        let mut store = loaded_store();
        let before = store.list();

        let err = store
            .create(OverlayDraft::text("Bad", "x").at(96.0, 0.0))
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Validation(ValidationError { field: "position.x", .. })
        ));
        assert_eq!(store.list(), before);
    }

    #[test]
    fn test_invalid_update_does_not_mutate() {
        let mut store = loaded_store();
        let id = OverlayId::new("srv-1");
        let patch = OverlayPatch {
            name: Some(String::new()),
            visible: Some(false),
            ..Default::default()
        };

        assert!(store.update(&id, patch).is_err());
        assert!(store.get(&id).unwrap().visible);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let mut store = loaded_store();
        let missing = OverlayId::new("nope");
        assert_eq!(
            store.set_visible(&missing, false).unwrap_err(),
            StoreError::NotFound(missing.clone())
        );
        assert_eq!(store.delete(&missing).unwrap_err(), StoreError::NotFound(missing));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_toggle_visibility_twice_with_failing_sync() {
        let mut store = loaded_store();
        let id = OverlayId::new("srv-1");

        for expected in [false, true] {
            let (overlay, op) = store.set_visible(&id, expected).unwrap();
            let op = op.unwrap();
            assert!(matches!(op.action, SyncAction::Update { ref remote_key, .. } if remote_key == "srv-1"));
            assert_eq!(overlay.visible, expected);

            let outcome = store.reconcile(&op, Err(offline()));
            assert_eq!(outcome, SyncOutcome::KeptLocal(offline()));
            assert_eq!(store.get(&id).unwrap().visible, expected);
        }
    }

    #[test]
    fn test_set_position_clamps() {
        let mut store = loaded_store();
        let id = OverlayId::new("srv-1");
        let (overlay, _) = store.set_position(&id, Position::new(140.0, -3.0)).unwrap();
        assert_eq!(overlay.position, Position::new(95.0, 0.0));
    }

    #[test]
    fn test_create_confirm_records_remote_key() {
        let mut store = OverlayStore::new();
        let (overlay, op) = store.create(OverlayDraft::text("LIVE", "LIVE")).unwrap();
        let op = op.unwrap();

        let outcome = store.reconcile(
            &op,
            Ok(SyncAck::Created {
                remote_key: "srv-9".to_string(),
            }),
        );

        assert_eq!(outcome, SyncOutcome::Confirmed);
        assert_eq!(store.remote_key(&overlay.id), Some("srv-9"));
        // The caller-visible id never changes
        assert!(store.get(&overlay.id).is_some());
    }

    #[test]
    fn test_mutation_during_create_sends_one_follow_up() {
        let mut store = OverlayStore::new();
        let (overlay, create) = store.create(OverlayDraft::text("LIVE", "LIVE")).unwrap();
        let create = create.unwrap();

        let (_, first) = store.set_position(&overlay.id, Position::new(20.0, 20.0)).unwrap();
        let (_, second) = store.set_position(&overlay.id, Position::new(30.0, 40.0)).unwrap();
        assert!(first.is_none() && second.is_none());

        let outcome = store.reconcile(
            &create,
            Ok(SyncAck::Created {
                remote_key: "srv-2".to_string(),
            }),
        );
        match outcome {
            SyncOutcome::Superseded {
                follow_up:
                    Some(SyncOp {
                        action: SyncAction::Update { remote_key, overlay },
                        ..
                    }),
            } => {
                assert_eq!(remote_key, "srv-2");
                assert_eq!(overlay.position, Position::new(30.0, 40.0));
            }
            other => panic!("expected a follow-up update, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_during_create_deletes_after_confirm() {
        let mut store = OverlayStore::new();
        let (overlay, create) = store.create(OverlayDraft::text("LIVE", "LIVE")).unwrap();
        assert_eq!(store.delete(&overlay.id).unwrap(), None);
        assert!(store.is_empty());

        let outcome = store.reconcile(
            &create.unwrap(),
            Ok(SyncAck::Created {
                remote_key: "srv-3".to_string(),
            }),
        );
        match outcome {
            SyncOutcome::Superseded {
                follow_up: Some(SyncOp {
                    action: SyncAction::Delete { remote_key },
                    ..
                }),
            } => assert_eq!(remote_key, "srv-3"),
            other => panic!("expected follow-up delete, got {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_create_is_reissued_on_next_mutation() {
        let mut store = OverlayStore::new();
        let (overlay, create) = store.create(OverlayDraft::text("LIVE", "LIVE")).unwrap();
        let outcome = store.reconcile(&create.unwrap(), Err(offline()));
        assert!(matches!(outcome, SyncOutcome::KeptLocal(_)));
        assert!(store.get(&overlay.id).is_some());

        let (_, op) = store.set_visible(&overlay.id, false).unwrap();
        let op = op.unwrap();
        match op.action {
            SyncAction::Create { overlay } => assert!(!overlay.visible),
            other => panic!("expected re-issued create, got {other:?}"),
        }
    }

    #[test]
    fn test_late_echo_does_not_overwrite_newer_local_state() {
        let mut store = loaded_store();
        let id = OverlayId::new("srv-1");
        let (stale_overlay, stale_op) = store.set_position(&id, Position::new(20.0, 20.0)).unwrap();
        store.set_position(&id, Position::new(60.0, 60.0)).unwrap();

        let outcome = store.reconcile(
            &stale_op.unwrap(),
            Ok(SyncAck::Updated {
                echo: Some(stale_overlay),
            }),
        );

        assert_eq!(outcome, SyncOutcome::Superseded { follow_up: None });
        assert_eq!(store.get(&id).unwrap().position, Position::new(60.0, 60.0));
    }

    #[test]
    fn test_current_echo_is_applied_under_local_id() {
        let mut store = loaded_store();
        let id = OverlayId::new("srv-1");
        let (mut echo, op) = store.set_visible(&id, false).unwrap();
        echo.id = OverlayId::new("srv-1");
        echo.name = "LIVE (server)".to_string();

        let outcome = store.reconcile(&op.unwrap(), Ok(SyncAck::Updated { echo: Some(echo) }));
        assert_eq!(outcome, SyncOutcome::Confirmed);
        assert_eq!(store.get(&id).unwrap().name, "LIVE (server)");
    }

    #[test]
    fn test_delete_of_synced_overlay_emits_delete() {
        let mut store = loaded_store();
        let op = store.delete(&OverlayId::new("srv-1")).unwrap().unwrap();
        assert_eq!(
            op.action,
            SyncAction::Delete {
                remote_key: "srv-1".to_string()
            }
        );
        assert!(matches!(store.reconcile(&op, Err(offline())), SyncOutcome::KeptLocal(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_seeded_overlays_have_no_remote_copy() {
        let mut store = OverlayStore::new();
        store.seed_local(vec![OverlayDraft::text("LIVE", "LIVE")]);
        let id = store.list()[0].id.clone();
        assert_eq!(store.remote_key(&id), None);
        assert_eq!(store.delete(&id).unwrap(), None);
    }

    #[test]
    fn test_reorder_changes_z_index() {
        let mut store = loaded_store();
        let (overlay, op) = store.reorder(&OverlayId::new("srv-1"), 9).unwrap();
        assert_eq!(overlay.z_index, 9);
        assert!(op.is_some());
    }

    #[test]
    fn test_merge_keeps_local_changes() {
        let mut store = loaded_store();
        let edited = OverlayId::new("srv-1");
        store.set_position(&edited, Position::new(50.0, 50.0)).unwrap();
        let (created, _) = store.create(OverlayDraft::text("Mine", "x")).unwrap();

        store.merge_remote(vec![
            Overlay::from_draft(edited.clone(), OverlayDraft::text("LIVE", "LIVE").at(10.0, 10.0)),
            Overlay::from_draft(OverlayId::new("srv-2"), OverlayDraft::text("New", "NEW")),
        ]);

        let ids: Vec<String> = store.list().iter().map(|o| o.id.to_string()).collect();
        assert_eq!(ids, vec!["srv-1".to_string(), "srv-2".to_string(), created.id.to_string()]);
        assert_eq!(store.get(&edited).unwrap().position, Position::new(50.0, 50.0));
        assert_eq!(store.remote_key(&OverlayId::new("srv-2")), Some("srv-2"));
    }

    #[test]
    fn test_merge_replaces_untouched_entries() {
        let mut store = OverlayStore::new();
        store.seed_local(vec![OverlayDraft::text("Demo", "LIVE")]);
        store.merge_remote(vec![Overlay::from_draft(
            OverlayId::new("srv-1"),
            OverlayDraft::text("LIVE", "LIVE"),
        )]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].id, OverlayId::new("srv-1"));
    }
}
