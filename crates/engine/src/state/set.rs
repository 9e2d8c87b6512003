//! Set-like managed object state
//!
//! Membership-only content: the slice key is the member, the value a
//! sentinel marker. The exemplar of the family; map and list states follow
//! the same apply/dehydrate shape with richer value semantics.

use rustc_hash::FxHashSet;

use holon_core::{
    ActionCode, ClassId, LogicalValue, MutationEntry, MutationLog, ObjectId, ObjectType, Result,
    StateError,
};
use holon_store::{SliceFactory, StoreSlice};

use crate::context::TransactionContext;
use crate::facade::ObjectFacade;
use crate::state::{ensure_logical, note_reference_insert, ManagedObjectState};

/// Sentinel stored against every member; membership is the key itself.
const MEMBER_MARKER: LogicalValue = LogicalValue::Bool(true);

/// Managed state for set-like collections
pub struct SetObjectState {
    class_id: ClassId,
    object_id: ObjectId,
    members: Box<dyn StoreSlice>,
}

impl SetObjectState {
    /// New empty set state over a fresh slice.
    ///
    /// # Errors
    /// Store failures from slice creation propagate unchanged.
    pub fn create(
        class_id: ClassId,
        object_id: ObjectId,
        factory: &dyn SliceFactory,
    ) -> Result<Self> {
        Ok(Self {
            class_id,
            object_id,
            members: factory.create_slice(object_id)?,
        })
    }

    /// Recover a persisted set state by reopening its slice.
    ///
    /// # Errors
    /// Fatal lifecycle error if the slice does not exist; store failures
    /// propagate unchanged.
    pub fn reopen(
        class_id: ClassId,
        object_id: ObjectId,
        factory: &dyn SliceFactory,
    ) -> Result<Self> {
        Ok(Self {
            class_id,
            object_id,
            members: factory.open_slice(object_id)?,
        })
    }

    fn apply_entry(
        &mut self,
        object_id: ObjectId,
        entry: &MutationEntry,
        ctx: &mut TransactionContext,
    ) -> Result<()> {
        match entry.code() {
            ActionCode::Add => {
                let value = entry.param(0)?;
                note_reference_insert(ctx, object_id, value);
                self.members.put(value.clone(), MEMBER_MARKER)?;
            }
            ActionCode::Remove => {
                // Absent members are a legitimate no-op: the log may repeat
                // operations already reflected in an older version of the
                // state.
                self.members.remove(entry.param(0)?)?;
            }
            ActionCode::RemoveAll => {
                self.members.remove_all(entry.params())?;
            }
            ActionCode::Clear | ActionCode::Destroy => {
                self.members.clear()?;
            }
            other => {
                return Err(StateError::skew(format!(
                    "action {other} is not part of the set vocabulary"
                )));
            }
        }
        Ok(())
    }
}

impl ManagedObjectState for SetObjectState {
    fn object_type(&self) -> ObjectType {
        ObjectType::Set
    }

    fn class_id(&self) -> ClassId {
        self.class_id
    }

    fn apply(
        &mut self,
        object_id: ObjectId,
        log: &MutationLog,
        ctx: &mut TransactionContext,
    ) -> Result<()> {
        ensure_logical(log)?;
        for entry in log {
            self.apply_entry(object_id, entry, ctx)?;
        }
        Ok(())
    }

    fn dehydrate(&self, _object_id: ObjectId) -> Result<MutationLog> {
        let mut log = MutationLog::logical();
        for member in self.members.keys()? {
            log.push(MutationEntry::unary(ActionCode::Add, member));
        }
        Ok(log)
    }

    fn collect_references(&self, refs: &mut FxHashSet<ObjectId>) -> Result<()> {
        for member in self.members.keys()? {
            if let Some(id) = member.as_reference() {
                refs.insert(id);
            }
        }
        Ok(())
    }

    fn create_facade(
        &self,
        object_id: ObjectId,
        class_name: &str,
        limit: i64,
    ) -> Result<ObjectFacade> {
        let size = self.members.len()?;
        Ok(ObjectFacade::set_instance(
            object_id,
            class_name,
            self.members.keys()?,
            size,
            limit,
        ))
    }

    fn logical_content(&self) -> Result<Vec<(LogicalValue, LogicalValue)>> {
        self.members.entries()
    }

    fn destroy(&mut self) -> Result<()> {
        self.members.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BackReference, ChangeListener};
    use holon_core::RecordKind;
    use holon_store::HeapSliceFactory;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn add(v: impl Into<LogicalValue>) -> MutationEntry {
        MutationEntry::unary(ActionCode::Add, v.into())
    }

    fn remove(v: impl Into<LogicalValue>) -> MutationEntry {
        MutationEntry::unary(ActionCode::Remove, v.into())
    }

    fn fresh(factory: &HeapSliceFactory, id: u64) -> SetObjectState {
        SetObjectState::create(ClassId::new(1), ObjectId::new(id), factory).unwrap()
    }

    #[derive(Default)]
    struct CountingListener {
        events: Mutex<Vec<(ObjectId, Option<ObjectId>, ObjectId)>>,
    }

    impl ChangeListener for CountingListener {
        fn changed(&self, containing: ObjectId, previous: Option<ObjectId>, referenced: ObjectId) {
            self.events.lock().push((containing, previous, referenced));
        }
    }

    #[test]
    fn worked_example_from_the_contract() {
        // [Add a, Add b, Add a, Remove b] leaves {a}, size 1.
        let factory = HeapSliceFactory::new();
        let mut state = fresh(&factory, 1);
        let mut ctx = TransactionContext::detached();

        let log = MutationLog::of([add("a"), add("b"), add("a"), remove("b")]);
        state.apply(ObjectId::new(1), &log, &mut ctx).unwrap();

        assert_eq!(
            state.logical_content().unwrap(),
            vec![(LogicalValue::from("a"), LogicalValue::Bool(true))]
        );

        let dehydrated = state.dehydrate(ObjectId::new(1)).unwrap();
        assert_eq!(dehydrated.entries(), &[add("a")]);

        let f = state.create_facade(ObjectId::new(1), "Set", 0).unwrap();
        assert_eq!(f.sampled(), 0);
        assert_eq!(f.total_size, 1);

        let f = state.create_facade(ObjectId::new(1), "Set", -1).unwrap();
        assert_eq!(f.sampled(), 1);
        assert_eq!(f.total_size, 1);
    }

    #[test]
    fn removing_from_empty_state_is_not_an_error() {
        let factory = HeapSliceFactory::new();
        let mut state = fresh(&factory, 1);
        let mut ctx = TransactionContext::detached();

        state
            .apply(ObjectId::new(1), &MutationLog::of([remove("x")]), &mut ctx)
            .unwrap();
        assert!(state.logical_content().unwrap().is_empty());
    }

    #[test]
    fn remove_all_behaves_like_repeated_remove() {
        let factory = HeapSliceFactory::new();
        let mut state = fresh(&factory, 1);
        let mut ctx = TransactionContext::detached();

        let log = MutationLog::of([
            add("a"),
            add("b"),
            add("c"),
            MutationEntry::new(
                ActionCode::RemoveAll,
                [LogicalValue::from("a"), LogicalValue::from("z"), LogicalValue::from("c")],
            ),
        ]);
        state.apply(ObjectId::new(1), &log, &mut ctx).unwrap();

        let dehydrated = state.dehydrate(ObjectId::new(1)).unwrap();
        assert_eq!(dehydrated.entries(), &[add("b")]);
    }

    #[test]
    fn clear_and_destroy_entries_both_empty_content_only() {
        let factory = HeapSliceFactory::new();
        let mut state = fresh(&factory, 1);
        let mut ctx = TransactionContext::detached();

        for code in [ActionCode::Clear, ActionCode::Destroy] {
            state
                .apply(
                    ObjectId::new(1),
                    &MutationLog::of([add("a"), MutationEntry::nullary(code)]),
                    &mut ctx,
                )
                .unwrap();
            assert!(state.logical_content().unwrap().is_empty());
            // The slice must still be usable: Destroy-the-entry is not
            // destroy-the-lifecycle.
            state
                .apply(ObjectId::new(1), &MutationLog::of([add("again")]), &mut ctx)
                .unwrap();
            state
                .apply(
                    ObjectId::new(1),
                    &MutationLog::of([MutationEntry::nullary(ActionCode::Clear)]),
                    &mut ctx,
                )
                .unwrap();
        }
    }

    #[test]
    fn reference_add_emits_exactly_one_notification_and_back_reference() {
        let factory = HeapSliceFactory::new();
        let mut state = fresh(&factory, 1);
        let listener = Arc::new(CountingListener::default());
        let mut ctx = TransactionContext::new(listener.clone());

        let referenced = ObjectId::new(42);
        let log = MutationLog::of([
            add(LogicalValue::Reference(referenced)),
            add("plain-value"),
        ]);
        state.apply(ObjectId::new(1), &log, &mut ctx).unwrap();

        let events = listener.events.lock();
        assert_eq!(events.as_slice(), &[(ObjectId::new(1), None, referenced)]);
        assert_eq!(
            ctx.back_references(),
            &[BackReference {
                referenced,
                referrer: ObjectId::new(1)
            }]
        );
    }

    #[test]
    fn removing_a_reference_emits_no_retraction() {
        let factory = HeapSliceFactory::new();
        let mut state = fresh(&factory, 1);
        let listener = Arc::new(CountingListener::default());
        let mut ctx = TransactionContext::new(listener.clone());

        let referenced = ObjectId::new(42);
        state
            .apply(
                ObjectId::new(1),
                &MutationLog::of([
                    add(LogicalValue::Reference(referenced)),
                    remove(LogicalValue::Reference(referenced)),
                ]),
                &mut ctx,
            )
            .unwrap();

        // One event from the add, nothing from the remove; retraction is
        // the collector's job.
        assert_eq!(listener.events.lock().len(), 1);
        assert_eq!(ctx.back_references().len(), 1);
    }

    #[test]
    fn collect_references_reports_only_reference_members() {
        let factory = HeapSliceFactory::new();
        let mut state = fresh(&factory, 1);
        let mut ctx = TransactionContext::detached();

        state
            .apply(
                ObjectId::new(1),
                &MutationLog::of([
                    add("raw"),
                    add(LogicalValue::Reference(ObjectId::new(5))),
                    add(LogicalValue::Reference(ObjectId::new(6))),
                ]),
                &mut ctx,
            )
            .unwrap();

        let mut refs = FxHashSet::default();
        state.collect_references(&mut refs).unwrap();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&ObjectId::new(5)));
        assert!(refs.contains(&ObjectId::new(6)));
    }

    #[test]
    fn map_vocabulary_on_a_set_is_fatal_skew() {
        let factory = HeapSliceFactory::new();
        let mut state = fresh(&factory, 1);
        let mut ctx = TransactionContext::detached();

        let log = MutationLog::of([MutationEntry::binary(
            ActionCode::Put,
            LogicalValue::from("k"),
            LogicalValue::from("v"),
        )]);
        let err = state.apply(ObjectId::new(1), &log, &mut ctx).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn physical_record_is_fatal_skew() {
        let factory = HeapSliceFactory::new();
        let mut state = fresh(&factory, 1);
        let mut ctx = TransactionContext::detached();

        let log = MutationLog::new(RecordKind::Physical);
        assert!(state
            .apply(ObjectId::new(1), &log, &mut ctx)
            .unwrap_err()
            .is_fatal());
    }

    #[test]
    fn equal_content_from_permuted_logs() {
        let factory = HeapSliceFactory::new();
        let mut first = fresh(&factory, 1);
        let mut second = fresh(&factory, 2);
        let mut ctx = TransactionContext::detached();

        first
            .apply(
                ObjectId::new(1),
                &MutationLog::of([add("a"), add("b"), remove("c")]),
                &mut ctx,
            )
            .unwrap();
        second
            .apply(
                ObjectId::new(2),
                &MutationLog::of([remove("c"), add("b"), add("a")]),
                &mut ctx,
            )
            .unwrap();

        assert!(first.content_eq(&second).unwrap());
        assert_eq!(
            first.content_hash().unwrap(),
            second.content_hash().unwrap()
        );
    }

    #[test]
    fn order_sensitivity_is_preserved() {
        // Add then Clear differs from Clear then Add; apply must not
        // normalize entry order.
        let factory = HeapSliceFactory::new();
        let mut first = fresh(&factory, 1);
        let mut second = fresh(&factory, 2);
        let mut ctx = TransactionContext::detached();

        let forward = MutationLog::of([add("a"), MutationEntry::nullary(ActionCode::Clear)]);
        let reversed = MutationLog::of([MutationEntry::nullary(ActionCode::Clear), add("a")]);

        first.apply(ObjectId::new(1), &forward, &mut ctx).unwrap();
        second.apply(ObjectId::new(2), &reversed, &mut ctx).unwrap();

        assert!(!first.content_eq(&second).unwrap());
    }

    #[test]
    fn destroy_releases_and_double_destroy_is_fatal() {
        let factory = HeapSliceFactory::new();
        let mut state = fresh(&factory, 1);
        state.destroy().unwrap();
        assert!(state.destroy().unwrap_err().is_fatal());
    }
}
