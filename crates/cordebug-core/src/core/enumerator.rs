//! Wrappers over the native `ICorDebugEnum` family.
//!
//! A native enumerator is a cursor over a finite sequence of interface
//! pointers. [`EnumCursor`] covers the operations every enumerator inherits
//! from `ICorDebugEnum`; [`Enumerator`] adds the typed `Next` pull that wraps
//! each produced pointer.
//!
//! Pulling is one-directional: once the sequence is exhausted, further calls
//! to `next` produce nothing until [`EnumCursor::reset`] is called.

use crate::core::cast::Cast;
use crate::core::error::{DebugError, DebugResult, HResult};
use crate::core::interface::Interface;
use crate::wrappers::enums::CorEnum;
use cordebug_sys::{EnumNextFn, ICorDebugEnum, ICorDebugEnumVtbl};
use std::ffi::c_void;
use std::ptr;

/// Largest number of slots handed to the native side in one `Next` call.
///
/// A larger request is served by several native calls.
pub const NEXT_CHUNK: u32 = 64;

/// The result of one `next` pull.
///
/// Holds one slot per element slot handed to the native side: at most the
/// requested count, and no more than one short chunk past the last element.
/// Slots the native side left null are `None`.
#[derive(Debug)]
pub struct EnumerationBatch<T> {
    slots: Vec<Option<T>>,
    fetched: u32,
    requested: u32,
}

impl<T> EnumerationBatch<T> {
    /// Number of elements the native enumerator reported producing.
    pub fn fetched(&self) -> u32 {
        self.fetched
    }

    pub fn requested(&self) -> u32 {
        self.requested
    }

    /// True when fewer elements were produced than requested, i.e. the end of
    /// the sequence was reached.
    pub fn is_exhausted(&self) -> bool {
        self.fetched < self.requested
    }

    pub fn slots(&self) -> &[Option<T>] {
        &self.slots
    }

    /// The produced wrappers, skipping null slots.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    pub fn into_slots(self) -> Vec<Option<T>> {
        self.slots
    }

    pub fn into_items(self) -> Vec<T> {
        self.slots.into_iter().flatten().collect()
    }
}

impl<T> IntoIterator for EnumerationBatch<T> {
    type Item = T;
    type IntoIter = std::iter::Flatten<std::vec::IntoIter<Option<T>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter().flatten()
    }
}

/// Operations inherited from `ICorDebugEnum`.
pub trait EnumCursor: Interface {
    #[doc(hidden)]
    fn enum_vtbl(vtbl: &Self::Vtbl) -> &ICorDebugEnumVtbl;

    #[doc(hidden)]
    fn cursor(&self) -> DebugResult<(*mut c_void, &ICorDebugEnumVtbl)> {
        let (this, vtbl) = self.vtable()?;
        Ok((this, Self::enum_vtbl(vtbl)))
    }

    /// Total number of elements. Asked of the native object on every call.
    fn count(&self) -> DebugResult<u32> {
        let (this, vtbl) = self.cursor()?;
        let mut count: u32 = 0;
        HResult(unsafe { (vtbl.GetCount)(this, &mut count) }).check("ICorDebugEnum::GetCount")?;
        Ok(count)
    }

    /// Advances the cursor without materializing the skipped elements.
    fn skip(&self, count: u32) -> DebugResult<()> {
        let (this, vtbl) = self.cursor()?;
        HResult(unsafe { (vtbl.Skip)(this, count) }).check("ICorDebugEnum::Skip")?;
        Ok(())
    }

    /// Moves the cursor back to the first element.
    fn reset(&self) -> DebugResult<()> {
        let (this, vtbl) = self.cursor()?;
        HResult(unsafe { (vtbl.Reset)(this) }).check("ICorDebugEnum::Reset")?;
        Ok(())
    }

    /// An independent cursor over the same sequence, as the untyped base
    /// interface.
    fn clone_cursor(&self) -> DebugResult<CorEnum> {
        let (this, vtbl) = self.cursor()?;
        let mut out: *mut ICorDebugEnum = ptr::null_mut();
        HResult(unsafe { (vtbl.Clone)(this, &mut out) }).check("ICorDebugEnum::Clone")?;
        unsafe { self.com().wrap_out::<CorEnum>(out) }.ok_or(DebugError::NullOutput {
            call: "ICorDebugEnum::Clone",
        })
    }
}

/// A typed enumerator producing wrappers of kind `Item`.
pub trait Enumerator: EnumCursor {
    type Item: Interface;

    /// Name of the native `Next` method, for error reports.
    const NEXT_CALL: &'static str;

    #[doc(hidden)]
    fn next_fn(vtbl: &Self::Vtbl) -> EnumNextFn<<Self::Item as Interface>::Raw>;

    /// Pulls up to `requested` elements.
    ///
    /// The native `Next` is called with at most [`NEXT_CHUNK`] slots at a
    /// time until the request is met or a call comes back short. Every
    /// non-null slot is wrapped, including any past the reported count, so no
    /// native reference is left behind.
    fn next(&self, requested: u32) -> DebugResult<EnumerationBatch<Self::Item>> {
        let (this, vtbl) = self.vtable()?;
        let next = Self::next_fn(vtbl);
        let registry = self.com().registry();

        let mut slots = Vec::with_capacity(requested.min(NEXT_CHUNK) as usize);
        let mut fetched: u32 = 0;
        loop {
            let chunk = (requested - fetched).min(NEXT_CHUNK);
            let mut raw = vec![ptr::null_mut(); chunk as usize];
            let mut produced: u32 = 0;
            HResult(unsafe { next(this, chunk, raw.as_mut_ptr(), &mut produced) })
                .check(Self::NEXT_CALL)?;
            slots.extend(
                raw.into_iter()
                    .map(|item| unsafe { <Self::Item as Interface>::wrap(item, registry) }),
            );

            let produced = produced.min(chunk);
            fetched += produced;
            if produced < chunk || fetched == requested {
                break;
            }
        }

        Ok(EnumerationBatch {
            slots,
            fetched,
            requested,
        })
    }

    /// An independent cursor of the same kind over the same sequence.
    fn clone_enum(&self) -> DebugResult<Self> {
        self.clone_cursor()?.cast_to::<Self>()
    }

    /// Iterates the remaining elements, pulling `batch_size` at a time.
    fn items(&self, batch_size: u32) -> Items<'_, Self> {
        Items {
            source: self,
            batch_size: batch_size.max(1),
            buffered: Vec::new().into_iter(),
            done: false,
        }
    }
}

/// Lazy iterator returned by [`Enumerator::items`].
///
/// Null slots are skipped. A short batch is not taken as the end; the
/// sequence ends at the first pull that produces nothing. After an error or
/// the end of the sequence the iterator is fused; it does not reset the
/// native cursor.
pub struct Items<'a, E: Enumerator> {
    source: &'a E,
    batch_size: u32,
    buffered: std::vec::IntoIter<Option<E::Item>>,
    done: bool,
}

impl<E: Enumerator> Iterator for Items<'_, E> {
    type Item = DebugResult<E::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            for slot in self.buffered.by_ref() {
                if let Some(item) = slot {
                    return Some(Ok(item));
                }
            }
            if self.done {
                return None;
            }
            match self.source.next(self.batch_size) {
                Ok(batch) => {
                    self.done = batch.fetched() == 0;
                    self.buffered = batch.into_slots().into_iter();
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<E: Enumerator> std::iter::FusedIterator for Items<'_, E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::ResourceRegistry;
    use crate::testing::{ChainSpec, MockProcess};
    use crate::wrappers::chain::Chain;
    use crate::wrappers::enums::ChainEnum;
    use cordebug_sys::{E_FAIL, ICorDebugChain};
    use std::sync::Arc;

    fn chains(process: &MockProcess, count: u64) -> Vec<*mut ICorDebugChain> {
        (0..count)
            .map(|i| {
                process.chain(ChainSpec {
                    stack_range: (i * 0x100, i * 0x100 + 0x80),
                    ..ChainSpec::default()
                })
            })
            .collect()
    }

    fn chain_enum(process: &MockProcess, registry: &Arc<ResourceRegistry>, count: u64) -> ChainEnum {
        let raw = process.chain_enum(chains(process, count));
        unsafe { ChainEnum::wrap(raw, registry) }.unwrap()
    }

    fn start(chain: &Chain) -> u64 {
        chain.stack_range().unwrap().0
    }

    #[test]
    fn next_reports_short_batches() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let chains = chain_enum(&process, &registry, 3);
        assert_eq!(chains.count().unwrap(), 3);

        let first = chains.next(2).unwrap();
        assert_eq!(first.fetched(), 2);
        assert!(!first.is_exhausted());
        assert_eq!(first.iter().map(start).collect::<Vec<_>>(), vec![0, 0x100]);

        let second = chains.next(2).unwrap();
        assert_eq!(second.fetched(), 1);
        assert_eq!(second.requested(), 2);
        assert!(second.is_exhausted());
        assert!(second.slots()[1].is_none());
        assert_eq!(chains.count().unwrap(), 3);

        let empty = chains.next(4).unwrap();
        assert_eq!(empty.fetched(), 0);
        assert_eq!(empty.into_items().len(), 0);
    }

    #[test]
    fn oversized_request_returns_what_exists() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let chains = chain_enum(&process, &registry, 3);

        let batch = chains.next(u32::MAX).unwrap();
        assert_eq!(batch.fetched(), 3);
        assert_eq!(batch.requested(), u32::MAX);
        assert!(batch.is_exhausted());
        assert!(batch.slots().len() <= NEXT_CHUNK as usize);
        assert_eq!(batch.iter().map(start).collect::<Vec<_>>(), vec![0, 0x100, 0x200]);
    }

    #[test]
    fn large_requests_span_several_native_calls() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let chains = chain_enum(&process, &registry, 100);

        let batch = chains.next(100).unwrap();
        assert_eq!(batch.fetched(), 100);
        assert!(!batch.is_exhausted());
        assert_eq!(batch.slots().len(), 100);
        let starts: Vec<u64> = batch.iter().map(start).collect();
        assert_eq!(starts, (0..100).map(|i| i * 0x100).collect::<Vec<_>>());
        drop(batch);
        assert_eq!(chains.next(1).unwrap().fetched(), 0);

        chains.reset().unwrap();
        let batch = chains.next(130).unwrap();
        assert_eq!(batch.fetched(), 100);
        assert!(batch.is_exhausted());
        assert_eq!(batch.into_items().len(), 100);
    }

    #[test]
    fn slots_past_the_reported_count_are_released() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let raw = process.under_reporting_chain_enum(chains(&process, 2), 1);
        let chains = unsafe { ChainEnum::wrap(raw, &registry) }.unwrap();

        let batch = chains.next(2).unwrap();
        assert_eq!(batch.fetched(), 1);
        assert!(batch.slots().iter().all(Option::is_some));
        assert_eq!(registry.tracked_count(Chain::KIND), 2);

        drop(batch);
        assert_eq!(registry.tracked_count(Chain::KIND), 0);
        drop(chains);
        assert_eq!(registry.total_tracked(), 0);
        assert_eq!(process.live_objects(), 0);
    }

    #[test]
    fn items_continues_past_short_batches() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let raw = process.under_reporting_chain_enum(chains(&process, 3), 1);
        let chains = unsafe { ChainEnum::wrap(raw, &registry) }.unwrap();

        let starts: Vec<u64> = chains
            .items(2)
            .map(|chain| start(&chain.unwrap()))
            .collect();
        assert_eq!(starts, vec![0, 0x100, 0x200]);
    }

    #[test]
    fn next_zero_fetches_nothing() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let chains = chain_enum(&process, &registry, 2);

        let batch = chains.next(0).unwrap();
        assert_eq!(batch.fetched(), 0);
        assert!(!batch.is_exhausted());
        assert_eq!(chains.next(5).unwrap().fetched(), 2);
    }

    #[test]
    fn reset_replays_the_sequence() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let chains = chain_enum(&process, &registry, 3);

        let before: Vec<_> = chains.next(2).unwrap().into_items();
        chains.reset().unwrap();
        let after: Vec<_> = chains.next(2).unwrap().into_items();
        assert_eq!(before, after);
    }

    #[test]
    fn skip_advances_the_cursor() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let chains = chain_enum(&process, &registry, 3);

        chains.skip(2).unwrap();
        let rest = chains.next(3).unwrap().into_items();
        assert_eq!(rest.len(), 1);
        assert_eq!(start(&rest[0]), 0x200);
        // Skipping past the end is not a failure.
        chains.skip(10).unwrap();
    }

    #[test]
    fn clone_enum_is_independent() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let chains = chain_enum(&process, &registry, 3);
        chains.next(1).unwrap();

        let copy = chains.clone_enum().unwrap();
        assert_ne!(copy.handle_id(), chains.handle_id());
        assert_eq!(start(&copy.next(1).unwrap().into_items()[0]), 0x100);

        chains.reset().unwrap();
        assert_eq!(start(&copy.next(1).unwrap().into_items()[0]), 0x200);
        assert_eq!(start(&chains.next(1).unwrap().into_items()[0]), 0);
    }

    #[test]
    fn items_walks_in_batches() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let chains = chain_enum(&process, &registry, 5);

        let starts: Vec<u64> = chains
            .items(2)
            .map(|chain| start(&chain.unwrap()))
            .collect();
        assert_eq!(starts, vec![0, 0x100, 0x200, 0x300, 0x400]);
        assert_eq!(chains.items(0).count(), 0);
    }

    #[test]
    fn native_next_failure_surfaces_once() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let raw = process.failing_chain_enum(chains(&process, 2), E_FAIL);
        let chains = unsafe { ChainEnum::wrap(raw, &registry) }.unwrap();

        let err = chains.next(1).unwrap_err();
        assert_eq!(
            err,
            DebugError::Native {
                call: "ICorDebugChainEnum::Next",
                hresult: HResult(E_FAIL),
            }
        );

        let mut items = chains.items(4);
        assert!(items.next().unwrap().is_err());
        assert!(items.next().is_none());
    }

    #[test]
    fn produced_wrappers_are_tracked_and_released() {
        let process = MockProcess::new();
        let registry = Arc::new(ResourceRegistry::new());
        let chains = chain_enum(&process, &registry, 3);

        let batch = chains.next(3).unwrap();
        assert_eq!(registry.tracked_count(Chain::KIND), 3);
        drop(batch);
        assert_eq!(registry.tracked_count(Chain::KIND), 0);

        drop(chains);
        assert_eq!(registry.total_tracked(), 0);
        assert_eq!(process.live_objects(), 0);
    }
}
