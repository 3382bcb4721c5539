//! Bounded pool of embedded graph views.
//!
//! # Responsibility
//! - Hand out a handle for a host container using the reuse/eviction policy.
//! - Retire excess handles when capacity shrinks, after a grace delay.
//! - Destroy every handle on teardown.
//!
//! # Invariants
//! - `handles.len() <= capacity` at all times; insertion order is creation order.
//! - Acquisition priority: attached to the container, detached (no live parent),
//!   oldest handle when at capacity, new handle otherwise.
//! - Within one resolution pass, repeated acquisition for the same container
//!   returns the same handle, and a handle claimed for one container is never
//!   handed to another.

use crate::host::{HostCapability, HostResult};
use crate::model::view::{ContainerId, ViewId};
use crate::schedule::TimerQueue;
use crate::view::handle::ViewHandle;
use log::{debug, info};
use std::collections::BTreeMap;

/// Which acquisition rule produced a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireSource {
    /// Already attached to the requesting container (or claimed for it this pass).
    Attached,
    /// Reused because its previous container is gone or it was never placed.
    Detached,
    /// Pool full; the oldest handle is taken over.
    Evicted,
    /// Newly created.
    Created,
}

impl AcquireSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Evicted => "evicted",
            Self::Created => "created",
        }
    }
}

/// Handle chosen for a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquisition {
    pub view_id: ViewId,
    pub source: AcquireSource,
}

/// Bounded, creation-ordered collection of [`ViewHandle`]s.
#[derive(Debug)]
pub struct ViewPool {
    handles: Vec<ViewHandle>,
    capacity: usize,
    retiring: Vec<ViewHandle>,
    retire_timers: TimerQueue<ViewId>,
    pass_claims: Option<BTreeMap<ContainerId, ViewId>>,
}

impl ViewPool {
    /// Creates an empty pool; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            handles: Vec::new(),
            capacity: capacity.max(1),
            retiring: Vec::new(),
            retire_timers: TimerQueue::new(),
            pass_claims: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handles in creation order.
    pub fn handles(&self) -> &[ViewHandle] {
        &self.handles
    }

    pub fn get(&self, view_id: ViewId) -> Option<&ViewHandle> {
        self.handles.iter().find(|handle| handle.id() == view_id)
    }

    pub fn get_mut(&mut self, view_id: ViewId) -> Option<&mut ViewHandle> {
        self.handles.iter_mut().find(|handle| handle.id() == view_id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ViewHandle> {
        self.handles.iter_mut()
    }

    /// Handles waiting for their retirement grace delay.
    pub fn retiring_count(&self) -> usize {
        self.retiring.len()
    }

    pub fn next_retirement_due(&self) -> Option<u64> {
        self.retire_timers.next_due()
    }

    /// Starts a resolution pass; acquisitions are memoized per container until
    /// [`ViewPool::end_pass`].
    pub fn begin_pass(&mut self) {
        self.pass_claims = Some(BTreeMap::new());
    }

    pub fn end_pass(&mut self) {
        self.pass_claims = None;
    }

    /// Handle attached to `container`, if the container is still live.
    pub fn find_attached(
        &self,
        host: &dyn HostCapability,
        container: ContainerId,
    ) -> Option<ViewId> {
        if !host.container_exists(container) {
            return None;
        }
        self.handles
            .iter()
            .find(|handle| handle.attached_parent() == Some(container))
            .map(ViewHandle::id)
    }

    /// Returns a handle for `container`, reusing before creating.
    ///
    /// # Errors
    /// Fails only when a new handle is needed and the host cannot create it.
    pub fn acquire(
        &mut self,
        host: &mut dyn HostCapability,
        container: ContainerId,
        document_path: &str,
        height_px: u32,
    ) -> HostResult<Acquisition> {
        if let Some(view_id) = self.claimed_for(container) {
            return Ok(Acquisition {
                view_id,
                source: AcquireSource::Attached,
            });
        }

        let acquisition = match self.select_existing(&*host, container) {
            Some(acquisition) => acquisition,
            None => {
                let handle = ViewHandle::create(host, height_px)?;
                let view_id = handle.id();
                self.handles.push(handle);
                Acquisition {
                    view_id,
                    source: AcquireSource::Created,
                }
            }
        };

        if let Some(claims) = self.pass_claims.as_mut() {
            claims.insert(container, acquisition.view_id);
        }
        info!(
            "event=pool_acquire module=pool status=ok view_id={} container={} source={} size={} capacity={}",
            acquisition.view_id,
            container,
            acquisition.source.as_str(),
            self.handles.len(),
            self.capacity
        );
        debug!(
            "event=pool_acquire module=pool view_id={} path={}",
            acquisition.view_id, document_path
        );
        Ok(acquisition)
    }

    /// Changes capacity, retiring the oldest handles beyond it.
    ///
    /// Retired handles are hidden and destroyed after `grace_ms`, or right away
    /// when `grace_ms` is 0. Returns the number of retired handles.
    pub fn set_capacity(
        &mut self,
        host: &mut dyn HostCapability,
        capacity: usize,
        now_ms: u64,
        grace_ms: u64,
    ) -> usize {
        self.capacity = capacity.max(1);
        if self.handles.len() <= self.capacity {
            return 0;
        }

        let excess = self.handles.len() - self.capacity;
        let retired: Vec<ViewHandle> = self.handles.drain(..excess).collect();
        for handle in retired {
            self.retire(host, handle, now_ms, grace_ms);
        }
        info!(
            "event=pool_shrink module=pool status=ok retired={} capacity={} grace_ms={}",
            excess, self.capacity, grace_ms
        );
        excess
    }

    /// Destroys retired handles whose grace delay elapsed. Returns how many.
    pub fn fire_due(&mut self, host: &mut dyn HostCapability, now_ms: u64) -> usize {
        let mut destroyed = 0;
        for view_id in self.retire_timers.take_due(now_ms) {
            if let Some(index) = self.retiring.iter().position(|h| h.id() == view_id) {
                self.retiring.remove(index).destroy(host);
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Cancels pending retirements and destroys every handle synchronously.
    pub fn teardown(&mut self, host: &mut dyn HostCapability) -> usize {
        let canceled = self.retire_timers.clear();
        self.pass_claims = None;

        let mut destroyed = 0;
        for handle in self.retiring.drain(..).chain(self.handles.drain(..)) {
            handle.destroy(host);
            destroyed += 1;
        }
        info!(
            "event=pool_teardown module=pool status=ok destroyed={} canceled_timers={}",
            destroyed, canceled
        );
        destroyed
    }

    fn claimed_for(&self, container: ContainerId) -> Option<ViewId> {
        let view_id = *self.pass_claims.as_ref()?.get(&container)?;
        self.get(view_id).map(ViewHandle::id)
    }

    fn is_claimed(&self, view_id: ViewId) -> bool {
        self.pass_claims
            .as_ref()
            .is_some_and(|claims| claims.values().any(|claimed| *claimed == view_id))
    }

    fn select_existing(
        &self,
        host: &dyn HostCapability,
        container: ContainerId,
    ) -> Option<Acquisition> {
        if let Some(view_id) = self.find_attached(host, container) {
            return Some(Acquisition {
                view_id,
                source: AcquireSource::Attached,
            });
        }

        if let Some(handle) = self
            .handles
            .iter()
            .find(|handle| handle.live_parent(host).is_none() && !self.is_claimed(handle.id()))
        {
            return Some(Acquisition {
                view_id: handle.id(),
                source: AcquireSource::Detached,
            });
        }

        if self.handles.len() >= self.capacity {
            let oldest = self
                .handles
                .iter()
                .find(|handle| !self.is_claimed(handle.id()))
                .or_else(|| self.handles.first())?;
            return Some(Acquisition {
                view_id: oldest.id(),
                source: AcquireSource::Evicted,
            });
        }

        None
    }

    fn retire(
        &mut self,
        host: &mut dyn HostCapability,
        mut handle: ViewHandle,
        now_ms: u64,
        grace_ms: u64,
    ) {
        if let Some(claims) = self.pass_claims.as_mut() {
            claims.retain(|_, claimed| *claimed != handle.id());
        }
        if grace_ms == 0 {
            handle.destroy(host);
            return;
        }

        handle.on_outside_pointer_down(host);
        handle.set_visible(host, false);
        self.retire_timers.schedule(now_ms, grace_ms, handle.id());
        self.retiring.push(handle);
    }
}
