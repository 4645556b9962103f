//! Per-(entity, table) increment state machine with lagged closing.
//!
//! An [`Increment`] tracks the open accumulation interval of one entity in
//! one table. A change to a classificatory attribute (a dimension or the
//! filter) does not close the interval immediately: it only *requests* a
//! close, stamped with the current event counter. The request is resolved
//! by [`Increment::finish_pending`], which model code runs just before any
//! attribute the table depends on changes. Resolution happens only once
//! the event counter has moved past the stamp, i.e. once the event that
//! made the request is over. Changes that cancel out within one event
//! therefore never close the interval at all.
//!
//! ```text
//!                 start_pending (cell or filter differs)
//!   Idle ──start──► Active ─────────────────────────────► Active+Pending
//!    ▲               │  ▲          start_pending (back to cell_in)    │
//!    │            finish └───────────────────────────────────────────┘
//!    │               ▼
//!    └───────────── Idle ──start_pending──► PendingOnly ──finish_pending──► Active / Idle
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::TableError;

/// Observable state of an [`Increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementState {
    /// Not active, nothing pending.
    Idle,
    /// Open interval.
    Active,
    /// Open interval with a deferred close request.
    ActivePending,
    /// No open interval, but a deferred (re)start request.
    PendingOnly,
}

/// Callbacks an increment uses to seed and to flush its interval.
pub trait IncrementHooks {
    /// Name used in error reports.
    fn name(&self) -> &'static str {
        "increment"
    }

    /// Seed the running state of a new interval (start values, start time).
    ///
    /// `pending` and `pending_event` tell the hook whether the start
    /// resolves a deferred request, and from which event, so that it can
    /// use lagged attribute values.
    fn init(&mut self, pending: bool, pending_event: u64) -> Result<(), TableError>;

    /// Compute the interval's contribution and push it into the table at
    /// `cell_in`, the cell in effect when the interval started.
    fn push(&mut self, cell_in: usize, pending: bool, pending_event: u64) -> Result<(), TableError>;
}

/// Accumulation state of one entity in one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Increment {
    cell: usize,
    cell_in: usize,
    filter: bool,
    active: bool,
    pending: bool,
    pending_event: u64,
}

impl Increment {
    /// An idle increment classified into `cell` with the given filter.
    pub const fn new(cell: usize, filter: bool) -> Self {
        Self {
            cell,
            cell_in: cell,
            filter,
            active: false,
            pending: false,
            pending_event: 0,
        }
    }

    /// Entity enters the simulation: clear all state and start an interval
    /// if the filter holds.
    ///
    /// # Errors
    ///
    /// Propagates hook errors.
    pub fn initialize(&mut self, hooks: &mut impl IncrementHooks) -> Result<(), TableError> {
        self.active = false;
        self.pending = false;
        if self.filter {
            self.start(hooks)?;
        }
        Ok(())
    }

    /// Open an interval at the current cell.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::IncrementAlreadyActive`] if an interval is
    /// open, or propagates hook errors.
    pub fn start(&mut self, hooks: &mut impl IncrementHooks) -> Result<(), TableError> {
        if self.active {
            return Err(TableError::IncrementAlreadyActive {
                increment: hooks.name(),
            });
        }
        self.active = true;
        self.cell_in = self.cell;
        trace!(increment = hooks.name(), cell = self.cell, "Increment started");
        hooks.init(self.pending, self.pending_event)
    }

    /// Close the open interval and push its contribution.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::IncrementNotActive`] if no interval is open,
    /// or propagates hook errors.
    pub fn finish(&mut self, hooks: &mut impl IncrementHooks) -> Result<(), TableError> {
        if !self.active {
            return Err(TableError::IncrementNotActive {
                increment: hooks.name(),
            });
        }
        trace!(increment = hooks.name(), cell_in = self.cell_in, "Increment finished");
        hooks.push(self.cell_in, self.pending, self.pending_event)?;
        self.active = false;
        Ok(())
    }

    /// Record that the cell or filter changed during event `event_counter`.
    ///
    /// If the interval is open, the filter still holds and the cell is back
    /// at `cell_in`, any earlier request is cancelled. Otherwise a request
    /// is (re)stamped with `event_counter`.
    pub const fn start_pending(&mut self, event_counter: u64) {
        if self.active && self.filter && self.cell == self.cell_in {
            self.pending = false;
        } else {
            self.pending = true;
            self.pending_event = event_counter;
        }
    }

    /// Resolve a pending request once `event_counter` is past its stamp:
    /// close the open interval (if any) and open a new one if the filter
    /// holds. Returns whether a request was resolved.
    ///
    /// # Errors
    ///
    /// Propagates hook errors.
    pub fn finish_pending(
        &mut self,
        event_counter: u64,
        hooks: &mut impl IncrementHooks,
    ) -> Result<bool, TableError> {
        if !self.pending || event_counter <= self.pending_event {
            return Ok(false);
        }
        self.resolve_pending(hooks)?;
        Ok(true)
    }

    /// Entity exits the simulation: resolve any pending request regardless
    /// of the event counter, then close any open interval.
    ///
    /// # Errors
    ///
    /// Propagates hook errors.
    pub fn finalize(&mut self, hooks: &mut impl IncrementHooks) -> Result<(), TableError> {
        if self.pending {
            self.resolve_pending(hooks)?;
        }
        if self.active {
            self.finish(hooks)?;
        }
        Ok(())
    }

    fn resolve_pending(&mut self, hooks: &mut impl IncrementHooks) -> Result<(), TableError> {
        if self.active {
            self.finish(hooks)?;
        }
        if self.filter {
            self.start(hooks)?;
        }
        self.pending = false;
        Ok(())
    }

    /// Set the current cell without requesting a close.
    pub const fn set_cell(&mut self, cell: usize) {
        self.cell = cell;
    }

    /// Set the current filter without requesting a close.
    pub const fn set_filter(&mut self, filter: bool) {
        self.filter = filter;
    }

    /// Current cell.
    pub const fn cell(&self) -> usize {
        self.cell
    }

    /// Cell in effect when the open interval started.
    pub const fn cell_in(&self) -> usize {
        self.cell_in
    }

    /// Current filter.
    pub const fn filter(&self) -> bool {
        self.filter
    }

    /// Whether an interval is open.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a close request is pending.
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Event counter stamped on the pending request.
    pub const fn pending_event(&self) -> u64 {
        self.pending_event
    }

    /// Current state.
    pub const fn state(&self) -> IncrementState {
        match (self.active, self.pending) {
            (false, false) => IncrementState::Idle,
            (true, false) => IncrementState::Active,
            (true, true) => IncrementState::ActivePending,
            (false, true) => IncrementState::PendingOnly,
        }
    }
}

// ---------------------------------------------------------------------------
// Binding to an entity
// ---------------------------------------------------------------------------

/// Hook seeding a new interval of entity `E`.
pub type IncrementInitHook<E, C> = fn(&mut E, &mut C, bool, u64) -> Result<(), TableError>;

/// Hook pushing a finished interval of entity `E` into cell `cell_in`.
pub type IncrementPushHook<E, C> = fn(&mut E, &mut C, usize, bool, u64) -> Result<(), TableError>;

/// Static description of one table's increment inside entity type `E`.
///
/// Model code calls [`Self::finish_pending`] from the pre-change hook of
/// every attribute the table reads, and [`Self::set_cell`] /
/// [`Self::set_filter`] from the post-change hook of its dimension and
/// filter attributes.
pub struct IncrementDef<E, C> {
    /// Name used in error reports.
    pub name: &'static str,
    /// Shared accessor into the owning entity.
    pub read: fn(&E) -> &Increment,
    /// Mutable accessor into the owning entity.
    pub write: fn(&mut E) -> &mut Increment,
    /// Seeds a new interval.
    pub init: IncrementInitHook<E, C>,
    /// Pushes a finished interval.
    pub push: IncrementPushHook<E, C>,
    /// Reads the member's global event counter.
    pub event_counter: fn(&C) -> u64,
}

struct Bound<'a, E, C> {
    def: &'a IncrementDef<E, C>,
    entity: &'a mut E,
    ctx: &'a mut C,
}

impl<E, C> IncrementHooks for Bound<'_, E, C> {
    fn name(&self) -> &'static str {
        self.def.name
    }

    fn init(&mut self, pending: bool, pending_event: u64) -> Result<(), TableError> {
        (self.def.init)(self.entity, self.ctx, pending, pending_event)
    }

    fn push(&mut self, cell_in: usize, pending: bool, pending_event: u64) -> Result<(), TableError> {
        (self.def.push)(self.entity, self.ctx, cell_in, pending, pending_event)
    }
}

impl<E, C> IncrementDef<E, C> {
    /// Run `op` on a copy of the entity's increment with hooks bound to
    /// the entity, then store the copy back.
    fn with_hooks<R>(
        &self,
        entity: &mut E,
        ctx: &mut C,
        op: impl FnOnce(&mut Increment, &mut Bound<'_, E, C>) -> Result<R, TableError>,
    ) -> Result<R, TableError> {
        let mut increment = *(self.read)(entity);
        let result = op(
            &mut increment,
            &mut Bound {
                def: self,
                entity: &mut *entity,
                ctx,
            },
        );
        *(self.write)(entity) = increment;
        result
    }

    /// Entity enters the simulation classified into `cell` with `filter`.
    ///
    /// # Errors
    ///
    /// Propagates hook errors.
    pub fn initialize(
        &self,
        entity: &mut E,
        ctx: &mut C,
        cell: usize,
        filter: bool,
    ) -> Result<(), TableError> {
        self.with_hooks(entity, ctx, |increment, hooks| {
            increment.set_cell(cell);
            increment.set_filter(filter);
            increment.initialize(hooks)
        })
    }

    /// The entity's cell changed to `cell`.
    pub fn set_cell(&self, entity: &mut E, ctx: &C, cell: usize) {
        let counter = (self.event_counter)(ctx);
        let increment = (self.write)(entity);
        increment.set_cell(cell);
        increment.start_pending(counter);
    }

    /// The entity's filter changed to `filter`.
    pub fn set_filter(&self, entity: &mut E, ctx: &C, filter: bool) {
        let counter = (self.event_counter)(ctx);
        let increment = (self.write)(entity);
        increment.set_filter(filter);
        increment.start_pending(counter);
    }

    /// Resolve a pending request if its event is over.
    ///
    /// # Errors
    ///
    /// Propagates hook errors.
    pub fn finish_pending(&self, entity: &mut E, ctx: &mut C) -> Result<bool, TableError> {
        if !(self.read)(entity).is_pending() {
            return Ok(false);
        }
        let counter = (self.event_counter)(ctx);
        self.with_hooks(entity, ctx, |increment, hooks| {
            increment.finish_pending(counter, hooks)
        })
    }

    /// Entity exits the simulation.
    ///
    /// # Errors
    ///
    /// Propagates hook errors.
    pub fn finalize(&self, entity: &mut E, ctx: &mut C) -> Result<(), TableError> {
        self.with_hooks(entity, ctx, |increment, hooks| increment.finalize(hooks))
    }

    /// Copy of the entity's increment.
    pub fn state(&self, entity: &E) -> Increment {
        *(self.read)(entity)
    }
}

impl<E, C> std::fmt::Debug for IncrementDef<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementDef")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
