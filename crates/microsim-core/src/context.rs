//! Per-member simulation context.
//!
//! A [`MemberContext`] bundles everything one sub-sample mutates while it
//! runs: its seed plan, event clock, random streams, case seed sequence
//! and tables. It is passed by reference through every entity hook and is
//! never shared between members. Microdata rows handed off by the model
//! are buffered here until the member finishes.
//!
//! The context also carries the member's entity serial, so a model that
//! builds a fresh arena for every case still hands out ids that are unique
//! within the member.

use microsim_entity::EntityArena;
use microsim_random::{CaseSeedSequence, RandomStreams, SeedPlan, StreamRng};
use microsim_tables::TableSet;
use microsim_types::{SimulationMode, StreamState};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::EventClock;
use crate::config::RunSection;
use crate::error::SimulationError;

/// Restorable position of a member: clock, streams and case sequence.
///
/// Tables are not part of a checkpoint; restoring rewinds the random
/// state and simulated time only, which is what cloning a case requires.
/// The event counter and entity serials keep counting forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Member the checkpoint was taken from.
    pub member: u32,
    /// Clock at the time of the checkpoint.
    pub clock: EventClock,
    /// Stream seeds at the time of the checkpoint.
    pub streams: StreamState,
    /// Case seed sequence at the time of the checkpoint.
    pub case_seeds: CaseSeedSequence,
}

/// Mutable state of one simulated member.
#[derive(Debug)]
pub struct MemberContext {
    mode: SimulationMode,
    plan: SeedPlan,
    clock: EventClock,
    streams: RandomStreams,
    case_seeds: CaseSeedSequence,
    tables: TableSet,
    microdata: Vec<Vec<u8>>,
    entity_serial: u64,
}

impl MemberContext {
    /// Context for `member` of a run.
    ///
    /// Time-based members root their streams at the run seed; case-based
    /// members at their first case seed, re-rooted by every
    /// [`Self::start_case`].
    ///
    /// # Errors
    ///
    /// Returns a random error if the member's seeds are out of range or
    /// the stream count is zero.
    pub fn new(run: &RunSection, member: u32, tables: TableSet) -> Result<Self, SimulationError> {
        let plan = SeedPlan::new(run.starting_seed, member)?;
        let root = match run.mode {
            SimulationMode::CaseBased => plan.first_case_seed(),
            SimulationMode::TimeBased => plan.run_seed(),
        };
        let streams = plan.streams(root, run.streams)?;
        debug!(member, root, streams = run.streams, "Member context created");
        Ok(Self {
            mode: run.mode,
            plan,
            clock: EventClock::new(),
            streams,
            case_seeds: plan.case_seeds(),
            tables,
            microdata: Vec::new(),
            entity_serial: 0,
        })
    }

    /// Begin the next case: draw its seed, re-root every stream at it and
    /// rewind time. Returns the case seed.
    ///
    /// # Errors
    ///
    /// Returns a random error if the case seed is out of range.
    pub fn start_case(&mut self) -> Result<u32, SimulationError> {
        let seed = self.case_seeds.next_case();
        self.streams.reseed(seed)?;
        self.clock.reset_time();
        Ok(seed)
    }

    /// Begin the next event at `time`. Returns the new event counter.
    ///
    /// # Errors
    ///
    /// Returns a clock error if time would move backwards.
    pub fn next_event(&mut self, time: f64) -> Result<u64, SimulationError> {
        Ok(self.clock.next_event(time)?)
    }

    /// Draw a uniform from `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`microsim_random::RandomError::UnknownStream`] for a bad
    /// stream index.
    pub fn uniform(&mut self, stream: usize) -> Result<f64, SimulationError> {
        Ok(self.streams.uniform(stream)?)
    }

    /// Borrow `stream` as a `rand` generator.
    ///
    /// # Errors
    ///
    /// Returns [`microsim_random::RandomError::UnknownStream`] for a bad
    /// stream index.
    pub fn stream(&mut self, stream: usize) -> Result<StreamRng<'_>, SimulationError> {
        Ok(self.streams.stream(stream)?)
    }

    /// Capture the restorable position.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            member: self.plan.member(),
            clock: self.clock,
            streams: self.streams.state(),
            case_seeds: self.case_seeds,
        }
    }

    /// Return to a captured position. Subsequent draws repeat exactly.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::CheckpointMismatch`] for another member's
    /// checkpoint, or a random error for a malformed stream state.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<(), SimulationError> {
        if checkpoint.member != self.plan.member() {
            return Err(SimulationError::CheckpointMismatch {
                member: self.plan.member(),
                checkpoint: checkpoint.member,
            });
        }
        let streams = RandomStreams::restore(&checkpoint.streams)?;
        let counter = self.clock.event_counter().max(checkpoint.clock.event_counter());
        self.clock = EventClock::from_parts(checkpoint.clock.time(), counter)?;
        self.streams = streams;
        self.case_seeds = checkpoint.case_seeds;
        debug!(
            member = self.plan.member(),
            time = self.clock.time(),
            event_counter = counter,
            "Checkpoint restored"
        );
        Ok(())
    }

    /// Empty arena whose ids continue after every arena already closed
    /// through [`Self::close_arena`].
    pub fn open_arena<E: Default>(&self) -> EntityArena<E> {
        EntityArena::continue_from(self.plan.member(), self.entity_serial)
    }

    /// Record the serials handed out by `arena` so the next
    /// [`Self::open_arena`] starts past them.
    pub fn close_arena<E>(&mut self, arena: &EntityArena<E>) {
        self.entity_serial = self.entity_serial.max(arena.next_serial());
    }

    /// Serial the next opened arena starts at.
    pub const fn entity_serial(&self) -> u64 {
        self.entity_serial
    }

    /// Global event counter read by increments.
    pub const fn event_counter(&self) -> u64 {
        self.clock.event_counter()
    }

    /// Current simulated time.
    pub const fn time(&self) -> f64 {
        self.clock.time()
    }

    /// Member index.
    pub const fn member(&self) -> u32 {
        self.plan.member()
    }

    /// Case-based or time-based.
    pub const fn mode(&self) -> SimulationMode {
        self.mode
    }

    /// Seed plan of this member.
    pub const fn plan(&self) -> &SeedPlan {
        &self.plan
    }

    /// Cases started so far.
    pub const fn cases_started(&self) -> u64 {
        self.case_seeds.cases_started()
    }

    /// The member's tables.
    pub const fn tables(&self) -> &TableSet {
        &self.tables
    }

    /// Mutable access to the member's tables.
    pub const fn tables_mut(&mut self) -> &mut TableSet {
        &mut self.tables
    }

    /// Hand off one encoded microdata row.
    pub fn push_microdata(&mut self, row: Vec<u8>) {
        self.microdata.push(row);
    }

    /// Microdata rows handed off so far.
    pub fn microdata(&self) -> &[Vec<u8>] {
        &self.microdata
    }

    /// Give up the context, keeping the tables and microdata rows.
    pub fn into_parts(self) -> (TableSet, Vec<Vec<u8>>) {
        (self.tables, self.microdata)
    }
}
