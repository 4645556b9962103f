//! Lifecourse demo model.
//!
//! Each case follows a founder and her descendants from birth to death.
//! People are born into one of three regions, age through five age
//! groups and give birth between ages 20 and 40. Three tables describe
//! the population:
//!
//! - `LifeYears` -- person-years and spells by region and age group,
//!   classified with lagged increments so same-event reclassifications
//!   cannot leak into the wrong cell
//! - `Deaths` -- mean, median and oldest age at death by region
//! - `RegionShare` -- derived share of person-years lived in each region
//!
//! Time-based runs start a fixed founder cohort at time 0 and censor
//! everyone still alive at the end time.

use microsim_core::context::MemberContext;
use microsim_core::error::SimulationError;
use microsim_core::runner::Model;
use microsim_entity::{
    Attribute, AttributeDef, AttributeValue, DurationDef, EntityArena, EntitySet, ExpressionDef, Link,
    LinkDef, Microdata, Multilink, MultilinkDef, SnapshotLayout,
};
use microsim_random::{Cumrate, RandomError};
use microsim_tables::{
    AccumulatorSpec, DerivedTable, EntityTable, Increment, IncrementDef, IncrementValues, MeasureSpec,
    Table, TableError, TableKind, TableSet,
};
use microsim_types::{AttributeType, EntityId, IncrementKind, Partition, Range, Statistic, TableId};
use rand::Rng;
use tracing::{debug, warn};

use crate::calendar::{Calendar, Event, EventKind};

/// Number of regions.
pub const REGIONS: usize = 3;
/// Age groups: under 20, 20-39, 40-59, 60-79 and 80 or over.
#[allow(clippy::panic)]
pub const AGE_PARTITION: Partition<'static> = match Partition::new(&[20.0, 40.0, 60.0, 80.0]) {
    Some(partition) => partition,
    None => panic!("age group cut points must ascend"),
};
/// Number of age groups.
pub const AGE_GROUPS: usize = AGE_PARTITION.size();
/// Event times are built by addition, so an age at a group boundary may
/// fall short of it by rounding.
const AGE_TOLERANCE: f64 = 1e-9;

/// Founder region frequencies.
const FOUNDER_REGIONS: [f64; REGIONS] = [0.5, 0.3, 0.2];
/// Child region frequencies, one row per mother's region.
const MIGRATION: [[f64; REGIONS]; REGIONS] = [
    [0.80, 0.15, 0.05],
    [0.10, 0.80, 0.10],
    [0.05, 0.15, 0.80],
];

const LIFETIME_SCALE: f64 = 80.0;
const LIFETIME_SHAPE: f64 = 5.0;
const FERTILE_FROM: f64 = 20.0;
const FERTILE_UNTIL: f64 = 40.0;
const BIRTH_RATE: f64 = 0.1;
/// Generations a case can reach. The last one has no children, which
/// bounds a case.
#[allow(clippy::panic)]
const GENERATIONS: Range = match Range::new(0, 3) {
    Some(range) => range,
    None => panic!("generation range must not be empty"),
};
/// Founders entering a time-based run.
pub const FOUNDERS: usize = 25;

const STREAM_LIFETIME: usize = 0;
const STREAM_REGION: usize = 1;
const STREAM_FERTILITY: usize = 2;

/// Table ids, in table-set order.
pub const LIFE_YEARS_TABLE: TableId = TableId::new(0);
/// Age-at-death table.
pub const DEATHS_TABLE: TableId = TableId::new(1);
/// Derived region share table.
pub const REGION_SHARE_TABLE: TableId = TableId::new(2);

/// One simulated person.
#[derive(Debug, Default)]
pub struct Person {
    time: Attribute<f64>,
    age: Attribute<f64>,
    age_group: Attribute<usize>,
    region: Attribute<usize>,
    alive: Attribute<bool>,
    generation: Attribute<i32>,
    births: Attribute<i32>,
    mother: Link<Person>,
    children: Multilink<Person>,
    serial: u64,
    birth_time: f64,
    death_time: f64,
    time_in: f64,
    age_in: f64,
    life_years: Increment,
    deaths: Increment,
}

impl Microdata for Person {
    fn microdata(&self) -> Vec<AttributeValue> {
        vec![
            AttributeValue::Int(self.generation.get()),
            AttributeValue::Int(i32::try_from(self.region.get()).unwrap_or(i32::MAX)),
            AttributeValue::Double(self.birth_time),
            AttributeValue::Double(self.age.get()),
            AttributeValue::Int(self.births.get()),
            AttributeValue::Bool(self.alive.get()),
            AttributeValue::Bool(self.mother.is_set()),
            AttributeValue::Long(i64::try_from(self.serial).unwrap_or(i64::MAX)),
        ]
    }
}

/// Exported attributes of [`Person`], in [`Microdata`] order.
pub fn person_layout() -> SnapshotLayout {
    SnapshotLayout::new(&[
        ("generation", AttributeType::Int),
        ("region", AttributeType::Int),
        ("birth_time", AttributeType::Double),
        ("age", AttributeType::Double),
        ("births", AttributeType::Int),
        ("alive", AttributeType::Bool),
        ("has_mother", AttributeType::Bool),
        ("serial", AttributeType::Long),
    ])
}

const fn life_cell(p: &Person) -> usize {
    p.region.get().saturating_mul(AGE_GROUPS).saturating_add(p.age_group.get())
}

fn accumulator(values: &[f64], index: usize) -> f64 {
    values.get(index).copied().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// Increments
// ---------------------------------------------------------------------------

const LIFE_YEARS: IncrementDef<Person, MemberContext> = IncrementDef {
    name: "life_years",
    read: |p| &p.life_years,
    write: |p| &mut p.life_years,
    init: |p, _, _, _| {
        p.time_in = p.time.get();
        Ok(())
    },
    push: |p, ctx, cell, _, _| {
        let values = [
            IncrementValues::new(p.time_in, p.time.get()),
            IncrementValues::default(),
        ];
        ctx.tables_mut().entity_table_mut(LIFE_YEARS_TABLE)?.push(cell, &values)
    },
    event_counter: MemberContext::event_counter,
};

const DEATHS: IncrementDef<Person, MemberContext> = IncrementDef {
    name: "deaths",
    read: |p| &p.deaths,
    write: |p| &mut p.deaths,
    init: |p, _, _, _| {
        p.age_in = p.age.get();
        Ok(())
    },
    push: |p, ctx, cell, _, _| {
        let age = IncrementValues::new(p.age_in, p.age.get());
        let values = [age, age, age, IncrementValues::default()];
        ctx.tables_mut().entity_table_mut(DEATHS_TABLE)?.push(cell, &values)
    },
    event_counter: MemberContext::event_counter,
};

/// Resolve increments left pending by an earlier event before any
/// classifying attribute changes.
fn settle(p: &mut Person, ctx: &mut MemberContext) -> Result<(), SimulationError> {
    LIFE_YEARS.finish_pending(p, ctx)?;
    DEATHS.finish_pending(p, ctx)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

const TIME: AttributeDef<Person, MemberContext, f64, SimulationError> = AttributeDef {
    name: "time",
    read: |p| &p.time,
    write: |p| &mut p.time,
    notify: Some(settle),
    side_effect: None,
};

const AGE: DurationDef<Person, MemberContext, SimulationError> = DurationDef {
    attribute: AttributeDef {
        name: "age",
        read: |p| &p.age,
        write: |p| &mut p.age,
        notify: Some(settle),
        side_effect: None,
    },
    condition: Some(|p| p.alive.get()),
};

const AGE_GROUP: ExpressionDef<Person, MemberContext, usize, SimulationError> = ExpressionDef {
    attribute: AttributeDef {
        name: "age_group",
        read: |p| &p.age_group,
        write: |p| &mut p.age_group,
        notify: Some(settle),
        side_effect: Some(|p, ctx, _, _| {
            let cell = life_cell(p);
            LIFE_YEARS.set_cell(p, ctx, cell);
            Ok(())
        }),
    },
    expression: |p| AGE_PARTITION.value_to_interval(p.age.get() + AGE_TOLERANCE),
};

const ALIVE: AttributeDef<Person, MemberContext, bool, SimulationError> = AttributeDef {
    name: "alive",
    read: |p| &p.alive,
    write: |p| &mut p.alive,
    notify: Some(settle),
    side_effect: Some(|p, ctx, _, alive| {
        LIFE_YEARS.set_filter(p, ctx, alive);
        DEATHS.set_filter(p, ctx, !alive);
        Ok(())
    }),
};

const BIRTHS: AttributeDef<Person, MemberContext, i32, SimulationError> =
    AttributeDef::plain("births", |p| &p.births, |p| &mut p.births);

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

const MOTHER: LinkDef<Person, Person, MemberContext, SimulationError> = LinkDef {
    name: "mother",
    read: |p| &p.mother,
    write: |p| &mut p.mother,
    side_effect: None,
    insert_reciprocal: Some(|arena, ctx, child, mother| {
        CHILDREN.insert(arena, ctx, mother, child).map(|_| ())
    }),
    erase_reciprocal: Some(|arena, ctx, child, mother| {
        CHILDREN.erase(arena, ctx, mother, child).map(|_| ())
    }),
};

const CHILDREN: MultilinkDef<Person, Person, MemberContext, SimulationError> = MultilinkDef {
    name: "children",
    read: |p| &p.children,
    write: |p| &mut p.children,
    side_effect: None,
    insert_reciprocal: Some(|arena, ctx, mother, child| {
        MOTHER.set(arena, ctx, child, Some(mother)).map(|_| ())
    }),
    erase_reciprocal: Some(|arena, ctx, mother, child| {
        if MOTHER.get(arena, child)? == Some(mother) {
            MOTHER.clear(arena, ctx, child)?;
        }
        Ok(())
    }),
};

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn region_share(tables: &TableSet, table: &mut Table) {
    let years: Vec<f64> = (0..REGIONS)
        .map(|region| {
            (0..AGE_GROUPS)
                .map(|group| tables.get_table_value("LifeYears.years", &[region, group]))
                .sum()
        })
        .collect();
    let total: f64 = years.iter().sum();
    let Some(share) = table.measure_id("share") else {
        return;
    };
    for (region, lived) in years.iter().enumerate() {
        let value = if total > 0.0 { lived / total } else { f64::NAN };
        if let Err(err) = table.set_value(share, &[region], value) {
            warn!(region, error = %err, "Region share not stored");
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Entities and pending events of one case or one time-based member.
struct World {
    people: EntityArena<Person>,
    living: EntitySet,
    calendar: Calendar,
}

impl World {
    /// Empty world whose ids continue after the member's earlier cases.
    fn open(ctx: &MemberContext) -> Self {
        Self {
            people: ctx.open_arena(),
            living: EntitySet::new(),
            calendar: Calendar::new(),
        }
    }

    /// Hand the serials used back to the member.
    fn close(self, ctx: &mut MemberContext) {
        ctx.close_arena(&self.people);
    }
}

/// The lifecourse model.
#[derive(Debug)]
pub struct Lifecourse {
    founder_regions: Cumrate,
    migration: Cumrate,
    layout: SnapshotLayout,
}

impl Lifecourse {
    /// Build the model's distributions.
    ///
    /// # Errors
    ///
    /// Returns a [`RandomError`] if a frequency table is malformed.
    pub fn new() -> Result<Self, RandomError> {
        Ok(Self {
            founder_regions: Cumrate::from_frequencies(1, REGIONS, &FOUNDER_REGIONS)?,
            migration: Cumrate::from_frequencies(REGIONS, REGIONS, MIGRATION.as_flattened())?,
            layout: person_layout(),
        })
    }

    /// Weibull lifetime drawn through the `rand` adapter of the lifetime stream.
    fn draw_lifetime(ctx: &mut MemberContext) -> Result<f64, SimulationError> {
        let uniform: f64 = ctx.stream(STREAM_LIFETIME)?.random();
        Ok(LIFETIME_SCALE * (-(-uniform).ln_1p()).powf(LIFETIME_SHAPE.recip()))
    }

    /// Age at the next birth after `age`, if one falls in the fertile window.
    fn draw_next_birth(ctx: &mut MemberContext, age: f64) -> Result<Option<f64>, SimulationError> {
        let uniform = ctx.uniform(STREAM_FERTILITY)?;
        let wait = -(-uniform).ln_1p() / BIRTH_RATE;
        let next = age.max(FERTILE_FROM) + wait;
        Ok((next < FERTILE_UNTIL).then_some(next))
    }

    fn schedule_birth(
        world: &mut World,
        ctx: &mut MemberContext,
        id: EntityId,
        age: f64,
    ) -> Result<(), SimulationError> {
        let person = world.people.entity(id)?;
        if !GENERATIONS.within(person.generation.get().saturating_add(1)) {
            return Ok(());
        }
        let (birth_time, death_time) = (person.birth_time, person.death_time);
        if let Some(next) = Self::draw_next_birth(ctx, age)? {
            let time = birth_time + next;
            if time < death_time {
                world.calendar.schedule(time, id, EventKind::Birth);
            }
        }
        Ok(())
    }

    fn schedule_age_group(world: &mut World, id: EntityId) -> Result<(), SimulationError> {
        let person = world.people.entity(id)?;
        let Some(bound) = AGE_PARTITION.upper(AGE_GROUP.get(person)) else {
            return Ok(());
        };
        let time = person.birth_time + bound;
        if time.is_finite() && time < person.death_time {
            world.calendar.schedule(time, id, EventKind::AgeGroup);
        }
        Ok(())
    }

    /// Create a newborn at `time` and schedule its life events.
    fn enter(
        world: &mut World,
        ctx: &mut MemberContext,
        time: f64,
        region: usize,
        generation: i32,
    ) -> Result<EntityId, SimulationError> {
        let lifetime = Self::draw_lifetime(ctx)?;
        let mut person = Person::default();
        person.time.initialize(time);
        person.region.initialize(region);
        person.alive.initialize(true);
        person.generation.initialize(generation);
        person.birth_time = time;
        person.death_time = time + lifetime;
        let cell = life_cell(&person);
        LIFE_YEARS.initialize(&mut person, ctx, cell, true)?;
        DEATHS.initialize(&mut person, ctx, region, false)?;

        let death_time = person.death_time;
        let id = world.people.spawn(person)?;
        world.people.entity_mut(id)?.serial = id.serial();
        world.living.insert(id);
        world.calendar.schedule(death_time, id, EventKind::Death);
        Self::schedule_age_group(world, id)?;
        Self::schedule_birth(world, ctx, id, 0.0)?;
        debug!(%id, time, region, generation, lifetime, "Person entered");
        Ok(id)
    }

    fn enter_founder(&self, world: &mut World, ctx: &mut MemberContext) -> Result<EntityId, SimulationError> {
        let region = self.founder_regions.draw(0, ctx.uniform(STREAM_REGION)?)?;
        Self::enter(world, ctx, 0.0, region, 0)
    }

    /// Bring `person`'s clock and age forward to `time`.
    fn advance(person: &mut Person, ctx: &mut MemberContext, time: f64) -> Result<(), SimulationError> {
        let elapsed = time - TIME.get(person);
        TIME.set(person, ctx, time)?;
        AGE.wait(person, ctx, elapsed)?;
        Ok(())
    }

    fn give_birth(
        &self,
        world: &mut World,
        ctx: &mut MemberContext,
        mother: EntityId,
        time: f64,
    ) -> Result<(), SimulationError> {
        let (region, generation, age) = {
            let person = world.people.entity(mother)?;
            (person.region.get(), person.generation.get(), AGE.get(person))
        };
        let child_region = self.migration.draw(region, ctx.uniform(STREAM_REGION)?)?;
        let child = Self::enter(world, ctx, time, child_region, generation.saturating_add(1))?;
        MOTHER.set(&mut world.people, ctx, child, Some(mother))?;

        let person = world.people.entity_mut(mother)?;
        let births = BIRTHS.get(person).saturating_add(1);
        BIRTHS.set(person, ctx, births)?;
        Self::schedule_birth(world, ctx, mother, age)
    }

    /// Close every increment, hand off microdata and remove `id`.
    fn exit(&self, world: &mut World, ctx: &mut MemberContext, id: EntityId) -> Result<(), SimulationError> {
        let person = world.people.entity_mut(id)?;
        LIFE_YEARS.finalize(person, ctx)?;
        DEATHS.finalize(person, ctx)?;
        let row = self.layout.encode_entity(&*person)?;
        ctx.push_microdata(row);

        MOTHER.clear(&mut world.people, ctx, id)?;
        CHILDREN.clear(&mut world.people, ctx, id)?;
        world.people.remove(id);
        world.living.remove(id);
        Ok(())
    }

    fn handle(&self, world: &mut World, ctx: &mut MemberContext, event: Event) -> Result<(), SimulationError> {
        if !world.people.contains(event.person) {
            return Ok(());
        }
        ctx.next_event(event.time)?;
        let person = world.people.entity_mut(event.person)?;
        Self::advance(person, ctx, event.time)?;
        match event.kind {
            EventKind::AgeGroup => {
                AGE_GROUP.evaluate(person, ctx)?;
                Self::schedule_age_group(world, event.person)
            }
            EventKind::Birth => self.give_birth(world, ctx, event.person, event.time),
            EventKind::Death => {
                ALIVE.set(person, ctx, false)?;
                self.exit(world, ctx, event.person)
            }
        }
    }
}

impl Model for Lifecourse {
    fn name(&self) -> &str {
        "lifecourse"
    }

    fn tables(&self) -> Result<Vec<TableKind>, TableError> {
        let life_years = EntityTable::new(
            LIFE_YEARS_TABLE,
            "LifeYears",
            &[REGIONS, AGE_GROUPS],
            &[
                AccumulatorSpec {
                    statistic: Statistic::Sum,
                    increment: IncrementKind::Delta,
                    attribute: "time",
                },
                AccumulatorSpec {
                    statistic: Statistic::Unit,
                    increment: IncrementKind::Unit,
                    attribute: "time",
                },
            ],
            &[
                MeasureSpec {
                    name: "years",
                    expression: |acc| accumulator(acc, 0),
                },
                MeasureSpec {
                    name: "spells",
                    expression: |acc| accumulator(acc, 1),
                },
            ],
        )?;

        let age_at_death = |statistic| AccumulatorSpec {
            statistic,
            increment: IncrementKind::ValueOut,
            attribute: "age",
        };
        let deaths = EntityTable::new(
            DEATHS_TABLE,
            "Deaths",
            &[REGIONS],
            &[
                age_at_death(Statistic::Mean),
                age_at_death(Statistic::P50),
                age_at_death(Statistic::Maximum),
                AccumulatorSpec {
                    statistic: Statistic::Unit,
                    increment: IncrementKind::Unit,
                    attribute: "age",
                },
            ],
            &[
                MeasureSpec {
                    name: "mean_age",
                    expression: |acc| accumulator(acc, 0),
                },
                MeasureSpec {
                    name: "median_age",
                    expression: |acc| accumulator(acc, 1),
                },
                MeasureSpec {
                    name: "oldest",
                    expression: |acc| accumulator(acc, 2),
                },
                MeasureSpec {
                    name: "deaths",
                    expression: |acc| accumulator(acc, 3),
                },
            ],
        )?;

        let share = DerivedTable::new(REGION_SHARE_TABLE, "RegionShare", &[REGIONS], &["share"], region_share)?;
        Ok(vec![life_years.into(), deaths.into(), share.into()])
    }

    fn simulate_case(&self, ctx: &mut MemberContext) -> Result<(), SimulationError> {
        let mut world = World::open(ctx);
        self.enter_founder(&mut world, ctx)?;
        while let Some(event) = world.calendar.pop() {
            self.handle(&mut world, ctx, event)?;
        }
        world.close(ctx);
        Ok(())
    }

    fn simulate_time(&self, ctx: &mut MemberContext, end_time: f64) -> Result<(), SimulationError> {
        let mut world = World::open(ctx);
        for _ in 0..FOUNDERS {
            self.enter_founder(&mut world, ctx)?;
        }
        while let Some(event) = world.calendar.pop_until(end_time) {
            self.handle(&mut world, ctx, event)?;
        }

        // Censor survivors. Children go first so every mother link they
        // clear still points at a live entity.
        ctx.next_event(end_time)?;
        let survivors: Vec<EntityId> = world.living.iter().rev().collect();
        debug!(
            survivors = survivors.len(),
            pending = world.calendar.len(),
            "Time-based member reached end time"
        );
        for id in survivors {
            Self::advance(world.people.entity_mut(id)?, ctx, end_time)?;
            self.exit(&mut world, ctx, id)?;
        }
        world.close(ctx);
        Ok(())
    }
}
