//! Integration tests for lagged increments driven by attribute hooks.
//!
//! A small `Person` entity with a classificatory `group` attribute, a
//! `time` attribute and one increment into a `[2, 3]` table. Attribute
//! hooks resolve pending closes before changes and request closes after
//! dimension changes, exactly as generated model code does.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.

use microsim_entity::{Attribute, AttributeDef};
use microsim_tables::{
    AccumulatorSpec, EntityTable, Increment, IncrementDef, IncrementValues, Lagged, MeasureSpec, TableError,
    TableLifecycle, TableSet,
};
use microsim_types::{IncrementKind, Statistic, TableId};

const SPAN: TableId = TableId::new(0);

#[derive(Debug, Default)]
struct Person {
    time: Attribute<f64>,
    region: Attribute<usize>,
    band: Attribute<usize>,
    region_lag: Lagged<usize>,
    band_lag: Lagged<usize>,
    time_in: f64,
    span: Increment,
}

struct Ctx {
    event: u64,
    tables: TableSet,
}

fn cell_of(person: &Person) -> usize {
    person.region.get() * 3 + person.band.get()
}

const SPAN_INCREMENT: IncrementDef<Person, Ctx> = IncrementDef {
    name: "span",
    read: |p| &p.span,
    write: |p| &mut p.span,
    init: |p, _, _, _| {
        p.time_in = p.time.get();
        Ok(())
    },
    push: |p, ctx, cell_in, _, _| {
        ctx.tables
            .entity_table_mut(SPAN)?
            .push(cell_in, &[IncrementValues::new(p.time_in, p.time.get())])
    },
    event_counter: |ctx| ctx.event,
};

fn finish_span(p: &mut Person, ctx: &mut Ctx) -> Result<(), TableError> {
    SPAN_INCREMENT.finish_pending(p, ctx).map(|_| ())
}

const TIME: AttributeDef<Person, Ctx, f64, TableError> = AttributeDef {
    name: "time",
    read: |p| &p.time,
    write: |p| &mut p.time,
    notify: Some(finish_span),
    side_effect: None,
};

const REGION: AttributeDef<Person, Ctx, usize, TableError> = AttributeDef {
    name: "region",
    read: |p| &p.region,
    write: |p| &mut p.region,
    notify: Some(finish_span),
    side_effect: Some(|p, ctx, old, _| {
        p.region_lag.record(old, ctx.event);
        let cell = cell_of(p);
        SPAN_INCREMENT.set_cell(p, ctx, cell);
        Ok(())
    }),
};

const BAND: AttributeDef<Person, Ctx, usize, TableError> = AttributeDef {
    name: "band",
    read: |p| &p.band,
    write: |p| &mut p.band,
    notify: Some(finish_span),
    side_effect: Some(|p, ctx, old, _| {
        p.band_lag.record(old, ctx.event);
        let cell = cell_of(p);
        SPAN_INCREMENT.set_cell(p, ctx, cell);
        Ok(())
    }),
};

fn context() -> Ctx {
    let table = EntityTable::new(
        SPAN,
        "Span",
        &[2, 3],
        &[AccumulatorSpec {
            statistic: Statistic::Sum,
            increment: IncrementKind::Delta,
            attribute: "time",
        }],
        &[MeasureSpec {
            name: "duration",
            expression: |acc| acc[0],
        }],
    )
    .unwrap();
    let mut tables = TableSet::new(vec![table.into()]).unwrap();
    tables.initialize();
    Ctx { event: 0, tables }
}

fn enter(person: &mut Person, ctx: &mut Ctx) {
    let cell = cell_of(person);
    SPAN_INCREMENT.initialize(person, ctx, cell, true).unwrap();
}

fn accumulated(ctx: &Ctx) -> Vec<f64> {
    ctx.tables.entity_table(SPAN).unwrap().accumulator(0).unwrap().to_vec()
}

#[test]
fn change_and_revert_within_one_event_attributes_whole_span_to_origin() {
    let mut ctx = context();
    let mut person = Person::default();
    enter(&mut person, &mut ctx);

    ctx.event = 1;
    TIME.set(&mut person, &mut ctx, 4.0).unwrap();

    ctx.event = 2;
    TIME.set(&mut person, &mut ctx, 7.0).unwrap();
    REGION.set(&mut person, &mut ctx, 1).unwrap();
    BAND.set(&mut person, &mut ctx, 2).unwrap();
    REGION.set(&mut person, &mut ctx, 0).unwrap();
    BAND.set(&mut person, &mut ctx, 0).unwrap();

    ctx.event = 3;
    TIME.set(&mut person, &mut ctx, 10.0).unwrap();
    SPAN_INCREMENT.finalize(&mut person, &mut ctx).unwrap();

    let sums = accumulated(&ctx);
    assert!((sums[0] - 10.0).abs() < f64::EPSILON);
    assert!(sums[1..].iter().all(|v| v.abs() < f64::EPSILON));
    assert_eq!(ctx.tables.entity_table(SPAN).unwrap().count(0), 1);
    assert_eq!(ctx.tables.entity_table(SPAN).unwrap().count(5), 0);
}

#[test]
fn real_change_splits_span_at_the_event() {
    let mut ctx = context();
    let mut person = Person::default();
    enter(&mut person, &mut ctx);

    ctx.event = 1;
    TIME.set(&mut person, &mut ctx, 3.0).unwrap();
    REGION.set(&mut person, &mut ctx, 1).unwrap();
    BAND.set(&mut person, &mut ctx, 2).unwrap();
    assert!(SPAN_INCREMENT.state(&person).is_pending());

    ctx.event = 2;
    TIME.set(&mut person, &mut ctx, 8.0).unwrap();
    assert!(!SPAN_INCREMENT.state(&person).is_pending());
    assert_eq!(SPAN_INCREMENT.state(&person).cell_in(), 5);

    SPAN_INCREMENT.finalize(&mut person, &mut ctx).unwrap();
    let sums = accumulated(&ctx);
    assert!((sums[0] - 3.0).abs() < f64::EPSILON);
    assert!((sums[5] - 5.0).abs() < f64::EPSILON);
}

#[test]
fn lagged_values_report_classification_before_the_change() {
    let mut ctx = context();
    let mut person = Person::default();
    enter(&mut person, &mut ctx);

    ctx.event = 4;
    REGION.set(&mut person, &mut ctx, 1).unwrap();
    REGION.set(&mut person, &mut ctx, 0).unwrap();
    REGION.set(&mut person, &mut ctx, 1).unwrap();

    let state = SPAN_INCREMENT.state(&person);
    let lagged = person
        .region_lag
        .resolve(person.region.get(), state.is_pending(), state.pending_event());
    assert_eq!(lagged, 0);
    assert_eq!(person.band_lag.resolve(person.band.get(), true, 4), 0);
}

#[test]
fn exit_in_the_requesting_event_flushes_both_intervals() {
    let mut ctx = context();
    let mut person = Person::default();
    enter(&mut person, &mut ctx);

    ctx.event = 1;
    TIME.set(&mut person, &mut ctx, 2.0).unwrap();
    BAND.set(&mut person, &mut ctx, 1).unwrap();
    SPAN_INCREMENT.finalize(&mut person, &mut ctx).unwrap();

    let table = ctx.tables.entity_table(SPAN).unwrap();
    assert_eq!(table.count(0), 1);
    assert_eq!(table.count(1), 1);
    assert!((table.accumulator(0).unwrap()[0] - 2.0).abs() < f64::EPSILON);
    assert!(table.accumulator(0).unwrap()[1].abs() < f64::EPSILON);
}

#[test]
fn finished_tables_expose_measures_by_name() {
    let mut ctx = context();
    let mut person = Person::default();
    enter(&mut person, &mut ctx);
    ctx.event = 1;
    TIME.set(&mut person, &mut ctx, 6.5).unwrap();
    SPAN_INCREMENT.finalize(&mut person, &mut ctx).unwrap();

    ctx.tables.finish(1.0).unwrap();
    assert!((ctx.tables.get_table_value("Span.duration", &[0, 0]) - 6.5).abs() < f64::EPSILON);
    assert!(ctx.tables.get_table_value("Span.duration", &[1, 2]).abs() < f64::EPSILON);
    assert!(ctx.tables.get_table_value("Span.duration", &[2, 0]).is_nan());
    let blocks = ctx.tables.entity_table(SPAN).unwrap().accumulator_blocks();
    assert_eq!(blocks[0].values.len(), 6);
}
