//! Integration tests for the member runner with a small lagging model.
//!
//! Each case enters one person in cell (0,0), moves it to (1,2) and back
//! within a single event, and exits after a random lifetime. The whole
//! lifetime must land in cell (0,0).

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.

use std::sync::Arc;

use microsim_core::config::{RunConfig, RunSection};
use microsim_core::context::MemberContext;
use microsim_core::error::SimulationError;
use microsim_core::runner::{MemberResult, Model, RunnerError, run_members};
use microsim_entity::{Attribute, AttributeDef};
use microsim_tables::{
    AccumulatorSpec, EntityTable, Increment, IncrementDef, IncrementValues, MeasureSpec, TableError, TableKind,
};
use microsim_types::{IncrementKind, SimulationMode, Statistic, TableId};

const SPAN: TableId = TableId::new(0);

#[derive(Debug, Default)]
struct Person {
    time: Attribute<f64>,
    region: Attribute<usize>,
    band: Attribute<usize>,
    time_in: f64,
    span: Increment,
}

const SPAN_INCREMENT: IncrementDef<Person, MemberContext> = IncrementDef {
    name: "span",
    read: |p| &p.span,
    write: |p| &mut p.span,
    init: |p, _, _, _| {
        p.time_in = p.time.get();
        Ok(())
    },
    push: |p, ctx, cell_in, _, _| {
        let values = [
            IncrementValues::new(p.time_in, p.time.get()),
            IncrementValues::default(),
        ];
        ctx.tables_mut().entity_table_mut(SPAN)?.push(cell_in, &values)
    },
    event_counter: MemberContext::event_counter,
};

fn finish_span(p: &mut Person, ctx: &mut MemberContext) -> Result<(), SimulationError> {
    SPAN_INCREMENT.finish_pending(p, ctx)?;
    Ok(())
}

fn reclassify(p: &mut Person, ctx: &mut MemberContext) {
    let cell = p.region.get() * 3 + p.band.get();
    SPAN_INCREMENT.set_cell(p, ctx, cell);
}

const TIME: AttributeDef<Person, MemberContext, f64, SimulationError> = AttributeDef {
    name: "time",
    read: |p| &p.time,
    write: |p| &mut p.time,
    notify: Some(finish_span),
    side_effect: None,
};

const REGION: AttributeDef<Person, MemberContext, usize, SimulationError> = AttributeDef {
    name: "region",
    read: |p| &p.region,
    write: |p| &mut p.region,
    notify: Some(finish_span),
    side_effect: Some(|p, ctx, _, _| {
        reclassify(p, ctx);
        Ok(())
    }),
};

const BAND: AttributeDef<Person, MemberContext, usize, SimulationError> = AttributeDef {
    name: "band",
    read: |p| &p.band,
    write: |p| &mut p.band,
    notify: Some(finish_span),
    side_effect: Some(|p, ctx, _, _| {
        reclassify(p, ctx);
        Ok(())
    }),
};

struct Flicker {
    failing_member: Option<u32>,
}

impl Model for Flicker {
    fn name(&self) -> &str {
        "flicker"
    }

    fn tables(&self) -> Result<Vec<TableKind>, TableError> {
        let span = EntityTable::new(
            SPAN,
            "Span",
            &[2, 3],
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
                    expression: |acc| acc[0],
                },
                MeasureSpec {
                    name: "intervals",
                    expression: |acc| acc[1],
                },
            ],
        )?;
        Ok(vec![span.into()])
    }

    fn simulate_case(&self, ctx: &mut MemberContext) -> Result<(), SimulationError> {
        if self.failing_member == Some(ctx.member()) {
            return Err(SimulationError::Model {
                message: "refusing to simulate".to_owned(),
            });
        }
        let mut person = Person::default();
        SPAN_INCREMENT.initialize(&mut person, ctx, 0, true)?;
        let lifetime = 2.0 + ctx.uniform(0)? * 10.0;

        ctx.next_event(1.0)?;
        TIME.set(&mut person, ctx, 1.0)?;
        REGION.set(&mut person, ctx, 1)?;
        BAND.set(&mut person, ctx, 2)?;
        REGION.set(&mut person, ctx, 0)?;
        BAND.set(&mut person, ctx, 0)?;

        ctx.next_event(lifetime)?;
        TIME.set(&mut person, ctx, lifetime)?;
        SPAN_INCREMENT.finalize(&mut person, ctx)?;
        Ok(())
    }

    fn simulate_time(&self, ctx: &mut MemberContext, end_time: f64) -> Result<(), SimulationError> {
        let mut person = Person::default();
        SPAN_INCREMENT.initialize(&mut person, ctx, 0, true)?;
        let mut time = 1.0;
        let mut region = 1;
        while time < end_time {
            ctx.next_event(time)?;
            TIME.set(&mut person, ctx, time)?;
            REGION.set(&mut person, ctx, region)?;
            region = 1 - region;
            time += 1.0;
        }
        ctx.next_event(end_time)?;
        TIME.set(&mut person, ctx, end_time)?;
        SPAN_INCREMENT.finalize(&mut person, ctx)?;
        Ok(())
    }
}

fn config(mode: SimulationMode, sub_samples: u32, cases: u64, threads: usize) -> RunConfig {
    RunConfig {
        run: RunSection {
            mode,
            sub_samples,
            cases,
            threads,
            end_time: 6.0,
            ..RunSection::default()
        },
        ..RunConfig::default()
    }
}

fn measure<'a>(member: &'a MemberResult, name: &str) -> &'a [f64] {
    &member
        .measures
        .iter()
        .find(|block| block.name == name)
        .expect("measure present")
        .values
}

#[tokio::test]
async fn same_event_flicker_never_reaches_other_cells() {
    let model = Arc::new(Flicker { failing_member: None });
    let summary = run_members(model, &config(SimulationMode::CaseBased, 2, 10, 0))
        .await
        .unwrap();

    assert_eq!(summary.members.len(), 2);
    assert_eq!(summary.total_cases(), 10);
    for member in &summary.members {
        let years = measure(member, "Span.years");
        let intervals = measure(member, "Span.intervals");
        assert!((intervals[0] - 5.0).abs() < f64::EPSILON);
        assert!(years[0] >= 10.0);
        assert!(years[1..].iter().all(|v| v.abs() < f64::EPSILON));
        assert!(intervals[1..].iter().all(|v| v.abs() < f64::EPSILON));
    }
}

#[tokio::test]
async fn member_output_is_independent_of_other_members_and_threads() {
    let alone = run_members(
        Arc::new(Flicker { failing_member: None }),
        &config(SimulationMode::CaseBased, 1, 4, 0),
    )
    .await
    .unwrap();
    let crowded = run_members(
        Arc::new(Flicker { failing_member: None }),
        &config(SimulationMode::CaseBased, 3, 12, 1),
    )
    .await
    .unwrap();

    let member = |summary: &microsim_core::runner::RunSummary, index: usize| {
        measure(&summary.members[index], "Span.years").to_vec()
    };
    assert_eq!(member(&alone, 0), member(&crowded, 0));
    assert_ne!(member(&crowded, 0), member(&crowded, 1));
    assert_eq!(
        crowded.members.iter().map(|m| m.member).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[tokio::test]
async fn time_based_member_splits_span_between_regions() {
    let summary = run_members(
        Arc::new(Flicker { failing_member: None }),
        &config(SimulationMode::TimeBased, 1, 1, 0),
    )
    .await
    .unwrap();
    let years = measure(&summary.members[0], "Span.years");
    // Region 0 over [0,1), [2,3), [4,5); region 1 over [1,2), [3,4), [5,6).
    assert!((years[0] - 3.0).abs() < f64::EPSILON);
    assert!((years[3] - 3.0).abs() < f64::EPSILON);
    assert_eq!(summary.total_cases(), 0);
    assert!(summary.total_events() >= 6);
}

#[tokio::test]
async fn member_failure_aborts_the_run() {
    let result = run_members(
        Arc::new(Flicker {
            failing_member: Some(1),
        }),
        &config(SimulationMode::CaseBased, 3, 3, 0),
    )
    .await;
    assert!(matches!(result, Err(RunnerError::Member { member: 1, .. })));
}

#[tokio::test]
async fn invalid_config_is_rejected_before_running() {
    let mut bad = config(SimulationMode::CaseBased, 1, 1, 0);
    bad.run.starting_seed = 0;
    let result = run_members(Arc::new(Flicker { failing_member: None }), &bad).await;
    assert!(matches!(result, Err(RunnerError::Config { .. })));
}
