//! Roll-up of curves from tasks to stages and from stages to projects.
//!
//! Children cover different week ranges. Their points are merged into an
//! ordered map keyed by week; a child without a point in a given week
//! contributes zero to it. CPI and SPI are recomputed from the summed values
//! (ratio of sums), never averaged.

use super::curve::compute_curve;
use super::{ratio, round_money};
use crate::error::{EvmError, EvmResult};
use crate::models::AggregatePoint;
use crate::store::{TaskRepository, WeeklyStore};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    pv: f64,
    ev: f64,
    ac: f64,
}

/// Sum child curves week by week.
///
/// The result does not depend on the order of `curves`.
pub fn aggregate_curves<I>(curves: I) -> Vec<AggregatePoint>
where
    I: IntoIterator<Item = Vec<AggregatePoint>>,
{
    let mut weeks: BTreeMap<NaiveDate, Totals> = BTreeMap::new();

    for curve in curves {
        for point in curve {
            let totals = weeks.entry(point.week_start_date).or_default();
            totals.pv += point.cumulative_pv;
            totals.ev += point.cumulative_ev;
            totals.ac += point.cumulative_ac;
        }
    }

    weeks
        .into_iter()
        .map(|(week_start_date, totals)| AggregatePoint {
            week_start_date,
            cumulative_pv: round_money(totals.pv),
            cumulative_ev: round_money(totals.ev),
            cumulative_ac: round_money(totals.ac),
            cpi: ratio(totals.ev, totals.ac),
            spi: ratio(totals.ev, totals.pv),
        })
        .collect()
}

/// Curve of a stage: the sum of its trackable tasks.
pub fn compute_stage_curve<S>(
    store: &S,
    stage_id: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> EvmResult<Vec<AggregatePoint>>
where
    S: TaskRepository + WeeklyStore + ?Sized,
{
    if store.stage(stage_id).is_none() {
        return Err(EvmError::UnknownStage(stage_id.to_string()));
    }

    let tasks: Vec<_> = store
        .tasks_in_stage(stage_id)
        .into_iter()
        .filter(|t| t.is_trackable())
        .collect();
    debug!("Aggregating {} tasks for stage {}", tasks.len(), stage_id);

    Ok(aggregate_curves(tasks.iter().map(|task| {
        compute_curve(store, task, from, to)
            .iter()
            .map(AggregatePoint::from)
            .collect::<Vec<_>>()
    })))
}

/// Curve of a project: the sum of its stages.
pub fn compute_project_curve<S>(
    store: &S,
    project_id: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> EvmResult<Vec<AggregatePoint>>
where
    S: TaskRepository + WeeklyStore + ?Sized,
{
    if !store.has_project(project_id) {
        return Err(EvmError::UnknownProject(project_id.to_string()));
    }

    let stages = store.stages_in_project(project_id);
    debug!("Aggregating {} stages for project {}", stages.len(), project_id);

    let mut curves = Vec::with_capacity(stages.len());
    for stage in &stages {
        curves.push(compute_stage_curve(store, &stage.id, from, to)?);
    }
    Ok(aggregate_curves(curves))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evm::testutil::*;
    use crate::evm::{EngineConfig, EvmEngine};
    use crate::models::{Stage, Task};
    use crate::store::MemoryStore;

    /// Fundaciones plus an overlapping task, a later task in a second stage
    /// and an unbudgeted task that must be ignored.
    fn building_store() -> MemoryStore {
        let store = fundaciones_store();
        let muros = task("muros", "s-obra", date(2024, 1, 10), date(2024, 1, 24), 30.0, 90_000.0);
        store.insert_task(muros).unwrap();
        store
            .insert_stage(Stage {
                id: "s-term".to_string(),
                project_id: "p-edificio".to_string(),
                name: "Terminaciones".to_string(),
            })
            .unwrap();
        let pintura = task("pintura", "s-term", date(2024, 1, 22), date(2024, 2, 4), 400.0, 40_000.0);
        store.insert_task(pintura).unwrap();
        store
            .insert_task(Task {
                planned_labor_budget: None,
                ..task("limpieza", "s-obra", date(2024, 1, 1), date(2024, 3, 1), 1.0, 0.0)
            })
            .unwrap();

        for entry in [
            approved("m-1", "muros", date(2024, 1, 11), 4.0, 1.0),
            approved("m-2", "muros", date(2024, 1, 18), 6.0, 2.0),
            approved("p-1", "pintura", date(2024, 1, 23), 100.0, 0.5),
            approved("l-1", "limpieza", date(2024, 1, 2), 1.0, 10.0),
        ] {
            store.record_progress(entry).unwrap();
        }

        let engine = EvmEngine::new(&store, EngineConfig::default());
        engine.recompute_tasks(&store.all_tasks());
        store
    }

    fn task_points(store: &MemoryStore, id: &str) -> Vec<AggregatePoint> {
        let task = store.task(id).unwrap();
        compute_curve(store, &task, None, None)
            .iter()
            .map(AggregatePoint::from)
            .collect()
    }

    #[test]
    fn test_stage_equals_sum_of_tasks() {
        let store = building_store();
        let stage = compute_stage_curve(&store, "s-obra", None, None).unwrap();
        let fundaciones = task_points(&store, "fundaciones");
        let muros = task_points(&store, "muros");

        // Union of 01-01..01-15 and 01-08..01-22.
        let weeks: Vec<_> = stage.iter().map(|p| p.week_start_date).collect();
        assert_eq!(
            weeks,
            vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 15), date(2024, 1, 22)]
        );

        for point in &stage {
            let at = |curve: &[AggregatePoint]| {
                curve
                    .iter()
                    .find(|p| p.week_start_date == point.week_start_date)
                    .map(|p| (p.cumulative_pv, p.cumulative_ev, p.cumulative_ac))
                    .unwrap_or((0.0, 0.0, 0.0))
            };
            let (pv_f, ev_f, ac_f) = at(&fundaciones);
            let (pv_m, ev_m, ac_m) = at(&muros);
            assert!((point.cumulative_pv - (pv_f + pv_m)).abs() < 0.01);
            assert!((point.cumulative_ev - (ev_f + ev_m)).abs() < 0.01);
            assert!((point.cumulative_ac - (ac_f + ac_m)).abs() < 0.01);
        }
    }

    #[test]
    fn test_ratios_are_ratio_of_sums() {
        let store = building_store();
        let stage = compute_stage_curve(&store, "s-obra", None, None).unwrap();
        let last = stage.last().unwrap();

        // Fundaciones has no point in the week of 01-22 and contributes
        // nothing there; muros alone gives PV 90000, EV 90000*10/30, AC 3h.
        assert_eq!(last.cumulative_pv, 90_000.0);
        assert_eq!(last.cumulative_ev, 30_000.0);
        assert_eq!(last.cumulative_ac, 60_000.0);
        assert_eq!(last.cpi, Some(0.5));
        assert_eq!(last.spi, Some(0.333));

        // Week of 01-15: fundaciones PV 300000, EV 150000, AC 140000;
        // muros PV 60000, EV 30000, AC 60000.
        let week3 = &stage[2];
        assert_eq!(week3.cumulative_pv, 360_000.0);
        assert_eq!(week3.cumulative_ev, 180_000.0);
        assert_eq!(week3.cumulative_ac, 200_000.0);
        assert_eq!(week3.cpi, Some(0.9));
        assert_eq!(week3.spi, Some(0.5));
    }

    #[test]
    fn test_order_independence() {
        let store = building_store();
        let a = task_points(&store, "fundaciones");
        let b = task_points(&store, "muros");
        let c = task_points(&store, "pintura");

        let forward = aggregate_curves(vec![a.clone(), b.clone(), c.clone()]);
        let backward = aggregate_curves(vec![c, b, a]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_project_sums_stages() {
        let store = building_store();
        let project = compute_project_curve(&store, "p-edificio", None, None).unwrap();
        let obra = compute_stage_curve(&store, "s-obra", None, None).unwrap();
        let term = compute_stage_curve(&store, "s-term", None, None).unwrap();

        assert_eq!(project, aggregate_curves(vec![obra, term]));
        // 01-22 carries muros and pintura.
        let week = project
            .iter()
            .find(|p| p.week_start_date == date(2024, 1, 22))
            .unwrap();
        assert_eq!(week.cumulative_pv, 110_000.0);
        assert_eq!(project.last().unwrap().week_start_date, date(2024, 1, 29));
    }

    #[test]
    fn test_window_is_passed_down() {
        let store = building_store();
        let windowed =
            compute_stage_curve(&store, "s-obra", Some(date(2024, 1, 8)), Some(date(2024, 1, 15)))
                .unwrap();
        assert_eq!(windowed.len(), 2);
        assert_eq!(windowed[0].week_start_date, date(2024, 1, 8));
    }

    #[test]
    fn test_empty_and_unknown() {
        let store = building_store();
        store
            .insert_stage(Stage {
                id: "s-vacia".to_string(),
                project_id: "p-edificio".to_string(),
                name: "Vacía".to_string(),
            })
            .unwrap();
        assert!(compute_stage_curve(&store, "s-vacia", None, None).unwrap().is_empty());
        assert!(aggregate_curves(Vec::<Vec<AggregatePoint>>::new()).is_empty());

        assert!(matches!(
            compute_stage_curve(&store, "nope", None, None),
            Err(EvmError::UnknownStage(_))
        ));
        assert!(matches!(
            compute_project_curve(&store, "nope", None, None),
            Err(EvmError::UnknownProject(_))
        ));
    }
}
