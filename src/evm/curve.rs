//! Cumulative S-curves per task.
//!
//! PV and AC accumulate week by week. EV is recomputed every week from the
//! cumulative share of the planned quantity actually delivered, so it does
//! not drift. EV is measured against the task's labor budget and the planned
//! quantity of the full plan, also when the curve is limited to a date window.

use super::{ratio, round_money, round_ratio};
use crate::models::{
    AggregatePoint, PerformanceSnapshot, SCurvePoint, Task, WeeklyActual, WeeklyPlan,
};
use crate::store::WeeklyStore;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone, Copy)]
struct WeekPlan {
    quantity: f64,
    value: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct WeekActual {
    quantity: f64,
    cost: f64,
}

fn in_window(week: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    from.map_or(true, |f| week >= f) && to.map_or(true, |t| week <= t)
}

/// Merge weekly plan and actual rows into a cumulative curve.
///
/// `budget` is the task's labor budget, earned in proportion to the delivered
/// share of the planned quantity. `from`/`to` restrict the weeks emitted
/// (inclusive). Empty input gives an empty curve.
pub fn build_curve(
    plan: &[WeeklyPlan],
    actuals: &[WeeklyActual],
    budget: f64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<SCurvePoint> {
    let mut planned: BTreeMap<NaiveDate, WeekPlan> = BTreeMap::new();
    for row in plan {
        let week = planned.entry(row.week_start_date).or_default();
        week.quantity += row.planned_quantity_this_week;
        week.value += row.planned_value_this_week;
    }

    let mut actual: BTreeMap<NaiveDate, WeekActual> = BTreeMap::new();
    for row in actuals {
        let week = actual.entry(row.week_start_date).or_default();
        week.quantity += row.actual_quantity_completed;
        week.cost += row.actual_cost;
    }

    let weeks: BTreeSet<NaiveDate> = planned
        .keys()
        .chain(actual.keys())
        .copied()
        .filter(|w| in_window(*w, from, to))
        .collect();
    if weeks.is_empty() {
        return Vec::new();
    }

    // Unfiltered total.
    let mut planned_quantity_total: f64 = planned.values().map(|w| w.quantity).sum();
    if planned_quantity_total == 0.0 {
        planned_quantity_total = 1.0;
    }

    let mut pv_cum = 0.0;
    let mut ac_cum = 0.0;
    let mut qty_planned_cum = 0.0;
    let mut qty_actual_cum = 0.0;
    let mut points = Vec::with_capacity(weeks.len());

    for week in weeks {
        let plan = planned.get(&week).copied().unwrap_or_default();
        let done = actual.get(&week).copied().unwrap_or_default();

        pv_cum += plan.value;
        qty_planned_cum += plan.quantity;
        ac_cum += done.cost;
        qty_actual_cum += done.quantity;

        let ev_cum = budget * (qty_actual_cum / planned_quantity_total);

        points.push(SCurvePoint {
            week_start_date: week,
            cumulative_pv: round_money(pv_cum),
            cumulative_ev: round_money(ev_cum),
            cumulative_ac: round_money(ac_cum),
            cpi: ratio(ev_cum, ac_cum),
            spi: ratio(ev_cum, pv_cum),
            cumulative_quantity_planned: round_ratio(qty_planned_cum),
            cumulative_quantity_actual: round_ratio(qty_actual_cum),
        });
    }

    points
}

/// Curve for `task` from the rows currently in the store.
pub fn compute_curve<S: WeeklyStore + ?Sized>(
    store: &S,
    task: &Task,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<SCurvePoint> {
    let plan = store.weekly_plan(&task.id);
    let actuals = store.weekly_actuals(&task.id);
    let budget = task.planned_labor_budget.unwrap_or(0.0);
    build_curve(&plan, &actuals, budget, from, to)
}

/// Latest point of the task's full-range curve.
pub fn latest_point<S: WeeklyStore + ?Sized>(store: &S, task: &Task) -> Option<SCurvePoint> {
    compute_curve(store, task, None, None).pop()
}

/// EVM indicators at the last point of a curve, against budget `bac`.
///
/// Works on task curves (converted) as well as stage and project curves.
pub fn performance_snapshot(curve: &[AggregatePoint], bac: f64) -> Option<PerformanceSnapshot> {
    let last = curve.last()?;
    let (pv, ev, ac) = (last.cumulative_pv, last.cumulative_ev, last.cumulative_ac);

    let eac = last.cpi.filter(|cpi| *cpi > 0.0).map(|cpi| round_money(bac / cpi));

    Some(PerformanceSnapshot {
        as_of: last.week_start_date,
        bac: round_money(bac),
        pv,
        ev,
        ac,
        cv: round_money(ev - ac),
        sv: round_money(ev - pv),
        cpi: last.cpi,
        spi: last.spi,
        eac,
        etc: eac.map(|eac| round_money(eac - ac)),
        vac: eac.map(|eac| round_money(bac - eac)),
        percent_complete: (bac > 0.0).then(|| round_to_pct(ev / bac)),
    })
}

fn round_to_pct(share: f64) -> f64 {
    round_money(share * 100.0)
}
