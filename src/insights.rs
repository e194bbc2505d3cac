use serde::Serialize;

use crate::core::SimulationOutput;
use crate::format::format_yen;
use crate::state::DashboardState;

/// Take-home ratio below which the dashboard warns that earning more leaves
/// the user worse off.
pub const INVERSE_ALERT_RATIO: f64 = 0.78;

/// Numbers the dashboard shows alongside a simulation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardInsights {
    /// Annual income at which the next wall sits.
    pub next_threshold: Option<u64>,
    /// How much more can be earned this year before the next wall.
    pub remaining_headroom: u64,
    pub ytd_progress_percent: Option<f64>,
    pub completed_months: u32,
    pub inverse_alert: bool,
    pub headline: String,
    pub merits: Vec<&'static str>,
    pub demerits: Vec<&'static str>,
}

impl DashboardInsights {
    pub fn from_state(state: &DashboardState, output: &SimulationOutput) -> Self {
        let ytd = state.current_year_income;
        let next_threshold = output
            .next
            .map(|next| output.annual_income.saturating_add(next.amount));
        let remaining_headroom = next_threshold.map_or(0, |threshold| threshold.saturating_sub(ytd));
        let ytd_progress_percent = next_threshold
            .filter(|threshold| *threshold > 0)
            .map(|threshold| (ytd as f64 / threshold as f64 * 100.0).clamp(0.0, 100.0));

        let reached = output.reached_ids();
        Self {
            next_threshold,
            remaining_headroom,
            ytd_progress_percent,
            completed_months: completed_months(state, output.series.len()),
            inverse_alert: inverse_alert(output),
            headline: headline(output, next_threshold, remaining_headroom),
            merits: crate::core::wall_merits(&reached),
            demerits: crate::core::wall_demerits(&reached),
        }
    }
}

pub fn inverse_alert(output: &SimulationOutput) -> bool {
    if output.annual_income == 0 {
        return false;
    }
    (output.take_home as f64 / output.annual_income as f64) < INVERSE_ALERT_RATIO
}

/// Months of this year already worked at the current rate, judged from
/// year-to-date income. Any income at all counts as at least one month.
fn completed_months(state: &DashboardState, series_len: usize) -> u32 {
    let ytd = state.current_year_income;
    let monthly = state.monthly_income.max(0).unsigned_abs();
    let mut months = if monthly > 0 { ytd / monthly } else { 0 };
    if ytd > 0 && months == 0 {
        months = 1;
    }
    let cap = u64::try_from(series_len).unwrap_or(u64::MAX);
    u32::try_from(months.min(cap)).unwrap_or(u32::MAX)
}

fn headline(output: &SimulationOutput, next_threshold: Option<u64>, remaining: u64) -> String {
    let label = output.next.map_or("次の壁", |next| next.label);
    match next_threshold {
        None => "主要な壁をすべて越えています".to_string(),
        Some(_) if remaining == 0 => format!("{label} に到達しています"),
        Some(_) => format!("あと {} で {label}", format_yen(remaining)),
    }
}
