use serde::{Deserialize, Serialize};

use crate::core::{
    Dependent, FirmSize, MONTHS_MAX, MONTHS_MIN, Mode, SimulationInput, WeeklyHours,
};

use super::codec::{SerializedParams, StateCodec};
use super::query::QueryParams;

pub const STORAGE_KEY: &str = "tedorinavi:inputs";

pub const MONTHLY_INCOME_MIN: i64 = 0;
pub const MONTHLY_INCOME_MAX: i64 = 360_000;

pub const PARAM_INCOME: &str = "income";
pub const PARAM_MONTHS: &str = "months";
pub const PARAM_FIRM: &str = "firm";
pub const PARAM_WEEKLY: &str = "weekly";
pub const PARAM_DEPENDENT: &str = "dep";
pub const PARAM_MODE: &str = "mode";
pub const PARAM_YTD: &str = "ytd";
pub const PARAM_ENTRY: &str = "entry";
pub const PARAM_DEMO: &str = "demo";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeEntry {
    Monthly,
    Annual,
}

impl IncomeEntry {
    pub fn as_str(self) -> &'static str {
        match self {
            IncomeEntry::Monthly => "monthly",
            IncomeEntry::Annual => "annual",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "monthly" => Some(IncomeEntry::Monthly),
            "annual" => Some(IncomeEntry::Annual),
            _ => None,
        }
    }
}

/// Everything the dashboard keeps in the URL and in storage.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub monthly_income: i64,
    pub months: u32,
    pub firm_size: FirmSize,
    pub weekly: WeeklyHours,
    pub dependent: Dependent,
    pub mode: Mode,
    pub current_year_income: u64,
    pub income_entry: IncomeEntry,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            monthly_income: 140_000,
            months: 12,
            firm_size: FirmSize::Le50,
            weekly: WeeklyHours::Ge20,
            dependent: Dependent::None,
            mode: Mode::Individual,
            current_year_income: 0,
            income_entry: IncomeEntry::Monthly,
        }
    }
}

impl DashboardState {
    pub fn simulation_input(&self) -> SimulationInput {
        SimulationInput {
            monthly_income: self.monthly_income,
            months: self.months,
            firm_size: self.firm_size,
            weekly: self.weekly,
            dependent: self.dependent,
            mode: self.mode,
        }
    }

    /// Clamps every numeric field into its valid range.
    pub fn normalized(mut self) -> Self {
        self.monthly_income = clamp_income(self.monthly_income);
        self.months = self.months.clamp(MONTHS_MIN, MONTHS_MAX);
        self
    }

    pub fn with_monthly_income(mut self, monthly_income: i64) -> Self {
        self.monthly_income = clamp_income(monthly_income);
        self.income_entry = IncomeEntry::Monthly;
        self
    }

    /// Derives the monthly rate from an annual figure spread over `months`.
    pub fn with_annual_income(mut self, annual_income: u64) -> Self {
        let months = self.months.max(1);
        let monthly = (annual_income as f64 / f64::from(months)).round();
        self.monthly_income = clamp_income(to_whole_yen(monthly));
        self.income_entry = IncomeEntry::Annual;
        self
    }

    /// Fills year-to-date income as if the current rate held for `elapsed`
    /// months of this year.
    pub fn with_elapsed_year_income(mut self, elapsed_months: u32) -> Self {
        let months = u64::from(elapsed_months.min(self.months));
        self.current_year_income = self.monthly_income.max(0).unsigned_abs() * months;
        self
    }
}

fn clamp_income(value: i64) -> i64 {
    value.clamp(MONTHLY_INCOME_MIN, MONTHLY_INCOME_MAX)
}

fn to_whole_yen(value: f64) -> i64 {
    // `as` saturates at the i64 bounds.
    value as i64
}

/// Parses a numeric query value. Integers are read exactly; any other
/// finite decimal is rounded.
fn parse_amount(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    value.is_finite().then(|| to_whole_yen(value.round()))
}

/// Like [`parse_amount`], but keeps the full `u64` range. Negatives read as 0.
fn parse_unsigned_amount(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .or_else(|| parse_amount(raw).map(|value| value.max(0).unsigned_abs()))
}

/// Keeps only ASCII digits, so `"¥120,000"` reads as 120000. Empty input is 0.
pub fn parse_number_input(raw: &str) -> u64 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

pub fn parse_simulation_state(params: &QueryParams, current: &DashboardState) -> DashboardState {
    let base = if params.get(PARAM_DEMO) == Some("1") {
        DashboardState::default()
    } else {
        current.normalized()
    };

    let monthly_income = params
        .get(PARAM_INCOME)
        .and_then(parse_amount)
        .map_or(base.monthly_income, clamp_income);
    let months = params
        .get(PARAM_MONTHS)
        .and_then(parse_amount)
        .map_or(base.months, |months| {
            months.clamp(i64::from(MONTHS_MIN), i64::from(MONTHS_MAX)) as u32
        });
    let current_year_income = params
        .get(PARAM_YTD)
        .and_then(parse_unsigned_amount)
        .unwrap_or(base.current_year_income);

    DashboardState {
        monthly_income,
        months,
        firm_size: parse_enum(params, PARAM_FIRM).unwrap_or(base.firm_size),
        weekly: parse_enum(params, PARAM_WEEKLY).unwrap_or(base.weekly),
        dependent: parse_enum(params, PARAM_DEPENDENT).unwrap_or(base.dependent),
        mode: parse_enum(params, PARAM_MODE).unwrap_or(base.mode),
        current_year_income,
        income_entry: params
            .get(PARAM_ENTRY)
            .and_then(IncomeEntry::parse)
            .unwrap_or(base.income_entry),
    }
}

fn parse_enum<T: std::str::FromStr>(params: &QueryParams, key: &str) -> Option<T> {
    params.get(key).and_then(|raw| raw.parse().ok())
}

pub fn serialize_simulation_state(state: &DashboardState) -> SerializedParams {
    [
        (PARAM_INCOME, state.monthly_income.to_string()),
        (PARAM_MONTHS, state.months.to_string()),
        (PARAM_FIRM, state.firm_size.as_str().to_string()),
        (PARAM_WEEKLY, state.weekly.as_str().to_string()),
        (PARAM_DEPENDENT, state.dependent.as_str().to_string()),
        (PARAM_MODE, state.mode.as_str().to_string()),
        (PARAM_YTD, state.current_year_income.to_string()),
        (PARAM_ENTRY, state.income_entry.as_str().to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), Some(value)))
    .collect()
}

/// Query codec for [`DashboardState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardCodec;

impl StateCodec<DashboardState> for DashboardCodec {
    fn parse(&self, params: &QueryParams, current: &DashboardState) -> DashboardState {
        parse_simulation_state(params, current)
    }

    fn serialize(&self, state: &DashboardState) -> SerializedParams {
        serialize_simulation_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert_eq, proptest};
    use proptest::sample::select;

    fn to_params(serialized: SerializedParams) -> QueryParams {
        serialized
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect()
    }

    #[test]
    fn serializes_and_parses_dashboard_extras() {
        let initial = DashboardState {
            monthly_income: 180_000,
            months: 10,
            current_year_income: 920_000,
            income_entry: IncomeEntry::Annual,
            ..DashboardState::default()
        };

        let serialized = serialize_simulation_state(&initial);
        let lookup = |key: &str| {
            serialized
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.clone())
        };
        assert_eq!(lookup(PARAM_YTD).as_deref(), Some("920000"));
        assert_eq!(lookup(PARAM_ENTRY).as_deref(), Some("annual"));

        let parsed = parse_simulation_state(&to_params(serialized), &DashboardState::default());
        assert_eq!(parsed.monthly_income, 180_000);
        assert_eq!(parsed.current_year_income, 920_000);
        assert_eq!(parsed.income_entry, IncomeEntry::Annual);
        assert_eq!(parsed, initial);
    }

    #[test]
    fn absent_params_fall_through_to_current_state() {
        let current = DashboardState {
            monthly_income: 95_000,
            mode: Mode::Student,
            ..DashboardState::default()
        };
        let params = QueryParams::parse("months=6");

        let parsed = parse_simulation_state(&params, &current);
        assert_eq!(parsed.months, 6);
        assert_eq!(parsed.monthly_income, 95_000);
        assert_eq!(parsed.mode, Mode::Student);
    }

    #[test]
    fn invalid_values_fall_back_per_field() {
        let current = DashboardState {
            monthly_income: 95_000,
            months: 8,
            firm_size: FirmSize::Ge51,
            ..DashboardState::default()
        };
        let params =
            QueryParams::parse("income=abc&months=NaN&firm=huge&dep=parent&ytd=&entry=weekly");

        let parsed = parse_simulation_state(&params, &current);
        assert_eq!(parsed.monthly_income, 95_000);
        assert_eq!(parsed.months, 8);
        assert_eq!(parsed.firm_size, FirmSize::Ge51);
        assert_eq!(parsed.dependent, Dependent::Parent);
        assert_eq!(parsed.current_year_income, 0);
        assert_eq!(parsed.income_entry, IncomeEntry::Monthly);
    }

    #[test]
    fn out_of_range_numbers_are_clamped() {
        let params = QueryParams::parse("income=-500&months=40&ytd=-3");
        let parsed = parse_simulation_state(&params, &DashboardState::default());
        assert_eq!(parsed.monthly_income, 0);
        assert_eq!(parsed.months, 12);
        assert_eq!(parsed.current_year_income, 0);

        let params = QueryParams::parse("income=9999999&months=0&ytd=12.6");
        let parsed = parse_simulation_state(&params, &DashboardState::default());
        assert_eq!(parsed.monthly_income, MONTHLY_INCOME_MAX);
        assert_eq!(parsed.months, 1);
        assert_eq!(parsed.current_year_income, 13);
    }

    #[test]
    fn large_ytd_survives_round_trip_exactly() {
        for current_year_income in [9_007_199_254_740_993, i64::MAX.unsigned_abs() + 1, u64::MAX] {
            let state = DashboardState {
                current_year_income,
                ..DashboardState::default()
            };
            let query = to_params(serialize_simulation_state(&state)).to_string();
            let parsed =
                parse_simulation_state(&QueryParams::parse(&query), &DashboardState::default());
            assert_eq!(parsed.current_year_income, current_year_income);
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn demo_flag_uses_defaults_as_base() {
        let current = DashboardState {
            monthly_income: 50_000,
            mode: Mode::Spouse,
            ..DashboardState::default()
        };
        let params = QueryParams::parse("demo=1&months=3");

        let parsed = parse_simulation_state(&params, &current);
        assert_eq!(parsed.monthly_income, DashboardState::default().monthly_income);
        assert_eq!(parsed.mode, Mode::Individual);
        assert_eq!(parsed.months, 3);

        let ignored = parse_simulation_state(&QueryParams::parse("demo=0"), &current);
        assert_eq!(ignored, current);
    }

    #[test]
    fn stale_out_of_range_base_is_normalized() {
        let current = DashboardState {
            monthly_income: -10,
            months: 99,
            ..DashboardState::default()
        };
        let parsed = parse_simulation_state(&QueryParams::new(), &current);
        assert_eq!(parsed.monthly_income, 0);
        assert_eq!(parsed.months, 12);
    }

    #[test]
    fn annual_entry_spreads_income_over_months() {
        let state = DashboardState {
            months: 10,
            ..DashboardState::default()
        }
        .with_annual_income(1_000_005);
        assert_eq!(state.monthly_income, 100_001);
        assert_eq!(state.income_entry, IncomeEntry::Annual);

        let state = state.with_monthly_income(80_000);
        assert_eq!(state.income_entry, IncomeEntry::Monthly);
        assert_eq!(state.with_elapsed_year_income(4).current_year_income, 320_000);
        assert_eq!(state.with_elapsed_year_income(30).current_year_income, 800_000);
    }

    #[test]
    fn parse_number_input_strips_formatting() {
        assert_eq!(parse_number_input("¥120,000"), 120_000);
        assert_eq!(parse_number_input("  "), 0);
        assert_eq!(parse_number_input("1.5万"), 15);
    }

    #[test]
    fn storage_json_uses_camel_case_wire_values() {
        let json = serde_json::to_value(DashboardState::default()).expect("serialize");
        assert_eq!(json["monthlyIncome"], 140_000);
        assert_eq!(json["firmSize"], "<=50");
        assert_eq!(json["weekly"], ">=20");
        assert_eq!(json["incomeEntry"], "monthly");
        assert_eq!(json["currentYearIncome"], 0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_serialize_then_parse_recovers_state(
            monthly_income in MONTHLY_INCOME_MIN..=MONTHLY_INCOME_MAX,
            months in MONTHS_MIN..=MONTHS_MAX,
            firm_size in select(FirmSize::ALL.to_vec()),
            weekly in select(WeeklyHours::ALL.to_vec()),
            dependent in select(Dependent::ALL.to_vec()),
            mode in select(Mode::ALL.to_vec()),
            current_year_income in proptest::num::u64::ANY,
            annual in proptest::bool::ANY,
        ) {
            let state = DashboardState {
                monthly_income,
                months,
                firm_size,
                weekly,
                dependent,
                mode,
                current_year_income,
                income_entry: if annual { IncomeEntry::Annual } else { IncomeEntry::Monthly },
            };
            let query = to_params(serialize_simulation_state(&state)).to_string();
            let parsed = parse_simulation_state(&QueryParams::parse(&query), &DashboardState::default());
            prop_assert_eq!(parsed, state);
        }
    }
}
