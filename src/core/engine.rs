use super::types::{
    DeductionRates, Dependent, FirmSize, Mode, SeriesPoint, SimulationInput, SimulationOutput,
    WeeklyHours,
};
use super::walls::{RESIDENT_110, SOCIAL_106, SOCIAL_130, TAX_160, evaluate_walls};

pub const MONTHS_MIN: u32 = 1;
pub const MONTHS_MAX: u32 = 12;

const SOCIAL_RATE_EMPLOYEE: f64 = 0.14;
const SOCIAL_RATE_NATIONAL: f64 = 0.18;
const RESIDENT_RATE: f64 = 0.10;
const INCOME_TAX_RATE: f64 = 0.05;
const SPOUSE_DEPENDENT_DISCOUNT: f64 = -0.02;
const STUDENT_DISCOUNT: f64 = -0.01;

const NOTE_SOCIAL: &str =
    "社会保険料率は仮に 14% / 18% を適用しています（実際の料率は地域で異なります）。";
const NOTE_RESIDENT_APPLIED: &str =
    "住民税は概算で 10% を計算しています。自治体により免税点が違う場合があります。";
const NOTE_RESIDENT_EXEMPT: &str =
    "住民税はまだ発生しません。自治体の非課税枠を確認しましょう。";
const NOTE_INCOME_TAX: &str = "所得税は概算で 5% を適用しました。扶養や控除で変動します。";
const NOTE_STUDENT: &str =
    "学生区分は特定扶養控除の範囲を表示します。アルバイト時間の調整に注意してください。";

pub fn clamp_months(months: u32) -> u32 {
    months.clamp(MONTHS_MIN, MONTHS_MAX)
}

pub fn simulate(input: &SimulationInput) -> SimulationOutput {
    let monthly_income = input.monthly_income.max(0).unsigned_abs();
    let months = clamp_months(input.months);
    let annual_income = monthly_income.saturating_mul(u64::from(months));

    let rates = deduction_rates(input, annual_income);
    let take_home = take_home_after(annual_income, rates.combined);
    let (reached, next) = evaluate_walls(input.mode, annual_income);
    let series = build_series(monthly_income, months);
    let notes = build_notes(input.mode, &rates);

    SimulationOutput {
        annual_income,
        take_home,
        rates,
        reached,
        next,
        series,
        notes,
    }
}

pub fn deduction_rates(input: &SimulationInput, annual_income: u64) -> DeductionRates {
    let social_insurance = social_insurance_rate(input, annual_income);
    let resident_tax = resident_tax_rate(annual_income);
    let income_tax = income_tax_rate(annual_income);
    let dependent_adjustment = dependent_adjustment(input);

    DeductionRates {
        social_insurance,
        resident_tax,
        income_tax,
        dependent_adjustment,
        combined: (social_insurance + resident_tax + income_tax + dependent_adjustment).max(0.0),
    }
}

// The employee-insurance branch wins even above SOCIAL_130.
fn social_insurance_rate(input: &SimulationInput, annual_income: u64) -> f64 {
    if annual_income == 0 {
        return 0.0;
    }
    if input.firm_size == FirmSize::Ge51
        && input.weekly == WeeklyHours::Ge20
        && annual_income >= SOCIAL_106
    {
        return SOCIAL_RATE_EMPLOYEE;
    }
    if annual_income >= SOCIAL_130 {
        return SOCIAL_RATE_NATIONAL;
    }
    0.0
}

fn resident_tax_rate(annual_income: u64) -> f64 {
    if annual_income >= RESIDENT_110 {
        RESIDENT_RATE
    } else {
        0.0
    }
}

fn income_tax_rate(annual_income: u64) -> f64 {
    if annual_income >= TAX_160 {
        INCOME_TAX_RATE
    } else {
        0.0
    }
}

fn dependent_adjustment(input: &SimulationInput) -> f64 {
    match (input.mode, input.dependent) {
        (Mode::Spouse, Dependent::Spouse) => SPOUSE_DEPENDENT_DISCOUNT,
        (Mode::Student, _) => STUDENT_DISCOUNT,
        _ => 0.0,
    }
}

fn take_home_after(annual_income: u64, rate: f64) -> u64 {
    let net = (annual_income as f64 * (1.0 - rate)).round();
    if net <= 0.0 { 0 } else { net as u64 }
}

fn build_series(monthly_income: u64, months: u32) -> Vec<SeriesPoint> {
    (1..=clamp_months(months))
        .map(|month| SeriesPoint {
            month,
            cumulative: monthly_income.saturating_mul(u64::from(month)),
        })
        .collect()
}

fn build_notes(mode: Mode, rates: &DeductionRates) -> Vec<&'static str> {
    let mut notes = Vec::with_capacity(4);
    if rates.social_insurance > 0.0 {
        notes.push(NOTE_SOCIAL);
    }
    if rates.resident_tax > 0.0 {
        notes.push(NOTE_RESIDENT_APPLIED);
    } else {
        notes.push(NOTE_RESIDENT_EXEMPT);
    }
    if rates.income_tax > 0.0 {
        notes.push(NOTE_INCOME_TAX);
    }
    if mode == Mode::Student {
        notes.push(NOTE_STUDENT);
    }
    notes
}

/// Single-slot memo over [`simulate`], keyed on structural input equality.
#[derive(Debug, Default)]
pub struct Simulator {
    last: Option<(SimulationInput, SimulationOutput)>,
    evaluations: u64,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulate(&mut self, input: &SimulationInput) -> &SimulationOutput {
        if self.last.as_ref().is_some_and(|(cached, _)| cached != input) {
            self.last = None;
        }
        let evaluations = &mut self.evaluations;
        let (_, output) = self.last.get_or_insert_with(|| {
            *evaluations += 1;
            (*input, simulate(input))
        });
        output
    }

    /// Number of times the engine actually ran.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WallId;
    use crate::core::walls::{STUDENT_188, WALLS};
    use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest};
    use proptest::sample::select;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_input() -> SimulationInput {
        SimulationInput {
            monthly_income: 120_000,
            months: 12,
            firm_size: FirmSize::Le50,
            weekly: WeeklyHours::Lt20,
            dependent: Dependent::None,
            mode: Mode::Individual,
        }
    }

    fn reached_ids(output: &SimulationOutput) -> Vec<WallId> {
        output.reached_ids()
    }

    #[test]
    fn resident_tax_boundary_leaves_walls_empty() {
        let mut input = sample_input();
        input.monthly_income = 90_000;

        let result = simulate(&input);
        assert_eq!(result.annual_income, 1_080_000);
        assert!(result.reached.is_empty());
        let next = result.next.expect("next wall");
        assert_eq!(next.id, WallId::Resident110);
        assert_eq!(next.amount, 20_000);
    }

    #[test]
    fn tax_160_is_reached_above_threshold() {
        let mut input = sample_input();
        input.monthly_income = 140_000;
        input.firm_size = FirmSize::Ge51;
        input.weekly = WeeklyHours::Ge20;

        let result = simulate(&input);
        assert_eq!(result.annual_income, 1_680_000);
        assert!(reached_ids(&result).contains(&WallId::Tax160));
        assert!(result.take_home > 0);
        assert!(result.take_home < result.annual_income);
        // 0.14 + 0.10 + 0.05
        assert_approx(result.rates.combined, 0.29);
        assert_eq!(result.take_home, 1_192_800);
    }

    #[test]
    fn large_firm_long_hours_uses_employee_rate_above_130() {
        let mut input = sample_input();
        input.monthly_income = 110_000;
        input.firm_size = FirmSize::Ge51;
        input.weekly = WeeklyHours::Ge20;

        let result = simulate(&input);
        assert_eq!(result.annual_income, 1_320_000);
        assert!(reached_ids(&result).contains(&WallId::Social106));
        assert_approx(result.rates.social_insurance, 0.14);
        assert!(result.take_home < result.annual_income);
        assert!(result.notes.join(" ").contains("社会保険料率"));
    }

    #[test]
    fn small_firm_above_130_uses_national_rate() {
        let mut input = sample_input();
        input.monthly_income = 110_000;

        let result = simulate(&input);
        assert_approx(result.rates.social_insurance, 0.18);
    }

    #[test]
    fn large_firm_below_106_pays_no_social_insurance() {
        let mut input = sample_input();
        input.monthly_income = 88_000;
        input.firm_size = FirmSize::Ge51;
        input.weekly = WeeklyHours::Ge20;

        let result = simulate(&input);
        assert_eq!(result.annual_income, 1_056_000);
        assert_approx(result.rates.social_insurance, 0.0);
        assert_eq!(result.take_home, result.annual_income);
    }

    #[test]
    fn zero_income_targets_lowest_wall_with_full_amount() {
        let mut input = sample_input();
        input.monthly_income = 0;

        let result = simulate(&input);
        assert_eq!(result.annual_income, 0);
        assert_eq!(result.take_home, 0);
        assert!(result.reached.is_empty());
        let next = result.next.expect("next wall");
        assert_eq!(next.id, WallId::Social106);
        assert_eq!(next.amount, SOCIAL_106);
        assert_eq!(result.series.len(), 12);
        assert!(result.series.iter().all(|point| point.cumulative == 0));
    }

    #[test]
    fn negative_income_and_months_are_clamped() {
        let mut input = sample_input();
        input.monthly_income = -50_000;
        input.months = 0;

        let result = simulate(&input);
        assert_eq!(result.annual_income, 0);
        assert_eq!(result.series.len(), 1);

        input.monthly_income = 10_000;
        input.months = 40;
        let result = simulate(&input);
        assert_eq!(result.annual_income, 120_000);
        assert_eq!(result.series.len(), 12);
    }

    #[test]
    fn dependent_adjustment_discounts_spouse_and_student() {
        let mut input = sample_input();
        input.monthly_income = 100_000;
        input.mode = Mode::Spouse;
        input.dependent = Dependent::Spouse;
        let rates = deduction_rates(&input, 1_200_000);
        assert_approx(rates.dependent_adjustment, -0.02);

        input.dependent = Dependent::Parent;
        assert_approx(deduction_rates(&input, 1_200_000).dependent_adjustment, 0.0);

        input.mode = Mode::Student;
        assert_approx(deduction_rates(&input, 1_200_000).dependent_adjustment, -0.01);
    }

    #[test]
    fn combined_rate_never_goes_negative() {
        let mut input = sample_input();
        input.mode = Mode::Student;
        input.monthly_income = 50_000;

        let result = simulate(&input);
        assert_approx(result.rates.combined, 0.0);
        assert_eq!(result.take_home, result.annual_income);
    }

    #[test]
    fn notes_follow_fixed_order() {
        let mut input = sample_input();
        input.monthly_income = 150_000;
        input.mode = Mode::Student;

        let result = simulate(&input);
        assert_eq!(
            result.notes,
            vec![NOTE_SOCIAL, NOTE_RESIDENT_APPLIED, NOTE_INCOME_TAX, NOTE_STUDENT]
        );

        input.monthly_income = 10_000;
        input.mode = Mode::Individual;
        assert_eq!(simulate(&input).notes, vec![NOTE_RESIDENT_EXEMPT]);
    }

    #[test]
    fn spouse_mode_sees_spouse_walls() {
        let mut input = sample_input();
        input.mode = Mode::Spouse;
        input.monthly_income = 130_000;

        let result = simulate(&input);
        assert_eq!(result.annual_income, 1_560_000);
        assert!(reached_ids(&result).contains(&WallId::Spouse150));
        assert_eq!(result.next.map(|next| next.id), Some(WallId::Tax160));

        input.mode = Mode::Student;
        let result = simulate(&input);
        assert!(!reached_ids(&result).contains(&WallId::Spouse150));
        assert_eq!(
            result.next.map(|next| next.amount),
            Some(TAX_160 - 1_560_000)
        );
    }

    #[test]
    fn student_wall_is_next_for_students_only() {
        let mut input = sample_input();
        input.mode = Mode::Student;
        input.monthly_income = 140_000;

        let result = simulate(&input);
        assert_eq!(result.next.map(|next| next.id), Some(WallId::Student188));
        assert_eq!(
            result.next.map(|next| next.amount),
            Some(STUDENT_188 - 1_680_000)
        );

        input.mode = Mode::Individual;
        assert!(simulate(&input).next.is_none());
    }

    #[test]
    fn simulator_reuses_output_for_equal_input() {
        let mut simulator = Simulator::new();
        let input = sample_input();

        let first = simulator.simulate(&input).clone();
        let second = simulator.simulate(&input).clone();
        assert_eq!(first, second);
        assert_eq!(simulator.evaluations(), 1);

        let mut changed = input;
        changed.months = 6;
        let third = simulator.simulate(&changed).clone();
        assert_eq!(third.series.len(), 6);
        assert_eq!(simulator.evaluations(), 2);
    }

    fn mode_strategy() -> impl proptest::strategy::Strategy<Value = Mode> {
        select(Mode::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_reached_count_is_monotonic_in_income(
            low in 0i64..400_000,
            bump in 0i64..100_000,
            months in 1u32..13,
            mode in mode_strategy(),
            large_firm in any::<bool>(),
        ) {
            let mut input = sample_input();
            input.months = months;
            input.mode = mode;
            if large_firm {
                input.firm_size = FirmSize::Ge51;
                input.weekly = WeeklyHours::Ge20;
            }
            input.monthly_income = low;
            let before = simulate(&input);
            input.monthly_income = low + bump;
            let after = simulate(&input);

            prop_assert!(after.reached.len() >= before.reached.len());
            if let (Some(a), Some(b)) = (before.next, after.next) {
                let before_target = before.annual_income + a.amount;
                let after_target = after.annual_income + b.amount;
                prop_assert!(after_target >= before_target);
            }
        }

        #[test]
        fn prop_series_matches_clamped_months(
            monthly in -100_000i64..400_000,
            months in 0u32..40,
            mode in mode_strategy(),
        ) {
            let mut input = sample_input();
            input.monthly_income = monthly;
            input.months = months;
            input.mode = mode;

            let result = simulate(&input);
            prop_assert_eq!(result.series.len() as u32, clamp_months(months));
            let clamped = monthly.max(0) as u64;
            for (index, point) in result.series.iter().enumerate() {
                prop_assert_eq!(point.month, index as u32 + 1);
                prop_assert_eq!(point.cumulative, clamped * (index as u64 + 1));
            }
            prop_assert!(result.take_home <= result.annual_income);
        }

        #[test]
        fn prop_mode_gating_and_partition(
            monthly in 0i64..400_000,
            mode in mode_strategy(),
        ) {
            let mut input = sample_input();
            input.monthly_income = monthly;
            input.mode = mode;

            let result = simulate(&input);
            let applicable: Vec<_> = WALLS.iter().filter(|wall| wall.applies_to(mode)).collect();
            for wall in &result.reached {
                prop_assert!(applicable.iter().any(|def| def.id == wall.id));
            }
            if let Some(next) = result.next {
                prop_assert!(applicable.iter().any(|def| def.id == next.id));
                prop_assert!(next.amount > 0);
            }
            let next_count = usize::from(result.next.is_some());
            prop_assert!(result.reached.len() + next_count <= applicable.len());
            if mode != Mode::Spouse {
                prop_assert!(!result.reached.iter().any(|wall| wall.id == WallId::Spouse150));
                prop_assert!(result.next.map(|next| next.id) != Some(WallId::Spouse150));
                prop_assert!(result.next.map(|next| next.id) != Some(WallId::Spouse2016));
            }
            prop_assert_eq!(simulate(&input), result);
        }
    }
}
