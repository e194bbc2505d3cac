mod engine;
mod types;
mod walls;

pub use engine::{MONTHS_MAX, MONTHS_MIN, Simulator, clamp_months, deduction_rates, simulate};
pub use types::{
    DeductionRates, Dependent, FirmSize, Mode, NextWall, SeriesPoint, SimulationInput,
    SimulationOutput, UnknownVariant, WallId, WallRef, WeeklyHours,
};
pub use walls::{
    WALLS, WallDefinition, WallDetail, evaluate_walls, wall_definition, wall_demerits,
    wall_detail, wall_merits,
};
