use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FirmSize {
    #[serde(rename = "<=50")]
    Le50,
    #[serde(rename = ">=51")]
    Ge51,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WeeklyHours {
    #[serde(rename = "<20")]
    Lt20,
    #[serde(rename = ">=20")]
    Ge20,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependent {
    None,
    Spouse,
    Parent,
}

/// Persona the simulation runs for. Gates which walls apply.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Individual,
    Spouse,
    Student,
}

/// Returned when a wire string does not name any variant.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("unknown variant `{0}`")]
pub struct UnknownVariant(pub String);

macro_rules! wire_enum {
    ($ty:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $wire),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($ty::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(FirmSize { Le50 => "<=50", Ge51 => ">=51" });
wire_enum!(WeeklyHours { Lt20 => "<20", Ge20 => ">=20" });
wire_enum!(Dependent { None => "none", Spouse => "spouse", Parent => "parent" });
wire_enum!(Mode { Individual => "individual", Spouse => "spouse", Student => "student" });

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInput {
    pub monthly_income: i64,
    pub months: u32,
    pub firm_size: FirmSize,
    pub weekly: WeeklyHours,
    pub dependent: Dependent,
    pub mode: Mode,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WallId {
    #[serde(rename = "SOCIAL_106")]
    Social106,
    #[serde(rename = "RESIDENT_110")]
    Resident110,
    #[serde(rename = "TAX_FUYOU_123")]
    TaxFuyou123,
    #[serde(rename = "SOCIAL_130")]
    Social130,
    #[serde(rename = "SPOUSE_150")]
    Spouse150,
    #[serde(rename = "TAX_160")]
    Tax160,
    #[serde(rename = "STUDENT_188")]
    Student188,
    #[serde(rename = "SPOUSE_2016")]
    Spouse2016,
}

wire_enum!(WallId {
    Social106 => "SOCIAL_106",
    Resident110 => "RESIDENT_110",
    TaxFuyou123 => "TAX_FUYOU_123",
    Social130 => "SOCIAL_130",
    Spouse150 => "SPOUSE_150",
    Tax160 => "TAX_160",
    Student188 => "STUDENT_188",
    Spouse2016 => "SPOUSE_2016",
});

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct WallRef {
    pub id: WallId,
    pub label: &'static str,
}

/// First applicable wall above the projected income. `amount` is the shortfall.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NextWall {
    pub id: WallId,
    pub label: &'static str,
    pub amount: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub month: u32,
    pub cumulative: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionRates {
    pub social_insurance: f64,
    pub resident_tax: f64,
    pub income_tax: f64,
    pub dependent_adjustment: f64,
    pub combined: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutput {
    pub annual_income: u64,
    pub take_home: u64,
    pub rates: DeductionRates,
    pub reached: Vec<WallRef>,
    pub next: Option<NextWall>,
    pub series: Vec<SeriesPoint>,
    pub notes: Vec<&'static str>,
}

impl SimulationOutput {
    pub fn reached_ids(&self) -> Vec<WallId> {
        self.reached.iter().map(|wall| wall.id).collect()
    }
}
