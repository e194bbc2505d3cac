use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use crate::api::run_http_server;
use crate::core::{Dependent, FirmSize, Mode, SimulationOutput, Simulator, WeeklyHours};
use crate::format::{format_percent, format_yen};
use crate::insights::DashboardInsights;
use crate::state::{
    DashboardCodec, DashboardState, DashboardStore, FileStorage, MemoryLocation, dashboard_options,
    parse_number_input,
};

/// Path the dashboard lives under; the CLI prints URLs relative to it.
pub const APP_PATH: &str = "/app";

#[derive(Parser, Debug)]
#[command(
    name = "tedori",
    about = "Take-home income estimator for the Japanese annual income walls"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Load the saved dashboard state, apply edits, save it and print the result.
    Simulate(SimulateArgs),
    /// Overwrite the saved dashboard state with the defaults.
    Reset {
        #[arg(long, default_value = ".tedori")]
        state_dir: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long, default_value = "", help = "Dashboard URL query, e.g. 'income=90000&months=12'")]
    pub query: String,
    #[arg(long, conflicts_with = "annual", help = "Monthly income; non-digits are ignored")]
    pub income: Option<String>,
    #[arg(long, help = "Annual income, spread over --months")]
    pub annual: Option<String>,
    #[arg(long)]
    pub months: Option<u32>,
    #[arg(long, help = "Employer size: '<=50' or '>=51'")]
    pub firm: Option<FirmSize>,
    #[arg(long, help = "Weekly hours: '<20' or '>=20'")]
    pub weekly: Option<WeeklyHours>,
    #[arg(long)]
    pub dep: Option<Dependent>,
    #[arg(long)]
    pub mode: Option<Mode>,
    #[arg(long, conflicts_with = "elapsed_months", help = "Income so far this year")]
    pub ytd: Option<String>,
    #[arg(long, help = "Fill year-to-date income from the monthly rate")]
    pub elapsed_months: Option<u32>,
    #[arg(long, default_value = ".tedori")]
    pub state_dir: PathBuf,
    #[arg(long, default_value_t = 200)]
    pub debounce_ms: u64,
    #[arg(long, help = "Print the report as JSON")]
    pub json: bool,
}

/// One dashboard edit, applied as a single store update.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Edit {
    Months(u32),
    FirmSize(FirmSize),
    Weekly(WeeklyHours),
    Dependent(Dependent),
    Mode(Mode),
    MonthlyIncome(i64),
    AnnualIncome(u64),
    CurrentYearIncome(u64),
    ElapsedMonths(u32),
}

impl Edit {
    pub fn apply(self, state: DashboardState) -> DashboardState {
        match self {
            Edit::Months(months) => DashboardState { months, ..state }.normalized(),
            Edit::FirmSize(firm_size) => DashboardState { firm_size, ..state },
            Edit::Weekly(weekly) => DashboardState { weekly, ..state },
            Edit::Dependent(dependent) => DashboardState { dependent, ..state },
            Edit::Mode(mode) => DashboardState { mode, ..state },
            Edit::MonthlyIncome(amount) => state.with_monthly_income(amount),
            Edit::AnnualIncome(amount) => state.with_annual_income(amount),
            Edit::CurrentYearIncome(current_year_income) => DashboardState {
                current_year_income,
                ..state
            },
            Edit::ElapsedMonths(months) => state.with_elapsed_year_income(months),
        }
    }
}

impl SimulateArgs {
    /// Edits in dependency order: months before income so an annual figure
    /// is spread over the new month count, income before year-to-date.
    pub fn edits(&self) -> Vec<Edit> {
        let mut edits = Vec::new();
        edits.extend(self.months.map(Edit::Months));
        edits.extend(self.firm.map(Edit::FirmSize));
        edits.extend(self.weekly.map(Edit::Weekly));
        edits.extend(self.dep.map(Edit::Dependent));
        edits.extend(self.mode.map(Edit::Mode));
        if let Some(raw) = &self.income {
            let amount = i64::try_from(parse_number_input(raw)).unwrap_or(i64::MAX);
            edits.push(Edit::MonthlyIncome(amount));
        }
        if let Some(raw) = &self.annual {
            edits.push(Edit::AnnualIncome(parse_number_input(raw)));
        }
        if let Some(raw) = &self.ytd {
            edits.push(Edit::CurrentYearIncome(parse_number_input(raw)));
        }
        edits.extend(self.elapsed_months.map(Edit::ElapsedMonths));
        edits
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateReport {
    pub href: String,
    pub state: DashboardState,
    pub result: SimulationOutput,
    pub insights: DashboardInsights,
}

impl SimulateReport {
    pub fn render_text(&self) -> String {
        let result = &self.result;
        let mut lines = vec![
            format!("URL: {}", self.href),
            format!("年収見込み: {}", format_yen(result.annual_income)),
            format!(
                "手取り見込み: {} (控除率 {})",
                format_yen(result.take_home),
                format_percent(result.rates.combined)
            ),
        ];
        if result.reached.is_empty() {
            lines.push("超えた壁: なし".to_string());
        } else {
            let labels: Vec<&str> = result.reached.iter().map(|wall| wall.label).collect();
            lines.push(format!("超えた壁: {}", labels.join(" / ")));
        }
        if let Some(next) = result.next {
            lines.push(format!("次の壁: {} (あと {})", next.label, format_yen(next.amount)));
        }
        lines.push(format!("今年の状況: {}", self.insights.headline));
        if self.insights.inverse_alert {
            lines.push("注意: 手取りが年収の 78% を下回っています".to_string());
        }
        lines.extend(result.notes.iter().map(|note| format!("- {note}")));
        lines.join("\n")
    }
}

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Serve { port } => run_http_server(port).await?,
        Command::Simulate(args) => {
            let report = simulate_command(&args).await;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.render_text());
            }
        }
        Command::Reset { state_dir } => {
            reset_command(state_dir);
            println!("saved state reset to defaults");
        }
    }
    Ok(())
}

/// Hydrates a store from `--state-dir` and `--query`, applies the flag edits
/// and waits for the debounced save.
pub async fn simulate_command(args: &SimulateArgs) -> SimulateReport {
    let options = dashboard_options().debounce(Duration::from_millis(args.debounce_ms));
    let store = DashboardStore::initialize(
        options,
        DashboardCodec,
        FileStorage::new(&args.state_dir),
        MemoryLocation::new(APP_PATH, &args.query),
    );

    // Re-evaluate after every edit, as a dashboard re-render would.
    let mut simulator = Simulator::new();
    simulator.simulate(&store.state().simulation_input());
    for edit in args.edits() {
        store.update(move |prev| edit.apply(*prev));
        simulator.simulate(&store.state().simulation_input());
    }
    store.flush().await;

    let state = store.state();
    let result = simulator.simulate(&state.simulation_input()).clone();
    debug!(evaluations = simulator.evaluations(), "simulation settled");
    let insights = DashboardInsights::from_state(&state, &result);
    SimulateReport {
        href: store.location().href(),
        state,
        result,
        insights,
    }
}

pub fn reset_command(state_dir: PathBuf) {
    let store = DashboardStore::initialize(
        dashboard_options(),
        DashboardCodec,
        FileStorage::new(&state_dir),
        MemoryLocation::new(APP_PATH, ""),
    );
    store.reset(None);
    info!(dir = %state_dir.display(), "dashboard state reset");
}
