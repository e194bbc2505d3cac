//! Dashboard state: its URL/storage codec and the store that keeps both in
//! sync with the in-memory record.

mod codec;
mod dashboard;
mod location;
mod query;
mod storage;
mod store;

pub use codec::{SerializedParams, StateCodec};
pub use dashboard::{
    DashboardCodec, DashboardState, IncomeEntry, MONTHLY_INCOME_MAX, MONTHLY_INCOME_MIN,
    PARAM_DEMO, STORAGE_KEY, parse_number_input, parse_simulation_state,
    serialize_simulation_state,
};
pub use location::{Location, MemoryLocation};
pub use query::QueryParams;
pub use storage::{
    FileStorage, MemoryStorage, StateStorage, StorageError, read_snapshot, write_snapshot,
};
pub use store::{DEFAULT_DEBOUNCE, UrlStateOptions, UrlStateStore};

pub type DashboardStore<S, L> = UrlStateStore<DashboardState, DashboardCodec, S, L>;

/// Store options for the dashboard: built-in defaults, the fixed storage
/// key, and `demo` stripped from the URL.
pub fn dashboard_options() -> UrlStateOptions<DashboardState> {
    UrlStateOptions::new(DashboardState::default()).storage_key(STORAGE_KEY)
}

/// The query string a state serializes to, as it would appear in the URL.
pub fn dashboard_query(state: &DashboardState) -> QueryParams {
    serialize_simulation_state(state)
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
        .collect()
}
