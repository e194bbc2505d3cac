use std::sync::Mutex;

use super::query::QueryParams;

/// The address bar the store mirrors its state into.
pub trait Location: Send + Sync + 'static {
    fn query(&self) -> QueryParams;

    /// Replaces the current query without adding a history entry.
    fn replace_query(&self, params: &QueryParams);
}

#[derive(Debug, Default)]
struct LocationState {
    query: QueryParams,
    replacements: usize,
}

/// A location held in memory: a fixed path plus a mutable query.
#[derive(Debug, Default)]
pub struct MemoryLocation {
    path: String,
    state: Mutex<LocationState>,
}

impl MemoryLocation {
    pub fn new(path: impl Into<String>, query: &str) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(LocationState {
                query: QueryParams::parse(query),
                replacements: 0,
            }),
        }
    }

    /// `path` alone when the query is empty, else `path?query`.
    pub fn href(&self) -> String {
        let search = self.lock().query.to_string();
        if search.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{search}", self.path)
        }
    }

    /// How many times the query was replaced.
    pub fn replacements(&self) -> usize {
        self.lock().replacements
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LocationState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Location for MemoryLocation {
    fn query(&self) -> QueryParams {
        self.lock().query.clone()
    }

    fn replace_query(&self, params: &QueryParams) {
        let mut state = self.lock();
        state.query = params.clone();
        state.replacements += 1;
    }
}
