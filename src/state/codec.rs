use super::query::QueryParams;

/// Key/value pairs destined for the URL. `None` or an empty string removes
/// the key.
pub type SerializedParams = Vec<(String, Option<String>)>;

/// Maps a state record to and from URL query parameters.
pub trait StateCodec<T> {
    /// Resolves a state from `params`, taking every absent or unparseable
    /// field from `current`.
    fn parse(&self, params: &QueryParams, current: &T) -> T;

    fn serialize(&self, state: &T) -> SerializedParams;
}
