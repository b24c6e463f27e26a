//! Cache key generation
//!
//! Keys stay human-readable (`user:7|Ticket/12?expand_dropdowns=true`) so
//! resource families can be invalidated with a regex over the key space.

/// Separates the owning identity from the request part of a key
pub const SCOPE_SEPARATOR: char = '|';

/// Generate a deterministic cache key from endpoint and query parameters.
///
/// Leading and trailing slashes on the endpoint are ignored and parameters
/// are sorted, so the same request always maps to the same key regardless
/// of parameter order.
pub fn cache_key<K, V>(endpoint: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let endpoint = endpoint.trim_matches('/');

    if params.is_empty() {
        return endpoint.to_string();
    }

    let mut sorted: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .collect();
    sorted.sort();

    let query = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", endpoint, query)
}

/// Prefix `key` with the identity that may read it.
pub fn scoped_key(scope: &str, key: &str) -> String {
    format!("{}{}{}", scope, SCOPE_SEPARATOR, key)
}
