//! Namespace resolution

/// Environment variable holding the default namespace
pub const NAMESPACE_ENV: &str = "SHERPACK_NAMESPACE";

/// Namespace used when neither flag nor environment provides one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Pick the namespace to operate in
///
/// A non-empty `explicit` value wins verbatim, then a non-empty `from_env`,
/// then [`DEFAULT_NAMESPACE`].
pub fn resolve_namespace(explicit: Option<&str>, from_env: Option<&str>) -> String {
    explicit
        .filter(|ns| !ns.is_empty())
        .or_else(|| from_env.filter(|ns| !ns.is_empty()))
        .unwrap_or(DEFAULT_NAMESPACE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_wins() {
        assert_eq!(resolve_namespace(Some("prod"), Some("staging")), "prod");
        assert_eq!(resolve_namespace(Some(" odd "), None), " odd ");
    }

    #[test]
    fn test_environment_fallback() {
        assert_eq!(resolve_namespace(None, Some("staging")), "staging");
        assert_eq!(resolve_namespace(Some(""), Some("staging")), "staging");
    }

    #[test]
    fn test_default() {
        assert_eq!(resolve_namespace(None, None), "default");
        assert_eq!(resolve_namespace(Some(""), Some("")), "default");
    }
}
