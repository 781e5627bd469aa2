//! Configuration access port trait.

/// Raw `[section] key` lookups. Typed parsing and validation happen in
/// `domain::config_validation`, so a malformed value is reported rather
/// than replaced by a default.
pub trait ConfigPort {
    /// Trimmed value, `None` when the key is absent or blank.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
