//! Configuration access port.
//!
//! Values come back as raw strings; typed parsing and range checks live in
//! `domain::config_validation` so malformed values are reported, not defaulted.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Keys present in `section`, sorted. Empty when the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;
}
