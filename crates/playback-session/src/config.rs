/// The core's only persisted/configurable knob (spec.md §6: "Persisted
/// state and configuration: None ... The only configuration is
/// `auto_reconnect: bool` (default `true`)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub auto_reconnect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig { auto_reconnect: true }
    }
}
