use std::collections::HashMap;

/// Local source consulted before any remote fetch. A value found here always
/// wins and no request is issued.
pub trait OverrideSource: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Process environment, looked up by the exact key.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvOverrides;

impl OverrideSource for EnvOverrides {
    fn lookup(&self, key: &str) -> Option<String> {
        if key.is_empty() || key.contains(&['=', '\0'][..]) {
            return None;
        }
        std::env::var(key).ok()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverrides;

impl OverrideSource for NoOverrides {
    fn lookup(&self, _key: &str) -> Option<String> {
        None
    }
}

impl OverrideSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}
