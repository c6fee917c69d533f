//! Round-robin API key rotation.
//!
//! Each key has its own daily quota, so spreading requests across several keys lets a session
//! poll for longer before the platform starts refusing it.

#[derive(Debug, Clone, Default)]
pub struct KeyRotator {
    keys: Vec<String>,
    index: usize,
}

impl KeyRotator {
    pub fn new(keys: Vec<String>) -> Self {
        // start "before" the first key so that the first request uses key 0
        let index = keys.len().saturating_sub(1);
        Self { keys, index }
    }

    /// Returns the key to use for the next outbound request.
    ///
    /// Advances once per call when more than one key is configured; a single key is returned
    /// every time. Returns `None` only when no keys are configured.
    pub fn next_key(&mut self) -> Option<&str> {
        if self.keys.len() > 1 {
            self.index = (self.index + 1) % self.keys.len();
            tracing::trace!(index = self.index, "rotated API key");
        }
        self.current()
    }

    /// The key the most recent request used, without advancing.
    pub fn current(&self) -> Option<&str> {
        self.keys.get(self.index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn three_keys_cycle_in_order() {
        let mut keys = KeyRotator::new(vec!["k0".into(), "k1".into(), "k2".into()]);
        let seen: Vec<_> = (0..7).map(|_| keys.next_key().unwrap().to_string()).collect();
        assert_eq!(seen, ["k0", "k1", "k2", "k0", "k1", "k2", "k0"]);
        assert_eq!(keys.current(), Some("k0"));
    }

    #[test]
    fn single_key_never_rotates() {
        let mut keys = KeyRotator::new(vec!["only".into()]);
        for _ in 0..3 {
            assert_eq!(keys.next_key(), Some("only"));
        }
    }

    #[test]
    fn no_keys() {
        let mut keys = KeyRotator::new(Vec::new());
        assert_eq!(keys.next_key(), None);
        assert_eq!(keys.current(), None);
    }
}
