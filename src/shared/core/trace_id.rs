// B3-style trace id used as the correlation token for everything one request publishes.
//
// Format
// - 16 or 32 lowercase hex characters. Generated ids are 16 characters (64 bits).

use rand::Rng;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    pub fn generate() -> Self {
        let bits: u64 = rand::rng().random_range(1..=u64::MAX);
        Self(format!("{bits:016x}"))
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let valid_length = raw.len() == 16 || raw.len() == 32;
        let valid_chars = raw
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        let all_zero = raw.chars().all(|c| c == '0');
        (valid_length && valid_chars && !all_zero).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
