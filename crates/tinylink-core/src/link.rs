use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// The unique short code, immutable once created.
    pub code: ShortCode,
    /// The original URL that was shortened, exactly as submitted.
    pub long_url: String,
    pub created_at: Timestamp,
    /// Refreshed on every mutation.
    pub updated_at: Timestamp,
    /// Number of successful hits; never decreases.
    pub hit_count: u64,
    /// When the link was last hit, if ever.
    pub last_access_at: Option<Timestamp>,
}

impl Link {
    /// Creates a fresh, never-hit link stamped with `now`.
    pub fn new(code: ShortCode, long_url: impl Into<String>, now: Timestamp) -> Self {
        Self {
            code,
            long_url: long_url.into(),
            created_at: now,
            updated_at: now,
            hit_count: 0,
            last_access_at: None,
        }
    }

    /// Applies a single hit at `at`.
    ///
    /// Backends call this while holding whatever guarantees the increment is atomic.
    pub fn record_hit(&mut self, at: Timestamp) {
        self.hit_count += 1;
        self.last_access_at = Some(at);
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_link_has_no_hits() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let link = Link::new(ShortCode::new("abc").unwrap(), "https://example.com", now);

        assert_eq!(link.hit_count, 0);
        assert_eq!(link.last_access_at, None);
        assert_eq!(link.created_at, now);
        assert_eq!(link.updated_at, now);
    }

    #[test]
    fn record_hit_updates_counter_and_timestamps() {
        let created = Timestamp::from_second(1_700_000_000).unwrap();
        let hit_at = Timestamp::from_second(1_700_000_060).unwrap();
        let mut link = Link::new(ShortCode::new("abc").unwrap(), "https://example.com", created);

        link.record_hit(hit_at);
        link.record_hit(hit_at);

        assert_eq!(link.hit_count, 2);
        assert_eq!(link.last_access_at, Some(hit_at));
        assert_eq!(link.updated_at, hit_at);
        assert_eq!(link.created_at, created);
    }

    #[test]
    fn serde_shape() {
        let now = Timestamp::from_second(0).unwrap();
        let link = Link::new(ShortCode::new("abc").unwrap(), "https://example.com", now);
        let value = serde_json::to_value(&link).unwrap();

        assert_eq!(value["code"], "abc");
        assert_eq!(value["long_url"], "https://example.com");
        assert_eq!(value["hit_count"], 0);
        assert!(value["last_access_at"].is_null());

        let back: Link = serde_json::from_value(value).unwrap();
        assert_eq!(back, link);
    }
}
