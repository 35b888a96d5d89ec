use crate::metrics_defs::{UNKNOWN_BUILD_HIT, UNKNOWN_BUILD_MISS};
use moka::sync::Cache;
use shared::counter;
use std::time::Duration;

const MAX_NAMES: u64 = 1000;
/// How long a build the orchestrator reported missing is answered locally.
pub const UNKNOWN_BUILD_TTL: Duration = Duration::from_secs(5);

/// Build names the orchestrator recently reported as missing. Lets repeated
/// requests for a deleted or mistyped build fail without another round trip.
pub struct UnknownBuilds {
    names: Cache<String, ()>,
}

impl UnknownBuilds {
    pub fn new(ttl: Duration) -> Self {
        UnknownBuilds {
            names: Cache::builder()
                .max_capacity(MAX_NAMES)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn record_miss(&self, build: &str) {
        self.names.insert(build.to_owned(), ());
    }

    /// Whether `build` was reported missing within the TTL.
    pub fn recently_missing(&self, build: &str) -> bool {
        let missing = self.names.contains_key(build);
        let metric = if missing {
            UNKNOWN_BUILD_HIT
        } else {
            UNKNOWN_BUILD_MISS
        };
        counter!(metric).increment(1);
        missing
    }

    /// Drops every name that a fresh listing shows to exist.
    pub fn forget_listed<'a>(&self, listed: impl IntoIterator<Item = &'a str>) {
        for build in listed {
            self.names.invalidate(build);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_forget() {
        let unknown = UnknownBuilds::new(UNKNOWN_BUILD_TTL);
        assert!(!unknown.recently_missing("b1"));

        unknown.record_miss("b1");
        unknown.record_miss("b2");
        assert!(unknown.recently_missing("b1"));
        assert!(unknown.recently_missing("b2"));
        assert!(!unknown.recently_missing("b3"));

        unknown.forget_listed(["b1", "b3"]);
        assert!(!unknown.recently_missing("b1"));
        assert!(unknown.recently_missing("b2"));
    }

    #[test]
    fn test_entries_expire() {
        let unknown = UnknownBuilds::new(Duration::from_millis(20));
        unknown.record_miss("b1");
        assert!(unknown.recently_missing("b1"));

        std::thread::sleep(Duration::from_millis(50));
        assert!(!unknown.recently_missing("b1"));
    }
}
