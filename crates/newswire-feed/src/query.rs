//! Query values and fingerprints
//!
//! A [`Query`] is the immutable description of one pipeline invocation: the
//! feed, the time window, and the variant flags that affect the shape of the
//! output. Its fingerprint keys both the result cache and the incremental
//! ledger, so every field that changes the output participates in it.

use crate::error::{FeedError, Result};
use crate::schema::{schema_for, FeedKind};
use chrono::{NaiveDate, NaiveDateTime};
use newswire_common::fingerprint::fingerprint;
use serde::{Deserialize, Serialize};

/// Parse a date argument in either accepted format: coarse `YYYY-MM-DD`
/// (midnight) or fine `YYYY-MM-DD-HH-MM-SS`.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d-%H-%M-%S") {
        return Ok(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(FeedError::DateFormat(s.to_string()))
}

/// One logical query against a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub feed: FeedKind,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,

    /// Select the machine-translated variant of a v2 feed
    pub translation: bool,

    /// Station/domain filter (vgeg only)
    pub domain: Option<String>,

    /// Select raw annotation payloads instead of the processed table (vgeg only)
    pub raw: bool,

    /// Treat the window as `[start, end]` instead of the default `[start, end)`
    pub end_inclusive: bool,
}

impl Query {
    /// Build a query from date strings in either accepted format.
    pub fn new(feed: FeedKind, start: &str, end: &str) -> Result<Self> {
        Ok(Self {
            feed,
            start: parse_datetime(start)?,
            end: parse_datetime(end)?,
            translation: false,
            domain: None,
            raw: false,
            end_inclusive: false,
        })
    }

    pub fn with_translation(mut self, translation: bool) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn with_end_inclusive(mut self, end_inclusive: bool) -> Self {
        self.end_inclusive = end_inclusive;
        self
    }

    /// Reject flag combinations the feed does not support. Runs before any
    /// I/O; a zero-length window is legal (it yields an empty result), so it
    /// is deliberately not checked here.
    pub fn validate(&self) -> Result<()> {
        let schema = schema_for(self.feed);

        if self.translation && !schema.supports_translation {
            return Err(FeedError::config(format!(
                "feed '{}' has no translation variant",
                self.feed
            )));
        }
        if self.feed != FeedKind::Vgeg {
            if self.domain.is_some() {
                return Err(FeedError::config(format!(
                    "the domain filter only applies to the vgeg feed, not '{}'",
                    self.feed
                )));
            }
            if self.raw {
                return Err(FeedError::config(format!(
                    "the raw switch only applies to the vgeg feed, not '{}'",
                    self.feed
                )));
            }
        } else if self.domain.is_none() {
            return Err(FeedError::config(
                "the vgeg feed requires a domain filter (e.g. --domain BBCNEWS)",
            ));
        }

        Ok(())
    }

    /// Stable fingerprint over every field that affects the output.
    pub fn fingerprint(&self) -> String {
        fingerprint(&[
            ("feed", self.feed.to_string()),
            ("start", self.start.format("%Y%m%d%H%M%S").to_string()),
            ("end", self.end.format("%Y%m%d%H%M%S").to_string()),
            ("translation", self.translation.to_string()),
            ("domain", self.domain.clone().unwrap_or_default()),
            ("raw", self.raw.to_string()),
            ("end_inclusive", self.end_inclusive.to_string()),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_coarse() {
        let dt = parse_datetime("2021-01-02").unwrap();
        assert_eq!(dt.format("%Y%m%d%H%M%S").to_string(), "20210102000000");
    }

    #[test]
    fn test_parse_datetime_fine() {
        let dt = parse_datetime("2021-01-02-13-45-00").unwrap();
        assert_eq!(dt.format("%Y%m%d%H%M%S").to_string(), "20210102134500");
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        assert!(matches!(
            parse_datetime("01/02/2021"),
            Err(FeedError::DateFormat(_))
        ));
        assert!(parse_datetime("2021-13-40").is_err());
    }

    #[test]
    fn test_fingerprint_stable_across_construction_order() {
        let a = Query::new(FeedKind::EventsV2, "2021-01-01", "2021-01-02")
            .unwrap()
            .with_translation(true)
            .with_end_inclusive(false);
        let b = Query::new(FeedKind::EventsV2, "2021-01-01", "2021-01-02")
            .unwrap()
            .with_end_inclusive(false)
            .with_translation(true);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_sensitive_to_each_flag() {
        let base = Query::new(FeedKind::EventsV2, "2021-01-01", "2021-01-02").unwrap();
        let translated = base.clone().with_translation(true);
        let inclusive = base.clone().with_end_inclusive(true);
        assert_ne!(base.fingerprint(), translated.fingerprint());
        assert_ne!(base.fingerprint(), inclusive.fingerprint());
        assert_ne!(translated.fingerprint(), inclusive.fingerprint());
    }

    #[test]
    fn test_validate_translation_only_on_v2() {
        let q = Query::new(FeedKind::EventsV1, "2021-01-01", "2021-01-02")
            .unwrap()
            .with_translation(true);
        assert!(matches!(q.validate(), Err(FeedError::Config(_))));

        let q = Query::new(FeedKind::GkgV2, "2021-01-01", "2021-01-02")
            .unwrap()
            .with_translation(true);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_validate_vgeg_flags() {
        // domain is required for vgeg
        let q = Query::new(FeedKind::Vgeg, "2021-01-01", "2021-01-02").unwrap();
        assert!(q.validate().is_err());

        let q = Query::new(FeedKind::Vgeg, "2021-01-01", "2021-01-02")
            .unwrap()
            .with_domain(Some("BBCNEWS".to_string()))
            .with_raw(true);
        assert!(q.validate().is_ok());

        // and meaningless everywhere else
        let q = Query::new(FeedKind::EventsV1, "2021-01-01", "2021-01-02")
            .unwrap()
            .with_domain(Some("BBCNEWS".to_string()));
        assert!(q.validate().is_err());
    }
}
