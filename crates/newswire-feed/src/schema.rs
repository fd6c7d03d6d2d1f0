//! Static feed descriptors
//!
//! Every upstream feed is described by a [`FeedSchema`]: base URL, fixed
//! column table, time granularity, container format, payload format, and
//! request timeout. The rest of the pipeline is generic over these
//! descriptors; adding a feed means adding a row here, not a new pipeline.

use crate::error::{FeedError, Result};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    /// Daily event table (v1)
    EventsV1,
    /// 15-minute event table (v2)
    EventsV2,
    /// 15-minute mention table (v2)
    Mentions,
    /// Daily knowledge-graph table (v1)
    GkgV1,
    /// 15-minute knowledge-graph table (v2.1)
    GkgV2,
    /// Entity-graph feed, addressed through a master file index
    Geg,
    /// Broadcast entity-graph feed, addressed through per-day index listings
    Vgeg,
}

impl FeedKind {
    pub const ALL: [FeedKind; 7] = [
        FeedKind::EventsV1,
        FeedKind::EventsV2,
        FeedKind::Mentions,
        FeedKind::GkgV1,
        FeedKind::GkgV2,
        FeedKind::Geg,
        FeedKind::Vgeg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::EventsV1 => "events-v1",
            FeedKind::EventsV2 => "events-v2",
            FeedKind::Mentions => "mentions",
            FeedKind::GkgV1 => "gkg-v1",
            FeedKind::GkgV2 => "gkg-v2",
            FeedKind::Geg => "geg",
            FeedKind::Vgeg => "vgeg",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeedKind {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "events-v1" | "events1" => Ok(FeedKind::EventsV1),
            "events-v2" | "events2" | "events" => Ok(FeedKind::EventsV2),
            "mentions" => Ok(FeedKind::Mentions),
            "gkg-v1" | "gkg1" => Ok(FeedKind::GkgV1),
            "gkg-v2" | "gkg2" | "gkg" => Ok(FeedKind::GkgV2),
            "geg" => Ok(FeedKind::Geg),
            "vgeg" => Ok(FeedKind::Vgeg),
            other => Err(FeedError::config(format!(
                "unknown feed '{}'; expected one of events-v1, events-v2, mentions, gkg-v1, gkg-v2, geg, vgeg",
                other
            ))),
        }
    }
}

/// Time-partitioning granularity of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    Daily,
    QuarterHour,
}

impl Granularity {
    /// Width of one partition.
    pub fn step(&self) -> Duration {
        match self {
            Granularity::Daily => Duration::days(1),
            Granularity::QuarterHour => Duration::minutes(15),
        }
    }

    /// Snap a timestamp down to the start of its partition.
    pub fn align_down(&self, ts: NaiveDateTime) -> NaiveDateTime {
        use chrono::Timelike;
        match self {
            Granularity::Daily => ts.date().and_hms_opt(0, 0, 0).unwrap_or(ts),
            Granularity::QuarterHour => {
                let minute = ts.minute() - ts.minute() % 15;
                ts.date().and_hms_opt(ts.hour(), minute, 0).unwrap_or(ts)
            },
        }
    }
}

/// Container compression of a remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    Zip,
    Gzip,
}

/// Payload format inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadFormat {
    /// Headerless tab-separated values
    Tsv,
    /// Line-delimited JSON objects
    JsonLines,
}

/// How remote file names are derived for a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingKind {
    /// One file per granularity unit, name computed from the timestamp
    Interval,
    /// File URLs come from a single master index, filtered by a 14-digit
    /// timestamp token embedded in each URL
    MasterIndex,
    /// File URLs come from one index listing per day, filtered by domain and
    /// a raw/processed marker
    DailyIndex,
}

/// Static description of one feed.
#[derive(Debug)]
pub struct FeedSchema {
    pub kind: FeedKind,
    pub base_url: &'static str,
    pub columns: &'static [&'static str],
    /// Alternative column set for the raw variant, where one exists
    pub raw_columns: Option<&'static [&'static str]>,
    pub granularity: Granularity,
    pub compression: Compression,
    pub format: PayloadFormat,
    pub naming: NamingKind,
    /// Per-attempt request timeout in seconds; larger payloads get longer
    pub timeout_secs: u64,
    pub supports_translation: bool,
}

impl FeedSchema {
    /// Column table for a query, honoring the raw/processed switch.
    pub fn columns_for(&self, raw: bool) -> &'static [&'static str] {
        if raw {
            self.raw_columns.unwrap_or(self.columns)
        } else {
            self.columns
        }
    }

    /// Remote file name for one time slot of an interval-named feed.
    ///
    /// Only meaningful when `naming == NamingKind::Interval`.
    pub fn file_name(&self, slot: NaiveDateTime, translation: bool) -> String {
        let marker = if translation { ".translation" } else { "" };
        match self.kind {
            FeedKind::EventsV1 => format!("{}.export.CSV.zip", slot.format("%Y%m%d")),
            FeedKind::GkgV1 => format!("{}.gkg.csv.zip", slot.format("%Y%m%d")),
            FeedKind::EventsV2 => {
                format!("{}{}.export.CSV.zip", slot.format("%Y%m%d%H%M%S"), marker)
            },
            FeedKind::Mentions => {
                format!("{}{}.mentions.CSV.zip", slot.format("%Y%m%d%H%M%S"), marker)
            },
            FeedKind::GkgV2 => {
                format!("{}{}.gkg.csv.zip", slot.format("%Y%m%d%H%M%S"), marker)
            },
            // Indexed feeds carry full URLs in their listings.
            FeedKind::Geg | FeedKind::Vgeg => String::new(),
        }
    }
}

/// Look up the static schema for a feed.
pub fn schema_for(kind: FeedKind) -> &'static FeedSchema {
    match kind {
        FeedKind::EventsV1 => &EVENTS_V1,
        FeedKind::EventsV2 => &EVENTS_V2,
        FeedKind::Mentions => &MENTIONS,
        FeedKind::GkgV1 => &GKG_V1,
        FeedKind::GkgV2 => &GKG_V2,
        FeedKind::Geg => &GEG,
        FeedKind::Vgeg => &VGEG,
    }
}

pub static EVENTS_V1: FeedSchema = FeedSchema {
    kind: FeedKind::EventsV1,
    base_url: "http://data.gdeltproject.org/events/",
    columns: EVENTS_V1_COLUMNS,
    raw_columns: None,
    granularity: Granularity::Daily,
    compression: Compression::Zip,
    format: PayloadFormat::Tsv,
    naming: NamingKind::Interval,
    timeout_secs: 10,
    supports_translation: false,
};

pub static EVENTS_V2: FeedSchema = FeedSchema {
    kind: FeedKind::EventsV2,
    base_url: "http://data.gdeltproject.org/gdeltv2/",
    columns: EVENTS_V2_COLUMNS,
    raw_columns: None,
    granularity: Granularity::QuarterHour,
    compression: Compression::Zip,
    format: PayloadFormat::Tsv,
    naming: NamingKind::Interval,
    timeout_secs: 10,
    supports_translation: true,
};

pub static MENTIONS: FeedSchema = FeedSchema {
    kind: FeedKind::Mentions,
    base_url: "http://data.gdeltproject.org/gdeltv2/",
    columns: MENTIONS_COLUMNS,
    raw_columns: None,
    granularity: Granularity::QuarterHour,
    compression: Compression::Zip,
    format: PayloadFormat::Tsv,
    naming: NamingKind::Interval,
    timeout_secs: 10,
    supports_translation: true,
};

pub static GKG_V1: FeedSchema = FeedSchema {
    kind: FeedKind::GkgV1,
    base_url: "http://data.gdeltproject.org/gkg/",
    columns: GKG_V1_COLUMNS,
    raw_columns: None,
    granularity: Granularity::Daily,
    compression: Compression::Zip,
    format: PayloadFormat::Tsv,
    naming: NamingKind::Interval,
    timeout_secs: 10,
    supports_translation: false,
};

pub static GKG_V2: FeedSchema = FeedSchema {
    kind: FeedKind::GkgV2,
    base_url: "http://data.gdeltproject.org/gdeltv2/",
    columns: GKG_V2_COLUMNS,
    raw_columns: None,
    granularity: Granularity::QuarterHour,
    compression: Compression::Zip,
    format: PayloadFormat::Tsv,
    naming: NamingKind::Interval,
    // The knowledge-graph shards are by far the largest payloads.
    timeout_secs: 15,
    supports_translation: true,
};

pub static GEG: FeedSchema = FeedSchema {
    kind: FeedKind::Geg,
    base_url: "http://data.gdeltproject.org/gdeltv3/geg_gcnlapi/",
    columns: GEG_COLUMNS,
    raw_columns: None,
    granularity: Granularity::QuarterHour,
    compression: Compression::Gzip,
    format: PayloadFormat::JsonLines,
    naming: NamingKind::MasterIndex,
    timeout_secs: 10,
    supports_translation: false,
};

pub static VGEG: FeedSchema = FeedSchema {
    kind: FeedKind::Vgeg,
    base_url: "http://data.gdeltproject.org/gdeltv3/iatv/vgegv2/",
    columns: VGEG_COLUMNS,
    raw_columns: Some(VGEG_RAW_COLUMNS),
    granularity: Granularity::Daily,
    compression: Compression::Gzip,
    format: PayloadFormat::JsonLines,
    naming: NamingKind::DailyIndex,
    timeout_secs: 10,
    supports_translation: false,
};

// ============================================================================
// Column tables (upstream files are headerless; columns assigned by position)
// ============================================================================

pub const EVENTS_V1_COLUMNS: &[&str] = &[
    "GLOBALEVENTID", "SQLDATE", "MonthYear", "Year", "FractionDate",
    "Actor1Code", "Actor1Name", "Actor1CountryCode", "Actor1KnownGroupCode",
    "Actor1EthnicCode", "Actor1Religion1Code", "Actor1Religion2Code",
    "Actor1Type1Code", "Actor1Type2Code", "Actor1Type3Code", "Actor2Code",
    "Actor2Name", "Actor2CountryCode", "Actor2KnownGroupCode",
    "Actor2EthnicCode", "Actor2Religion1Code", "Actor2Religion2Code",
    "Actor2Type1Code", "Actor2Type2Code", "Actor2Type3Code", "IsRootEvent",
    "EventCode", "EventBaseCode", "EventRootCode", "QuadClass",
    "GoldsteinScale", "NumMentions", "NumSources", "NumArticles", "AvgTone",
    "Actor1Geo_Type", "Actor1Geo_FullName", "Actor1Geo_CountryCode",
    "Actor1Geo_ADM1Code", "Actor1Geo_Lat", "Actor1Geo_Long",
    "Actor1Geo_FeatureID", "Actor2Geo_Type", "Actor2Geo_FullName",
    "Actor2Geo_CountryCode", "Actor2Geo_ADM1Code", "Actor2Geo_Lat",
    "Actor2Geo_Long", "Actor2Geo_FeatureID", "ActionGeo_Type",
    "ActionGeo_FullName", "ActionGeo_CountryCode", "ActionGeo_ADM1Code",
    "ActionGeo_Lat", "ActionGeo_Long", "ActionGeo_FeatureID", "DATEADDED",
    "SOURCEURL",
];

pub const EVENTS_V2_COLUMNS: &[&str] = &[
    "GLOBALEVENTID", "SQLDATE", "MonthYear", "Year", "FractionDate",
    "Actor1Code", "Actor1Name", "Actor1CountryCode", "Actor1KnownGroupCode",
    "Actor1EthnicCode", "Actor1Religion1Code", "Actor1Religion2Code",
    "Actor1Type1Code", "Actor1Type2Code", "Actor1Type3Code", "Actor2Code",
    "Actor2Name", "Actor2CountryCode", "Actor2KnownGroupCode",
    "Actor2EthnicCode", "Actor2Religion1Code", "Actor2Religion2Code",
    "Actor2Type1Code", "Actor2Type2Code", "Actor2Type3Code", "IsRootEvent",
    "EventCode", "EventBaseCode", "EventRootCode", "QuadClass",
    "GoldsteinScale", "NumMentions", "NumSources", "NumArticles", "AvgTone",
    "Actor1Geo_Type", "Actor1Geo_FullName", "Actor1Geo_CountryCode",
    "Actor1Geo_ADM1Code", "Actor1Geo_ADM2Code", "Actor1Geo_Lat",
    "Actor1Geo_Long", "Actor1Geo_FeatureID", "Actor2Geo_Type",
    "Actor2Geo_FullName", "Actor2Geo_CountryCode", "Actor2Geo_ADM1Code",
    "Actor2Geo_ADM2Code", "Actor2Geo_Lat", "Actor2Geo_Long",
    "Actor2Geo_FeatureID", "ActionGeo_Type", "ActionGeo_FullName",
    "ActionGeo_CountryCode", "ActionGeo_ADM1Code", "ActionGeo_ADM2Code",
    "ActionGeo_Lat", "ActionGeo_Long", "ActionGeo_FeatureID", "DATEADDED",
    "SOURCEURL",
];

pub const MENTIONS_COLUMNS: &[&str] = &[
    "GLOBALEVENTID", "EventTimeDate", "MentionTimeDate", "MentionType",
    "MentionSourceName", "MentionIdentifier", "SentenceID",
    "Actor1CharOffset", "Actor2CharOffset", "ActionCharOffset", "InRawText",
    "Confidence", "MentionDocLen", "MentionDocTone",
    "MentionDocTranslationInfo", "Extras",
];

pub const GKG_V1_COLUMNS: &[&str] = &[
    "DATE", "NUMARTS", "COUNTS", "THEMES", "LOCATIONS", "PERSONS",
    "ORGANIZATIONS", "TONE", "CAMEOEVENTIDS", "SOURCES", "SOURCEURLS",
];

pub const GKG_V2_COLUMNS: &[&str] = &[
    "GKGRECORDID", "V2.1DATE", "V2SOURCECOLLECTIONIDENTIFIER",
    "V2SOURCECOMMONNAME", "V2DOCUMENTIDENTIFIER", "V1COUNTS", "V2COUNTS",
    "V1THEMES", "V2ENHANCEDTHEMES", "V1LOCATIONS", "V2ENHANCEDLOCATIONS",
    "V1PERSONS", "V2ENHANCEDPERSONS", "V1ORGANIZATIONS",
    "V2ENHANCEDORGANIZATIONS", "V1TONE", "V2ENHANCEDDATES", "V2GCAM",
    "V2SHARINGIMAGE", "V2RELATEDIMAGES", "V2SOCIALIMAGEEMBEDS",
    "V2SOCIALVIDEOEMBEDS", "V2QUOTATIONS", "V2ALLNAMES", "V2AMOUNTS",
    "V2TRANSLATIONINFO", "V2EXTRASXML",
];

pub const GEG_COLUMNS: &[&str] = &[
    "date", "url", "lang", "polarity", "magnitude", "score", "entities",
];

pub const VGEG_COLUMNS: &[&str] = &[
    "date", "showOffset", "iaShowId", "station", "showName", "iaClipUrl",
    "iaThumbnailUrl", "processedDate", "numOCRChars", "OCRText",
    "numShotChanges", "shotID", "numSpeakerChanges", "numSpokenWords",
    "numDistinctEntities", "entities", "numDistinctPresenceEntities",
    "presenceEntities",
];

pub const VGEG_RAW_COLUMNS: &[&str] = &["annotation_results"];

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn slot(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_column_table_widths() {
        assert_eq!(EVENTS_V1_COLUMNS.len(), 57);
        assert_eq!(EVENTS_V2_COLUMNS.len(), 61);
        assert_eq!(MENTIONS_COLUMNS.len(), 16);
        assert_eq!(GKG_V1_COLUMNS.len(), 11);
        assert_eq!(GKG_V2_COLUMNS.len(), 27);
        assert_eq!(GEG_COLUMNS.len(), 7);
        assert_eq!(VGEG_COLUMNS.len(), 18);
    }

    #[test]
    fn test_interval_file_names() {
        let s = slot(2021, 1, 2, 0, 0);
        assert_eq!(EVENTS_V1.file_name(s, false), "20210102.export.CSV.zip");
        assert_eq!(GKG_V1.file_name(s, false), "20210102.gkg.csv.zip");

        let s = slot(2022, 1, 8, 16, 15);
        assert_eq!(
            EVENTS_V2.file_name(s, false),
            "20220108161500.export.CSV.zip"
        );
        assert_eq!(
            EVENTS_V2.file_name(s, true),
            "20220108161500.translation.export.CSV.zip"
        );
        assert_eq!(
            MENTIONS.file_name(s, true),
            "20220108161500.translation.mentions.CSV.zip"
        );
        assert_eq!(GKG_V2.file_name(s, false), "20220108161500.gkg.csv.zip");
    }

    #[test]
    fn test_align_down_quarter_hour() {
        let g = Granularity::QuarterHour;
        assert_eq!(g.align_down(slot(2021, 6, 1, 13, 44)), slot(2021, 6, 1, 13, 30));
        assert_eq!(g.align_down(slot(2021, 6, 1, 13, 45)), slot(2021, 6, 1, 13, 45));
        assert_eq!(g.align_down(slot(2021, 6, 1, 13, 0)), slot(2021, 6, 1, 13, 0));
    }

    #[test]
    fn test_align_down_daily() {
        let g = Granularity::Daily;
        let ts = NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(13, 44, 12)
            .unwrap();
        assert_eq!(g.align_down(ts), slot(2021, 6, 1, 0, 0));
    }

    #[test]
    fn test_feed_kind_round_trip() {
        for kind in FeedKind::ALL {
            assert_eq!(kind.as_str().parse::<FeedKind>().unwrap(), kind);
        }
        assert!("rss".parse::<FeedKind>().is_err());
    }
}
