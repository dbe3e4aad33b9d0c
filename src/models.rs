use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// API Response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Summer or winter games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Summer,
    Winter,
}

impl Season {
    pub const ALL: [Season; 2] = [Season::Summer, Season::Winter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Summer => "summer",
            Season::Winter => "winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summer" => Ok(Season::Summer),
            "winter" => Ok(Season::Winter),
            _ => Err(DashboardError::InvalidSeason(s.to_string())),
        }
    }
}

/// Which event field drives the trend chart. The string form is the CSV
/// column name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    #[default]
    Events,
    Sports,
    Participants,
    Countries,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Events,
        Feature::Sports,
        Feature::Participants,
        Feature::Countries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Events => "events",
            Feature::Sports => "sports",
            Feature::Participants => "participants",
            Feature::Countries => "countries",
        }
    }

    /// Dropdown label shown next to the value.
    pub fn label(&self) -> &'static str {
        match self {
            Feature::Events => "Events",
            Feature::Sports => "Sports",
            Feature::Participants => "Athletes",
            Feature::Countries => "Countries",
        }
    }

    pub fn value_of(&self, record: &EventRecord) -> Option<u32> {
        match self {
            Feature::Events => record.events_count,
            Feature::Sports => record.sports_count,
            Feature::Participants => record.participants_total,
            Feature::Countries => record.countries_count,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| DashboardError::InvalidFeature(s.to_string()))
    }
}

/// One edition of the games
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub season: Season,
    pub year: i32,
    pub host: String,
    pub participants_total: Option<u32>,
    pub participants_male: Option<u32>,
    pub participants_female: Option<u32>,
    pub events_count: Option<u32>,
    pub sports_count: Option<u32>,
    pub countries_count: Option<u32>,
    pub highlights: Option<String>,
}

impl EventRecord {
    pub fn key(&self) -> EventKey {
        EventKey::new(&self.host, self.year)
    }
}

/// Coordinates for a host city in a given year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostLocation {
    pub host: String,
    pub year: i32,
    pub latitude: f64,
    pub longitude: f64,
}

/// An event joined with the location of its host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDetail {
    pub record: EventRecord,
    pub location: HostLocation,
}

/// Row for the plain-text `/events` listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub year: i32,
    pub season: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl fmt::Display for EventSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.year,
            self.season,
            self.start.as_deref().unwrap_or(""),
            self.end.as_deref().unwrap_or("")
        )
    }
}

/// Host and year identifying a single event.
///
/// Views pass this pair around instead of the display label. The label form
/// `"{host} {year}"` is only parsed when nothing better is available, and
/// it cannot represent hosts ending in four digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub host: String,
    pub year: i32,
}

impl EventKey {
    pub fn new(host: impl Into<String>, year: i32) -> Self {
        Self {
            host: host.into(),
            year,
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.host, self.year)
    }

    /// Parses `"{host} {year}"`: the last four characters are the year and
    /// everything before the separating space is the host.
    pub fn from_label(label: &str) -> Result<Self, DashboardError> {
        let invalid = || DashboardError::InvalidLabel(label.to_string());

        let (host, year) = label.rsplit_once(' ').ok_or_else(invalid)?;
        if host.is_empty() || year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;

        Ok(Self::new(host, year))
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.host, self.year)
    }
}
