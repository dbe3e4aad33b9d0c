//! Read-only access to the event data.
//!
//! Event statistics come from a CSV file, locations and per-event details
//! from the SQLite store. Nothing is cached: every call reads the file or
//! opens a fresh connection, and the connection is dropped when the call
//! returns.

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags};
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::models::{
    EventDetail, EventKey, EventRecord, EventSummary, Feature, HostLocation, Season,
};

/// Optional CSV columns a caller can ask for. `type`, `year` and `host` are
/// always read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Participants,
    ParticipantsMale,
    ParticipantsFemale,
    Events,
    Sports,
    Countries,
    Highlights,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::Participants => "participants",
            Field::ParticipantsMale => "participants_m",
            Field::ParticipantsFemale => "participants_f",
            Field::Events => "events",
            Field::Sports => "sports",
            Field::Countries => "countries",
            Field::Highlights => "highlights",
        }
    }
}

impl From<Feature> for Field {
    fn from(feature: Feature) -> Self {
        match feature {
            Feature::Events => Field::Events,
            Feature::Sports => Field::Sports,
            Feature::Participants => Field::Participants,
            Feature::Countries => Field::Countries,
        }
    }
}

/// Loads every row of the events CSV, populating only the requested fields.
pub fn load_events(path: &Path, fields: &[Field]) -> Result<Vec<EventRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DashboardError::MissingColumn(name.to_string()))
    };

    let type_idx = column("type")?;
    let year_idx = column("year")?;
    let host_idx = column("host")?;
    let wanted = fields
        .iter()
        .map(|field| Ok((*field, column(field.column())?)))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cell = |idx: usize| row.get(idx).filter(|v| !v.is_empty());

        let season_raw = cell(type_idx).unwrap_or_default();
        let season = season_raw.parse::<Season>().map_err(|_| invalid("type", season_raw))?;
        let year_raw = cell(year_idx).unwrap_or_default();
        let year = year_raw.parse::<i32>().map_err(|_| invalid("year", year_raw))?;
        let host = cell(host_idx)
            .ok_or_else(|| invalid("host", ""))?
            .to_string();

        let mut record = EventRecord {
            season,
            year,
            host,
            participants_total: None,
            participants_male: None,
            participants_female: None,
            events_count: None,
            sports_count: None,
            countries_count: None,
            highlights: None,
        };

        for (field, idx) in &wanted {
            let raw = cell(*idx);
            match field {
                Field::Highlights => record.highlights = raw.map(str::to_string),
                Field::Participants => record.participants_total = parse_count(field, raw)?,
                Field::ParticipantsMale => record.participants_male = parse_count(field, raw)?,
                Field::ParticipantsFemale => {
                    record.participants_female = parse_count(field, raw)?
                }
                Field::Events => record.events_count = parse_count(field, raw)?,
                Field::Sports => record.sports_count = parse_count(field, raw)?,
                Field::Countries => record.countries_count = parse_count(field, raw)?,
            }
        }

        check_participant_split(&record)?;
        records.push(record);
    }

    debug!(path = %path.display(), rows = records.len(), "loaded events csv");
    Ok(records)
}

fn invalid(column: &str, value: &str) -> DashboardError {
    DashboardError::InvalidValue {
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Counts are whole numbers, but files written by spreadsheet tools often
/// carry them as `3001.0`.
fn parse_count(field: &Field, raw: Option<&str>) -> Result<Option<u32>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if let Ok(n) = raw.parse::<u32>() {
        return Ok(Some(n));
    }
    match raw.parse::<f64>() {
        Ok(n) if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => Ok(Some(n as u32)),
        _ => Err(invalid(field.column(), raw)),
    }
}

fn check_participant_split(record: &EventRecord) -> Result<()> {
    if let (Some(m), Some(f), Some(total)) = (
        record.participants_male,
        record.participants_female,
        record.participants_total,
    ) {
        if u64::from(m) + u64::from(f) > u64::from(total) {
            return Err(DashboardError::DataIntegrity(format!(
                "{} {}: {} male + {} female participants exceeds total {}",
                record.host, record.year, m, f, total
            )));
        }
    }
    Ok(())
}

const EVENT_HOST_JOIN: &str = "FROM event
    JOIN host_event ON event.event_id = host_event.event_id
    JOIN host ON host_event.host_id = host.host_id";

/// Raw columns of the event/host join, before coercion.
struct DetailRow {
    season: String,
    year: i32,
    host: String,
    participants: Value,
    events: Value,
    sports: Value,
    countries: Value,
    highlights: Option<String>,
    latitude: Value,
    longitude: Value,
}

/// The relational store. Holds only the path; each query opens its own
/// read-only connection.
#[derive(Debug, Clone)]
pub struct EventStore {
    db_path: PathBuf,
}

impl EventStore {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Every event joined with its host's coordinates, ordered by year.
    pub fn load_locations(&self) -> Result<Vec<HostLocation>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT event.year, host.host, host.latitude, host.longitude {EVENT_HOST_JOIN}
             ORDER BY event.year, host.host"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Value>(2)?,
                    row.get::<_, Value>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let locations = rows
            .into_iter()
            .map(|(year, host, lat, lon)| {
                Ok(HostLocation {
                    host,
                    year,
                    latitude: coerce_f64("latitude", lat)?,
                    longitude: coerce_f64("longitude", lon)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = locations.len(), "loaded host locations");
        Ok(locations)
    }

    /// The single event hosted by `key.host` in `key.year`, with its location.
    pub fn load_event_detail(&self, key: &EventKey) -> Result<EventDetail> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT event.type, event.year, host.host, event.participants, event.events,
                    event.sports, event.countries, event.highlights,
                    host.latitude, host.longitude
             {EVENT_HOST_JOIN}
             WHERE event.year = ?1 AND host.host = ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![key.year, key.host], |row| {
                Ok(DetailRow {
                    season: row.get(0)?,
                    year: row.get(1)?,
                    host: row.get(2)?,
                    participants: row.get(3)?,
                    events: row.get(4)?,
                    sports: row.get(5)?,
                    countries: row.get(6)?,
                    highlights: row.get(7)?,
                    latitude: row.get(8)?,
                    longitude: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(host = %key.host, year = key.year, rows = rows.len(), "event lookup");
        if rows.len() > 1 {
            return Err(DashboardError::AmbiguousRecord {
                host: key.host.clone(),
                year: key.year,
                count: rows.len(),
            });
        }
        let Some(row) = rows.into_iter().next() else {
            return Err(DashboardError::NotFound {
                host: key.host.clone(),
                year: key.year,
            });
        };

        let season = row
            .season
            .parse::<Season>()
            .map_err(|_| invalid("type", &row.season))?;
        let location = HostLocation {
            host: row.host.clone(),
            year: row.year,
            latitude: coerce_f64("latitude", row.latitude)?,
            longitude: coerce_f64("longitude", row.longitude)?,
        };
        let record = EventRecord {
            season,
            year: row.year,
            host: row.host,
            participants_total: coerce_count(Field::Participants, row.participants)?,
            participants_male: None,
            participants_female: None,
            events_count: coerce_count(Field::Events, row.events)?,
            sports_count: coerce_count(Field::Sports, row.sports)?,
            countries_count: coerce_count(Field::Countries, row.countries)?,
            highlights: row.highlights,
        };

        Ok(EventDetail { record, location })
    }

    pub fn load_event_by(&self, key: &EventKey) -> Result<EventRecord> {
        self.load_event_detail(key).map(|detail| detail.record)
    }

    /// One summary per event, ordered by year, for the `/events` listing.
    pub fn list_events(&self) -> Result<Vec<EventSummary>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT year, type, start, \"end\" FROM event ORDER BY year, type")?;
        let events = stmt
            .query_map([], |row| {
                Ok(EventSummary {
                    year: row.get(0)?,
                    season: row.get(1)?,
                    start: row.get(2)?,
                    end: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(rows = events.len(), "listed events");
        Ok(events)
    }
}

/// Counts may be stored as INTEGER, REAL or TEXT; they go through the same
/// rules as the CSV.
fn coerce_count(field: Field, value: Value) -> Result<Option<u32>> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| invalid(field.column(), &n.to_string())),
        Value::Real(n) => parse_count(&field, Some(&n.to_string())),
        Value::Text(ref s) => parse_count(&field, Some(s.trim()).filter(|s| !s.is_empty())),
        other => Err(invalid(field.column(), &format!("{other:?}"))),
    }
}

/// Coordinates are stored as text in some copies of the database.
fn coerce_f64(column: &str, value: Value) -> Result<f64> {
    match value {
        Value::Real(v) => Ok(v),
        Value::Integer(v) => Ok(v as f64),
        Value::Text(ref s) => s.trim().parse().map_err(|_| invalid(column, s)),
        other => Err(invalid(column, &format!("{other:?}"))),
    }
}

/// Where the dashboard reads from: the CSV for trend and ratio views, the
/// store for locations and detail cards.
#[derive(Debug, Clone)]
pub struct DataSources {
    pub csv_path: PathBuf,
    pub store: EventStore,
}

impl DataSources {
    pub fn new(csv_path: &Path, db_path: &Path) -> Self {
        Self {
            csv_path: csv_path.to_path_buf(),
            store: EventStore::new(db_path),
        }
    }
}
