use std::path::Path;

use serde::Serialize;
use tracing::{debug, error};

use crate::data::{self, EventStore, Field};
use crate::error::{DashboardError, Result};
use crate::models::{EventKey, EventRecord, Feature, Season};

/// One value of the selected feature for one edition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub season: Season,
    pub year: i32,
    pub host: String,
    pub value: u32,
}

/// Feature values over time, sorted by year
#[derive(Debug, Clone, Serialize)]
pub struct Trend {
    pub feature: Feature,
    pub points: Vec<TrendPoint>,
}

impl Trend {
    /// Points split by season, one group per season present, in
    /// [`Season::ALL`] order. Year order is kept inside each group.
    pub fn by_season(&self) -> Vec<(Season, Vec<&TrendPoint>)> {
        Season::ALL
            .into_iter()
            .map(|season| {
                let points: Vec<&TrendPoint> =
                    self.points.iter().filter(|p| p.season == season).collect();
                (season, points)
            })
            .filter(|(_, points)| !points.is_empty())
            .collect()
    }
}

/// Reads the CSV and builds the trend for `feature`.
pub fn load_trend(csv_path: &Path, feature: Feature) -> Result<Trend> {
    let records = data::load_events(csv_path, &[Field::from(feature)])?;
    Ok(trend(&records, feature))
}

/// Rows without a value for the feature are skipped; missing years are not
/// interpolated.
pub fn trend(records: &[EventRecord], feature: Feature) -> Trend {
    let mut points: Vec<TrendPoint> = records
        .iter()
        .filter_map(|record| {
            feature.value_of(record).map(|value| TrendPoint {
                season: record.season,
                year: record.year,
                host: record.host.clone(),
                value,
            })
        })
        .collect();
    points.sort_by_key(|p| p.year);

    debug!(feature = %feature, points = points.len(), "built trend");
    Trend { feature, points }
}

/// Share of male and female participants at one edition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderRatio {
    pub key: EventKey,
    pub label: String,
    pub male_ratio: f64,
    pub female_ratio: f64,
}

pub fn load_gender_ratios(csv_path: &Path, season: Season) -> Result<Vec<GenderRatio>> {
    let records = data::load_events(
        csv_path,
        &[
            Field::ParticipantsMale,
            Field::ParticipantsFemale,
            Field::Participants,
        ],
    )?;
    Ok(gender_ratios(&records, season))
}

/// Male/female ratios for every `season` edition that has a gender split.
///
/// Editions without both counts, or without a positive total, are left out
/// rather than counted as zero.
pub fn gender_ratios(records: &[EventRecord], season: Season) -> Vec<GenderRatio> {
    let mut selected: Vec<&EventRecord> = records.iter().filter(|r| r.season == season).collect();
    selected.sort_by_key(|r| r.year);

    let ratios: Vec<GenderRatio> = selected
        .into_iter()
        .filter_map(|record| {
            let male = record.participants_male?;
            let female = record.participants_female?;
            let total = record.participants_total.filter(|t| *t > 0)?;
            let key = record.key();
            Some(GenderRatio {
                label: key.label(),
                key,
                male_ratio: f64::from(male) / f64::from(total),
                female_ratio: f64::from(female) / f64::from(total),
            })
        })
        .collect();

    debug!(season = %season, editions = ratios.len(), "built gender ratios");
    ratios
}

/// A host city on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub key: EventKey,
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One point per event. The dataset has a location for every event, so an
/// empty join means the store is broken.
pub fn geo_points(store: &EventStore) -> Result<Vec<GeoPoint>> {
    let locations = store.load_locations()?;
    if locations.is_empty() {
        let message = format!(
            "event/host join returned no rows in {}",
            store.path().display()
        );
        error!("{message}");
        return Err(DashboardError::DataIntegrity(message));
    }

    Ok(locations
        .into_iter()
        .map(|location| {
            let key = EventKey::new(location.host, location.year);
            GeoPoint {
                label: key.label(),
                key,
                latitude: location.latitude,
                longitude: location.longitude,
            }
        })
        .collect())
}
