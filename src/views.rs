//! Chart and card builders.
//!
//! Builders turn aggregated rows into plain, serialisable descriptions. How
//! a chart is drawn is left to whatever front end consumes the JSON.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::aggregate::{self, GenderRatio, GeoPoint, Trend};
use crate::data::EventStore;
use crate::error::Result;
use crate::models::{EventDetail, EventKey, Feature, Season};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    ScatterGeo,
}

/// One series on a chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub x: Vec<Value>,
    pub y: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hover_text: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_data: Vec<EventKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Trace {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x: Vec::new(),
            y: Vec::new(),
            hover_text: Vec::new(),
            custom_data: Vec::new(),
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_field: String,
    pub y_fields: Vec<String>,
    pub axis_labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_tick_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub stacked: bool,
    pub traces: Vec<Trace>,
}

/// Number of `feature` over time, one line per season.
pub fn line_chart(trend: &Trend) -> ChartSpec {
    let feature = trend.feature.as_str();
    let traces = trend
        .by_season()
        .into_iter()
        .map(|(season, points)| {
            let mut trace = Trace::new(season.as_str());
            for point in points {
                trace.x.push(Value::from(point.year));
                trace.y.push(f64::from(point.value));
                trace.hover_text.push(format!("{} {}", point.host, point.year));
            }
            trace
        })
        .collect();

    ChartSpec {
        kind: ChartKind::Line,
        title: format!("How has the number of {feature} changed over time?"),
        x_field: "year".to_string(),
        y_fields: vec![feature.to_string()],
        axis_labels: BTreeMap::from([
            (feature.to_string(), String::new()),
            ("year".to_string(), "Year".to_string()),
        ]),
        y_tick_format: None,
        template: None,
        stacked: false,
        traces,
    }
}

/// Stacked male/female share per edition of one season.
pub fn bar_gender(season: Season, ratios: &[GenderRatio]) -> ChartSpec {
    let mut male = Trace::new("Male");
    male.color = Some("blue".to_string());
    let mut female = Trace::new("Female");
    female.color = Some("green".to_string());

    for ratio in ratios {
        male.x.push(Value::from(ratio.label.clone()));
        male.y.push(ratio.male_ratio);
        male.custom_data.push(ratio.key.clone());
        female.x.push(Value::from(ratio.label.clone()));
        female.y.push(ratio.female_ratio);
        female.custom_data.push(ratio.key.clone());
    }

    ChartSpec {
        kind: ChartKind::Bar,
        title: format!(
            "How has the ratio of female:male participants changed in {season} paralympics?"
        ),
        x_field: "xlabel".to_string(),
        y_fields: vec!["Male".to_string(), "Female".to_string()],
        axis_labels: BTreeMap::from([
            ("xlabel".to_string(), String::new()),
            ("value".to_string(), String::new()),
            ("variable".to_string(), String::new()),
        ]),
        y_tick_format: Some(".0%".to_string()),
        template: Some("simple_white".to_string()),
        stacked: true,
        traces: vec![male, female],
    }
}

/// Host cities on a map. Each point carries its [`EventKey`] so hover
/// handlers do not have to parse the label back.
pub fn scatter_geo(points: &[GeoPoint]) -> ChartSpec {
    let mut trace = Trace::new("hosts");
    for point in points {
        trace.x.push(Value::from(point.longitude));
        trace.y.push(point.latitude);
        trace.hover_text.push(point.label.clone());
        trace.custom_data.push(point.key.clone());
    }

    ChartSpec {
        kind: ChartKind::ScatterGeo,
        title: "Where have the paralympics been held?".to_string(),
        x_field: "longitude".to_string(),
        y_fields: vec!["latitude".to_string()],
        axis_labels: BTreeMap::new(),
        y_tick_format: None,
        template: None,
        stacked: false,
        traces: vec![trace],
    }
}

pub fn trend_chart(csv_path: &Path, feature: Feature) -> Result<ChartSpec> {
    aggregate::load_trend(csv_path, feature).map(|trend| line_chart(&trend))
}

pub fn gender_chart(csv_path: &Path, season: Season) -> Result<ChartSpec> {
    aggregate::load_gender_ratios(csv_path, season).map(|ratios| bar_gender(season, &ratios))
}

pub fn geo_chart(store: &EventStore) -> Result<ChartSpec> {
    aggregate::geo_points(store).map(|points| scatter_geo(&points))
}

/// Summary card for a single event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailCard {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<EventKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub highlights: String,
    pub lines: Vec<String>,
}

impl DetailCard {
    pub fn from_detail(detail: &EventDetail) -> Self {
        let record = &detail.record;
        let key = record.key();

        Self {
            title: key.label(),
            logo: Some(logo_path(&key)),
            highlights: record.highlights.clone().unwrap_or_default(),
            lines: vec![
                count_line(record.participants_total, "athletes"),
                count_line(record.events_count, "events"),
                count_line(record.sports_count, "sports"),
                count_line(record.countries_count, "participating teams"),
            ],
            key: Some(key),
        }
    }

    /// Shown in place of a card whose event could not be found.
    pub fn placeholder(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            key: None,
            logo: None,
            highlights: "No details are available for this event.".to_string(),
            lines: Vec::new(),
        }
    }
}

/// Asset path of an event's logo, relative to the asset root.
pub fn logo_path(key: &EventKey) -> String {
    format!("logos/{}_{}.jpg", key.year, key.host)
}

fn count_line(count: Option<u32>, unit: &str) -> String {
    match count {
        Some(n) => format!("{n} {unit}"),
        None => format!("unknown {unit}"),
    }
}

pub fn create_card(store: &EventStore, key: &EventKey) -> Result<DetailCard> {
    store
        .load_event_detail(key)
        .map(|detail| DetailCard::from_detail(&detail))
}

/// Builds the card for a `"{host} {year}"` label.
pub fn create_card_from_label(store: &EventStore, label: &str) -> Result<DetailCard> {
    let key = EventKey::from_label(label)?;
    create_card(store, &key)
}
