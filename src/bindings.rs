//! Reactive updates for the dashboard page.
//!
//! Each input on the page is bound to one output. When an input changes the
//! front end sends an [`InputChange`]; [`Dispatcher::dispatch`] looks up the
//! binding, reruns its view builder and returns the replacement for the
//! bound output. Outputs are always replaced whole.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::data::DataSources;
use crate::error::{DashboardError, Result};
use crate::models::{EventKey, Feature, Season};
use crate::views::{self, ChartSpec, DetailCard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKey {
    #[serde(rename = "dropdown-input")]
    FeatureDropdown,
    #[serde(rename = "checklist-input")]
    SeasonChecklist,
    #[serde(rename = "map-hover")]
    MapHover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKey {
    #[serde(rename = "line-chart")]
    LineChart,
    #[serde(rename = "bar-div")]
    BarContainer,
    #[serde(rename = "event-card")]
    EventCard,
}

/// New value of one page input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputChange {
    pub input: InputKey,
    #[serde(default)]
    pub value: Value,
}

impl InputChange {
    pub fn new(input: InputKey, value: impl Into<Value>) -> Self {
        Self {
            input,
            value: value.into(),
        }
    }
}

/// Hover payload sent by the map. `customdata` is the point's [`EventKey`];
/// `hovertext` is only parsed when the key is absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoverData {
    #[serde(default)]
    pub points: Vec<HoverPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoverPoint {
    pub hovertext: Option<String>,
    pub customdata: Option<EventKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Output {
    Chart(ChartSpec),
    /// Container contents, one chart per selected season
    Charts(Vec<ChartSpec>),
    Card(DetailCard),
}

/// Replacement for one output. `sequence` orders updates across the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub output: OutputKey,
    pub sequence: u64,
    pub content: Output,
}

/// Returns `Ok(None)` when the change should leave the output untouched.
pub type Handler = fn(&DataSources, &Value) -> Result<Option<Output>>;

#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub output: OutputKey,
    pub handler: Handler,
}

pub struct Dispatcher {
    sources: DataSources,
    bindings: HashMap<InputKey, Binding>,
    sequence: AtomicU64,
}

impl Dispatcher {
    pub fn new(sources: DataSources) -> Self {
        Self {
            sources,
            bindings: HashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Dispatcher with the three dashboard bindings registered.
    pub fn with_default_bindings(sources: DataSources) -> Self {
        let mut dispatcher = Self::new(sources);
        dispatcher.register(InputKey::FeatureDropdown, OutputKey::LineChart, update_line_chart);
        dispatcher.register(InputKey::SeasonChecklist, OutputKey::BarContainer, update_bar_charts);
        dispatcher.register(InputKey::MapHover, OutputKey::EventCard, update_event_card);
        dispatcher
    }

    pub fn register(&mut self, input: InputKey, output: OutputKey, handler: Handler) {
        self.bindings.insert(input, Binding { output, handler });
    }

    pub fn binding(&self, input: InputKey) -> Option<&Binding> {
        self.bindings.get(&input)
    }

    pub fn sources(&self) -> &DataSources {
        &self.sources
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Runs the handler bound to `change.input`. Errors from the view
    /// builders are returned as they are.
    pub fn dispatch(&self, change: &InputChange) -> Result<Option<Update>> {
        self.dispatch_with(self.next_sequence(), change)
    }

    /// [`Self::dispatch`], except that a card lookup for an unknown event
    /// yields a placeholder card instead of an error. The placeholder carries
    /// the sequence number of the change that produced it.
    pub fn respond(&self, change: &InputChange) -> Result<Option<Update>> {
        let sequence = self.next_sequence();
        match self.dispatch_with(sequence, change) {
            Err(DashboardError::NotFound { host, year }) if change.input == InputKey::MapHover => {
                let key = EventKey::new(host, year);
                warn!(event = %key, sequence, "hovered event has no details");
                Ok(Some(Update {
                    output: OutputKey::EventCard,
                    sequence,
                    content: Output::Card(DetailCard::placeholder(key.label())),
                }))
            }
            other => other,
        }
    }

    fn dispatch_with(&self, sequence: u64, change: &InputChange) -> Result<Option<Update>> {
        let Some(binding) = self.bindings.get(&change.input) else {
            debug!(input = ?change.input, "no binding registered");
            return Ok(None);
        };

        let content = (binding.handler)(&self.sources, &change.value)?;
        Ok(content.map(|content| Update {
            output: binding.output,
            sequence,
            content,
        }))
    }
}

fn update_line_chart(sources: &DataSources, value: &Value) -> Result<Option<Output>> {
    let feature = match value {
        Value::String(s) => s.parse::<Feature>()?,
        other => return Err(DashboardError::InvalidFeature(other.to_string())),
    };
    views::trend_chart(&sources.csv_path, feature).map(|chart| Some(Output::Chart(chart)))
}

/// Parses the checklist value. Selection order is kept and repeats dropped.
pub fn selected_seasons(value: &Value) -> Result<Vec<Season>> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => return Err(DashboardError::InvalidSeason(other.to_string())),
    };

    let mut seasons = Vec::with_capacity(items.len());
    for item in items {
        let season = match item {
            Value::String(s) => s.parse::<Season>()?,
            other => return Err(DashboardError::InvalidSeason(other.to_string())),
        };
        if !seasons.contains(&season) {
            seasons.push(season);
        }
    }
    Ok(seasons)
}

fn update_bar_charts(sources: &DataSources, value: &Value) -> Result<Option<Output>> {
    let charts = selected_seasons(value)?
        .into_iter()
        .map(|season| views::gender_chart(&sources.csv_path, season))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(Output::Charts(charts)))
}

/// Key of the hovered point, or `None` when nothing is hovered.
pub fn hovered_event(value: &Value) -> Result<Option<EventKey>> {
    if value.is_null() {
        return Ok(None);
    }
    let hover: HoverData = serde_json::from_value(value.clone())
        .map_err(|_| DashboardError::InvalidLabel(value.to_string()))?;

    let Some(point) = hover.points.into_iter().next() else {
        return Ok(None);
    };
    match (point.customdata, point.hovertext) {
        (Some(key), _) => Ok(Some(key)),
        (None, Some(label)) => EventKey::from_label(&label).map(Some),
        (None, None) => Ok(None),
    }
}

fn update_event_card(sources: &DataSources, value: &Value) -> Result<Option<Output>> {
    let Some(key) = hovered_event(value)? else {
        return Ok(None);
    };
    views::create_card(&sources.store, &key).map(|card| Some(Output::Card(card)))
}

/// Current content of every output on the page.
#[derive(Debug, Default)]
pub struct PageState {
    outputs: HashMap<OutputKey, (u64, Output)>,
}

impl PageState {
    /// Replaces the output unless a newer update has already been applied
    /// to it. Returns whether the update was applied.
    pub fn apply(&mut self, update: Update) -> bool {
        if let Some((applied, _)) = self.outputs.get(&update.output) {
            if *applied >= update.sequence {
                debug!(output = ?update.output, sequence = update.sequence, "stale update dropped");
                return false;
            }
        }
        self.outputs
            .insert(update.output, (update.sequence, update.content));
        true
    }

    pub fn get(&self, output: OutputKey) -> Option<&Output> {
        self.outputs.get(&output).map(|(_, content)| content)
    }
}

/// A dashboard page: the bindings plus what they last produced.
pub struct Dashboard<'a> {
    dispatcher: &'a Dispatcher,
    state: PageState,
}

impl<'a> Dashboard<'a> {
    /// Input values the page starts with.
    pub fn initial_changes() -> Vec<InputChange> {
        vec![
            InputChange::new(InputKey::FeatureDropdown, Feature::default().as_str()),
            InputChange::new(
                InputKey::SeasonChecklist,
                Value::from(vec![Season::Summer.as_str()]),
            ),
        ]
    }

    /// Builds the page and renders the initial outputs. The event card
    /// starts empty until something is hovered.
    pub fn load(dispatcher: &'a Dispatcher) -> Result<Self> {
        let mut dashboard = Self {
            dispatcher,
            state: PageState::default(),
        };
        for change in Self::initial_changes() {
            dashboard.on_change(&change)?;
        }
        Ok(dashboard)
    }

    /// Returns whether any output changed.
    pub fn on_change(&mut self, change: &InputChange) -> Result<bool> {
        match self.dispatcher.respond(change)? {
            Some(update) => Ok(self.state.apply(update)),
            None => Ok(false),
        }
    }

    pub fn output(&self, key: OutputKey) -> Option<&Output> {
        self.state.get(key)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use serde_json::json;
    use tempfile::NamedTempFile;

    struct Fixture {
        _csv: NamedTempFile,
        _db: NamedTempFile,
        dispatcher: Dispatcher,
    }

    fn fixture() -> Fixture {
        let csv = fixtures::sample_csv();
        let db = fixtures::sample_db();
        let dispatcher =
            Dispatcher::with_default_bindings(DataSources::new(csv.path(), db.path()));
        Fixture {
            _csv: csv,
            _db: db,
            dispatcher,
        }
    }

    fn charts(update: Option<Update>) -> Vec<ChartSpec> {
        match update.unwrap().content {
            Output::Charts(charts) => charts,
            other => panic!("expected charts, got {other:?}"),
        }
    }

    #[test]
    fn test_feature_change_replaces_line_chart() {
        let f = fixture();
        let first = f
            .dispatcher
            .dispatch(&InputChange::new(InputKey::FeatureDropdown, "events"))
            .unwrap()
            .unwrap();
        let second = f
            .dispatcher
            .dispatch(&InputChange::new(InputKey::FeatureDropdown, "sports"))
            .unwrap()
            .unwrap();

        assert_eq!(first.output, OutputKey::LineChart);
        assert!(second.sequence > first.sequence);
        let (Output::Chart(a), Output::Chart(b)) = (first.content, second.content) else {
            panic!("expected line charts");
        };
        assert_ne!(a, b);
        assert_eq!(a.y_fields, vec!["events"]);
        assert_eq!(b.y_fields, vec!["sports"]);
    }

    #[test]
    fn test_invalid_feature_surfaces() {
        let f = fixture();
        let err = f
            .dispatcher
            .dispatch(&InputChange::new(InputKey::FeatureDropdown, "medals"))
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidFeature(_)));
    }

    #[test]
    fn test_no_seasons_gives_empty_container() {
        let f = fixture();
        let update = f
            .dispatcher
            .dispatch(&InputChange::new(InputKey::SeasonChecklist, json!([])))
            .unwrap();
        assert!(charts(update).is_empty());
    }

    #[test]
    fn test_two_seasons_in_selection_order() {
        let f = fixture();
        let update = f
            .dispatcher
            .dispatch(&InputChange::new(
                InputKey::SeasonChecklist,
                json!(["summer", "winter"]),
            ))
            .unwrap();
        let built = charts(update);
        assert_eq!(built.len(), 2);
        assert!(built[0].title.contains("summer"));
        assert!(built[1].title.contains("winter"));

        let update = f
            .dispatcher
            .dispatch(&InputChange::new(
                InputKey::SeasonChecklist,
                json!(["winter", "summer"]),
            ))
            .unwrap();
        let built = charts(update);
        assert!(built[0].title.contains("winter"));
    }

    #[test]
    fn test_selected_seasons_dedupes() {
        let seasons = selected_seasons(&json!(["winter", "winter", "summer"])).unwrap();
        assert_eq!(seasons, vec![Season::Winter, Season::Summer]);
        assert!(selected_seasons(&json!("summer")).is_err());
        assert!(selected_seasons(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_hover_without_point_is_noop() {
        let f = fixture();
        for value in [Value::Null, json!({ "points": [] })] {
            let update = f
                .dispatcher
                .dispatch(&InputChange::new(InputKey::MapHover, value))
                .unwrap();
            assert!(update.is_none());
        }
    }

    #[test]
    fn test_hover_uses_custom_data_before_label() {
        let value = json!({
            "points": [{
                "hovertext": "not a label",
                "customdata": { "host": "Barcelona", "year": 1992 }
            }]
        });
        assert_eq!(
            hovered_event(&value).unwrap(),
            Some(EventKey::new("Barcelona", 1992))
        );

        let value = json!({ "points": [{ "hovertext": "Rio de Janeiro 2016" }] });
        assert_eq!(
            hovered_event(&value).unwrap(),
            Some(EventKey::new("Rio de Janeiro", 2016))
        );
    }

    #[test]
    fn test_hover_builds_card() {
        let f = fixture();
        let value = json!({ "points": [{ "hovertext": "London 2012" }] });
        let update = f
            .dispatcher
            .dispatch(&InputChange::new(InputKey::MapHover, value))
            .unwrap()
            .unwrap();

        assert_eq!(update.output, OutputKey::EventCard);
        let Output::Card(card) = update.content else {
            panic!("expected a card");
        };
        assert_eq!(card.title, "London 2012");
        assert_eq!(card.logo.as_deref(), Some("logos/2012_London.jpg"));
    }

    #[test]
    fn test_unknown_hover_becomes_placeholder() {
        let f = fixture();
        let change = InputChange::new(
            InputKey::MapHover,
            json!({ "points": [{ "hovertext": "Atlantis 2099" }] }),
        );

        assert!(matches!(
            f.dispatcher.dispatch(&change),
            Err(DashboardError::NotFound { .. })
        ));
        let update = f.dispatcher.respond(&change).unwrap().unwrap();
        let Output::Card(card) = update.content else {
            panic!("expected a card");
        };
        assert_eq!(card.title, "Atlantis 2099");
        assert!(card.logo.is_none());
    }

    #[test]
    fn test_stale_update_is_dropped() {
        let f = fixture();
        let hover = |label: &str| {
            InputChange::new(InputKey::MapHover, json!({ "points": [{ "hovertext": label }] }))
        };
        let older = f.dispatcher.dispatch(&hover("Rome 1960")).unwrap().unwrap();
        let newer = f.dispatcher.dispatch(&hover("Beijing 2022")).unwrap().unwrap();

        let mut state = PageState::default();
        assert!(state.apply(newer));
        assert!(!state.apply(older));
        let Some(Output::Card(card)) = state.get(OutputKey::EventCard) else {
            panic!("expected a card");
        };
        assert_eq!(card.title, "Beijing 2022");
    }

    #[test]
    fn test_placeholder_keeps_its_own_sequence() {
        let f = fixture();
        let change = InputChange::new(
            InputKey::MapHover,
            json!({ "points": [{ "hovertext": "Atlantis 2099" }] }),
        );

        let update = f.dispatcher.respond(&change).unwrap().unwrap();
        assert_eq!(update.sequence, 1);
        let next = f.dispatcher.dispatch(&change).unwrap_err();
        assert!(matches!(next, DashboardError::NotFound { .. }));
        let again = f.dispatcher.respond(&change).unwrap().unwrap();
        assert_eq!(again.sequence, 3);
    }

    #[test]
    fn test_late_placeholder_does_not_replace_newer_card() {
        let f = fixture();
        let hover = |label: &str| {
            InputChange::new(InputKey::MapHover, json!({ "points": [{ "hovertext": label }] }))
        };
        let unknown = f.dispatcher.respond(&hover("Atlantis 2099")).unwrap().unwrap();
        let known = f.dispatcher.respond(&hover("London 2012")).unwrap().unwrap();
        assert!(unknown.sequence < known.sequence);

        let mut state = PageState::default();
        assert!(state.apply(known));
        assert!(!state.apply(unknown));
        let Some(Output::Card(card)) = state.get(OutputKey::EventCard) else {
            panic!("expected a card");
        };
        assert_eq!(card.title, "London 2012");
    }

    #[test]
    fn test_dashboard_initial_state() {
        let f = fixture();
        let mut dashboard = Dashboard::load(&f.dispatcher).unwrap();

        let Some(Output::Chart(line)) = dashboard.output(OutputKey::LineChart) else {
            panic!("line chart missing");
        };
        assert_eq!(line.y_fields, vec!["events"]);
        let Some(Output::Charts(bars)) = dashboard.output(OutputKey::BarContainer) else {
            panic!("bar container missing");
        };
        assert_eq!(bars.len(), 1);
        assert!(dashboard.output(OutputKey::EventCard).is_none());

        // hovering off the map keeps the previous card
        let hovered = InputChange::new(
            InputKey::MapHover,
            json!({ "points": [{ "hovertext": "Lillehammer 1994" }] }),
        );
        assert!(dashboard.on_change(&hovered).unwrap());
        assert!(!dashboard
            .on_change(&InputChange::new(InputKey::MapHover, Value::Null))
            .unwrap());
        let Some(Output::Card(card)) = dashboard.output(OutputKey::EventCard) else {
            panic!("card missing");
        };
        assert_eq!(card.title, "Lillehammer 1994");
    }

    #[test]
    fn test_unregistered_input_is_ignored() {
        let csv = fixtures::sample_csv();
        let db = fixtures::sample_db();
        let dispatcher = Dispatcher::new(DataSources::new(csv.path(), db.path()));
        assert!(dispatcher.binding(InputKey::FeatureDropdown).is_none());
        let update = dispatcher
            .dispatch(&InputChange::new(InputKey::FeatureDropdown, "events"))
            .unwrap();
        assert!(update.is_none());
    }

    #[test]
    fn test_input_change_wire_format() {
        let change: InputChange =
            serde_json::from_value(json!({ "input": "checklist-input", "value": ["winter"] }))
                .unwrap();
        assert_eq!(change.input, InputKey::SeasonChecklist);
        assert_eq!(change.value, json!(["winter"]));
    }
}
