//! Page registry and HTML rendering.
//!
//! The single-page dashboard and the two pages of the multi-page variant
//! share one layout. Initial chart specs are embedded in the page as JSON
//! for the front end to draw.

use askama::Template;
use serde::Serialize;

use crate::bindings::{Dashboard, Dispatcher, Output, OutputKey};
use crate::config::{AppConfig, MetaTag};
use crate::error::{DashboardError, Result};
use crate::models::{Feature, Season};
use crate::views::{self, ChartSpec, DetailCard};

/// An entry in the page registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub module: &'static str,
    pub name: &'static str,
    pub path: &'static str,
}

/// Registered pages, in navbar order
#[derive(Debug, Clone)]
pub struct PageRegistry {
    pages: Vec<Page>,
}

impl Default for PageRegistry {
    fn default() -> Self {
        Self {
            pages: vec![
                Page {
                    module: "pages.events",
                    name: "Event Details",
                    path: "/pages/events",
                },
                Page {
                    module: "pages.charts",
                    name: "Charts",
                    path: "/pages/charts",
                },
            ],
        }
    }
}

impl PageRegistry {
    pub fn get(&self, module: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.module == module)
    }

    /// Looks a page up by the last segment of its path.
    pub fn by_slug(&self, slug: &str) -> Option<&Page> {
        self.pages
            .iter()
            .find(|p| p.path.rsplit('/').next() == Some(slug))
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn nav(&self, active: Option<&Page>) -> Vec<NavLink> {
        self.pages
            .iter()
            .map(|page| NavLink {
                name: page.name,
                path: page.path,
                active: active.is_some_and(|a| a.module == page.module),
            })
            .collect()
    }
}

pub struct NavLink {
    pub name: &'static str,
    pub path: &'static str,
    pub active: bool,
}

pub struct Layout<'a> {
    pub title: &'a str,
    pub meta_tags: &'a [MetaTag],
    pub stylesheets: &'a [String],
    pub nav: Vec<NavLink>,
}

impl<'a> Layout<'a> {
    fn new(config: &'a AppConfig, registry: &PageRegistry, active: Option<&Page>) -> Self {
        Self {
            title: &config.title,
            meta_tags: &config.meta_tags,
            stylesheets: &config.stylesheets,
            nav: registry.nav(active),
        }
    }
}

pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate<'a> {
    pub layout: Layout<'a>,
    pub features: Vec<SelectOption>,
    pub seasons: Vec<SelectOption>,
    pub line_chart: String,
    pub bar_charts: String,
    pub geo_chart: String,
    pub card: Option<DetailCard>,
}

#[derive(Template)]
#[template(path = "charts_page.html")]
pub struct ChartsPageTemplate<'a> {
    pub layout: Layout<'a>,
    pub features: Vec<SelectOption>,
    pub seasons: Vec<SelectOption>,
    pub line_chart: String,
    pub bar_charts: String,
}

#[derive(Template)]
#[template(path = "events_page.html")]
pub struct EventsPageTemplate<'a> {
    pub layout: Layout<'a>,
    pub geo_chart: String,
    pub card: Option<DetailCard>,
}

/// JSON for a `<script type="application/json">` block.
pub fn json_script<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn feature_options(selected: Feature) -> Vec<SelectOption> {
    Feature::ALL
        .into_iter()
        .map(|feature| SelectOption {
            value: feature.as_str(),
            label: feature.label(),
            selected: feature == selected,
        })
        .collect()
}

fn season_options(selected: &[Season]) -> Vec<SelectOption> {
    Season::ALL
        .into_iter()
        .map(|season| SelectOption {
            value: season.as_str(),
            label: match season {
                Season::Summer => "Summer",
                Season::Winter => "Winter",
            },
            selected: selected.contains(&season),
        })
        .collect()
}

/// Initial line chart and bar container from the page's default inputs.
fn initial_charts(dispatcher: &Dispatcher) -> Result<(ChartSpec, Vec<ChartSpec>)> {
    let dashboard = Dashboard::load(dispatcher)?;
    let line = match dashboard.output(OutputKey::LineChart) {
        Some(Output::Chart(chart)) => chart.clone(),
        _ => return Err(DashboardError::DataIntegrity("line chart was not built".into())),
    };
    let bars = match dashboard.output(OutputKey::BarContainer) {
        Some(Output::Charts(charts)) => charts.clone(),
        _ => Vec::new(),
    };
    Ok((line, bars))
}

pub fn render_dashboard(
    config: &AppConfig,
    registry: &PageRegistry,
    dispatcher: &Dispatcher,
) -> Result<String> {
    let (line, bars) = initial_charts(dispatcher)?;
    let geo = views::geo_chart(&dispatcher.sources().store)?;

    let template = DashboardTemplate {
        layout: Layout::new(config, registry, None),
        features: feature_options(Feature::default()),
        seasons: season_options(&[Season::Summer]),
        line_chart: json_script(&line)?,
        bar_charts: json_script(&bars)?,
        geo_chart: json_script(&geo)?,
        card: None,
    };
    Ok(template.render()?)
}

/// Renders a page of the multi-page variant by its path slug.
pub fn render_page(
    config: &AppConfig,
    registry: &PageRegistry,
    dispatcher: &Dispatcher,
    slug: &str,
) -> Result<String> {
    let page = registry
        .by_slug(slug)
        .ok_or_else(|| DashboardError::PageNotFound(slug.to_string()))?;
    let layout = Layout::new(config, registry, Some(page));

    let html = match page.module {
        "pages.charts" => {
            let (line, bars) = initial_charts(dispatcher)?;
            ChartsPageTemplate {
                layout,
                features: feature_options(Feature::default()),
                seasons: season_options(&[Season::Summer]),
                line_chart: json_script(&line)?,
                bar_charts: json_script(&bars)?,
            }
            .render()?
        }
        "pages.events" => {
            let geo = views::geo_chart(&dispatcher.sources().store)?;
            EventsPageTemplate {
                layout,
                geo_chart: json_script(&geo)?,
                card: None,
            }
            .render()?
        }
        other => return Err(DashboardError::PageNotFound(other.to_string())),
    };
    Ok(html)
}
