use crate::bubble::{Bubble, BubbleEngine, RenderSummary};
use crate::config::{BubbleStyle, Config, ProjectionConfig};
use crate::data::Dataset;
use crate::map::{BoundaryLayer, FeatureIndex, Projection};
use crate::tooltip::Tooltip;
use crate::ui::{self, Areas};
use geojson::FeatureCollection;
use glam::DVec2;
use log::{debug, warn};
use ratatui::layout::{Position, Rect};
use std::time::Instant;

/// Currently chosen cause (index into `Dataset::causes()`) and year
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub cause: usize,
    pub year: i32,
}

/// Application state
pub struct App {
    pub dataset: Dataset,
    pub boundaries: BoundaryLayer,
    features: FeatureCollection,
    pub projection: Projection,
    index: FeatureIndex,
    pub engine: BubbleEngine,
    selection: Selection,
    pub tooltip: Tooltip,
    pub style: BubbleStyle,
    projection_config: ProjectionConfig,
    id_property: String,
    pub areas: Areas,
    /// Current mouse position in terminal cells
    pub mouse_pos: Option<(u16, u16)>,
    /// Summary of the latest render, for the status bar
    pub last_render: RenderSummary,
    pub should_quit: bool,
}

impl App {
    /// Build the app for a terminal of `width` x `height` cells and draw the initial selection
    pub fn new(
        config: &Config,
        features: FeatureCollection,
        dataset: Dataset,
        width: u16,
        height: u16,
        now: Instant,
    ) -> Self {
        let cause = match config.initial_cause.as_deref() {
            Some(name) => dataset.cause_index(name).unwrap_or_else(|| {
                warn!("Unknown cause {name:?}; starting with the first cause");
                0
            }),
            None => 0,
        };
        let first_year = dataset.years().first().copied().unwrap_or_default();
        let year = config
            .initial_year
            .and_then(|y| dataset.nearest_year(y))
            .unwrap_or(first_year);

        let areas = ui::layout(Rect::new(0, 0, width, height));
        let projection = Projection::fit(
            areas.map.width as usize * 2,
            areas.map.height as usize * 4,
            &config.projection,
        );
        let index = FeatureIndex::build(&features, &projection, &config.id_property);

        let mut app = Self {
            boundaries: BoundaryLayer::from_features(&features),
            dataset,
            features,
            projection,
            index,
            engine: BubbleEngine::new(config.style.max_radius, config.transition),
            selection: Selection { cause, year },
            tooltip: Tooltip::new(now),
            style: config.style,
            projection_config: config.projection,
            id_property: config.id_property.clone(),
            areas,
            mouse_pos: None,
            last_render: RenderSummary::default(),
            should_quit: false,
        };
        app.rerender(now);
        app
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn cause(&self) -> &str {
        self.dataset
            .causes()
            .get(self.selection.cause)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn year(&self) -> i32 {
        self.selection.year
    }

    /// Re-run the render engine with the selection as it is right now
    pub fn rerender(&mut self, now: Instant) -> RenderSummary {
        let cause = self.cause().to_string();
        let year = self.selection.year;
        self.last_render = self
            .engine
            .render(&self.dataset, &self.index, &cause, year, now);
        self.refresh_hover(now);
        self.last_render
    }

    /// Choose a cause by position in the cause list
    pub fn select_cause(&mut self, cause: usize, now: Instant) {
        if cause < self.dataset.causes().len() && cause != self.selection.cause {
            self.selection.cause = cause;
            self.rerender(now);
        }
    }

    pub fn next_cause(&mut self, now: Instant) {
        let n = self.dataset.causes().len();
        if n > 0 {
            self.select_cause((self.selection.cause + 1) % n, now);
        }
    }

    pub fn prev_cause(&mut self, now: Instant) {
        let n = self.dataset.causes().len();
        if n > 0 {
            self.select_cause((self.selection.cause + n - 1) % n, now);
        }
    }

    /// Move the slider to `year`, snapping to the nearest year in the data
    pub fn set_year(&mut self, year: i32, now: Instant) {
        if let Some(year) = self.dataset.nearest_year(year) {
            if year != self.selection.year {
                self.selection.year = year;
                self.rerender(now);
            }
        }
    }

    fn year_position(&self) -> usize {
        let years = self.dataset.years();
        years
            .binary_search(&self.selection.year)
            .unwrap_or_else(|i| i.min(years.len().saturating_sub(1)))
    }

    pub fn next_year(&mut self, now: Instant) {
        let years = self.dataset.years();
        if let Some(&y) = years.get(self.year_position() + 1) {
            self.set_year(y, now);
        }
    }

    pub fn prev_year(&mut self, now: Instant) {
        let pos = self.year_position();
        if pos > 0 {
            let y = self.dataset.years()[pos - 1];
            self.set_year(y, now);
        }
    }

    pub fn first_year(&mut self, now: Instant) {
        if let Some(&y) = self.dataset.years().first() {
            self.set_year(y, now);
        }
    }

    pub fn last_year(&mut self, now: Instant) {
        if let Some(&y) = self.dataset.years().last() {
            self.set_year(y, now);
        }
    }

    /// Fraction of the way through the year range, for the slider
    pub fn year_ratio(&self) -> f64 {
        let n = self.dataset.years().len();
        if n <= 1 {
            1.0
        } else {
            self.year_position() as f64 / (n - 1) as f64
        }
    }

    /// Terminal resized: refit the projection and move bubbles to the new centroids
    pub fn resize(&mut self, width: u16, height: u16, now: Instant) {
        self.areas = ui::layout(Rect::new(0, 0, width, height));
        self.projection = Projection::fit(
            self.areas.map.width as usize * 2,
            self.areas.map.height as usize * 4,
            &self.projection_config,
        );
        self.index = FeatureIndex::build(&self.features, &self.projection, &self.id_property);
        debug!("Resized to {width}x{height}");
        self.rerender(now);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Track the pointer and update which bubble it is over
    pub fn set_mouse_pos(&mut self, col: u16, row: u16, now: Instant) {
        self.mouse_pos = Some((col, row));
        self.refresh_hover(now);
    }

    /// Mouse position in braille pixel coordinates of the map canvas
    pub fn mouse_pixel_pos(&self) -> Option<DVec2> {
        let (col, row) = self.mouse_pos?;
        let map = self.areas.map;
        if !map.contains(Position::new(col, row)) {
            return None;
        }
        // Centre of the character cell: each cell is 2 dots wide, 4 tall
        Some(DVec2::new(
            (col - map.x) as f64 * 2.0 + 1.0,
            (row - map.y) as f64 * 4.0 + 2.0,
        ))
    }

    /// Geographic coordinates under the mouse
    pub fn mouse_lonlat(&self) -> Option<(f64, f64)> {
        self.mouse_pixel_pos().map(|p| self.projection.unproject(p))
    }

    pub fn hovered(&self) -> Option<&Bubble> {
        if self.tooltip.is_hovering() {
            self.tooltip.subject().and_then(|k| self.engine.get(k))
        } else {
            None
        }
    }

    /// Re-run the hit test at the current pointer; bubbles can move under a still mouse
    pub fn refresh_hover(&mut self, now: Instant) {
        let hit = self
            .mouse_pixel_pos()
            .and_then(|p| self.engine.hit_test(p, now))
            .map(|b| b.key().to_string());

        match hit {
            Some(key) => {
                if !self.tooltip.is_hovering() || self.tooltip.subject() != Some(key.as_str()) {
                    self.tooltip.hover(&key, now);
                }
            }
            None => {
                if self.tooltip.is_hovering() {
                    self.tooltip.leave(now);
                }
            }
        }
    }

    /// Tooltip text for the bubble under (or last under) the pointer
    pub fn tooltip_lines(&self) -> Option<Vec<String>> {
        let bubble = self.engine.get(self.tooltip.subject()?)?;
        let record = self.dataset.record(bubble.record())?;
        let value = self.dataset.value(record, self.cause());
        Some(Tooltip::content(record, self.cause(), value))
    }

    /// Left click: pick a cause in the panel or move the year slider
    pub fn click(&mut self, col: u16, row: u16, now: Instant) {
        let pos = Position::new(col, row);
        if let Some(cause) = ui::cause_at(&self.areas, self.selection.cause, pos) {
            self.select_cause(cause, now);
        } else if let Some(ratio) = ui::slider_ratio_at(&self.areas, pos) {
            let years = self.dataset.years();
            if !years.is_empty() {
                let idx = (ratio * (years.len() - 1) as f64).round() as usize;
                let y = years[idx.min(years.len() - 1)];
                self.set_year(y, now);
            }
        }
    }

    /// Whether anything on screen is still moving
    pub fn is_animating(&self, now: Instant) -> bool {
        self.engine.is_animating(now) || self.tooltip.is_animating(now)
    }
}
