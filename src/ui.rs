use crate::app::App;
use crate::braille::{glyph, BrailleCanvas};
use crate::map::{draw_disc, draw_ring};
use crate::tooltip::format_value;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, LineGauge, List, ListItem, ListState, Paragraph, Widget},
    Frame,
};
use std::time::Instant;

/// Width of the cause selector on the right, including its border
pub const CAUSE_PANEL_WIDTH: u16 = 30;

/// Screen regions, shared by rendering and mouse handling
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Areas {
    /// Map block including its border
    pub map_frame: Rect,
    /// Drawable map area inside the border
    pub map: Rect,
    pub causes: Rect,
    pub slider: Rect,
    pub status: Rect,
}

/// Split the terminal into map, cause panel, year slider and status bar
pub fn layout(area: Rect) -> Areas {
    let rows = Layout::vertical([
        Constraint::Min(3),    // Map + causes
        Constraint::Length(3), // Year slider
        Constraint::Length(1), // Status bar
    ])
    .split(area);
    let cols = Layout::horizontal([Constraint::Min(10), Constraint::Length(CAUSE_PANEL_WIDTH)])
        .split(rows[0]);

    Areas {
        map_frame: cols[0],
        map: Block::bordered().inner(cols[0]),
        causes: cols[1],
        slider: rows[1],
        status: rows[2],
    }
}

/// Rows of the cause list inside its border
pub fn cause_list_area(areas: &Areas) -> Rect {
    Block::bordered().inner(areas.causes)
}

/// The slider line inside its border
pub fn slider_track(areas: &Areas) -> Rect {
    Block::bordered().inner(areas.slider)
}

/// First visible cause so that `selected` stays on screen
fn cause_list_offset(selected: usize, height: u16) -> usize {
    let height = height as usize;
    if height == 0 || selected < height {
        0
    } else {
        selected + 1 - height
    }
}

/// Cause index under a click, if the click hit the cause list
pub fn cause_at(areas: &Areas, selected: usize, pos: Position) -> Option<usize> {
    let list = cause_list_area(areas);
    list.contains(pos)
        .then(|| cause_list_offset(selected, list.height) + (pos.y - list.y) as usize)
}

/// Position along the slider in `[0, 1]`, if the click hit it
pub fn slider_ratio_at(areas: &Areas, pos: Position) -> Option<f64> {
    let track = slider_track(areas);
    track
        .contains(pos)
        .then(|| (pos.x - track.x) as f64 / track.width.saturating_sub(1).max(1) as f64)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App, now: Instant) {
    let areas = layout(frame.area());

    render_map(frame, app, &areas, now);
    render_causes(frame, app, &areas);
    render_slider(frame, app, &areas);
    render_status_bar(frame, app, areas.status);
    render_tooltip(frame, app, &areas, now);
}

fn render_map(frame: &mut Frame, app: &App, areas: &Areas, now: Instant) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {} deaths, {} ", app.cause(), app.year()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(block, areas.map_frame);

    let inner = areas.map;
    let (w, h) = (inner.width as usize, inner.height as usize);

    let mut outlines = BrailleCanvas::new(w, h);
    app.boundaries.draw(&mut outlines, &app.projection);

    let mut fill = BrailleCanvas::new(w, h);
    let mut stroke = BrailleCanvas::new(w, h);
    let mut hover = BrailleCanvas::new(w, h);
    let hovered = app.hovered().map(|b| b.key());

    for bubble in app.engine.bubbles() {
        let shape = bubble.shape(now);
        let is_hovered = hovered == Some(bubble.key());
        // Leave a dot of room for the outline on bubbles big enough to show one
        if shape.radius >= 3.0 {
            draw_disc(&mut fill, shape.center, shape.radius - 1.0);
            draw_ring(&mut stroke, shape.center, shape.radius);
        } else {
            draw_disc(&mut fill, shape.center, shape.radius);
        }
        if is_hovered {
            draw_ring(&mut hover, shape.center, shape.radius.max(1.0));
        }
    }

    let widget = MapWidget {
        layers: vec![
            (outlines, Color::DarkGray),
            (fill, app.style.fill),
            (stroke, app.style.stroke),
            (hover, app.style.hover_stroke),
        ],
    };
    frame.render_widget(widget, inner);
}

/// Braille layers composed per cell: dots are merged, the topmost layer
/// with any dot in the cell decides its color.
struct MapWidget {
    /// Back to front
    layers: Vec<(BrailleCanvas, Color)>,
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height {
            for col in 0..area.width {
                let (cx, cy) = (col as usize, row as usize);
                let mut bits = 0u8;
                let mut color = None;
                for (canvas, c) in &self.layers {
                    let b = canvas.bits(cx, cy);
                    if b != 0 {
                        bits |= b;
                        color = Some(*c);
                    }
                }
                if let Some(color) = color {
                    buf[(area.x + col, area.y + row)]
                        .set_char(glyph(bits))
                        .set_fg(color);
                }
            }
        }
    }
}

fn render_causes(frame: &mut Frame, app: &App, areas: &Areas) {
    let selected = app.selection().cause;
    let items: Vec<ListItem> = app
        .dataset
        .causes()
        .iter()
        .map(|c| ListItem::new(c.as_str()))
        .collect();

    let list = List::new(items)
        .block(
            Block::bordered()
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(" Cause ", Style::default().fg(Color::Cyan))),
        )
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let height = cause_list_area(areas).height;
    let mut state = ListState::default()
        .with_offset(cause_list_offset(selected, height))
        .with_selected(Some(selected));
    frame.render_stateful_widget(list, areas.causes, &mut state);
}

fn render_slider(frame: &mut Frame, app: &App, areas: &Areas) {
    let years = app.dataset.years();
    let title = match (years.first(), years.last()) {
        (Some(first), Some(last)) => format!(" Year ({first}-{last}) "),
        _ => " Year ".to_string(),
    };

    let gauge = LineGauge::default()
        .block(
            Block::bordered()
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(title, Style::default().fg(Color::Cyan))),
        )
        .filled_style(Style::default().fg(app.style.fill))
        .unfilled_style(Style::default().fg(Color::DarkGray))
        .line_set(symbols::line::THICK)
        .label(Line::styled(
            format!("{} ", app.year()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .ratio(app.year_ratio().clamp(0.0, 1.0));
    frame.render_widget(gauge, areas.slider);
}

/// Format a lon/lat pair with hemisphere letters
fn format_coords(lon: f64, lat: f64) -> String {
    format!(
        "{:.1}°{}, {:.1}°{}",
        lat.abs(),
        if lat >= 0.0 { "N" } else { "S" },
        lon.abs(),
        if lon >= 0.0 { "E" } else { "W" }
    )
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let summary = app.last_render;

    let mut spans = vec![
        Span::styled(" Bubbles: ", dim),
        Span::styled(summary.visible().to_string(), Style::default().fg(Color::Yellow)),
        Span::styled(" Max: ", dim),
        Span::styled(
            format_value(Some(app.engine.max_value())),
            Style::default().fg(Color::Magenta),
        ),
    ];
    if let Some((lon, lat)) = app.mouse_lonlat() {
        spans.push(Span::styled(" | ", dim));
        spans.push(Span::styled(format_coords(lon, lat), Style::default().fg(Color::Cyan)));
    }
    spans.push(Span::styled(
        " | tab/jk:cause hl/←→:year home/end q:quit",
        dim,
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_tooltip(frame: &mut Frame, app: &App, areas: &Areas, now: Instant) {
    if !app.tooltip.is_visible(now) {
        return;
    }
    let (Some(lines), Some((col, row))) = (app.tooltip_lines(), app.mouse_pos) else {
        return;
    };

    let bounds = areas.map_frame;
    let width = lines
        .iter()
        .map(|l| l.chars().count() as u16)
        .max()
        .unwrap_or(0)
        .saturating_add(2)
        .min(bounds.width);
    let height = (lines.len() as u16 + 2).min(bounds.height);

    // Up and to the right of the pointer, kept inside the map
    let x = col
        .saturating_add(2)
        .min(bounds.right().saturating_sub(width))
        .max(bounds.x);
    let y = row
        .saturating_sub(2)
        .min(bounds.bottom().saturating_sub(height))
        .max(bounds.y);
    let area = Rect::new(x, y, width, height);

    let bright = app.tooltip.opacity(now) >= 0.5;
    let (text_color, border_color) = if bright {
        (Color::White, Color::Gray)
    } else {
        (Color::DarkGray, Color::DarkGray)
    };

    let mut text: Vec<Line> = Vec::with_capacity(lines.len());
    for (i, line) in lines.into_iter().enumerate() {
        let style = if i == 0 {
            Style::default().fg(text_color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(text_color)
        };
        text.push(Line::styled(line, style));
    }

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text).block(Block::bordered().border_style(Style::default().fg(border_color))),
        area,
    );
}
