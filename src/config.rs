use clap::{Parser, ValueEnum};
use ratatui::style::Color;
use std::path::PathBuf;
use std::time::Duration;

/// Largest bubble radius accepted on the command line, in braille dots
pub const MAX_BUBBLE_RADIUS: f64 = 200.0;

/// Built-in bubble styles. Individual flags override the preset's values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Small translucent-red bubbles
    #[default]
    Classic,
    /// Larger steel-blue bubbles
    Large,
}

impl Preset {
    pub fn style(self) -> BubbleStyle {
        match self {
            Preset::Classic => BubbleStyle {
                max_radius: 12.0,
                fill: Color::Rgb(217, 91, 67),
                stroke: Color::White,
                hover_stroke: Color::Yellow,
            },
            Preset::Large => BubbleStyle {
                max_radius: 18.0,
                fill: Color::Rgb(70, 130, 180),
                stroke: Color::White,
                hover_stroke: Color::Yellow,
            },
        }
    }
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    name = "bubble-map",
    version,
    about = "Proportional-symbol world map of causes of death, drawn in the terminal"
)]
pub struct Args {
    /// World boundary GeoJSON (FeatureCollection)
    #[arg(long, default_value = "data/world.geojson")]
    pub world: PathBuf,

    /// Cause-of-death CSV with a header row
    #[arg(long, default_value = "data/cause_of_deaths.csv")]
    pub data: PathBuf,

    /// Cause column to show first (defaults to the first cause column)
    #[arg(long)]
    pub cause: Option<String>,

    /// Year to show first (snaps to the nearest year in the data)
    #[arg(long)]
    pub year: Option<i32>,

    #[arg(long, value_enum, default_value_t = Preset::Classic)]
    pub preset: Preset,

    /// Largest bubble radius in braille dots
    #[arg(long, value_parser = parse_max_radius)]
    pub max_radius: Option<f64>,

    #[arg(long, value_parser = parse_color)]
    pub fill: Option<Color>,

    #[arg(long, value_parser = parse_color)]
    pub stroke: Option<Color>,

    #[arg(long, value_parser = parse_color)]
    pub hover_stroke: Option<Color>,

    /// Duration of the bubble move/resize animation
    #[arg(long, default_value_t = 750)]
    pub transition_ms: u64,

    /// Mercator scale as a fraction of the scale that fits 360° into the canvas width
    #[arg(long, default_value_t = 0.84)]
    pub scale_factor: f64,

    /// Vertical translation is canvas height divided by this
    #[arg(long, default_value_t = 1.5)]
    pub translate_y_divisor: f64,

    /// Feature property tried when a code does not match any feature id
    #[arg(long, default_value = "iso_a3")]
    pub id_property: String,

    #[arg(long, default_value = "Country/Territory")]
    pub name_column: String,

    #[arg(long, default_value = "Code")]
    pub code_column: String,

    #[arg(long, default_value = "Year")]
    pub year_column: String,
}

fn parse_color(s: &str) -> Result<Color, String> {
    s.parse::<Color>()
        .map_err(|_| format!("invalid color `{s}` (expected a name like `red` or `#rrggbb`)"))
}

fn parse_max_radius(s: &str) -> Result<f64, String> {
    let r: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (0.0..=MAX_BUBBLE_RADIUS).contains(&r) {
        Ok(r)
    } else {
        Err(format!("must be between 0 and {MAX_BUBBLE_RADIUS}"))
    }
}

/// Identifying columns of the tabular dataset. Every other column is a cause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Columns {
    pub name: String,
    pub code: String,
    pub year: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            name: "Country/Territory".to_string(),
            code: "Code".to_string(),
            year: "Year".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    pub world: PathBuf,
    pub records: PathBuf,
    pub columns: Columns,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionConfig {
    pub scale_factor: f64,
    pub translate_y_divisor: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            scale_factor: 0.84,
            translate_y_divisor: 1.5,
        }
    }
}

/// Bubble radius range and colors
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BubbleStyle {
    pub max_radius: f64,
    pub fill: Color,
    pub stroke: Color,
    pub hover_stroke: Color,
}

impl Default for BubbleStyle {
    fn default() -> Self {
        Preset::Classic.style()
    }
}

/// Everything the application needs after argument parsing
#[derive(Clone, Debug)]
pub struct Config {
    pub data: DataConfig,
    pub projection: ProjectionConfig,
    pub style: BubbleStyle,
    pub transition: Duration,
    pub id_property: String,
    pub initial_cause: Option<String>,
    pub initial_year: Option<i32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                world: PathBuf::from("data/world.geojson"),
                records: PathBuf::from("data/cause_of_deaths.csv"),
                columns: Columns::default(),
            },
            projection: ProjectionConfig::default(),
            style: BubbleStyle::default(),
            transition: Duration::from_millis(750),
            id_property: "iso_a3".to_string(),
            initial_cause: None,
            initial_year: None,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let mut style = args.preset.style();
        if let Some(r) = args.max_radius {
            style.max_radius = r.clamp(0.0, MAX_BUBBLE_RADIUS);
        }
        if let Some(c) = args.fill {
            style.fill = c;
        }
        if let Some(c) = args.stroke {
            style.stroke = c;
        }
        if let Some(c) = args.hover_stroke {
            style.hover_stroke = c;
        }

        Self {
            data: DataConfig {
                world: args.world,
                records: args.data,
                columns: Columns {
                    name: args.name_column,
                    code: args.code_column,
                    year: args.year_column,
                },
            },
            projection: ProjectionConfig {
                scale_factor: args.scale_factor,
                translate_y_divisor: args.translate_y_divisor,
            },
            style,
            transition: Duration::from_millis(args.transition_ms),
            id_property: args.id_property,
            initial_cause: args.cause,
            initial_year: args.year,
        }
    }
}
