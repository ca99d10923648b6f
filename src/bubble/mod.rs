mod engine;
mod scale;
mod transition;

pub use engine::{diff, plan, Bubble, BubbleEngine, Diff, Plan, RenderSummary, Target, OFF_CANVAS};
pub use scale::SqrtScale;
pub use transition::{ease_cubic_in_out, Interpolate, Shape, Transition};
