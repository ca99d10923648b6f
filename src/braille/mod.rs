mod canvas;

pub use canvas::{glyph, BrailleCanvas};
