//! Charts module - Chart descriptions and PNG rendering

mod plotter;
mod renderer;

pub use plotter::{
    BarLayout, ChartData, ChartSpec, ChartStyle, Palette, BLUE, GREEN, ORANGE, PINK, PURPLE, RED,
};
#[cfg(test)]
pub use renderer::system_font_available;
pub use renderer::{RenderError, StaticChartRenderer};
