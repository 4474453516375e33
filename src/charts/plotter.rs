//! Chart Plotter Module
//! Chart descriptions, colour palettes and axis layout helpers shared by the
//! renderer.

use crate::aggregate::{AggregateView, CrossTab};
use plotters::style::RGBColor;

/// Categorical palette for charts without a gradient.
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),  // Blue
    RGBColor(255, 127, 14),  // Orange
    RGBColor(44, 160, 44),   // Green
    RGBColor(214, 39, 40),   // Red
    RGBColor(148, 103, 189), // Purple
    RGBColor(140, 86, 75),   // Brown
    RGBColor(227, 119, 194), // Pink
    RGBColor(127, 127, 127), // Grey
    RGBColor(188, 189, 34),  // Olive
    RGBColor(23, 190, 207),  // Cyan
];

pub const RED: RGBColor = RGBColor(214, 39, 40);
pub const GREEN: RGBColor = RGBColor(44, 160, 44);
pub const ORANGE: RGBColor = RGBColor(255, 127, 14);
pub const BLUE: RGBColor = RGBColor(31, 119, 180);
pub const PURPLE: RGBColor = RGBColor(148, 103, 189);
pub const PINK: RGBColor = RGBColor(227, 119, 194);
pub const GRID: RGBColor = RGBColor(200, 200, 200);

/// Labels longer than this are drawn rotated under vertical bars.
pub const ROTATE_LABEL_CHARS: usize = 10;
/// `BarLayout::Auto` switches to horizontal bars above these limits.
pub const AUTO_HORIZONTAL_COUNT: usize = 12;
pub const AUTO_HORIZONTAL_CHARS: usize = 16;

/// How bar colours are chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Palette {
    /// Cycle through `PALETTE`.
    Categorical,
    /// Cycle through a fixed list.
    Fixed(&'static [RGBColor]),
    /// Shade from `base` (first bar) towards white (last bar).
    Gradient(RGBColor),
    /// One colour for every bar.
    Solid(RGBColor),
}

impl Palette {
    pub fn color(self, index: usize, count: usize) -> RGBColor {
        match self {
            Palette::Categorical => PALETTE[index % PALETTE.len()],
            Palette::Fixed(colors) if !colors.is_empty() => colors[index % colors.len()],
            Palette::Fixed(_) => PALETTE[index % PALETTE.len()],
            Palette::Solid(color) => color,
            Palette::Gradient(base) => {
                let t = if count > 1 {
                    index as f64 / (count - 1) as f64 * 0.65
                } else {
                    0.0
                };
                let mix = |c: u8| (c as f64 + (255.0 - c as f64) * t).round() as u8;
                RGBColor(mix(base.0), mix(base.1), mix(base.2))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarLayout {
    Vertical,
    Horizontal,
    /// Horizontal when there are many categories or long labels.
    Auto,
}

impl BarLayout {
    pub fn resolve(self, labels: &[String]) -> BarLayout {
        match self {
            BarLayout::Auto => {
                let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
                if labels.len() > AUTO_HORIZONTAL_COUNT || longest > AUTO_HORIZONTAL_CHARS {
                    BarLayout::Horizontal
                } else {
                    BarLayout::Vertical
                }
            }
            fixed => fixed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartStyle {
    Bars(BarLayout),
    /// Line with a filled area underneath.
    Area,
    /// One 100% bar per cross-tab row.
    StackedPercent,
    /// One bar per cross-tab row, stacked by column counts.
    StackedCounts,
}

/// Everything the renderer needs to know about one chart besides its data.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub ordinal: u8,
    pub name: &'static str,
    pub title: &'static str,
    pub x_desc: &'static str,
    pub y_desc: &'static str,
    pub style: ChartStyle,
    pub palette: Palette,
    /// Column colours for stacked charts, in cross-tab column order.
    pub series_colors: &'static [RGBColor],
    /// Figure size in inches.
    pub figure: (f64, f64),
    /// Annotate bars with their percentage of the view's universe.
    pub show_percent: bool,
    /// Draw every n-th category label.
    pub label_every: usize,
}

impl ChartSpec {
    pub fn file_stem(&self) -> String {
        format!("{:02}_{}", self.ordinal, self.name)
    }

    pub fn file_name(&self) -> String {
        format!("{}.png", self.file_stem())
    }

    pub fn pixel_size(&self, dpi: u32) -> (u32, u32) {
        let px = |inches: f64| (inches * dpi as f64).round().max(1.0) as u32;
        (px(self.figure.0), px(self.figure.1))
    }
}

/// The aggregate a chart draws.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Series(AggregateView),
    Table(CrossTab),
}

impl ChartData {
    pub fn category_count(&self) -> usize {
        match self {
            ChartData::Series(view) => view.len(),
            ChartData::Table(tab) => tab.rows().len(),
        }
    }
}

/// Round a step to 1, 2 or 5 times a power of ten.
pub fn nice_step(range: f64, target_steps: usize) -> f64 {
    if range <= 0.0 || target_steps == 0 {
        return 1.0;
    }
    let raw_step = range / target_steps as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / magnitude;

    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };

    nice * magnitude
}

/// Upper bound of the value axis: headroom for annotations, rounded up to a
/// whole tick step.
pub fn value_axis_max(max_value: f64) -> f64 {
    let padded = (max_value * 1.15).max(1.0);
    let step = nice_step(padded, 8);
    (padded / step).ceil() * step
}

/// Positions of the value-axis gridlines, excluding zero.
pub fn grid_ticks(axis_max: f64) -> Vec<f64> {
    let step = nice_step(axis_max, 8);
    let count = (axis_max / step + 1e-9).floor() as usize;
    (1..=count).map(|i| i as f64 * step).collect()
}

/// Split `[start, end]` into `dashes` equal dashes separated by equal gaps.
pub fn dashed_segments(start: f64, end: f64, dashes: usize) -> Vec<(f64, f64)> {
    if dashes == 0 || end <= start {
        return Vec::new();
    }
    let period = (end - start) / dashes as f64;
    (0..dashes)
        .map(|i| {
            let a = start + i as f64 * period;
            (a, a + period * 0.6)
        })
        .collect()
}

pub fn needs_rotation(labels: &[String]) -> bool {
    labels.iter().any(|l| l.chars().count() > ROTATE_LABEL_CHARS)
}

/// Rough rendered width of `text` at a font size of `font_px`.
pub fn estimate_text_width(text: &str, font_px: u32) -> u32 {
    (text.chars().count() as f64 * font_px as f64 * 0.6).ceil() as u32
}

/// `1234567` → `1,234,567`.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(100.0, 5, 20.0)]
    #[case(7.0, 8, 1.0)]
    #[case(1150.0, 8, 200.0)]
    #[case(0.9, 8, 0.2)]
    fn test_nice_step(#[case] range: f64, #[case] steps: usize, #[case] expected: f64) {
        assert!((nice_step(range, steps) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_value_axis_leaves_headroom() {
        for max in [1.0, 3.0, 47.0, 1234.0, 100.0] {
            let axis = value_axis_max(max);
            assert!(axis >= max * 1.15 - 1e-9, "{axis} < {max} * 1.15");
        }
    }

    #[test]
    fn test_grid_ticks_within_axis() {
        let ticks = grid_ticks(1400.0);
        assert_eq!(ticks.first().copied(), Some(200.0));
        assert_eq!(ticks.last().copied(), Some(1400.0));
        assert!(ticks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_dashed_segments() {
        let dashes = dashed_segments(0.0, 10.0, 5);
        assert_eq!(dashes.len(), 5);
        assert_eq!(dashes[0], (0.0, 1.2));
        assert!(dashes.iter().all(|(a, b)| a < b && *b <= 10.0));
        assert!(dashed_segments(1.0, 1.0, 4).is_empty());
    }

    #[rstest]
    #[case(0, "0")]
    #[case(999, "999")]
    #[case(1000, "1,000")]
    #[case(2535, "2,535")]
    #[case(1234567, "1,234,567")]
    fn test_format_count(#[case] n: usize, #[case] expected: &str) {
        assert_eq!(format_count(n), expected);
    }

    #[test]
    fn test_auto_layout() {
        let short = labels(&["Attack", "Other", "Undetermined"]);
        assert_eq!(BarLayout::Auto.resolve(&short), BarLayout::Vertical);

        let long = labels(&["gun", "undetermined weapon type"]);
        assert_eq!(BarLayout::Auto.resolve(&long), BarLayout::Horizontal);

        let many: Vec<String> = (0..13).map(|i| format!("S{i}")).collect();
        assert_eq!(BarLayout::Auto.resolve(&many), BarLayout::Horizontal);
        assert_eq!(BarLayout::Vertical.resolve(&many), BarLayout::Vertical);
    }

    #[test]
    fn test_rotation_rule() {
        assert!(!needs_rotation(&labels(&["White", "Black"])));
        assert!(needs_rotation(&labels(&["White", "Native American"])));
    }

    #[test]
    fn test_gradient_fades_towards_white() {
        let palette = Palette::Gradient(RGBColor(200, 0, 0));
        let first = palette.color(0, 5);
        let last = palette.color(4, 5);
        assert_eq!(first, RGBColor(200, 0, 0));
        assert!(last.1 > first.1 && last.0 >= first.0);
        assert_eq!(Palette::Categorical.color(10, 12), PALETTE[0]);
        assert_eq!(Palette::Fixed(&[RED, GREEN]).color(3, 4), GREEN);
    }

    #[test]
    fn test_pixel_size_and_file_name() {
        let spec = ChartSpec {
            ordinal: 4,
            name: "age_distribution",
            title: "",
            x_desc: "",
            y_desc: "",
            style: ChartStyle::Bars(BarLayout::Vertical),
            palette: Palette::Categorical,
            series_colors: &[],
            figure: (14.0, 6.0),
            show_percent: false,
            label_every: 1,
        };
        assert_eq!(spec.file_name(), "04_age_distribution.png");
        assert_eq!(spec.pixel_size(300), (4200, 1800));
        assert_eq!(spec.pixel_size(72), (1008, 432));
    }
}
