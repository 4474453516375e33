//! Static Chart Renderer
//! Draws aggregate views with plotters into an in-memory RGB buffer and saves
//! the result as a PNG.
//!
//! Every chart shares the same frame:
//! 1. Bold title centered on top
//! 2. Category axis with one slot per entry (labels rotated when long)
//! 3. Value axis with light dashed gridlines at nice steps
//! 4. Bars or area, annotated with counts and optional percentages

use crate::aggregate::{AggregateView, CrossTab};
use crate::charts::plotter::{
    dashed_segments, estimate_text_width, format_count, grid_ticks, needs_rotation,
    value_axis_max, BarLayout, ChartData, ChartSpec, ChartStyle, GRID, PALETTE,
};
use image::{ImageFormat, RgbImage};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing error: {0}")]
    Drawing(String),
    #[error("Pixel buffer does not match the image size")]
    Buffer,
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Chart {chart} cannot draw this kind of data")]
    Mismatch { chart: String },
}

fn drawing<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Drawing(e.to_string())
}

type Area<'b> = DrawingArea<BitMapBackend<'b>, Shift>;
type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Half the width of a bar slot taken by the bar itself.
const BAR_HALF_WIDTH: f64 = 0.4;

/// Point sizes converted to pixels for one DPI.
struct Fonts {
    scale: f64,
}

impl Fonts {
    fn new(dpi: u32) -> Self {
        Self {
            scale: dpi as f64 / 72.0,
        }
    }

    fn px(&self, points: f64) -> f64 {
        points * self.scale
    }

    fn title(&self) -> FontDesc<'static> {
        FontDesc::new(FontFamily::SansSerif, self.px(16.0), FontStyle::Bold)
    }

    fn axis(&self) -> FontDesc<'static> {
        FontDesc::new(FontFamily::SansSerif, self.px(12.0), FontStyle::Normal)
    }

    fn tick(&self) -> FontDesc<'static> {
        FontDesc::new(FontFamily::SansSerif, self.px(10.0), FontStyle::Normal)
    }

    fn annotation(&self) -> FontDesc<'static> {
        FontDesc::new(FontFamily::SansSerif, self.px(9.0), FontStyle::Bold)
    }

    fn margin(&self) -> u32 {
        self.px(12.0) as u32
    }

    fn line(&self) -> u32 {
        self.px(1.5).max(1.0) as u32
    }
}

fn count_label(value: f64) -> String {
    format_count(value.max(0.0).round() as usize)
}

fn percent_label(value: f64) -> String {
    format!("{value:.0}%")
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render `data` as described by `spec` into a PNG at `path`, replacing
    /// any existing file.
    pub fn render(
        spec: &ChartSpec,
        data: &ChartData,
        path: &Path,
        dpi: u32,
    ) -> Result<(), RenderError> {
        let (width, height) = spec.pixel_size(dpi);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(drawing)?;
            let fonts = Fonts::new(dpi);

            match (spec.style, data) {
                (ChartStyle::Bars(layout), ChartData::Series(view)) => {
                    match layout.resolve(&view.labels()) {
                        BarLayout::Horizontal => {
                            Self::draw_horizontal_bars(&root, spec, view, &fonts)?
                        }
                        _ => Self::draw_vertical_bars(&root, spec, view, &fonts)?,
                    }
                }
                (ChartStyle::Area, ChartData::Series(view)) => {
                    Self::draw_area(&root, spec, view, &fonts)?
                }
                (ChartStyle::StackedPercent, ChartData::Table(tab)) => {
                    Self::draw_stacked(&root, spec, tab, &fonts, true)?
                }
                (ChartStyle::StackedCounts, ChartData::Table(tab)) => {
                    Self::draw_stacked(&root, spec, tab, &fonts, false)?
                }
                _ => {
                    return Err(RenderError::Mismatch {
                        chart: spec.file_stem(),
                    })
                }
            }

            root.present().map_err(drawing)?;
        }

        let image = RgbImage::from_raw(width, height, buffer).ok_or(RenderError::Buffer)?;
        image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    /// Frame for charts with categories along x: mesh, dashed gridlines and
    /// category labels. Category `i` sits at `x = i`.
    fn column_chart<'a, 'b>(
        root: &'a Area<'b>,
        spec: &ChartSpec,
        fonts: &Fonts,
        labels: &[String],
        axis_max: f64,
        value_label: fn(f64) -> String,
    ) -> Result<Chart<'a, 'b>, RenderError> {
        let n = labels.len();
        let every = spec.label_every.max(1);
        let shown: Vec<&String> = labels.iter().step_by(every).collect();
        let rotate = needs_rotation(labels);

        let tick_px = fonts.px(10.0) as u32;
        let label_band = if rotate {
            shown
                .iter()
                .map(|l| estimate_text_width(l, tick_px))
                .max()
                .unwrap_or(0)
                + tick_px
        } else {
            tick_px * 2
        };
        let desc_band = fonts.px(12.0 * 1.8) as u32;
        let y_band = estimate_text_width(&value_label(axis_max), tick_px) + desc_band + tick_px;

        let mut chart = ChartBuilder::on(root)
            .caption(spec.title, fonts.title())
            .margin(fonts.margin())
            .x_label_area_size(label_band + desc_band)
            .y_label_area_size(y_band)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..axis_max)
            .map_err(drawing)?;

        let y_formatter = |v: &f64| value_label(*v);
        chart
            .configure_mesh()
            .disable_mesh()
            .label_style(fonts.tick())
            .x_label_formatter(&|_| String::new())
            .set_tick_mark_size(LabelAreaPosition::Bottom, 0)
            .y_label_formatter(&y_formatter)
            .x_desc(spec.x_desc)
            .y_desc(spec.y_desc)
            .axis_desc_style(fonts.axis())
            .draw()
            .map_err(drawing)?;

        let plot_width = chart.plotting_area().dim_in_pixel().0 as f64;
        let dashes = (plot_width / fonts.px(6.0)).max(1.0) as usize;
        let line = fonts.line();
        for tick in grid_ticks(axis_max) {
            chart
                .draw_series(
                    dashed_segments(-0.5, n as f64 - 0.5, dashes)
                        .into_iter()
                        .map(|(a, b)| {
                            PathElement::new(vec![(a, tick), (b, tick)], GRID.stroke_width(line))
                        }),
                )
                .map_err(drawing)?;
        }

        let gap = fonts.px(4.0) as i32;
        for (i, label) in labels.iter().enumerate().step_by(every) {
            let (x, y) = chart.backend_coord(&(i as f64, 0.0));
            let style = if rotate {
                fonts
                    .tick()
                    .transform(FontTransform::Rotate90)
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Left, VPos::Center))
            } else {
                fonts.tick().color(&BLACK).pos(Pos::new(HPos::Center, VPos::Top))
            };
            root.draw(&Text::new(label.clone(), (x, y + gap), style))
                .map_err(drawing)?;
        }

        Ok(chart)
    }

    fn draw_vertical_bars(
        root: &Area,
        spec: &ChartSpec,
        view: &AggregateView,
        fonts: &Fonts,
    ) -> Result<(), RenderError> {
        let labels = view.labels();
        let n = labels.len();
        let axis_max = value_axis_max(view.max_count() as f64);
        let mut chart = Self::column_chart(root, spec, fonts, &labels, axis_max, count_label)?;

        chart
            .draw_series(view.entries.iter().enumerate().map(|(i, entry)| {
                let x = i as f64;
                Rectangle::new(
                    [(x - BAR_HALF_WIDTH, 0.0), (x + BAR_HALF_WIDTH, entry.count as f64)],
                    spec.palette.color(i, n).filled(),
                )
            }))
            .map_err(drawing)?;

        let lift = axis_max * 0.01;
        chart
            .draw_series(view.entries.iter().enumerate().map(|(i, entry)| {
                let text = if spec.show_percent {
                    format!(
                        "{} ({:.1}%)",
                        format_count(entry.count),
                        view.percentage(entry.count)
                    )
                } else {
                    format_count(entry.count)
                };
                Text::new(
                    text,
                    (i as f64, entry.count as f64 + lift),
                    fonts
                        .annotation()
                        .color(&BLACK)
                        .pos(Pos::new(HPos::Center, VPos::Bottom)),
                )
            }))
            .map_err(drawing)?;

        Ok(())
    }

    /// Largest entry on top.
    fn draw_horizontal_bars(
        root: &Area,
        spec: &ChartSpec,
        view: &AggregateView,
        fonts: &Fonts,
    ) -> Result<(), RenderError> {
        let labels = view.labels();
        let n = labels.len();
        let slot = |i: usize| (n - 1 - i) as f64;
        let axis_max = value_axis_max(view.max_count() as f64 * 1.2);

        let tick_px = fonts.px(10.0) as u32;
        let desc_band = fonts.px(12.0 * 1.8) as u32;
        let label_band = labels
            .iter()
            .map(|l| estimate_text_width(l, tick_px))
            .max()
            .unwrap_or(0)
            + tick_px;

        let mut chart = ChartBuilder::on(root)
            .caption(spec.title, fonts.title())
            .margin(fonts.margin())
            .x_label_area_size(tick_px * 2 + desc_band)
            .y_label_area_size(label_band + desc_band)
            .build_cartesian_2d(0f64..axis_max, -0.5f64..(n as f64 - 0.5))
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .label_style(fonts.tick())
            .x_label_formatter(&|v| count_label(*v))
            .y_label_formatter(&|_| String::new())
            .set_tick_mark_size(LabelAreaPosition::Left, 0)
            .x_desc(spec.x_desc)
            .y_desc(spec.y_desc)
            .axis_desc_style(fonts.axis())
            .draw()
            .map_err(drawing)?;

        let plot_height = chart.plotting_area().dim_in_pixel().1 as f64;
        let dashes = (plot_height / fonts.px(6.0)).max(1.0) as usize;
        let line = fonts.line();
        for tick in grid_ticks(axis_max) {
            chart
                .draw_series(
                    dashed_segments(-0.5, n as f64 - 0.5, dashes)
                        .into_iter()
                        .map(|(a, b)| {
                            PathElement::new(vec![(tick, a), (tick, b)], GRID.stroke_width(line))
                        }),
                )
                .map_err(drawing)?;
        }

        chart
            .draw_series(view.entries.iter().enumerate().map(|(i, entry)| {
                let y = slot(i);
                Rectangle::new(
                    [(0.0, y - BAR_HALF_WIDTH), (entry.count as f64, y + BAR_HALF_WIDTH)],
                    spec.palette.color(i, n).filled(),
                )
            }))
            .map_err(drawing)?;

        let nudge = axis_max * 0.005;
        chart
            .draw_series(view.entries.iter().enumerate().map(|(i, entry)| {
                let text = if spec.show_percent {
                    format!(
                        "{} ({:.1}%)",
                        format_count(entry.count),
                        view.percentage(entry.count)
                    )
                } else {
                    format_count(entry.count)
                };
                Text::new(
                    text,
                    (entry.count as f64 + nudge, slot(i)),
                    fonts
                        .annotation()
                        .color(&BLACK)
                        .pos(Pos::new(HPos::Left, VPos::Center)),
                )
            }))
            .map_err(drawing)?;

        let gap = fonts.px(4.0) as i32;
        for (i, label) in labels.iter().enumerate() {
            let (x, y) = chart.backend_coord(&(0.0, slot(i)));
            root.draw(&Text::new(
                label.clone(),
                (x - gap, y),
                fonts.tick().color(&BLACK).pos(Pos::new(HPos::Right, VPos::Center)),
            ))
            .map_err(drawing)?;
        }

        Ok(())
    }

    fn draw_area(
        root: &Area,
        spec: &ChartSpec,
        view: &AggregateView,
        fonts: &Fonts,
    ) -> Result<(), RenderError> {
        let labels = view.labels();
        let axis_max = value_axis_max(view.max_count() as f64);
        let mut chart = Self::column_chart(root, spec, fonts, &labels, axis_max, count_label)?;
        let color = spec.palette.color(0, 1);

        chart
            .draw_series(
                AreaSeries::new(
                    view.entries
                        .iter()
                        .enumerate()
                        .map(|(i, entry)| (i as f64, entry.count as f64)),
                    0.0,
                    color.mix(0.3).filled(),
                )
                .border_style(color.stroke_width(fonts.px(2.5) as u32)),
            )
            .map_err(drawing)?;

        Ok(())
    }

    /// One bar per row, split by column. `percent` stacks row percentages up
    /// to 100; otherwise counts are stacked and each segment is annotated
    /// with its row share.
    fn draw_stacked(
        root: &Area,
        spec: &ChartSpec,
        tab: &CrossTab,
        fonts: &Fonts,
        percent: bool,
    ) -> Result<(), RenderError> {
        let rows = tab.rows();
        let axis_max = if percent {
            value_axis_max(100.0)
        } else {
            value_axis_max(tab.max_row_total() as f64)
        };
        let value_label = if percent { percent_label } else { count_label };
        let mut chart = Self::column_chart(root, spec, fonts, rows, axis_max, value_label)?;

        let heights: Vec<Vec<f64>> = (0..rows.len())
            .map(|r| {
                if percent {
                    tab.row_percentages(r)
                } else {
                    tab.row_counts(r).iter().map(|&c| c as f64).collect()
                }
            })
            .collect();
        let bottoms: Vec<Vec<f64>> = heights
            .iter()
            .map(|row| {
                row.iter()
                    .scan(0.0, |acc, h| {
                        let bottom = *acc;
                        *acc += h;
                        Some(bottom)
                    })
                    .collect()
            })
            .collect();

        let swatch = fonts.px(4.0) as i32;
        for (c, column) in tab.columns().iter().enumerate() {
            let color = spec
                .series_colors
                .get(c)
                .copied()
                .unwrap_or(PALETTE[c % PALETTE.len()]);
            chart
                .draw_series((0..rows.len()).map(|r| {
                    let half = BAR_HALF_WIDTH * 0.75;
                    let bottom = bottoms[r][c];
                    Rectangle::new(
                        [(r as f64 - half, bottom), (r as f64 + half, bottom + heights[r][c])],
                        color.filled(),
                    )
                }))
                .map_err(drawing)?
                .label(column.clone())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - swatch), (x + swatch * 2, y + swatch)], color.filled())
                });
        }

        if !percent {
            let shares: Vec<Vec<f64>> =
                (0..rows.len()).map(|r| tab.row_percentages(r)).collect();
            for (c, _) in tab.columns().iter().enumerate() {
                chart
                    .draw_series(
                        (0..rows.len())
                            .filter(|&r| heights[r][c] > 0.0)
                            .map(|r| {
                                Text::new(
                                    format!("{:.1}%", shares[r][c]),
                                    (r as f64, bottoms[r][c] + heights[r][c] / 2.0),
                                    fonts
                                        .annotation()
                                        .color(&BLACK)
                                        .pos(Pos::new(HPos::Center, VPos::Center)),
                                )
                            }),
                    )
                    .map_err(drawing)?;
            }

            let lift = axis_max * 0.01;
            chart
                .draw_series((0..rows.len()).map(|r| {
                    Text::new(
                        format_count(tab.row_total(r)),
                        (r as f64, tab.row_total(r) as f64 + lift),
                        fonts
                            .annotation()
                            .color(&BLACK)
                            .pos(Pos::new(HPos::Center, VPos::Bottom)),
                    )
                }))
                .map_err(drawing)?;
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK.mix(0.3))
            .label_font(fonts.tick())
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .map_err(drawing)?;

        Ok(())
    }
}

/// Whether plotters can load a sans-serif system font for chart text.
#[cfg(test)]
pub fn system_font_available() -> bool {
    FontDesc::new(FontFamily::SansSerif, 12.0, FontStyle::Normal)
        .box_size("Ag")
        .is_ok()
}
