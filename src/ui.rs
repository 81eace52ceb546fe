pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget},
};

use crate::fit::{FitResult, TrajectoryFit};
use crate::time_series::TimeSeriesPoint;
use charting::{compute_chart_bounds, format_label};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;
const CURVE_SAMPLES: usize = 120;

/// Text summary of a fit, one fact per line
pub fn summary_lines(fit: &TrajectoryFit) -> Vec<String> {
    vec![
        format!("Fit: {}", fit.x_fit.equation("x")),
        format!("Fit: {}", fit.y_fit.equation("y")),
        stats_line(fit),
    ]
}

pub fn stats_line(fit: &TrajectoryFit) -> String {
    format!(
        "vx = {:.2} m/s   ay = {:.2} m/s^2   scale = {:.4} m/px   points = {}",
        fit.horizontal_velocity(),
        fit.vertical_acceleration(),
        fit.meters_per_pixel,
        fit.track.times.len()
    )
}

/// Two stacked charts: x(t) with its line fit and y(t) with its parabola
pub struct PlotView<'a> {
    fit: &'a TrajectoryFit,
}

impl<'a> PlotView<'a> {
    pub fn new(fit: &'a TrajectoryFit) -> Self {
        Self { fit }
    }
}

impl Widget for &PlotView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let bold_style = Style::default().add_modifier(Modifier::BOLD);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Min(6),
                Constraint::Min(6),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        let x_data = tuples(&self.fit.track.x_series());
        render_axis_chart(
            AxisChart {
                title: "X Position vs Time",
                value_title: "x (m)",
                fit: &self.fit.x_fit,
                label: self.fit.x_fit.equation("x"),
                data_color: Color::Blue,
                fit_color: Color::LightYellow,
            },
            &x_data,
            chunks[0],
            buf,
        );

        let y_data = tuples(&self.fit.track.y_series());
        render_axis_chart(
            AxisChart {
                title: "Y Position vs Time",
                value_title: "y (m)",
                fit: &self.fit.y_fit,
                label: self.fit.y_fit.equation("y"),
                data_color: Color::Red,
                fit_color: Color::Green,
            },
            &y_data,
            chunks[1],
            buf,
        );

        let stats = Paragraph::new(Span::styled(stats_line(self.fit), bold_style))
            .alignment(Alignment::Center);
        stats.render(chunks[2], buf);

        let legend = Paragraph::new(Line::from(Span::styled("(q)uit / (esc)ape", italic_style)));
        legend.render(chunks[3], buf);
    }
}

struct AxisChart<'a> {
    title: &'a str,
    value_title: &'a str,
    fit: &'a FitResult,
    label: String,
    data_color: Color,
    fit_color: Color,
}

fn render_axis_chart(chart: AxisChart<'_>, data: &[(f64, f64)], area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let curve = tuples(&chart.fit.sampled(CURVE_SAMPLES));
    let (t_bounds, v_bounds) = compute_chart_bounds(&[data, curve.as_slice()]);

    let datasets = vec![
        Dataset::default()
            .name("data")
            .marker(Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(chart.data_color))
            .data(data),
        Dataset::default()
            .name(chart.label)
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(chart.fit_color))
            .data(&curve),
    ];

    Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(chart.title))
        .x_axis(
            Axis::default()
                .title("time (s)")
                .bounds(t_bounds)
                .labels(vec![
                    Span::styled(format_label(t_bounds[0]), bold_style),
                    Span::styled(format_label(t_bounds[1]), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(chart.value_title)
                .bounds(v_bounds)
                .labels(vec![
                    Span::styled(format_label(v_bounds[0]), bold_style),
                    Span::styled(format_label(v_bounds[1]), bold_style),
                ]),
        )
        .render(area, buf);
}

fn tuples(series: &[TimeSeriesPoint]) -> Vec<(f64, f64)> {
    series.iter().map(|&p| p.into()).collect()
}
