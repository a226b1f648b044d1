use crate::{
    catalog::CounterDescriptor,
    error::GatherError,
    query::{
        MetricSample,
        SeriesValues,
    },
};
use comfy_table::{
    presets,
    Attribute,
    Cell,
    Color,
    ContentArrangement,
    Table,
};
use vsphere_stats_config::OutputFormat;

/// Result of one machine's query-and-extract cycle.
pub type EntityOutcome = Result<MetricSample, GatherError>;

/// Snapshot of one counter across the inventory, in inventory order.
#[derive(Debug)]
pub struct Report {
    pub descriptor: CounterDescriptor,
    pub outcomes: Vec<EntityOutcome>,
}

impl Report {
    pub fn samples(&self) -> impl Iterator<Item = &MetricSample> {
        self.outcomes.iter().filter_map(|outcome| outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &GatherError> {
        self.outcomes.iter().filter_map(|outcome| outcome.as_ref().err())
    }

    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.render_text(),
            OutputFormat::Table => self.render_table(),
        }
    }

    /// One line per machine and series that has values. Failures are not part of the text output.
    fn render_text(&self) -> String {
        let mut out = String::new();
        for sample in self.samples() {
            for series in sample.series.iter().filter(|series| !series.values.is_empty()) {
                out.push_str(&format_line(&self.descriptor, &sample.entity_name, series));
                out.push('\n');
            }
        }
        out
    }

    fn render_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("VM").add_attribute(Attribute::Bold),
                Cell::new(column_title(&self.descriptor)).add_attribute(Attribute::Bold),
                Cell::new("Sampled at").add_attribute(Attribute::Bold),
                Cell::new("Status").add_attribute(Attribute::Bold),
            ]);

        for outcome in &self.outcomes {
            match outcome {
                Ok(sample) if sample.is_empty() => {
                    table.add_row(vec![
                        Cell::new(&sample.entity_name),
                        Cell::new("-"),
                        Cell::new("-"),
                        Cell::new("no data").fg(Color::Yellow),
                    ]);
                }
                Ok(sample) => {
                    let values: Vec<_> = sample.values().map(|value| value.to_string()).collect();
                    let sampled_at = sample
                        .sampled_at
                        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    table.add_row(vec![
                        Cell::new(&sample.entity_name),
                        Cell::new(values.join(", ")),
                        Cell::new(sampled_at),
                        Cell::new("ok").fg(Color::Green),
                    ]);
                }
                Err(err) => {
                    table.add_row(vec![
                        Cell::new(err.entity().unwrap_or("?")),
                        Cell::new("-"),
                        Cell::new("-"),
                        Cell::new(err.to_string()).fg(Color::Red),
                    ]);
                }
            }
        }

        format!("{table}\n")
    }
}

fn column_title(descriptor: &CounterDescriptor) -> String {
    if descriptor.label.is_empty() {
        format!("{} ({})", descriptor.name, descriptor.unit)
    } else {
        format!("{} ({})", descriptor.label, descriptor.unit)
    }
}

/// `VM: web-01, Usage in MHz (megaHertz): 350`. Non-aggregate instances are appended to the name.
pub fn format_line(descriptor: &CounterDescriptor, entity_name: &str, series: &SeriesValues) -> String {
    let values: Vec<_> = series.values.iter().map(|value| value.to_string()).collect();
    let entity = if series.instance.is_empty() {
        entity_name.to_string()
    } else {
        format!("{entity_name} [{}]", series.instance)
    };
    format!("VM: {entity}, {}: {}", column_title(descriptor), values.join(", "))
}
