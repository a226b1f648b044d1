use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumString,
};

/// How the report is written to stdout.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// One line per virtual machine and value series.
    #[default]
    Text,
    /// A table with one row per virtual machine, including failures.
    Table,
}
