#[macro_use]
extern crate tracing;

mod app;
pub mod logging;

pub use app::App;

pub fn init_errors() -> eyre::Result<()> {
    color_eyre::install()
}
