use std::path::PathBuf;

use crate::prelude::*;
use clap::Parser;

mod archive;
mod config;
mod convert;
mod error;
mod pipeline;
mod prelude;
mod regions;
mod server;

#[cfg(test)]
mod fixtures;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Cut multiple-choice exam PDFs into per-question images"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Raster scale factor applied to PDF points
    #[clap(long, env = "EXAMCROP_ZOOM", global = true, default_value = "2.0")]
    zoom: f32,

    /// Width of blank placeholder images, in pixels
    #[clap(long, env = "EXAMCROP_BLANK_WIDTH", global = true, default_value = "800")]
    blank_width: u32,

    /// Height of blank placeholder images, in pixels
    #[clap(long, env = "EXAMCROP_BLANK_HEIGHT", global = true, default_value = "600")]
    blank_height: u32,

    /// Do not pad questions with trailing blank filler slots
    #[clap(long, env = "EXAMCROP_NO_FILLERS", global = true)]
    no_fillers: bool,

    /// Directory the zip archive is written to
    #[clap(long, env = "EXAMCROP_OUTPUT_DIR", global = true, default_value = "output")]
    output_dir: PathBuf,

    /// Directory containing the pdfium shared library
    #[clap(long, env = "PDFIUM_PATH", global = true)]
    pdfium_path: Option<PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "EXAMCROP_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Convert a test PDF and its solutions PDF into a zip of slot images
    Convert(crate::convert::ConvertOptions),

    /// Print the question or solution regions detected in a PDF
    Regions(crate::regions::RegionsOptions),

    /// Serve the browser upload form
    Serve(crate::server::ServeOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();
    let config = config::Config::from_global(&app.global)?;

    match app.command {
        SubCommands::Convert(options) => crate::convert::run(options, &config, &app.global),
        SubCommands::Regions(options) => crate::regions::run(options, &app.global),
        SubCommands::Serve(options) => crate::server::run(options, config, &app.global).await,
    }
}
