use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[command(name = "stylecast")]
#[command(about = "Device-bound style transfer worker pool")]
pub struct Cli {
    /// Devices to bind one runner each to (cpu, cuda, cuda:N).
    #[arg(long = "devices", num_args = 1.., default_value = "cuda")]
    pub devices: Vec<String>,

    /// Path to the style configuration document.
    #[arg(long, default_value = "style_config.json")]
    pub config: PathBuf,
}
