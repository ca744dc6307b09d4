use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Estimation service address (host:port), overrides the config file
    #[arg(long)]
    pub server: Option<String>,

    /// Path to the configuration file
    #[arg(long, default_value = "config.json")]
    pub config: String,

    /// Window width in pixels, overrides the config file
    #[arg(long)]
    pub width: Option<usize>,

    /// Window height in pixels, overrides the config file
    #[arg(long)]
    pub height: Option<usize>,

    /// Start calibration immediately instead of waiting for Space
    #[arg(long, default_value_t = false)]
    pub autostart: bool,
}
