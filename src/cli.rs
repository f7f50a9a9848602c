use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Directory containing decoded rooster call WAV files
    #[arg(long, default_value = "calls")]
    pub calls_dir: String,

    /// Tee the mixed output to a wav file
    #[arg(long)]
    pub wav: Option<String>,

    /// List available audio output devices and exit
    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// Play a test tone in each quadrant instead of running the simulation
    #[arg(long, default_value_t = false)]
    pub test: bool,

    /// Stop automatically after this many real seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Seed for the simulation RNG (reproducible runs)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
