use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "tracklink", version, about = "Vehicle tracking unit")]
pub struct Cli {
    #[arg(short, long, help = "Configuration file (TOML); defaults apply when omitted")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        help = "Answer requests with a local simulated backend instead of the configured server"
    )]
    pub simulate: bool,

    #[arg(
        long = "allow-card",
        value_name = "UID",
        help = "Card the simulated backend authorizes (repeatable)"
    )]
    pub allowed_cards: Vec<String>,

    #[arg(long, help = "Start the simulated receiver without a fix")]
    pub no_fix: bool,

    #[cfg(feature = "hardware-serial")]
    #[arg(long, value_name = "PATH", help = "Serial port of the card reader bridge")]
    pub card_port: Option<String>,

    #[cfg(feature = "hardware-serial")]
    #[arg(long, value_name = "PATH", help = "Serial port of the audio module")]
    pub audio_port: Option<String>,

    #[arg(long, help = "Validate the configuration, print it and exit")]
    pub check_config: bool,
}
