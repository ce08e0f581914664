use clap::{Parser, Subcommand};

/// qrpass — unit-scoped access tokens as URLs and QR codes
#[derive(Parser)]
#[command(name = "qrpass", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the token table for a unit if it does not exist
    Init { unit: String },

    /// Issue a token for a unit and write its QR image
    Generate {
        unit: String,
        /// Print the issued token as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up a token within a unit
    Resolve {
        unit: String,
        token: String,
        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },
}
