use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tori")]
#[command(about = "Keeps a folder catalog in sync and republishes it as a datablock", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Store a first snapshot of every folder under the root
    Snapshot,
    /// Compare the snapshot with the disk, update it and rebuild the datablock
    Sync,
    /// Print the published datablock as JSON if it is newer than --since
    Fetch {
        /// Timestamp of the client's copy (RFC 3339)
        #[arg(long)]
        since: Option<String>,
    },
    /// Save the published datablock as readable text
    Dump {
        /// Output file
        output: String,
    },
    /// Remove every folder and file row from the database
    ResetDb,
    /// Print configuration values
    PrintConfig,
}
