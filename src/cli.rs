use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub subcommand: Subcommands,
}

#[derive(Subcommand)]
pub enum Subcommands {
    /// Count legal leaf nodes of the move tree to the given depth
    Perft {
        depth: usize,
        /// Position to search, as a FEN string; defaults to the starting position
        #[clap(long)]
        fen: Option<String>,
        /// Read the castling field as Chess960
        #[clap(long)]
        chess960: bool,
        /// Print per-move subtotals
        #[clap(long)]
        divide: bool,
    },
    /// Parse a FEN string, audit the resulting position, and print it back
    Fen {
        fen: String,
        /// Read the castling field as Chess960
        #[clap(long)]
        chess960: bool,
    },
}
