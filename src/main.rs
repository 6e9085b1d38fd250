mod cli;

use anyhow::Context;
use clap::Parser;

use carnelian::{
    chess::board::Board,
    perft::{divide, perft},
};

use cli::{Cli, Subcommands};

fn load(fen: Option<&str>, chess960: bool) -> anyhow::Result<Board> {
    let fen = fen.unwrap_or(Board::STARTING_FEN);
    let board = if chess960 {
        Board::from_fen_960(fen)
    } else {
        Board::from_fen(fen)
    };
    board.with_context(|| format!("failed to parse FEN {fen:?}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.subcommand {
        Subcommands::Perft {
            depth,
            fen,
            chess960,
            divide: split,
        } => {
            let mut board = load(fen.as_deref(), chess960)?;
            if split {
                let mut total = 0;
                for (m, count) in divide(&mut board, depth) {
                    println!("{m}: {count}");
                    total += count;
                }
                println!("total: {total}");
            } else {
                println!("{}", perft(&mut board, depth));
            }
        }
        Subcommands::Fen { fen, chess960 } => {
            let board = load(Some(&fen), chess960)?;
            board
                .check_validity()
                .map_err(|step| anyhow::anyhow!("position audit failed: {step}"))?;
            println!("{board}");
        }
    }

    Ok(())
}
