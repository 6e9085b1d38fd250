use crate::chess::board::{movegen::MoveList, Board};

/// Counts leaf nodes of the legal move tree to the given depth.
pub fn perft(board: &mut Board, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }

    let pinned = board.pinned_pieces();
    let mut list = MoveList::new();
    board.generate_moves(&mut list);

    if depth == 1 {
        return list.iter().filter(|&&m| board.pl_move_is_legal(m, pinned)).count() as u64;
    }

    let mut count = 0;
    for &m in list.iter() {
        if !board.pl_move_is_legal(m, pinned) {
            continue;
        }
        board.make_move(m);
        count += perft(board, depth - 1);
        board.unmake_move(m);
    }

    count
}

/// Perft with per-root-move subtotals, for tracking down generation bugs.
pub fn divide(board: &mut Board, depth: usize) -> Vec<(String, u64)> {
    assert!(depth > 0, "divide needs at least one ply");
    let chess960 = board.is_chess960();
    let mut out = Vec::new();
    for &m in &board.legal_moves() {
        board.make_move(m);
        let count = perft(board, depth - 1);
        board.unmake_move(m);
        out.push((m.display(chess960).to_string(), count));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect(fen: &str, counts: &[u64]) {
        let mut board = Board::from_fen(fen).unwrap();
        for (depth, &count) in counts.iter().enumerate() {
            assert_eq!(
                perft(&mut board, depth + 1),
                count,
                "perft({}) of {fen}",
                depth + 1
            );
        }
    }

    #[test]
    fn startpos() {
        expect(Board::STARTING_FEN, &[20, 400, 8902, 197_281]);
    }

    #[test]
    fn kiwipete() {
        expect(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            &[48, 2039, 97_862],
        );
    }

    #[test]
    fn endgame_position() {
        expect("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", &[14, 191, 2812, 43_238]);
    }

    #[test]
    fn promotion_position() {
        expect(
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            &[6, 264, 9467],
        );
    }

    #[test]
    fn talkchess_position() {
        expect(
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            &[44, 1486, 62_379],
        );
    }

    #[test]
    fn steven_edwards_position() {
        expect(
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            &[46, 2079, 89_890],
        );
    }

    #[test]
    fn divide_sums_to_perft() {
        let mut board = Board::default();
        let split = divide(&mut board, 3);
        assert_eq!(split.len(), 20);
        let total: u64 = split.iter().map(|(_, n)| n).sum();
        assert_eq!(total, perft(&mut board, 3));
    }
}
