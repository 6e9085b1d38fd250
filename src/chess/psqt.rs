use crate::cfor;
use crate::chess::{
    piece::Piece,
    score::{piece_value, S},
    types::Square,
};

// Piece-square bonuses from White's point of view. Ranks run 1..8; files are
// explicit for A to D and mirrored for E to H, except for pawns, whose table
// is full-width (pawn play is not left/right symmetric).
#[rustfmt::skip]
const BONUS: [[[S; 4]; 8]; 6] = [
    // Pawn (unused, see P_BONUS)
    [[S(0, 0); 4]; 8],
    [
        // Knight
        [S(-80, -48), S(-35, -32), S(-25, -24), S(-18, -10)],
        [S(-32, -34), S(-18, -26), S(-6, -9),  S(3, 4)],
        [S(-24, -20), S(-7, -13),  S(8, -4),   S(14, 14)],
        [S(-14, -17), S(6, -1),    S(22, 8),   S(27, 16)],
        [S(-12, -22), S(8, -8),    S(24, 6),   S(28, 20)],
        [S(-6, -26),  S(12, -20),  S(28, -8),  S(30, 10)],
        [S(-30, -34), S(-12, -24), S(4, -24),  S(16, 6)],
        [S(-90, -50), S(-38, -42), S(-26, -27), S(-14, -9)],
    ],
    [
        // Bishop
        [S(-22, -23), S(-4, -12), S(-6, -14), S(-10, -5)],
        [S(-8, -15),  S(4, -5),   S(8, -7),   S(1, 0)],
        [S(-4, -7),   S(9, 0),    S(-2, 0),   S(7, 4)],
        [S(-3, -8),   S(5, -2),   S(11, 0),   S(16, 7)],
        [S(-5, -7),   S(12, 0),   S(9, -6),   S(13, 6)],
        [S(-7, -12),  S(2, 2),    S(1, 1),    S(5, 2)],
        [S(-8, -13),  S(-6, -8),  S(2, 0),    S(0, 0)],
        [S(-20, -19), S(0, -17),  S(-6, -15), S(-10, -10)],
    ],
    [
        // Rook
        [S(-16, -5), S(-10, -7), S(-7, -5),  S(-2, -5)],
        [S(-11, -6), S(-7, -5),  S(-4, 0),   S(3, -1)],
        [S(-13, 3),  S(-6, -4),  S(0, -1),   S(1, -3)],
        [S(-7, -3),  S(-2, 0),   S(-2, -5),  S(-3, 4)],
        [S(-14, -2), S(-8, 4),   S(-2, 4),   S(1, -3)],
        [S(-11, 3),  S(-1, 0),   S(3, -4),   S(6, 5)],
        [S(-1, 2),   S(6, 2),    S(8, 10),   S(9, -2)],
        [S(-9, 9),   S(-10, 0),  S(0, 10),   S(4, 7)],
    ],
    [
        // Queen
        [S(2, -35), S(-2, -28), S(-2, -24), S(2, -13)],
        [S(-1, -27), S(3, -16),  S(4, -11),  S(6, -2)],
        [S(-1, -20), S(3, -9),   S(6, -4),   S(4, 2)],
        [S(2, -12),  S(3, -2),   S(5, 6),    S(4, 12)],
        [S(0, -14),  S(7, -3),   S(6, 4),    S(3, 10)],
        [S(-2, -19), S(5, -9),   S(3, -5),   S(4, 0)],
        [S(-2, -25), S(3, -14),  S(5, -12),  S(4, -4)],
        [S(-1, -37), S(-1, -26), S(0, -22),  S(-1, -17)],
    ],
    [
        // King
        [S(136, 0),  S(163, 22), S(136, 43), S(99, 38)],
        [S(139, 27), S(152, 50), S(117, 67), S(90, 68)],
        [S(98, 44),  S(129, 65), S(85, 85),  S(60, 88)],
        [S(82, 52),  S(95, 78),  S(69, 86),  S(49, 86)],
        [S(77, 48),  S(90, 83),  S(52, 99),  S(35, 99)],
        [S(62, 46),  S(73, 86),  S(40, 92),  S(16, 96)],
        [S(44, 24),  S(60, 60),  S(32, 58),  S(17, 65)],
        [S(30, 5),   S(45, 30),  S(22, 36),  S(0, 39)],
    ],
];

#[rustfmt::skip]
const P_BONUS: [[S; 8]; 8] = [
    // Pawn (asymmetric distribution)
    [S(0, 0); 8],
    [S(-5, -2),  S(7, -1),  S(12, 4),  S(14, 6),  S(14, 9),  S(12, 4),  S(7, -1),  S(-5, -2)],
    [S(-7, -3),  S(2, -2),  S(10, 2),  S(18, 4),  S(18, 8),  S(10, 2),  S(2, -2),  S(-7, -3)],
    [S(-8, 2),   S(0, 1),   S(8, 4),   S(24, 8),  S(24, 8),  S(8, 4),   S(0, 1),   S(-8, 2)],
    [S(-5, 8),   S(3, 6),   S(6, 9),   S(15, 13), S(15, 13), S(6, 9),   S(3, 6),   S(-5, 8)],
    [S(-3, 16),  S(5, 14),  S(8, 16),  S(10, 20), S(10, 20), S(8, 16),  S(5, 14),  S(-3, 16)],
    [S(-2, 28),  S(6, 26),  S(9, 28),  S(11, 32), S(11, 32), S(9, 28),  S(6, 26),  S(-2, 28)],
    [S(0, 0); 8],
];

const fn white_entry(piece_index: usize, sq: usize) -> S {
    let rank = sq / 8;
    let file = sq % 8;
    let bonus = if piece_index == 0 {
        P_BONUS[rank][file]
    } else {
        let mirrored = if file < 4 { file } else { 7 - file };
        BONUS[piece_index][rank][mirrored]
    };
    // SAFETY: piece_index is within `0..6`.
    let value = piece_value(unsafe { std::mem::transmute(piece_index as u8) });
    S(value.0 + bonus.0, value.1 + bonus.1)
}

const fn init_psqt() -> [[S; 64]; 12] {
    let mut table = [[S::NULL; 64]; 12];
    cfor!(let mut piece_index = 0; piece_index < 6; piece_index += 1; {
        cfor!(let mut sq = 0; sq < 64; sq += 1; {
            let entry = white_entry(piece_index, sq);
            // White pieces sit at even indices, black at odd; the black half
            // is the vertical flip of the white half with the sign inverted,
            // since the score is always from White's point of view.
            table[piece_index * 2][sq] = entry;
            table[piece_index * 2 + 1][sq ^ 0b11_1000] = S(-entry.0, -entry.1);
        });
    });
    table
}

static PSQT: [[S; 64]; 12] = init_psqt();

/// The tapered piece-square score for `piece` on `sq`, material included,
/// from White's point of view.
pub fn psq(piece: Piece, sq: Square) -> S {
    PSQT[piece][sq]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::piece::{Colour, PieceType};

    #[test]
    fn black_is_flipped_negated_white() {
        for piece_type in PieceType::all() {
            let white = Piece::new(Colour::White, piece_type);
            let black = Piece::new(Colour::Black, piece_type);
            for sq in Square::all() {
                assert_eq!(psq(black, sq), -psq(white, sq.flip_rank()));
            }
        }
    }

    #[test]
    fn entries_include_material() {
        let corner = psq(Piece::WQ, Square::A1);
        assert!(corner.mg() > 900, "queen entries should carry the queen's value");
        assert_eq!(psq(Piece::WP, Square::A1).mg(), 100, "pawn table rank 1 is empty");
    }
}
