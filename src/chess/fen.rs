use std::num::NonZeroUsize;

use crate::{
    chess::{
        piece::{Colour, Piece, PieceType},
        squareset::SquareSet,
        types::{CastlingSide, File, Rank, Square},
    },
    errors::FenParseError,
};

/// A parsed FEN record.
///
/// The castling field is resolved to rook origin squares, indexed by colour
/// and castling side, so Chess960 starts carry through without loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    pub board: [Option<Piece>; 64],
    pub turn: Colour,
    pub castling_rooks: [[Option<Square>; 2]; 2],
    pub ep: Option<Square>,
    pub halfmove: i32,
    pub fullmove: NonZeroUsize,
}

impl Fen {
    const DEFAULT_FULL_MOVE: NonZeroUsize = NonZeroUsize::new(1).unwrap();

    /// Parses a FEN string. The board and side fields are required; the
    /// remaining fields default when absent. Castling accepts classical
    /// `KQkq` (resolved by scanning from the outer file toward the king),
    /// Shredder-FEN rook file letters, and X-FEN. Structural breakage is an
    /// error; chess-semantic validation beyond king counts and pawn ranks is
    /// the caller's responsibility.
    pub fn parse(fen: &str) -> Result<Self, FenParseError> {
        let mut tokens = fen.split_whitespace();

        let board_str = tokens.next().ok_or(FenParseError::MissingBoard)?;
        let board = Self::parse_board(board_str)?;

        let turn = match tokens.next() {
            Some("w") => Colour::White,
            Some("b") => Colour::Black,
            Some(s) => return Err(FenParseError::InvalidSide(s.to_string())),
            None => return Err(FenParseError::MissingSide),
        };

        let castling_rooks = match tokens.next() {
            Some(s) => Self::parse_castling(s, &board)?,
            None => [[None; 2]; 2],
        };

        let ep = match tokens.next() {
            Some(s) => Self::parse_ep(s, turn)?,
            None => None,
        };

        let halfmove = match tokens.next() {
            Some(s) => s
                .parse()
                .map_err(|_| FenParseError::InvalidHalfmoveClock(s.to_string()))?,
            None => 0,
        };

        let fullmove = match tokens.next() {
            Some(s) => {
                let value: usize = s
                    .parse()
                    .map_err(|_| FenParseError::InvalidFullmoveNumber(s.to_string()))?;
                // Tolerate the common incorrect "0" by clamping to move one.
                NonZeroUsize::new(value).unwrap_or(Self::DEFAULT_FULL_MOVE)
            }
            None => Self::DEFAULT_FULL_MOVE,
        };

        Ok(Self {
            board,
            turn,
            castling_rooks,
            ep,
            halfmove,
            fullmove,
        })
    }

    fn parse_board(board_str: &str) -> Result<[Option<Piece>; 64], FenParseError> {
        let mut board = [None; 64];

        let ranks: Vec<&str> = board_str.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenParseError::BoardSegments(ranks.len()));
        }

        for (rank_offset, rank_str) in ranks.iter().enumerate() {
            let rank = Rank::from_index(7 - rank_offset as u8).unwrap();
            let mut squares_in_rank = 0u8;
            let mut file = 0u8;
            let mut prev_was_digit = false;

            for c in rank_str.chars() {
                match c {
                    '1'..='8' => {
                        if prev_was_digit {
                            return Err(FenParseError::AdjacentDigits);
                        }
                        prev_was_digit = true;
                        let count = c as u8 - b'0';
                        squares_in_rank += count;
                        if squares_in_rank > 8 {
                            return Err(FenParseError::BadSquaresInSegment);
                        }
                        file += count;
                    }
                    _ => {
                        let piece = Piece::from_char(c)
                            .ok_or(FenParseError::UnexpectedCharacter(c))?;
                        prev_was_digit = false;
                        squares_in_rank += 1;
                        if squares_in_rank > 8 {
                            return Err(FenParseError::BadSquaresInSegment);
                        }
                        let sq = Square::from_rank_file(rank, File::from_index(file).unwrap());
                        board[sq] = Some(piece);
                        file += 1;
                    }
                }
            }

            if squares_in_rank != 8 {
                return Err(FenParseError::BadSquaresInSegment);
            }
        }

        // Structural sanity that is cheap to verify here: pawn ranks and
        // exactly one king per side.
        let mut pawns = SquareSet::EMPTY;
        let mut king_count = [0, 0];
        for sq in Square::all() {
            match board[sq].map(Piece::piece_type) {
                Some(PieceType::Pawn) => pawns |= sq.as_set(),
                Some(PieceType::King) => king_count[board[sq].unwrap().colour()] += 1,
                _ => (),
            }
        }
        if (pawns & SquareSet::BACK_RANKS).non_empty() {
            return Err(FenParseError::PawnsOnBackranks);
        }
        for colour in Colour::all() {
            match king_count[colour] {
                0 => return Err(FenParseError::MissingKing { colour }),
                1 => (),
                _ => return Err(FenParseError::DuplicateKings { colour }),
            }
        }

        Ok(board)
    }

    fn parse_castling(
        s: &str,
        board: &[Option<Piece>; 64],
    ) -> Result<[[Option<Square>; 2]; 2], FenParseError> {
        let mut rooks = [[None; 2]; 2];
        if s == "-" {
            return Ok(rooks);
        }

        let king_file = |colour: Colour| -> File {
            let king = Piece::new(colour, PieceType::King);
            Square::all()
                .find(|&sq| board[sq] == Some(king))
                .map(Square::file)
                .unwrap()
        };

        for c in s.chars() {
            let colour = if c.is_ascii_lowercase() {
                Colour::Black
            } else {
                Colour::White
            };
            let back_rank = Rank::One.relative_to(colour);
            let rook = Piece::new(colour, PieceType::Rook);
            let kf = king_file(colour);

            let rook_sq = match c.to_ascii_uppercase() {
                // Classical letters: the relevant rook is the outermost one,
                // found by scanning from the edge toward the king.
                'K' => (kf.index() + 1..8)
                    .rev()
                    .map(|f| Square::from_rank_file(back_rank, File::from_index(f as u8).unwrap()))
                    .find(|&sq| board[sq] == Some(rook)),
                'Q' => (0..kf.index())
                    .map(|f| Square::from_rank_file(back_rank, File::from_index(f as u8).unwrap()))
                    .find(|&sq| board[sq] == Some(rook)),
                // Shredder / X-FEN: an explicit rook file.
                'A'..='H' => {
                    let file = File::from_index(c.to_ascii_uppercase() as u8 - b'A').unwrap();
                    let sq = Square::from_rank_file(back_rank, file);
                    (board[sq] == Some(rook)).then_some(sq)
                }
                _ => return Err(FenParseError::InvalidCastling(s.to_string())),
            };

            let rook_sq = rook_sq.ok_or(FenParseError::CastlingWithoutRook(c))?;
            let side = if rook_sq.file() > kf {
                CastlingSide::King
            } else {
                CastlingSide::Queen
            };
            rooks[colour][side] = Some(rook_sq);
        }

        Ok(rooks)
    }

    fn parse_ep(s: &str, turn: Colour) -> Result<Option<Square>, FenParseError> {
        if s == "-" {
            return Ok(None);
        }

        let sq: Square = s
            .parse()
            .map_err(|_| FenParseError::InvalidEnPassant(s.to_string()))?;

        // Relative rank six for the side to move; anything else is garbage.
        if sq.relative_rank(turn) != Rank::Six {
            return Err(FenParseError::InvalidEnPassant(s.to_string()));
        }

        Ok(Some(sq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn parse_startpos() {
        let fen = Fen::parse(STARTPOS).unwrap();
        assert_eq!(fen.turn, Colour::White);
        assert_eq!(fen.halfmove, 0);
        assert_eq!(fen.fullmove.get(), 1);
        assert!(fen.ep.is_none());
        assert_eq!(fen.board[Square::E1], Some(Piece::WK));
        assert_eq!(fen.board[Square::D8], Some(Piece::BQ));
        assert_eq!(
            fen.castling_rooks,
            [
                [Some(Square::H1), Some(Square::A1)],
                [Some(Square::H8), Some(Square::A8)],
            ]
        );
    }

    #[test]
    fn classical_letters_find_the_outermost_rook() {
        // Two white rooks on the kingside of the king; 'K' must pick H1.
        let fen = Fen::parse("4k3/8/8/8/8/8/8/4KR1R w K - 0 1").unwrap();
        assert_eq!(fen.castling_rooks[Colour::White][CastlingSide::King], Some(Square::H1));
    }

    #[test]
    fn shredder_letters_are_exact() {
        let fen = Fen::parse("4k3/8/8/8/8/8/8/4KR1R w F - 0 1").unwrap();
        assert_eq!(fen.castling_rooks[Colour::White][CastlingSide::King], Some(Square::F1));
    }

    #[test]
    fn castling_letter_with_no_rook_is_an_error() {
        let err = Fen::parse("4k3/8/8/8/8/8/8/4K3 w K - 0 1").unwrap_err();
        assert_eq!(err, FenParseError::CastlingWithoutRook('K'));
    }

    #[test]
    fn reject_bad_segments() {
        let err = Fen::parse("rnbqkbnr/pppppppp/8/8/8/8").unwrap_err();
        assert_eq!(err, FenParseError::BoardSegments(6));
    }

    #[test]
    fn reject_adjacent_digits() {
        let result = Fen::parse("rnbqkbnr/pppppppp/44/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert!(matches!(result, Err(FenParseError::AdjacentDigits)));
    }

    #[test]
    fn reject_invalid_ep_rank() {
        let result = Fen::parse("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e4 0 1");
        assert!(matches!(result, Err(FenParseError::InvalidEnPassant(_))));
    }

    #[test]
    fn accept_valid_ep_square() {
        let fen =
            Fen::parse("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
        assert_eq!(fen.ep, Some(Square::E3));
    }

    #[test]
    fn missing_kings_are_rejected() {
        let result = Fen::parse("8/8/8/8/8/8/8/8 w - - 0 1");
        assert!(matches!(result, Err(FenParseError::MissingKing { .. })));
    }

    #[test]
    fn fullmove_zero_is_tolerated() {
        let fen = Fen::parse("4k3/8/8/8/8/8/8/4K3 w - - 0 0").unwrap();
        assert_eq!(fen.fullmove.get(), 1);
    }
}
