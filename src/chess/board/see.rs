//! Static exchange evaluation.
//!
//! Estimates the material outcome of a capture sequence on one square,
//! assuming both sides always recapture with their least valuable attacker.

use crate::chess::{
    board::Board,
    chessmove::Move,
    magic::{bishop_attacks, rook_attacks},
    piece::PieceType,
    score::mg_value,
    squareset::SquareSet,
    types::Square,
};

const MAX_SWAPS: usize = 32;

impl Board {
    /// The sign of `see(m)` without the full computation when possible:
    /// if the captured piece is worth at least the mover, the exchange
    /// cannot lose material. King moves always short-circuit here because
    /// the king's midgame value is zero.
    pub fn see_sign(&self, m: Move) -> i32 {
        let captured = self.piece_on(m.to()).map_or(0, |p| mg_value(p.piece_type()));
        let mover = self
            .moved_piece(m)
            .map_or(0, |p| mg_value(p.piece_type()));
        if captured >= mover {
            return 1;
        }
        self.see(m)
    }

    /// Static exchange evaluation of `m`, in midgame material units.
    pub fn see(&self, m: Move) -> i32 {
        let from = m.from();
        let to = m.to();

        let mut captured = self.piece_on(to).map(|p| p.piece_type());
        let mut occupied = self.pieces() ^ from.as_set();

        if m.is_ep() {
            let capsq = to.pawn_push(!self.side_to_move()).unwrap();
            debug_assert!(captured.is_none());
            debug_assert_eq!(
                self.piece_on(capsq).map(|p| p.piece_type()),
                Some(PieceType::Pawn)
            );
            occupied ^= capsq.as_set();
            captured = Some(PieceType::Pawn);
        } else if m.is_castle() {
            // king-captures-rook cannot be exchanged against; zero is exact
            // unless the castled rook ends up hanging, which the caller does
            // not care about here
            return 0;
        }

        // all attackers of the destination, the mover removed, X-ray
        // attackers behind it already visible
        let mut attackers = self.attackers_to_occ(to, occupied) & occupied;

        let mover = self.piece_on(from).unwrap();
        let mut stm = !mover.colour();
        let mut stm_attackers = attackers & self.pieces_c(stm);
        if stm_attackers.is_empty() {
            return captured.map_or(0, mg_value);
        }

        // The destination square is defended. Build the swap list: the
        // running material balance after each capture, sides alternating,
        // each capturing with its least valuable attacker.
        let mut swaps = [0i32; MAX_SWAPS];
        let mut len = 1;
        swaps[0] = captured.map_or(0, mg_value);
        let mut next_victim = mover.piece_type();

        loop {
            debug_assert!(len < MAX_SWAPS);
            swaps[len] = -swaps[len - 1] + mg_value(next_victim);
            len += 1;

            next_victim = self.least_valuable_attacker(
                stm_attackers,
                to,
                &mut occupied,
                &mut attackers,
            );

            attackers &= occupied;
            stm = !stm;
            stm_attackers = attackers & self.pieces_c(stm);

            if next_victim == PieceType::King {
                // a king pseudo-capture loses the king if the other side
                // still has a defender; stop before processing it
                if stm_attackers.non_empty() {
                    swaps[len] = mg_value(PieceType::Queen) * 16;
                    len += 1;
                }
                break;
            }

            if stm_attackers.is_empty() {
                break;
            }
        }

        // negamax-fold the swap list from the tail
        while len > 1 {
            len -= 1;
            swaps[len - 1] = (-swaps[len]).min(swaps[len - 1]);
        }
        swaps[0]
    }

    /// Picks the least valuable piece of `stm_attackers`, removes it from
    /// `occupied`, and reveals any X-ray attacker standing behind it.
    fn least_valuable_attacker(
        &self,
        stm_attackers: SquareSet,
        to: Square,
        occupied: &mut SquareSet,
        attackers: &mut SquareSet,
    ) -> PieceType {
        for pt in [
            PieceType::Pawn,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Rook,
            PieceType::Queen,
            PieceType::King,
        ] {
            let candidates = stm_attackers & self.pieces_pt(pt);
            if candidates.is_empty() {
                continue;
            }
            *occupied ^= candidates.isolate_lsb();

            // a departing pawn, bishop, or queen may unmask a diagonal
            // slider; a rook or queen an orthogonal one
            if matches!(pt, PieceType::Pawn | PieceType::Bishop | PieceType::Queen) {
                *attackers |= bishop_attacks(to, *occupied)
                    & self.pieces_pp(PieceType::Bishop, PieceType::Queen);
            }
            if matches!(pt, PieceType::Rook | PieceType::Queen) {
                *attackers |= rook_attacks(to, *occupied)
                    & self.pieces_pp(PieceType::Rook, PieceType::Queen);
            }

            return pt;
        }

        unreachable!("least_valuable_attacker called with no attackers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::score::{KNIGHT_VALUE, PAWN_VALUE, QUEEN_VALUE, ROOK_VALUE};

    fn see_of(fen: &str, uci: &str) -> i32 {
        let board = Board::from_fen(fen).unwrap();
        let m = board.parse_uci(uci).unwrap();
        board.see(m)
    }

    #[test]
    fn undefended_pawn_is_free() {
        assert_eq!(
            see_of("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"),
            PAWN_VALUE.mg()
        );
    }

    #[test]
    fn defended_pawn_trades_evenly() {
        assert_eq!(see_of("4k3/8/2p5/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"), 0);
    }

    #[test]
    fn knight_takes_defended_pawn_loses() {
        assert_eq!(
            see_of("4k3/8/2p5/3p4/4N3/8/8/4K3 w - - 0 1", "e4d5"),
            PAWN_VALUE.mg() - KNIGHT_VALUE.mg()
        );
    }

    #[test]
    fn queen_takes_defended_pawn_loses_badly() {
        assert_eq!(
            see_of("4k3/8/2p5/3p4/4Q3/8/8/4K3 w - - 0 1", "e4d5"),
            PAWN_VALUE.mg() - QUEEN_VALUE.mg()
        );
    }

    #[test]
    fn xray_recapture_is_counted() {
        // RxR on d8 is met by the second black rook behind it
        let board = Board::from_fen("3rr1k1/8/8/8/8/8/8/3R2K1 w - - 0 1").unwrap();
        let m = board.parse_uci("d1d8").unwrap();
        assert_eq!(board.see(m), 0);
        // with a supporting white rook behind, the exchange wins a rook
        let board = Board::from_fen("3rr1k1/8/8/8/8/8/3R4/3R2K1 w - - 0 1").unwrap();
        let m = board.parse_uci("d2d8").unwrap();
        assert_eq!(board.see(m), ROOK_VALUE.mg());
    }

    #[test]
    fn en_passant_exchange_removes_the_captured_pawn() {
        let board = Board::from_fen("4k3/8/8/4pP2/8/8/8/4K3 w - e6 0 1").unwrap();
        let m = board.parse_uci("f5e6").unwrap();
        assert!(m.is_ep());
        assert_eq!(board.see(m), PAWN_VALUE.mg());
    }

    #[test]
    fn castling_sees_zero() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let m = board.parse_uci("e1g1").unwrap();
        assert_eq!(board.see(m), 0);
    }

    #[test]
    fn see_sign_short_circuits_equal_or_winning_captures() {
        // pawn takes knight: captured >= mover, no full evaluation needed
        let board = Board::from_fen("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let m = board.parse_uci("e4d5").unwrap();
        assert_eq!(board.see_sign(m), 1);

        // queen takes defended pawn: must fall through to the real value
        let board = Board::from_fen("4k3/8/2p5/3p4/4Q3/8/8/4K3 w - - 0 1").unwrap();
        let m = board.parse_uci("e4d5").unwrap();
        assert!(board.see_sign(m) < 0);
    }

    #[test]
    fn winning_captures_have_nonnegative_see() {
        // property from the short-circuit rule, validated against see()
        let board =
            Board::from_fen("r1bqkbnr/ppp2ppp/2np4/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 4")
                .unwrap();
        for &m in &board.legal_moves() {
            let Some(victim) = board.piece_on(m.to()) else {
                continue;
            };
            let mover = board.moved_piece(m).unwrap();
            if mg_value(victim.piece_type()) >= mg_value(mover.piece_type()) {
                assert!(
                    board.see(m) >= 0,
                    "{m:?} captures equal-or-better material but sees negative"
                );
            }
        }
    }

    #[test]
    fn king_recapture_is_cut_off_while_defenders_remain() {
        // exchange on d5: PxP, pxP, and then the white king may not recapture
        // because the d8 rook still covers the square. SEE must settle for
        // the even pawn trade.
        let board = Board::from_fen("3r2k1/8/2p5/3p4/2K1P3/8/8/8 w - - 0 1").unwrap();
        let m = board.parse_uci("e4d5").unwrap();
        assert_eq!(board.see(m), 0);
    }
}
