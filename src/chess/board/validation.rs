//! Consistency audit over every redundant representation the board keeps.
//!
//! Debug builds run this before and after each make/unmake; release callers
//! can invoke it explicitly as a diagnostic. It is a diagnostic gate, not a
//! runtime check.

use crate::{
    chess::{
        board::Board,
        piece::{Colour, Piece, PieceType},
        squareset::SquareSet,
        types::{CastlingRights, CastlingSide, Rank, Square},
    },
    errors::PositionValidityError,
};

impl Board {
    #[allow(clippy::too_many_lines)]
    pub fn check_validity(&self) -> Result<(), PositionValidityError> {
        let us = self.side_to_move();
        let them = !us;

        // kings
        for colour in Colour::all() {
            let king = Piece::new(colour, PieceType::King);
            let count = self.pieces_cp(colour, PieceType::King).count();
            if count != 1 {
                return Err(format!("{colour} king count is {count}, expected 1"));
            }
            if self.piece_on(self.king_sq(colour)) != Some(king) {
                return Err(format!(
                    "{colour} king square holds {:?}",
                    self.piece_on(self.king_sq(colour))
                ));
            }
        }

        // the side not to move may not be left in check
        if (self.attackers_to(self.king_sq(them)) & self.pieces_c(us)).non_empty() {
            return Err(format!("{them} king is capturable with {us} to move"));
        }

        // checkers
        let expected_checkers = self.attackers_to(self.king_sq(us)) & self.pieces_c(them);
        if self.checkers() != expected_checkers {
            return Err(format!(
                "checkers {:x} do not match recomputation {:x}",
                self.checkers().inner(),
                expected_checkers.inner()
            ));
        }
        if self.checkers().count() > 2 {
            return Err(format!("{} pieces give check at once", self.checkers().count()));
        }

        // square-set algebra
        if (self.pieces_c(Colour::White) & self.pieces_c(Colour::Black)).non_empty() {
            return Err("colour square-sets intersect".to_string());
        }
        let mut union = SquareSet::EMPTY;
        for pt in PieceType::all() {
            for other in PieceType::all().filter(|&other| other > pt) {
                if (self.pieces_pt(pt) & self.pieces_pt(other)).non_empty() {
                    return Err(format!("{pt:?} and {other:?} square-sets intersect"));
                }
            }
            union |= self.pieces_pt(pt);
        }
        if union != self.pieces() {
            return Err("type square-sets do not union to the occupancy".to_string());
        }

        // mailbox agreement
        for sq in Square::all() {
            let piece = self.piece_on(sq);
            let in_sets = piece.is_some_and(|p| self.pieces_cp(p.colour(), p.piece_type()).contains_square(sq));
            match piece {
                Some(_) if !in_sets => {
                    return Err(format!("mailbox and square-sets disagree on {sq}"));
                }
                None if self.pieces().contains_square(sq) => {
                    return Err(format!("square {sq} is occupied but the mailbox is empty"));
                }
                _ => (),
            }
        }

        // pawns
        if (self.pieces_pt(PieceType::Pawn) & SquareSet::BACK_RANKS).non_empty() {
            return Err("pawns on a back rank".to_string());
        }
        for colour in Colour::all() {
            if self.piece_count(colour, PieceType::Pawn) > 8 {
                return Err(format!("{colour} has more than eight pawns"));
            }
        }

        // en passant square rank
        if let Some(ep) = self.ep_square() {
            if ep.relative_rank(us) != Rank::Six {
                return Err(format!("en passant square {ep} on the wrong rank"));
            }
        }

        if self.rule50() < 0 || self.rule50() > 100 {
            return Err(format!("fifty-move counter is {}", self.rule50()));
        }

        // incremental values against from-scratch recomputation
        if self.key() != self.compute_key() {
            return Err("hash key diverged from recomputation".to_string());
        }
        if self.pawn_key() != self.compute_pawn_key() {
            return Err("pawn hash key diverged from recomputation".to_string());
        }
        if self.material_key() != self.compute_material_key() {
            return Err("material hash key diverged from recomputation".to_string());
        }
        if self.psq_score() != self.compute_psq_score() {
            return Err("piece-square score diverged from recomputation".to_string());
        }
        for colour in Colour::all() {
            if self.non_pawn_material(colour) != self.compute_non_pawn_material(colour) {
                return Err(format!("{colour} non-pawn material diverged from recomputation"));
            }
        }

        // counts, lists, and the index table
        for colour in Colour::all() {
            for pt in PieceType::all() {
                let piece = Piece::new(colour, pt);
                let count = self.piece_count(colour, pt);
                if u32::from(count) != self.pieces_cp(colour, pt).count() {
                    return Err(format!("count of {piece:?} disagrees with the square-set"));
                }
                for (slot, &sq) in self.piece_list(colour, pt).iter().enumerate() {
                    if self.piece_on(sq) != Some(piece) {
                        return Err(format!("piece list of {piece:?} points at {sq} wrongly"));
                    }
                    if usize::from(self.square_index(sq)) != slot {
                        return Err(format!("square index of {sq} does not point at its slot"));
                    }
                }
            }
        }

        // castling bookkeeping
        for colour in Colour::all() {
            for side in [CastlingSide::King, CastlingSide::Queen] {
                let cr = CastlingRights::make(colour, side);
                if !self.can_castle(cr) {
                    continue;
                }
                let Some(rook_sq) = self.castle_rook_square(colour, side) else {
                    return Err(format!("{colour} {side:?}-side right has no rook square"));
                };
                if self.piece_on(rook_sq) != Some(Piece::new(colour, PieceType::Rook)) {
                    return Err(format!("{colour} castle rook missing from {rook_sq}"));
                }
                if !self.rights_mask(rook_sq).contains(cr) {
                    return Err(format!("rights mask of rook square {rook_sq} lacks the right"));
                }
                if !self.rights_mask(self.king_sq(colour)).contains(cr) {
                    return Err(format!("rights mask of the {colour} king square lacks the right"));
                }
            }
        }

        Ok(())
    }

    fn square_index(&self, sq: Square) -> u8 {
        self.square_index[sq]
    }

    fn rights_mask(&self, sq: Square) -> CastlingRights {
        self.castle_rights_mask[sq]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_is_valid() {
        Board::default().check_validity().unwrap();
    }

    #[test]
    fn valid_after_a_deep_line() {
        let mut board = Board::default();
        for uci in ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "g8f6", "e1g1", "f6e4", "d2d4"] {
            let m = board.parse_uci(uci).unwrap();
            board.make_move(m);
            board.check_validity().unwrap();
        }
    }
}
