pub mod movegen;
pub mod see;
pub mod validation;

use std::fmt::{self, Display, Formatter};

use self::movegen::{
    attacks_by_type, king_attacks, knight_attacks, pawn_attacks, MoveList, RAY_BETWEEN, RAY_FULL,
};

use crate::{
    chess::{
        chessmove::Move,
        fen::Fen,
        magic::{bishop_attacks, rook_attacks},
        piece::{Colour, Piece, PieceType},
        piecelist::PieceList,
        psqt,
        score::{mg_value, S},
        squareset::SquareSet,
        types::{CastlingRights, CastlingSide, CheckInfo, File, Rank, Square, State},
    },
    errors::{FenParseError, MoveParseError},
    lookups::{CASTLE_KEYS, EP_KEYS, EXCLUSION_KEY, NO_PAWNS_KEY, PIECE_KEYS, SIDE_KEY},
};

/// A chess position.
///
/// The board is held in several redundant representations at once: a
/// mailbox, per-type and per-colour square sets, piece counts, and per
/// (colour, type) square lists addressed through `square_index`. Every
/// mutation updates all of them in the same primitive; nothing is derived
/// on the fly.
///
/// The position owns its state history as a stack whose top is the current
/// ply. `make_move` pushes a record and `unmake_move` pops it, so a
/// make/unmake pair is balanced on every path by construction. The position
/// is single-thread-owned; there is no interior mutability.
pub struct Board {
    mailbox: [Option<Piece>; 64],
    by_type: [SquareSet; 6],
    by_colour: [SquareSet; 2],
    piece_counts: [[u8; 6]; 2],
    piece_lists: [[PieceList; 6]; 2],
    /// Slot of each occupied square within its piece list. Entries for empty
    /// squares are stale and meaningless.
    square_index: [u8; 64],

    /// Rights extinguished when the piece on this square moves or is captured.
    castle_rights_mask: [CastlingRights; 64],
    castle_rook_square: [[Option<Square>; 2]; 2],
    /// Squares that must be empty for the castle, the king and rook origins
    /// excepted.
    castle_path: [[SquareSet; 2]; 2],

    side: Colour,
    chess960: bool,
    game_ply: usize,
    nodes: u64,
    states: Vec<State>,
}

impl Board {
    pub const STARTING_FEN: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    pub fn new() -> Self {
        Self {
            mailbox: [None; 64],
            by_type: [SquareSet::EMPTY; 6],
            by_colour: [SquareSet::EMPTY; 2],
            piece_counts: [[0; 6]; 2],
            piece_lists: [[PieceList::new(); 6]; 2],
            square_index: [0; 64],
            castle_rights_mask: [CastlingRights::NONE; 64],
            castle_rook_square: [[None; 2]; 2],
            castle_path: [[SquareSet::EMPTY; 2]; 2],
            side: Colour::White,
            chess960: false,
            game_ply: 0,
            nodes: 0,
            states: vec![State::new()],
        }
    }

    fn reset(&mut self) {
        let nodes = self.nodes;
        *self = Self::new();
        self.nodes = nodes;
    }

    fn st(&self) -> &State {
        self.states.last().unwrap()
    }

    fn st_mut(&mut self) -> &mut State {
        self.states.last_mut().unwrap()
    }

    // ------------------------------------------------------------------
    // query surface

    pub const fn side_to_move(&self) -> Colour {
        self.side
    }

    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.mailbox[sq]
    }

    pub fn is_empty(&self, sq: Square) -> bool {
        self.mailbox[sq].is_none()
    }

    pub fn moved_piece(&self, m: Move) -> Option<Piece> {
        self.mailbox[m.from()]
    }

    /// All occupied squares.
    pub fn pieces(&self) -> SquareSet {
        self.by_colour[Colour::White] | self.by_colour[Colour::Black]
    }

    pub fn pieces_c(&self, c: Colour) -> SquareSet {
        self.by_colour[c]
    }

    pub fn pieces_pt(&self, pt: PieceType) -> SquareSet {
        self.by_type[pt]
    }

    pub fn pieces_pp(&self, pt1: PieceType, pt2: PieceType) -> SquareSet {
        self.by_type[pt1] | self.by_type[pt2]
    }

    pub fn pieces_cp(&self, c: Colour, pt: PieceType) -> SquareSet {
        self.by_colour[c] & self.by_type[pt]
    }

    pub fn pieces_cpp(&self, c: Colour, pt1: PieceType, pt2: PieceType) -> SquareSet {
        self.by_colour[c] & (self.by_type[pt1] | self.by_type[pt2])
    }

    pub fn piece_count(&self, c: Colour, pt: PieceType) -> u8 {
        self.piece_counts[c][pt]
    }

    pub fn piece_list(&self, c: Colour, pt: PieceType) -> &[Square] {
        self.piece_lists[c][pt].squares()
    }

    pub fn king_sq(&self, c: Colour) -> Square {
        self.piece_lists[c][PieceType::King]
            .first()
            .expect("position has no king")
    }

    pub fn ep_square(&self) -> Option<Square> {
        self.st().ep_square
    }

    pub fn checkers(&self) -> SquareSet {
        self.st().checkers
    }

    pub fn in_check(&self) -> bool {
        self.st().checkers.non_empty()
    }

    pub fn captured_piece(&self) -> Option<PieceType> {
        self.st().captured
    }

    pub fn key(&self) -> u64 {
        self.st().key
    }

    pub fn exclusion_key(&self) -> u64 {
        self.st().key ^ EXCLUSION_KEY
    }

    pub fn pawn_key(&self) -> u64 {
        self.st().pawn_key
    }

    pub fn material_key(&self) -> u64 {
        self.st().material_key
    }

    pub fn psq_score(&self) -> S {
        self.st().psq
    }

    pub fn non_pawn_material(&self, c: Colour) -> i32 {
        self.st().non_pawn_material[c]
    }

    pub fn rule50(&self) -> i32 {
        self.st().rule50
    }

    pub const fn game_ply(&self) -> usize {
        self.game_ply
    }

    pub const fn nodes(&self) -> u64 {
        self.nodes
    }

    pub const fn is_chess960(&self) -> bool {
        self.chess960
    }

    pub fn castle_rights(&self) -> CastlingRights {
        self.st().castle_rights
    }

    pub fn can_castle(&self, cr: CastlingRights) -> bool {
        self.st().castle_rights.intersects(cr)
    }

    pub fn castle_impeded(&self, c: Colour, side: CastlingSide) -> bool {
        (self.pieces() & self.castle_path[c][side]).non_empty()
    }

    pub fn castle_rook_square(&self, c: Colour, side: CastlingSide) -> Option<Square> {
        self.castle_rook_square[c][side]
    }

    pub fn is_capture(&self, m: Move) -> bool {
        (!self.is_empty(m.to()) && !m.is_castle()) || m.is_ep()
    }

    pub fn is_capture_or_promotion(&self, m: Move) -> bool {
        if m.is_normal() {
            !self.is_empty(m.to())
        } else {
            !m.is_castle()
        }
    }

    // ------------------------------------------------------------------
    // attack and pin engine

    /// Attacks of `pt` from `sq` under the current occupancy. Pawns carry a
    /// direction, so they go through `pawn_attacks_from`.
    pub fn attacks_from(&self, pt: PieceType, sq: Square) -> SquareSet {
        debug_assert!(pt != PieceType::Pawn);
        attacks_by_type(pt, sq, self.pieces())
    }

    pub fn pawn_attacks_from(&self, sq: Square, c: Colour) -> SquareSet {
        pawn_attacks(sq.as_set(), c)
    }

    /// All pieces of both colours attacking `sq` under occupancy `occ`.
    pub fn attackers_to_occ(&self, sq: Square, occ: SquareSet) -> SquareSet {
        (pawn_attacks(sq.as_set(), Colour::Black)
            & self.pieces_cp(Colour::White, PieceType::Pawn))
            | (pawn_attacks(sq.as_set(), Colour::White)
                & self.pieces_cp(Colour::Black, PieceType::Pawn))
            | (knight_attacks(sq) & self.by_type[PieceType::Knight])
            | (rook_attacks(sq, occ) & self.pieces_pp(PieceType::Rook, PieceType::Queen))
            | (bishop_attacks(sq, occ) & self.pieces_pp(PieceType::Bishop, PieceType::Queen))
            | (king_attacks(sq) & self.by_type[PieceType::King])
    }

    pub fn attackers_to(&self, sq: Square) -> SquareSet {
        self.attackers_to_occ(sq, self.pieces())
    }

    /// Pieces of the side to move hidden behind a single blocker on a ray to
    /// a king. With `FIND_PINNED` the rays run to our own king (the blockers
    /// are pinned); without, to the enemy king (the blockers are
    /// discovered-check candidates).
    fn hidden_checkers<const FIND_PINNED: bool>(&self) -> SquareSet {
        let us = self.side;
        let (sniper_side, king_side) = if FIND_PINNED { (!us, us) } else { (us, !us) };
        let ksq = self.king_sq(king_side);

        let snipers = self.pieces_c(sniper_side)
            & ((self.pieces_pp(PieceType::Rook, PieceType::Queen)
                & rook_attacks(ksq, SquareSet::EMPTY))
                | (self.pieces_pp(PieceType::Bishop, PieceType::Queen)
                    & bishop_attacks(ksq, SquareSet::EMPTY)));

        let mut result = SquareSet::EMPTY;
        for sniper in snipers {
            let between = RAY_BETWEEN[ksq.index()][sniper.index()] & self.pieces();
            if between.one() && (between & self.pieces_c(us)).non_empty() {
                result |= between;
            }
        }
        result
    }

    /// Our pieces that may not leave their king-aligned ray.
    pub fn pinned_pieces(&self) -> SquareSet {
        self.hidden_checkers::<true>()
    }

    /// Our pieces whose departure from the ray would check the enemy king.
    pub fn discovered_check_candidates(&self) -> SquareSet {
        self.hidden_checkers::<false>()
    }

    /// Would making `m` leave the moving side attacking `sq`? Detects both
    /// the moved piece's own attack and X-rays unblocked behind its origin.
    pub fn move_attacks_square(&self, m: Move, sq: Square) -> bool {
        let from = m.from();
        let to = m.to();
        let piece = self.mailbox[from].expect("move from an empty square");

        let occ = self.pieces() ^ from.as_set() ^ to.as_set();

        if Self::attacks_from_piece(piece, to, occ).contains_square(sq) {
            return true;
        }

        let us = piece.colour();
        let xray = (rook_attacks(sq, occ)
            & self.pieces_cpp(us, PieceType::Rook, PieceType::Queen))
            | (bishop_attacks(sq, occ)
                & self.pieces_cpp(us, PieceType::Bishop, PieceType::Queen));

        // only attackers the move itself unblocked count
        let already = xray & attacks_by_type(PieceType::Queen, sq, self.pieces());
        (xray ^ already).non_empty()
    }

    fn attacks_from_piece(piece: Piece, sq: Square, occ: SquareSet) -> SquareSet {
        match piece.piece_type() {
            PieceType::Pawn => pawn_attacks(sq.as_set(), piece.colour()),
            pt => attacks_by_type(pt, sq, occ),
        }
    }

    // ------------------------------------------------------------------
    // move semantics

    /// Cheap filter for moves that cannot be legal in this position,
    /// independent of pins. Special move kinds fall back to the slow path.
    pub fn is_pseudo_legal(&self, m: Move) -> bool {
        let us = self.side;
        let them = !us;
        let from = m.from();
        let to = m.to();

        if !m.is_normal() {
            return self.move_is_legal(m);
        }

        let Some(pc) = self.mailbox[from] else {
            return false;
        };
        if pc.colour() != us {
            return false;
        }

        if self.pieces_c(us).contains_square(to) {
            return false;
        }

        if pc.piece_type() == PieceType::Pawn {
            // promotions are not Normal moves, so the pawn may not reach a
            // back rank here
            if to.rank() == Rank::Eight || to.rank() == Rank::One {
                return false;
            }

            let direction = i32::from(to.signed_inner()) - i32::from(from.signed_inner());
            if (us == Colour::White) != (direction > 0) {
                return false;
            }

            match direction.abs() {
                7 | 9 => {
                    // capture: an enemy must be there, and the files must be
                    // adjacent (no a-file to h-file wraps)
                    if !self.pieces_c(them).contains_square(to) {
                        return false;
                    }
                    if from.file().abs_diff(to.file()) != 1 {
                        return false;
                    }
                }
                8 => {
                    if self.mailbox[to].is_some() {
                        return false;
                    }
                }
                16 => {
                    if from.relative_rank(us) != Rank::Two {
                        return false;
                    }
                    let mid = from.pawn_push(us).unwrap();
                    if self.mailbox[to].is_some() || self.mailbox[mid].is_some() {
                        return false;
                    }
                }
                _ => return false,
            }
        } else if !self.attacks_from(pc.piece_type(), from).contains_square(to) {
            return false;
        }

        // mirror what the evasion generator would refuse, so that
        // pl_move_is_legal can stay cheap for these moves
        if self.in_check() {
            if pc.piece_type() != PieceType::King {
                if self.checkers().many() {
                    return false;
                }
                let checksq = self.checkers().first().unwrap();
                if !(RAY_BETWEEN[checksq.index()][self.king_sq(us).index()] | self.checkers())
                    .contains_square(to)
                {
                    return false;
                }
            } else if (self.attackers_to_occ(to, self.pieces() ^ from.as_set())
                & self.pieces_c(them))
            .non_empty()
            {
                return false;
            }
        }

        true
    }

    /// Full legality for a pseudo-legal move, given the current pinned set.
    pub fn pl_move_is_legal(&self, m: Move, pinned: SquareSet) -> bool {
        debug_assert_eq!(pinned, self.pinned_pieces());
        let us = self.side;
        let from = m.from();

        debug_assert_eq!(self.mailbox[from].map(Piece::colour), Some(us));

        // En passant discovers attacks through two vacated squares at once,
        // so it is validated by simulating the resulting occupancy.
        if m.is_ep() {
            let them = !us;
            let to = m.to();
            let capsq = to.pawn_push(them).unwrap();
            let ksq = self.king_sq(us);
            let occ = (self.pieces() ^ from.as_set() ^ capsq.as_set()) | to.as_set();

            debug_assert_eq!(Some(to), self.ep_square());
            debug_assert_eq!(self.mailbox[capsq], Some(Piece::new(them, PieceType::Pawn)));

            return (rook_attacks(ksq, occ)
                & self.pieces_cpp(them, PieceType::Rook, PieceType::Queen))
            .is_empty()
                && (bishop_attacks(ksq, occ)
                    & self.pieces_cpp(them, PieceType::Bishop, PieceType::Queen))
                .is_empty();
        }

        // King moves are legal iff the destination is not attacked; castling
        // was already vetted by the generator.
        if self.mailbox[from].unwrap().piece_type() == PieceType::King {
            return m.is_castle() || (self.attackers_to(m.to()) & self.pieces_c(!us)).is_empty();
        }

        // Everything else: not pinned, or moving along the pin ray.
        pinned.is_empty()
            || !pinned.contains_square(from)
            || RAY_FULL[from.index()][m.to().index()].contains_square(self.king_sq(us))
    }

    /// Slow-path legality: membership in the generated legal move list.
    pub fn move_is_legal(&self, m: Move) -> bool {
        let pinned = self.pinned_pieces();
        let mut list = MoveList::new();
        self.generate_moves(&mut list);
        let result = list.iter().any(|&gen| gen == m && self.pl_move_is_legal(gen, pinned));
        result
    }

    /// Does this pseudo-legal move give check?
    pub fn move_gives_check(&self, m: Move, ci: &CheckInfo) -> bool {
        debug_assert_eq!(ci.dc_candidates, self.discovered_check_candidates());
        debug_assert_eq!(self.mailbox[m.from()].map(Piece::colour), Some(self.side));

        let us = self.side;
        let from = m.from();
        let to = m.to();
        let pt = self.mailbox[from].unwrap().piece_type();

        // direct check
        if ci.check_squares[pt].contains_square(to) {
            return true;
        }

        // discovered check: pawns and kings can stay on the ray
        if ci.dc_candidates.contains_square(from)
            && ((pt != PieceType::Pawn && pt != PieceType::King)
                || !RAY_FULL[from.index()][to.index()].contains_square(ci.ksq))
        {
            return true;
        }

        if m.is_normal() {
            return false;
        }

        if let Some(promo) = m.promotion_type() {
            return (attacks_by_type(promo, to, self.pieces() ^ from.as_set())
                & ci.ksq.as_set())
            .non_empty();
        }

        if m.is_ep() {
            // discovered check through the captured pawn's square
            let capsq = Square::from_rank_file(from.rank(), to.file());
            let occ = (self.pieces() ^ from.as_set() ^ capsq.as_set()) | to.as_set();
            return ((rook_attacks(ci.ksq, occ)
                & self.pieces_cpp(us, PieceType::Rook, PieceType::Queen))
                | (bishop_attacks(ci.ksq, occ)
                    & self.pieces_cpp(us, PieceType::Bishop, PieceType::Queen)))
            .non_empty();
        }

        if m.is_castle() {
            let kfrom = from;
            let rfrom = to;
            let kingside = rfrom > kfrom;
            let kto = if kingside { Square::G1 } else { Square::C1 }.relative_to(us);
            let rto = if kingside { Square::F1 } else { Square::D1 }.relative_to(us);
            let occ = (self.pieces() ^ kfrom.as_set() ^ rfrom.as_set())
                | rto.as_set()
                | kto.as_set();
            return (rook_attacks(rto, occ) & ci.ksq.as_set()).non_empty();
        }

        false
    }

    // ------------------------------------------------------------------
    // make / unmake

    /// Makes a legal move. Pseudo-legal but illegal moves must be filtered
    /// out before this is called.
    pub fn make_move(&mut self, m: Move) {
        let ci = CheckInfo::new(self);
        let gives_check = self.move_gives_check(m, &ci);
        self.make_move_with(m, &ci, gives_check);
    }

    /// As `make_move`, with check information the caller already has.
    #[allow(clippy::too_many_lines)]
    pub fn make_move_with(&mut self, m: Move, ci: &CheckInfo, gives_check: bool) {
        #[cfg(debug_assertions)]
        self.check_validity().unwrap();

        self.nodes += 1;
        let mut key = self.st().key ^ SIDE_KEY;

        let next = self.st().copied();
        self.states.push(next);
        self.game_ply += 1;
        self.st_mut().rule50 += 1;
        self.st_mut().plies_from_null += 1;

        let us = self.side;
        let them = !us;
        let from = m.from();
        let mut to = m.to();
        let pc = self.mailbox[from].expect("make_move from an empty square");
        debug_assert_eq!(pc.colour(), us);

        let captured = if m.is_ep() {
            Some(Piece::new(them, PieceType::Pawn))
        } else if m.is_castle() {
            None
        } else {
            self.mailbox[to]
        };
        debug_assert!(captured.is_none_or(|cap| cap.colour() == them));
        debug_assert!(captured.is_none_or(|cap| cap.piece_type() != PieceType::King));

        if m.is_castle() {
            debug_assert_eq!(pc, Piece::new(us, PieceType::King));
            debug_assert_eq!(self.mailbox[to], Some(Piece::new(us, PieceType::Rook)));

            let (mut rfrom, mut rto) = (from, from);
            self.do_castling::<true>(us, from, &mut to, &mut rfrom, &mut rto);

            let rook = Piece::new(us, PieceType::Rook);
            self.st_mut().psq += psqt::psq(rook, rto) - psqt::psq(rook, rfrom);
            key ^= PIECE_KEYS[rook][rfrom] ^ PIECE_KEYS[rook][rto];
        }

        if let Some(cap) = captured {
            let mut capsq = to;

            if cap.piece_type() == PieceType::Pawn {
                if m.is_ep() {
                    capsq = to.pawn_push(them).unwrap();

                    debug_assert_eq!(pc.piece_type(), PieceType::Pawn);
                    debug_assert_eq!(to.relative_rank(us), Rank::Six);
                    debug_assert!(self.mailbox[to].is_none());
                }
                self.st_mut().pawn_key ^= PIECE_KEYS[cap][capsq];
            } else {
                self.st_mut().non_pawn_material[them] -= mg_value(cap.piece_type());
            }

            self.remove_piece(cap, capsq);

            key ^= PIECE_KEYS[cap][capsq];
            // the material key is indexed by the count after removal, so the
            // state pop of unmake reverses it exactly
            let count = self.piece_counts[them][cap.piece_type()];
            self.st_mut().material_key ^= PIECE_KEYS[cap][count as usize];

            self.st_mut().psq -= psqt::psq(cap, capsq);
            self.st_mut().rule50 = 0;
        }

        key ^= PIECE_KEYS[pc][from] ^ PIECE_KEYS[pc][to];

        if let Some(ep) = self.st().ep_square {
            key ^= EP_KEYS[ep.file()];
            self.st_mut().ep_square = None;
        }

        let touched = self.castle_rights_mask[from] | self.castle_rights_mask[to];
        if !self.st().castle_rights.is_empty() && !touched.is_empty() {
            let lost = self.st().castle_rights & touched;
            key ^= CASTLE_KEYS[lost.index()];
            self.st_mut().castle_rights &= !touched;
        }

        if !m.is_castle() {
            self.move_piece(pc, from, to);
        }

        if pc.piece_type() == PieceType::Pawn {
            if from.index() ^ to.index() == 16 {
                // the en-passant square only exists when an enemy pawn can
                // actually capture there
                let ep_sq = from.pawn_push(us).unwrap();
                if (pawn_attacks(ep_sq.as_set(), us) & self.pieces_cp(them, PieceType::Pawn))
                    .non_empty()
                {
                    self.st_mut().ep_square = Some(ep_sq);
                    key ^= EP_KEYS[ep_sq.file()];
                }
            } else if let Some(promo_t) = m.promotion_type() {
                let promo = Piece::new(us, promo_t);

                debug_assert_eq!(to.relative_rank(us), Rank::Eight);
                debug_assert!(promo_t.legal_promo());

                self.remove_piece(pc, to);
                self.put_piece(promo, to);

                key ^= PIECE_KEYS[pc][to] ^ PIECE_KEYS[promo][to];
                self.st_mut().pawn_key ^= PIECE_KEYS[pc][to];
                let promo_count = self.piece_counts[us][promo_t];
                let pawn_count = self.piece_counts[us][PieceType::Pawn];
                self.st_mut().material_key ^= PIECE_KEYS[promo][promo_count as usize - 1]
                    ^ PIECE_KEYS[pc][pawn_count as usize];

                self.st_mut().psq += psqt::psq(promo, to) - psqt::psq(pc, to);
                self.st_mut().non_pawn_material[us] += mg_value(promo_t);
            }

            self.st_mut().pawn_key ^= PIECE_KEYS[pc][from] ^ PIECE_KEYS[pc][to];
            self.st_mut().rule50 = 0;
        }

        self.st_mut().psq += psqt::psq(pc, to) - psqt::psq(pc, from);

        self.st_mut().captured = captured.map(Piece::piece_type);
        self.st_mut().key = key;

        self.st_mut().checkers = if gives_check {
            if m.is_normal() {
                let mut checkers = ci.check_squares[pc.piece_type()] & to.as_set();
                if ci.dc_candidates.contains_square(from) {
                    let ksq = self.king_sq(them);
                    if pc.piece_type() != PieceType::Rook {
                        checkers |= rook_attacks(ksq, self.pieces())
                            & self.pieces_cpp(us, PieceType::Rook, PieceType::Queen);
                    }
                    if pc.piece_type() != PieceType::Bishop {
                        checkers |= bishop_attacks(ksq, self.pieces())
                            & self.pieces_cpp(us, PieceType::Bishop, PieceType::Queen);
                    }
                }
                checkers
            } else {
                self.attackers_to(self.king_sq(them)) & self.pieces_c(us)
            }
        } else {
            SquareSet::EMPTY
        };

        self.side = them;

        #[cfg(debug_assertions)]
        self.check_validity().unwrap();
    }

    /// Restores the position to exactly the state before `make_move(m)`.
    /// Piece-list order is not part of that contract.
    pub fn unmake_move(&mut self, m: Move) {
        self.side = !self.side;

        let us = self.side;
        let from = m.from();
        let mut to = m.to();

        debug_assert!(self.mailbox[from].is_none() || m.is_castle());

        if m.is_promo() {
            let promo = self.mailbox[to].expect("unmake: promotion square empty");
            debug_assert_eq!(Some(promo.piece_type()), m.promotion_type());
            debug_assert_eq!(to.relative_rank(us), Rank::Eight);

            self.remove_piece(promo, to);
            self.put_piece(Piece::new(us, PieceType::Pawn), to);
        }

        if m.is_castle() {
            let (mut rfrom, mut rto) = (from, from);
            self.do_castling::<false>(us, from, &mut to, &mut rfrom, &mut rto);
        } else {
            let pc = self.mailbox[to].expect("unmake: to-square empty");
            self.move_piece(pc, to, from);

            if let Some(cap) = self.st().captured {
                let capsq = if m.is_ep() {
                    to.pawn_push(!us).unwrap()
                } else {
                    to
                };
                self.put_piece(Piece::new(!us, cap), capsq);
            }
        }

        self.states.pop();
        self.game_ply -= 1;

        #[cfg(debug_assertions)]
        self.check_validity().unwrap();
    }

    /// Moves king and rook for castling, in either direction. The removals
    /// happen before the placements because in Chess960 the four squares
    /// involved may overlap.
    fn do_castling<const APPLY: bool>(
        &mut self,
        us: Colour,
        from: Square,
        to: &mut Square,
        rfrom: &mut Square,
        rto: &mut Square,
    ) {
        let kingside = *to > from;
        *rfrom = *to; // castling is encoded as king captures rook
        *rto = if kingside { Square::F1 } else { Square::D1 }.relative_to(us);
        *to = if kingside { Square::G1 } else { Square::C1 }.relative_to(us);

        let king = Piece::new(us, PieceType::King);
        let rook = Piece::new(us, PieceType::Rook);

        self.remove_piece(king, if APPLY { from } else { *to });
        self.remove_piece(rook, if APPLY { *rfrom } else { *rto });
        self.put_piece(king, if APPLY { *to } else { from });
        self.put_piece(rook, if APPLY { *rto } else { *rfrom });
    }

    /// Flips the side to move without touching the pieces. Must not be
    /// called in check.
    pub fn make_null_move(&mut self) {
        debug_assert!(!self.in_check());
        #[cfg(debug_assertions)]
        self.check_validity().unwrap();

        let backup = self.st().clone();
        self.states.push(backup);

        let st = self.st_mut();
        if let Some(ep) = st.ep_square {
            st.key ^= EP_KEYS[ep.file()];
            st.ep_square = None;
        }
        st.key ^= SIDE_KEY;
        st.rule50 += 1;
        st.plies_from_null = 0;

        self.side = !self.side;

        #[cfg(debug_assertions)]
        self.check_validity().unwrap();
    }

    pub fn unmake_null_move(&mut self) {
        debug_assert!(!self.in_check());
        self.states.pop();
        self.side = !self.side;
    }

    /// The hash key after a normal move, for speculative prefetch. Castling,
    /// promotion, and en passant are not accounted for.
    pub fn key_after(&self, m: Move) -> u64 {
        let from = m.from();
        let to = m.to();
        let pc = self.mailbox[from].expect("move from an empty square");
        let mut k = self.st().key ^ SIDE_KEY;

        if let Some(cap) = self.mailbox[to] {
            k ^= PIECE_KEYS[cap][to];
        }

        k ^ PIECE_KEYS[pc][to] ^ PIECE_KEYS[pc][from]
    }

    // ------------------------------------------------------------------
    // draw detection

    /// Draw by bare material, the fifty-move rule, or repetition.
    pub fn is_draw(&self) -> bool {
        self.draw_impl(false)
    }

    /// As `is_draw`, with repetition detection suppressed (the search uses
    /// this to handle one repetition layer itself).
    pub fn is_draw_ignoring_repetition(&self) -> bool {
        self.draw_impl(true)
    }

    fn draw_impl(&self, skip_repetition: bool) -> bool {
        // neither side can win with at most a bishop's worth of material
        if self.by_type[PieceType::Pawn].is_empty()
            && self.non_pawn_material(Colour::White) + self.non_pawn_material(Colour::Black)
                <= mg_value(PieceType::Bishop)
        {
            return true;
        }

        // the fifty-move rule cannot be claimed through checkmate
        if self.st().rule50 > 99 && (!self.in_check() || !self.legal_moves().is_empty()) {
            return true;
        }

        if !skip_repetition {
            // a repetition must be at the same side-to-move parity, and
            // cannot reach past an irreversible move or a null move
            let end = self.st().rule50.min(self.st().plies_from_null);
            let mut i = 4;
            let mut k = self.states.len() as i32 - 1 - 4;
            while i <= end && k >= 0 {
                if self.states[k as usize].key == self.st().key {
                    return true;
                }
                i += 2;
                k -= 2;
            }
        }

        false
    }

    /// Has any position in the played line occurred twice?
    pub fn has_repeated(&self) -> bool {
        let mut l = self.states.len() as i32 - 1;
        while l >= 0 {
            let st = &self.states[l as usize];
            let end = st.rule50.min(st.plies_from_null);
            let mut i = 4;
            let mut k = l - 4;
            while i <= end && k >= 0 {
                if self.states[k as usize].key == st.key {
                    return true;
                }
                i += 2;
                k -= 2;
            }
            l -= 2;
        }
        false
    }

    // ------------------------------------------------------------------
    // setup

    pub fn from_fen(fen_str: &str) -> Result<Self, FenParseError> {
        let fen = Fen::parse(fen_str)?;
        let mut board = Self::new();
        board.set_from_fen(&fen, false);
        Ok(board)
    }

    pub fn from_fen_960(fen_str: &str) -> Result<Self, FenParseError> {
        let fen = Fen::parse(fen_str)?;
        let mut board = Self::new();
        board.set_from_fen(&fen, true);
        Ok(board)
    }

    pub fn set_from_fen(&mut self, fen: &Fen, chess960: bool) {
        self.reset();

        for sq in Square::all() {
            if let Some(piece) = fen.board[sq] {
                self.put_piece(piece, sq);
            }
        }
        self.side = fen.turn;

        for colour in Colour::all() {
            for side in [CastlingSide::King, CastlingSide::Queen] {
                if let Some(rook_sq) = fen.castling_rooks[colour][side] {
                    self.set_castling_right(colour, rook_sq);
                }
            }
        }

        // keep the en-passant square only when the capture is actually on:
        // one of our pawns attacks it and the double-pushed pawn is behind it
        let us = self.side;
        let them = !us;
        let ep = fen.ep.filter(|&ep_sq| {
            (pawn_attacks(ep_sq.as_set(), them) & self.pieces_cp(us, PieceType::Pawn)).non_empty()
                && ep_sq
                    .pawn_push(them)
                    .is_some_and(|behind| {
                        self.pieces_cp(them, PieceType::Pawn).contains_square(behind)
                    })
        });
        self.st_mut().ep_square = ep;

        self.st_mut().rule50 = fen.halfmove;
        self.game_ply = (fen.fullmove.get() - 1) * 2 + usize::from(self.side == Colour::Black);
        self.chess960 = chess960;

        self.set_state();

        #[cfg(debug_assertions)]
        self.check_validity().unwrap();
    }

    fn set_castling_right(&mut self, c: Colour, rfrom: Square) {
        let kfrom = self.king_sq(c);
        let side = if kfrom < rfrom {
            CastlingSide::King
        } else {
            CastlingSide::Queen
        };
        let cr = CastlingRights::make(c, side);

        self.st_mut().castle_rights |= cr;
        self.castle_rights_mask[kfrom] |= cr;
        self.castle_rights_mask[rfrom] |= cr;
        self.castle_rook_square[c][side] = Some(rfrom);

        let kto = match side {
            CastlingSide::King => Square::G1,
            CastlingSide::Queen => Square::C1,
        }
        .relative_to(c);
        let rto = match side {
            CastlingSide::King => Square::F1,
            CastlingSide::Queen => Square::D1,
        }
        .relative_to(c);

        let mut path = SquareSet::EMPTY;
        for (a, b) in [(rfrom.min(rto), rfrom.max(rto)), (kfrom.min(kto), kfrom.max(kto))] {
            for idx in a.index()..=b.index() {
                let sq = Square::new(idx as u8).unwrap();
                if sq != kfrom && sq != rfrom {
                    path |= sq.as_set();
                }
            }
        }
        self.castle_path[c][side] = path;
    }

    /// Computes every incrementally maintained field from scratch. Used at
    /// setup, and by the audit to cross-check the incremental updates.
    fn set_state(&mut self) {
        let checkers = self.attackers_to(self.king_sq(self.side)) & self.pieces_c(!self.side);
        let key = self.compute_key();
        let pawn_key = self.compute_pawn_key();
        let material_key = self.compute_material_key();
        let psq = self.compute_psq_score();
        let npm = [
            self.compute_non_pawn_material(Colour::White),
            self.compute_non_pawn_material(Colour::Black),
        ];

        let st = self.st_mut();
        st.checkers = checkers;
        st.key = key;
        st.pawn_key = pawn_key;
        st.material_key = material_key;
        st.psq = psq;
        st.non_pawn_material = npm;
    }

    fn compute_key(&self) -> u64 {
        let mut key = CASTLE_KEYS[self.st().castle_rights.index()];
        for sq in self.pieces() {
            key ^= PIECE_KEYS[self.mailbox[sq].unwrap()][sq];
        }
        if let Some(ep) = self.st().ep_square {
            key ^= EP_KEYS[ep.file()];
        }
        if self.side == Colour::Black {
            key ^= SIDE_KEY;
        }
        key
    }

    fn compute_pawn_key(&self) -> u64 {
        let mut key = NO_PAWNS_KEY;
        for sq in self.by_type[PieceType::Pawn] {
            key ^= PIECE_KEYS[self.mailbox[sq].unwrap()][sq];
        }
        key
    }

    fn compute_material_key(&self) -> u64 {
        let mut key = 0;
        for colour in Colour::all() {
            for pt in PieceType::all() {
                let piece = Piece::new(colour, pt);
                for count in 0..self.piece_counts[colour][pt] {
                    key ^= PIECE_KEYS[piece][count as usize];
                }
            }
        }
        key
    }

    fn compute_psq_score(&self) -> S {
        let mut score = S::NULL;
        for sq in self.pieces() {
            score += psqt::psq(self.mailbox[sq].unwrap(), sq);
        }
        score
    }

    fn compute_non_pawn_material(&self, c: Colour) -> i32 {
        let mut value = 0;
        for pt in [PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen] {
            value += i32::from(self.piece_counts[c][pt]) * mg_value(pt);
        }
        value
    }

    /// Swaps the colours and mirrors the board vertically. Evaluation
    /// symmetry bugs show up as a score that fails to negate.
    pub fn flip(&mut self) {
        let original = self.clone();
        self.reset();

        self.side = !original.side;
        self.chess960 = original.chess960;
        self.game_ply = original.game_ply;

        for sq in Square::all() {
            if let Some(piece) = original.piece_on(sq) {
                self.put_piece(piece.flip_colour(), sq.flip_rank());
            }
        }

        for colour in Colour::all() {
            for side in [CastlingSide::King, CastlingSide::Queen] {
                if let Some(rook_sq) = original.castle_rook_square(colour, side) {
                    self.set_castling_right(!colour, rook_sq.flip_rank());
                }
            }
        }

        self.st_mut().ep_square = original.ep_square().map(Square::flip_rank);
        self.st_mut().rule50 = original.rule50();

        self.set_state();

        #[cfg(debug_assertions)]
        self.check_validity().unwrap();
    }

    // ------------------------------------------------------------------
    // board surgery primitives: every representation updates together

    fn put_piece(&mut self, piece: Piece, sq: Square) {
        let (c, pt) = (piece.colour(), piece.piece_type());
        self.mailbox[sq] = Some(piece);
        self.by_type[pt] |= sq.as_set();
        self.by_colour[c] |= sq.as_set();
        self.square_index[sq] = self.piece_counts[c][pt];
        self.piece_lists[c][pt].push(sq);
        self.piece_counts[c][pt] += 1;
    }

    fn remove_piece(&mut self, piece: Piece, sq: Square) {
        let (c, pt) = (piece.colour(), piece.piece_type());
        debug_assert_eq!(self.mailbox[sq], Some(piece));
        self.mailbox[sq] = None;
        self.by_type[pt] ^= sq.as_set();
        self.by_colour[c] ^= sq.as_set();
        self.piece_counts[c][pt] -= 1;
        // swap-pop: the tail entry moves into the vacated slot, the index of
        // the removed square goes stale
        let moved = self.piece_lists[c][pt].swap_remove(self.square_index[sq]);
        self.square_index[moved] = self.square_index[sq];
    }

    fn move_piece(&mut self, piece: Piece, from: Square, to: Square) {
        let (c, pt) = (piece.colour(), piece.piece_type());
        let from_to = from.as_set() | to.as_set();
        self.by_type[pt] ^= from_to;
        self.by_colour[c] ^= from_to;
        self.mailbox[from] = None;
        self.mailbox[to] = Some(piece);
        let slot = self.square_index[from];
        self.square_index[to] = slot;
        self.piece_lists[c][pt].set(slot, to);
    }

    // ------------------------------------------------------------------
    // FEN emission and UCI parsing

    /// The position as a FEN string. Chess960 positions emit rook file
    /// letters for the castling field; classical positions emit `KQkq`.
    pub fn fen(&self) -> String {
        let mut out = String::with_capacity(90);

        for rank in Rank::all().rev() {
            let mut run = 0;
            for file in File::all() {
                let sq = Square::from_rank_file(rank, file);
                if let Some(piece) = self.mailbox[sq] {
                    if run > 0 {
                        out.push(char::from(b'0' + run));
                    }
                    run = 0;
                    out.push(piece.char());
                } else {
                    run += 1;
                }
            }
            if run > 0 {
                out.push(char::from(b'0' + run));
            }
            if rank != Rank::One {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(if self.side == Colour::White { 'w' } else { 'b' });
        out.push(' ');

        if self.st().castle_rights.is_empty() {
            out.push('-');
        } else {
            let letters = [
                (Colour::White, CastlingSide::King, 'K'),
                (Colour::White, CastlingSide::Queen, 'Q'),
                (Colour::Black, CastlingSide::King, 'k'),
                (Colour::Black, CastlingSide::Queen, 'q'),
            ];
            for (colour, side, classical) in letters {
                if !self.can_castle(CastlingRights::make(colour, side)) {
                    continue;
                }
                if self.chess960 {
                    let file = self.castle_rook_square[colour][side].unwrap().file();
                    let letter = b'A' + file.index() as u8;
                    out.push(char::from(if colour == Colour::White {
                        letter
                    } else {
                        letter + 32
                    }));
                } else {
                    out.push(classical);
                }
            }
        }

        out.push(' ');
        match self.ep_square() {
            Some(ep) => out.push_str(ep.name()),
            None => out.push('-'),
        }

        out.push_str(&format!(" {} {}", self.rule50(), 1 + self.game_ply / 2));

        out
    }

    /// Parses a move in UCI notation against the legal moves of this
    /// position. Outside Chess960 mode, castling is accepted in the standard
    /// king-destination form.
    pub fn parse_uci(&self, uci: &str) -> Result<Move, MoveParseError> {
        let bytes = uci.as_bytes();
        if !uci.is_ascii() || !(4..=5).contains(&bytes.len()) {
            return Err(MoveParseError::InvalidLength(bytes.len()));
        }

        let from: Square = uci[0..2]
            .parse()
            .map_err(|_| MoveParseError::InvalidFromSquare(uci[0..2].to_string()))?;
        let to: Square = uci[2..4]
            .parse()
            .map_err(|_| MoveParseError::InvalidToSquare(uci[2..4].to_string()))?;
        let promo = match bytes.get(4) {
            None => None,
            Some(b'n') => Some(PieceType::Knight),
            Some(b'b') => Some(PieceType::Bishop),
            Some(b'r') => Some(PieceType::Rook),
            Some(b'q') => Some(PieceType::Queen),
            Some(&c) => return Err(MoveParseError::InvalidPromotionPiece(c as char)),
        };

        self.legal_moves()
            .into_iter()
            .find(|&m| {
                let m_to = if self.chess960 { m.to() } else { m.king_to_square() };
                m.from() == from && m_to == to && m.promotion_type() == promo
            })
            .ok_or_else(|| MoveParseError::IllegalMove(uci.to_string()))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::from_fen(Self::STARTING_FEN).expect("STARTING_FEN is broken")
    }
}

impl Clone for Board {
    /// Copying detaches the history: the clone starts from a snapshot of the
    /// source's current state only, so the two positions never alias and the
    /// copy cannot see (or unmake into) the source's earlier plies.
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox,
            by_type: self.by_type,
            by_colour: self.by_colour,
            piece_counts: self.piece_counts,
            piece_lists: self.piece_lists,
            square_index: self.square_index,
            castle_rights_mask: self.castle_rights_mask,
            castle_rook_square: self.castle_rook_square,
            castle_path: self.castle_path,
            side: self.side,
            chess960: self.chess960,
            game_ply: self.game_ply,
            nodes: self.nodes,
            states: vec![self.st().clone()],
        }
    }
}

impl PartialEq for Board {
    /// Positional identity: every observable field, piece-list order
    /// excepted.
    fn eq(&self, other: &Self) -> bool {
        self.mailbox == other.mailbox
            && self.by_type == other.by_type
            && self.by_colour == other.by_colour
            && self.side == other.side
            && self.st().key == other.st().key
            && self.st().pawn_key == other.st().pawn_key
            && self.st().material_key == other.st().material_key
            && self.st().psq == other.st().psq
            && self.st().non_pawn_material == other.st().non_pawn_material
            && self.st().checkers == other.st().checkers
            && self.st().castle_rights == other.st().castle_rights
            && self.st().ep_square == other.st().ep_square
            && self.st().rule50 == other.st().rule50
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen())
    }
}

impl CheckInfo {
    /// Check-detection data for the side to move of `board`.
    pub fn new(board: &Board) -> Self {
        let us = board.side_to_move();
        let them = !us;
        let ksq = board.king_sq(them);
        let occ = board.pieces();

        let bishop_rays = bishop_attacks(ksq, occ);
        let rook_rays = rook_attacks(ksq, occ);

        Self {
            ksq,
            pinned: board.pinned_pieces(),
            dc_candidates: board.discovered_check_candidates(),
            check_squares: [
                pawn_attacks(ksq.as_set(), them),
                knight_attacks(ksq),
                bishop_rays,
                rook_rays,
                bishop_rays | rook_rays,
                SquareSet::EMPTY,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::chessmove::MoveFlags;
    use crate::chess::score::PAWN_VALUE;

    fn assert_round_trips(fen: &str) {
        let board = Board::from_fen(fen).unwrap();
        let pinned = board.pinned_pieces();
        let mut list = MoveList::new();
        board.generate_moves(&mut list);
        for &m in list.iter() {
            if !board.pl_move_is_legal(m, pinned) {
                continue;
            }
            let mut child = board.clone();
            child.make_move(m);
            child.unmake_move(m);
            assert!(child == board, "make/unmake of {m:?} did not round-trip in {fen}");
        }
    }

    #[test]
    fn startpos_basics() {
        let board = Board::default();
        assert_eq!(board.pieces().count(), 32);
        assert!(!board.in_check());
        assert_eq!(board.psq_score(), S::NULL);
        assert_eq!(board.piece_count(Colour::White, PieceType::Pawn), 8);
        assert_eq!(board.piece_count(Colour::Black, PieceType::Knight), 2);
        assert_eq!(board.king_sq(Colour::White), Square::E1);
        assert_eq!(board.king_sq(Colour::Black), Square::E8);
        assert_eq!(
            board.non_pawn_material(Colour::White),
            board.non_pawn_material(Colour::Black)
        );
        assert_eq!(board.fen(), Board::STARTING_FEN);
    }

    #[test]
    fn fen_round_trips() {
        let fens = [
            Board::STARTING_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "4k3/8/8/8/8/8/8/4K3 b - - 13 42",
        ];
        for fen in fens {
            let board = Board::from_fen(fen).unwrap();
            assert_eq!(board.fen(), fen);
            let again = Board::from_fen(&board.fen()).unwrap();
            assert!(again == board);
            assert_eq!(again.key(), board.key());
            assert_eq!(again.pawn_key(), board.pawn_key());
            assert_eq!(again.material_key(), board.material_key());
            assert_eq!(again.psq_score(), board.psq_score());
        }
    }

    #[test]
    fn shredder_fen_emission_for_chess960() {
        let board =
            Board::from_fen_960("1rkr4/pppppppp/8/8/8/8/PPPPPPPP/1RKR4 w DBdb - 0 1").unwrap();
        assert_eq!(board.fen(), "1rkr4/pppppppp/8/8/8/8/PPPPPPPP/1RKR4 w DBdb - 0 1");
    }

    #[test]
    fn ep_square_only_exists_when_capturable() {
        // the recorded square is dead: no white pawn attacks e6
        let board = Board::from_fen("4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 1").unwrap();
        assert_eq!(board.ep_square(), None);

        // here the capture is on, so the square survives
        let board = Board::from_fen("4k3/8/8/4pP2/8/8/8/4K3 w - e6 0 1").unwrap();
        assert_eq!(board.ep_square(), Some(Square::E6));
    }

    #[test]
    fn double_push_sets_ep_only_when_attackable() {
        let mut quiet = Board::default();
        quiet.make_move(Move::new(Square::E2, Square::E4));
        // no black pawn can capture on e3
        assert_eq!(quiet.ep_square(), None);

        let mut capturable =
            Board::from_fen("rnbqkbnr/ppppp1pp/8/4Pp2/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2")
                .unwrap();
        let before = capturable.key();
        capturable.make_move(Move::new(Square::D7, Square::D5));
        assert_eq!(capturable.ep_square(), Some(Square::D6));
        let expected = before
            ^ SIDE_KEY
            ^ PIECE_KEYS[Piece::BP][Square::D7]
            ^ PIECE_KEYS[Piece::BP][Square::D5]
            ^ EP_KEYS[File::D];
        assert_eq!(capturable.key(), expected);
    }

    #[test]
    fn quiet_move_key_delta() {
        let mut board = Board::default();
        let before = board.key();
        board.make_move(Move::new(Square::G1, Square::F3));
        let expected = before
            ^ SIDE_KEY
            ^ PIECE_KEYS[Piece::WN][Square::G1]
            ^ PIECE_KEYS[Piece::WN][Square::F3];
        assert_eq!(board.key(), expected);
        assert_eq!(board.key(), board.compute_key());
    }

    #[test]
    fn key_after_predicts_simple_moves() {
        let mut board = Board::default();
        let m = Move::new(Square::E2, Square::E3);
        let predicted = board.key_after(m);
        board.make_move(m);
        assert_eq!(board.key(), predicted);

        let mut board =
            Board::from_fen("r1bqkb1r/ppp2ppp/2n5/3np1N1/2B5/8/PPPP1PPP/RNBQK2R w KQkq - 0 6")
                .unwrap();
        let capture = Move::new(Square::G5, Square::F7);
        let predicted = board.key_after(capture);
        board.make_move(capture);
        assert_eq!(board.key(), predicted);
    }

    #[test]
    fn castling_updates_both_pieces_and_rights() {
        let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert!(board.can_castle(CastlingRights::WHITE_OO));
        assert!(board.can_castle(CastlingRights::WHITE_OOO));
        assert!(!board.castle_impeded(Colour::White, CastlingSide::King));

        let castle = board.parse_uci("e1g1").unwrap();
        assert!(castle.is_castle());
        board.make_move(castle);

        assert_eq!(board.piece_on(Square::G1), Some(Piece::WK));
        assert_eq!(board.piece_on(Square::F1), Some(Piece::WR));
        assert!(board.piece_on(Square::E1).is_none());
        assert!(board.piece_on(Square::H1).is_none());
        assert!(!board.can_castle(CastlingRights::WHITE_ANY));
        assert!(board.can_castle(CastlingRights::BLACK_OO));
        assert!(board.can_castle(CastlingRights::BLACK_OOO));

        board.unmake_move(castle);
        assert!(board == Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap());
    }

    #[test]
    fn make_unmake_round_trips() {
        for fen in [
            Board::STARTING_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            "4k3/8/8/4pP2/8/8/8/4K3 w - e6 0 1",
        ] {
            assert_round_trips(fen);
        }
    }

    #[test]
    fn null_move_key_delta_and_round_trip() {
        let mut board =
            Board::from_fen("4k3/8/8/4pP2/8/8/8/4K3 w - e6 0 1").unwrap();
        let before = board.clone();
        let key = board.key();

        board.make_null_move();
        assert_eq!(board.key(), key ^ SIDE_KEY ^ EP_KEYS[File::E]);
        assert_eq!(board.ep_square(), None);
        board.unmake_null_move();
        assert!(board == before);

        // without an en-passant square, only the side key flips
        let mut board = Board::default();
        let key = board.key();
        board.make_null_move();
        assert_eq!(board.key(), key ^ SIDE_KEY);
        board.unmake_null_move();
    }

    #[test]
    fn move_gives_check_matches_checkers() {
        let fens = [
            "rnbqkbnr/pppp1ppp/8/4p3/8/5P2/PPPPP1PP/RNBQKBNR b KQkq - 0 2",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 b - - 0 1",
            "4k3/8/8/3pP3/8/8/2B5/3RK3 w - d6 0 1",
        ];
        for fen in fens {
            let board = Board::from_fen(fen).unwrap();
            let ci = CheckInfo::new(&board);
            for &m in &board.legal_moves() {
                let predicted = board.move_gives_check(m, &ci);
                let mut child = board.clone();
                child.make_move_with(m, &ci, predicted);
                assert_eq!(
                    predicted,
                    child.in_check(),
                    "gives-check mismatch for {m:?} in {fen}"
                );
                // the incremental checker set must agree with a recomputation
                assert_eq!(
                    child.checkers(),
                    child.attackers_to(child.king_sq(child.side_to_move()))
                        & child.pieces_c(!child.side_to_move()),
                );
            }
        }
    }

    #[test]
    fn move_attacks_square_sees_xrays() {
        let board = Board::from_fen("3rk3/3p4/8/8/8/8/3P4/3RK3 w - - 0 1").unwrap();
        let m = Move::new(Square::D2, Square::E3);
        // the pawn itself attacks the diagonal neighbours of e3
        assert!(board.move_attacks_square(m, Square::D4));
        assert!(board.move_attacks_square(m, Square::F4));
        // stepping off the d-file unmasks the d1 rook up the file
        assert!(board.move_attacks_square(m, Square::D5));
        // nothing new bears on a5
        assert!(!board.move_attacks_square(m, Square::A5));
    }

    #[test]
    fn pinned_and_discovered_sets() {
        // the e4 knight is pinned by the e8 rook; the d2 bishop is not
        let board = Board::from_fen("4r1k1/8/8/8/4N3/8/3B4/4K3 w - - 0 1").unwrap();
        assert_eq!(board.pinned_pieces(), Square::E4.as_set());
        assert_eq!(board.discovered_check_candidates(), SquareSet::EMPTY);

        // white to move: the d5 knight hides the d1 rook's check on d8
        let board = Board::from_fen("3k4/8/8/3N4/8/8/8/3RK3 w - - 0 1").unwrap();
        assert_eq!(board.pinned_pieces(), SquareSet::EMPTY);
        assert_eq!(board.discovered_check_candidates(), Square::D5.as_set());
    }

    #[test]
    fn fifty_move_draws() {
        // quiet position, clock run out
        let board =
            Board::from_fen("rnbqkb1r/pppppppp/5n2/8/3N4/8/PPPPPPPP/RNBQKB1R b KQkq - 100 2")
                .unwrap();
        assert!(board.is_draw());

        // checkmate trumps the fifty-move claim
        let board = Board::from_fen("7k/6Q1/6K1/8/8/8/8/8 b - - 100 1").unwrap();
        assert!(board.in_check());
        assert!(board.legal_moves().is_empty());
        assert!(!board.is_draw());

        // in check but not mated: still claimable
        let board = Board::from_fen("7k/8/6QK/8/8/8/8/8 b - - 100 1").unwrap();
        assert!(!board.in_check());
        assert!(board.is_draw());
    }

    #[test]
    fn material_draw() {
        assert!(Board::from_fen("8/8/5k2/8/8/2K5/8/8 w - - 0 1").unwrap().is_draw());
        assert!(Board::from_fen("8/8/5k2/8/8/2KB4/8/8 w - - 0 1").unwrap().is_draw());
        assert!(Board::from_fen("8/8/5k2/8/8/2KN4/8/8 w - - 0 1").unwrap().is_draw());
        assert!(!Board::from_fen("8/8/5k2/8/8/2KR4/8/8 w - - 0 1").unwrap().is_draw());
        // pawns keep the game alive
        assert!(!Board::from_fen("8/8/5k2/8/8/2KP4/8/8 w - - 0 1").unwrap().is_draw());
    }

    #[test]
    fn repetition_draws() {
        let mut board = Board::default();
        let shuffle = [
            Move::new(Square::G1, Square::F3),
            Move::new(Square::B8, Square::C6),
            Move::new(Square::F3, Square::G1),
            Move::new(Square::C6, Square::B8),
        ];
        for m in shuffle {
            assert!(!board.is_draw());
            board.make_move(m);
        }
        // the starting position has returned at the same parity
        assert!(board.is_draw());
        assert!(board.has_repeated());
        assert!(!board.is_draw_ignoring_repetition());

        // a null move bounds the window the repetition scan may walk
        let mut fenced = Board::default();
        fenced.make_move(shuffle[0]);
        fenced.make_null_move();
        assert_eq!(fenced.st().plies_from_null, 0);
        assert_eq!(fenced.st().rule50, 2);
        fenced.unmake_null_move();
        assert_eq!(fenced.st().plies_from_null, 1);
    }

    #[test]
    fn flip_negates_the_score() {
        let fens = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "4k3/8/8/4pP2/8/8/8/4K3 w - e6 0 1",
        ];
        for fen in fens {
            let board = Board::from_fen(fen).unwrap();
            let mut flipped = board.clone();
            flipped.flip();
            assert_eq!(flipped.psq_score(), -board.psq_score());
            assert_eq!(
                flipped.non_pawn_material(Colour::White),
                board.non_pawn_material(Colour::Black)
            );
            let mut back = flipped.clone();
            back.flip();
            assert!(back == board, "double flip did not restore {fen}");
        }
    }

    #[test]
    fn promotion_bookkeeping() {
        let mut board = Board::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let npm_before = board.non_pawn_material(Colour::White);
        let m = Move::new_with_promo(Square::A7, Square::A8, PieceType::Queen);
        board.make_move(m);
        assert_eq!(board.piece_on(Square::A8), Some(Piece::WQ));
        assert_eq!(board.piece_count(Colour::White, PieceType::Pawn), 0);
        assert_eq!(board.piece_count(Colour::White, PieceType::Queen), 1);
        assert_eq!(
            board.non_pawn_material(Colour::White),
            npm_before + mg_value(PieceType::Queen)
        );
        board.unmake_move(m);
        assert_eq!(board.piece_on(Square::A7), Some(Piece::WP));
        assert_eq!(board.non_pawn_material(Colour::White), npm_before);
        // for the record, a pawn is worth a pawn
        assert_eq!(mg_value(PieceType::Pawn), PAWN_VALUE.mg());
    }

    #[test]
    fn en_passant_round_trip() {
        let mut board = Board::from_fen("4k3/8/8/4pP2/8/8/8/4K3 w - e6 0 1").unwrap();
        let before = board.clone();
        let ep = Move::new_with_flags(Square::F5, Square::E6, MoveFlags::EnPassant);
        assert!(board.move_is_legal(ep));
        board.make_move(ep);
        assert!(board.piece_on(Square::E5).is_none());
        assert_eq!(board.piece_on(Square::E6), Some(Piece::WP));
        board.unmake_move(ep);
        assert!(board == before);
    }

    #[test]
    fn parse_uci_handles_all_kinds() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert!(board.parse_uci("e1g1").unwrap().is_castle());
        assert!(board.parse_uci("e1c1").unwrap().is_castle());
        assert!(board.parse_uci("e1e2").unwrap().is_normal());
        assert!(board.parse_uci("e1e5").is_err());
        assert!(board.parse_uci("xyzw").is_err());

        let board = Board::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let promo = board.parse_uci("a7a8q").unwrap();
        assert_eq!(promo.promotion_type(), Some(PieceType::Queen));
    }

    #[test]
    fn exclusion_key_differs() {
        let board = Board::default();
        assert_ne!(board.key(), board.exclusion_key());
    }
}
