use std::ops::Deref;

use arrayvec::ArrayVec;

use crate::{
    cfor,
    chess::{
        board::Board,
        chessmove::{Move, MoveFlags},
        magic::{bishop_attacks, bishop_attacks_on_the_fly, rook_attacks, rook_attacks_on_the_fly},
        piece::{Black, Col, Colour, PieceType, White},
        squareset::SquareSet,
        types::{CastlingRights, CastlingSide, Square},
    },
};

pub const MAX_POSITION_MOVES: usize = 218;

/// A bounded list of generated moves; never heap-allocates.
#[derive(Clone, Debug, Default)]
pub struct MoveList {
    inner: ArrayVec<Move, MAX_POSITION_MOVES>,
}

impl MoveList {
    pub fn new() -> Self {
        Self { inner: ArrayVec::new() }
    }

    pub(crate) fn push(&mut self, m: Move) {
        self.inner.push(m);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn contains(&self, m: Move) -> bool {
        self.inner.contains(&m)
    }
}

impl Deref for MoveList {
    type Target = [Move];

    fn deref(&self) -> &[Move] {
        &self.inner
    }
}

const fn in_between(sq1: Square, sq2: Square) -> SquareSet {
    const M1: u64 = 0xFFFF_FFFF_FFFF_FFFF;
    const A2A7: u64 = 0x0001_0101_0101_0100;
    const B2G7: u64 = 0x0040_2010_0804_0200;
    const H1B7: u64 = 0x0002_0408_1020_4080;
    let sq1 = sq1.index();
    let sq2 = sq2.index();
    let btwn = (M1 << sq1) ^ (M1 << sq2);
    let file = ((sq2 & 7).wrapping_add((sq1 & 7).wrapping_neg())) as u64;
    let rank = (((sq2 | 7).wrapping_sub(sq1)) >> 3) as u64;
    let mut line = ((file & 7).wrapping_sub(1)) & A2A7;
    line = line.wrapping_add(2 * ((rank & 7).wrapping_sub(1) >> 58));
    line = line.wrapping_add(((rank.wrapping_sub(file) & 15).wrapping_sub(1)) & B2G7);
    line = line.wrapping_add(((rank.wrapping_add(file) & 15).wrapping_sub(1)) & H1B7);
    line = line.wrapping_mul(btwn & btwn.wrapping_neg());
    SquareSet::from_inner(line & btwn)
}

/// The squares strictly between two squares, empty unless they share a rank,
/// file, or diagonal.
pub static RAY_BETWEEN: [[SquareSet; 64]; 64] = {
    let mut res = [[SquareSet::EMPTY; 64]; 64];
    cfor!(let mut from = 0; from < 64; from += 1; {
        cfor!(let mut to = 0; to < 64; to += 1; {
            // SAFETY: both indices are within `0..64`.
            res[from][to] = in_between(
                unsafe { Square::new_unchecked(from as u8) },
                unsafe { Square::new_unchecked(to as u8) },
            );
        });
    });
    res
};

/// The full line through two squares, endpoints included; empty if they are
/// not aligned. `RAY_FULL[a][b].contains_square(c)` tests three-square
/// alignment.
pub static RAY_FULL: [[SquareSet; 64]; 64] = {
    let mut rook_rays = [SquareSet::EMPTY; 64];
    let mut bishop_rays = [SquareSet::EMPTY; 64];
    cfor!(let mut sq = 0; sq < 64; sq += 1; {
        // SAFETY: sq is within `0..64`.
        let square = unsafe { Square::new_unchecked(sq as u8) };
        rook_rays[sq] = rook_attacks_on_the_fly(square, SquareSet::EMPTY);
        bishop_rays[sq] = bishop_attacks_on_the_fly(square, SquareSet::EMPTY);
    });

    let mut res = [[SquareSet::EMPTY; 64]; 64];
    cfor!(let mut from = 0; from < 64; from += 1; {
        let from_mask = SquareSet::from_inner(1 << from);
        cfor!(let mut to = 0; to < 64; to += 1; {
            let to_mask = SquareSet::from_inner(1 << to);
            if from == to {
                // leave empty
            } else if rook_rays[from].inner() & to_mask.inner() != 0 {
                res[from][to] = SquareSet::intersection(
                    rook_rays[from].union(from_mask),
                    rook_rays[to].union(to_mask),
                );
            } else if bishop_rays[from].inner() & to_mask.inner() != 0 {
                res[from][to] = SquareSet::intersection(
                    bishop_rays[from].union(from_mask),
                    bishop_rays[to].union(to_mask),
                );
            }
        });
    });
    res
};

const fn init_jumping_attacks<const IS_KNIGHT: bool>() -> [SquareSet; 64] {
    let mut attacks = [SquareSet::EMPTY; 64];
    let deltas: &[i32; 8] = if IS_KNIGHT {
        &[17, 15, 10, 6, -17, -15, -10, -6]
    } else {
        &[9, 8, 7, 1, -9, -8, -7, -1]
    };

    cfor!(let mut sq = 0i32; sq < 64; sq += 1; {
        let mut attacks_bb = 0u64;
        cfor!(let mut idx = 0; idx < 8; idx += 1; {
            let attacked = sq + deltas[idx];
            #[allow(clippy::cast_sign_loss)]
            if 0 <= attacked && attacked < 64 {
                // SAFETY: both values are within `0..64`.
                let (a, b) = unsafe {
                    (Square::new_unchecked(sq as u8), Square::new_unchecked(attacked as u8))
                };
                if Square::distance(a, b) <= 2 {
                    attacks_bb |= 1 << attacked;
                }
            }
        });
        attacks[sq as usize] = SquareSet::from_inner(attacks_bb);
    });

    attacks
}

pub fn knight_attacks(sq: Square) -> SquareSet {
    static KNIGHT_ATTACKS: [SquareSet; 64] = init_jumping_attacks::<true>();
    KNIGHT_ATTACKS[sq]
}

pub fn king_attacks(sq: Square) -> SquareSet {
    static KING_ATTACKS: [SquareSet; 64] = init_jumping_attacks::<false>();
    KING_ATTACKS[sq]
}

/// The squares attacked by pawns of `colour` standing on `set`.
pub fn pawn_attacks(set: SquareSet, colour: Colour) -> SquareSet {
    if colour == Colour::White {
        set.north_east_one() | set.north_west_one()
    } else {
        set.south_east_one() | set.south_west_one()
    }
}

pub fn attacks_by_type(pt: PieceType, sq: Square, blockers: SquareSet) -> SquareSet {
    match pt {
        PieceType::Pawn => {
            debug_assert!(false, "pawn attacks need a colour");
            SquareSet::EMPTY
        }
        PieceType::Knight => knight_attacks(sq),
        PieceType::Bishop => bishop_attacks(sq, blockers),
        PieceType::Rook => rook_attacks(sq, blockers),
        PieceType::Queen => bishop_attacks(sq, blockers) | rook_attacks(sq, blockers),
        PieceType::King => king_attacks(sq),
    }
}

const PROMOS: [PieceType; 4] = [
    PieceType::Queen,
    PieceType::Rook,
    PieceType::Bishop,
    PieceType::Knight,
];

fn pawn_origin(to: Square, delta: i8) -> Square {
    // SAFETY: the shift that produced `to` guarantees the origin is on the board.
    unsafe { Square::new_unchecked((to.signed_inner() - delta) as u8) }
}

impl Board {
    /// Generates pseudo-legal moves for the side to move into `list`. When
    /// in check, only evasions are produced; king steps among them are
    /// computed with the king removed from occupancy, so they are fully
    /// legal. Filter everything through `pl_move_is_legal` for the legal
    /// move list.
    pub fn generate_moves(&self, list: &mut MoveList) {
        list.clear();
        if self.side_to_move() == Colour::White {
            self.generate_for::<White>(list);
        } else {
            self.generate_for::<Black>(list);
        }
    }

    fn generate_for<C: Col>(&self, list: &mut MoveList) {
        if self.in_check() {
            self.generate_evasions::<C>(list);
        } else {
            self.generate_non_evasions::<C>(list);
        }
    }

    fn generate_non_evasions<C: Col>(&self, list: &mut MoveList) {
        let us = C::COLOUR;
        let them = !us;
        let occupied = self.pieces();
        let quiet_targets = !occupied;
        let capture_targets = self.pieces_c(them);

        self.generate_pawn_moves::<C>(list, quiet_targets, capture_targets);

        if let Some(ep_sq) = self.ep_square() {
            for from in pawn_attacks(ep_sq.as_set(), them) & self.pieces_cp(us, PieceType::Pawn) {
                list.push(Move::new_with_flags(from, ep_sq, MoveFlags::EnPassant));
            }
        }

        let targets = quiet_targets | capture_targets;
        for pt in [PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen] {
            for from in self.pieces_cp(us, pt) {
                for to in attacks_by_type(pt, from, occupied) & targets {
                    list.push(Move::new(from, to));
                }
            }
        }

        let ksq = self.king_sq(us);
        for to in king_attacks(ksq) & targets {
            list.push(Move::new(ksq, to));
        }

        self.generate_castling::<C>(list);
    }

    fn generate_evasions<C: Col>(&self, list: &mut MoveList) {
        let us = C::COLOUR;
        let them = !us;
        let ksq = self.king_sq(us);
        let checkers = self.checkers();

        // With the king still on its square, a slider's attack stops there,
        // and stepping away along the ray would look safe.
        let occ_without_king = self.pieces() ^ ksq.as_set();
        for to in king_attacks(ksq) & !self.pieces_c(us) {
            if (self.attackers_to_occ(to, occ_without_king) & self.pieces_c(them)).is_empty() {
                list.push(Move::new(ksq, to));
            }
        }

        if checkers.many() {
            // double check: only king moves can resolve it
            return;
        }

        let checksq = checkers.first().unwrap();
        let block_squares = RAY_BETWEEN[ksq.index()][checksq.index()];
        let targets = block_squares | checkers;

        self.generate_pawn_moves::<C>(list, block_squares, checkers);

        if let Some(ep_sq) = self.ep_square() {
            // En passant can only answer a check by capturing the checking
            // pawn, or (for a slider check) by landing on the ray.
            let capsq = ep_sq.pawn_push(them).unwrap();
            if capsq == checksq || block_squares.contains_square(ep_sq) {
                for from in pawn_attacks(ep_sq.as_set(), them) & self.pieces_cp(us, PieceType::Pawn)
                {
                    list.push(Move::new_with_flags(from, ep_sq, MoveFlags::EnPassant));
                }
            }
        }

        for pt in [PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen] {
            for from in self.pieces_cp(us, pt) {
                for to in attacks_by_type(pt, from, self.pieces()) & targets {
                    list.push(Move::new(from, to));
                }
            }
        }
    }

    fn generate_pawn_moves<C: Col>(
        &self,
        list: &mut MoveList,
        quiet_targets: SquareSet,
        capture_targets: SquareSet,
    ) {
        let us = C::COLOUR;
        let our_pawns = self.pieces_cp(us, PieceType::Pawn);
        let empty = !self.pieces();

        let (promo_rank, double_push_rank) = if C::WHITE {
            (SquareSet::RANK_7, SquareSet::RANK_3)
        } else {
            (SquareSet::RANK_2, SquareSet::RANK_6)
        };
        let (up, up_east, up_west): (i8, i8, i8) =
            if C::WHITE { (8, 9, 7) } else { (-8, -7, -9) };

        let shift_up = |set: SquareSet| {
            if C::WHITE {
                set.north_one()
            } else {
                set.south_one()
            }
        };
        let shift_up_east = |set: SquareSet| {
            if C::WHITE {
                set.north_east_one()
            } else {
                set.south_east_one()
            }
        };
        let shift_up_west = |set: SquareSet| {
            if C::WHITE {
                set.north_west_one()
            } else {
                set.south_west_one()
            }
        };

        let pawns_on_7 = our_pawns & promo_rank;
        let pawns_not_on_7 = our_pawns & !promo_rank;

        // single and double pushes
        let push_once = shift_up(pawns_not_on_7) & empty;
        let push_twice = shift_up(push_once & double_push_rank) & empty;
        for to in push_once & quiet_targets {
            list.push(Move::new(pawn_origin(to, up), to));
        }
        for to in push_twice & quiet_targets {
            list.push(Move::new(pawn_origin(to, 2 * up), to));
        }

        // captures
        for to in shift_up_east(pawns_not_on_7) & capture_targets {
            list.push(Move::new(pawn_origin(to, up_east), to));
        }
        for to in shift_up_west(pawns_not_on_7) & capture_targets {
            list.push(Move::new(pawn_origin(to, up_west), to));
        }

        // promotions, pushed and capturing
        if pawns_on_7.non_empty() {
            for to in shift_up(pawns_on_7) & empty & quiet_targets {
                for promo in PROMOS {
                    list.push(Move::new_with_promo(pawn_origin(to, up), to, promo));
                }
            }
            for to in shift_up_east(pawns_on_7) & capture_targets {
                for promo in PROMOS {
                    list.push(Move::new_with_promo(pawn_origin(to, up_east), to, promo));
                }
            }
            for to in shift_up_west(pawns_on_7) & capture_targets {
                for promo in PROMOS {
                    list.push(Move::new_with_promo(pawn_origin(to, up_west), to, promo));
                }
            }
        }
    }

    fn generate_castling<C: Col>(&self, list: &mut MoveList) {
        debug_assert!(!self.in_check());
        let us = C::COLOUR;
        let them = !us;

        for side in [CastlingSide::King, CastlingSide::Queen] {
            if !self.can_castle(CastlingRights::make(us, side)) {
                continue;
            }
            if self.castle_impeded(us, side) {
                continue;
            }
            let Some(rfrom) = self.castle_rook_square(us, side) else {
                continue;
            };
            let kfrom = self.king_sq(us);
            let kto = match side {
                CastlingSide::King => Square::G1,
                CastlingSide::Queen => Square::C1,
            }
            .relative_to(us);

            // the king may not pass through an attacked square
            let step: i8 = if kto > kfrom { 1 } else { -1 };
            let mut sq = kfrom;
            let mut path_attacked = false;
            while sq != kto {
                // SAFETY: sq walks between two on-board squares on one rank.
                sq = unsafe { Square::new_unchecked((sq.signed_inner() + step) as u8) };
                if (self.attackers_to(sq) & self.pieces_c(them)).non_empty() {
                    path_attacked = true;
                    break;
                }
            }
            if path_attacked {
                continue;
            }

            // in Chess960 the departing rook may have shielded the king on
            // the back rank
            if self.is_chess960()
                && (rook_attacks(kto, self.pieces() ^ rfrom.as_set())
                    & self.pieces_cpp(them, PieceType::Rook, PieceType::Queen))
                .non_empty()
            {
                continue;
            }

            list.push(Move::new_with_flags(kfrom, rfrom, MoveFlags::Castle));
        }
    }

    /// All fully legal moves in the position.
    pub fn legal_moves(&self) -> ArrayVec<Move, MAX_POSITION_MOVES> {
        let pinned = self.pinned_pieces();
        let mut list = MoveList::new();
        self.generate_moves(&mut list);
        let mut legal = ArrayVec::new();
        for &m in list.iter() {
            if self.pl_move_is_legal(m, pinned) {
                legal.push(m);
            }
        }
        legal
    }
}
