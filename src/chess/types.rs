use std::{
    fmt::{self, Display},
    mem::size_of,
    ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Index, IndexMut, Not},
    str::FromStr,
};

use crate::chess::{
    piece::{Colour, PieceType},
    score::S,
    squareset::SquareSet,
};

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

const _FILE_ASSERT: () = assert!(size_of::<File>() == size_of::<Option<File>>());

impl File {
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            // SAFETY: inner is less than 8, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(index) })
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn abs_diff(self, other: Self) -> u8 {
        (self as u8).abs_diff(other as u8)
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: all values are within `0..8`.
        (0..8u8).map(|i| unsafe { std::mem::transmute::<u8, Self>(i) })
    }

    pub const fn with(self, rank: Rank) -> Square {
        Square::from_rank_file(rank, self)
    }
}

impl<T> Index<File> for [T; 8] {
    type Output = T;

    fn index(&self, index: File) -> &Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

impl<T> IndexMut<File> for [T; 8] {
    fn index_mut(&mut self, index: File) -> &mut Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked_mut(index as usize) }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Rank {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

const _RANK_ASSERT: () = assert!(size_of::<Rank>() == size_of::<Option<Rank>>());

impl Rank {
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            // SAFETY: inner is less than 8, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(index) })
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The rank as seen from `side`: rank 2 relative to Black is rank 7.
    pub const fn relative_to(self, side: Colour) -> Self {
        if matches!(side, Colour::White) {
            self
        } else {
            // SAFETY: 7 - rank stays within `0..8`.
            unsafe { std::mem::transmute(7 - self as u8) }
        }
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: all values are within `0..8`.
        (0..8u8).map(|i| unsafe { std::mem::transmute::<u8, Self>(i) })
    }
}

#[rustfmt::skip]
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Square {
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

const _SQUARE_ASSERT: () = assert!(size_of::<Square>() == size_of::<Option<Square>>());

static SQUARE_NAMES: [&str; 64] = [
    "a1", "b1", "c1", "d1", "e1", "f1", "g1", "h1", "a2", "b2", "c2", "d2", "e2", "f2", "g2", "h2",
    "a3", "b3", "c3", "d3", "e3", "f3", "g3", "h3", "a4", "b4", "c4", "d4", "e4", "f4", "g4", "h4",
    "a5", "b5", "c5", "d5", "e5", "f5", "g5", "h5", "a6", "b6", "c6", "d6", "e6", "f6", "g6", "h6",
    "a7", "b7", "c7", "d7", "e7", "f7", "g7", "h7", "a8", "b8", "c8", "d8", "e8", "f8", "g8", "h8",
];

impl Square {
    pub const fn from_rank_file(rank: Rank, file: File) -> Self {
        // SAFETY: rank and file are constrained so inner is always < 64.
        unsafe { std::mem::transmute(rank as u8 * 8 + file as u8) }
    }

    pub const fn new(inner: u8) -> Option<Self> {
        if inner < 64 {
            // SAFETY: inner is less than 64, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(inner) })
        } else {
            None
        }
    }

    /// SAFETY: you may only call this function with `inner` less than 64.
    pub const unsafe fn new_unchecked(inner: u8) -> Self {
        debug_assert!(inner < 64);
        // SAFETY: caller's precondition.
        unsafe { std::mem::transmute(inner) }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn file(self) -> File {
        // SAFETY: self % 8 is always within `0..8`.
        unsafe { std::mem::transmute(self as u8 % 8) }
    }

    pub const fn rank(self) -> Rank {
        // SAFETY: self / 8 is always within `0..8`.
        unsafe { std::mem::transmute(self as u8 / 8) }
    }

    /// Vertical mirror of the square.
    pub const fn flip_rank(self) -> Self {
        // SAFETY: XOR with 0b111000 stays within `0..64`.
        unsafe { std::mem::transmute(self as u8 ^ 0b11_1000) }
    }

    pub const fn relative_to(self, side: Colour) -> Self {
        if matches!(side, Colour::White) {
            self
        } else {
            self.flip_rank()
        }
    }

    pub const fn relative_rank(self, side: Colour) -> Rank {
        self.relative_to(side).rank()
    }

    pub const fn distance(a: Self, b: Self) -> u8 {
        let file_diff = a.file().abs_diff(b.file());
        let rank_diff = (a.rank() as u8).abs_diff(b.rank() as u8);
        if file_diff > rank_diff {
            file_diff
        } else {
            rank_diff
        }
    }

    pub const fn signed_inner(self) -> i8 {
        #![allow(clippy::cast_possible_wrap)]
        self as i8
    }

    pub const fn add(self, offset: u8) -> Option<Self> {
        Self::new(self as u8 + offset)
    }

    pub const fn sub(self, offset: u8) -> Option<Self> {
        if self as u8 >= offset {
            Self::new(self as u8 - offset)
        } else {
            None
        }
    }

    pub const fn as_set(self) -> SquareSet {
        SquareSet::from_inner(1 << self as u8)
    }

    /// The square one pawn-push ahead for `side`, if on the board.
    pub const fn pawn_push(self, side: Colour) -> Option<Self> {
        if matches!(side, Colour::White) {
            self.add(8)
        } else {
            self.sub(8)
        }
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: all values are within `0..64`.
        (0..64u8).map(|i| unsafe { std::mem::transmute::<u8, Self>(i) })
    }

    pub fn name(self) -> &'static str {
        SQUARE_NAMES[self]
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", SQUARE_NAMES[*self])
    }
}

impl FromStr for Square {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SQUARE_NAMES
            .iter()
            .position(|&name| name == s)
            .and_then(|index| -> Option<u8> { index.try_into().ok() })
            .and_then(Self::new)
            .ok_or("invalid square name")
    }
}

impl From<Square> for u16 {
    fn from(square: Square) -> Self {
        square as Self
    }
}

impl<T> Index<Square> for [T; 64] {
    type Output = T;

    fn index(&self, index: Square) -> &Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

impl<T> IndexMut<Square> for [T; 64] {
    fn index_mut(&mut self, index: Square) -> &mut Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked_mut(index as usize) }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum CastlingSide {
    King,
    Queen,
}

impl CastlingSide {
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl<T> Index<CastlingSide> for [T; 2] {
    type Output = T;

    fn index(&self, index: CastlingSide) -> &Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

impl<T> IndexMut<CastlingSide> for [T; 2] {
    fn index_mut(&mut self, index: CastlingSide) -> &mut Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked_mut(index as usize) }
    }
}

/// Castling rights as a 4-bit mask, one bit per (colour, side) right.
///
/// The mask representation carries the hashing scheme: the Zobrist table has
/// one entry per subset, entries compose by XOR, and per-square "rights
/// extinguished by touching this square" masks fold in with a single AND.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: Self = Self(0);
    pub const WHITE_OO: Self = Self(1);
    pub const WHITE_OOO: Self = Self(2);
    pub const BLACK_OO: Self = Self(4);
    pub const BLACK_OOO: Self = Self(8);
    pub const WHITE_ANY: Self = Self(3);
    pub const BLACK_ANY: Self = Self(12);
    pub const ANY: Self = Self(15);

    pub const fn make(colour: Colour, side: CastlingSide) -> Self {
        Self(1 << (side as u8 + 2 * colour as u8))
    }

    pub const fn for_colour(colour: Colour) -> Self {
        Self(3 << (2 * colour as u8))
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Index into the 16-entry Zobrist castle table.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl BitOr for CastlingRights {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CastlingRights {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for CastlingRights {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for CastlingRights {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for CastlingRights {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0 & 0xF)
    }
}

/// Per-ply reversible record.
///
/// The first group of fields is copied forward by `make_move` and never
/// touched by `unmake_move` (popping the record restores them); the second
/// group is recomputed by every `make_move`.
#[derive(Clone, Debug)]
pub struct State {
    // Copied when making a move.
    pub pawn_key: u64,
    pub material_key: u64,
    pub non_pawn_material: [i32; 2],
    pub castle_rights: CastlingRights,
    pub rule50: i32,
    pub plies_from_null: i32,
    pub psq: S,
    pub ep_square: Option<Square>,

    // Recomputed when making a move.
    pub key: u64,
    pub checkers: SquareSet,
    pub captured: Option<PieceType>,
}

impl State {
    pub const fn new() -> Self {
        Self {
            pawn_key: 0,
            material_key: 0,
            non_pawn_material: [0; 2],
            castle_rights: CastlingRights::NONE,
            rule50: 0,
            plies_from_null: 0,
            psq: S::NULL,
            ep_square: None,
            key: 0,
            checkers: SquareSet::EMPTY,
            captured: None,
        }
    }

    /// The copied prefix for the next ply; the tail starts zeroed and is
    /// filled in by `make_move`.
    pub const fn copied(&self) -> Self {
        Self {
            pawn_key: self.pawn_key,
            material_key: self.material_key,
            non_pawn_material: self.non_pawn_material,
            castle_rights: self.castle_rights,
            rule50: self.rule50,
            plies_from_null: self.plies_from_null,
            psq: self.psq,
            ep_square: self.ep_square,
            key: 0,
            checkers: SquareSet::EMPTY,
            captured: None,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// Precomputed check-detection data for the side to move: the enemy king,
/// our pinned pieces, our discovered-check candidates, and the squares from
/// which each piece type would give direct check.
pub struct CheckInfo {
    pub ksq: Square,
    pub pinned: SquareSet,
    pub dc_candidates: SquareSet,
    pub check_squares: [SquareSet; 6],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_flipping() {
        assert_eq!(Square::A1.flip_rank(), Square::A8);
        assert_eq!(Square::H1.flip_rank(), Square::H8);
        assert_eq!(Square::E3.flip_rank(), Square::E6);
    }

    #[test]
    fn square_relative_to() {
        assert_eq!(Square::A1.relative_to(Colour::White), Square::A1);
        assert_eq!(Square::A1.relative_to(Colour::Black), Square::A8);
        assert_eq!(Square::G1.relative_to(Colour::Black), Square::G8);
    }

    #[test]
    fn rights_compose() {
        let mut rights = CastlingRights::WHITE_OO | CastlingRights::BLACK_ANY;
        assert!(rights.contains(CastlingRights::BLACK_OOO));
        assert!(!rights.contains(CastlingRights::WHITE_OOO));
        rights &= !CastlingRights::for_colour(Colour::Black);
        assert_eq!(rights, CastlingRights::WHITE_OO);
        assert_eq!(
            CastlingRights::make(Colour::Black, CastlingSide::Queen),
            CastlingRights::BLACK_OOO
        );
    }

    #[test]
    fn copied_state_zeroes_the_tail() {
        let mut st = State::new();
        st.key = 123;
        st.rule50 = 7;
        st.captured = Some(PieceType::Rook);
        let next = st.copied();
        assert_eq!(next.rule50, 7);
        assert_eq!(next.key, 0);
        assert_eq!(next.captured, None);
    }
}
