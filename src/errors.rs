use thiserror::Error;

use crate::chess::piece::Colour;

/// Returned by the consistency audit; names the check that failed.
pub type PositionValidityError = String;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenParseError {
    #[error("FEN string is missing board part")]
    MissingBoard,
    #[error("FEN string is missing side to move")]
    MissingSide,
    #[error("FEN board part has {0} rank segments, expected 8")]
    BoardSegments(usize),
    #[error("FEN board part has adjacent digits")]
    AdjacentDigits,
    #[error("FEN rank segment does not describe exactly 8 squares")]
    BadSquaresInSegment,
    #[error("unexpected character in FEN: {0:?}")]
    UnexpectedCharacter(char),
    #[error("pawns on a back rank")]
    PawnsOnBackranks,
    #[error("no {colour} king")]
    MissingKing { colour: Colour },
    #[error("more than one {colour} king")]
    DuplicateKings { colour: Colour },
    #[error("invalid side to move: {0:?}")]
    InvalidSide(String),
    #[error("invalid castling field: {0:?}")]
    InvalidCastling(String),
    #[error("castling right {0:?} names no rook")]
    CastlingWithoutRook(char),
    #[error("invalid en passant square: {0:?}")]
    InvalidEnPassant(String),
    #[error("invalid halfmove clock: {0:?}")]
    InvalidHalfmoveClock(String),
    #[error("invalid fullmove number: {0:?}")]
    InvalidFullmoveNumber(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("invalid move length {0}")]
    InvalidLength(usize),
    #[error("invalid from-square {0:?}")]
    InvalidFromSquare(String),
    #[error("invalid to-square {0:?}")]
    InvalidToSquare(String),
    #[error("invalid promotion piece {0}")]
    InvalidPromotionPiece(char),
    #[error("illegal move {0}")]
    IllegalMove(String),
}
