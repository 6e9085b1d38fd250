pub mod board;
pub mod chessmove;
pub mod fen;
pub mod magic;
pub mod piece;
pub mod piecelist;
pub mod psqt;
pub mod score;
pub mod squareset;
pub mod types;
