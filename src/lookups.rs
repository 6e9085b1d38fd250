use crate::rng::XorShiftState;

/// Implements a C-style for loop, for use in const fn.
#[macro_export]
macro_rules! cfor {
    ($init: stmt; $cond: expr; $step: expr; $body: block) => {
        {
            $init
            #[allow(while_true)]
            while $cond {
                $body;

                $step;
            }
        }
    }
}

type ZobristTables = (
    [[u64; 64]; 12],
    [u64; 8],
    [u64; 16],
    u64,
    u64,
    u64,
);

const fn init_hash_keys() -> ZobristTables {
    let mut state = XorShiftState::new();

    let mut piece_keys = [[0; 64]; 12];
    cfor!(let mut piece = 0; piece < 12; piece += 1; {
        cfor!(let mut sq = 0; sq < 64; sq += 1; {
            let key;
            (key, state) = state.next_self();
            piece_keys[piece][sq] = key;
        });
    });

    let mut ep_keys = [0; 8];
    cfor!(let mut file = 0; file < 8; file += 1; {
        let key;
        (key, state) = state.next_self();
        ep_keys[file] = key;
    });

    // One fresh key per castling right; the table entry for a rights subset
    // is the XOR of the keys of the rights it contains, so incremental
    // updates can fold rights in and out with a single XOR.
    let mut right_keys = [0; 4];
    cfor!(let mut right = 0; right < 4; right += 1; {
        let key;
        (key, state) = state.next_self();
        right_keys[right] = key;
    });
    let mut castle_keys = [0; 16];
    cfor!(let mut subset = 0usize; subset < 16; subset += 1; {
        cfor!(let mut right = 0; right < 4; right += 1; {
            if subset & (1 << right) != 0 {
                castle_keys[subset] ^= right_keys[right];
            }
        });
    });

    let (side_key, state) = state.next_self();
    let (exclusion_key, state) = state.next_self();
    let (no_pawns_key, _) = state.next_self();

    (piece_keys, ep_keys, castle_keys, side_key, exclusion_key, no_pawns_key)
}

/// Zobrist keys per piece and square. Also consulted by the material key,
/// which hashes `PIECE_KEYS[piece][count]` for each count below the piece's
/// population, treating the count as a square index.
pub static PIECE_KEYS: [[u64; 64]; 12] = init_hash_keys().0;
/// Zobrist keys per en-passant file.
pub static EP_KEYS: [u64; 8] = init_hash_keys().1;
/// Zobrist keys per castling-rights subset.
pub static CASTLE_KEYS: [u64; 16] = init_hash_keys().2;
/// Zobrist key for the side to move.
pub const SIDE_KEY: u64 = init_hash_keys().3;
/// Zobrist key for singular-exclusion searches.
pub const EXCLUSION_KEY: u64 = init_hash_keys().4;
/// Base value of the pawn hash key, so a pawnless position keys nonzero.
pub const NO_PAWNS_KEY: u64 = init_hash_keys().5;

#[cfg(test)]
mod tests {
    use super::{CASTLE_KEYS, EP_KEYS, PIECE_KEYS, SIDE_KEY};

    #[test]
    fn all_piece_keys_different() {
        let mut hashkeys = PIECE_KEYS.iter().flat_map(|&k| k).collect::<Vec<u64>>();
        hashkeys.sort_unstable();
        let len_before = hashkeys.len();
        hashkeys.dedup();
        assert_eq!(len_before, hashkeys.len());
    }

    #[test]
    fn all_ep_keys_different() {
        let mut hashkeys = EP_KEYS.to_vec();
        hashkeys.sort_unstable();
        let len_before = hashkeys.len();
        hashkeys.dedup();
        assert_eq!(len_before, hashkeys.len());
    }

    #[test]
    fn castle_keys_compose_by_xor() {
        assert_eq!(CASTLE_KEYS[0], 0);
        for subset in 0usize..16 {
            let mut expected = 0;
            for right in 0..4 {
                if subset & (1 << right) != 0 {
                    expected ^= CASTLE_KEYS[1 << right];
                }
            }
            assert_eq!(CASTLE_KEYS[subset], expected);
        }
    }

    #[test]
    fn side_key_nonzero() {
        assert_ne!(SIDE_KEY, 0);
    }
}
