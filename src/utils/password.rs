//! Random password generation.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;

pub const PASSWORD_LENGTH: usize = 16;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*-_=+";

/// Generates a 16-character password containing at least one uppercase
/// letter, one lowercase letter, one digit and one symbol, drawn from the
/// operating system's CSPRNG.
pub fn generate() -> String {
    let classes: [&[u8]; 4] = [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS];
    let mut rng = OsRng;

    // One pick per class first, so short passwords still cover every class.
    let mut chars: Vec<u8> = classes
        .iter()
        .map(|set| set[rng.gen_range(0..set.len())])
        .collect();

    let pool: Vec<u8> = classes.concat();
    while chars.len() < PASSWORD_LENGTH {
        chars.push(pool[rng.gen_range(0..pool.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}
