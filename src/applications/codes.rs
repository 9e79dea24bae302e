//! Identifier, code, and token generation.

use std::collections::HashSet;

use rand::Rng;
use uuid::Uuid;

/// Confusion-free alphabet for human-shareable codes: 0/O and 1/I removed.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 9;

const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const TOKEN_LEN: usize = 32;

/// Fresh identifier for any persisted entity.
pub fn new_entity_id() -> String {
    Uuid::new_v4().to_string()
}

fn sample(rng: &mut impl Rng, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// A 9-character application code from the confusion-free alphabet.
pub fn application_code(rng: &mut impl Rng) -> String {
    sample(rng, CODE_ALPHABET, CODE_LEN)
}

/// An application code guaranteed not to collide with any code already
/// issued. The space is 32^9, so the retry loop terminates immediately in
/// practice; the check exists because codes are shared between humans and
/// must stay unique system-wide.
pub fn unique_application_code(rng: &mut impl Rng, taken: &HashSet<String>) -> String {
    loop {
        let code = application_code(rng);
        if !taken.contains(&code) {
            return code;
        }
    }
}

/// Opaque 32-character token letting an unauthenticated user resume a
/// pending application.
pub fn resume_token(rng: &mut impl Rng) -> String {
    sample(rng, TOKEN_ALPHABET, TOKEN_LEN)
}
