use rand::Rng;
use rand::rngs::OsRng;

use crate::error::LobbyError;

pub const CODE_LENGTH: usize = 6;
pub const SESSION_ID_LENGTH: usize = 8;

const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random token over `A-Z0-9`.
pub fn generate_token<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}

/// Lobby code for a new host, drawn from the OS CSPRNG.
pub fn generate_code() -> String {
    generate_token(&mut OsRng, CODE_LENGTH)
}

/// Per-session identity used by the public queue.
pub fn generate_session_id() -> String {
    generate_token(&mut OsRng, SESSION_ID_LENGTH)
}

/// Trims and uppercases user input, rejecting anything that could never have
/// been issued by [`generate_code`].
pub fn normalize_code(input: &str) -> Result<String, LobbyError> {
    let code = input.trim().to_ascii_uppercase();
    let valid = code.len() == CODE_LENGTH && code.bytes().all(|b| CHARS.contains(&b));
    if valid {
        Ok(code)
    } else {
        Err(LobbyError::InvalidCode(input.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
            assert_eq!(normalize_code(&code).unwrap(), code);
        }
        assert_eq!(generate_session_id().len(), SESSION_ID_LENGTH);
    }

    #[test]
    fn seeded_tokens_are_reproducible() {
        let a = generate_token(&mut StdRng::seed_from_u64(12345), 6);
        let b = generate_token(&mut StdRng::seed_from_u64(12345), 6);
        assert_eq!(a, b);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_code(" ab12cd ").unwrap(), "AB12CD");
        assert!(matches!(normalize_code("AB12C"), Err(LobbyError::InvalidCode(_))));
        assert!(normalize_code("AB-2CD").is_err());
        assert!(normalize_code("ÄB12CD").is_err());
    }
}
