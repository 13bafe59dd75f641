/*
*	Copyright (C) 2025 Kendall Tauser
*
*	This program is free software; you can redistribute it and/or modify
*	it under the terms of the GNU General Public License as published by
*	the Free Software Foundation; either version 2 of the License, or
*	(at your option) any later version.
*
*	This program is distributed in the hope that it will be useful,
*	but WITHOUT ANY WARRANTY; without even the implied warranty of
*	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
*	GNU General Public License for more details.
*
*	You should have received a copy of the GNU General Public License along
*	with this program; if not, write to the Free Software Foundation, Inc.,
*	51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.
 */

use rand::{rngs::OsRng, Rng, TryRngCore};
use rand_chacha::ChaCha8Rng;

use crate::{errors::GqlFuzzerError, grammar::Intrinsic};

/// Base charset for random runes: ASCII letters, digits, space, a little
/// punctuation and a handful of non-ASCII runes to stress Unicode handling
/// downstream.
const CHARSET: &str = "abcdefghijklmnopqursuvwxyzABCDEFGHIJKLMONPQUSTUVWXYZ _.!?0123456789ŨŪŹŕùûáéòµ¶";

/// Fixed escape table shared by the quoted-character-sequence intrinsics.
const ESCAPE_SEQUENCES: [&str; 11] = [
    r"\\",
    r"\'",
    r#"\""#,
    r"\`",
    r"\b",
    r"\n",
    r"\r",
    r"\f",
    r#"\""#,
    r"\u1E00",
    r"\UF1A4",
];

const IDENTIFIER_START_CHARSET: &str =
    "_abcdefghijklmnopqursuvwxyzABCDEFGHIJKLMONPQUSTUVWXYZ";
const IDENTIFIER_EXTEND_CHARSET: &str =
    "_abcdefghijklmnopqursuvwxyzABCDEFGHIJKLMONPQUSTUVWXYZ0123456789";

impl Intrinsic {
    /// Emit one string for this intrinsic. Structural coin flips draw from
    /// the engine's seeded stream; the runes themselves come from the
    /// prime-based sampler over OS entropy, which is never reseeded.
    pub fn emit(&self, rng: &mut ChaCha8Rng) -> Result<String, GqlFuzzerError> {
        match self {
            Self::Whitespace | Self::TruncatingWhitespace => Ok(" ".into()),
            Self::Newline => Ok("\n".into()),
            Self::CharacterRepresentation => Ok(rand_char(CHARSET)?.to_string()),
            Self::StringLiteralCharacter => Ok("somerandomstring".into()),
            Self::IdentifierStart => Ok(rand_char(IDENTIFIER_START_CHARSET)?.to_string()),
            Self::IdentifierExtend => Ok(rand_char(IDENTIFIER_EXTEND_CHARSET)?.to_string()),
            // TODO: populate these with richer Unicode once downstream
            // parsers stop choking on the simple cases.
            Self::OtherDigit
            | Self::OtherLanguageCharacter
            | Self::BidirectionalControlCharacter
            | Self::SimpleCommentCharacter
            | Self::BracketedCommentContents => Ok("".into()),
            Self::SingleQuotedCharacterSequence => quoted_sequence(rng, '\'', "\"`", "''"),
            Self::DoubleQuotedCharacterSequence => quoted_sequence(rng, '"', "'`", "\"\""),
            Self::AccentQuotedCharacterSequence => quoted_sequence(rng, '`', "\"'", "``"),
        }
    }
}

/// One quoted character sequence, parameterized by the quote character, the
/// two other quote characters (allowed unescaped in the body) and the
/// doubled-quote escape. One time in ten the at-delimited form is emitted
/// instead of the normal form; the at form only ever permits the doubled
/// quote as an escape.
fn quoted_sequence(
    rng: &mut ChaCha8Rng,
    quote: char,
    other_quotes: &str,
    doubled: &str,
) -> Result<String, GqlFuzzerError> {
    let cnt = rng.random_range(0..50);
    let charset = format!("{}{}", CHARSET, other_quotes);

    if rng.random_range(0..100) > 90 {
        let guts = rand_string_escaped(rng, cnt, &charset, &[doubled])?;
        let delimiter = if quote == '`' { '`' } else { '"' };
        Ok(format!("@{}{}{}", delimiter, guts, delimiter))
    } else {
        let mut escapes: Vec<&str> = ESCAPE_SEQUENCES.to_vec();
        escapes.push(doubled);
        let guts = rand_string_escaped(rng, cnt, &charset, &escapes)?;
        Ok(format!("{}{}{}", quote, guts, quote))
    }
}

/// Random string of `n` runes from the charset, occasionally suffixed with
/// one escape sequence. The escape gate is two stacked draws; the effective
/// rate is about one string in twenty-five, not the 20% a single draw
/// would give.
fn rand_string_escaped(
    rng: &mut ChaCha8Rng,
    n: usize,
    charset: &str,
    escape_sequences: &[&str],
) -> Result<String, GqlFuzzerError> {
    let mut s = rand_string(n, charset)?;

    if !escape_sequences.is_empty() && rng.random_range(0..100) > 80 {
        let m = rng.random_range(0..100);
        if m >= 80 {
            s.push_str(escape_sequences[rng.random_range(0..escape_sequences.len())]);
        }
    }

    Ok(s)
}

/// Random string of `n` runes drawn from the charset with the prime
/// sampler.
pub fn rand_string(n: usize, charset: &str) -> Result<String, GqlFuzzerError> {
    let runes: Vec<char> = charset.chars().collect();
    let mut s = String::with_capacity(n);

    for _ in 0..n {
        let p = random_prime(runes.len() as u32)
            .map_err(|e| GqlFuzzerError::RandomSource(format!("random string n {}: {}", n, e)))?;
        s.push(runes[(p % runes.len() as u64) as usize]);
    }

    Ok(s)
}

pub fn rand_char(charset: &str) -> Result<char, GqlFuzzerError> {
    let s = rand_string(1, charset)?;
    s.chars()
        .next()
        .ok_or_else(|| GqlFuzzerError::RandomSource("empty charset".into()))
}

/// Random prime of the requested bit size, drawn from OS entropy. This is
/// deliberately expensive; the modulo reduction of a fresh prime gives
/// high-entropy rune picks suitable for fuzzing. Bit sizes are clamped to
/// what a u64 candidate can hold.
fn random_prime(bits: u32) -> Result<u64, String> {
    let bits = bits.clamp(2, 63);

    loop {
        let mut candidate = OsRng.try_next_u64().map_err(|e| e.to_string())?;
        candidate &= (1u64 << bits) - 1;
        candidate |= 1u64 << (bits - 1);
        candidate |= 1;

        if is_prime_u64(candidate) {
            return Ok(candidate);
        }
    }
}

/// Deterministic Miller-Rabin for u64. The witness set below is exact for
/// the full 64-bit range.
fn is_prime_u64(n: u64) -> bool {
    const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

    if n < 2 {
        return false;
    }
    for p in WITNESSES {
        if n == p {
            return true;
        }
        if n % p == 0 {
            return false;
        }
    }

    let mut d = n - 1;
    let mut r = 0;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }

    'witness: for a in WITNESSES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 0..r - 1 {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }

    true
}

fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1;
    base %= m;
    while exp > 0 {
        if exp % 2 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp /= 2;
    }
    result
}

#[cfg(test)]
use rand_chacha::rand_core::SeedableRng;

#[test]
fn test_is_prime_u64() {
    for p in [2u64, 3, 5, 7, 97, 7919, 2147483647, 9223372036854775783] {
        assert!(is_prime_u64(p), "{} should be prime", p);
    }
    for c in [0u64, 1, 4, 100, 7917, 2147483649, 9223372036854775781] {
        assert!(!is_prime_u64(c), "{} should be composite", c);
    }
}

#[test]
fn test_rand_string_stays_in_charset() {
    let s = rand_string(64, "abc").unwrap();
    assert_eq!(64, s.chars().count());
    assert!(s.chars().all(|c| "abc".contains(c)));
}

#[test]
fn test_fixed_intrinsics() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    assert_eq!(" ", Intrinsic::Whitespace.emit(&mut rng).unwrap());
    assert_eq!(" ", Intrinsic::TruncatingWhitespace.emit(&mut rng).unwrap());
    assert_eq!("\n", Intrinsic::Newline.emit(&mut rng).unwrap());
    assert_eq!(
        "somerandomstring",
        Intrinsic::StringLiteralCharacter.emit(&mut rng).unwrap()
    );
    for empty in [
        Intrinsic::OtherDigit,
        Intrinsic::OtherLanguageCharacter,
        Intrinsic::BidirectionalControlCharacter,
        Intrinsic::SimpleCommentCharacter,
        Intrinsic::BracketedCommentContents,
    ] {
        assert_eq!("", empty.emit(&mut rng).unwrap());
    }
}

#[test]
fn test_identifier_intrinsics_stay_in_their_charsets() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    for _ in 0..32 {
        let start = Intrinsic::IdentifierStart.emit(&mut rng).unwrap();
        let c = start.chars().next().unwrap();
        assert!(c == '_' || c.is_ascii_alphabetic());

        let extend = Intrinsic::IdentifierExtend.emit(&mut rng).unwrap();
        let c = extend.chars().next().unwrap();
        assert!(c == '_' || c.is_ascii_alphanumeric());
    }
}

#[test]
fn test_quoted_sequences_are_delimited() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    for _ in 0..64 {
        for (intrinsic, quote, at_delimiter) in [
            (Intrinsic::SingleQuotedCharacterSequence, '\'', '"'),
            (Intrinsic::DoubleQuotedCharacterSequence, '"', '"'),
            (Intrinsic::AccentQuotedCharacterSequence, '`', '`'),
        ] {
            let s = intrinsic.emit(&mut rng).unwrap();
            if let Some(stripped) = s.strip_prefix('@') {
                assert!(stripped.starts_with(at_delimiter));
                assert!(stripped.ends_with(at_delimiter));
            } else {
                assert!(s.starts_with(quote));
                assert!(s.ends_with(quote));
            }
        }
    }
}
