//! Vigenère transform over the 26-letter Latin alphabet.
//!
//! Both directions work character by character: the letter at position `i`
//! is shifted by the key letter at `i % key.len()`. Characters outside A-Z
//! pass through untouched but still consume a key position.

/// Errors constructing a [`Key`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("key must not be empty")]
    EmptyKey,

    #[error("key must contain only letters")]
    NonAlphabeticKey,
}

/// Returns true for a non-empty string made only of ASCII letters.
///
/// This is the shape every string must have before it is sent to the engine.
pub fn is_alphabetic(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

/// A validated cipher key: non-empty, uppercase ASCII letters.
#[derive(Clone, PartialEq, Eq)]
pub struct Key(String);

impl Key {
    pub fn new(raw: &str) -> Result<Self, CipherError> {
        if raw.is_empty() {
            return Err(CipherError::EmptyKey);
        }
        if !is_alphabetic(raw) {
            return Err(CipherError::NonAlphabeticKey);
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn shift_at(&self, position: usize) -> u8 {
        let bytes = self.0.as_bytes();
        bytes[position % bytes.len()] - b'A'
    }
}

// Keys are secrets; keep them out of Debug output.
impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Key").field(&"<hidden>").finish()
    }
}

pub fn encrypt(plaintext: &str, key: &Key) -> String {
    transform(plaintext, key, |p, k| (p + k) % 26)
}

pub fn decrypt(ciphertext: &str, key: &Key) -> String {
    transform(ciphertext, key, |c, k| (c + 26 - k) % 26)
}

fn transform(text: &str, key: &Key, shift: impl Fn(u8, u8) -> u8) -> String {
    text.chars()
        .enumerate()
        .map(|(i, ch)| {
            if ch.is_ascii_alphabetic() {
                let letter = ch.to_ascii_uppercase() as u8 - b'A';
                char::from(shift(letter, key.shift_at(i)) + b'A')
            } else {
                ch
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Key {
        Key::new(s).unwrap()
    }

    #[test]
    fn lemon_encrypts_attack_at_dawn() {
        let k = key("LEMON");
        assert_eq!(encrypt("ATTACKATDAWN", &k), "LXFOPVEFRNHR");
        assert_eq!(decrypt("LXFOPVEFRNHR", &k), "ATTACKATDAWN");
    }

    #[test]
    fn decrypt_inverts_encrypt() {
        let cases = [
            ("HELLO", "KEY"),
            ("Z", "Z"),
            ("THEQUICKBROWNFOXJUMPSOVERTHELAZYDOG", "A"),
            ("ABCDEFGHIJKLMNOPQRSTUVWXYZ", "ZYXWVUTSRQ"),
            ("SHORT", "AVERYLONGKEYINDEED"),
        ];
        for (plain, k) in cases {
            let k = key(k);
            assert_eq!(decrypt(&encrypt(plain, &k), &k), plain);
        }
    }

    #[test]
    fn input_case_is_normalized() {
        assert_eq!(encrypt("abc", &key("key")), encrypt("ABC", &key("KEY")));
        assert_eq!(decrypt("xyz", &key("key")), decrypt("XYZ", &key("KEY")));
    }

    #[test]
    fn non_letters_pass_through_in_place() {
        let k = key("B");
        let out = encrypt("A-B 9!", &k);
        assert_eq!(out, "B-C 9!");
        assert_eq!(out.chars().count(), "A-B 9!".chars().count());
    }

    #[test]
    fn non_letters_consume_key_positions() {
        // Position 1 uses key letter 'B' even though it is a hyphen.
        assert_eq!(encrypt("A-A", &key("AB")), "A-A");
        assert_eq!(encrypt("AAA", &key("AB")), "ABA");
    }

    #[test]
    fn decrypt_wraps_below_a() {
        assert_eq!(decrypt("A", &key("B")), "Z");
    }

    #[test]
    fn key_rejects_empty_and_non_letters() {
        assert_eq!(Key::new(""), Err(CipherError::EmptyKey));
        assert_eq!(Key::new("ab1"), Err(CipherError::NonAlphabeticKey));
        assert_eq!(Key::new("ÄB"), Err(CipherError::NonAlphabeticKey));
        assert_eq!(key("lemon").as_str(), "LEMON");
    }

    #[test]
    fn key_debug_hides_value() {
        assert!(!format!("{:?}", key("SECRET")).contains("SECRET"));
    }

    #[test]
    fn alphabetic_check() {
        assert!(is_alphabetic("Hello"));
        assert!(!is_alphabetic(""));
        assert!(!is_alphabetic("hello world"));
        assert!(!is_alphabetic("ab1"));
    }
}
