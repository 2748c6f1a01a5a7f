use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;

/// Length of the application signing secret, in bytes (256 bits).
pub const SECRET_BYTES: usize = 32;

/// Freshly generated signing secret.
///
/// Never printed: `Debug` is redacted and only [`Self::expose`]
/// hands out the hex value.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretMaterial {
    hex: String,
}

impl SecretMaterial {
    /// Draw 256 bits from the operating system CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self {
            hex: hex::encode(bytes),
        }
    }

    /// Wrap an existing hex value, e.g. one read back from disk.
    #[must_use]
    pub fn from_hex(hex: &str) -> Self {
        Self {
            hex: hex.to_string(),
        }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.hex
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMaterial(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_encoded_256_bits() {
        let secret = SecretMaterial::generate();

        assert_eq!(secret.expose().len(), SECRET_BYTES * 2);
        assert!(secret.expose().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn each_generation_differs() {
        assert_ne!(SecretMaterial::generate(), SecretMaterial::generate());
    }

    #[test]
    fn debug_is_redacted() {
        let secret = SecretMaterial::from_hex("deadbeef");

        assert!(!format!("{secret:?}").contains("deadbeef"));
    }
}
