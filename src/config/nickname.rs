//! Default nickname generator.
//!
//! Produces nicknames like `crab4821` that stay within the common
//! 9-character nickname limit.

use rand::RngExt;

const PREFIX: &str = "crab";

/// Generate a random `crabNNNN` nickname.
pub fn generate_nickname() -> String {
    let mut rng = rand::rng();
    let num: u16 = rng.random_range(0..10_000);
    format!("{}{:04}", PREFIX, num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_shape() {
        let nick = generate_nickname();
        assert_eq!(nick.len(), 8);
        assert!(nick.starts_with(PREFIX));
        assert!(nick[PREFIX.len()..].chars().all(|c| c.is_ascii_digit()));
    }
}
