use rand::{Rng, distributions::Alphanumeric};

/// A random local-part for catch-all probing (spec §4.6), long enough that
/// collision with a real mailbox is negligible.
pub fn random_local_part(len: usize) -> String {
    let length = len.clamp(8, 32);
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_minimum_length() {
        assert_eq!(random_local_part(2).len(), 8);
    }

    #[test]
    fn is_alphanumeric() {
        let part = random_local_part(16);
        assert!(part.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
