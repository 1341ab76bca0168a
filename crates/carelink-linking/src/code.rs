use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of codes handed out unless configured otherwise.
pub const DEFAULT_CODE_LENGTH: usize = 8;

/// Upper bound on what we accept as redeem input before touching the store.
pub const MAX_CODE_LENGTH: usize = 32;

/// Source of candidate link codes. Uniqueness is the store's job.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniform draw from the 62-symbol alphabet `[A-Za-z0-9]`.
#[derive(Debug, Clone)]
pub struct RandomCodes {
    len: usize,
}

impl RandomCodes {
    pub fn new(len: usize) -> Self {
        Self { len: len.clamp(1, MAX_CODE_LENGTH) }
    }
}

impl Default for RandomCodes {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

impl CodeGenerator for RandomCodes {
    fn generate(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.len)
            .map(char::from)
            .collect()
    }
}

/// Cheap syntactic check on user input so garbage never reaches a query.
pub fn is_well_formed(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LENGTH
        && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_codes_have_fixed_length_and_alphabet() {
        let codes = RandomCodes::default();
        for _ in 0..500 {
            let code = codes.generate();
            assert_eq!(code.len(), DEFAULT_CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()), "{code}");
        }
    }

    #[test]
    fn configured_length_is_respected() {
        assert_eq!(RandomCodes::new(12).generate().len(), 12);
        // zero would produce an unredeemable code
        assert_eq!(RandomCodes::new(0).generate().len(), 1);
        assert_eq!(RandomCodes::new(500).generate().len(), MAX_CODE_LENGTH);
    }

    #[test]
    fn alphabet_covers_all_three_classes() {
        let codes = RandomCodes::new(MAX_CODE_LENGTH);
        let seen: HashSet<char> = (0..200).flat_map(|_| codes.generate().chars().collect::<Vec<_>>()).collect();
        assert!(seen.iter().any(|c| c.is_ascii_uppercase()));
        assert!(seen.iter().any(|c| c.is_ascii_lowercase()));
        assert!(seen.iter().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn well_formed_rejects_junk() {
        assert!(is_well_formed("aB3dE9Kz"));
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("nonexistent-code"));
        assert!(!is_well_formed("aB3d E9Kz"));
        assert!(!is_well_formed(&"a".repeat(MAX_CODE_LENGTH + 1)));
    }
}
