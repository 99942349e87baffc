/// Tests for the upload naming and search parameter conventions
///
/// Note: These are unit tests that verify the logic is correct.
/// Integration tests would require a running server.

#[cfg(test)]
mod tests {
    // Generated blob names are 16 random bytes hex-encoded plus extension
    #[test]
    fn test_blob_name_shape() {
        use rand::RngCore;

        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let name = format!("{}.png", hex::encode(bytes));

        assert_eq!(name.len(), 32 + 4);
        let (prefix, ext) = name.split_at(32);
        assert!(prefix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ext, ".png");
    }

    #[test]
    fn test_blob_names_are_unique() {
        use rand::RngCore;
        use std::collections::HashSet;

        let mut names = HashSet::new();
        for _ in 0..100 {
            let mut bytes = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut bytes);
            assert!(names.insert(hex::encode(bytes)));
        }
    }

    // Set-membership parameters split on commas into trimmed literals
    #[test]
    fn test_comma_separated_alternatives() {
        let raw = "Mammal, Bird,,Reptile";
        let values: Vec<&str> = raw
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        assert_eq!(values, vec!["Mammal", "Bird", "Reptile"]);
    }

    // Substring needles must escape LIKE wildcards to match literally
    #[test]
    fn test_like_escape() {
        let needle = "100%_done";
        let escaped = needle
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");

        assert_eq!(escaped, "100\\%\\_done");
    }
}
