// ABOUTME: Integration tests for type-safe engine identifiers.
// ABOUTME: Tests parsing, normalisation, and serialization of image and container IDs.

use dregs::types::*;
use std::collections::HashSet;

mod image_id_tests {
    use super::*;

    #[test]
    fn api_and_cli_forms_are_equal() {
        let full = "sha256:4f4fb700ef54461cfa02571ae0db9a0dc1e0cdb5577484a6d75e68dc38e8acc1";
        let api = ImageId::new(full);
        let cli = ImageId::new(&full["sha256:".len()..]);
        assert_eq!(api, cli);

        let set: HashSet<ImageId> = [api, cli].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn short_form_is_twelve_characters() {
        let id = ImageId::new("sha256:4f4fb700ef54461cfa02571ae0db9a0dc1e0cdb5577484a6d75e68dc38e8acc1");
        assert_eq!(id.short(), "4f4fb700ef54");
        assert_eq!(id.short().len(), SHORT_LEN);
        assert_eq!(id.to_string(), "4f4fb700ef54");
    }

    #[test]
    fn parse_accepts_references() {
        assert!(ImageId::parse("4f4fb700").is_ok());
        assert!(ImageId::parse("ghcr.io/org/app:v1.2.3").is_ok());
        assert!(ImageId::parse("nginx@sha256:abc123").is_ok());
        assert_eq!(ImageId::parse("  nginx  ").unwrap().as_str(), "nginx");
    }

    #[test]
    fn parse_rejects_empty_and_whitespace() {
        assert_eq!(ImageId::parse("").unwrap_err(), IdError::Empty);
        assert_eq!(ImageId::parse("   ").unwrap_err(), IdError::Empty);
    }

    #[test]
    fn parse_rejects_shell_syntax() {
        assert_eq!(
            ImageId::parse("abc $(reboot)").unwrap_err(),
            IdError::InvalidChar(' ')
        );
        assert_eq!(
            ImageId::parse("abc|cat").unwrap_err(),
            IdError::InvalidChar('|')
        );
    }

    #[test]
    fn serializes_without_digest_prefix() {
        let id = ImageId::new("sha256:abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc123\"");

        let back: ImageId = serde_json::from_str("\"sha256:abc123\"").unwrap();
        assert_eq!(back, id);
    }
}

mod container_id_tests {
    use super::*;

    #[test]
    fn short_ids_are_kept_whole() {
        let id = ContainerId::new("c0ffee");
        assert_eq!(id.short(), "c0ffee");
        assert_eq!(id.clone().into_inner(), "c0ffee");
    }

    #[test]
    fn debug_shows_full_value() {
        let id = ContainerId::new("0123456789abcdef0123");
        assert_eq!(format!("{id:?}"), "Id(\"0123456789abcdef0123\")");
    }
}
