use crate::error::TransferError;
use sha1::Digest;
use sha1::Sha1;
use sha2::Sha256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    Sha1,
    Sha256,
}

/// The digest a finished transfer is compared against, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedChecksum {
    pub kind: ChecksumKind,
    pub hex: String,
}

/// Picks the digest to verify. SHA-1 takes precedence when both are present;
/// empty strings count as absent.
pub fn expected_checksum(
    sha1: Option<&str>,
    sha256: Option<&str>,
) -> Option<ExpectedChecksum> {
    if let Some(sha1) = sha1.filter(|sha| !sha.is_empty()) {
        return Some(ExpectedChecksum {
            kind: ChecksumKind::Sha1,
            hex: sha1.to_lowercase(),
        });
    }
    sha256
        .filter(|sha| !sha.is_empty())
        .map(|sha256| ExpectedChecksum {
            kind: ChecksumKind::Sha256,
            hex: sha256.to_lowercase(),
        })
}

/// Streaming hasher fed by the download copy loops.
pub enum Digester {
    Sha1(Sha1),
    Sha256(Sha256),
}

impl Digester {
    pub fn new(kind: ChecksumKind) -> Self {
        match kind {
            ChecksumKind::Sha1 => Digester::Sha1(Sha1::new()),
            ChecksumKind::Sha256 => Digester::Sha256(Sha256::new()),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            Digester::Sha1(hasher) => hasher.update(bytes),
            Digester::Sha256(hasher) => hasher.update(bytes),
        }
    }

    pub fn finalize_hex(self) -> String {
        match self {
            Digester::Sha1(hasher) => hex::encode(hasher.finalize()),
            Digester::Sha256(hasher) => hex::encode(hasher.finalize()),
        }
    }
}

pub fn validate_checksum(
    expected: &ExpectedChecksum,
    actual_hex: &str,
    file_name: &str,
) -> Result<(), TransferError> {
    if actual_hex != expected.hex {
        return Err(TransferError::ChecksumMismatch {
            file_name: file_name.into(),
            expected: expected.hex.clone(),
            actual: actual_hex.into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA1: &str = "22596363b3de40b06f981fb85d82312e8c0ed511";
    const HELLO_SHA256: &str = "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447";

    fn digest_hex(kind: ChecksumKind, bytes: &[u8]) -> String {
        let mut digester = Digester::new(kind);
        digester.update(bytes);
        digester.finalize_hex()
    }

    #[test]
    fn sha1_takes_precedence_over_sha256() {
        let expected = expected_checksum(Some(HELLO_SHA1), Some(HELLO_SHA256)).unwrap();
        assert_eq!(expected.kind, ChecksumKind::Sha1);
        assert_eq!(expected.hex, HELLO_SHA1);
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let expected = expected_checksum(Some(""), Some(HELLO_SHA256)).unwrap();
        assert_eq!(expected.kind, ChecksumKind::Sha256);
        assert!(expected_checksum(Some(""), None).is_none());
        assert!(expected_checksum(None, None).is_none());
    }

    #[test]
    fn expected_digests_are_lowercased() {
        let expected = expected_checksum(Some(&HELLO_SHA1.to_uppercase()), None).unwrap();
        assert_eq!(expected.hex, HELLO_SHA1);
    }

    #[test]
    fn streaming_digests_match_known_values() {
        assert_eq!(digest_hex(ChecksumKind::Sha1, b"hello world\n"), HELLO_SHA1);
        assert_eq!(
            digest_hex(ChecksumKind::Sha256, b"hello world\n"),
            HELLO_SHA256
        );
        // The well-known digest of the empty input.
        assert_eq!(
            digest_hex(ChecksumKind::Sha256, b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn mismatch_cites_the_file_and_both_digests() {
        let expected = expected_checksum(Some(HELLO_SHA1), None).unwrap();
        let actual = digest_hex(ChecksumKind::Sha1, b"other content");
        let err = validate_checksum(&expected, &actual, "artifact.tar.gz").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("artifact.tar.gz"));
        assert!(message.contains(HELLO_SHA1));
        assert!(message.contains(&actual));
    }

    #[test]
    fn matching_digests_validate() {
        let expected = expected_checksum(None, Some(HELLO_SHA256)).unwrap();
        assert!(validate_checksum(&expected, HELLO_SHA256, "artifact").is_ok());
    }
}
