// SPDX-License-Identifier: MIT

//! Payload-pointer grammar.
//!
//! A payload is an opaque string the scheduler never interprets beyond its
//! prefix. The worker runtime is the only consumer that looks past the
//! prefix (see `jm-worker`).

use crate::error::SchedulerError;

/// One of the six recognized payload prefixes. The set is closed: any other
/// prefix is rejected by [`validate_payload`] at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadPrefix {
    File,
    Cmd,
    Url,
    Git,
    Gh,
    Doc,
}

impl PayloadPrefix {
    pub const ALL: [PayloadPrefix; 6] = [
        PayloadPrefix::File,
        PayloadPrefix::Cmd,
        PayloadPrefix::Url,
        PayloadPrefix::Git,
        PayloadPrefix::Gh,
        PayloadPrefix::Doc,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PayloadPrefix::File => "@file:",
            PayloadPrefix::Cmd => "@cmd:",
            PayloadPrefix::Url => "@url:",
            PayloadPrefix::Git => "@git:",
            PayloadPrefix::Gh => "@gh:",
            PayloadPrefix::Doc => "@doc:",
        }
    }

    /// Metadata-only prefixes are marked done immediately by the worker,
    /// without executing anything.
    pub const fn is_metadata_only(self) -> bool {
        matches!(
            self,
            PayloadPrefix::Doc | PayloadPrefix::Url | PayloadPrefix::Git | PayloadPrefix::Gh
        )
    }
}

/// Split a payload into its recognized prefix and the remainder, or `None`
/// if the payload doesn't start with one of the six known prefixes.
pub fn prefix_of(payload: &str) -> Option<(PayloadPrefix, &str)> {
    PayloadPrefix::ALL
        .into_iter()
        .find_map(|p| payload.strip_prefix(p.as_str()).map(|rest| (p, rest)))
}

/// Validate that `payload` begins with one of the recognized prefixes.
///
/// Scheduler-level validation only; the worker's command-safety gate is a
/// separate, stricter check applied only to `@cmd:` payloads.
pub fn validate_payload(payload: &str) -> Result<(), SchedulerError> {
    if prefix_of(payload).is_some() {
        Ok(())
    } else {
        let snippet: String = payload.chars().take(80).collect();
        Err(SchedulerError::BadPayload(snippet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_recognized_prefixes() {
        for p in PayloadPrefix::ALL {
            let payload = format!("{}something", p.as_str());
            assert!(validate_payload(&payload).is_ok(), "{payload}");
        }
    }

    #[test]
    fn rejects_unrecognized_prefix() {
        let err = validate_payload("@ssh:host/path").unwrap_err();
        assert!(matches!(err, SchedulerError::BadPayload(_)));
    }

    #[test]
    fn metadata_only_excludes_file_and_cmd() {
        assert!(!PayloadPrefix::File.is_metadata_only());
        assert!(!PayloadPrefix::Cmd.is_metadata_only());
        assert!(PayloadPrefix::Doc.is_metadata_only());
        assert!(PayloadPrefix::Url.is_metadata_only());
        assert!(PayloadPrefix::Git.is_metadata_only());
        assert!(PayloadPrefix::Gh.is_metadata_only());
    }

    #[test]
    fn prefix_of_splits_remainder() {
        let (p, rest) = prefix_of("@cmd:echo hi").unwrap();
        assert_eq!(p, PayloadPrefix::Cmd);
        assert_eq!(rest, "echo hi");
    }
}
