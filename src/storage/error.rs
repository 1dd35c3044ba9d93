use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Whether a failed storage call may succeed against a different region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RegionMismatch,
    Other,
}

const MISMATCH_CODES: &[&str] = &[
    "PermanentRedirect",
    "TemporaryRedirect",
    "AuthorizationHeaderMalformed",
    "IllegalLocationConstraintException",
    "InvalidRegion",
];

/// A storage provider failure reduced to the fields used for classification and logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}{}", display_suffix(.code.as_deref(), .status.clone()))]
pub struct StorageError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl StorageError {
    pub fn new(status: Option<u16>, code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn from_sdk<E>(err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
    {
        let status = err.raw_response().map(|response| response.status().as_u16());
        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
        Self {
            status,
            code,
            message,
        }
    }

    pub fn classify(&self) -> FailureKind {
        if let Some(code) = self.code.as_deref() {
            if MISMATCH_CODES.iter().any(|known| known.eq_ignore_ascii_case(code)) {
                return FailureKind::RegionMismatch;
            }
        }
        if matches!(self.status, Some(301) | Some(307)) {
            return FailureKind::RegionMismatch;
        }
        let message = self.message.to_ascii_lowercase();
        if message.contains("endpoint") || message.contains("region") {
            return FailureKind::RegionMismatch;
        }
        FailureKind::Other
    }
}

fn display_suffix(code: Option<&str>, status: Option<u16>) -> String {
    let mut suffix = String::new();
    if let Some(code) = code {
        suffix.push_str(&format!(" (code={code})"));
    }
    if let Some(status) = status {
        suffix.push_str(&format!(" (status={status})"));
    }
    suffix
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("object upload failed: {0}")]
    Rejected(#[source] StorageError),
    #[error("object upload failed after region retry: {0}")]
    RetryExhausted(#[source] StorageError),
}

impl UploadError {
    #[cfg(test)]
    pub fn storage_error(&self) -> &StorageError {
        match self {
            UploadError::Rejected(err) | UploadError::RetryExhausted(err) => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_statuses_are_mismatches() {
        assert_eq!(
            StorageError::new(Some(301), None, "Moved Permanently").classify(),
            FailureKind::RegionMismatch
        );
        assert_eq!(
            StorageError::new(Some(307), None, "Temporary Redirect").classify(),
            FailureKind::RegionMismatch
        );
    }

    #[test]
    fn named_codes_are_mismatches() {
        for code in MISMATCH_CODES {
            let err = StorageError::new(Some(400), Some(*code), "rejected");
            assert_eq!(err.classify(), FailureKind::RegionMismatch, "{code}");
        }
    }

    #[test]
    fn endpoint_messages_are_mismatches() {
        let err = StorageError::new(
            Some(400),
            None,
            "The bucket you are attempting to access must be addressed using the specified endpoint.",
        );
        assert_eq!(err.classify(), FailureKind::RegionMismatch);
    }

    #[test]
    fn other_failures_are_not_retried() {
        let denied = StorageError::new(Some(403), Some("AccessDenied"), "Access Denied");
        assert_eq!(denied.classify(), FailureKind::Other);
        let network = StorageError::new(None, None, "dispatch failure: connection refused");
        assert_eq!(network.classify(), FailureKind::Other);
    }

    #[test]
    fn display_includes_code_and_status() {
        let err = StorageError::new(Some(403), Some("AccessDenied"), "Access Denied");
        assert_eq!(err.to_string(), "Access Denied (code=AccessDenied) (status=403)");
    }

    #[test]
    fn display_omits_missing_code_and_status() {
        let err = StorageError::new(None, None, "dispatch failure");
        assert_eq!(err.to_string(), "dispatch failure");
        let err = StorageError::new(Some(500), None, "Internal Error");
        assert_eq!(err.to_string(), "Internal Error (status=500)");
    }

    #[test]
    fn upload_error_keeps_storage_error_as_source() {
        use std::error::Error;

        let denied = StorageError::new(Some(403), Some("AccessDenied"), "Access Denied");
        let err = UploadError::Rejected(denied.clone());
        assert_eq!(err.storage_error(), &denied);
        assert_eq!(
            err.source().map(|source| source.to_string()),
            Some(denied.to_string())
        );
    }
}
