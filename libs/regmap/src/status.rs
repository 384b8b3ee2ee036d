//! Status envelope for decoded device models
//!
//! Every model carries exactly one status: `Good`, `Uncertain`, or one
//! specific `Bad*` reason. Presentation layers branch on it before trusting
//! any field value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data quality codes
///
/// Numeric codes follow the OPC UA status code layout: severity in the two
/// top bits (`00` good, `01` uncertain, `10` bad), sub-code in bits 16-27.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Good,
    /// Never refreshed, or refreshed from an absent source
    #[default]
    Uncertain,

    // Generic failures
    BadUnexpectedError,
    BadInternalError,
    BadResourceUnavailable,

    // Communication
    BadCommunicationError,
    BadTimeout,
    BadNoCommunication,
    BadNotConnected,
    BadServerNotConnected,
    BadShutdown,
    BadTooManyOperations,

    // Codec
    BadEncodingError,
    BadDecodingError,
    BadEncodingLimitsExceeded,
    BadUnknownResponse,
    BadTypeMismatch,

    // Access / addressing
    BadNotReadable,
    BadNotWritable,
    BadOutOfRange,
    BadNotSupported,
    BadNotFound,

    // Device state
    BadWaitingForInitialData,
    BadConfigurationError,
    BadDeviceFailure,
    BadSensorFailure,
    BadOutOfService,
}

impl StatusCode {
    /// Every `Bad*` reason, in declaration order
    pub const BAD: [StatusCode; 25] = [
        Self::BadUnexpectedError,
        Self::BadInternalError,
        Self::BadResourceUnavailable,
        Self::BadCommunicationError,
        Self::BadTimeout,
        Self::BadNoCommunication,
        Self::BadNotConnected,
        Self::BadServerNotConnected,
        Self::BadShutdown,
        Self::BadTooManyOperations,
        Self::BadEncodingError,
        Self::BadDecodingError,
        Self::BadEncodingLimitsExceeded,
        Self::BadUnknownResponse,
        Self::BadTypeMismatch,
        Self::BadNotReadable,
        Self::BadNotWritable,
        Self::BadOutOfRange,
        Self::BadNotSupported,
        Self::BadNotFound,
        Self::BadWaitingForInitialData,
        Self::BadConfigurationError,
        Self::BadDeviceFailure,
        Self::BadSensorFailure,
        Self::BadOutOfService,
    ];

    pub fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }

    pub fn is_uncertain(&self) -> bool {
        matches!(self, Self::Uncertain)
    }

    pub fn is_bad(&self) -> bool {
        !self.is_good() && !self.is_uncertain()
    }

    /// Numeric status code
    pub fn code(&self) -> u32 {
        match self {
            Self::Good => 0x0000_0000,
            Self::Uncertain => 0x4000_0000,
            Self::BadUnexpectedError => 0x8001_0000,
            Self::BadInternalError => 0x8002_0000,
            Self::BadResourceUnavailable => 0x8004_0000,
            Self::BadCommunicationError => 0x8005_0000,
            Self::BadEncodingError => 0x8006_0000,
            Self::BadDecodingError => 0x8007_0000,
            Self::BadEncodingLimitsExceeded => 0x8008_0000,
            Self::BadUnknownResponse => 0x8009_0000,
            Self::BadTimeout => 0x800A_0000,
            Self::BadShutdown => 0x800C_0000,
            Self::BadServerNotConnected => 0x800D_0000,
            Self::BadTooManyOperations => 0x8010_0000,
            Self::BadNoCommunication => 0x8031_0000,
            Self::BadWaitingForInitialData => 0x8032_0000,
            Self::BadNotReadable => 0x803A_0000,
            Self::BadNotWritable => 0x803B_0000,
            Self::BadOutOfRange => 0x803C_0000,
            Self::BadNotSupported => 0x803D_0000,
            Self::BadNotFound => 0x803E_0000,
            Self::BadTypeMismatch => 0x8074_0000,
            Self::BadConfigurationError => 0x8089_0000,
            Self::BadNotConnected => 0x808A_0000,
            Self::BadDeviceFailure => 0x808B_0000,
            Self::BadSensorFailure => 0x808C_0000,
            Self::BadOutOfService => 0x808D_0000,
        }
    }

    /// Fixed human-readable explanation
    pub fn explanation(&self) -> &'static str {
        match self {
            Self::Good => "The value is good.",
            Self::Uncertain => "The value has not been refreshed from the device.",
            Self::BadUnexpectedError => "An unexpected error occurred.",
            Self::BadInternalError => "An internal error occurred as a result of a programming or configuration error.",
            Self::BadResourceUnavailable => "An operating system resource is not available.",
            Self::BadCommunicationError => "A low level communication error occurred.",
            Self::BadTimeout => "The operation timed out.",
            Self::BadNoCommunication => "Communication with the data source is defined, but not established, and there is no last known value available.",
            Self::BadNotConnected => "The variable should receive its value from another variable, but has never been configured to do so.",
            Self::BadServerNotConnected => "The operation could not complete because the client is not connected to the server.",
            Self::BadShutdown => "The operation was cancelled because the application is shutting down.",
            Self::BadTooManyOperations => "The request could not be processed because it specified too many operations.",
            Self::BadEncodingError => "Encoding halted because of invalid data in the objects being serialized.",
            Self::BadDecodingError => "Decoding halted because of invalid data in the stream.",
            Self::BadEncodingLimitsExceeded => "The message encoding/decoding limits imposed by the stack have been exceeded.",
            Self::BadUnknownResponse => "An unrecognized response was received from the server.",
            Self::BadTypeMismatch => "The value supplied for the attribute is not of the same type as the attribute's value.",
            Self::BadNotReadable => "The access level does not allow reading or subscribing to the Node.",
            Self::BadNotWritable => "The access level does not allow writing to the Node.",
            Self::BadOutOfRange => "The value was out of range.",
            Self::BadNotSupported => "The requested operation is not supported.",
            Self::BadNotFound => "A requested item was not found or a search operation ended without success.",
            Self::BadWaitingForInitialData => "Waiting for the server to obtain values from the underlying data source.",
            Self::BadConfigurationError => "There is a problem with the configuration that affects the usefulness of the value.",
            Self::BadDeviceFailure => "There has been a failure in the device/data source that generates the value that has affected the value.",
            Self::BadSensorFailure => "There has been a failure in the sensor from which the value is derived by the device/data source.",
            Self::BadOutOfService => "The source of the data is not operational.",
        }
    }

    /// Variant name, e.g. `BadTimeout`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Uncertain => "Uncertain",
            Self::BadUnexpectedError => "BadUnexpectedError",
            Self::BadInternalError => "BadInternalError",
            Self::BadResourceUnavailable => "BadResourceUnavailable",
            Self::BadCommunicationError => "BadCommunicationError",
            Self::BadTimeout => "BadTimeout",
            Self::BadNoCommunication => "BadNoCommunication",
            Self::BadNotConnected => "BadNotConnected",
            Self::BadServerNotConnected => "BadServerNotConnected",
            Self::BadShutdown => "BadShutdown",
            Self::BadTooManyOperations => "BadTooManyOperations",
            Self::BadEncodingError => "BadEncodingError",
            Self::BadDecodingError => "BadDecodingError",
            Self::BadEncodingLimitsExceeded => "BadEncodingLimitsExceeded",
            Self::BadUnknownResponse => "BadUnknownResponse",
            Self::BadTypeMismatch => "BadTypeMismatch",
            Self::BadNotReadable => "BadNotReadable",
            Self::BadNotWritable => "BadNotWritable",
            Self::BadOutOfRange => "BadOutOfRange",
            Self::BadNotSupported => "BadNotSupported",
            Self::BadNotFound => "BadNotFound",
            Self::BadWaitingForInitialData => "BadWaitingForInitialData",
            Self::BadConfigurationError => "BadConfigurationError",
            Self::BadDeviceFailure => "BadDeviceFailure",
            Self::BadSensorFailure => "BadSensorFailure",
            Self::BadOutOfService => "BadOutOfService",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Quality code plus freshness timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    code: StatusCode,
    /// When `code` last took a different value
    changed_at: DateTime<Utc>,
    /// When the model was last refreshed, successfully or not
    refreshed_at: Option<DateTime<Utc>>,
}

impl Status {
    /// Initial status of a freshly constructed model
    pub fn new() -> Self {
        Self {
            code: StatusCode::Uncertain,
            changed_at: Utc::now(),
            refreshed_at: None,
        }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn explanation(&self) -> &'static str {
        self.code.explanation()
    }

    pub fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn is_good(&self) -> bool {
        self.code.is_good()
    }

    pub fn is_bad(&self) -> bool {
        self.code.is_bad()
    }

    pub fn is_uncertain(&self) -> bool {
        self.code.is_uncertain()
    }

    /// Record the outcome of one refresh cycle
    ///
    /// Returns `true` when the code changed.
    pub fn set(&mut self, code: StatusCode) -> bool {
        let now = Utc::now();
        self.refreshed_at = Some(now);
        if self.code == code {
            return false;
        }
        self.code = code;
        self.changed_at = now;
        true
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_quality_code_checks() {
        assert!(StatusCode::Good.is_good());
        assert!(!StatusCode::Good.is_bad());
        assert!(StatusCode::Uncertain.is_uncertain());
        assert!(!StatusCode::Uncertain.is_bad());
        assert!(StatusCode::BadDeviceFailure.is_bad());
        assert!(!StatusCode::BadDeviceFailure.is_good());
    }

    #[test]
    fn test_every_bad_code_is_bad_and_distinct() {
        let mut codes: Vec<u32> = StatusCode::BAD.iter().map(|c| c.code()).collect();
        for code in StatusCode::BAD {
            assert!(code.is_bad(), "{code}");
            assert!(!code.is_uncertain());
            assert_eq!(code.code() & 0xC000_0000, 0x8000_0000, "{code}");
            assert!(!code.explanation().is_empty());
        }
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), StatusCode::BAD.len());
    }

    #[test]
    fn test_severity_bits() {
        assert_eq!(StatusCode::Good.code(), 0);
        assert_eq!(StatusCode::Uncertain.code() >> 30, 0b01);
        assert_eq!(StatusCode::BadTimeout.code() >> 30, 0b10);
    }

    #[test]
    fn test_default_is_uncertain() {
        let status = Status::default();
        assert!(status.is_uncertain());
        assert!(status.refreshed_at().is_none());
        assert_eq!(StatusCode::default(), StatusCode::Uncertain);
    }

    #[test]
    fn test_set_tracks_change_time() {
        let mut status = Status::new();
        let created = status.changed_at();

        assert!(status.set(StatusCode::Good));
        let changed = status.changed_at();
        assert!(changed >= created);
        assert!(status.refreshed_at().is_some());

        assert!(!status.set(StatusCode::Good));
        assert_eq!(status.changed_at(), changed);

        assert!(status.set(StatusCode::BadTimeout));
        assert!(status.is_bad());
        assert_eq!(status.explanation(), "The operation timed out.");
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&StatusCode::BadCommunicationError).unwrap();
        assert_eq!(json, r#""bad_communication_error""#);
    }
}
