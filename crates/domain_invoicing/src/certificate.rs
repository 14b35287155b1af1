//! Digital certificate registry entries
//!
//! Issuing an NFS-e requires the therapist's digital certificate to be on
//! file and unexpired. Only the validity window matters to the gate; the
//! certificate material itself stays with the provider integration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::TherapistId;

/// A therapist's registered digital certificate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitalCertificate {
    /// Owning therapist
    pub therapist_id: TherapistId,
    /// Certificate subject (e.g. "CN=ANA PEREIRA:12345678901")
    pub subject: String,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
    /// When the certificate was registered
    pub registered_at: DateTime<Utc>,
}

impl DigitalCertificate {
    pub fn new(
        therapist_id: TherapistId,
        subject: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            therapist_id,
            subject: subject.into(),
            expires_at,
            registered_at: Utc::now(),
        }
    }

    /// True while the certificate has not expired at `instant`
    pub fn is_valid_at(&self, instant: DateTime<Utc>) -> bool {
        self.expires_at > instant
    }

    /// True while the certificate has not expired
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_certificate_validity_window() {
        let cert = DigitalCertificate::new(
            TherapistId::new(),
            "CN=ANA PEREIRA:12345678901",
            Utc::now() + Duration::days(30),
        );
        assert!(cert.is_valid());

        let expired = DigitalCertificate::new(
            TherapistId::new(),
            "CN=OLD CERT",
            Utc::now() - Duration::days(1),
        );
        assert!(!expired.is_valid());
    }
}
