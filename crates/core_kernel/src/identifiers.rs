//! Strongly-typed identifiers for domain entities
//!
//! Every entity carries its own UUID newtype so a payment id can never be
//! handed to a function expecting a billing-period id. Identifiers render
//! with a short tag ("PER-...") for logs and operator-facing messages, and
//! parse back with or without that tag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident => $tag:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// A fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// A fresh time-ordered identifier, friendlier to index locality
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Borrows the raw UUID, e.g. for query bindings
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "-{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .strip_prefix(concat!($tag, "-"))
                    .unwrap_or(s);
                Uuid::parse_str(raw).map(Self)
            }
        }
    };
}

define_id! {
    /// A therapist running the practice
    TherapistId => "THR"
}
define_id! {
    /// A patient of the practice
    PatientId => "PAT"
}
define_id! {
    /// A monthly billing period
    BillingPeriodId => "PER"
}
define_id! {
    /// A confirmed payment against a billing period
    PaymentId => "PAY"
}
define_id! {
    /// An imported bank-statement transaction
    BankTransactionId => "TXN"
}
define_id! {
    /// A tax-document (NFS-e) record
    InvoiceId => "NFS"
}
