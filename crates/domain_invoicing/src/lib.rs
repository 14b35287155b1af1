//! Invoicing Domain - tax-document (NFS-e) issuance gate
//!
//! Document generation itself belongs to an external provider; this crate
//! owns the *gating*: an invoice is issued at most once per paid billing
//! period, only while a valid digital certificate is on file, and every
//! provider call is bounded by a timeout so a failure is always a typed,
//! retryable error rather than a half-applied state.

pub mod invoice;
pub mod certificate;
pub mod provider;
pub mod ports;
pub mod services;
pub mod error;

pub use invoice::{Invoice, InvoiceStatus};
pub use certificate::DigitalCertificate;
pub use provider::{InvoiceProvider, InvoiceRequest, MockInvoiceProvider, ProviderInvoice};
pub use ports::{InvoicingPort, PeriodBillingView};
pub use services::InvoiceService;
pub use error::InvoicingError;
