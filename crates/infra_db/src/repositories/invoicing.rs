//! Invoicing storage adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{
    BillingMonth, BillingPeriodId, Cpf, DomainPort, InvoiceId, Money, PortError, TherapistId,
};
use domain_invoicing::{
    DigitalCertificate, Invoice, InvoiceStatus, InvoicingPort, PeriodBillingView,
};

use crate::error::{corrupt_row, to_port_error};

/// PostgreSQL implementation of `InvoicingPort`
#[derive(Debug, Clone)]
pub struct PostgresInvoicingAdapter {
    pool: PgPool,
}

impl PostgresInvoicingAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers or replaces a therapist's digital certificate
    pub async fn upsert_certificate(
        &self,
        certificate: &DigitalCertificate,
    ) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO certificates (therapist_id, subject, expires_at, registered_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (therapist_id) DO UPDATE \
             SET subject = $2, expires_at = $3, registered_at = $4",
        )
        .bind(certificate.therapist_id.as_uuid())
        .bind(&certificate.subject)
        .bind(certificate.expires_at)
        .bind(certificate.registered_at)
        .execute(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "certificates.upsert"))?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    invoice_id: Uuid,
    period_id: Uuid,
    provider_invoice_id: Option<String>,
    status: String,
    issued_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

const SELECT_INVOICE: &str = "SELECT invoice_id, period_id, provider_invoice_id, status, issued_at, \
     error_message, cancelled_at, created_at \
     FROM invoices";

fn status_from_str(status: &str) -> Result<InvoiceStatus, PortError> {
    match status {
        "issued" => Ok(InvoiceStatus::Issued),
        "processing" => Ok(InvoiceStatus::Processing),
        "error" => Ok(InvoiceStatus::Error),
        "cancelled" => Ok(InvoiceStatus::Cancelled),
        other => Err(corrupt_row(
            "invoices",
            format!("unknown status '{}'", other),
        )),
    }
}

impl InvoiceRow {
    fn into_invoice(self) -> Result<Invoice, PortError> {
        Ok(Invoice {
            id: InvoiceId::from(self.invoice_id),
            billing_period_id: BillingPeriodId::from(self.period_id),
            provider_invoice_id: self.provider_invoice_id,
            status: status_from_str(&self.status)?,
            issued_at: self.issued_at,
            error_message: self.error_message,
            cancelled_at: self.cancelled_at,
            created_at: self.created_at,
        })
    }
}

impl DomainPort for PostgresInvoicingAdapter {}

#[async_trait]
impl InvoicingPort for PostgresInvoicingAdapter {
    async fn find_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "{} WHERE invoice_id = $1",
            SELECT_INVOICE
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "invoices.get"))?
        .ok_or_else(|| PortError::not_found("Invoice", id))?;
        row.into_invoice()
    }

    async fn issued_invoice_for_period(
        &self,
        period_id: BillingPeriodId,
    ) -> Result<Option<Invoice>, PortError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "{} WHERE period_id = $1 AND status = 'issued'",
            SELECT_INVOICE
        ))
        .bind(period_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "invoices.issued_for_period"))?;
        row.map(InvoiceRow::into_invoice).transpose()
    }

    async fn invoices_for_period(
        &self,
        period_id: BillingPeriodId,
    ) -> Result<Vec<Invoice>, PortError> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "{} WHERE period_id = $1 ORDER BY created_at",
            SELECT_INVOICE
        ))
        .bind(period_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "invoices.for_period"))?;
        rows.into_iter().map(InvoiceRow::into_invoice).collect()
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO invoices (\
                 invoice_id, period_id, provider_invoice_id, status, issued_at, \
                 error_message, cancelled_at, created_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.billing_period_id.as_uuid())
        .bind(&invoice.provider_invoice_id)
        .bind(invoice.status.as_str())
        .bind(invoice.issued_at)
        .bind(&invoice.error_message)
        .bind(invoice.cancelled_at)
        .bind(invoice.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "invoices.insert"))?;
        Ok(())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE invoices SET \
                 provider_invoice_id = $2, status = $3, issued_at = $4, \
                 error_message = $5, cancelled_at = $6 \
             WHERE invoice_id = $1",
        )
        .bind(invoice.id.as_uuid())
        .bind(&invoice.provider_invoice_id)
        .bind(invoice.status.as_str())
        .bind(invoice.issued_at)
        .bind(&invoice.error_message)
        .bind(invoice.cancelled_at)
        .execute(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "invoices.update"))?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Invoice", invoice.id));
        }
        Ok(())
    }

    async fn period_view(
        &self,
        period_id: BillingPeriodId,
    ) -> Result<PeriodBillingView, PortError> {
        #[derive(sqlx::FromRow)]
        struct ViewRow {
            period_id: Uuid,
            therapist_id: Uuid,
            full_name: String,
            document: Option<String>,
            total_amount_cents: i64,
            year: i32,
            month: i32,
            status: String,
        }

        let row = sqlx::query_as::<_, ViewRow>(
            "SELECT bp.period_id, bp.therapist_id, pa.full_name, pa.document, \
                    bp.total_amount_cents, bp.year, bp.month, bp.status \
             FROM billing_periods bp \
             JOIN patients pa ON pa.patient_id = bp.patient_id \
             WHERE bp.period_id = $1",
        )
        .bind(period_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "billing_periods.view"))?
        .ok_or_else(|| PortError::not_found("BillingPeriod", period_id))?;

        let month = BillingMonth::new(row.year, row.month as u32)
            .map_err(|e| corrupt_row("billing_periods", e))?;
        let patient_document = row
            .document
            .map(|d| Cpf::parse(&d))
            .transpose()
            .map_err(|e| corrupt_row("patients", e))?;

        Ok(PeriodBillingView {
            billing_period_id: BillingPeriodId::from(row.period_id),
            therapist_id: TherapistId::from(row.therapist_id),
            patient_name: row.full_name,
            patient_document,
            total_amount: Money::from_cents(row.total_amount_cents),
            month,
            is_paid: row.status == "paid",
        })
    }

    async fn certificate_for(
        &self,
        therapist_id: TherapistId,
    ) -> Result<Option<DigitalCertificate>, PortError> {
        #[derive(sqlx::FromRow)]
        struct CertificateRow {
            therapist_id: Uuid,
            subject: String,
            expires_at: DateTime<Utc>,
            registered_at: DateTime<Utc>,
        }

        let row = sqlx::query_as::<_, CertificateRow>(
            "SELECT therapist_id, subject, expires_at, registered_at \
             FROM certificates WHERE therapist_id = $1",
        )
        .bind(therapist_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "certificates.get"))?;

        Ok(row.map(|r| DigitalCertificate {
            therapist_id: TherapistId::from(r.therapist_id),
            subject: r.subject,
            expires_at: r.expires_at,
            registered_at: r.registered_at,
        }))
    }
}
