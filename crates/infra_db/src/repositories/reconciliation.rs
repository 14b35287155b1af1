//! Reconciliation read-model adapter

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{
    BankTransactionId, BillingMonth, BillingPeriodId, Cpf, DomainPort, Money, PatientId,
    PortError, TherapistId,
};
use domain_reconciliation::{
    BankTransaction, PeriodCandidate, ReconciliationPort, TransactionType,
};

use crate::error::{corrupt_row, to_port_error};

/// PostgreSQL implementation of `ReconciliationPort`
#[derive(Debug, Clone)]
pub struct PostgresReconciliationAdapter {
    pool: PgPool,
}

impl PostgresReconciliationAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists an imported bank transaction (statement ingestion endpoint)
    pub async fn insert_transaction(
        &self,
        transaction: &BankTransaction,
    ) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO bank_transactions (\
                 transaction_id, therapist_id, amount_cents, description, transaction_date, \
                 sender_name, sender_document, transaction_type, imported_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.therapist_id.as_uuid())
        .bind(transaction.amount.cents())
        .bind(&transaction.description)
        .bind(transaction.date)
        .bind(&transaction.sender_name)
        .bind(
            transaction
                .sender_document
                .as_ref()
                .map(|d| d.as_digits().to_string()),
        )
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.imported_at)
        .execute(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "bank_transactions.insert"))?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    transaction_id: Uuid,
    therapist_id: Uuid,
    amount_cents: i64,
    description: String,
    transaction_date: NaiveDate,
    sender_name: Option<String>,
    sender_document: Option<String>,
    transaction_type: String,
    imported_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self) -> Result<BankTransaction, PortError> {
        let transaction_type = match self.transaction_type.as_str() {
            "credit" => TransactionType::Credit,
            "debit" => TransactionType::Debit,
            other => {
                return Err(corrupt_row(
                    "bank_transactions",
                    format!("unknown type '{}'", other),
                ))
            }
        };
        let sender_document = self
            .sender_document
            .map(|d| Cpf::parse(&d))
            .transpose()
            .map_err(|e| corrupt_row("bank_transactions", e))?;
        Ok(BankTransaction {
            id: BankTransactionId::from(self.transaction_id),
            therapist_id: TherapistId::from(self.therapist_id),
            amount: Money::from_cents(self.amount_cents),
            description: self.description,
            date: self.transaction_date,
            sender_name: self.sender_name,
            sender_document,
            transaction_type,
            imported_at: self.imported_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CandidateRow {
    period_id: Uuid,
    therapist_id: Uuid,
    patient_id: Uuid,
    full_name: String,
    document: Option<String>,
    billing_reference: String,
    total_amount_cents: i64,
    year: i32,
    month: i32,
}

impl CandidateRow {
    fn into_candidate(self) -> Result<PeriodCandidate, PortError> {
        let month = BillingMonth::new(self.year, self.month as u32)
            .map_err(|e| corrupt_row("billing_periods", e))?;
        let patient_document = self
            .document
            .map(|d| Cpf::parse(&d))
            .transpose()
            .map_err(|e| corrupt_row("patients", e))?;
        Ok(PeriodCandidate {
            billing_period_id: BillingPeriodId::from(self.period_id),
            therapist_id: TherapistId::from(self.therapist_id),
            patient_id: PatientId::from(self.patient_id),
            patient_name: self.full_name,
            patient_document,
            billing_reference: self.billing_reference,
            total_amount: Money::from_cents(self.total_amount_cents),
            month,
        })
    }
}

impl DomainPort for PostgresReconciliationAdapter {}

#[async_trait]
impl ReconciliationPort for PostgresReconciliationAdapter {
    async fn unclaimed_transactions(
        &self,
        therapist_id: TherapistId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BankTransaction>, PortError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT t.transaction_id, t.therapist_id, t.amount_cents, t.description, \
                    t.transaction_date, t.sender_name, t.sender_document, \
                    t.transaction_type, t.imported_at \
             FROM bank_transactions t \
             WHERE t.therapist_id = $1 \
               AND t.transaction_date BETWEEN $2 AND $3 \
               AND NOT EXISTS (\
                   SELECT 1 FROM payments p WHERE p.bank_transaction_id = t.transaction_id\
               ) \
             ORDER BY t.transaction_date, t.transaction_id",
        )
        .bind(therapist_id.as_uuid())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "bank_transactions.unclaimed"))?;

        rows.into_iter()
            .map(TransactionRow::into_transaction)
            .collect()
    }

    async fn unpaid_candidates(
        &self,
        therapist_id: TherapistId,
        since: BillingMonth,
    ) -> Result<Vec<PeriodCandidate>, PortError> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            "SELECT bp.period_id, bp.therapist_id, bp.patient_id, pa.full_name, pa.document, \
                    bp.billing_reference, bp.total_amount_cents, bp.year, bp.month \
             FROM billing_periods bp \
             JOIN patients pa ON pa.patient_id = bp.patient_id \
             WHERE bp.therapist_id = $1 \
               AND bp.status = 'processed' \
               AND (bp.year, bp.month) >= ($2, $3) \
             ORDER BY bp.year, bp.month",
        )
        .bind(therapist_id.as_uuid())
        .bind(since.year())
        .bind(since.month() as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "billing_periods.candidates"))?;

        rows.into_iter().map(CandidateRow::into_candidate).collect()
    }
}
