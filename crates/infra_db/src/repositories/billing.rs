//! Billing storage adapter
//!
//! Implements the atomic contracts of `BillingPort`: period + snapshots are
//! inserted in one transaction, and the void/payment transitions take
//! `SELECT ... FOR UPDATE` row locks before re-validating, so racing callers
//! serialize at the database. The identity-key and bank-transaction
//! uniqueness rules are additionally backed by partial unique indexes; a lost
//! insert race comes back as a conflict.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{
    BankTransactionId, BillingMonth, BillingPeriodId, DomainPort, Money, PatientId, PaymentId,
    PortError, TherapistId,
};
use domain_billing::{
    BillingPeriod, BillingPort, Payment, PaymentMethod, PeriodStatus, SessionSnapshot,
};

use crate::error::{corrupt_row, to_port_error};

/// PostgreSQL implementation of `BillingPort`
#[derive(Debug, Clone)]
pub struct PostgresBillingAdapter {
    pool: PgPool,
}

impl PostgresBillingAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PeriodRow {
    period_id: Uuid,
    therapist_id: Uuid,
    patient_id: Uuid,
    year: i32,
    month: i32,
    session_count: i32,
    total_amount_cents: i64,
    billing_reference: String,
    status: String,
    processed_at: DateTime<Utc>,
    processed_by: String,
    void_reason: Option<String>,
    voided_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    period_id: Uuid,
    external_event_id: String,
    session_date: NaiveDate,
    session_time: NaiveTime,
    patient_name: String,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    payment_id: Uuid,
    period_id: Uuid,
    amount_cents: i64,
    method: String,
    payment_date: NaiveDate,
    reference_number: Option<String>,
    bank_transaction_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

const SELECT_PERIOD: &str = "SELECT period_id, therapist_id, patient_id, year, month, session_count, \
     total_amount_cents, billing_reference, status, processed_at, processed_by, \
     void_reason, voided_at \
     FROM billing_periods";

const SELECT_PAYMENT: &str = "SELECT payment_id, period_id, amount_cents, method, payment_date, \
     reference_number, bank_transaction_id, created_at \
     FROM payments";

fn status_from_str(status: &str) -> Result<PeriodStatus, PortError> {
    match status {
        "processed" => Ok(PeriodStatus::Processed),
        "paid" => Ok(PeriodStatus::Paid),
        "void" => Ok(PeriodStatus::Void),
        other => Err(corrupt_row(
            "billing_periods",
            format!("unknown status '{}'", other),
        )),
    }
}

fn method_from_str(method: &str) -> Result<PaymentMethod, PortError> {
    match method {
        "pix" => Ok(PaymentMethod::Pix),
        "transfer" => Ok(PaymentMethod::Transfer),
        "cash" => Ok(PaymentMethod::Cash),
        "card" => Ok(PaymentMethod::Card),
        other => Err(corrupt_row(
            "payments",
            format!("unknown method '{}'", other),
        )),
    }
}

impl PeriodRow {
    fn into_period(self, snapshots: Vec<SessionSnapshot>) -> Result<BillingPeriod, PortError> {
        let month = BillingMonth::new(self.year, self.month as u32)
            .map_err(|e| corrupt_row("billing_periods", e))?;
        Ok(BillingPeriod {
            id: BillingPeriodId::from(self.period_id),
            therapist_id: TherapistId::from(self.therapist_id),
            patient_id: PatientId::from(self.patient_id),
            month,
            session_count: self.session_count as u32,
            total_amount: Money::from_cents(self.total_amount_cents),
            billing_reference: self.billing_reference,
            snapshots,
            status: status_from_str(&self.status)?,
            processed_at: self.processed_at,
            processed_by: self.processed_by,
            void_reason: self.void_reason,
            voided_at: self.voided_at,
        })
    }
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, PortError> {
        Ok(Payment {
            id: PaymentId::from(self.payment_id),
            billing_period_id: BillingPeriodId::from(self.period_id),
            amount: Money::from_cents(self.amount_cents),
            method: method_from_str(&self.method)?,
            payment_date: self.payment_date,
            reference_number: self.reference_number,
            bank_transaction_id: self.bank_transaction_id.map(BankTransactionId::from),
            created_at: self.created_at,
        })
    }
}

impl PostgresBillingAdapter {
    /// Loads the snapshots of a set of periods in one round trip
    async fn load_snapshots(
        &self,
        period_ids: &[Uuid],
    ) -> Result<std::collections::HashMap<Uuid, Vec<SessionSnapshot>>, PortError> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            "SELECT period_id, external_event_id, session_date, session_time, patient_name \
             FROM session_snapshots \
             WHERE period_id = ANY($1) \
             ORDER BY session_date, session_time",
        )
        .bind(period_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "session_snapshots.load"))?;

        let mut by_period: std::collections::HashMap<Uuid, Vec<SessionSnapshot>> =
            std::collections::HashMap::new();
        for row in rows {
            by_period
                .entry(row.period_id)
                .or_default()
                .push(SessionSnapshot {
                    external_event_id: row.external_event_id,
                    date: row.session_date,
                    time: row.session_time,
                    patient_name: row.patient_name,
                });
        }
        Ok(by_period)
    }

    async fn hydrate_periods(
        &self,
        rows: Vec<PeriodRow>,
    ) -> Result<Vec<BillingPeriod>, PortError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.period_id).collect();
        let mut snapshots = self.load_snapshots(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let snaps = snapshots.remove(&row.period_id).unwrap_or_default();
                row.into_period(snaps)
            })
            .collect()
    }
}

/// Locks every non-void period of the patient and returns (id, year, month,
/// status) tuples for the chronology re-check
async fn lock_patient_periods(
    tx: &mut Transaction<'_, Postgres>,
    patient_id: Uuid,
) -> Result<Vec<(Uuid, i32, i32, String)>, PortError> {
    let rows: Vec<(Uuid, i32, i32, String)> = sqlx::query_as(
        "SELECT period_id, year, month, status FROM billing_periods \
         WHERE patient_id = $1 AND status <> 'void' \
         ORDER BY year, month \
         FOR UPDATE",
    )
    .bind(patient_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| to_port_error(e, "billing_periods.lock"))?;
    Ok(rows)
}

impl DomainPort for PostgresBillingAdapter {}

#[async_trait]
impl BillingPort for PostgresBillingAdapter {
    async fn find_period(&self, id: BillingPeriodId) -> Result<BillingPeriod, PortError> {
        let row = sqlx::query_as::<_, PeriodRow>(&format!(
            "{} WHERE period_id = $1",
            SELECT_PERIOD
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "billing_periods.get"))?
        .ok_or_else(|| PortError::not_found("BillingPeriod", id))?;

        let mut snapshots = self.load_snapshots(&[row.period_id]).await?;
        row.into_period(snapshots.remove(id.as_uuid()).unwrap_or_default())
    }

    async fn find_active_period(
        &self,
        therapist_id: TherapistId,
        patient_id: PatientId,
        month: BillingMonth,
    ) -> Result<Option<BillingPeriod>, PortError> {
        let row = sqlx::query_as::<_, PeriodRow>(&format!(
            "{} WHERE therapist_id = $1 AND patient_id = $2 \
             AND year = $3 AND month = $4 AND status <> 'void'",
            SELECT_PERIOD
        ))
        .bind(therapist_id.as_uuid())
        .bind(patient_id.as_uuid())
        .bind(month.year())
        .bind(month.month() as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "billing_periods.get_active"))?;

        match row {
            None => Ok(None),
            Some(row) => {
                let mut snapshots = self.load_snapshots(&[row.period_id]).await?;
                let snaps = snapshots.remove(&row.period_id).unwrap_or_default();
                Ok(Some(row.into_period(snaps)?))
            }
        }
    }

    async fn periods_for_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<BillingPeriod>, PortError> {
        let rows = sqlx::query_as::<_, PeriodRow>(&format!(
            "{} WHERE patient_id = $1 AND status <> 'void' ORDER BY year, month",
            SELECT_PERIOD
        ))
        .bind(patient_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "billing_periods.for_patient"))?;

        self.hydrate_periods(rows).await
    }

    async fn periods_for_month(
        &self,
        therapist_id: TherapistId,
        month: BillingMonth,
    ) -> Result<Vec<BillingPeriod>, PortError> {
        let rows = sqlx::query_as::<_, PeriodRow>(&format!(
            "{} WHERE therapist_id = $1 AND year = $2 AND month = $3 AND status <> 'void'",
            SELECT_PERIOD
        ))
        .bind(therapist_id.as_uuid())
        .bind(month.year())
        .bind(month.month() as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "billing_periods.for_month"))?;

        self.hydrate_periods(rows).await
    }

    async fn insert_period(&self, period: &BillingPeriod) -> Result<(), PortError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| to_port_error(e, "billing_periods.insert"))?;

        sqlx::query(
            "INSERT INTO billing_periods (\
                 period_id, therapist_id, patient_id, year, month, session_count, \
                 total_amount_cents, billing_reference, status, processed_at, processed_by, \
                 void_reason, voided_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(period.id.as_uuid())
        .bind(period.therapist_id.as_uuid())
        .bind(period.patient_id.as_uuid())
        .bind(period.month.year())
        .bind(period.month.month() as i32)
        .bind(period.session_count as i32)
        .bind(period.total_amount.cents())
        .bind(&period.billing_reference)
        .bind(period.status.as_str())
        .bind(period.processed_at)
        .bind(&period.processed_by)
        .bind(&period.void_reason)
        .bind(period.voided_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| to_port_error(e, "billing_periods.insert"))?;

        for snapshot in &period.snapshots {
            sqlx::query(
                "INSERT INTO session_snapshots (\
                     snapshot_id, period_id, external_event_id, session_date, \
                     session_time, patient_name\
                 ) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(period.id.as_uuid())
            .bind(&snapshot.external_event_id)
            .bind(snapshot.date)
            .bind(snapshot.time)
            .bind(&snapshot.patient_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| to_port_error(e, "session_snapshots.insert"))?;
        }

        tx.commit()
            .await
            .map_err(|e| to_port_error(e, "billing_periods.insert"))?;
        Ok(())
    }

    async fn void_period(
        &self,
        id: BillingPeriodId,
        reason: &str,
    ) -> Result<BillingPeriod, PortError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| to_port_error(e, "billing_periods.void"))?;

        let locked: Option<(String,)> = sqlx::query_as(
            "SELECT status FROM billing_periods WHERE period_id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| to_port_error(e, "billing_periods.void"))?;

        let status = match locked {
            None => return Err(PortError::not_found("BillingPeriod", id)),
            Some((status,)) if status == "void" => {
                return Err(PortError::not_found("BillingPeriod", id))
            }
            Some((status,)) => status,
        };

        let (payment_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM payments WHERE period_id = $1")
                .bind(id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| to_port_error(e, "payments.count"))?;

        if payment_count > 0 || status != "processed" {
            return Err(PortError::conflict("billing period is no longer voidable"));
        }

        sqlx::query(
            "UPDATE billing_periods \
             SET status = 'void', void_reason = $2, voided_at = $3 \
             WHERE period_id = $1",
        )
        .bind(id.as_uuid())
        .bind(reason)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| to_port_error(e, "billing_periods.void"))?;

        tx.commit()
            .await
            .map_err(|e| to_port_error(e, "billing_periods.void"))?;

        self.find_period(id).await
    }

    async fn add_payment(&self, payment: &Payment) -> Result<BillingPeriod, PortError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| to_port_error(e, "payments.add"))?;

        let target: Option<(Uuid, i32, i32, String)> = sqlx::query_as(
            "SELECT patient_id, year, month, status FROM billing_periods \
             WHERE period_id = $1 FOR UPDATE",
        )
        .bind(payment.billing_period_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| to_port_error(e, "payments.add"))?;

        let (patient_id, year, month, status) = target.ok_or_else(|| {
            PortError::not_found("BillingPeriod", payment.billing_period_id)
        })?;
        if status != "processed" {
            return Err(PortError::conflict(format!(
                "billing period {} is not payable",
                payment.billing_period_id
            )));
        }

        // Chronology re-check under lock over all of the patient's periods
        let periods = lock_patient_periods(&mut tx, patient_id).await?;
        let older_unpaid = periods.iter().any(|(id, y, m, s)| {
            s == "processed"
                && *id != *payment.billing_period_id.as_uuid()
                && (*y, *m) < (year, month)
        });
        if older_unpaid {
            return Err(PortError::conflict(
                "an earlier billing period must be settled first",
            ));
        }

        if let Some(txn_id) = payment.bank_transaction_id {
            let (claimed,): (bool,) = sqlx::query_as(
                "SELECT EXISTS(SELECT 1 FROM payments WHERE bank_transaction_id = $1)",
            )
            .bind(txn_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| to_port_error(e, "payments.claim_check"))?;
            if claimed {
                return Err(PortError::conflict(format!(
                    "bank transaction {} is already claimed",
                    txn_id
                )));
            }
        }

        sqlx::query(
            "INSERT INTO payments (\
                 payment_id, period_id, amount_cents, method, payment_date, \
                 reference_number, bank_transaction_id, created_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(payment.id.as_uuid())
        .bind(payment.billing_period_id.as_uuid())
        .bind(payment.amount.cents())
        .bind(payment.method.as_str())
        .bind(payment.payment_date)
        .bind(&payment.reference_number)
        .bind(payment.bank_transaction_id.map(|t| *t.as_uuid()))
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| to_port_error(e, "payments.insert"))?;

        let updated = sqlx::query(
            "UPDATE billing_periods SET status = 'paid' \
             WHERE period_id = $1 AND status = 'processed'",
        )
        .bind(payment.billing_period_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| to_port_error(e, "billing_periods.mark_paid"))?;
        if updated.rows_affected() != 1 {
            return Err(PortError::conflict(
                "billing period changed while recording payment",
            ));
        }

        tx.commit()
            .await
            .map_err(|e| to_port_error(e, "payments.add"))?;

        self.find_period(payment.billing_period_id).await
    }

    async fn remove_payment(
        &self,
        id: PaymentId,
    ) -> Result<(Payment, BillingPeriod), PortError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| to_port_error(e, "payments.remove"))?;

        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "{} WHERE payment_id = $1 FOR UPDATE",
            SELECT_PAYMENT
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| to_port_error(e, "payments.remove"))?
        .ok_or_else(|| PortError::not_found("Payment", id))?;
        let payment = row.into_payment()?;

        // Lock the period row before deciding on the revert
        sqlx::query("SELECT status FROM billing_periods WHERE period_id = $1 FOR UPDATE")
            .bind(payment.billing_period_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| to_port_error(e, "billing_periods.lock"))?;

        sqlx::query("DELETE FROM payments WHERE payment_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| to_port_error(e, "payments.delete"))?;

        let (remaining,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM payments WHERE period_id = $1")
                .bind(payment.billing_period_id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| to_port_error(e, "payments.count"))?;

        if remaining == 0 {
            sqlx::query(
                "UPDATE billing_periods SET status = 'processed' \
                 WHERE period_id = $1 AND status = 'paid'",
            )
            .bind(payment.billing_period_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| to_port_error(e, "billing_periods.revert"))?;
        }

        tx.commit()
            .await
            .map_err(|e| to_port_error(e, "payments.remove"))?;

        let period = self.find_period(payment.billing_period_id).await?;
        Ok((payment, period))
    }

    async fn find_payment(&self, id: PaymentId) -> Result<Payment, PortError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "{} WHERE payment_id = $1",
            SELECT_PAYMENT
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "payments.get"))?
        .ok_or_else(|| PortError::not_found("Payment", id))?;
        row.into_payment()
    }

    async fn payments_for_period(
        &self,
        id: BillingPeriodId,
    ) -> Result<Vec<Payment>, PortError> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "{} WHERE period_id = $1 ORDER BY created_at",
            SELECT_PAYMENT
        ))
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "payments.for_period"))?;
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }
}
