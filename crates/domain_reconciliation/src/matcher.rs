//! Weighted-signal transaction matching
//!
//! Each (transaction, period) pair is scored by independent signals; the
//! confidence is the sum of matched-signal weights, clipped to 1.0. A
//! transaction surfaces only its single best candidate, with ties broken by
//! the transaction date closest to the period's month end.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{
    BankTransactionId, BillingMonth, BillingPeriodId, Cpf, Money, PatientId, TherapistId,
};

use crate::normalize;
use crate::transaction::BankTransaction;

/// The independent signals a pair can match on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchSignal {
    /// Transaction description contains the period's billing reference
    #[serde(rename = "lv_reference_match")]
    ReferenceMatch,
    /// Sender document equals the patient document
    #[serde(rename = "cpf_match")]
    CpfMatch,
    /// Transaction amount equals the period total exactly
    #[serde(rename = "exact_amount_match")]
    ExactAmountMatch,
    /// Transaction amount within tolerance of the period total
    #[serde(rename = "close_amount_match")]
    CloseAmountMatch,
    /// Normalized sender name fuzzy-matches the patient name
    #[serde(rename = "name_match")]
    NameMatch,
}

impl MatchSignal {
    pub fn name(&self) -> &'static str {
        match self {
            MatchSignal::ReferenceMatch => "lv_reference_match",
            MatchSignal::CpfMatch => "cpf_match",
            MatchSignal::ExactAmountMatch => "exact_amount_match",
            MatchSignal::CloseAmountMatch => "close_amount_match",
            MatchSignal::NameMatch => "name_match",
        }
    }
}

/// Per-signal weights contributing to the confidence score
///
/// The defaults are deliberate, tunable values rather than reverse-engineered
/// constants; the reference signal alone clears a 0.5 confidence floor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchWeights {
    pub reference: f64,
    pub cpf: f64,
    pub exact_amount: f64,
    pub close_amount: f64,
    pub name: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            reference: 0.50,
            cpf: 0.30,
            exact_amount: 0.30,
            close_amount: 0.15,
            name: 0.20,
        }
    }
}

impl MatchWeights {
    fn weight_of(&self, signal: MatchSignal) -> f64 {
        match signal {
            MatchSignal::ReferenceMatch => self.reference,
            MatchSignal::CpfMatch => self.cpf,
            MatchSignal::ExactAmountMatch => self.exact_amount,
            MatchSignal::CloseAmountMatch => self.close_amount,
            MatchSignal::NameMatch => self.name,
        }
    }
}

/// An unpaid billing period as seen by the matcher (read model)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodCandidate {
    pub billing_period_id: BillingPeriodId,
    pub therapist_id: TherapistId,
    pub patient_id: PatientId,
    pub patient_name: String,
    pub patient_document: Option<Cpf>,
    pub billing_reference: String,
    pub total_amount: Money,
    pub month: BillingMonth,
}

/// Pre-filled values for the payment that would confirm a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSuggestion {
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub bank_transaction_id: BankTransactionId,
}

/// An advisory match between a bank transaction and a billing period
///
/// Never persisted as truth; a human operator confirms it by recording the
/// suggested payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub transaction_id: BankTransactionId,
    pub billing_period_id: BillingPeriodId,
    pub confidence: f64,
    pub signals: Vec<MatchSignal>,
    pub suggestion: PaymentSuggestion,
}

impl Match {
    /// True if the given signal contributed to this match
    pub fn has_signal(&self, signal: MatchSignal) -> bool {
        self.signals.contains(&signal)
    }
}

/// The scoring engine
#[derive(Debug, Clone)]
pub struct TransactionMatcher {
    /// Signal weights
    pub weights: MatchWeights,
    /// Close-amount tolerance as a fraction of the period total
    pub close_amount_tolerance: f64,
    /// How many months before the range end to search for unpaid periods
    pub lookback_months: u32,
}

impl TransactionMatcher {
    /// Creates a matcher with default weights, 5% tolerance, 4-month lookback
    pub fn new() -> Self {
        Self {
            weights: MatchWeights::default(),
            close_amount_tolerance: 0.05,
            lookback_months: 4,
        }
    }

    /// Overrides the signal weights
    pub fn with_weights(mut self, weights: MatchWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Overrides the close-amount tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.close_amount_tolerance = tolerance;
        self
    }

    /// Overrides the candidate lookback window
    pub fn with_lookback(mut self, months: u32) -> Self {
        self.lookback_months = months;
        self
    }

    /// Scores one pair; `None` when no signal matches
    fn evaluate(
        &self,
        transaction: &BankTransaction,
        candidate: &PeriodCandidate,
    ) -> Option<(f64, Vec<MatchSignal>)> {
        let mut signals = Vec::new();

        if transaction
            .description
            .to_uppercase()
            .contains(&candidate.billing_reference)
        {
            signals.push(MatchSignal::ReferenceMatch);
        }

        if let (Some(sender), Some(patient)) =
            (&transaction.sender_document, &candidate.patient_document)
        {
            if sender == patient {
                signals.push(MatchSignal::CpfMatch);
            }
        }

        if transaction.amount == candidate.total_amount {
            signals.push(MatchSignal::ExactAmountMatch);
        } else {
            let tolerance =
                candidate.total_amount.cents() as f64 * self.close_amount_tolerance;
            if transaction.amount.abs_diff(&candidate.total_amount) as f64 <= tolerance {
                signals.push(MatchSignal::CloseAmountMatch);
            }
        }

        if let Some(sender) = &transaction.sender_name {
            if normalize::names_match(sender, &candidate.patient_name) {
                signals.push(MatchSignal::NameMatch);
            }
        }

        if signals.is_empty() {
            return None;
        }

        let confidence: f64 = signals
            .iter()
            .map(|s| self.weights.weight_of(*s))
            .sum::<f64>()
            .min(1.0);
        Some((confidence, signals))
    }

    /// Best candidate per credit transaction, ordered by confidence descending
    pub fn best_matches(
        &self,
        transactions: &[BankTransaction],
        candidates: &[PeriodCandidate],
    ) -> Vec<Match> {
        let mut matches: Vec<Match> = transactions
            .iter()
            .filter(|t| t.is_credit())
            .filter_map(|transaction| {
                let mut best: Option<(f64, Vec<MatchSignal>, &PeriodCandidate)> = None;
                for candidate in candidates {
                    let Some((confidence, signals)) = self.evaluate(transaction, candidate)
                    else {
                        continue;
                    };
                    let better = match &best {
                        None => true,
                        Some((best_confidence, _, best_candidate)) => {
                            if (confidence - best_confidence).abs() > f64::EPSILON {
                                confidence > *best_confidence
                            } else {
                                // Tie: nearest transaction date to the month end
                                days_from_month_end(transaction.date, candidate.month)
                                    < days_from_month_end(
                                        transaction.date,
                                        best_candidate.month,
                                    )
                            }
                        }
                    };
                    if better {
                        best = Some((confidence, signals, candidate));
                    }
                }
                best.map(|(confidence, signals, candidate)| Match {
                    transaction_id: transaction.id,
                    billing_period_id: candidate.billing_period_id,
                    confidence,
                    signals,
                    suggestion: PaymentSuggestion {
                        amount: transaction.amount,
                        payment_date: transaction.date,
                        bank_transaction_id: transaction.id,
                    },
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches
    }
}

impl Default for TransactionMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn days_from_month_end(date: NaiveDate, month: BillingMonth) -> i64 {
    (date - month.last_day()).num_days().abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::TherapistId;

    fn candidate(reference: &str, cents: i64, month: BillingMonth) -> PeriodCandidate {
        PeriodCandidate {
            billing_period_id: BillingPeriodId::new(),
            therapist_id: TherapistId::new(),
            patient_id: PatientId::new(),
            patient_name: "Maria Silva".to_string(),
            patient_document: Some(Cpf::parse("111.444.777-35").unwrap()),
            billing_reference: reference.to_string(),
            total_amount: Money::from_cents(cents),
            month,
        }
    }

    fn june() -> BillingMonth {
        BillingMonth::new(2025, 6).unwrap()
    }

    #[test]
    fn test_reference_alone_clears_half_confidence() {
        let matcher = TransactionMatcher::new();
        let candidate = candidate("LV-1A2B3C", 54000, june());
        let txn = BankTransaction::credit(
            TherapistId::new(),
            Money::from_cents(99999),
            "ted recebida lv-1a2b3c",
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        );

        let (confidence, signals) = matcher.evaluate(&txn, &candidate).unwrap();
        assert!(confidence >= 0.5);
        assert_eq!(signals, vec![MatchSignal::ReferenceMatch]);
    }

    #[test]
    fn test_exact_and_close_amount_are_exclusive() {
        let matcher = TransactionMatcher::new();
        let candidate = candidate("LV-1A2B3C", 54000, june());

        let exact = BankTransaction::credit(
            TherapistId::new(),
            Money::from_cents(54000),
            "PIX",
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        );
        let (_, signals) = matcher.evaluate(&exact, &candidate).unwrap();
        assert_eq!(signals, vec![MatchSignal::ExactAmountMatch]);

        // Within 5%
        let close = BankTransaction::credit(
            TherapistId::new(),
            Money::from_cents(52000),
            "PIX",
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        );
        let (_, signals) = matcher.evaluate(&close, &candidate).unwrap();
        assert_eq!(signals, vec![MatchSignal::CloseAmountMatch]);

        // 10% off: no amount signal, no other signal either
        let far = BankTransaction::credit(
            TherapistId::new(),
            Money::from_cents(48600),
            "PIX",
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        );
        assert!(matcher.evaluate(&far, &candidate).is_none());
    }

    #[test]
    fn test_full_signal_stack_clips_to_one() {
        let matcher = TransactionMatcher::new();
        let candidate = candidate("LV-1A2B3C", 54000, june());
        let txn = BankTransaction::credit(
            TherapistId::new(),
            Money::from_cents(54000),
            "PIX RECEBIDO LV-1A2B3C",
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        )
        .with_sender("MARIA DA SILVA")
        .with_document(Cpf::parse("111.444.777-35").unwrap());

        let (confidence, signals) = matcher.evaluate(&txn, &candidate).unwrap();
        assert_eq!(confidence, 1.0);
        assert_eq!(signals.len(), 4);
        assert!(signals.contains(&MatchSignal::ReferenceMatch));
        assert!(signals.contains(&MatchSignal::CpfMatch));
        assert!(signals.contains(&MatchSignal::ExactAmountMatch));
        assert!(signals.contains(&MatchSignal::NameMatch));
    }

    #[test]
    fn test_best_matches_picks_single_candidate_per_transaction() {
        let matcher = TransactionMatcher::new();
        let strong = candidate("LV-AAAAAA", 54000, june());
        let weak = candidate("LV-BBBBBB", 53000, june());

        let txn = BankTransaction::credit(
            TherapistId::new(),
            Money::from_cents(54000),
            "PIX LV-AAAAAA",
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        );

        let matches = matcher.best_matches(&[txn.clone()], &[weak, strong.clone()]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].billing_period_id, strong.billing_period_id);
        assert_eq!(matches[0].suggestion.bank_transaction_id, txn.id);
        assert_eq!(matches[0].suggestion.amount.cents(), 54000);
    }

    #[test]
    fn test_tie_breaks_by_month_end_proximity() {
        let matcher = TransactionMatcher::new();
        let may = candidate("LV-AAAAAA", 54000, BillingMonth::new(2025, 5).unwrap());
        let june_candidate = candidate("LV-BBBBBB", 54000, june());

        // Same exact-amount score against both; dated July 1st, June's
        // month-end is far closer than May's
        let txn = BankTransaction::credit(
            TherapistId::new(),
            Money::from_cents(54000),
            "PIX",
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        );

        let matches = matcher.best_matches(&[txn], &[may, june_candidate.clone()]);
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].billing_period_id,
            june_candidate.billing_period_id
        );
    }

    #[test]
    fn test_debits_are_ignored() {
        let matcher = TransactionMatcher::new();
        let candidate = candidate("LV-AAAAAA", 54000, june());
        let txn = BankTransaction::credit(
            TherapistId::new(),
            Money::from_cents(54000),
            "ESTORNO LV-AAAAAA",
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        )
        .as_debit();

        assert!(matcher.best_matches(&[txn], &[candidate]).is_empty());
    }

    #[test]
    fn test_matches_ordered_by_confidence() {
        let matcher = TransactionMatcher::new();
        let first = candidate("LV-AAAAAA", 54000, june());
        let second = candidate("LV-BBBBBB", 20000, june());

        let weak = BankTransaction::credit(
            TherapistId::new(),
            Money::from_cents(20000),
            "PIX",
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        );
        let strong = BankTransaction::credit(
            TherapistId::new(),
            Money::from_cents(54000),
            "PIX LV-AAAAAA",
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        );

        let matches = matcher.best_matches(&[weak, strong], &[first, second]);
        assert_eq!(matches.len(), 2);
        assert!(matches[0].confidence > matches[1].confidence);
        assert!(matches[0].has_signal(MatchSignal::ReferenceMatch));
    }

    #[test]
    fn test_signal_serde_names() {
        assert_eq!(
            serde_json::to_string(&MatchSignal::ReferenceMatch).unwrap(),
            "\"lv_reference_match\""
        );
        assert_eq!(
            serde_json::to_string(&MatchSignal::CloseAmountMatch).unwrap(),
            "\"close_amount_match\""
        );
    }
}
