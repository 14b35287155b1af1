//! Canonical test fixtures
//!
//! Stable values used across the suite, chosen to line up with the billing
//! scenarios the engine is exercised against.

use chrono::NaiveDate;

use core_kernel::{BillingMonth, Cpf, Money};

/// Money amounts
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// The standard session price: R$ 180,00
    pub fn session_price() -> Money {
        Money::from_cents(18000)
    }

    /// Three sessions at the standard price: R$ 540,00
    pub fn three_session_total() -> Money {
        Money::from_cents(54000)
    }
}

/// Dates and months
pub struct TemporalFixtures;

impl TemporalFixtures {
    pub fn june_2025() -> BillingMonth {
        BillingMonth::new(2025, 6).unwrap()
    }

    pub fn july_2025() -> BillingMonth {
        BillingMonth::new(2025, 7).unwrap()
    }

    pub fn billing_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }
}

/// Valid documents
pub struct DocumentFixtures;

impl DocumentFixtures {
    /// A well-known valid CPF
    pub fn cpf() -> Cpf {
        Cpf::parse("111.444.777-35").unwrap()
    }

    /// A second, distinct valid CPF
    pub fn other_cpf() -> Cpf {
        Cpf::parse("529.982.247-25").unwrap()
    }
}
