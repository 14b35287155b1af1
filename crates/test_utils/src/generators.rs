//! Randomized data generators
//!
//! Built on `fake` for names and free text; CPF digits are generated with a
//! real mod-11 tail so they pass kernel validation.

use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;

use core_kernel::Cpf;

/// A random person name
pub fn person_name() -> String {
    Name().fake()
}

/// A random statement-description line
pub fn statement_description() -> String {
    let text: String = Sentence(3..6).fake();
    text.to_uppercase()
}

/// A random valid CPF
pub fn cpf() -> Cpf {
    loop {
        let base: Vec<u32> = (0..9).map(|_| (0..10u32).fake()).collect();
        // All-equal bases are rejected by validation; extremely rare, re-roll
        if base.iter().all(|&d| d == base[0]) {
            continue;
        }
        let d1 = check_digit(&base, 10);
        let mut with_d1 = base.clone();
        with_d1.push(d1);
        let d2 = check_digit(&with_d1, 11);

        let digits: String = base
            .iter()
            .chain([&d1, &d2])
            .map(|d| char::from_digit(*d, 10).unwrap())
            .collect();
        return Cpf::parse(&digits).expect("generated CPF is valid");
    }
}

fn check_digit(digits: &[u32], start_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (start_weight - i as u32))
        .sum();
    let rem = sum % 11;
    if rem < 2 {
        0
    } else {
        11 - rem
    }
}
