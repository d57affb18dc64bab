//! Samplers for dictionary-backed kinds.

use super::strings;
use super::weighted::WeightedSet;
use crate::dictionaries::PhoneCode;
use datagen_core::{City, Person};
use rand::Rng;

pub const EMAIL_PROVIDERS: [&str; 4] = ["gaagle.com", "yahaa.com", "uutlook.com", "email.fr"];

/// Total number of characters of a phone number, indicator included.
const PHONE_DIGITS: usize = 11;

/// Cities weighted by population relative to the smallest city of the set.
pub fn city_set(mut cities: Vec<City>) -> WeightedSet<City> {
    if cities.is_empty() {
        cities.push(City::fallback());
    }
    let min_population = cities
        .iter()
        .map(|c| c.population)
        .filter(|p| *p > 0)
        .min()
        .unwrap_or(1);
    let entries: Vec<(City, u64)> = cities
        .into_iter()
        .map(|c| {
            let weight = (c.population / min_population).max(1);
            (c, weight)
        })
        .collect();
    WeightedSet::new(entries).unwrap_or_else(|| WeightedSet::single(City::fallback()))
}

pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.gen_range(0..items.len())])
    }
}

/// `<prefix><first name>@<provider>`, the prefix being one random
/// character or another first name followed by a dot.
pub fn email<R: Rng + ?Sized>(rng: &mut R, names: &[Person]) -> String {
    let first = |rng: &mut R| {
        pick(rng, names)
            .map(|p| p.first_name.clone())
            .unwrap_or_else(|| "anonymous".to_string())
    };
    let prefix = if rng.gen_bool(0.5) {
        strings::alphanumeric(rng, 1)
    } else {
        format!("{}.", first(rng))
    };
    let name = first(rng);
    let provider = EMAIL_PROVIDERS[rng.gen_range(0..EMAIL_PROVIDERS.len())];
    format!("{prefix}{name}@{provider}")
}

/// `+<indicator> ` followed by enough digits to reach eleven in total.
pub fn phone<R: Rng + ?Sized>(rng: &mut R, codes: &[PhoneCode]) -> String {
    let indicator = pick(rng, codes)
        .map(|c| c.indicator.as_str())
        .unwrap_or("00");
    let digits = PHONE_DIGITS.saturating_sub(indicator.len());
    let mut out = format!("+{indicator} ");
    for _ in 0..digits {
        out.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    out
}
