//! Numeric value generators.

use datagen_core::Value;
use rand::Rng;

/// Random `integer` in the given range (inclusive).
pub fn generate_integer<R: Rng + ?Sized>(rng: &mut R, min: i32, max: i32) -> Value {
    Value::Integer(rng.gen_range(min..=max))
}

/// Random `long` in the given range (inclusive).
pub fn generate_long<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> Value {
    Value::Long(rng.gen_range(min..=max))
}

/// Random `float` in the given range (inclusive).
pub fn generate_float<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> Value {
    if min == max {
        return Value::Float(min);
    }
    Value::Float(rng.gen_range(min..=max))
}

pub fn generate_bool<R: Rng + ?Sized>(rng: &mut R) -> Value {
    Value::Bool(rng.gen_bool(0.5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_integer() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            match generate_integer(&mut rng, 10, 20) {
                Value::Integer(v) => assert!((10..=20).contains(&v)),
                other => panic!("Expected Integer value, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_generate_long_full_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let value = generate_long(&mut rng, i64::MIN, i64::MAX - 1);
        assert!(matches!(value, Value::Long(_)));
    }

    #[test]
    fn test_generate_float() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            match generate_float(&mut rng, 0.0, 100.0) {
                Value::Float(v) => assert!((0.0..=100.0).contains(&v)),
                other => panic!("Expected Float value, got {other:?}"),
            }
        }
        assert_eq!(generate_float(&mut rng, 2.5, 2.5), Value::Float(2.5));
    }
}
