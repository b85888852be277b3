use core::convert::TryFrom;

use crate::{
    ClosedUnitF64, ClosedUnitF64Error, NonNegativeF64, NonNegativeF64Error, PositiveF64,
    PositiveF64Error,
};

#[test]
fn test_positive_f64_rejects_degenerate_values() {
    assert_eq!(PositiveF64::new(0.0), Err(PositiveF64Error(0.0)));
    assert_eq!(PositiveF64::new(-1.0), Err(PositiveF64Error(-1.0)));
    assert!(PositiveF64::new(f64::NAN).is_err());
    assert!(PositiveF64::new(f64::INFINITY).is_err());

    assert_eq!(PositiveF64::try_from(200.0).map(PositiveF64::get), Ok(200.0));
}

#[test]
fn test_non_negative_f64_rejects_negative_values() {
    assert_eq!(NonNegativeF64::new(-1e-12), Err(NonNegativeF64Error(-1e-12)));
    assert!(NonNegativeF64::new(f64::NAN).is_err());

    assert!(NonNegativeF64::new(0.0).map_or(false, NonNegativeF64::is_zero));
    assert_eq!(
        NonNegativeF64::new(f64::INFINITY).map(NonNegativeF64::get),
        Ok(f64::INFINITY)
    );
}

#[test]
fn test_non_negative_over_positive() {
    let rate = NonNegativeF64::new(3.0).unwrap_or_else(|_| NonNegativeF64::zero());
    let size = PositiveF64::new(2.0).unwrap_or_else(|_| unreachable!());

    assert_eq!((rate / size).get(), 1.5);
}

#[test]
fn test_closed_unit_f64_rejects_values_outside_the_unit_interval() {
    assert_eq!(ClosedUnitF64::new(-1e-12), Err(ClosedUnitF64Error(-1e-12)));
    assert_eq!(ClosedUnitF64::new(1.5), Err(ClosedUnitF64Error(1.5)));
    assert!(ClosedUnitF64::new(f64::NAN).is_err());

    assert_eq!(ClosedUnitF64::try_from(1.0), Ok(ClosedUnitF64::one()));
    assert_eq!(ClosedUnitF64::try_from(0.0), Ok(ClosedUnitF64::zero()));
    assert_eq!(
        ClosedUnitF64::new(0.25).map(ClosedUnitF64::one_minus),
        ClosedUnitF64::new(0.75)
    );
    assert_eq!(ClosedUnitF64::half(), 0.5);
}
