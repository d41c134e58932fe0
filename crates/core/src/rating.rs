//! Aggregate product rating.
//!
//! A product's rating is always recomputed from the full set of its reviews;
//! no running sum or count is stored, so a failed write can never leave
//! drift behind.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::Rating;

/// Decimal places kept on a product's aggregate rating.
pub const RATING_PRECISION: u32 = 2;

/// Mean of `ratings`, rounded to [`RATING_PRECISION`] places.
///
/// Returns `None` when there are no ratings; what a product shows in that
/// case is the caller's decision.
///
/// ```
/// use essence_core::{Rating, average_rating};
/// use rust_decimal::Decimal;
///
/// let ratings = [5, 4, 5].map(|r| Rating::new(r).unwrap());
/// assert_eq!(average_rating(ratings), Some(Decimal::new(467, 2)));
/// assert_eq!(average_rating(Vec::<Rating>::new()), None);
/// ```
pub fn average_rating<I>(ratings: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Rating>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0_u64, 0_u64), |(sum, count), rating| {
            (sum + u64::from(rating.get()), count + 1)
        });
    if count == 0 {
        return None;
    }
    let mean = Decimal::from(sum) / Decimal::from(count);
    Some(mean.round_dp_with_strategy(RATING_PRECISION, RoundingStrategy::MidpointAwayFromZero))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ratings(values: &[i64]) -> Vec<Rating> {
        values.iter().map(|v| Rating::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_recompute_sequence() {
        assert_eq!(average_rating(ratings(&[5, 4, 5])), Some(Decimal::new(467, 2)));
        assert_eq!(average_rating(ratings(&[5, 4, 5, 3])), Some(Decimal::new(425, 2)));
        assert_eq!(average_rating(ratings(&[5, 4, 5])), Some(Decimal::new(467, 2)));
    }

    #[test]
    fn test_rounds_midpoint_away_from_zero() {
        // 37 / 8 = 4.625
        let values = ratings(&[5, 5, 5, 5, 5, 4, 4, 4]);
        assert_eq!(average_rating(values), Some(Decimal::new(463, 2)));
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(average_rating(ratings(&[3])), Some(Decimal::from(3)));
        assert_eq!(average_rating(Vec::new()), None);
    }
}
