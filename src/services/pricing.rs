//! pricing.rs
//!
//! Расчет эффективной цены билета: окно early-bird плюс групповая скидка
//! по количеству. Чистые функции без побочных эффектов - единственный
//! источник правды для цены, используется и покупкой, и эндпоинтом
//! оценки стоимости.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::{ApiError, ApiResult};
use crate::models::event::TierSpec;
use crate::models::TicketTier;

// Пороги групповой скидки: от 5 билетов - одинарная, от 10 - двойная.
const GROUP_THRESHOLD: i32 = 5;
const LARGE_GROUP_THRESHOLD: i32 = 10;

// Максимальный настраиваемый процент скидки на тариф.
pub const MAX_GROUP_DISCOUNT: f64 = 50.0;

/// Цена за единицу для тарифа на момент `as_of` при покупке `quantity`
/// билетов. Скидка применяется к early-bird-цене, если окно еще открыто.
///
/// Суммарная скидка ограничена 100%: цена может дойти до нуля, но
/// никогда не становится отрицательной.
pub fn effective_price(tier: &TicketTier, quantity: i32, as_of: DateTime<Utc>) -> ApiResult<f64> {
    if !tier.price.is_finite() || tier.price < 0.0 {
        return Err(ApiError::InvalidTier);
    }

    let mut price = tier.price;

    // Окно early-bird: фиксированная цена до earlyBirdEnd.
    // Невалидная early-bird-цена откатывает на базовую.
    if let Some(end) = tier.early_bird_end {
        if as_of < end {
            if let Some(eb) = tier.early_bird_price {
                if eb.is_finite() && eb >= 0.0 {
                    price = eb;
                }
            }
        }
    }

    let discount = if quantity >= LARGE_GROUP_THRESHOLD {
        tier.group_discount_percent * 2.0
    } else if quantity >= GROUP_THRESHOLD {
        tier.group_discount_percent
    } else {
        0.0
    };
    let discount = discount.clamp(0.0, 100.0);

    Ok(price * (1.0 - discount / 100.0))
}

/// Валидация тарифов при создании/редактировании события. Имена
/// нормализуются в нижний регистр и должны быть уникальны в рамках
/// события.
pub fn validate_tier_specs(
    specs: &HashMap<String, TierSpec>,
) -> ApiResult<Vec<(String, TierSpec)>> {
    if specs.is_empty() {
        return Err(ApiError::Validation(
            "At least one ticket type is required".to_string(),
        ));
    }

    let mut normalized: Vec<(String, TierSpec)> = Vec::with_capacity(specs.len());

    for (raw_name, spec) in specs {
        let name = raw_name.trim().to_lowercase();
        if name.is_empty() {
            return Err(ApiError::Validation(
                "Ticket type name cannot be empty".to_string(),
            ));
        }
        if normalized.iter().any(|(n, _)| *n == name) {
            return Err(ApiError::Validation(format!(
                "Duplicate ticket type '{}'",
                name
            )));
        }
        if !spec.price.is_finite() || spec.price < 0.0 {
            return Err(ApiError::Validation(format!(
                "Invalid price for ticket type '{}'",
                name
            )));
        }
        if spec.capacity <= 0 {
            return Err(ApiError::Validation(format!(
                "Capacity for ticket type '{}' must be greater than zero",
                name
            )));
        }
        if let Some(eb) = spec.early_bird_price {
            if !eb.is_finite() || eb < 0.0 {
                return Err(ApiError::Validation(format!(
                    "Invalid early bird price for ticket type '{}'",
                    name
                )));
            }
        }
        if !spec.group_discount_percent.is_finite()
            || spec.group_discount_percent < 0.0
            || spec.group_discount_percent > MAX_GROUP_DISCOUNT
        {
            return Err(ApiError::Validation(format!(
                "Group discount for ticket type '{}' must be between 0 and {}",
                name, MAX_GROUP_DISCOUNT
            )));
        }
        normalized.push((name, spec.clone()));
    }

    normalized.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn tier(price: f64) -> TicketTier {
        TicketTier {
            id: 1,
            event_id: 1,
            name: "regular".to_string(),
            price,
            capacity: 100,
            sold: 0,
            early_bird_price: None,
            early_bird_end: None,
            group_discount_percent: 10.0,
        }
    }

    #[test]
    fn early_bird_applies_before_end() {
        let now = Utc::now();
        let mut t = tier(100.0);
        t.early_bird_price = Some(80.0);
        t.early_bird_end = Some(now + Duration::days(1));

        assert_eq!(effective_price(&t, 1, now).unwrap(), 80.0);
    }

    #[test]
    fn early_bird_expires_after_end() {
        let now = Utc::now();
        let mut t = tier(100.0);
        t.early_bird_price = Some(80.0);
        t.early_bird_end = Some(now - Duration::days(1));

        assert_eq!(effective_price(&t, 1, now).unwrap(), 100.0);
    }

    #[test]
    fn missing_early_bird_price_falls_back_to_base() {
        let now = Utc::now();
        let mut t = tier(100.0);
        t.early_bird_end = Some(now + Duration::days(1));

        assert_eq!(effective_price(&t, 1, now).unwrap(), 100.0);
    }

    #[test]
    fn group_discount_thresholds() {
        let now = Utc::now();
        let t = tier(100.0);

        assert_eq!(effective_price(&t, 4, now).unwrap(), 100.0);
        assert_eq!(effective_price(&t, 5, now).unwrap(), 90.0);
        assert_eq!(effective_price(&t, 10, now).unwrap(), 80.0);
    }

    #[test]
    fn group_discount_stacks_on_early_bird() {
        let now = Utc::now();
        let mut t = tier(100.0);
        t.early_bird_price = Some(80.0);
        t.early_bird_end = Some(now + Duration::days(1));

        // 80 * (1 - 10/100)
        assert_eq!(effective_price(&t, 5, now).unwrap(), 72.0);
    }

    #[test]
    fn discount_is_capped_at_free() {
        let now = Utc::now();
        let mut t = tier(100.0);
        t.group_discount_percent = 50.0;

        // 2 * 50% = 100%: бесплатно, но не отрицательно
        assert_eq!(effective_price(&t, 10, now).unwrap(), 0.0);
    }

    #[test]
    fn rejects_non_finite_price() {
        let now = Utc::now();
        assert!(matches!(
            effective_price(&tier(f64::NAN), 1, now),
            Err(ApiError::InvalidTier)
        ));
        assert!(matches!(
            effective_price(&tier(-5.0), 1, now),
            Err(ApiError::InvalidTier)
        ));
    }

    #[test]
    fn tier_spec_validation() {
        let mut specs = HashMap::new();
        specs.insert(
            "VIP".to_string(),
            TierSpec {
                price: 200.0,
                capacity: 50,
                early_bird_price: None,
                early_bird_end: None,
                group_discount_percent: 10.0,
            },
        );

        let normalized = validate_tier_specs(&specs).unwrap();
        assert_eq!(normalized[0].0, "vip");

        specs.insert(
            "cheap".to_string(),
            TierSpec {
                price: 10.0,
                capacity: 10,
                early_bird_price: None,
                early_bird_end: None,
                group_discount_percent: 60.0,
            },
        );
        assert!(validate_tier_specs(&specs).is_err());
    }

    proptest! {
        // Итоговая цена всегда в [0, base]: скидки не уводят в минус
        // и не увеличивают цену.
        #[test]
        fn price_bounded_by_base(
            price in 0.0f64..10_000.0,
            discount in 0.0f64..=50.0,
            quantity in 1i32..100,
        ) {
            let now = Utc::now();
            let mut t = tier(price);
            t.group_discount_percent = discount;

            let unit = effective_price(&t, quantity, now).unwrap();
            prop_assert!(unit >= 0.0);
            prop_assert!(unit <= price + f64::EPSILON);
        }
    }
}
