use chrono::{DateTime, Datelike, TimeZone, Utc};
use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, StateAbbr, StreetName, ZipCode};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use rand::{Rng, RngCore};
use rust_decimal::Decimal;

use seedgraph_core::{GeneratedValue, SemanticType, ValueConstraint};

use crate::errors::GenerationError;

const DEFAULT_INT_MIN: i64 = 0;
const DEFAULT_INT_MAX: i64 = 9999;
const DEFAULT_DECIMAL_MIN: f64 = 0.0;
const DEFAULT_DECIMAL_MAX: f64 = 9999.99;
const DEFAULT_DECIMAL_SCALE: u32 = 2;

/// Produces one synthetic value for a semantic type and optional constraint.
///
/// Randomness is supplied by the caller so a seeded rng yields repeatable rows.
pub trait FieldGenerator {
    fn generate(
        &self,
        semantic: SemanticType,
        constraint: Option<&ValueConstraint>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError>;
}

impl<F: FieldGenerator + ?Sized> FieldGenerator for Box<F> {
    fn generate(
        &self,
        semantic: SemanticType,
        constraint: Option<&ValueConstraint>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        (**self).generate(semantic, constraint, rng)
    }
}

impl<F: FieldGenerator + ?Sized> FieldGenerator for &F {
    fn generate(
        &self,
        semantic: SemanticType,
        constraint: Option<&ValueConstraint>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        (**self).generate(semantic, constraint, rng)
    }
}

/// Field generator backed by the `fake` crate (en locale).
#[derive(Debug, Clone)]
pub struct FakeFieldGenerator {
    now: DateTime<Utc>,
}

impl Default for FakeFieldGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeFieldGenerator {
    pub fn new() -> Self {
        Self { now: Utc::now() }
    }

    /// Pin the clock used for timestamps so seeded runs are repeatable.
    pub fn with_now(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Timestamps fall between the start of the current decade and `now`.
    fn timestamp(&self, rng: &mut dyn RngCore) -> GeneratedValue {
        let decade = self.now.year() - self.now.year().rem_euclid(10);
        let start = Utc
            .with_ymd_and_hms(decade, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(self.now);
        let secs = rng.random_range(start.timestamp()..=self.now.timestamp());
        GeneratedValue::Timestamp(DateTime::from_timestamp(secs, 0).unwrap_or(self.now))
    }
}

impl FieldGenerator for FakeFieldGenerator {
    fn generate(
        &self,
        semantic: SemanticType,
        constraint: Option<&ValueConstraint>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        let max_len = match constraint {
            Some(ValueConstraint::MaxLength { max }) => Some(*max),
            _ => None,
        };

        let value = match semantic {
            SemanticType::Identifier => {
                return Err(GenerationError::Unsupported {
                    semantic,
                    reason: "identifier values are assigned by the sink".to_string(),
                });
            }
            SemanticType::FirstName => text(FirstName().fake_with_rng(rng), max_len),
            SemanticType::LastName => text(LastName().fake_with_rng(rng), max_len),
            SemanticType::FullName => text(Name().fake_with_rng(rng), max_len),
            SemanticType::Address => {
                let building: String = BuildingNumber().fake_with_rng(rng);
                let street: String = StreetName().fake_with_rng(rng);
                let city: String = CityName().fake_with_rng(rng);
                let state: String = StateAbbr().fake_with_rng(rng);
                let zip: String = ZipCode().fake_with_rng(rng);
                text(format!("{building} {street}\n{city}, {state} {zip}"), max_len)
            }
            SemanticType::Word => text(Word().fake_with_rng(rng), max_len),
            SemanticType::Sentence => text(Sentence(3..10).fake_with_rng(rng), max_len),
            SemanticType::Paragraph => text(Paragraph(1..4).fake_with_rng(rng), max_len),
            SemanticType::Integer => {
                let (min, max) = match constraint {
                    Some(ValueConstraint::IntRange { min, max }) => (*min, *max),
                    _ => (DEFAULT_INT_MIN, DEFAULT_INT_MAX),
                };
                if min > max {
                    return Err(GenerationError::Unsupported {
                        semantic,
                        reason: format!("int range min {min} exceeds max {max}"),
                    });
                }
                GeneratedValue::Int(rng.random_range(min..=max))
            }
            SemanticType::Decimal => {
                let (min, max, scale) = match constraint {
                    Some(ValueConstraint::DecimalRange { min, max, scale }) => {
                        (*min, *max, *scale)
                    }
                    _ => (DEFAULT_DECIMAL_MIN, DEFAULT_DECIMAL_MAX, DEFAULT_DECIMAL_SCALE),
                };
                decimal(min, max, scale, rng).ok_or_else(|| GenerationError::Unsupported {
                    semantic,
                    reason: format!("no value with scale {scale} in [{min}, {max}]"),
                })?
            }
            SemanticType::Boolean => GeneratedValue::Bool(rng.random_bool(0.5)),
            SemanticType::Timestamp => self.timestamp(rng),
            SemanticType::Enumerated => {
                let values = match constraint {
                    Some(ValueConstraint::OneOf { values }) if !values.is_empty() => values,
                    _ => {
                        return Err(GenerationError::Unsupported {
                            semantic,
                            reason: "enumerated values require one_of choices".to_string(),
                        });
                    }
                };
                let idx = rng.random_range(0..values.len());
                GeneratedValue::Text(values[idx].clone())
            }
        };

        Ok(value)
    }
}

fn text(value: String, max_len: Option<usize>) -> GeneratedValue {
    match max_len {
        Some(max) if value.chars().count() > max => {
            let truncated: String = value.chars().take(max).collect();
            GeneratedValue::Text(truncated.trim_end().to_string())
        }
        _ => GeneratedValue::Text(value),
    }
}

fn decimal(min: f64, max: f64, scale: u32, rng: &mut dyn RngCore) -> Option<GeneratedValue> {
    let factor = 10_f64.powi(i32::try_from(scale).ok()?);
    let low = (min * factor).ceil();
    let high = (max * factor).floor();
    if !(low <= high) || low < i64::MIN as f64 || high > i64::MAX as f64 {
        return None;
    }
    let units = rng.random_range(low as i64..=high as i64);
    Some(GeneratedValue::Decimal(Decimal::new(units, scale)))
}
