use serde::{Deserialize, Serialize};

/// What kind of value a column holds, as understood by the field generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Generated key assigned by the sink.
    Identifier,
    FirstName,
    LastName,
    FullName,
    Address,
    Word,
    Sentence,
    Paragraph,
    Integer,
    Decimal,
    Boolean,
    Timestamp,
    /// One of a declared set of labels (requires [`ValueConstraint::OneOf`]).
    Enumerated,
}

/// Storage category of a column, used to derive DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    Identifier,
    ShortText,
    LongText,
    Integer,
    Decimal,
    Boolean,
    Timestamp,
    Enumerated,
}

impl SemanticType {
    pub fn storage_class(self) -> StorageClass {
        match self {
            SemanticType::Identifier => StorageClass::Identifier,
            SemanticType::FirstName
            | SemanticType::LastName
            | SemanticType::FullName
            | SemanticType::Address
            | SemanticType::Word => StorageClass::ShortText,
            SemanticType::Sentence | SemanticType::Paragraph => StorageClass::LongText,
            SemanticType::Integer => StorageClass::Integer,
            SemanticType::Decimal => StorageClass::Decimal,
            SemanticType::Boolean => StorageClass::Boolean,
            SemanticType::Timestamp => StorageClass::Timestamp,
            SemanticType::Enumerated => StorageClass::Enumerated,
        }
    }

    /// Whether `constraint` can be applied to values of this type.
    pub fn accepts(self, constraint: &ValueConstraint) -> bool {
        match constraint {
            ValueConstraint::IntRange { .. } => self == SemanticType::Integer,
            ValueConstraint::DecimalRange { .. } => self == SemanticType::Decimal,
            ValueConstraint::OneOf { .. } => self == SemanticType::Enumerated,
            ValueConstraint::MaxLength { .. } => matches!(
                self.storage_class(),
                StorageClass::ShortText | StorageClass::LongText
            ),
        }
    }
}

/// Optional restriction passed to the field generator alongside the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueConstraint {
    /// Inclusive integer bounds.
    IntRange { min: i64, max: i64 },
    /// Inclusive decimal bounds, rounded to `scale` fractional digits.
    DecimalRange { min: f64, max: f64, scale: u32 },
    /// Closed set of labels.
    OneOf { values: Vec<String> },
    /// Maximum number of characters.
    MaxLength { max: usize },
}

impl ValueConstraint {
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueConstraint::OneOf {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns a reason when the constraint is self-contradictory.
    pub fn problem(&self) -> Option<String> {
        match self {
            ValueConstraint::IntRange { min, max } if min > max => {
                Some(format!("int range min {min} exceeds max {max}"))
            }
            ValueConstraint::DecimalRange { min, max, .. }
                if !min.is_finite() || !max.is_finite() =>
            {
                Some("decimal range bounds must be finite".to_string())
            }
            ValueConstraint::DecimalRange { min, max, .. } if !(min <= max) => {
                Some(format!("decimal range min {min} exceeds max {max}"))
            }
            ValueConstraint::DecimalRange { scale, .. } if *scale > 10 => {
                Some(format!("decimal scale {scale} is larger than 10"))
            }
            ValueConstraint::OneOf { values } if values.is_empty() => {
                Some("enumerated choices must not be empty".to_string())
            }
            ValueConstraint::MaxLength { max: 0 } => Some("max length must be positive".to_string()),
            _ => None,
        }
    }
}
