//! Page-content analysis: identity validation and contractor classification.

pub mod classifier;
pub mod validator;

pub use classifier::{
    Classification, ContentClassifier, KeywordClassifier, ServiceCategory, categorize,
};
pub use validator::{
    FACTOR_WEIGHT, NameMatchLevel, PARTIAL_NAME_WEIGHT, ValidationReport, distinctive_tokens,
    validate_identity,
};
