//! Fixtures for engine and batch tests, on top of the discovery fakes.

use async_trait::async_trait;

use leadscout_analysis::{Classification, ContentClassifier};
use leadscout_shared::{EnrichError, Result};

pub use leadscout_discovery::testing::*;

pub const GUTTERING_PAGE: &str = "5 Star Guttering\n\
    Seamless gutter installation and repair for homes in Pasco, WA.\n\
    Licensed and insured. Free estimates.\n\
    Call (509) 555-0147";

pub const THERMAL_PAGE: &str = "Thermal Heating & Cooling\n\
    Serving Yakima and the Lower Valley with furnace and air conditioning repair.\n\
    Licensed, bonded and insured. Call (208) 555-0199.";

pub struct FailingClassifier;

#[async_trait]
impl ContentClassifier for FailingClassifier {
    async fn classify(&self, _text: &str, _business_name: &str) -> Result<Classification> {
        Err(EnrichError::parse("model unavailable"))
    }
}
