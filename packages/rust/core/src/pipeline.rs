//! Per-record pipeline: discover → validate → classify → aggregate.

use std::sync::Arc;

use tracing::instrument;

use leadscout_analysis::{Classification, ContentClassifier, validate_identity};
use leadscout_discovery::Discoverer;
use leadscout_shared::{
    AppConfig, BusinessRecord, EnrichError, Provenance, RecordContext, Result, ThresholdsConfig,
};

use crate::aggregate;

const STAGE: &str = "pipeline";

/// The resolution engine shared by every batch worker.
pub struct Engine {
    discoverer: Discoverer,
    classifier: Arc<dyn ContentClassifier>,
    thresholds: ThresholdsConfig,
    excerpt_chars: usize,
}

impl Engine {
    pub fn new(
        discoverer: Discoverer,
        classifier: Arc<dyn ContentClassifier>,
        config: &AppConfig,
    ) -> Self {
        Self {
            discoverer,
            classifier,
            thresholds: config.thresholds.clone(),
            excerpt_chars: config.crawl.excerpt_chars,
        }
    }

    pub fn thresholds(&self) -> &ThresholdsConfig {
        &self.thresholds
    }

    /// Resolve one pending record in place.
    ///
    /// A pending record always leaves this call `completed` or `failed`.
    /// Errors are recorded on the record; only [`EnrichError::QuotaExceeded`]
    /// is also returned so the caller can stop issuing work. A record that is
    /// not pending is refused unchanged.
    #[instrument(name = "record", skip_all, fields(id = record.id))]
    pub async fn process_record(&self, record: &mut BusinessRecord) -> Result<()> {
        record.begin_processing()?;
        let mut ctx = RecordContext::new(record.id, record.business_name.as_str());
        ctx.debug(
            STAGE,
            format!("attempt {} started", record.processing_attempts),
        );

        match self.resolve(record, &mut ctx).await {
            Ok(()) => {
                let outcome = record
                    .review_status()
                    .map(|r| r.as_str())
                    .unwrap_or("completed");
                ctx.flush(outcome);
                Ok(())
            }
            Err(e) => {
                record.fail(e.to_string());
                ctx.warn(STAGE, format!("record failed: {e}"));
                ctx.flush("failed");
                if e.is_quota_exceeded() { Err(e) } else { Ok(()) }
            }
        }
    }

    async fn resolve(&self, record: &mut BusinessRecord, ctx: &mut RecordContext) -> Result<()> {
        let outcome = self.discoverer.discover(record, ctx).await?;
        outcome.record_provenance(&mut record.provenance, self.excerpt_chars);

        let Some(winner) = outcome.winner else {
            record.mark_not_found();
            let decision = aggregate::decide(None, 0.0, &self.thresholds);
            ctx.info(STAGE, "no website, rejected");
            return record.complete(decision.confidence_score, decision.review);
        };

        record.mark_found(&winner.url)?;
        let content = winner.content.unwrap_or_default();

        let report = validate_identity(record, &content);
        ctx.info_with(
            "validation",
            "identity checked",
            serde_json::json!({
                "name": report.name_match,
                "license": report.license_match,
                "phone": report.phone_match,
                "address": report.address_match,
                "principal": report.principal_match,
                "confidence": report.confidence,
            }),
        );
        record.website_confidence = Some(report.confidence);
        record
            .provenance
            .record(Provenance::VALIDATION, to_json(&report)?);

        let classification = match self
            .classifier
            .classify(&content, &record.business_name)
            .await
        {
            Ok(c) => Some(c),
            Err(e) => {
                ctx.warn("classification", format!("classifier failed: {e}"));
                None
            }
        };
        let classification_confidence = classification.as_ref().map_or(0.0, |c| c.confidence);
        record.classification_confidence = Some(classification_confidence);
        if let Some(c) = &classification {
            apply_classification(record, c)?;
            ctx.debug(
                "classification",
                format!("{} ({:.2})", c.category, c.confidence),
            );
        }

        let decision = aggregate::decide(
            Some(report.confidence),
            classification_confidence,
            &self.thresholds,
        );
        if !decision.blended {
            ctx.info(
                STAGE,
                format!(
                    "validation {:.2} below {:.2}, rejected",
                    report.confidence, self.thresholds.min_validation
                ),
            );
        }
        ctx.info_with(
            STAGE,
            "scored",
            serde_json::json!({
                "score": decision.confidence_score,
                "review": decision.review.as_str(),
            }),
        );
        record.complete(decision.confidence_score, decision.review)
    }
}

fn apply_classification(record: &mut BusinessRecord, c: &Classification) -> Result<()> {
    record.mailer_category = Some(c.category.as_str().to_string());
    record.residential_focus = Some(c.residential_focus);
    record.provenance.record(Provenance::CLASSIFICATION, to_json(c)?);
    Ok(())
}

fn to_json(value: &impl serde::Serialize) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| EnrichError::parse(format!("provenance: {e}")))
}

#[cfg(test)]
mod tests {
    use leadscout_analysis::KeywordClassifier;
    use leadscout_shared::{ProcessingStatus, ReviewStatus, WebsiteStatus};

    use super::*;
    use crate::testing::*;

    fn engine(discoverer: Discoverer) -> Engine {
        Engine::new(discoverer, Arc::new(KeywordClassifier), &AppConfig::default())
    }

    #[tokio::test]
    async fn matching_site_is_found_and_blended() {
        let search = FakeSearch::default().reply(
            "5 Star Guttering Pasco WA",
            Reply::Hits(vec![guttering_hit()]),
        );
        let fetcher = FakeFetcher::default().page("https://5starguttering.com", GUTTERING_PAGE);
        let discoverer = discoverer(Arc::new(fetcher), quota(100, 5)).with_search(Arc::new(search));
        let engine = engine(discoverer);

        let mut record = guttering();
        engine.process_record(&mut record).await.unwrap();

        assert_eq!(record.processing_status(), ProcessingStatus::Completed);
        assert_eq!(record.website_status(), WebsiteStatus::Found);
        assert_eq!(record.website_url(), Some("https://5starguttering.com/"));

        let validation = record.website_confidence.unwrap();
        assert!(validation >= 0.4, "validation {validation}");
        let classification = record.classification_confidence.unwrap();
        let expected = 0.6 * validation + 0.4 * classification;
        assert!((record.confidence_score.unwrap() - expected).abs() < 1e-9);

        assert_eq!(record.mailer_category.as_deref(), Some("Roofing"));
        assert!(record.provenance.get(Provenance::VALIDATION).is_some());
        assert!(record.provenance.get(Provenance::CLASSIFICATION).is_some());
        assert_eq!(
            record.provenance.get(Provenance::DISCOVERY_METHOD).unwrap(),
            "web_search"
        );
    }

    #[tokio::test]
    async fn competitor_site_is_rejected() {
        let directory = FakeDirectory::default().domain("509 Heating & Cooling", "thermalhc.com");
        let fetcher = FakeFetcher::default().page("https://thermalhc.com", THERMAL_PAGE);
        let discoverer =
            discoverer(Arc::new(fetcher), quota(100, 5)).with_directory(Arc::new(directory));
        let engine = engine(discoverer);

        let mut record = BusinessRecord::new(2, "509 Heating & Cooling");
        record.city = Some("Yakima".into());
        record.state = Some("WA".into());
        engine.process_record(&mut record).await.unwrap();

        assert_eq!(record.website_status(), WebsiteStatus::Found);
        assert_eq!(record.website_confidence, Some(0.0));
        assert_eq!(record.confidence_score, Some(0.0));
        assert_eq!(record.review_status(), Some(ReviewStatus::Rejected));
        // Classification still ran for diagnostics
        assert!(record.classification_confidence.unwrap() > 0.0);
        assert_eq!(record.mailer_category.as_deref(), Some("HVAC"));
    }

    #[tokio::test]
    async fn crawl_failure_completes_as_rejected() {
        let search = FakeSearch::default().reply(
            "5 Star Guttering Pasco WA",
            Reply::Hits(vec![guttering_hit()]),
        );
        // Fetcher knows no pages: every crawl fails
        let discoverer = discoverer(Arc::new(FakeFetcher::default()), quota(100, 5))
            .with_search(Arc::new(search));
        let engine = engine(discoverer);

        let mut record = BusinessRecord::new(9, "5 Star Guttering");
        record.city = Some("Pasco".into());
        record.state = Some("WA".into());
        engine.process_record(&mut record).await.unwrap();

        assert_eq!(record.processing_status(), ProcessingStatus::Completed);
        assert_eq!(record.website_status(), WebsiteStatus::NotFound);
        assert_eq!(record.confidence_score, Some(0.0));
        assert_eq!(record.review_status(), Some(ReviewStatus::Rejected));
        assert!(record.error_message.is_none());
    }

    #[tokio::test]
    async fn exhausted_quota_fails_record_and_propagates() {
        let search = FakeSearch::default();
        let discoverer =
            discoverer(Arc::new(FakeFetcher::default()), quota(1, 5)).with_search(Arc::new(search));
        let engine = engine(discoverer);

        let mut record = guttering();
        let err = engine.process_record(&mut record).await.unwrap_err();

        assert!(err.is_quota_exceeded());
        assert_eq!(record.processing_status(), ProcessingStatus::Failed);
        assert!(record.review_status().is_none());
        assert!(record.confidence_score.is_none());
        assert!(record.error_message.is_some());
    }

    #[tokio::test]
    async fn classifier_error_degrades_to_zero() {
        let search = FakeSearch::default().reply(
            "5 Star Guttering Pasco WA",
            Reply::Hits(vec![guttering_hit()]),
        );
        let fetcher = FakeFetcher::default().page("https://5starguttering.com", GUTTERING_PAGE);
        let discoverer = discoverer(Arc::new(fetcher), quota(100, 5)).with_search(Arc::new(search));
        let engine = Engine::new(discoverer, Arc::new(FailingClassifier), &AppConfig::default());

        let mut record = guttering();
        engine.process_record(&mut record).await.unwrap();

        assert_eq!(record.processing_status(), ProcessingStatus::Completed);
        assert_eq!(record.classification_confidence, Some(0.0));
        assert!(record.mailer_category.is_none());
        let validation = record.website_confidence.unwrap();
        assert!((record.confidence_score.unwrap() - 0.6 * validation).abs() < 1e-9);
    }

    #[tokio::test]
    async fn only_pending_records_are_processed() {
        let engine = engine(discoverer(Arc::new(FakeFetcher::default()), quota(100, 5)));
        let mut record = guttering();
        record.fail("earlier failure");
        assert!(engine.process_record(&mut record).await.is_err());
        assert_eq!(record.error_message.as_deref(), Some("earlier failure"));
    }
}
