//! Optional narrative text from an external model.
//!
//! A [`NarrativeSource`] is asked for free text describing a case. The wait is bounded by the
//! configured timeout, and any failure (timeout, `None`) simply leaves the assessment without a
//! narrative. Narratives are attached for display and never change score or level.

use crate::case::Case;
use std::future::Future;
use std::time::Duration;

/// Source of free-text case summaries.
pub trait NarrativeSource: Send + Sync {
    /// Returns a summary for `case`, or `None` when none is available.
    fn summarise(&self, case: &Case) -> impl Future<Output = Option<String>> + Send;
}

/// Deterministic demonstration narrative built from the case's own fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct DemoNarrative;

impl NarrativeSource for DemoNarrative {
    async fn summarise(&self, case: &Case) -> Option<String> {
        let symptoms = case
            .symptoms()
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let mut text = format!(
            "Based on the presented symptoms: {symptoms}. Chief complaint: {}.",
            case.chief_complaint()
        );
        if !case.medical_history().is_empty() {
            text.push_str(&format!(
                " Relevant history: {}.",
                case.medical_history().join(", ")
            ));
        }
        text.push_str(" Further clinical evaluation and targeted diagnostics as indicated.");
        Some(text)
    }
}

/// Source that never produces a narrative.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoNarrative;

impl NarrativeSource for NoNarrative {
    async fn summarise(&self, _case: &Case) -> Option<String> {
        None
    }
}

/// Asks `source` for a narrative, giving up after `timeout`.
pub async fn fetch_narrative<N: NarrativeSource>(
    source: &N,
    case: &Case,
    timeout: Duration,
) -> Option<String> {
    match tokio::time::timeout(timeout, source.summarise(case)).await {
        Ok(Some(text)) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_owned())
        }
        Ok(None) => {
            tracing::debug!("no narrative available for case {}", case.id());
            None
        }
        Err(_) => {
            tracing::warn!(
                "narrative for case {} timed out after {} ms",
                case.id(),
                timeout.as_millis()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::tests::sample_input;
    use chrono::Utc;

    struct SlowNarrative(Duration);

    impl NarrativeSource for SlowNarrative {
        async fn summarise(&self, _case: &Case) -> Option<String> {
            tokio::time::sleep(self.0).await;
            Some("too late".into())
        }
    }

    struct BlankNarrative;

    impl NarrativeSource for BlankNarrative {
        async fn summarise(&self, _case: &Case) -> Option<String> {
            Some("   ".into())
        }
    }

    fn case() -> Case {
        Case::new(sample_input(), Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn demo_narrative_mentions_symptoms() {
        let text = fetch_narrative(&DemoNarrative, &case(), Duration::from_secs(1))
            .await
            .expect("demo narrative is always available");
        assert!(text.contains("chest pain"));
        assert!(text.contains("hypertension"));
    }

    #[tokio::test]
    async fn no_narrative_yields_none() {
        assert!(fetch_narrative(&NoNarrative, &case(), Duration::from_secs(1))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let slow = SlowNarrative(Duration::from_millis(500));
        assert!(fetch_narrative(&slow, &case(), Duration::from_millis(20))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn blank_text_is_dropped() {
        assert!(fetch_narrative(&BlankNarrative, &case(), Duration::from_secs(1))
            .await
            .is_none());
    }
}
