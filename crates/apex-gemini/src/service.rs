//! Analysis service: builds the request for a mode, runs it through the
//! retrying executor and turns the text into a typed result.

use apex_core::{
    Analysis, AnalysisMode, AnalysisRequest, ClassifiedError, ImageData, Report, SuggestionSet,
};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::client::{GenerateRequest, GenerativeModel};
use crate::prompts;
use crate::retry::{RetryPolicy, RetryingExecutor};

/// Build the generation request for one screenshot.
pub fn build_request(image: ImageData, mode: AnalysisMode) -> GenerateRequest {
    GenerateRequest {
        prompt: prompts::prompt_for(mode).to_string(),
        image,
        temperature: prompts::temperature_for(mode),
        response_mime_type: prompts::response_mime_for(mode).map(str::to_string),
    }
}

/// Serves both analysis modes over one model.
pub struct AnalysisService<M> {
    executor: RetryingExecutor<M>,
}

impl<M: GenerativeModel> AnalysisService<M> {
    pub fn new(model: M, policy: RetryPolicy) -> Self {
        Self {
            executor: RetryingExecutor::new(model, policy),
        }
    }

    pub fn executor(&self) -> &RetryingExecutor<M> {
        &self.executor
    }

    /// Validate raw upload bytes and analyze them. Invalid image data is
    /// rejected before any model call.
    pub async fn submit(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        mode: AnalysisMode,
    ) -> Result<Analysis, ClassifiedError> {
        let image = ImageData::new(bytes, mime_type).map_err(ClassifiedError::from)?;
        self.analyze(AnalysisRequest { image, mode }).await
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<Analysis, ClassifiedError> {
        let span = info_span!(
            "analysis",
            request_id = %Uuid::new_v4(),
            mode = %request.mode,
        );

        async move {
            info!(mime = %request.image.mime(), bytes = request.image.len(), "Analyzing screenshot");
            let result = match request.mode {
                AnalysisMode::Suggestions => self
                    .suggest_replies(request.image)
                    .await
                    .map(Analysis::Suggestions),
                AnalysisMode::Report => self
                    .generate_report(request.image)
                    .await
                    .map(|markdown| Analysis::Report { markdown }),
            };
            if let Err(err) = &result {
                info!(category = %err.category(), "Analysis failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Ask for reply suggestions and parse the JSON answer.
    pub async fn suggest_replies(&self, image: ImageData) -> Result<SuggestionSet, ClassifiedError> {
        let request = build_request(image, AnalysisMode::Suggestions);
        let text = self.executor.execute(&request).await?;
        let set = SuggestionSet::parse(&text)?;
        info!(count = set.len(), "Suggestions ready");
        Ok(set)
    }

    /// Ask for a growth report. The Markdown comes back untouched.
    pub async fn generate_report(&self, image: ImageData) -> Result<Report, ClassifiedError> {
        let request = build_request(image, AnalysisMode::Report);
        let text = self.executor.execute(&request).await?;
        info!(len = text.len(), "Report ready");
        Ok(Report::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::tests::{fast_policy, Outcome, ScriptedModel};
    use apex_core::ErrorCategory;
    use std::sync::Arc;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn service(model: &Arc<ScriptedModel>) -> AnalysisService<Arc<ScriptedModel>> {
        AnalysisService::new(Arc::clone(model), fast_policy(3))
    }

    fn image() -> ImageData {
        ImageData::new(PNG.to_vec(), "image/png").unwrap()
    }

    #[tokio::test]
    async fn test_suggestions_happy_path() {
        let model = Arc::new(ScriptedModel::always(Outcome::Text(
            r#"{"suggestions":[{"style":"Insightful","text":"Great point about X."}]}"#,
        )));
        let result = service(&model)
            .submit(PNG.to_vec(), "image/png", AnalysisMode::Suggestions)
            .await
            .unwrap();

        match result {
            Analysis::Suggestions(set) => {
                assert_eq!(set.len(), 1);
                assert_eq!(set.suggestions[0].style, "Insightful");
                assert_eq!(set.suggestions[0].text, "Great point about X.");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_suggestions_not_json() {
        let model = Arc::new(ScriptedModel::always(Outcome::Text("Sure! Here are some replies")));
        let err = service(&model).suggest_replies(image()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Unexpected);
        assert!(err.message().contains("not valid JSON"));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_suggestions_wrong_shape() {
        let model = Arc::new(ScriptedModel::always(Outcome::Text(r#"{"foo":[]}"#)));
        let err = service(&model).suggest_replies(image()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Unexpected);
        assert!(err.message().contains("not in the expected format"));
    }

    #[tokio::test]
    async fn test_invalid_image_never_calls_model() {
        let model = Arc::new(ScriptedModel::always(Outcome::Text("{}")));
        let svc = service(&model);

        let err = svc
            .submit(Vec::new(), "image/png", AnalysisMode::Report)
            .await
            .unwrap_err();
        assert!(err.message().starts_with("Invalid image data"));

        let err = svc
            .submit(PNG.to_vec(), "image/webp", AnalysisMode::Report)
            .await
            .unwrap_err();
        assert!(err.message().starts_with("Invalid image data"));

        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_report_is_passed_through() {
        let markdown = "# \u{1F680} APEX Growth Report\n- \u{2705} **ok**\n";
        let model = Arc::new(ScriptedModel::always(Outcome::Text(markdown)));
        let result = service(&model)
            .analyze(AnalysisRequest {
                image: image(),
                mode: AnalysisMode::Report,
            })
            .await
            .unwrap();

        assert_eq!(result.mode(), AnalysisMode::Report);
        match result {
            Analysis::Report { markdown: report } => assert_eq!(report.markdown(), markdown),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_report_recovers_after_transient_failure() {
        let model = Arc::new(ScriptedModel::new(vec![
            Outcome::Api(503, "The model is overloaded."),
            Outcome::Text("# Report"),
        ]));
        let report = service(&model).generate_report(image()).await.unwrap();
        assert_eq!(report.markdown(), "# Report");
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_is_classified() {
        let model = Arc::new(ScriptedModel::always(Outcome::Api(400, "API key not valid.")));
        let err = service(&model)
            .submit(PNG.to_vec(), "image/png", AnalysisMode::Suggestions)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::AuthInvalid);
        assert_eq!(model.call_count(), 1);
    }

    #[test]
    fn test_build_request_per_mode() {
        let suggestions = build_request(image(), AnalysisMode::Suggestions);
        assert_eq!(suggestions.temperature, 0.5);
        assert_eq!(suggestions.response_mime_type.as_deref(), Some("application/json"));
        assert!(suggestions.prompt.contains("Echo"));

        let report = build_request(image(), AnalysisMode::Report);
        assert_eq!(report.temperature, 0.7);
        assert_eq!(report.response_mime_type, None);
        assert!(report.prompt.contains(prompts::REPORT_HEADING));
    }
}
