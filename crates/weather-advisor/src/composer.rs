//! Advisory Composer
//!
//! Turns collected weather summaries into one prompt and hands it to the
//! generation backend, either for a single completion or as a relayed stream.

use std::sync::Arc;

use advisor_core::{GenerationOptions, LlmProvider, Message};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::error::{AdvisorError, Result};
use crate::model::{AdviceFragment, StreamOutcome, WeatherSummary};

const PROMPT_HEADER: &str = "Weather advisor. Based on this data provide practical advice:";
const PROMPT_FOOTER: &str =
    "Include: summary, clothing advice, activity suggestions, warnings. Keep it concise.";

/// Advice prompt: one line per summary, in order, between fixed instructions
pub fn build_prompt(summaries: &[WeatherSummary]) -> String {
    let lines = summaries
        .iter()
        .map(WeatherSummary::prompt_line)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{PROMPT_HEADER}\n\n{lines}\n\n{PROMPT_FOOTER}")
}

#[derive(Clone)]
pub struct AdvisoryComposer {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl AdvisoryComposer {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.options.model
    }

    fn messages(summaries: &[WeatherSummary]) -> Vec<Message> {
        vec![Message::user(build_prompt(summaries))]
    }

    /// Full advice text in one call
    #[instrument(skip_all, fields(cities = summaries.len(), model = %self.options.model))]
    pub async fn compose_once(&self, summaries: &[WeatherSummary]) -> Result<String> {
        let completion = self
            .provider
            .complete(&Self::messages(summaries), &self.options)
            .await?;

        if completion.content.trim().is_empty() {
            return Err(AdvisorError::NoResponse);
        }

        debug!(
            chars = completion.content.len(),
            model = %completion.model,
            finish = ?completion.finish_reason,
            "Advice generated"
        );
        Ok(completion.content)
    }

    /// Relay generated segments into `sink` as they arrive.
    ///
    /// Each non-empty segment becomes one non-final fragment. Normal
    /// end-of-generation adds exactly one terminal fragment. A mid-stream
    /// failure returns `Generation` without sending the terminal fragment.
    /// A closed `sink` stops the relay and drops the upstream stream.
    #[instrument(skip_all, fields(cities = summaries.len(), model = %self.options.model))]
    pub async fn compose_stream(
        &self,
        summaries: &[WeatherSummary],
        sink: &mpsc::Sender<AdviceFragment>,
    ) -> Result<StreamOutcome> {
        let mut stream = self
            .provider
            .complete_stream(&Self::messages(summaries), &self.options)
            .await?;

        let mut relayed = 0usize;
        while let Some(item) = stream.next().await {
            let chunk = item.map_err(|e| AdvisorError::Generation(e.to_string()))?;

            if !chunk.delta.is_empty() {
                if sink.send(AdviceFragment::text(chunk.delta)).await.is_err() {
                    debug!(relayed, "Receiver dropped mid-stream");
                    return Ok(StreamOutcome::Cancelled);
                }
                relayed += 1;
            }

            if chunk.done {
                break;
            }
        }

        if sink.send(AdviceFragment::terminal()).await.is_err() {
            return Ok(StreamOutcome::Cancelled);
        }

        debug!(relayed, "Stream complete");
        Ok(StreamOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{
        CompletionStream, ProviderError, StreamChunk,
        provider::{Completion, FinishReason},
    };
    use async_trait::async_trait;

    /// Replays a fixed script of stream items
    struct ScriptedProvider {
        text: String,
        script: Vec<std::result::Result<StreamChunk, String>>,
    }

    impl ScriptedProvider {
        fn streaming(segments: &[&str]) -> Arc<Self> {
            let mut script: Vec<_> = segments.iter().map(|s| Ok(StreamChunk::text(*s))).collect();
            script.push(Ok(StreamChunk::finished()));
            Arc::new(Self {
                text: segments.concat(),
                script,
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> advisor_core::Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            options: &GenerationOptions,
        ) -> advisor_core::Result<Completion> {
            Ok(Completion {
                content: self.text.clone(),
                model: options.model.clone(),
                finish_reason: Some(FinishReason::Stop),
            })
        }

        async fn complete_stream(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> advisor_core::Result<CompletionStream> {
            let items: Vec<_> = self
                .script
                .iter()
                .cloned()
                .map(|item| item.map_err(ProviderError::Provider))
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn summaries() -> Vec<WeatherSummary> {
        vec![
            WeatherSummary {
                location_label: "London".into(),
                temperature_c: 11.0,
                condition: "slight rain".into(),
                humidity_pct: 88,
                wind_speed: 6.2,
            },
            WeatherSummary {
                location_label: "Tokyo".into(),
                temperature_c: 22.5,
                condition: "clear sky".into(),
                humidity_pct: 55,
                wind_speed: 2.0,
            },
        ]
    }

    fn composer(provider: Arc<ScriptedProvider>) -> AdvisoryComposer {
        AdvisoryComposer::new(provider, GenerationOptions::for_model("test"))
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt(&summaries());
        let expected = "Weather advisor. Based on this data provide practical advice:\n\n\
            City: London, Temp: 11.0°C, Condition: slight rain, Humidity: 88%, Wind: 6.2 m/s\n\
            City: Tokyo, Temp: 22.5°C, Condition: clear sky, Humidity: 55%, Wind: 2.0 m/s\n\n\
            Include: summary, clothing advice, activity suggestions, warnings. Keep it concise.";
        assert_eq!(prompt, expected);
    }

    #[tokio::test]
    async fn test_compose_once_returns_text() {
        let text = composer(ScriptedProvider::streaming(&["Take ", "an umbrella."]))
            .compose_once(&summaries())
            .await
            .unwrap();
        assert_eq!(text, "Take an umbrella.");
    }

    #[tokio::test]
    async fn test_compose_once_blank_is_no_response() {
        let err = composer(ScriptedProvider::streaming(&["  "]))
            .compose_once(&summaries())
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::NoResponse));
    }

    #[tokio::test]
    async fn test_stream_skips_empty_segments_and_ends_with_terminal() {
        let (tx, mut rx) = mpsc::channel(8);
        let outcome = composer(ScriptedProvider::streaming(&["Warm ", "", "day."]))
            .compose_stream(&summaries(), &tx)
            .await
            .unwrap();
        drop(tx);

        let mut fragments = Vec::new();
        while let Some(fragment) = rx.recv().await {
            fragments.push(fragment);
        }

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(
            fragments,
            vec![
                AdviceFragment::text("Warm "),
                AdviceFragment::text("day."),
                AdviceFragment::terminal(),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_error_has_no_terminal() {
        let provider = Arc::new(ScriptedProvider {
            text: String::new(),
            script: vec![
                Ok(StreamChunk::text("Partial")),
                Err("backend overloaded".into()),
            ],
        });

        let (tx, mut rx) = mpsc::channel(8);
        let err = composer(provider)
            .compose_stream(&summaries(), &tx)
            .await
            .unwrap_err();
        drop(tx);

        assert!(matches!(err, AdvisorError::Generation(ref msg) if msg.contains("overloaded")));
        assert_eq!(rx.recv().await, Some(AdviceFragment::text("Partial")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_stream_to_closed_sink_is_cancelled() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = composer(ScriptedProvider::streaming(&["a", "b"]))
            .compose_stream(&summaries(), &tx)
            .await
            .unwrap();
        assert_eq!(outcome, StreamOutcome::Cancelled);
    }
}
