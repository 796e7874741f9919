use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::{mpsc, Semaphore};

use crate::config::AnalysisOptions;
use crate::error::DeviceError;
use crate::executor::{execute_indexed, run_with_retry, RetryStrategy, StageContext};
use crate::inference::{InferenceBackend, InferenceClient};
use crate::record::{AnalysisResult, RawCaptureResult};

use super::prompt::render_prompt;

/// Per-device analysis under its own concurrency bound.
#[derive(Clone)]
pub struct AnalysisPipeline {
    client: InferenceClient,
    model: String,
    concurrency: usize,
    retry: Arc<dyn RetryStrategy>,
    prompt_template: String,
}

impl AnalysisPipeline {
    /// `concurrency` is the analysis bound M; values below 1 are raised to 1.
    pub fn new(
        client: InferenceClient,
        model: impl Into<String>,
        concurrency: usize,
        retry: Arc<dyn RetryStrategy>,
        prompt_template: impl Into<String>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            concurrency: concurrency.max(1),
            retry,
            prompt_template: prompt_template.into(),
        }
    }

    /// Pipeline over `backend` with the timeout, payload limit, bound, retry and prompt of `opts`.
    pub fn from_options(
        backend: Arc<dyn InferenceBackend>,
        model: impl Into<String>,
        opts: &AnalysisOptions,
    ) -> Self {
        Self::new(
            InferenceClient::new(backend, opts.inference_timeout, opts.max_payload_bytes),
            model,
            opts.concurrency,
            opts.retry.clone(),
            opts.prompt_template.clone(),
        )
    }

    /// Analyse an already complete capture sequence; output matches its order.
    pub async fn analyze_all(
        &self,
        captures: &[RawCaptureResult],
        ctx: &StageContext,
    ) -> Vec<AnalysisResult> {
        execute_indexed(captures, self.concurrency, |index, capture| {
            self.analyze_one(index, capture, ctx)
        })
        .await
    }

    /// Analyse captures as they arrive from the collector.
    ///
    /// Returns `total` slots in inventory order. A slot is `None` only if the sender
    /// closed without ever delivering that index.
    pub async fn analyze_stream(
        &self,
        mut rx: mpsc::Receiver<(usize, RawCaptureResult)>,
        total: usize,
        ctx: &StageContext,
    ) -> Vec<Option<AnalysisResult>> {
        let sem = Arc::new(Semaphore::new(self.concurrency));
        let mut futs: FuturesUnordered<BoxFuture<'_, (usize, AnalysisResult)>> =
            FuturesUnordered::new();
        let mut slots: Vec<Option<AnalysisResult>> = vec![None; total];
        let mut receiving = true;

        loop {
            tokio::select! {
                msg = rx.recv(), if receiving => match msg {
                    Some((index, capture)) if index < total => {
                        let sem = sem.clone();
                        futs.push(
                            async move {
                                let _permit = sem.acquire_owned().await;
                                (index, self.analyze_one(index, &capture, ctx).await)
                            }
                            .boxed(),
                        );
                    }
                    Some((index, _)) => {
                        tracing::warn!(index, total, "capture index out of range, dropped");
                    }
                    None => receiving = false,
                },
                Some((index, result)) = futs.next(), if !futs.is_empty() => {
                    slots[index] = Some(result);
                }
                else => break,
            }
        }

        slots
    }

    /// Failed captures are mirrored without touching the inference endpoint.
    pub async fn analyze_one(
        &self,
        index: usize,
        capture: &RawCaptureResult,
        ctx: &StageContext,
    ) -> AnalysisResult {
        let result = if !capture.is_success() {
            AnalysisResult::mirror_capture(capture)
        } else if ctx.cancel.is_cancelled() {
            AnalysisResult::failed(&capture.device_id, DeviceError::Cancelled, 0)
        } else {
            let prompt = render_prompt(&self.prompt_template, &capture.device_id, &capture.raw_text);
            let client = &self.client;
            let model = self.model.as_str();
            let prompt = prompt.as_str();

            let (outcome, attempts) = run_with_retry(
                self.retry.as_ref(),
                &ctx.cancel,
                &capture.device_id,
                |_| async move { client.generate(model, prompt).await.map_err(DeviceError::from) },
            )
            .await;

            match outcome {
                Ok(text) => AnalysisResult::success(&capture.device_id, text, attempts),
                Err(err) => {
                    tracing::warn!(
                        device = %capture.device_id,
                        kind = err.kind(),
                        attempts,
                        error = %err,
                        "analysis failed"
                    );
                    AnalysisResult::failed(&capture.device_id, err, attempts)
                }
            }
        };

        if let Some(state) = &ctx.state {
            state.record_analysis(index, &result.device_id, result.is_success());
        }
        result
    }
}
