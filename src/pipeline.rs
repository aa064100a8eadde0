use crate::store::Scope;
use crate::terms::{
    apply_markers, find_matches, resolve_markers_with_report, CacheError, TermCache, TermIndex,
    TermMatch,
};
use crate::translation::Translator;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateRequest {
    pub scope: Scope,
    pub texts: Vec<String>,
    /// Language of `texts`; `None` lets the translation service detect it
    #[serde(default)]
    pub source_language: Option<String>,
    pub target_languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageTranslation {
    pub language: String,
    /// Same order as the request's `texts`
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslateResponse {
    pub translations: Vec<LanguageTranslation>,
    /// Dictionary terms found across all input strings
    pub terms_matched: usize,
    /// Markers the translation service did not preserve (summed over languages)
    pub markers_lost: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Lookup(#[from] CacheError),

    #[error("translation to {language} failed: {cause:#}")]
    Translation {
        language: String,
        cause: anyhow::Error,
    },
}

/// An input string after matching and wrapping.
struct PreparedText {
    wrapped: String,
    matches: Vec<TermMatch>,
}

pub struct TranslationPipeline {
    cache: Arc<TermCache>,
    translator: Arc<dyn Translator>,
    degraded_lookup: bool,
}

impl TranslationPipeline {
    pub fn new(cache: Arc<TermCache>, translator: Arc<dyn Translator>) -> Self {
        Self {
            cache,
            translator,
            degraded_lookup: false,
        }
    }

    /// When enabled, a failed dictionary lookup is logged and the request
    /// proceeds without dictionary mediation instead of failing.
    pub fn with_degraded_lookup(mut self, enabled: bool) -> Self {
        self.degraded_lookup = enabled;
        self
    }

    pub fn cache(&self) -> &TermCache {
        &self.cache
    }

    pub async fn translate(
        &self,
        request: &TranslateRequest,
    ) -> Result<TranslateResponse, PipelineError> {
        let index = self.lookup(&request.scope).await?;

        let prepared: Vec<PreparedText> = request
            .texts
            .iter()
            .map(|text| {
                let matches = find_matches(text, &index);
                PreparedText {
                    wrapped: apply_markers(text, &matches),
                    matches,
                }
            })
            .collect();
        let terms_matched = prepared.iter().map(|p| p.matches.len()).sum();

        debug!(
            "Translating {} text(s) for {} into {:?} ({} dictionary terms)",
            request.texts.len(),
            request.scope,
            request.target_languages,
            terms_matched
        );

        let source = request.source_language.as_deref();
        let mut translations = Vec::with_capacity(request.target_languages.len());
        let mut markers_lost = 0;

        for language in &request.target_languages {
            let translated = try_join_all(prepared.iter().map(|p| async move {
                if p.wrapped.trim().is_empty() {
                    Ok(p.wrapped.clone())
                } else {
                    self.translator.translate(&p.wrapped, source, language).await
                }
            }))
            .await
            .map_err(|cause| PipelineError::Translation {
                language: language.clone(),
                cause,
            })?;

            let texts = translated
                .iter()
                .zip(&prepared)
                .map(|(text, p)| {
                    let resolution = resolve_markers_with_report(text, &p.matches, language, &index);
                    markers_lost += resolution.lost;
                    resolution.text
                })
                .collect();

            translations.push(LanguageTranslation {
                language: language.clone(),
                texts,
            });
        }

        if markers_lost > 0 {
            info!(
                "{} dictionary marker(s) lost in translation for {}",
                markers_lost, request.scope
            );
        }

        Ok(TranslateResponse {
            translations,
            terms_matched,
            markers_lost,
        })
    }

    async fn lookup(&self, scope: &Scope) -> Result<Arc<TermIndex>, PipelineError> {
        match self.cache.get(scope).await {
            Ok(index) => Ok(index),
            Err(e) if self.degraded_lookup => {
                warn!(
                    "Dictionary unavailable for {}, translating without it: {}",
                    scope, e
                );
                Ok(Arc::new(TermIndex::empty()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
