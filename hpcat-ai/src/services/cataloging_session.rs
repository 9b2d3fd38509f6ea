//! Cataloging session orchestration
//!
//! One session catalogs one image:
//!
//! 1. IDLE → CONTEXT_GATHERED: metadata context and prior log context are
//!    looked up by title (missing context is an empty string)
//! 2. CONTEXT_GATHERED → DESCRIPTION_GENERATED: description prompt is built
//!    and sent; a failure aborts with no record
//! 3. DESCRIPTION_GENERATED → KEYWORDS_GENERATED: keyword prompt is built
//!    from the description and sent; a failure aborts with no record, an
//!    unusable response degrades to the sentinel or an empty list
//! 4. KEYWORDS_GENERATED → PERSISTED: the record is appended and the log
//!    file rewritten
//!
//! If the rewrite fails the appended record is NOT removed from memory: it
//! stays in the log for the rest of the process without being on disk.
//! Running a session twice with the same inputs appends two records.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::CatalogError;
use crate::models::{LogRecord, SessionState, StateTransition};
use crate::services::description_log::DescriptionLog;
use crate::services::generation_client::GenerationClient;
use crate::services::metadata_store::MetadataStore;
use crate::services::prompt_builder::PromptBuilder;

/// Trim surrounding whitespace from a title, rejecting one that is blank
///
/// The trimmed title is the metadata and log lookup key and is what gets
/// stored in `descripcion`.
pub fn normalize_title(title: &str) -> Result<&str, CatalogError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CatalogError::Validation("Title must not be empty".to_string()));
    }
    Ok(title)
}

/// Read-only collaborators shared by every session
#[derive(Debug)]
pub struct Cataloger {
    metadata: MetadataStore,
    prompts: PromptBuilder,
    generation: GenerationClient,
    log_path: PathBuf,
}

impl Cataloger {
    pub fn new(
        metadata: MetadataStore,
        prompts: PromptBuilder,
        generation: GenerationClient,
        log_path: PathBuf,
    ) -> Self {
        Self {
            metadata,
            prompts,
            generation,
            log_path,
        }
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn model_name(&self) -> &str {
        self.generation.model_name()
    }

    /// Start a session writing into `log`
    pub fn session<'a>(&'a self, log: &'a mut DescriptionLog) -> CatalogingSession<'a> {
        CatalogingSession::new(self, log)
    }
}

/// Context gathered for one title
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatheredContext {
    pub metadata_context: String,
    pub prior_log_context: String,
}

/// Result of a completed session
#[derive(Debug, Clone, Serialize)]
pub struct CatalogOutcome {
    pub record: LogRecord,
    /// Keyword response was not a JSON list
    pub keywords_degraded: bool,
    pub final_state: SessionState,
    pub transitions: Vec<StateTransition>,
}

/// A single cataloging operation
#[derive(Debug)]
pub struct CatalogingSession<'a> {
    cataloger: &'a Cataloger,
    log: &'a mut DescriptionLog,
    state: SessionState,
    transitions: Vec<StateTransition>,
}

impl<'a> CatalogingSession<'a> {
    pub fn new(cataloger: &'a Cataloger, log: &'a mut DescriptionLog) -> Self {
        Self {
            cataloger,
            log,
            state: SessionState::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Look up metadata and prior log context for `title`
    pub fn gather_context(&mut self, title: &str) -> GatheredContext {
        let context = GatheredContext {
            metadata_context: self.cataloger.metadata.context_for(title),
            prior_log_context: self
                .log
                .prior_description(title)
                .unwrap_or_default()
                .to_string(),
        };
        self.advance(SessionState::ContextGathered);
        context
    }

    /// Run the whole pipeline for one image
    pub async fn run(
        mut self,
        image_ref: &str,
        title: &str,
    ) -> Result<CatalogOutcome, CatalogError> {
        let cataloger = self.cataloger;
        let title = normalize_title(title)?;
        info!(image = image_ref, title, "Cataloging session started");

        let context = self.gather_context(title);

        let description_prompt = cataloger.prompts.build_description_prompt(
            title,
            &context.metadata_context,
            &context.prior_log_context,
        );
        let description = cataloger
            .generation
            .generate_description(
                cataloger.prompts.description_system_prompt(),
                &description_prompt,
            )
            .await
            .map_err(|e| self.abort(e))?;
        self.advance(SessionState::DescriptionGenerated);

        let keyword_prompt = cataloger.prompts.build_keyword_prompt(&description);
        let keyword_outcome = cataloger
            .generation
            .generate_keywords(cataloger.prompts.keyword_system_prompt(), &keyword_prompt)
            .await
            .map_err(|e| self.abort(e))?;
        self.advance(SessionState::KeywordsGenerated);

        let keywords_degraded = keyword_outcome.is_degraded();
        let record = LogRecord {
            imagen: image_ref.to_string(),
            descripcion: title.to_string(),
            generated_description: description,
            keywords: keyword_outcome.into_keywords(),
            fecha: hpcat_common::time::now(),
        };

        self.log.append(record.clone());
        if let Err(source) = self.log.persist(&cataloger.log_path) {
            error!(
                path = %cataloger.log_path.display(),
                error = %source,
                records_in_memory = self.log.len(),
                "Description log not saved; record kept in memory only"
            );
            return Err(CatalogError::Persistence {
                record: Box::new(record),
                source,
            });
        }
        self.advance(SessionState::Persisted);

        info!(
            image = image_ref,
            title,
            keywords = record.keywords.len(),
            "Cataloging session completed"
        );

        Ok(CatalogOutcome {
            record,
            keywords_degraded,
            final_state: self.state,
            transitions: self.transitions,
        })
    }

    fn advance(&mut self, new_state: SessionState) {
        debug_assert_eq!(self.state.next(), Some(new_state));
        let transition = StateTransition {
            old_state: self.state,
            new_state,
            transitioned_at: hpcat_common::time::now(),
        };
        tracing::debug!(from = ?transition.old_state, to = ?new_state, "Session state transition");
        self.state = new_state;
        self.transitions.push(transition);
    }

    fn abort(&self, err: impl Into<CatalogError>) -> CatalogError {
        let err = err.into();
        warn!(state = ?self.state, error = %err, "Cataloging session aborted, no record written");
        err
    }
}
