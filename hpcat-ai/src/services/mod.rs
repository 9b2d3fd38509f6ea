//! Service modules for the cataloging pipeline

pub mod cataloging_session;
pub mod description_log;
pub mod fake_generator;
pub mod generation_client;
pub mod image_source;
pub mod metadata_store;
pub mod openai_generator;
pub mod prompt_builder;

pub use cataloging_session::{
    normalize_title, CatalogOutcome, Cataloger, CatalogingSession, GatheredContext,
};
pub use description_log::{parse_keywords_cell, DescriptionLog};
pub use fake_generator::FakeGenerator;
pub use generation_client::{GenerationClient, GenerationError, KeywordOutcome, TextGenerator};
pub use image_source::ImageSource;
pub use metadata_store::MetadataStore;
pub use openai_generator::OpenAiGenerator;
pub use prompt_builder::{PromptBuilder, PromptTemplates};
