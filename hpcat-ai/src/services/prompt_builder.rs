//! Prompt assembly for description and keyword generation
//!
//! Pure and deterministic: the same inputs always give the same prompt text.
//! The instruction blocks are data (`PromptTemplates`), not code, so an
//! archive can swap in its own cataloging rules.

use std::path::Path;

use tracing::info;

use crate::error::CatalogError;

/// Default archival cataloging instructions
pub const DEFAULT_DESCRIPTION_INSTRUCTIONS: &str = "\
Eres un sistema archivístico especializado en la catalogación de fotografías históricas.
Tu objetivo es generar descripciones precisas y detalladas de imágenes pertenecientes a la Colección Elejalde del Instituto Riva-Agüero de la PUCP.
Utiliza un enfoque archivístico basado en los principios de documentación histórica y cultural, asegurando que las descripciones reflejen el contexto histórico, arquitectónico y social de la imagen.
Evita interpretaciones modernas o elementos que no sean visibles en la imagen.";

/// Default keyword indexing instructions
pub const DEFAULT_KEYWORD_INSTRUCTIONS: &str = "\
Eres un archivista digital especializado en la indexación de imágenes históricas de Lima y el Perú.
Genera palabras clave precisas y relevantes para facilitar la búsqueda y catalogación en bases de datos patrimoniales.
Debes incluir términos relacionados con la arquitectura, eventos históricos, personajes y lugares documentados en la imagen.
La respuesta debe ser un arreglo JSON con las palabras clave.
Ejemplo: [\"arquitectura republicana\", \"Lima\", \"siglo XIX\", \"Patrimonio cultural\", \"Historia urbana\"].";

/// Instruction blocks for both generation calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    /// Archival cataloging rules (tone, domain, no modern interpretation)
    pub description_instructions: String,
    /// Keyword indexing rules; must ask for a JSON list of strings
    pub keyword_instructions: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            description_instructions: DEFAULT_DESCRIPTION_INSTRUCTIONS.to_string(),
            keyword_instructions: DEFAULT_KEYWORD_INSTRUCTIONS.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Defaults, with either block replaced by the contents of a file
    ///
    /// Template files are read as UTF-8 and trimmed.
    pub fn load(
        description_file: Option<&Path>,
        keyword_file: Option<&Path>,
    ) -> Result<Self, CatalogError> {
        let mut templates = Self::default();

        if let Some(path) = description_file {
            templates.description_instructions = read_template(path)?;
            info!(path = %path.display(), "Description instructions overridden");
        }
        if let Some(path) = keyword_file {
            templates.keyword_instructions = read_template(path)?;
            info!(path = %path.display(), "Keyword instructions overridden");
        }

        Ok(templates)
    }
}

fn read_template(path: &Path) -> Result<String, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CatalogError::Config(format!("Prompt template {}: {}", path.display(), e))
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Err(CatalogError::Config(format!(
            "Prompt template {} is empty",
            path.display()
        )));
    }
    Ok(text.to_string())
}

/// Builds the two request payloads from templates and gathered context
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    templates: PromptTemplates,
}

impl PromptBuilder {
    pub fn new(templates: PromptTemplates) -> Self {
        Self { templates }
    }

    /// System instruction for the description call
    pub fn description_system_prompt(&self) -> &str {
        &self.templates.description_instructions
    }

    /// System instruction for the keyword call
    pub fn keyword_system_prompt(&self) -> &str {
        &self.templates.keyword_instructions
    }

    /// User prompt for the description call
    ///
    /// Missing context is passed as an empty string; the layout is fixed.
    pub fn build_description_prompt(
        &self,
        title: &str,
        metadata_context: &str,
        prior_log_context: &str,
    ) -> String {
        format!(
            "{instructions}\n\nContexto archivístico:\n{metadata}\nInformación adicional de Excel:\n{prior}\n\nGenera una descripción detallada y precisa para la siguiente imagen:\nTítulo: {title}",
            instructions = self.templates.description_instructions,
            metadata = metadata_context,
            prior = prior_log_context,
            title = title,
        )
    }

    /// User prompt for the keyword call
    pub fn build_keyword_prompt(&self, generated_description: &str) -> String {
        format!(
            "{instructions}\n\nDescripción de la imagen:\n{description}",
            instructions = self.templates.keyword_instructions,
            description = generated_description.trim(),
        )
    }
}
