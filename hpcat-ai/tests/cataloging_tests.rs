//! Cataloging pipeline integration tests
//!
//! Runs whole sessions against files on disk with a fake generator in place
//! of the network.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hpcat_ai::models::{LogRecord, SessionState};
use hpcat_ai::services::generation_client::NO_DATA_SENTINEL;
use hpcat_ai::services::{
    Cataloger, DescriptionLog, FakeGenerator, GenerationClient, MetadataStore, PromptBuilder,
    PromptTemplates,
};
use hpcat_ai::CatalogError;
use hpcat_common::encoding::write_legacy_file;

const METADATA_JSON: &str = r#"{
    "files": [
        {"label": "Plaza Mayor", "description": "ctx", "fondo": "Elejalde"},
        {"label": "Alameda de los Descalzos", "description": "Paseo arbolado del Rímac, ca. 1920"}
    ]
}"#;

const DESCRIPTION: &str = "Vista de la Plaza Mayor con la Catedral al fondo.";

struct Fixture {
    _dir: tempfile::TempDir,
    metadata_path: PathBuf,
    log_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let metadata_path = dir.path().join("metadata.json");
        let log_path = dir.path().join("descripciones_imagenes.csv");
        write_legacy_file(&metadata_path, METADATA_JSON).unwrap();
        Self {
            _dir: dir,
            metadata_path,
            log_path,
        }
    }

    fn cataloger(&self, generator: Arc<FakeGenerator>) -> Cataloger {
        cataloger_at(&self.metadata_path, self.log_path.clone(), generator)
    }
}

fn cataloger_at(
    metadata_path: &Path,
    log_path: PathBuf,
    generator: Arc<FakeGenerator>,
) -> Cataloger {
    Cataloger::new(
        MetadataStore::load(metadata_path).unwrap(),
        PromptBuilder::new(PromptTemplates::default()),
        GenerationClient::new(generator),
        log_path,
    )
}

fn generator(keyword_response: &str) -> Arc<FakeGenerator> {
    Arc::new(
        FakeGenerator::new()
            .with_response("Descripción de la imagen:", keyword_response)
            .with_response("Título:", DESCRIPTION),
    )
}

fn sample_record(imagen: &str, descripcion: &str) -> LogRecord {
    LogRecord {
        imagen: imagen.to_string(),
        descripcion: descripcion.to_string(),
        generated_description: "Descripción previa; con punto y coma".to_string(),
        keywords: vec!["Lima".to_string(), "Perú".to_string()],
        fecha: hpcat_common::time::parse_fecha("2023-05-04 10:11:12").unwrap(),
    }
}

#[tokio::test]
async fn test_plaza_mayor_session_persists_record() {
    let fixture = Fixture::new();
    let fake = generator(r#"["Plaza Mayor", "Catedral de Lima", "arquitectura colonial"]"#);
    let cataloger = fixture.cataloger(fake.clone());
    let mut log = DescriptionLog::load(&fixture.log_path).unwrap();
    assert!(log.is_empty());

    let outcome = cataloger
        .session(&mut log)
        .run("https://archivo.example/plaza.jpg", "Plaza Mayor")
        .await
        .unwrap();

    assert_eq!(outcome.final_state, SessionState::Persisted);
    assert_eq!(outcome.record.generated_description, DESCRIPTION);
    assert_eq!(
        outcome.record.keywords,
        vec!["Plaza Mayor", "Catedral de Lima", "arquitectura colonial"]
    );

    // Metadata context reaches the description prompt, keyword prompt embeds the description
    let requests = fake.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].user_prompt.contains("Contexto archivístico:\nctx\n"));
    assert!(requests[0].user_prompt.ends_with("Título: Plaza Mayor"));
    assert!(requests[1].user_prompt.contains(DESCRIPTION));

    let reloaded = DescriptionLog::load(&fixture.log_path).unwrap();
    assert_eq!(reloaded.records(), log.records());
}

#[tokio::test]
async fn test_prior_log_context_is_used() {
    let fixture = Fixture::new();
    let mut log = DescriptionLog::new();
    log.append(sample_record("Plaza Mayor", "Foto tomada desde el balcón del Cabildo"));
    log.persist(&fixture.log_path).unwrap();

    let fake = generator(r#"["Lima"]"#);
    let cataloger = fixture.cataloger(fake.clone());
    let mut log = DescriptionLog::load(&fixture.log_path).unwrap();

    cataloger
        .session(&mut log)
        .run("plaza2.jpg", "Plaza Mayor")
        .await
        .unwrap();

    let prompt = &fake.requests()[0].user_prompt;
    assert!(
        prompt.contains("Información adicional de Excel:\nFoto tomada desde el balcón del Cabildo")
    );
}

#[tokio::test]
async fn test_description_failure_leaves_log_file_untouched() {
    let fixture = Fixture::new();
    let mut log = DescriptionLog::new();
    log.append(sample_record("a.jpg", "Calle de Lima"));
    log.persist(&fixture.log_path).unwrap();
    let before = std::fs::read(&fixture.log_path).unwrap();

    let fake = Arc::new(FakeGenerator::new().with_failure("Título:", "connection reset by peer"));
    let cataloger = fixture.cataloger(fake);
    let mut log = DescriptionLog::load(&fixture.log_path).unwrap();

    let result = cataloger.session(&mut log).run("b.jpg", "Plaza Mayor").await;

    assert!(matches!(result, Err(CatalogError::Generation(_))));
    assert_eq!(log.len(), 1);
    assert_eq!(std::fs::read(&fixture.log_path).unwrap(), before);
}

#[tokio::test]
async fn test_keyword_failure_writes_nothing() {
    let fixture = Fixture::new();
    let fake = Arc::new(
        FakeGenerator::new()
            .with_failure("Descripción de la imagen:", "quota exceeded")
            .with_response("Título:", DESCRIPTION),
    );
    let cataloger = fixture.cataloger(fake);
    let mut log = DescriptionLog::new();

    let result = cataloger.session(&mut log).run("a.jpg", "Plaza Mayor").await;

    assert!(matches!(result, Err(CatalogError::Generation(_))));
    assert!(log.is_empty());
    assert!(!fixture.log_path.exists());
}

#[tokio::test]
async fn test_malformed_keywords_still_persist() {
    let fixture = Fixture::new();
    let cataloger = fixture.cataloger(generator("Plaza Mayor, Catedral, Lima"));
    let mut log = DescriptionLog::new();

    let outcome = cataloger
        .session(&mut log)
        .run("a.jpg", "Plaza Mayor")
        .await
        .unwrap();

    assert_eq!(outcome.final_state, SessionState::Persisted);
    assert!(outcome.keywords_degraded);
    assert!(outcome.record.keywords.is_empty());
    assert_eq!(outcome.record.generated_description, DESCRIPTION);

    let reloaded = DescriptionLog::load(&fixture.log_path).unwrap();
    assert!(reloaded.records()[0].keywords.is_empty());
}

#[tokio::test]
async fn test_non_list_keywords_give_sentinel() {
    let fixture = Fixture::new();
    let cataloger = fixture.cataloger(generator(r#""just a string""#));
    let mut log = DescriptionLog::new();

    let outcome = cataloger
        .session(&mut log)
        .run("a.jpg", "Plaza Mayor")
        .await
        .unwrap();

    assert_eq!(outcome.record.keywords, vec![NO_DATA_SENTINEL]);
}

#[tokio::test]
async fn test_identical_runs_append_two_records() {
    let fixture = Fixture::new();
    let cataloger = fixture.cataloger(generator(r#"["Lima"]"#));
    let mut log = DescriptionLog::new();

    for _ in 0..2 {
        cataloger
            .session(&mut log)
            .run("a.jpg", "Plaza Mayor")
            .await
            .unwrap();
    }

    let reloaded = DescriptionLog::load(&fixture.log_path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.records()[0].imagen, reloaded.records()[1].imagen);
}

#[tokio::test]
async fn test_unsaved_record_is_written_by_next_persist() {
    let fixture = Fixture::new();
    let unwritable = fixture.log_path.with_file_name("no-such-dir").join("log.csv");
    let failing = cataloger_at(&fixture.metadata_path, unwritable, generator(r#"["Lima"]"#));
    let mut log = DescriptionLog::new();

    let result = failing.session(&mut log).run("a.jpg", "Plaza Mayor").await;
    let unsaved = match result {
        Err(CatalogError::Persistence { record, .. }) => *record,
        other => panic!("expected persistence error, got {:?}", other),
    };
    assert_eq!(log.records(), &[unsaved.clone()]);

    // No rollback: the next successful persist carries the earlier record too
    let working = fixture.cataloger(generator(r#"["Lima"]"#));
    working
        .session(&mut log)
        .run("b.jpg", "Alameda de los Descalzos")
        .await
        .unwrap();

    let reloaded = DescriptionLog::load(&fixture.log_path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.records()[0], unsaved);
}

#[tokio::test]
async fn test_latin1_text_survives_log_round_trip() {
    let fixture = Fixture::new();
    let cataloger = fixture.cataloger(Arc::new(
        FakeGenerator::new()
            .with_response("Descripción de la imagen:", r#"["Rímac", "Alameda", "año 1920"]"#)
            .with_response("Título:", "Paseo arbolado junto al río Rímac; señoras con sombrilla."),
    ));
    let mut log = DescriptionLog::new();

    cataloger
        .session(&mut log)
        .run("alameda.png", "Alameda de los Descalzos")
        .await
        .unwrap();

    let bytes = std::fs::read(&fixture.log_path).unwrap();
    // Single-byte ñ (0xF1), not UTF-8
    assert!(bytes.contains(&0xF1));
    assert!(!bytes.windows(2).any(|w| w == [0xC3, 0xB1]));

    let reloaded = DescriptionLog::load(&fixture.log_path).unwrap();
    assert_eq!(reloaded.records(), log.records());
    assert_eq!(reloaded.records()[0].keywords[0], "Rímac");
}

#[tokio::test]
async fn test_text_outside_latin1_keeps_log_loadable() {
    let fixture = Fixture::new();
    let cataloger = fixture.cataloger(Arc::new(
        FakeGenerator::new()
            .with_response("Descripción de la imagen:", r#"["Ōsaka", "≈ 1900", "Lima"]"#)
            .with_response("Título:", "Vista ≈ 1900, fachada de Ōsaka; tranvía a la derecha."),
    ));
    let mut log = DescriptionLog::new();

    for title in ["Plaza Mayor", "Alameda de los Descalzos"] {
        cataloger
            .session(&mut log)
            .run("vista.jpg", title)
            .await
            .unwrap();
    }

    let reloaded = DescriptionLog::load(&fixture.log_path).unwrap();
    assert_eq!(reloaded.records(), log.records());
    assert_eq!(
        reloaded.records()[1].generated_description,
        "Vista ≈ 1900, fachada de Ōsaka; tranvía a la derecha."
    );
    assert_eq!(reloaded.records()[0].keywords, vec!["Ōsaka", "≈ 1900", "Lima"]);
}
