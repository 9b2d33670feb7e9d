//! Behavior of the remote project backend against an in-memory service.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use faculty_core::{Error, Result};
use faculty_search::{
    Document, EmbeddingModel, HashEmbeddingModel, IndexHandle, Modality, Neighbors, ProjectHandle,
    ProjectIndex, SearchIndex, VectorRecord, VectorService,
};

#[derive(Default)]
struct ProjectState {
    name: String,
    records: HashMap<String, VectorRecord>,
    vectors: HashMap<String, Vec<f32>>,
    modality: Option<Modality>,
    index_id: Option<String>,
    locked: bool,
}

/// In-memory stand-in for the remote vector service.
#[derive(Default)]
struct MockService {
    projects: Mutex<HashMap<String, ProjectState>>,
    next_id: AtomicU32,
    create_calls: AtomicU32,
    unlock_waits: AtomicU32,
}

impl MockService {
    fn lock_project(&self, project_id: &str) {
        let mut projects = self.projects.lock().unwrap();
        projects.get_mut(project_id).unwrap().locked = true;
    }

    fn has_project(&self, project_id: &str) -> bool {
        self.projects.lock().unwrap().contains_key(project_id)
    }

    fn project_name(&self, project_id: &str) -> String {
        self.projects.lock().unwrap()[project_id].name.clone()
    }

    fn record_ids(&self, project_id: &str) -> Vec<String> {
        self.projects.lock().unwrap()[project_id]
            .records
            .keys()
            .cloned()
            .collect()
    }
}

fn cosine(vector_a: &[f32], vector_b: &[f32]) -> f32 {
    let dot: f32 = vector_a
        .iter()
        .zip(vector_b.iter())
        .map(|(a, b)| a * b)
        .sum();
    let norm_a = vector_a.iter().map(|a| a * a).sum::<f32>().sqrt();
    let norm_b = vector_b.iter().map(|b| b * b).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorService for MockService {
    async fn create_project(&self, name: &str, modality: Modality) -> Result<ProjectHandle> {
        self.create_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let id = format!("project-{}", self.next_id.fetch_add(1, AtomicOrdering::SeqCst));
        let mut projects = self.projects.lock().unwrap();
        projects.insert(
            id.clone(),
            ProjectState {
                name: name.to_owned(),
                modality: Some(modality),
                ..ProjectState::default()
            },
        );
        Ok(ProjectHandle { project_id: id })
    }

    async fn add_vectors(
        &self,
        project_id: &str,
        records: Vec<VectorRecord>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<()> {
        assert_eq!(records.len(), embeddings.len());
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| Error::NotFound(format!("no project {project_id}")))?;
        for (record, embedding) in records.into_iter().zip(embeddings) {
            project.vectors.insert(record.id.clone(), embedding);
            project.records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn add_texts(&self, project_id: &str, records: Vec<VectorRecord>) -> Result<()> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| Error::NotFound(format!("no project {project_id}")))?;
        for record in records {
            project.records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn ensure_index(&self, project_id: &str) -> Result<IndexHandle> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| Error::NotFound(format!("no project {project_id}")))?;
        let index_id = project
            .index_id
            .get_or_insert_with(|| format!("index-{project_id}"))
            .clone();
        Ok(IndexHandle { index_id })
    }

    async fn vector_search(
        &self,
        index_id: &str,
        queries: Vec<Vec<f32>>,
        k: usize,
    ) -> Result<Neighbors> {
        let projects = self.projects.lock().unwrap();
        let project = projects
            .values()
            .find(|project| project.index_id.as_deref() == Some(index_id))
            .ok_or_else(|| Error::NotFound(format!("no index {index_id}")))?;

        let mut ids = Vec::with_capacity(queries.len());
        let mut scores = Vec::with_capacity(queries.len());
        for query in &queries {
            let mut hits: Vec<(String, f32)> = project
                .vectors
                .iter()
                .map(|(id, vector)| (id.clone(), cosine(query, vector)))
                .collect();
            hits.sort_by(|(_, score_a), (_, score_b)| {
                score_b.partial_cmp(score_a).unwrap_or(Ordering::Equal)
            });
            hits.truncate(k);
            let (row_ids, row_scores): (Vec<String>, Vec<f32>) = hits.into_iter().unzip();
            ids.push(row_ids);
            scores.push(row_scores);
        }
        Ok(Neighbors { ids, scores })
    }

    async fn delete_records(&self, project_id: &str, ids: Vec<String>) -> Result<()> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| Error::NotFound(format!("no project {project_id}")))?;
        for id in ids {
            project.records.remove(&id);
            project.vectors.remove(&id);
        }
        Ok(())
    }

    async fn wait_until_unlocked(&self, project_id: &str) -> Result<()> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| Error::NotFound(format!("no project {project_id}")))?;
        if project.locked {
            self.unlock_waits.fetch_add(1, AtomicOrdering::SeqCst);
            project.locked = false;
        }
        Ok(())
    }

    async fn delete_project(&self, project_id: &str) -> Result<()> {
        let mut projects = self.projects.lock().unwrap();
        projects
            .remove(project_id)
            .ok_or_else(|| Error::NotFound(format!("no project {project_id}")))?;
        Ok(())
    }
}

fn document(id: &str, sentence: &str) -> Document {
    Document {
        id: id.to_owned(),
        text: sentence.repeat(120),
    }
}

fn hash_model() -> Arc<dyn EmbeddingModel> {
    Arc::new(HashEmbeddingModel::new(64))
}

#[tokio::test]
async fn test_update_then_search_resolves_items() {
    let service = Arc::new(MockService::default());
    let mut index = ProjectIndex::create(service.clone() as Arc<dyn VectorService>, Some(hash_model()), "reports")
        .await
        .unwrap();

    index
        .update(vec![
            document("a", "revenue grew sharply this quarter. "),
            document("b", "the weather was mild. "),
        ])
        .await
        .unwrap();

    let results = index.search("revenue", 3).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= 3);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    for result in &results {
        assert!(result.item.id == "a" || result.item.id == "b");
    }
}

#[tokio::test]
async fn test_search_waits_for_project_lock() {
    let service = Arc::new(MockService::default());
    let mut index = ProjectIndex::create(service.clone() as Arc<dyn VectorService>, Some(hash_model()), "reports")
        .await
        .unwrap();
    index
        .update(vec![document("a", "locked project contents. ")])
        .await
        .unwrap();

    service.lock_project(index.project_id());
    index.search("contents", 2).await.unwrap();
    assert_eq!(service.unlock_waits.load(AtomicOrdering::SeqCst), 1);
}

#[tokio::test]
async fn test_attach_reuses_project_without_recreating() {
    let service = Arc::new(MockService::default());
    let mut index = ProjectIndex::create(service.clone() as Arc<dyn VectorService>, Some(hash_model()), "reports")
        .await
        .unwrap();
    index
        .update(vec![document("a", "revenue grew sharply this quarter. ")])
        .await
        .unwrap();

    let before: Vec<String> = index
        .search("revenue", 3)
        .await
        .unwrap()
        .iter()
        .map(|result| result.chunk_id.clone())
        .collect();

    let snapshot = index.snapshot();
    drop(index);

    let attached = ProjectIndex::attach(
        service.clone() as Arc<dyn VectorService>,
        Some(hash_model()),
        snapshot,
    )
    .unwrap();

    // Attach never creates a fresh project, only the constructor did.
    assert_eq!(service.create_calls.load(AtomicOrdering::SeqCst), 1);

    let after: Vec<String> = attached
        .search("revenue", 3)
        .await
        .unwrap()
        .iter()
        .map(|result| result.chunk_id.clone())
        .collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_update_with_changed_text_drops_stale_records() {
    let service = Arc::new(MockService::default());
    let mut index = ProjectIndex::create(service.clone() as Arc<dyn VectorService>, Some(hash_model()), "reports")
        .await
        .unwrap();

    index
        .update(vec![document("a", "revenue grew sharply this quarter. ")])
        .await
        .unwrap();
    let long_record_count = service.record_ids(index.project_id()).len();
    assert!(long_record_count > 1);

    let replacement = Document {
        id: "a".to_owned(),
        text: "gone.".to_owned(),
    };
    index.update(vec![replacement.clone()]).await.unwrap();

    // Chunks of the long text are gone remotely, only the replacement's
    // single chunk remains.
    let remaining = service.record_ids(index.project_id());
    assert_eq!(remaining, vec![format!("a:0-{}", replacement.text.len())]);

    let results = index.search("gone", 10).await.unwrap();
    assert!(!results.is_empty());
    for result in &results {
        let range = result.substring_range.clone();
        assert!(range.end <= result.item.text.len());
        assert_eq!(&result.item.text[range], replacement.text.as_str());
    }
}

#[tokio::test]
async fn test_reset_after_attach_reuses_project_name() {
    let service = Arc::new(MockService::default());
    let index = ProjectIndex::<Document>::create(
        service.clone() as Arc<dyn VectorService>,
        Some(hash_model()),
        "reports",
    )
    .await
    .unwrap();

    let mut attached = ProjectIndex::attach(
        service.clone() as Arc<dyn VectorService>,
        Some(hash_model()),
        index.snapshot(),
    )
    .unwrap();
    attached.reset().await.unwrap();

    assert_eq!(service.project_name(attached.project_id()), "reports");
}

#[tokio::test]
async fn test_attach_with_different_model_is_config_error() {
    let service = Arc::new(MockService::default());
    let index = ProjectIndex::<Document>::create(
        service.clone() as Arc<dyn VectorService>,
        Some(hash_model()),
        "reports",
    )
    .await
    .unwrap();

    let other_model: Arc<dyn EmbeddingModel> = Arc::new(HashEmbeddingModel::new(32));
    let error = ProjectIndex::attach(
        service as Arc<dyn VectorService>,
        Some(other_model),
        index.snapshot(),
    )
    .unwrap_err();
    assert!(matches!(error, Error::Config(_)));
}

#[tokio::test]
async fn test_text_modality_search_is_unsupported() {
    let service = Arc::new(MockService::default());
    let mut index: ProjectIndex<Document> =
        ProjectIndex::create(service as Arc<dyn VectorService>, None, "notes")
            .await
            .unwrap();

    index
        .update(vec![document("a", "stored as whole text. ")])
        .await
        .unwrap();
    assert_eq!(index.len(), 1);

    let error = index.search("anything", 5).await.unwrap_err();
    assert!(matches!(error, Error::Unsupported(_)));
}

#[tokio::test]
async fn test_unknown_service_id_is_not_found() {
    let service = Arc::new(MockService::default());
    let mut index = ProjectIndex::create(service.clone() as Arc<dyn VectorService>, Some(hash_model()), "reports")
        .await
        .unwrap();
    index
        .update(vec![document("a", "known contents. ")])
        .await
        .unwrap();

    // A record pushed behind the index's back comes up in results with an
    // id the index has never stored.
    let rogue = VectorRecord {
        id: "rogue".to_owned(),
        payload: serde_json::Value::Null,
    };
    let vector = hash_model().embed(&["known contents".to_owned()]).await.unwrap();
    service
        .add_vectors(index.project_id(), vec![rogue], vector)
        .await
        .unwrap();

    let error = index.search("known contents", 10).await.unwrap_err();
    assert!(matches!(error, Error::NotFound(_)));
}

#[tokio::test]
async fn test_reset_deletes_the_remote_project() {
    let service = Arc::new(MockService::default());
    let mut index = ProjectIndex::create(service.clone() as Arc<dyn VectorService>, Some(hash_model()), "reports")
        .await
        .unwrap();
    index
        .update(vec![document("a", "disposable contents. ")])
        .await
        .unwrap();

    let old_project = index.project_id().to_owned();
    index.reset().await.unwrap();

    assert!(!service.has_project(&old_project));
    assert!(index.is_empty());
    assert_ne!(index.project_id(), old_project);
}
