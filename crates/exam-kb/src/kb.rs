//! Session-scoped knowledge base facade

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::KbConfig;
use crate::error::{Error, Result};
use crate::generation::{
    fallback_questions, format_references, latex_to_natural, parse_generated, question_context,
    references_in_answer, ContextAssembler, PromptBuilder,
};
use crate::ingestion::{self, classify_bucket};
use crate::providers::ChatModel;
use crate::retrieval::{LoadedFile, Retriever};
use crate::storage::{SessionState, SessionStore};
use crate::types::{
    mime_for_filename, Answer, Bucket, BucketListing, FileMetadata, FileRecord, FileWithContent,
    GeneratedQuestions, QuestionRequest, RescanReport, Retrieval, SessionInfo, SyncReport,
    MAX_QUESTION_COUNT,
};

/// Reduce an uploaded filename to its final path component
fn sanitize_filename(filename: &str) -> Result<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::invalid_input(format!("Invalid filename: {:?}", filename)));
    }
    Ok(name.to_string())
}

fn session_info(state: &SessionState) -> SessionInfo {
    SessionInfo {
        session_id: state.session_id.clone(),
        created_at: state.created_at,
        material_count: state.material.len(),
        question_bank_count: state.question_bank.len(),
    }
}

/// Parse records on the blocking pool, preserving order
async fn load_files(records: &[FileRecord]) -> Result<Vec<LoadedFile>> {
    let tasks = records.iter().map(|record| {
        let name = record.name.clone();
        let path = record.storage_path.clone();
        let mime_type = record.mime_type.clone();
        tokio::task::spawn_blocking(move || {
            LoadedFile::from_parse(name, ingestion::parse(&path, &mime_type))
        })
    });

    futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.map_err(|e| Error::Internal(format!("Task join error: {}", e))))
        .collect()
}

fn file_names(files: &[LoadedFile]) -> Vec<String> {
    files.iter().map(|f| f.name.clone()).collect()
}

/// Session-scoped exam revision knowledge base
pub struct KnowledgeBase {
    config: KbConfig,
    store: Arc<SessionStore>,
    retriever: Retriever,
}

impl KnowledgeBase {
    /// Open the knowledge base rooted at the configured data directory
    pub fn open(config: KbConfig) -> Result<Self> {
        let store = Arc::new(SessionStore::open(&config.storage)?);
        Ok(Self::with_store(config, store))
    }

    /// Build on an existing session store
    pub fn with_store(config: KbConfig, store: Arc<SessionStore>) -> Self {
        let retriever = Retriever::new(&config.retrieval);
        Self {
            config,
            store,
            retriever,
        }
    }

    pub fn config(&self) -> &KbConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Persist a state change, restoring the previous state if the write fails
    async fn persist_or_revert(&self, state: &mut SessionState, before: SessionState) -> Result<()> {
        if let Err(e) = self.store.persist(state).await {
            *state = before;
            return Err(e);
        }
        Ok(())
    }

    /// Create an empty session
    pub async fn create_session(&self) -> Result<SessionInfo> {
        let (_, handle) = self.store.create().await?;
        let state = handle.read().await;
        Ok(session_info(&state))
    }

    /// Summary of a session
    pub async fn session_info(&self, session_id: &str) -> Result<SessionInfo> {
        let handle = self.store.get(session_id).await?;
        let state = handle.read().await;
        Ok(session_info(&state))
    }

    /// Store uploaded bytes under the session's upload directory and register them
    pub async fn upload(
        &self,
        session_id: &str,
        bucket: Bucket,
        filename: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<FileRecord> {
        let max = self.config.storage.max_file_size;
        if bytes.len() as u64 > max {
            return Err(Error::invalid_input(format!(
                "File too large: {} bytes (max {})",
                bytes.len(),
                max
            )));
        }

        let name = sanitize_filename(filename)?;
        let mime_type = if mime_type.trim().is_empty() {
            mime_for_filename(&name)
        } else {
            mime_type.trim().to_string()
        };

        let handle = self.store.get(session_id).await?;
        let mut state = handle.write().await;

        let dir = self.store.upload_dir(session_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::storage(&dir, e))?;
        let path = dir.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::storage(&path, e))?;

        let before = state.clone();
        let record = state.append(
            bucket,
            FileMetadata {
                name,
                size: bytes.len() as u64,
                mime_type,
                storage_path: path,
                upload_time: None,
            },
        );
        self.persist_or_revert(&mut state, before).await?;

        tracing::info!(
            "Uploaded {} ({} bytes) to {} of session {}",
            record.name,
            record.size,
            bucket,
            session_id
        );
        Ok(record)
    }

    /// Register a file that is already stored
    pub async fn append(
        &self,
        session_id: &str,
        bucket: Bucket,
        metadata: FileMetadata,
    ) -> Result<FileRecord> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.write().await;

        let before = state.clone();
        let record = state.append(bucket, metadata);
        self.persist_or_revert(&mut state, before).await?;

        tracing::debug!("Appended {} to {} of session {}", record.id, bucket, session_id);
        Ok(record)
    }

    /// Both buckets of a session
    pub async fn list(&self, session_id: &str) -> Result<BucketListing> {
        let handle = self.store.get(session_id).await?;
        let state = handle.read().await;
        Ok(state.listing())
    }

    /// One record by id
    pub async fn get_file(&self, session_id: &str, file_id: &str) -> Result<FileRecord> {
        let handle = self.store.get(session_id).await?;
        let state = handle.read().await;
        state
            .find(file_id)
            .cloned()
            .ok_or_else(|| Error::file_not_found(session_id, file_id))
    }

    /// One record with freshly parsed content
    pub async fn file_content(&self, session_id: &str, file_id: &str) -> Result<FileWithContent> {
        let handle = self.store.get(session_id).await?;
        let state = handle.read().await;
        let record = state
            .find(file_id)
            .cloned()
            .ok_or_else(|| Error::file_not_found(session_id, file_id))?;

        let path = record.storage_path.clone();
        let mime_type = record.mime_type.clone();
        let content = tokio::task::spawn_blocking(move || ingestion::read_content(&path, &mime_type))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?;

        Ok(FileWithContent { record, content })
    }

    /// Every record with freshly parsed content, material first
    pub async fn all_content(&self, session_id: &str) -> Result<Vec<FileWithContent>> {
        let handle = self.store.get(session_id).await?;
        let state = handle.read().await;

        let records: Vec<FileRecord> = state.listing().iter().cloned().collect();
        let loaded = load_files(&records).await?;

        Ok(records
            .into_iter()
            .zip(loaded)
            .map(|(record, file)| FileWithContent {
                record,
                content: file.rendered,
            })
            .collect())
    }

    /// Remove a record and, best-effort, its file. `Ok(false)` when no record matched.
    pub async fn remove(&self, session_id: &str, bucket: Bucket, file_id: &str) -> Result<bool> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.write().await;

        let before = state.clone();
        let Some(record) = state.remove(bucket, file_id) else {
            tracing::debug!("No {} record {} in session {}", bucket, file_id, session_id);
            return Ok(false);
        };
        self.persist_or_revert(&mut state, before).await?;

        if !state.references_path(&record.storage_path) {
            match tokio::fs::remove_file(&record.storage_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    "Failed to delete {}: {}",
                    record.storage_path.display(),
                    e
                ),
            }
        }

        tracing::info!("Removed {} from {} of session {}", record.id, bucket, session_id);
        Ok(true)
    }

    /// Reload a session from disk and drop records whose file vanished
    pub async fn sync(&self, session_id: &str) -> Result<SyncReport> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.write().await;

        let mut fresh = match self.store.load_from_disk(session_id).await {
            Ok(fresh) => fresh,
            Err(e @ Error::SessionNotFound(_)) => {
                // record file deleted externally: the session is gone
                drop(state);
                self.store.evict(session_id);
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let removed = fresh.retain_existing();
        let persisted = !removed.is_empty();
        if persisted {
            self.store.persist(&fresh).await?;
            tracing::info!(
                "Sync dropped {} stale records from session {}",
                removed.len(),
                session_id
            );
        }

        *state = fresh;
        Ok(SyncReport {
            session_id: session_id.to_string(),
            removed,
            remaining: state.file_count(),
            persisted,
        })
    }

    /// Sync every persisted session, isolating per-session failures
    pub async fn rescan_all(&self) -> Result<RescanReport> {
        let mut report = RescanReport::default();

        let persisted = self.store.persisted_session_ids().await?;
        for session_id in self.store.cached_session_ids() {
            if !persisted.contains(&session_id) && self.store.evict(&session_id) {
                report.evicted.push(session_id);
            }
        }
        report.evicted.sort();

        for session_id in persisted {
            let outcome = self.sync(&session_id).await;
            if let Err(e) = &outcome {
                tracing::warn!("Rescan of session {} failed: {}", session_id, e);
            }
            report.record(session_id, outcome);
        }

        tracing::info!(
            "Rescan finished: {} succeeded, {} failed, {} records removed",
            report.succeeded,
            report.failed,
            report.total_removed()
        );
        Ok(report)
    }

    /// Register files in the session's upload directory that no record references
    pub async fn import_untracked(&self, session_id: &str) -> Result<Vec<FileRecord>> {
        let handle = self.store.get(session_id).await?;
        let mut state = handle.write().await;

        let dir = self.store.upload_dir(session_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| Error::storage(&dir, e))?;
        let mut found: Vec<(PathBuf, std::fs::Metadata)> = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::storage(&dir, e))?
        {
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            found.push((entry.path(), metadata));
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));

        let before = state.clone();
        let mut added = Vec::new();
        for (path, metadata) in found {
            if state.references_path(&path) {
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };

            let bucket = classify_bucket(&name, &self.config.classification.question_bank_keywords);
            let record = state.append(
                bucket,
                FileMetadata {
                    mime_type: mime_for_filename(&name),
                    name,
                    size: metadata.len(),
                    storage_path: path,
                    upload_time: metadata.modified().ok().map(DateTime::<Utc>::from),
                },
            );
            tracing::debug!("Imported {} into {}", record.name, bucket);
            added.push(record);
        }

        if !added.is_empty() {
            self.persist_or_revert(&mut state, before).await?;
            tracing::info!("Imported {} untracked files into session {}", added.len(), session_id);
        }
        Ok(added)
    }

    /// Parse a consistent snapshot and run retrieval over it
    async fn retrieve_snapshot(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<(Retrieval, Vec<LoadedFile>)> {
        let handle = self.store.get(session_id).await?;
        let state = handle.read().await;

        if state.file_count() == 0 {
            return Ok((self.retriever.retrieve(query, &[], &[]), Vec::new()));
        }

        let material = load_files(&state.material).await?;
        let question_bank = load_files(&state.question_bank).await?;
        drop(state);

        let retrieval = self.retriever.retrieve(query, &material, &question_bank);
        tracing::debug!("Query in session {} used {:?}", session_id, retrieval.strategy);

        let mut files = material;
        files.extend(question_bank);
        Ok((retrieval, files))
    }

    /// Pick a retrieval strategy for a query and build its context
    pub async fn retrieve(&self, session_id: &str, query: &str) -> Result<Retrieval> {
        Ok(self.retrieve_snapshot(session_id, query).await?.0)
    }

    /// Answer a query, calling the model only when retrieval cannot answer directly
    pub async fn answer(
        &self,
        session_id: &str,
        query: &str,
        model: &dyn ChatModel,
    ) -> Result<Answer> {
        let (retrieval, files) = self.retrieve_snapshot(session_id, query).await?;
        let strategy = retrieval.strategy;

        let Some((system, user)) = PromptBuilder::build(strategy, query, &retrieval.context_text)
        else {
            return Ok(Answer {
                answer: retrieval.context_text,
                references: retrieval.source_refs,
                strategy,
            });
        };

        tracing::info!("Calling {} ({}) for session {}", model.name(), model.model(), session_id);
        let reply = match model.complete(&system, &user).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Model call failed: {}", e);
                return Ok(Answer {
                    answer: PromptBuilder::model_failure_answer(&e.to_string()),
                    references: Vec::new(),
                    strategy,
                });
            }
        };

        let references = references_in_answer(
            &reply,
            &files,
            self.config.retrieval.reference_excerpt_chars,
        );
        let mut answer = latex_to_natural(&reply);
        answer.push_str(&format_references(&references));

        Ok(Answer {
            answer,
            references,
            strategy,
        })
    }

    /// Practice questions on a topic, extracted from the question bank or written from
    /// the material. Model failures and unusable replies fall back to template questions.
    pub async fn generate_questions(
        &self,
        session_id: &str,
        request: &QuestionRequest,
        model: &dyn ChatModel,
    ) -> Result<GeneratedQuestions> {
        if request.topic.trim().is_empty() {
            return Err(Error::invalid_input("Question topic is empty"));
        }
        if request.count == 0 || request.count > MAX_QUESTION_COUNT {
            return Err(Error::invalid_input(format!(
                "Question count must be between 1 and {}, got {}",
                MAX_QUESTION_COUNT, request.count
            )));
        }

        let handle = self.store.get(session_id).await?;
        let state = handle.read().await;
        let material = load_files(&state.material).await?;
        let question_bank = load_files(&state.question_bank).await?;
        drop(state);

        let fallback =
            || fallback_questions(request, &file_names(&material), &file_names(&question_bank));

        let assembler = ContextAssembler::from(&self.config.retrieval);
        let context = question_context(&assembler, &material, &question_bank);
        let (system, user) = PromptBuilder::question_generation(request, &context);

        tracing::info!(
            "Generating {} questions on {:?} with {} for session {}",
            request.count,
            request.topic,
            model.model(),
            session_id
        );
        match model.complete(&system, &user).await {
            Ok(reply) => match parse_generated(&reply) {
                Some(generated) => Ok(generated),
                None => {
                    tracing::warn!("Unusable question reply, using template questions");
                    Ok(fallback())
                }
            },
            Err(e) => {
                tracing::error!("Question generation call failed: {}", e);
                Ok(fallback())
            }
        }
    }
}
