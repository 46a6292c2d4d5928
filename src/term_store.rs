use async_trait::async_trait;
use dashmap::DashMap;
use notify::{RecursiveMode, Watcher, event::{ModifyKind, EventKind}};
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::error::{AppError, Result};
use crate::models::FeeTerm;

/// Where a student's fee terms come from. The list handed back is assumed complete
/// for that student at read time.
#[async_trait]
pub trait FeeTermSource: Send + Sync {
    async fn terms_for_student(&self, student_id: &str) -> Result<Option<Vec<FeeTerm>>>;
}

/// Fee terms kept as one JSON file per student (`<dir>/<student_id>.json`),
/// cached in memory and refreshed when the files change.
#[derive(Debug, Clone)]
pub struct JsonTermStore {
    dir: PathBuf,
    cache: Arc<DashMap<String, Vec<FeeTerm>>>,
}

impl JsonTermStore {
    /// Loads every `*.json` file in `dir`. Files that fail to parse are logged and skipped.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let cache = Arc::new(DashMap::new());

        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if let Some(student_id) = student_id_for(&path) {
                match read_terms(&path) {
                    Ok(terms) => {
                        tracing::info!("Loaded {} fee terms for {}", terms.len(), student_id);
                        cache.insert(student_id, terms);
                    }
                    Err(e) => {
                        tracing::error!("Failed to load fee terms {}: {}", path.display(), e);
                    }
                }
            }
        }

        Ok(Self { dir, cache })
    }

    /// Store backed only by memory, no directory behind it.
    pub fn from_terms<I>(students: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<FeeTerm>)>,
    {
        let cache = Arc::new(DashMap::new());
        for (student_id, terms) in students {
            cache.insert(student_id, terms);
        }
        Self { dir: PathBuf::new(), cache }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn student_count(&self) -> usize {
        self.cache.len()
    }

    /// Watches the data directory and keeps the cache in step with it.
    /// Runs in a separate Tokio task.
    pub async fn watch(&self) -> notify::Result<()> {
        let data_path = if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            std::env::current_dir()?.join(&self.dir)
        };
        let data_path_for_closure = data_path.clone();
        let cache = self.cache.clone();

        let event_handler = move |res: DebounceEventResult| {
            match res {
                Ok(events) => {
                    for event in events {
                        for path in &event.paths {
                            if !path.starts_with(&data_path_for_closure) {
                                continue;
                            }
                            let Some(student_id) = student_id_for(path) else {
                                continue;
                            };
                            match event.kind {
                                EventKind::Modify(ModifyKind::Data(_)) | EventKind::Create(_) if path.is_file() => {
                                    match read_terms(path) {
                                        Ok(terms) => {
                                            cache.insert(student_id, terms);
                                            tracing::info!("Reloaded fee terms: {}", path.display());
                                        }
                                        Err(e) => {
                                            // keep serving the last good copy
                                            tracing::error!(
                                                "Failed to reload fee terms {}: {}",
                                                path.display(),
                                                e
                                            );
                                        }
                                    }
                                }
                                EventKind::Remove(_) => {
                                    cache.remove(&student_id);
                                    tracing::info!("Dropped fee terms for {}", student_id);
                                }
                                _ => {}
                            }
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::error!("File watching error: {:?}", error);
                    }
                }
            }
        };

        let mut debouncer = new_debouncer(
            Duration::from_secs(1),
            None,
            event_handler
        )?;

        debouncer
            .watcher()
            .watch(&data_path, RecursiveMode::NonRecursive)?;

        debouncer
            .cache()
            .add_root(&data_path, RecursiveMode::NonRecursive);

        tracing::info!("Fee term watcher started for directory: {}", data_path.display());

        // the debouncer stops watching once dropped
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    }
}

#[async_trait]
impl FeeTermSource for JsonTermStore {
    async fn terms_for_student(&self, student_id: &str) -> Result<Option<Vec<FeeTerm>>> {
        Ok(self.cache.get(student_id).map(|entry| entry.value().clone()))
    }
}

fn student_id_for(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn read_terms(path: &Path) -> Result<Vec<FeeTerm>> {
    let content = fs::read_to_string(path)?;
    let terms: Vec<FeeTerm> = serde_json::from_str(&content)?;
    let mut seen = std::collections::HashSet::new();
    if let Some(dup) = terms.iter().find(|t| !seen.insert(&t.id)) {
        return Err(AppError::BadRequest(format!(
            "duplicate fee term id {} in {}",
            dup.id,
            path.display()
        )));
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn student_id_comes_from_json_file_stem() {
        assert_eq!(student_id_for(Path::new("/x/STU-42.json")).as_deref(), Some("STU-42"));
        assert_eq!(student_id_for(Path::new("/x/notes.txt")), None);
        assert_eq!(student_id_for(Path::new("/x/.json")), None);
    }

    #[actix_rt::test]
    async fn load_reads_good_files_and_skips_bad_ones() {
        let dir = temp_dir("schoolfees-store");
        fs::write(
            dir.join("stu1.json"),
            r#"[{"id":"t1","name":"Term 1","totalAmount":1200,"isPaid":false,"feeHeads":[]}]"#,
        )
        .expect("write stu1");
        fs::write(dir.join("broken.json"), "{ not json").expect("write broken");
        fs::write(
            dir.join("dupes.json"),
            r#"[{"id":"t1","name":"Term 1","totalAmount":1},{"id":"t1","name":"Term 2","totalAmount":1}]"#,
        )
        .expect("write dupes");
        fs::write(dir.join("readme.md"), "ignored").expect("write readme");

        let store = JsonTermStore::load(&dir).expect("load store");
        assert_eq!(store.student_count(), 1);

        let terms = store.terms_for_student("stu1").await.expect("lookup");
        assert_eq!(terms.map(|t| t.len()), Some(1));
        assert!(store.terms_for_student("broken").await.expect("lookup").is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_fails_for_missing_directory() {
        let missing = std::env::temp_dir().join("schoolfees-definitely-missing-dir");
        assert!(matches!(JsonTermStore::load(missing), Err(AppError::Io(_))));
    }
}
