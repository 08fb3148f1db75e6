#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bucket_sync::config::{Config, SyncTarget};
use bucket_sync::contract::{ObjectStore, RemoteObject, Reporter};
use bucket_sync::error::BoxError;
use bucket_sync::stack::StackContext;

/// In-memory bucket contents keyed by (bucket, key).
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), (Vec<u8>, Option<String>)>>,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn insert(&self, bucket: &str, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), (body.to_vec(), None));
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn body(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(body, _)| body.clone())
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.puts.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<RemoteObject>, BoxError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), (body, _))| RemoteObject {
                key: k.clone(),
                size: body.len() as u64,
            })
            .collect())
    }

    async fn object_digest(&self, bucket: &str, key: &str) -> Result<Option<String>, BoxError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .and_then(|(_, digest)| digest.clone()))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        sha256: &str,
    ) -> Result<(), BoxError> {
        let body = std::fs::read(path)?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (body, Some(sha256.to_string())),
        );
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BoxError> {
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(&(bucket.to_string(), key.clone()));
            self.deletes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Reporter event, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Notice(String),
    Tick,
    Completed(String, String),
    Line(String),
}

#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn completed(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Completed(b, p) => Some((b, p)),
                _ => None,
            })
            .collect()
    }

    pub fn tick_count(&self) -> usize {
        self.events().iter().filter(|e| **e == Event::Tick).count()
    }
}

impl Reporter for RecordingReporter {
    fn notice(&self, message: &str) {
        self.events.lock().unwrap().push(Event::Notice(message.to_string()));
    }

    fn tick(&self) {
        self.events.lock().unwrap().push(Event::Tick);
    }

    fn target_completed(&self, bucket: &str, prefix: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Completed(bucket.to_string(), prefix.to_string()));
    }

    fn line(&self, label: &str, detail: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Line(format!("{label}{detail}")));
    }
}

pub fn target(local: &str, name: Option<&str>, reference: Option<&str>) -> SyncTarget {
    SyncTarget {
        local_dir: Some(local.to_string()),
        bucket_name: name.map(str::to_string),
        bucket_ref: reference.map(str::to_string),
        bucket_prefix: None,
    }
}

pub fn config(service_path: PathBuf, targets: Vec<SyncTarget>) -> Config {
    Config {
        service_path,
        stack: StackContext {
            service: "site".to_string(),
            stage: "dev".to_string(),
            region: "us-east-1".to_string(),
        },
        targets,
    }
}
