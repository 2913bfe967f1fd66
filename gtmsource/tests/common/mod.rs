//! Scriptable provider shared by the integration tests

#![allow(dead_code)]

use gtmsource::{AudioResolver, PreviewStream, ProviderKind, VideoPreview};
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, mpsc};

/// How a scripted provider behaves when searched
#[derive(Debug, Clone)]
pub enum Script {
    Yield(Vec<VideoPreview>),
    /// The backend call fails: the stream ends without results
    Fail,
    /// The stream panics on first poll
    Panic,
}

#[derive(Debug)]
pub struct ScriptedProvider {
    kind: ProviderKind,
    script: Mutex<Vec<Script>>,
    /// When set, each search waits for one permit before yielding anything
    gate: Option<Arc<Semaphore>>,
    pub searched: Mutex<Vec<String>>,
    pub resolved: Mutex<Vec<String>>,
    downloads: mpsc::UnboundedSender<String>,
}

impl ScriptedProvider {
    /// Builds a provider that plays `scripts` in order, one per search call
    ///
    /// The last script repeats once the list is exhausted.
    pub fn new(kind: ProviderKind, scripts: Vec<Script>) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = Arc::new(Self {
            kind,
            script: Mutex::new(scripts),
            gate: None,
            searched: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
            downloads: tx,
        });
        (provider, rx)
    }

    pub fn gated(kind: ProviderKind, scripts: Vec<Script>, gate: Arc<Semaphore>) -> Arc<Self> {
        let (tx, _rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            kind,
            script: Mutex::new(scripts),
            gate: Some(gate),
            searched: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
            downloads: tx,
        })
    }

    fn next_script(&self) -> Script {
        let mut scripts = self.script.lock().unwrap();
        if scripts.len() > 1 {
            scripts.remove(0)
        } else {
            scripts.first().cloned().unwrap_or(Script::Yield(vec![]))
        }
    }
}

#[async_trait::async_trait]
impl AudioResolver for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn search(&self, term: &str) -> PreviewStream {
        self.searched.lock().unwrap().push(term.to_string());
        let script = self.next_script();
        let gate = self.gate.clone();

        Box::pin(async_stream::stream! {
            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }
            match script {
                Script::Yield(previews) => {
                    for preview in previews {
                        tokio::task::yield_now().await;
                        yield preview;
                    }
                }
                Script::Fail => {}
                Script::Panic => panic!("provider exploded"),
            }
        })
    }

    async fn resolve_url(&self, preview: &VideoPreview) -> Option<String> {
        self.resolved.lock().unwrap().push(preview.id.clone());
        preview.url.clone()
    }

    async fn download(&self, preview: &VideoPreview) -> bool {
        let _ = self.downloads.send(preview.id.clone());
        true
    }
}

pub fn preview(id: &str) -> VideoPreview {
    VideoPreview::new(id, format!("title {id}"), "")
}

pub fn preview_with_url(id: &str, url: &str) -> VideoPreview {
    preview(id).with_url(url)
}
