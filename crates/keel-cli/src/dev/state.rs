//! Shared state for the development server.
//!
//! Everything here is built once before the server starts and then only
//! read, so handlers share it through an `Arc` without locking.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use keel_config::{DevProxyRouter, MANIFEST_FILE};

use crate::build::BuildOutput;

/// In-memory build output served under the public base path.
#[derive(Debug, Clone, Default)]
pub struct BundleCache {
    /// URL path -> (content, content-type)
    files: HashMap<String, (Vec<u8>, &'static str)>,
}

impl BundleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every file of `build` under `base`.
    ///
    /// The manifest is also reachable at the bare base path, with or without
    /// its trailing slash.
    pub fn from_build(build: &BuildOutput, base: &str) -> Self {
        let prefix = normalize_base(base);
        let mut cache = Self::new();

        for file in &build.files {
            let path = format!("{prefix}{}", file.file_name);
            cache.insert(path, file.contents.clone(), determine_content_type(&file.file_name));
        }

        if let Some(manifest) = build.get(MANIFEST_FILE) {
            let content_type = determine_content_type(MANIFEST_FILE);
            cache.insert(prefix.clone(), manifest.contents.clone(), content_type);
            let bare = prefix.trim_end_matches('/');
            if !bare.is_empty() {
                cache.insert(bare.to_string(), manifest.contents.clone(), content_type);
            }
        }

        cache
    }

    pub fn insert(&mut self, path: String, content: Vec<u8>, content_type: &'static str) {
        self.files.insert(path, (content, content_type));
    }

    pub fn get(&self, path: &str) -> Option<(&[u8], &'static str)> {
        self.files
            .get(path)
            .map(|(content, content_type)| (content.as_slice(), *content_type))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// `/ShiningSword` and `/ShiningSword/` both become `/ShiningSword/`.
fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// Determine content type from a file name extension.
pub fn determine_content_type(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json" | "map") => "application/json; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("html") => "text/html; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// State shared by every request handler.
#[derive(Debug)]
pub struct DevState {
    pub router: DevProxyRouter,
    pub cache: BundleCache,
    pub client: Client<HttpConnector, Body>,
}

pub type SharedState = Arc<DevState>;

impl DevState {
    pub fn new(router: DevProxyRouter, cache: BundleCache) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            router,
            cache,
            client,
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
