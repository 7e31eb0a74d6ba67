// src/fetch.rs
//! HTTP clients and the asset fetcher.
//!
//! Every source picks a route per stage (feed, content): through the
//! configured outbound proxy or straight out. Both clients share the same
//! client-level timeout; there is no retry anywhere.

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};

use crate::ingest::config::{HttpProxy, PipelineSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Proxied,
    Direct,
}

/// The two shared clients. Cloning is cheap (reqwest clients are reference counted).
#[derive(Clone)]
pub struct Clients {
    proxied: Client,
    direct: Client,
}

impl Clients {
    pub fn build(proxy: &HttpProxy, settings: &PipelineSettings) -> Result<Self> {
        let base = || {
            Client::builder()
                .timeout(Duration::from_secs(settings.timeout_secs))
                .user_agent(settings.user_agent.clone())
                .danger_accept_invalid_certs(settings.accept_invalid_certs)
        };

        let direct = base().no_proxy().build().context("building direct http client")?;
        let proxied = if proxy.use_proxy {
            let mut p = reqwest::Proxy::all(proxy.url())
                .with_context(|| format!("invalid proxy url {}", proxy.url()))?;
            if !proxy.user.is_empty() {
                p = p.basic_auth(&proxy.user, &proxy.password);
            }
            base()
                .proxy(p)
                .build()
                .context("building proxied http client")?
        } else {
            direct.clone()
        };

        Ok(Self { proxied, direct })
    }

    pub fn get(&self, route: Route) -> &Client {
        match route {
            Route::Proxied => &self.proxied,
            Route::Direct => &self.direct,
        }
    }
}

/// Retrieves one asset. `Ok(None)` is a soft miss (non-200), not an error.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, route: Route, url: &str) -> Result<Option<Vec<u8>>>;
}

pub struct HttpFetcher {
    clients: Clients,
}

impl HttpFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, route: Route, url: &str) -> Result<Option<Vec<u8>>> {
        let t0 = Instant::now();
        let resp = self
            .clients
            .get(route)
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::warn!(target: "fetch", %url, %status, ?route, "asset not available");
            counter!("fetch_soft_miss_total").increment(1);
            return Ok(None);
        }

        let body = resp
            .bytes()
            .await
            .with_context(|| format!("reading body of {url}"))?;

        histogram!("fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("fetch_bytes_total").increment(body.len() as u64);
        Ok(Some(body.to_vec()))
    }
}
