//! Resolution of a hosting-service identity from a remote URL through a
//! three-stage priority cascade: user config, hostname pattern, HTTP
//! probe. Grounded in shape on the pack's enum-dispatched provider
//! client (config lookup keyed by host, one client struct per request),
//! adapted down to this crate's narrower "resolve an identity" contract.

use std::time::Duration;

use regex::Regex;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;

use crate::{config::Config, error::CatmitError, retry::RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
   GitHub,
   GitLab,
   Gitea,
   Bitbucket,
   Gogs,
   Unknown,
}

impl Provider {
   pub(crate) const fn as_str(self) -> &'static str {
      match self {
         Self::GitHub => "github",
         Self::GitLab => "gitlab",
         Self::Gitea => "gitea",
         Self::Bitbucket => "bitbucket",
         Self::Gogs => "gogs",
         Self::Unknown => "unknown",
      }
   }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
   Https,
   Ssh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
   pub provider: Provider,
   pub host:     String,
   pub port:     u16,
   pub owner:    String,
   pub repo:     String,
   pub protocol: Protocol,
}

impl RemoteInfo {
   /// Reconstructs `https://<host>[:<port>]`, including the port only
   /// when it is nonzero and not the default 80/443.
   pub fn http_url(&self) -> String {
      if self.port == 0 || self.port == 80 || self.port == 443 {
         format!("https://{}", self.host)
      } else {
         format!("https://{}:{}", self.host, self.port)
      }
   }
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
   pub is_gitea: bool,
   pub version:  String,
   pub error:    Option<String>,
}

static SCP_RE: LazyLock<Regex> =
   LazyLock::new(|| Regex::new(r"^[\w.-]+@(?P<host>[\w.-]+):(?P<path>.+)$").unwrap());
static SSH_RE: LazyLock<Regex> =
   LazyLock::new(|| Regex::new(r"^ssh://[\w.-]+@(?P<host>[\w.-]+)(:(?P<port>\d+))?/(?P<path>.+)$").unwrap());
static HTTP_RE: LazyLock<Regex> =
   LazyLock::new(|| Regex::new(r"^https?://(?P<host>[\w.-]+)(:(?P<port>\d+))?/(?P<path>.+)$").unwrap());

fn split_owner_repo(path: &str) -> Option<(String, String)> {
   let path = path.strip_suffix(".git").unwrap_or(path);
   let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
   if segments.len() < 2 {
      return None;
   }
   let repo = (*segments.last()?).to_string();
   let owner = segments[..segments.len() - 1].join("/");
   if owner.is_empty() || repo.is_empty() {
      return None;
   }
   Some((owner, repo))
}

/// Parses the three documented remote-URL syntaxes. Empty input,
/// missing path, or a single path segment are rejected.
pub fn parse_git_remote_url(url: &str) -> Result<RemoteInfo, CatmitError> {
   let url = url.trim();
   if url.is_empty() {
      return Err(CatmitError::Validation("empty remote URL".to_string()));
   }

   if let Some(caps) = SSH_RE.captures(url) {
      let host = caps["host"].to_string();
      let port = caps.name("port").and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
      let (owner, repo) = split_owner_repo(&caps["path"])
         .ok_or_else(|| CatmitError::Validation(format!("cannot parse owner/repo from {url}")))?;
      return Ok(RemoteInfo { provider: Provider::Unknown, host, port, owner, repo, protocol: Protocol::Ssh });
   }

   if let Some(caps) = HTTP_RE.captures(url) {
      let host = caps["host"].to_string();
      let port = caps.name("port").and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
      let (owner, repo) = split_owner_repo(&caps["path"])
         .ok_or_else(|| CatmitError::Validation(format!("cannot parse owner/repo from {url}")))?;
      return Ok(RemoteInfo { provider: Provider::Unknown, host, port, owner, repo, protocol: Protocol::Https });
   }

   if let Some(caps) = SCP_RE.captures(url) {
      let host = caps["host"].to_string();
      let (owner, repo) = split_owner_repo(&caps["path"])
         .ok_or_else(|| CatmitError::Validation(format!("cannot parse owner/repo from {url}")))?;
      return Ok(RemoteInfo { provider: Provider::Unknown, host, port: 0, owner, repo, protocol: Protocol::Ssh });
   }

   Err(CatmitError::Validation(format!("unrecognized remote URL syntax: {url}")))
}

fn provider_from_hostname(host: &str) -> Option<Provider> {
   let lower = host.to_lowercase();
   match lower.as_str() {
      "github.com" => return Some(Provider::GitHub),
      "gitlab.com" => return Some(Provider::GitLab),
      "bitbucket.org" => return Some(Provider::Bitbucket),
      "gitea.com" => return Some(Provider::Gitea),
      _ => {},
   }
   if lower.contains("github") {
      Some(Provider::GitHub)
   } else if lower.contains("gitlab") {
      Some(Provider::GitLab)
   } else if lower.contains("bitbucket") {
      Some(Provider::Bitbucket)
   } else if lower.contains("gitea") {
      Some(Provider::Gitea)
   } else if lower.contains("gogs") {
      Some(Provider::Gogs)
   } else {
      None
   }
}

pub struct ProviderResolver {
   http:  reqwest::Client,
   retry: RetryPolicy,
}

impl Default for ProviderResolver {
   fn default() -> Self {
      Self {
         http:  reqwest::Client::builder().timeout(Duration::from_secs(3)).build().unwrap_or_default(),
         retry: RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(4), 2.0),
      }
   }
}

impl ProviderResolver {
   /// Runs the three-stage cascade; the first stage to succeed wins.
   /// On a successful HTTP probe, opportunistically writes the
   /// host→provider mapping back to `config` — write failures are
   /// swallowed, the cache-write is never load-bearing for correctness.
   pub async fn resolve(
      &self,
      cancel: &CancellationToken,
      config: &mut Config,
      host: &str,
      port: u16,
   ) -> Result<Provider, CatmitError> {
      if let Some(provider) = config.provider_for_host(host) {
         return Ok(provider);
      }

      if let Some(provider) = provider_from_hostname(host) {
         return Ok(provider);
      }

      let probe = self.probe(cancel, host, port).await?;
      if probe.is_gitea && !probe.version.is_empty() {
         let _ = config.remember_provider(host, Provider::Gitea).and_then(|()| config.save());
         return Ok(Provider::Gitea);
      }

      Ok(Provider::Unknown)
   }

   async fn probe(&self, cancel: &CancellationToken, host: &str, port: u16) -> Result<ProbeResult, CatmitError> {
      let base = if port == 0 || port == 80 || port == 443 {
         format!("https://{host}")
      } else {
         format!("https://{host}:{port}")
      };
      let url = format!("{base}/api/v1/version");

      let result = self
         .retry
         .execute(cancel, || {
            let http = self.http.clone();
            let url = url.clone();
            async move {
               let response = http.get(&url).send().await.map_err(|e| CatmitError::Network(e.to_string()))?;
               let status = response.status();
               if status.is_server_error() {
                  return Err(CatmitError::Network(format!("probe {url} returned {status}")));
               }
               if status != reqwest::StatusCode::OK {
                  return Err(CatmitError::Provider(format!("probe {url} returned non-200: {status}")));
               }
               let body: serde_json::Value =
                  response.json().await.map_err(|e| CatmitError::Provider(format!("invalid JSON from {url}: {e}")))?;
               Ok(body.get("version").and_then(|v| v.as_str()).unwrap_or_default().to_string())
            }
         })
         .await;

      match result {
         Ok(version) if !version.is_empty() => Ok(ProbeResult { is_gitea: true, version, error: None }),
         Ok(_) => Ok(ProbeResult { is_gitea: false, version: String::new(), error: None }),
         Err(err) => Ok(ProbeResult { is_gitea: false, version: String::new(), error: Some(err.to_string()) }),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn parses_scp_like_syntax() {
      let info = parse_git_remote_url("git@github.com:owner/repo.git").unwrap();
      assert_eq!(info.protocol, Protocol::Ssh);
      assert_eq!(info.host, "github.com");
      assert_eq!(info.port, 0);
      assert_eq!(info.owner, "owner");
      assert_eq!(info.repo, "repo");
   }

   #[test]
   fn parses_ssh_with_explicit_port() {
      let info = parse_git_remote_url("ssh://git@gitea.company.com:2222/owner/repo.git").unwrap();
      assert_eq!(info.host, "gitea.company.com");
      assert_eq!(info.port, 2222);
      assert_eq!(info.owner, "owner");
      assert_eq!(info.repo, "repo");
      assert_eq!(info.protocol, Protocol::Ssh);
   }

   #[test]
   fn parses_https_with_nested_group() {
      let info = parse_git_remote_url("https://gitlab.example.com/group/subgroup/repo").unwrap();
      assert_eq!(info.owner, "group/subgroup");
      assert_eq!(info.repo, "repo");
      assert_eq!(info.protocol, Protocol::Https);
   }

   #[test]
   fn rejects_single_segment_path() {
      assert!(parse_git_remote_url("https://example.com/onlyrepo").is_err());
   }

   #[test]
   fn rejects_empty_url() {
      assert!(parse_git_remote_url("").is_err());
   }

   #[test]
   fn hostname_pattern_matches_exact_and_substring() {
      assert_eq!(provider_from_hostname("github.com"), Some(Provider::GitHub));
      assert_eq!(provider_from_hostname("my.gitlab.internal"), Some(Provider::GitLab));
      assert_eq!(provider_from_hostname("git.example.com"), None);
   }

   #[test]
   fn http_url_omits_default_ports() {
      let info = RemoteInfo {
         provider: Provider::Unknown,
         host:     "example.com".to_string(),
         port:     443,
         owner:    "o".to_string(),
         repo:     "r".to_string(),
         protocol: Protocol::Https,
      };
      assert_eq!(info.http_url(), "https://example.com");
   }

   #[test]
   fn http_url_keeps_nonstandard_port() {
      let info = RemoteInfo {
         provider: Provider::Unknown,
         host:     "example.com".to_string(),
         port:     2222,
         owner:    "o".to_string(),
         repo:     "r".to_string(),
         protocol: Protocol::Https,
      };
      assert_eq!(info.http_url(), "https://example.com:2222");
   }
}
