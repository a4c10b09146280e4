//! Token resolution for non-browser front ends
//!
//! The proxy server receives its token from the session cookie. Terminal
//! front ends have no cookie, so they look for a token in the environment or
//! ask the `gh` CLI.

use crate::types::{is_personal_access_token, AuthMethod};
use crate::DEFAULT_HOST;
use anyhow::{Context, Result};
use log::debug;

/// Where a resolved token came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Host-specific env var, e.g. `GITHUB_TOKEN_GHE_EXAMPLE_COM`
    HostEnv(String),
    /// `gh auth token --hostname <host>`
    GhCli,
    /// `GITHUB_TOKEN` or `GH_TOKEN`
    DefaultEnv,
}

/// A token together with its provenance
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: TokenSource,
}

impl ResolvedToken {
    /// Auth method implied by the token's shape
    ///
    /// `gh` hands out OAuth tokens (`gho_`), which lack the scopes needed to
    /// re-run CI, so only PAT-shaped tokens count as [`AuthMethod::Token`].
    pub fn auth_method(&self) -> AuthMethod {
        if is_personal_access_token(&self.token) {
            AuthMethod::Token
        } else {
            AuthMethod::Oauth
        }
    }
}

impl std::fmt::Debug for ResolvedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedToken")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Looks up a token for a GitHub host
///
/// A `GITHUB_TOKEN_<HOST>` variable wins, then whatever `gh` is logged in
/// with. The plain `GITHUB_TOKEN`/`GH_TOKEN` pair only applies to github.com.
#[derive(Debug, Clone, Default)]
pub struct TokenResolver {
    fallback: Option<String>,
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl TokenResolver {
    pub fn new() -> Self {
        Self {
            fallback: non_blank_env("GITHUB_TOKEN").or_else(|| non_blank_env("GH_TOKEN")),
        }
    }

    /// `ghe.corp-net.io` maps to `GITHUB_TOKEN_GHE_CORP_NET_IO`
    pub fn host_env_key(host: &str) -> String {
        let suffix: String = host
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();
        format!("GITHUB_TOKEN_{suffix}")
    }

    /// `None` means github.com
    pub async fn resolve(&self, host: Option<&str>) -> Result<ResolvedToken> {
        let host = host.unwrap_or(DEFAULT_HOST);
        let host_key = Self::host_env_key(host);

        let found = match non_blank_env(&host_key) {
            Some(token) => Some((token, TokenSource::HostEnv(host_key.clone()))),
            None => match gh_cli_token(host).await {
                Some(token) => Some((token, TokenSource::GhCli)),
                None if host == DEFAULT_HOST => self
                    .fallback
                    .clone()
                    .map(|token| (token, TokenSource::DefaultEnv)),
                None => None,
            },
        };

        let Some((token, source)) = found else {
            anyhow::bail!(
                "{host} has no token: export {host_key} or log in with `gh auth login --hostname {host}`"
            );
        };
        debug!("Token for {} taken from {:?}", host, source);
        Ok(ResolvedToken { token, source })
    }
}

/// `None` when `gh` is not installed, not logged in or prints nothing
async fn gh_cli_token(host: &str) -> Option<String> {
    let mut command = tokio::process::Command::new("gh");
    command.arg("auth").arg("token").arg("--hostname").arg(host);

    let output = match command.output().await.context("Running gh") {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            debug!("gh exited with {} for {}", output.status, host);
            return None;
        }
        Err(e) => {
            debug!("{:#}", e);
            return None;
        }
    };

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_host_env_key() {
        assert_eq!(
            TokenResolver::host_env_key("github.com"),
            "GITHUB_TOKEN_GITHUB_COM"
        );
        assert_eq!(
            TokenResolver::host_env_key("ghe.corp-net.io"),
            "GITHUB_TOKEN_GHE_CORP_NET_IO"
        );
    }

    #[tokio::test]
    async fn test_unknown_host_without_token_fails() {
        let resolver = TokenResolver {
            fallback: Some("ghp_only_for_dotcom".to_string()),
        };
        // gh may be installed in the test environment, but never for this host
        let err = resolver
            .resolve(Some("no-such-host.invalid"))
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("GITHUB_TOKEN_NO_SUCH_HOST_INVALID"));
    }

    #[test]
    fn test_auth_method_follows_token_prefix() {
        let resolved = |token: &str| ResolvedToken {
            token: token.to_string(),
            source: TokenSource::GhCli,
        };
        assert_eq!(resolved("github_pat_123").auth_method(), AuthMethod::Token);
        assert_eq!(resolved("ghp_123").auth_method(), AuthMethod::Token);
        assert_eq!(resolved("gho_123").auth_method(), AuthMethod::Oauth);
    }

    #[test]
    fn test_debug_output_hides_token() {
        let resolved = ResolvedToken {
            token: "ghp_secret".to_string(),
            source: TokenSource::DefaultEnv,
        };
        assert!(!format!("{:?}", resolved).contains("ghp_secret"));
    }
}
