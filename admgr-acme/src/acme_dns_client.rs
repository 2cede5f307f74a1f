//! ACME-DNS HTTP client: account registration and TXT-record updates at
//! challenge time.
//!
//! Grounded on `VerKnowSys-hyperacme`'s `reqwest`-based request style and
//! `houseme-acmex`'s `src/client.rs` request/response shape, adapted to
//! acme-dns's specific two endpoints (`/register`, `/update`).

use std::time::Duration;

use admgr_core::{AcmeDnsAccount, Error};
use serde::Serialize;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("acme-dns-manager/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct UpdateRequest<'a> {
    subdomain: &'a str,
    txt: &'a str,
}

pub struct AcmeDnsClient {
    http: reqwest::Client,
}

impl AcmeDnsClient {
    pub fn new() -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::network("acme_dns_client_init", format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// `POST <server_url>/register` with an empty JSON body. Any status
    /// other than 201 is `RegistrationFailed`.
    pub async fn register(&self, server_url: &str) -> Result<AcmeDnsAccount, Error> {
        let url = format!("{}/register", server_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| Error::network("acme_dns_register", format!("request failed: {e}")).with_resource(url.clone()))?;

        let status = resp.status();
        if status.as_u16() != 201 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::network(
                "acme_dns_register",
                format!("registration failed: HTTP {status}"),
            )
            .with_resource(url)
            .with_context("body", truncate(&body)));
        }

        resp.json::<AcmeDnsAccount>().await.map_err(|e| {
            Error::network("acme_dns_register", format!("invalid JSON response: {e}")).with_resource(url)
        })
    }

    /// `POST <server_url>/update` with HTTP Basic Auth (account username
    /// and password) and `{"subdomain", "txt"}`. Used to publish the
    /// DNS-01 proof at challenge time.
    pub async fn update(&self, server_url: &str, account: &AcmeDnsAccount, txt: &str) -> Result<(), Error> {
        let url = format!("{}/update", server_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .basic_auth(&account.username, Some(&account.password))
            .json(&UpdateRequest {
                subdomain: &account.sub_domain,
                txt,
            })
            .send()
            .await
            .map_err(|e| Error::network("acme_dns_update", format!("request failed: {e}")).with_resource(url.clone()))?;

        let status = resp.status();
        if status.as_u16() == 401 {
            return Err(Error::authentication("acme_dns_update", "acme-dns rejected credentials (401)")
                .with_resource(url)
                .suggest("re-register this domain's acme-dns account"));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::network("acme_dns_update", format!("update failed: HTTP {status}"))
                .with_resource(url)
                .with_context("body", truncate(&body)));
        }
        Ok(())
    }
}

impl Default for AcmeDnsClient {
    fn default() -> Self {
        Self::new().expect("default reqwest client configuration is always valid")
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 500;
    if s.len() > MAX {
        format!("{}...", &s[..MAX])
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn register_parses_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "username": "u1",
                "password": "p1",
                "fulldomain": "abc.acme-dns.example",
                "subdomain": "abc",
                "allowfrom": []
            })))
            .mount(&server)
            .await;

        let client = AcmeDnsClient::new().unwrap();
        let account = client.register(&server.uri()).await.unwrap();
        assert_eq!(account.username, "u1");
        assert_eq!(account.full_domain, "abc.acme-dns.example");
    }

    #[tokio::test]
    async fn register_non_201_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = AcmeDnsClient::new().unwrap();
        assert!(client.register(&server.uri()).await.is_err());
    }

    #[tokio::test]
    async fn update_sends_basic_auth_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/update"))
            .and(basic_auth("u1", "p1"))
            .and(body_json(serde_json::json!({"subdomain": "abc", "txt": "proofvalue"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = AcmeDnsClient::new().unwrap();
        let account = AcmeDnsAccount {
            username: "u1".to_string(),
            password: "p1".to_string(),
            full_domain: "abc.acme-dns.example".to_string(),
            sub_domain: "abc".to_string(),
            allow_from: vec![],
        };
        client.update(&server.uri(), &account, "proofvalue").await.unwrap();
    }

    #[tokio::test]
    async fn update_401_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/update"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = AcmeDnsClient::new().unwrap();
        let account = AcmeDnsAccount {
            username: "u1".to_string(),
            password: "p1".to_string(),
            full_domain: "abc.acme-dns.example".to_string(),
            sub_domain: "abc".to_string(),
            allow_from: vec![],
        };
        let err = client.update(&server.uri(), &account, "proofvalue").await.unwrap_err();
        assert_eq!(err.kind, admgr_core::ErrorKind::Authentication);
    }
}
