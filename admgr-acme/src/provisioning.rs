//! Provisioning orchestrator: the two-pass pre-flight that
//! ensures every requested domain's acme-dns account exists and its
//! `_acme-challenge` CNAME is already delegated.
//!
//! Grounded on `houseme-acmex`'s `src/orchestrator/provisioner.rs`
//! (`Orchestrator` trait, `execute(&self, config) -> Result<()>` shape),
//! generalized from its single-domain flow into the account-then-CNAME
//! two-pass walk this spec requires.

use std::collections::BTreeMap;

use admgr_core::domain::{base, challenge_name};
use admgr_core::{CancellationToken, Error};
use admgr_dns::{DnsVerifier, VerifyOutcome};
use admgr_store::AccountStore;

use crate::acme_dns_client::AcmeDnsClient;

/// Map of `challenge_name -> target_delegation`, sorted by key for stable
/// presentation. Multiple requested domains sharing a base domain
/// collapse to a single entry.
pub type DnsSetupPlan = BTreeMap<String, String>;

/// Pre-flight outcome: either every domain is ready for ordering, or the
/// operator must act on the returned plan and re-run.
pub enum ProvisionOutcome {
    Ready,
    DnsSetupNeeded(DnsSetupPlan),
}

pub struct ProvisioningOrchestrator<'a> {
    acme_dns_server: &'a str,
    accounts: &'a AccountStore,
    dns: &'a dyn DnsVerifier,
    client: AcmeDnsClient,
}

impl<'a> ProvisioningOrchestrator<'a> {
    pub fn new(acme_dns_server: &'a str, accounts: &'a AccountStore, dns: &'a dyn DnsVerifier) -> Result<Self, Error> {
        Ok(Self {
            acme_dns_server,
            accounts,
            dns,
            client: AcmeDnsClient::new()?,
        })
    }

    /// Runs both passes for `domains` (the full, deduplicated domain set
    /// across every certificate request in this invocation).
    pub async fn provision(
        &self,
        domains: &[String],
        cancel: &CancellationToken,
    ) -> Result<ProvisionOutcome, Error> {
        let mut plan = DnsSetupPlan::new();

        // Pass 1 — account provisioning.
        for d in domains {
            cancel.check("provisioning_pass1")?;
            let b = base(d);
            if self.accounts.get(b).await.is_some() {
                continue;
            }

            let account = self.client.register(self.acme_dns_server).await?;
            self.accounts.set(d, account.clone()).await;
            self.accounts.save().await?;

            plan.insert(challenge_name(d), account.full_domain.clone());
        }

        // Pass 2 — CNAME verification.
        for d in domains {
            cancel.check("provisioning_pass2")?;
            let b = base(d);
            let Some(account) = self.accounts.get(b).await else {
                // Pass 1 guarantees this is populated; a miss here means
                // an inconsistent store, not a normal condition.
                return Err(Error::storage(
                    "provisioning_pass2",
                    format!("no acme-dns account found for base domain '{b}' after provisioning"),
                )
                .with_resource(d.clone()));
            };

            let name = challenge_name(d);
            let expected = account.full_domain.trim_end_matches('.');
            match self.dns.verify(&name, expected).await? {
                VerifyOutcome::Match => {}
                VerifyOutcome::Mismatch(_) | VerifyOutcome::Missing => {
                    plan.insert(name, expected.to_string());
                }
            }
        }

        if plan.is_empty() {
            Ok(ProvisionOutcome::Ready)
        } else {
            Ok(ProvisionOutcome::DnsSetupNeeded(plan))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use admgr_dns::MockDnsVerifier;

    #[tokio::test]
    async fn fresh_domain_with_no_cname_yields_plan() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = AccountStore::load(dir.path()).await.unwrap();
        let dns = MockDnsVerifier::new();
        let cancel = CancellationToken::new();

        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/register"))
            .respond_with(wiremock::ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "username": "u1", "password": "p1", "fulldomain": "abc.acme-dns.example",
                "subdomain": "abc", "allowfrom": []
            })))
            .mount(&server)
            .await;

        let orchestrator = ProvisioningOrchestrator::new(&server.uri(), &accounts, &dns).unwrap();
        let outcome = orchestrator
            .provision(&["example.com".to_string()], &cancel)
            .await
            .unwrap();

        match outcome {
            ProvisionOutcome::DnsSetupNeeded(plan) => {
                assert_eq!(plan.get("_acme-challenge.example.com"), Some(&"abc.acme-dns.example".to_string()));
            }
            ProvisionOutcome::Ready => panic!("expected DnsSetupNeeded"),
        }
    }

    #[tokio::test]
    async fn domain_with_matching_cname_and_existing_account_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = AccountStore::load(dir.path()).await.unwrap();
        accounts
            .set(
                "example.com",
                admgr_core::AcmeDnsAccount {
                    username: "u1".to_string(),
                    password: "p1".to_string(),
                    full_domain: "abc.acme-dns.example".to_string(),
                    sub_domain: "abc".to_string(),
                    allow_from: vec![],
                },
            )
            .await;

        let dns = MockDnsVerifier::new().with("_acme-challenge.example.com", "abc.acme-dns.example");
        let cancel = CancellationToken::new();

        let orchestrator = ProvisioningOrchestrator::new("https://unused.example", &accounts, &dns).unwrap();
        let outcome = orchestrator
            .provision(&["example.com".to_string()], &cancel)
            .await
            .unwrap();

        assert!(matches!(outcome, ProvisionOutcome::Ready));
    }

    #[tokio::test]
    async fn wildcard_and_apex_share_one_account_and_one_plan_entry() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = AccountStore::load(dir.path()).await.unwrap();
        let dns = MockDnsVerifier::new();
        let cancel = CancellationToken::new();

        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/register"))
            .respond_with(wiremock::ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "username": "u1", "password": "p1", "fulldomain": "abc.acme-dns.example",
                "subdomain": "abc", "allowfrom": []
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let orchestrator = ProvisioningOrchestrator::new(&server.uri(), &accounts, &dns).unwrap();
        let outcome = orchestrator
            .provision(&["example.com".to_string(), "*.example.com".to_string()], &cancel)
            .await
            .unwrap();

        match outcome {
            ProvisionOutcome::DnsSetupNeeded(plan) => assert_eq!(plan.len(), 1),
            ProvisionOutcome::Ready => panic!("expected DnsSetupNeeded"),
        }
    }
}
