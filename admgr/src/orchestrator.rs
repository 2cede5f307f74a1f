//! Request Orchestrator: the top-level per-invocation fan-out over
//! certificate requests.
//!
//! Grounded on `pingclair-tls/src/auto_https.rs`'s `get_certificate`
//! orchestration (store-check → provision → execute), generalized from a
//! single domain to a sequential, ordered multi-request walk, and
//! extended with accumulate-across-requests `DnsSetupNeeded` behavior:
//! every request in the run is still examined even after one needs DNS
//! set up, so one invocation surfaces every missing CNAME at once
//! (see `DESIGN.md`).

use std::time::Duration;

use admgr_acme::{AcmeDriver, AcmeDriverConfig, DriverAction, DriverRequest, DnsSetupPlan, ProvisionOutcome, ProvisioningOrchestrator};
use admgr_config::Config;
use admgr_core::{CancellationToken, CertificateRequest, Error};
use admgr_decision::{decide, Action};
use admgr_dns::{DnsVerifier, HickoryDnsVerifier};
use admgr_store::CredentialStore;

/// Outcome of one full invocation across every request.
pub enum RunOutcome {
    /// Every request was skipped, issued or renewed successfully.
    AllDone,
    /// At least one request needs DNS delegated before it can proceed; the
    /// plan accumulates entries from every request examined in this run.
    /// This is a normal termination, not a failure.
    DnsSetupNeeded(DnsSetupPlan),
}

pub struct RequestOrchestrator<'a> {
    config: &'a Config,
    store: &'a CredentialStore,
    cancel: &'a CancellationToken,
}

impl<'a> RequestOrchestrator<'a> {
    pub fn new(config: &'a Config, store: &'a CredentialStore, cancel: &'a CancellationToken) -> Self {
        Self { config, store, cancel }
    }

    /// Runs every request in `requests`, in the order supplied. Returns
    /// the first terminal failure immediately without aggregating; prior
    /// successes in the same run are already persisted and are not
    /// rolled back.
    pub async fn run(&self, requests: &[CertificateRequest]) -> Result<RunOutcome, Error> {
        admgr_core::validate_unique_names(requests)?;

        let dns_verifier = self.build_dns_verifier()?;
        let mut accumulated_plan = DnsSetupPlan::new();

        for request in requests {
            self.cancel.check("request_orchestrator_loop")?;

            let stored_cert = self.store.certificates.load_cert_pem(&request.name).await;
            let grace = Duration::from_secs(u64::from(self.config.grace_days) * 86_400);
            let action = decide(stored_cert.as_deref(), &request.domains, chrono::Utc::now(), grace);

            let driver_action = match &action {
                Action::Skip => {
                    tracing::info!(name = %request.name, "certificate valid and complete, skipping");
                    continue;
                }
                Action::Init => {
                    tracing::info!(name = %request.name, "no stored certificate, issuing fresh");
                    DriverAction::Init
                }
                Action::Renew(reason) => {
                    tracing::info!(name = %request.name, reason = %reason, "renewal required");
                    DriverAction::Renew
                }
            };

            self.cancel.check("provisioning")?;
            let provisioning = ProvisioningOrchestrator::new(
                &self.config.acme_dns_server,
                &self.store.accounts,
                dns_verifier.as_ref(),
            )?;
            match provisioning.provision(&request.domains, self.cancel).await? {
                ProvisionOutcome::Ready => {}
                ProvisionOutcome::DnsSetupNeeded(plan) => {
                    tracing::warn!(
                        name = %request.name,
                        entries = plan.len(),
                        "DNS delegation missing for this certificate; accumulating instructions"
                    );
                    accumulated_plan.extend(plan);
                    continue;
                }
            }

            self.cancel.check("acme_execute")?;
            let driver_config = AcmeDriverConfig {
                directory_url: &self.config.acme_server,
                email: &self.config.email,
                acme_dns_server: &self.config.acme_dns_server,
                challenge_timeout: self.config.challenge_timeout,
                dns_resolver: self.config.dns_resolver.as_deref(),
            };
            let driver = AcmeDriver::new(driver_config, self.store)?;
            let driver_request = DriverRequest {
                name: &request.name,
                domains: &request.domains,
                key_type: request.key_type,
            };
            driver.execute(driver_action, &driver_request, self.cancel).await?;
            tracing::info!(name = %request.name, "certificate ready");
        }

        if accumulated_plan.is_empty() {
            Ok(RunOutcome::AllDone)
        } else {
            Ok(RunOutcome::DnsSetupNeeded(accumulated_plan))
        }
    }

    /// Builds the DNS verifier the whole run shares: a resolver override
    /// if configured, otherwise the platform's default recursive resolver.
    fn build_dns_verifier(&self) -> Result<Box<dyn DnsVerifier>, Error> {
        match &self.config.dns_resolver {
            Some(addr) => Ok(Box::new(HickoryDnsVerifier::with_resolver_override(addr)?)),
            None => Ok(Box::new(HickoryDnsVerifier::system()?)),
        }
    }
}
