//! ACME driver: drives a single certificate request's order,
//! authorization, DNS-01 challenge, finalization and download.
//!
//! Grounded on `pingclair-tls/src/acme.rs`'s `AcmeClient::obtain_certificate`
//! state walk (account → order → authorizations → challenge → poll →
//! finalize → download), swapped from HTTP-01/`instant_acme` to
//! DNS-01/`hyperacme` and extended with an explicit Init/Renew split
//! (Pingclair has no renewal path at all — it always re-issues).

use std::time::Duration;

use admgr_core::{CancellationToken, Error, KeyType};
use admgr_dns::HickoryDnsVerifier;
use admgr_store::certificates::{CertMetadata, CertResource};
use admgr_store::CredentialStore;
use hyperacme::{create_p256_key, create_p384_key, create_rsa_key, Directory, DirectoryUrl};

use crate::acme_dns_client::AcmeDnsClient;
use crate::keystore::{AccountKeystore, AccountRegistration};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CHALLENGE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverAction {
    Init,
    Renew,
}

pub struct DriverRequest<'a> {
    pub name: &'a str,
    pub domains: &'a [String],
    pub key_type: KeyType,
}

pub struct AcmeDriverConfig<'a> {
    pub directory_url: &'a str,
    pub email: &'a str,
    pub acme_dns_server: &'a str,
    pub challenge_timeout: Duration,
    /// Recursive resolver override (`host` or `host:port`). When set, the
    /// DNS-01 proof is trusted as soon as it's published to acme-dns: we
    /// skip our own propagation wait since the operator has already told
    /// us this resolver sees the record. When unset, we poll the default
    /// recursive resolver for the TXT record before asking the ACME
    /// server to validate.
    pub dns_resolver: Option<&'a str>,
}

pub struct AcmeDriver<'a> {
    config: AcmeDriverConfig<'a>,
    keystore: AccountKeystore,
    store: &'a CredentialStore,
    dns_client: AcmeDnsClient,
}

impl<'a> AcmeDriver<'a> {
    pub fn new(config: AcmeDriverConfig<'a>, store: &'a CredentialStore) -> Result<Self, Error> {
        Ok(Self {
            keystore: AccountKeystore::new(store.root()),
            dns_client: AcmeDnsClient::new()?,
            config,
            store,
        })
    }

    /// Runs the full Init or Renew workflow for `request`, persisting the
    /// result via the cert store on success. Returns `Ok(())` both when a
    /// new certificate was written and when a renewal determined no
    /// rewrite was necessary.
    pub async fn execute(
        &self,
        action: DriverAction,
        request: &DriverRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        cancel.check("acme_driver_setup")?;

        if action == DriverAction::Renew {
            // Fatal misuse: caller should have chosen Init.
            if !self.store.certificates.exists(request.name).await {
                return Err(Error::certificate(
                    "acme_driver_execute",
                    format!("Renew requested for '{}' but no stored certificate exists", request.name),
                )
                .with_resource(request.name.to_string()));
            }
        }

        let loaded = self.keystore.load_or_create(self.config.directory_url, self.config.email).await?;

        let url = DirectoryUrl::Other(self.config.directory_url.to_string());
        let dir = Directory::from_url(url)
            .await
            .map_err(|e| Error::acme("acme_directory", format!("failed to load ACME directory: {e}")))?;

        let contact = vec![format!("mailto:{}", self.config.email)];
        let acc = match &loaded.registration {
            Some(reg) => dir
                .load_account(&reg.private_key_pem, contact.clone())
                .await
                .map_err(|e| Error::acme("acme_load_account", format!("{e}")))?,
            None => {
                let acc = dir
                    .register_account(contact.clone())
                    .await
                    .map_err(|e| Error::acme("acme_register_account", format!("{e}")))?;
                let private_key_pem = acc
                    .acme_private_key_pem()
                    .await
                    .map_err(|e| Error::acme("acme_register_account", format!("failed to export account key: {e}")))?;
                let registration = AccountRegistration { private_key_pem, contact: contact.clone() };
                if let Err(e) = self.keystore.save_registration(self.config.directory_url, &registration).await {
                    tracing::warn!(error = %e, "failed to persist ACME registration; will re-register next run");
                }
                acc
            }
        };

        cancel.check("acme_driver_order")?;

        let primary = &request.domains[0];
        let alt_names: Vec<String> = request.domains[1..].to_vec();
        let mut ord_new = acc
            .new_order(primary, &alt_names)
            .await
            .map_err(|e| Error::acme("acme_new_order", format!("{e}")).with_resource(request.name.to_string()))?;

        let ord_csr = loop {
            cancel.check("acme_driver_challenge_poll")?;

            if let Some(csr) = ord_new.confirm_validations().await {
                break csr;
            }

            let auths = ord_new
                .authorizations()
                .await
                .map_err(|e| Error::acme("acme_authorizations", format!("{e}")))?;

            for auth in &auths {
                let challenge = auth
                    .dns_challenge()
                    .await
                    .ok_or_else(|| Error::acme("acme_dns_challenge", "authorization has no DNS-01 challenge offered"))?;

                let proof = challenge
                    .dns_proof()
                    .await
                    .map_err(|e| Error::acme("acme_dns_challenge", format!("failed to compute proof: {e}")))?;

                let auth_domain = auth.domain_name();
                let account = self
                    .store
                    .accounts
                    .get(admgr_core::domain::base(auth_domain))
                    .await
                    .ok_or_else(|| {
                        Error::storage("acme_driver_execute", "no acme-dns account for this request's base domain")
                            .with_resource(auth_domain.to_string())
                    })?;

                cancel.check("acme_driver_publish_txt")?;
                self.dns_client.update(self.config.acme_dns_server, &account, &proof).await?;

                match self.config.dns_resolver {
                    Some(addr) => {
                        // Trust the operator-provided resolver: it's
                        // already been used to confirm CNAME delegation
                        // during provisioning, so we don't also poll it
                        // here before telling the ACME server to check.
                        let _ = addr;
                    }
                    None => {
                        let verifier = HickoryDnsVerifier::system()?;
                        verifier
                            .wait_for_txt_propagation(
                                &admgr_core::domain::challenge_name(auth_domain),
                                &proof,
                                self.config.challenge_timeout,
                            )
                            .await?;
                    }
                }

                challenge
                    .validate(Duration::from_millis(5000))
                    .await
                    .map_err(|e| Error::acme("acme_validate_challenge", format!("{e}")))?;
            }

            ord_new
                .refresh()
                .await
                .map_err(|e| Error::acme("acme_order_refresh", format!("{e}")))?;
        };

        cancel.check("acme_driver_finalize")?;

        let pkey = generate_cert_key(request.key_type)?;
        let ord_cert = ord_csr
            .finalize_pkey(pkey, self.config.challenge_timeout.min(DEFAULT_CHALLENGE_TIMEOUT))
            .await
            .map_err(|e| Error::acme("acme_finalize", format!("{e}")))?;

        let cert = ord_cert
            .download_cert()
            .await
            .map_err(|e| Error::acme("acme_download_cert", format!("{e}")))?;

        // `Certificate::certificate()` returns the leaf plus any
        // intermediates the CA bundled in one PEM blob; hyperacme doesn't
        // split the issuer chain out separately, so `issuer_pem` stays
        // unset here (the leaf file alone is already chain-complete).
        let resource = CertResource {
            cert_pem: cert.certificate().as_bytes().to_vec(),
            key_pem: cert.private_key().as_bytes().to_vec(),
            issuer_pem: None,
            metadata: CertMetadata {
                primary_domain: primary.clone(),
                domains: request.domains.to_vec(),
                issuer_url: Some(self.config.directory_url.to_string()),
                state: serde_json::json!({}),
            },
        };

        if action == DriverAction::Renew {
            if let Some(prior) = self.store.certificates.load_cert_pem(request.name).await {
                if prior == resource.cert_pem {
                    tracing::info!(name = request.name, "renewal returned identical certificate bytes, no change");
                    return Ok(());
                }
            }
        }

        self.store.certificates.save(request.name, &resource).await
    }
}

/// Maps the requested certificate key type to hyperacme's own key
/// generation helpers. The account key is generated separately and always
/// EC P-384 regardless of this mapping.
fn generate_cert_key(key_type: KeyType) -> Result<openssl::pkey::PKey<openssl::pkey::Private>, Error> {
    let result = match key_type {
        KeyType::Ec256 => create_p256_key(),
        KeyType::Ec384 => create_p384_key(),
        KeyType::Rsa2048 => create_rsa_key(2048),
        KeyType::Rsa3072 => create_rsa_key(3072),
        KeyType::Rsa4096 => create_rsa_key(4096),
    };
    result.map_err(|e| Error::certificate("generate_certificate_key", format!("{e}")))
}
