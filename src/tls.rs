//! TLS client configuration and the certificate verify hook.
//!
//! Certificate verification runs through webpki against the bundled Mozilla
//! roots, then hands each certificate in the presented chain to an optional
//! caller hook together with the pre-verification result and the
//! certificate's subject name. The hook gets the final word; without one,
//! the pre-verification result stands.
//!
//! Two cargo features exist as deployment escape hatches, both off by
//! default: `force-accept-certs` forces the hook's preverified input to
//! true, and `disable-cert-verify` turns verification off entirely.

use std::sync::Arc;

use rustls::crypto::{ring::default_provider, CryptoProvider};
use rustls::{ClientConfig, RootCertStore};

use crate::error::LoadError;

/// Per-certificate verify hook.
///
/// Receives the pre-verification result and the certificate's subject name,
/// returns whether to accept. Invoked once per certificate in the chain.
pub type VerifyHook = Arc<dyn Fn(bool, &str) -> bool + Send + Sync>;

/// Installs the process-wide crypto provider for TLS operations.
///
/// Reinstalling is harmless, so the result is ignored.
pub fn init_crypto_provider() {
    let _ = CryptoProvider::install_default(default_provider());
}

#[cfg(not(feature = "disable-cert-verify"))]
fn root_store() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

/// Builds the client TLS configuration, wiring `hook` into certificate
/// verification.
///
/// # Errors
///
/// Returns [`LoadError::Failed`] if the verifier cannot be constructed.
#[cfg(not(feature = "disable-cert-verify"))]
pub fn client_config(hook: Option<VerifyHook>) -> Result<ClientConfig, LoadError> {
    let inner = rustls::client::WebPkiServerVerifier::builder(Arc::new(root_store()))
        .build()
        .map_err(|e| {
            log::error!("building certificate verifier: {e}");
            LoadError::Failed
        })?;

    Ok(ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier::HookVerifier { inner, hook }))
        .with_no_client_auth())
}

/// Builds the client TLS configuration with verification disabled.
#[cfg(feature = "disable-cert-verify")]
pub fn client_config(hook: Option<VerifyHook>) -> Result<ClientConfig, LoadError> {
    let _ = hook;
    Ok(ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier::NoVerification))
        .with_no_client_auth())
}

/// Subject name of a DER certificate, empty when unparseable.
#[cfg_attr(feature = "disable-cert-verify", allow(dead_code))]
pub(crate) fn subject_name(cert: &[u8]) -> String {
    x509_parser::parse_x509_certificate(cert)
        .map(|(_, parsed)| parsed.subject().to_string())
        .unwrap_or_default()
}

mod verifier {
    use std::sync::Arc;

    use rustls::client::danger::{
        HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
    };
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{CertificateError, DigitallySignedStruct, Error as TlsError, SignatureScheme};

    use super::{subject_name, VerifyHook};

    /// Webpki verification with the caller hook layered on top.
    #[cfg_attr(feature = "disable-cert-verify", allow(dead_code))]
    pub(super) struct HookVerifier {
        pub(super) inner: Arc<rustls::client::WebPkiServerVerifier>,
        pub(super) hook: Option<VerifyHook>,
    }

    impl std::fmt::Debug for HookVerifier {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("HookVerifier")
                .field("hook", &self.hook.is_some())
                .finish()
        }
    }

    impl ServerCertVerifier for HookVerifier {
        fn verify_server_cert(
            &self,
            end_entity: &CertificateDer<'_>,
            intermediates: &[CertificateDer<'_>],
            server_name: &ServerName<'_>,
            ocsp_response: &[u8],
            now: UnixTime,
        ) -> Result<ServerCertVerified, TlsError> {
            let verified = self.inner.verify_server_cert(
                end_entity,
                intermediates,
                server_name,
                ocsp_response,
                now,
            );

            #[allow(unused_mut)]
            let mut preverified = verified.is_ok();
            #[cfg(feature = "force-accept-certs")]
            {
                preverified = true;
            }

            let accepted = match &self.hook {
                Some(hook) => std::iter::once(end_entity)
                    .chain(intermediates.iter())
                    .all(|cert| hook(preverified, &subject_name(cert.as_ref()))),
                None => preverified,
            };

            if accepted {
                return Ok(ServerCertVerified::assertion());
            }
            Err(match verified {
                Err(err) => err,
                Ok(_) => TlsError::InvalidCertificate(
                    CertificateError::ApplicationVerificationFailure,
                ),
            })
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, TlsError> {
            self.inner.verify_tls12_signature(message, cert, dss)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, TlsError> {
            self.inner.verify_tls13_signature(message, cert, dss)
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.inner.supported_verify_schemes()
        }
    }

    /// Accepts everything. Only compiled with `disable-cert-verify`.
    #[cfg(feature = "disable-cert-verify")]
    #[derive(Debug)]
    pub(super) struct NoVerification;

    #[cfg(feature = "disable-cert-verify")]
    impl ServerCertVerifier for NoVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, TlsError> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, TlsError> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, TlsError> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            vec![
                SignatureScheme::RSA_PKCS1_SHA256,
                SignatureScheme::RSA_PKCS1_SHA384,
                SignatureScheme::RSA_PKCS1_SHA512,
                SignatureScheme::ECDSA_NISTP256_SHA256,
                SignatureScheme::ECDSA_NISTP384_SHA384,
                SignatureScheme::ECDSA_NISTP521_SHA512,
                SignatureScheme::RSA_PSS_SHA256,
                SignatureScheme::RSA_PSS_SHA384,
                SignatureScheme::RSA_PSS_SHA512,
                SignatureScheme::ED25519,
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builds_with_and_without_hook() {
        init_crypto_provider();
        assert!(client_config(None).is_ok());

        let hook: VerifyHook = Arc::new(|preverified, _subject| preverified);
        assert!(client_config(Some(hook)).is_ok());
    }

    #[test]
    fn garbage_certificate_has_empty_subject() {
        assert_eq!(subject_name(b"not a certificate"), "");
    }
}
