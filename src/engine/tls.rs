//! BoringSSL client configuration for the bundled engine.

use super::HttpVersionPref;
use crate::base::neterror::NetError;
use boring::ssl::{SslConnector, SslConnectorBuilder, SslMethod, SslVerifyMode, SslVersion};

/// TLS settings derived from an engine configuration.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub min_version: Option<SslVersion>,
    pub max_version: Option<SslVersion>,
    pub alpn_protos: Vec<String>,
    /// Skip certificate and hostname verification.
    pub insecure: bool,
    /// Trust roots loaded from this PEM file.
    pub ca_file: Option<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self::for_engine(HttpVersionPref::Auto, false)
    }
}

impl TlsConfig {
    /// ALPN list follows the version preference; HTTP/3 has no transport
    /// here, so it offers h2 like `Auto`.
    pub fn for_engine(http_version: HttpVersionPref, ignore_tls_errors: bool) -> Self {
        let alpn_protos = match http_version {
            HttpVersionPref::Http1 => vec!["http/1.1".to_string()],
            HttpVersionPref::Http2 => vec!["h2".to_string()],
            HttpVersionPref::Auto | HttpVersionPref::Http3 => {
                vec!["h2".to_string(), "http/1.1".to_string()]
            }
        };

        Self {
            min_version: Some(SslVersion::TLS1_2),
            max_version: Some(SslVersion::TLS1_3),
            alpn_protos,
            insecure: ignore_tls_errors,
            ca_file: None,
        }
    }

    /// ALPN protocols in wire format (length-prefixed).
    pub fn alpn_wire(&self) -> Result<Vec<u8>, NetError> {
        let mut alpn_wire = Vec::new();
        for proto in &self.alpn_protos {
            if proto.len() > 255 {
                return Err(NetError::SslProtocolError);
            }
            alpn_wire.push(proto.len() as u8);
            alpn_wire.extend_from_slice(proto.as_bytes());
        }
        Ok(alpn_wire)
    }

    /// Apply this configuration to an SSL connector builder.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), NetError> {
        if let Some(min) = self.min_version {
            builder
                .set_min_proto_version(Some(min))
                .map_err(|_| NetError::SslProtocolError)?;
        }
        if let Some(max) = self.max_version {
            builder
                .set_max_proto_version(Some(max))
                .map_err(|_| NetError::SslProtocolError)?;
        }

        if !self.alpn_protos.is_empty() {
            builder
                .set_alpn_protos(&self.alpn_wire()?)
                .map_err(|_| NetError::SslProtocolError)?;
        }

        if let Some(path) = &self.ca_file {
            builder.set_ca_file(path).map_err(|e| {
                tracing::debug!(path = %path, error = %e, "failed to load CA bundle");
                NetError::SslProtocolError
            })?;
        }

        if self.insecure {
            builder.set_verify(SslVerifyMode::NONE);
        } else {
            builder.set_verify(SslVerifyMode::PEER);
        }

        Ok(())
    }

    pub fn build_connector(&self) -> Result<SslConnector, NetError> {
        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| NetError::SslProtocolError)?;
        self.apply_to_builder(&mut builder)?;
        Ok(builder.build())
    }

    /// Check if SNI should be set for this host.
    /// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
    pub fn should_set_sni(host: &str) -> bool {
        host.trim_matches(|c| c == '[' || c == ']')
            .parse::<std::net::IpAddr>()
            .is_err()
    }
}
