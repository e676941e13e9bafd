//! Broker connection string.
//!
//! Grammar: `[user[:password]@]host[,host...][?tls=1]`. The password is
//! form-decoded (`+` is a space, `%XX` an escaped byte) so it can carry
//! reserved characters.

use std::fmt;

use percent_encoding::percent_decode_str;

use crate::BrokerError;

/// SASL PLAIN credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct SaslCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SaslCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to reach the broker cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerConfig {
    pub bootstrap_servers: Vec<String>,
    pub sasl: Option<SaslCredentials>,
    pub tls: bool,
}

impl BrokerConfig {
    /// Parse a broker connection string.
    pub fn parse(url: &str) -> Result<Self, BrokerError> {
        let (credentials, resource) = match url.rsplit_once('@') {
            Some((credentials, resource)) => (Some(credentials), resource),
            None => (None, url),
        };

        let sasl = credentials.map(|credentials| match credentials.split_once(':') {
            Some((username, password)) => SaslCredentials {
                username: username.to_string(),
                password: form_decode(password),
            },
            None => SaslCredentials {
                username: credentials.to_string(),
                password: String::new(),
            },
        });

        let (hosts, query) = match resource.split_once('?') {
            Some((hosts, query)) => (hosts, Some(query)),
            None => (resource, None),
        };

        let bootstrap_servers: Vec<String> = hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .collect();
        if bootstrap_servers.is_empty() {
            return Err(BrokerError::InvalidUrl(format!("no broker hosts in {resource:?}")));
        }

        let tls = query
            .map(|q| {
                q.split('&')
                    .any(|pair| matches!(pair, "tls=1" | "tls=true"))
            })
            .unwrap_or(false);

        Ok(Self {
            bootstrap_servers,
            sasl,
            tls,
        })
    }
}

fn form_decode(s: &str) -> String {
    percent_decode_str(&s.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_list() {
        let cfg = BrokerConfig::parse("b-1:9092,b-2:9092").unwrap();
        assert_eq!(cfg.bootstrap_servers, vec!["b-1:9092", "b-2:9092"]);
        assert_eq!(cfg.sasl, None);
        assert!(!cfg.tls);
    }

    #[test]
    fn credentials_and_tls() {
        let cfg = BrokerConfig::parse("alice:s3cr%2Ft+pw@b-1:9096,b-2:9096?tls=1").unwrap();
        assert_eq!(
            cfg.sasl,
            Some(SaslCredentials {
                username: "alice".into(),
                password: "s3cr/t pw".into(),
            })
        );
        assert_eq!(cfg.bootstrap_servers.len(), 2);
        assert!(cfg.tls);
    }

    #[test]
    fn username_without_password() {
        let cfg = BrokerConfig::parse("svc@b-1:9092").unwrap();
        let sasl = cfg.sasl.unwrap();
        assert_eq!(sasl.username, "svc");
        assert_eq!(sasl.password, "");
    }

    #[test]
    fn tls_without_credentials() {
        let cfg = BrokerConfig::parse("b-1:9094?tls=1").unwrap();
        assert!(cfg.tls);
        assert!(cfg.sasl.is_none());
    }

    #[test]
    fn other_query_values_do_not_enable_tls() {
        assert!(!BrokerConfig::parse("b-1:9092?tls=0").unwrap().tls);
    }

    #[test]
    fn empty_host_list_is_rejected() {
        assert!(matches!(
            BrokerConfig::parse("user:pw@?tls=1"),
            Err(BrokerError::InvalidUrl(_))
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = BrokerConfig::parse("alice:hunter2@b-1:9092").unwrap();
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }
}
