use crate::transports::TlsConfig;
use crate::{FileTransport, Mailer, MailerError, SmtpTransport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub transport: TransportConfig,
    pub from_address: String,
    pub from_name: Option<String>,
    pub app_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Smtp {
        host: String,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        tls: Option<TlsType>,
    },
    File {
        output_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsType {
    None,
    StartTls,
    Tls,
}

impl From<TlsType> for TlsConfig {
    fn from(tls_type: TlsType) -> Self {
        match tls_type {
            TlsType::None => TlsConfig::None,
            TlsType::StartTls => TlsConfig::StartTls,
            TlsType::Tls => TlsConfig::Tls,
        }
    }
}

impl MailerConfig {
    /// Read the `MAILER_*` environment variables.
    ///
    /// SMTP is selected when `MAILER_SMTP_HOST` is set, otherwise messages are
    /// written to `MAILER_FILE_OUTPUT_DIR` (default `./emails`).
    pub fn from_env() -> Result<Self, MailerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, MailerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = if let Some(host) = lookup("MAILER_SMTP_HOST") {
            let port = match lookup("MAILER_SMTP_PORT") {
                Some(port) => Some(port.parse::<u16>().map_err(|_| {
                    MailerError::Config(format!("MAILER_SMTP_PORT is not a valid port: {port}"))
                })?),
                None => None,
            };

            let tls = match lookup("MAILER_SMTP_TLS") {
                Some(tls) => Some(match tls.to_lowercase().as_str() {
                    "none" => TlsType::None,
                    "starttls" => TlsType::StartTls,
                    "tls" => TlsType::Tls,
                    other => {
                        return Err(MailerError::Config(format!(
                            "MAILER_SMTP_TLS must be none, starttls or tls, got {other}"
                        )));
                    }
                }),
                None => None,
            };

            TransportConfig::Smtp {
                host,
                port,
                username: lookup("MAILER_SMTP_USERNAME"),
                password: lookup("MAILER_SMTP_PASSWORD"),
                tls,
            }
        } else {
            TransportConfig::File {
                output_dir: lookup("MAILER_FILE_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./emails")),
            }
        };

        let defaults = Self::default();

        Ok(Self {
            transport,
            from_address: lookup("MAILER_FROM_ADDRESS").unwrap_or(defaults.from_address),
            from_name: lookup("MAILER_FROM_NAME"),
            app_name: lookup("MAILER_APP_NAME").unwrap_or(defaults.app_name),
        })
    }

    pub fn build_transport(&self) -> Result<Box<dyn Mailer>, MailerError> {
        match &self.transport {
            TransportConfig::Smtp {
                host,
                port,
                username,
                password,
                tls,
            } => {
                let mut builder = SmtpTransport::builder(host);

                if let Some(port) = port {
                    builder = builder.port(*port);
                }

                if let (Some(username), Some(password)) = (username, password) {
                    builder = builder.credentials(username, password);
                }

                if let Some(tls) = tls {
                    builder = builder.tls((*tls).into());
                }

                Ok(Box::new(builder.build()?))
            }
            TransportConfig::File { output_dir } => Ok(Box::new(FileTransport::new(output_dir)?)),
        }
    }

    pub fn get_from_address(&self) -> String {
        if let Some(name) = &self.from_name {
            format!("{} <{}>", name, self.from_address)
        } else {
            self.from_address.clone()
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::File {
                output_dir: PathBuf::from("./emails"),
            },
            from_address: "noreply@kestrel.dev".to_string(),
            from_name: None,
            app_name: "Kestrel".to_string(),
        }
    }
}
