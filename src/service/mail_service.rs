use crate::config::environment::MailConfig;
use crate::module::term::model::{PartySnapshot, TermRecord};
use crate::service::document_service::{RenderedDocument, format_signed_at};
use crate::service::metrics_service;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub message_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub attachments: Vec<MailAttachment>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("mail relay request failed: {0}")]
    Request(String),

    #[error("mail relay rejected message {message_id} with status {status}")]
    Rejected { message_id: String, status: u16 },

    #[error("mail outbox lock poisoned")]
    Outbox,
}

#[derive(Debug, Clone)]
pub enum MailTransport {
    /// POSTs each message as JSON to an HTTP mail relay.
    Relay {
        client: Client,
        url: String,
        api_key: Option<String>,
    },
    /// Keeps messages in memory; used when no relay is configured.
    Outbox(Arc<Mutex<Vec<OutgoingMail>>>),
}

#[derive(Debug, Clone)]
pub struct Mailer {
    from_address: String,
    transport: MailTransport,
}

impl Mailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, String> {
        match &config.relay_url {
            Some(url) => Self::relay(
                &config.from_address,
                url,
                config.relay_api_key.clone(),
                config.timeout_seconds,
            ),
            None => Ok(Self::outbox(&config.from_address)),
        }
    }

    pub fn relay(
        from_address: &str,
        url: &str,
        api_key: Option<String>,
        timeout_seconds: u64,
    ) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| format!("failed to build mail relay client: {e}"))?;
        Ok(Self {
            from_address: from_address.to_string(),
            transport: MailTransport::Relay {
                client,
                url: url.to_string(),
                api_key,
            },
        })
    }

    pub fn outbox(from_address: &str) -> Self {
        Self {
            from_address: from_address.to_string(),
            transport: MailTransport::Outbox(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    pub fn transport_name(&self) -> &'static str {
        match self.transport {
            MailTransport::Relay { .. } => "relay",
            MailTransport::Outbox(_) => "outbox",
        }
    }

    /// Messages held by the outbox transport, oldest first. Empty for relays.
    pub fn outbox_messages(&self) -> Vec<OutgoingMail> {
        match &self.transport {
            MailTransport::Outbox(outbox) => outbox.lock().map(|m| m.clone()).unwrap_or_default(),
            MailTransport::Relay { .. } => Vec::new(),
        }
    }

    pub async fn deliver(&self, mail: OutgoingMail) -> Result<(), DeliveryError> {
        let result = match &self.transport {
            MailTransport::Relay {
                client,
                url,
                api_key,
            } => post_to_relay(client, url, api_key.as_deref(), &mail).await,
            MailTransport::Outbox(outbox) => {
                info!(
                    message_id = %mail.message_id,
                    to = %mail.to,
                    subject = %mail.subject,
                    "mail stored in outbox"
                );
                outbox
                    .lock()
                    .map(|mut m| m.push(mail.clone()))
                    .map_err(|_| DeliveryError::Outbox)
            }
        };
        match &result {
            Ok(()) => metrics_service::inc_mails_sent(),
            Err(err) => {
                metrics_service::inc_mails_failed();
                warn!(message_id = %mail.message_id, reason = %err, "mail delivery failed");
            }
        }
        result
    }

    /// Delivers every message, stopping at the first failure.
    pub async fn deliver_all(&self, mails: Vec<OutgoingMail>) -> Result<Vec<String>, DeliveryError> {
        let mut recipients = Vec::with_capacity(mails.len());
        for mail in mails {
            let to = mail.to.clone();
            self.deliver(mail).await?;
            recipients.push(to);
        }
        Ok(recipients)
    }
}

async fn post_to_relay(
    client: &Client,
    url: &str,
    api_key: Option<&str>,
    mail: &OutgoingMail,
) -> Result<(), DeliveryError> {
    let mut request = client.post(url).json(mail);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }
    let resp = request
        .send()
        .await
        .map_err(|e| DeliveryError::Request(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(DeliveryError::Rejected {
            message_id: mail.message_id.clone(),
            status: resp.status().as_u16(),
        });
    }
    Ok(())
}

/// One message per party. The donor reads the adopter's contact and the
/// adopter reads the donor's; both carry the rendered document.
pub fn compose_term_mails(from: &str, term: &TermRecord, document: &RenderedDocument) -> Vec<OutgoingMail> {
    let attachment = MailAttachment {
        filename: document.file_name.clone(),
        content_type: document.content_type.to_string(),
        content_base64: STANDARD.encode(document.content().as_bytes()),
    };
    let pet_name = term.pet.as_ref().map_or("o animal", |p| p.name.as_str());
    let subject = format!("{} n. {} - {}", term.kind.title(), term.id, pet_name);
    let signed = format_signed_at(term.signed_at);

    let mut mails = Vec::with_capacity(2);
    match &term.adopter {
        Some(adopter) => {
            let donor_text = format!(
                "Ola, {}.\n\n{} assinou o termo referente a {pet_name} em {signed}.\n\
                 Dados de contato do adotante:\n{}\n\
                 O termo completo segue em anexo.\nHash de integridade: {}\n",
                term.donor.name,
                adopter.name,
                contact_block(adopter),
                term.integrity_hash
            );
            mails.push(message(from, &term.donor.email, &subject, donor_text, &attachment));

            let adopter_text = format!(
                "Ola, {}.\n\nSua assinatura do termo referente a {pet_name} foi registrada em {signed}.\n\
                 Dados de contato do doador:\n{}\n\
                 O termo completo segue em anexo.\nHash de integridade: {}\n",
                adopter.name,
                contact_block(&term.donor),
                term.integrity_hash
            );
            mails.push(message(from, &adopter.email, &subject, adopter_text, &attachment));
        }
        None => {
            let donor_text = format!(
                "Ola, {}.\n\nSeu termo de doacao foi registrado em {signed}.\n\
                 O termo completo segue em anexo.\nHash de integridade: {}\n",
                term.donor.name, term.integrity_hash
            );
            mails.push(message(from, &term.donor.email, &subject, donor_text, &attachment));
        }
    }
    mails
}

pub fn compose_recovery_mail(from: &str, to: &str, name: &str, code: &str, ttl_minutes: i64) -> OutgoingMail {
    OutgoingMail {
        message_id: Uuid::new_v4().to_string(),
        from: from.to_string(),
        to: to.to_string(),
        subject: "Codigo de recuperacao de senha".to_string(),
        text: format!(
            "Ola, {name}.\n\nSeu codigo de recuperacao e: {code}\n\
             Ele expira em {ttl_minutes} minutos. Se voce nao pediu a recuperacao, ignore esta mensagem.\n"
        ),
        attachments: Vec::new(),
    }
}

fn contact_block(party: &PartySnapshot) -> String {
    let location = match (&party.city, &party.state) {
        (Some(city), Some(state)) => format!("{city} / {state}"),
        (Some(city), None) => city.clone(),
        (None, Some(state)) => state.clone(),
        (None, None) => "-".to_string(),
    };
    format!(
        "  Nome: {}\n  E-mail: {}\n  Telefone: {}\n  {}: {}\n  Localidade: {location}",
        party.name,
        party.email,
        party.phone,
        party.document_type.label(),
        party.document_number
    )
}

fn message(from: &str, to: &str, subject: &str, text: String, attachment: &MailAttachment) -> OutgoingMail {
    OutgoingMail {
        message_id: Uuid::new_v4().to_string(),
        from: from.to_string(),
        to: to.to_string(),
        subject: subject.to_string(),
        text,
        attachments: vec![attachment.clone()],
    }
}
