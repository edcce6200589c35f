//! MailgunTransport -- [`MailTransport`] over the Mailgun HTTP API.
//!
//! Messages are posted to `/v3/{domain}/messages` with open and click
//! tracking on and the campaign, step and variant ids as tags. Campaign
//! messages name the stored template uploaded by `prepare_campaign` and
//! let Mailgun render it from `h:X-Mailgun-Variables`; one-off messages
//! carry their own body. Campaign stats are tallied from
//! `/v3/{domain}/events`, filtered by the campaign tag.
//!
//! The API key is wrapped in [`SecretString`] and only exposed as the
//! basic-auth password of each request.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use outreach_core::mail::MailTransport;
use outreach_types::campaign::{Campaign, CampaignId};
use outreach_types::config::MailConfig;
use outreach_types::error::MailError;
use outreach_types::mail::{
    CAMPAIGN_HEADER, DeliveryStats, OutboundEmail, STEP_HEADER, SendReceipt, VARIANT_HEADER,
};

/// Event pages fetched per stats refresh.
const MAX_EVENT_PAGES: usize = 20;

const TRACKED_EVENTS: &str = "delivered OR opened OR clicked OR failed OR unsubscribed";

pub struct MailgunTransport {
    client: reqwest::Client,
    api_key: SecretString,
    domain: String,
    base_url: String,
    default_from: Option<String>,
}

impl MailgunTransport {
    pub fn new(
        api_key: SecretString,
        domain: String,
        default_from: Option<String>,
    ) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MailError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            domain,
            base_url: "https://api.mailgun.net".to_string(),
            default_from,
        })
    }

    /// Transport from the `[mail]` section of the global config.
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let api_key = config
            .mailgun
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| MailError::NotConfigured("Mailgun API key is not set".to_string()))?;
        let domain = config
            .mailgun
            .domain
            .clone()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| MailError::NotConfigured("Mailgun domain is not set".to_string()))?;

        Ok(Self::new(SecretString::from(api_key), domain, config.from.clone())?
            .with_base_url(config.mailgun.base_url.clone()))
    }

    /// Override the API base URL (EU region, or a local stub in tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v3/{}{}", self.base_url, self.domain, path)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .basic_auth("api", Some(self.api_key.expose_secret()))
    }

    fn message_form(&self, email: &OutboundEmail) -> Result<Vec<(String, String)>, MailError> {
        let from = email
            .from
            .clone()
            .or_else(|| self.default_from.clone())
            .ok_or_else(|| MailError::NotConfigured("no sender address configured".to_string()))?;

        let mut form = vec![
            ("from".to_string(), from),
            ("to".to_string(), email.to.clone()),
            ("subject".to_string(), email.subject.clone()),
            ("o:tracking".to_string(), "yes".to_string()),
            ("o:tracking-clicks".to_string(), "yes".to_string()),
            ("o:tracking-opens".to_string(), "yes".to_string()),
        ];
        match stored_template(email) {
            Some(template) => form.push(("template".to_string(), template)),
            None => {
                if let Some(html) = &email.html {
                    form.push(("html".to_string(), html.clone()));
                }
                if let Some(text) = &email.text {
                    form.push(("text".to_string(), text.clone()));
                }
            }
        }
        if let Some(reply_to) = &email.reply_to {
            form.push(("h:Reply-To".to_string(), reply_to.clone()));
        }
        for (name, value) in &email.headers {
            form.push((format!("h:{name}"), value.clone()));
        }
        for tag in &email.tags {
            form.push(("o:tag".to_string(), tag.clone()));
        }
        if !email.variables.is_empty() {
            let vars = serde_json::to_string(&email.variables)
                .map_err(|e| MailError::Message(e.to_string()))?;
            form.push(("h:X-Mailgun-Variables".to_string(), vars));
        }
        Ok(form)
    }

    /// Create a stored template, or add a new active version if one with
    /// this name already exists.
    pub async fn upsert_template(&self, name: &str, html: &str) -> Result<(), MailError> {
        let description = format!("Template for campaign: {name}");
        let response = self
            .post(&self.url("/templates"))
            .form(&[
                ("name", name),
                ("template", html),
                ("description", description.as_str()),
            ])
            .send()
            .await
            .map_err(transport_err)?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            tracing::debug!(template = name, "template exists, adding a version");
            let tag = format!("v{}", chrono::Utc::now().timestamp_millis());
            let response = self
                .post(&self.url(&format!("/templates/{name}/versions")))
                .form(&[("template", html), ("tag", tag.as_str()), ("active", "yes")])
                .send()
                .await
                .map_err(transport_err)?;
            return check(response).await.map(|_| ());
        }

        check(response).await.map(|_| ())
    }
}

fn transport_err(e: reqwest::Error) -> MailError {
    MailError::Transport(format!("HTTP request failed: {e}"))
}

/// Turn a non-2xx response into `MailError::Provider`.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, MailError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MailError::Provider {
        status: status.as_u16(),
        body,
    })
}

/// Template name for a step, or for one of its variants.
pub fn template_name(
    campaign_id: impl std::fmt::Display,
    step_id: &str,
    variant_id: Option<&str>,
) -> String {
    match variant_id {
        Some(variant) => format!("{campaign_id}_{step_id}_{variant}"),
        None => format!("{campaign_id}_{step_id}"),
    }
}

/// The stored template a campaign message was composed from, if any.
fn stored_template(email: &OutboundEmail) -> Option<String> {
    let campaign_id = email.header(CAMPAIGN_HEADER)?;
    let step_id = email.header(STEP_HEADER)?;
    Some(template_name(campaign_id, step_id, email.header(VARIANT_HEADER)))
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct EventPage {
    #[serde(default)]
    items: Vec<EventItem>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    event: String,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<String>,
}

fn tally(stats: &mut DeliveryStats, events: &[EventItem]) {
    for item in events {
        match item.event.as_str() {
            "delivered" => stats.delivered += 1,
            "opened" => stats.opened += 1,
            "clicked" => stats.clicked += 1,
            "failed" => stats.bounced += 1,
            "unsubscribed" => stats.unsubscribed += 1,
            _ => {}
        }
    }
}

impl MailTransport for MailgunTransport {
    fn name(&self) -> &str {
        "mailgun"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, MailError> {
        let form = self.message_form(email)?;
        let response = self
            .post(&self.url("/messages"))
            .form(&form)
            .send()
            .await
            .map_err(transport_err)?;
        let response = check(response).await?;

        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| MailError::Transport(format!("failed to parse response: {e}")))?;

        tracing::debug!(to = %email.to, message_id = %body.id, "Mailgun accepted message");
        Ok(SendReceipt {
            message_id: body.id,
            transport: "mailgun".to_string(),
        })
    }

    async fn prepare_campaign(&self, campaign: &Campaign) -> Result<(), MailError> {
        for step in &campaign.steps {
            self.upsert_template(&template_name(&campaign.id, &step.id, None), &step.content)
                .await?;
            for variant in &step.variants {
                self.upsert_template(
                    &template_name(&campaign.id, &step.id, Some(&variant.id)),
                    &variant.content,
                )
                .await?;
            }
        }
        tracing::info!(campaign_id = %campaign.id, steps = campaign.steps.len(), "Mailgun templates ready");
        Ok(())
    }

    async fn campaign_stats(&self, campaign_id: &CampaignId) -> Result<DeliveryStats, MailError> {
        let tag = campaign_id.to_string();
        let mut stats = DeliveryStats::default();
        let mut next = Some(self.url("/events"));
        let mut first = true;

        for _ in 0..MAX_EVENT_PAGES {
            let Some(url) = next.take() else { break };
            let mut request = self
                .client
                .get(&url)
                .basic_auth("api", Some(self.api_key.expose_secret()));
            if first {
                request = request.query(&[
                    ("event", TRACKED_EVENTS),
                    ("tags", tag.as_str()),
                    ("limit", "300"),
                ]);
                first = false;
            }

            let response = request.send().await.map_err(transport_err)?;
            let page: EventPage = check(response)
                .await?
                .json()
                .await
                .map_err(|e| MailError::Transport(format!("failed to parse events: {e}")))?;

            if page.items.is_empty() {
                break;
            }
            tally(&mut stats, &page.items);
            next = page.paging.and_then(|p| p.next);
        }

        Ok(stats)
    }

    async fn verify(&self) -> Result<(), MailError> {
        let response = self
            .client
            .get(format!("{}/v3/domains/{}", self.base_url, self.domain))
            .basic_auth("api", Some(self.api_key.expose_secret()))
            .send()
            .await
            .map_err(transport_err)?;
        check(response).await.map(|_| ())
    }

    async fn unsubscribe(&self, address: &str) -> Result<(), MailError> {
        let response = self
            .post(&self.url("/unsubscribes"))
            .form(&[("address", address)])
            .send()
            .await
            .map_err(transport_err)?;
        check(response).await?;
        tracing::info!(address, "address unsubscribed");
        Ok(())
    }

    async fn resubscribe(&self, address: &str) -> Result<(), MailError> {
        let response = self
            .client
            .delete(self.url(&format!("/unsubscribes/{address}")))
            .basic_auth("api", Some(self.api_key.expose_secret()))
            .send()
            .await
            .map_err(transport_err)?;
        check(response).await?;
        tracing::info!(address, "address resubscribed");
        Ok(())
    }
}
