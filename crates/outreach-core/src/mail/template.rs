//! `{{variable}}` substitution and per-lead message composition.

use std::collections::BTreeMap;

use outreach_types::campaign::{Campaign, Step, Variant};
use outreach_types::lead::Lead;
use outreach_types::mail::{
    CAMPAIGN_HEADER, OutboundEmail, STEP_HEADER, VARIANT_HEADER, format_mailbox,
};

/// Replace every `{{ name }}` placeholder with its value from `vars`.
///
/// Whitespace inside the braces is ignored and unknown names render as the
/// empty string. An unterminated `{{` is left as-is.
///
/// ```
/// use std::collections::BTreeMap;
/// use outreach_core::mail::render_template;
///
/// let mut vars = BTreeMap::new();
/// vars.insert("firstName".to_string(), "Ada".to_string());
/// assert_eq!(render_template("Hi {{ firstName }}{{x}}!", &vars), "Hi Ada!");
/// ```
pub fn render_template(text: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        match after_open.find("}}") {
            Some(close) => {
                let key = after_open[..close].trim();
                if let Some(value) = vars.get(key) {
                    out.push_str(value);
                }
                rest = &after_open[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Which variant, if any, the lead at `lead_index` receives for `step`.
///
/// With A/B testing on, leads rotate through the main step and its variants
/// in turn: index 0 gets the main step, 1 the first variant, and so on.
pub fn choose_variant<'a>(campaign: &Campaign, step: &'a Step, lead_index: usize) -> Option<&'a Variant> {
    if !campaign.ab_testing_enabled() || step.variants.is_empty() {
        return None;
    }
    match lead_index % (step.variants.len() + 1) {
        0 => None,
        n => step.variants.get(n - 1),
    }
}

/// Build the message one lead receives for one step of a campaign.
pub fn compose_step_email(
    campaign: &Campaign,
    step: &Step,
    variant: Option<&Variant>,
    lead: &Lead,
) -> OutboundEmail {
    let vars = lead.template_variables();
    let (subject, content) = match variant {
        Some(v) => (v.subject.as_str(), v.content.as_str()),
        None => (step.subject.as_str(), step.content.as_str()),
    };

    let from = if campaign.sender.email.trim().is_empty() {
        None
    } else {
        Some(format_mailbox(&campaign.sender.name, &campaign.sender.email))
    };

    let mut headers = BTreeMap::new();
    headers.insert(CAMPAIGN_HEADER.to_string(), campaign.id.to_string());
    headers.insert(STEP_HEADER.to_string(), step.id.clone());

    let mut tags = vec![campaign.id.to_string(), format!("step-{}", step.id)];
    if let Some(v) = variant {
        headers.insert(VARIANT_HEADER.to_string(), v.id.clone());
        tags.push(format!("variant-{}", v.id));
    }

    OutboundEmail {
        to: lead.email.clone(),
        from,
        subject: render_template(subject, &vars),
        html: Some(render_template(content, &vars)),
        text: None,
        reply_to: campaign.reply_to.clone(),
        headers,
        tags,
        variables: vars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_campaign;
    use outreach_types::campaign::{AbTest, SenderProfile};

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_replaces_known_and_blanks_unknown() {
        let v = vars(&[("name", "Ada"), ("company", "Engines Ltd")]);
        assert_eq!(
            render_template("Hi {{name}} at {{ company }}, {{missing}}bye", &v),
            "Hi Ada at Engines Ltd, bye"
        );
    }

    #[test]
    fn test_render_leaves_unterminated_placeholder() {
        let v = vars(&[("name", "Ada")]);
        assert_eq!(render_template("Hi {{name}} {{oops", &v), "Hi Ada {{oops");
    }

    #[test]
    fn test_render_handles_multibyte_text() {
        let v = vars(&[("name", "Zoë")]);
        assert_eq!(render_template("¡Hola {{name}}! ☕", &v), "¡Hola Zoë! ☕");
    }

    #[test]
    fn test_compose_step_email_sets_headers_and_personalizes() {
        let mut campaign = sample_campaign(1);
        campaign.sender = SenderProfile {
            name: "Sam".to_string(),
            email: "sam@corp.io".to_string(),
        };
        campaign.reply_to = Some("replies@corp.io".to_string());
        let step = campaign.steps[0].clone();

        let mut lead = Lead::new("ada@example.com");
        lead.first_name = Some("Ada".to_string());

        let email = compose_step_email(&campaign, &step, None, &lead);
        assert_eq!(email.to, "ada@example.com");
        assert_eq!(email.from.as_deref(), Some("Sam <sam@corp.io>"));
        assert_eq!(email.reply_to.as_deref(), Some("replies@corp.io"));
        assert_eq!(email.subject, "Step 1 for Ada");
        assert_eq!(email.html.as_deref(), Some("Hello Ada"));
        assert_eq!(email.header(CAMPAIGN_HEADER), Some(campaign.id.to_string().as_str()));
        assert_eq!(email.header(STEP_HEADER), Some("1"));
        assert_eq!(email.header(VARIANT_HEADER), None);
        assert_eq!(email.tags.len(), 2);
    }

    #[test]
    fn test_compose_quotes_sender_name_with_comma() {
        let mut campaign = sample_campaign(1);
        campaign.sender = SenderProfile {
            name: "Sales, EU".to_string(),
            email: "sales@corp.io".to_string(),
        };
        let step = campaign.steps[0].clone();

        let email = compose_step_email(&campaign, &step, None, &Lead::new("x@y.io"));
        assert_eq!(email.from.as_deref(), Some(r#""Sales, EU" <sales@corp.io>"#));

        campaign.sender.name = String::new();
        let email = compose_step_email(&campaign, &step, None, &Lead::new("x@y.io"));
        assert_eq!(email.from.as_deref(), Some("sales@corp.io"));
    }

    #[test]
    fn test_compose_uses_variant_content() {
        let mut campaign = sample_campaign(1);
        let mut step = campaign.steps[0].clone();
        let variant = step.add_variant();
        variant.subject = "Other subject".to_string();
        let variant = variant.clone();
        campaign.steps[0] = step.clone();

        let email = compose_step_email(&campaign, &step, Some(&variant), &Lead::new("x@y.io"));
        assert_eq!(email.subject, "Other subject");
        assert_eq!(email.header(VARIANT_HEADER), Some("1"));
        assert!(email.tags.contains(&"variant-1".to_string()));
    }

    #[test]
    fn test_choose_variant_rotates_when_ab_enabled() {
        let mut campaign = sample_campaign(1);
        campaign.steps[0].add_variant();
        campaign.steps[0].add_variant();
        let step = campaign.steps[0].clone();

        // Disabled: always the main step.
        assert!(choose_variant(&campaign, &step, 1).is_none());

        campaign.ab_test = Some(AbTest {
            enabled: true,
            ..Default::default()
        });
        let picks: Vec<Option<&str>> = (0..6)
            .map(|i| choose_variant(&campaign, &step, i).map(|v| v.id.as_str()))
            .collect();
        assert_eq!(
            picks,
            vec![None, Some("1"), Some("2"), None, Some("1"), Some("2")]
        );
    }
}
