//! Bot profile: keyword sets and reply templates.
//!
//! Every field carries a serde default so a profile file only needs the keys
//! it overrides. Keyword entries are matched as case-insensitive substrings
//! of the normalized message text.

use std::fs;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BotProfile {
    #[serde(default = "default_pricing_keywords")]
    pub pricing_keywords: Vec<String>,
    #[serde(default = "default_demo_keywords")]
    pub demo_keywords: Vec<String>,
    #[serde(default = "default_support_keywords")]
    pub support_keywords: Vec<String>,

    /// Service menu sent for pricing questions.
    #[serde(default = "default_packages_message")]
    pub packages_message: String,
    /// Lead capture prompt that follows the menu and the demo acknowledgement.
    #[serde(default = "default_lead_questions")]
    pub lead_questions: String,
    #[serde(default = "default_demo_ack")]
    pub demo_ack: String,
    #[serde(default = "default_support_ack")]
    pub support_ack: String,
    /// Reply for media, reactions and other messages without a text body.
    #[serde(default = "default_non_text_prompt")]
    pub non_text_prompt: String,
    /// Call to action appended after model answers to short messages.
    #[serde(default = "default_cta")]
    pub cta: String,
    /// Sent in place of a model answer when the completion API rejects the call.
    #[serde(default = "default_ai_unavailable")]
    pub ai_unavailable: String,
    #[serde(default = "default_empty_completion")]
    pub empty_completion: String,
    /// Normalized messages shorter than this many characters get the CTA.
    #[serde(default = "default_cta_max_chars")]
    pub cta_max_chars: usize,
}

impl BotProfile {
    /// Load a profile from a JSON file. Missing keys fall back to defaults.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read BRIDGE_PROFILE '{}': file unreadable", path))?;
        serde_json::from_str::<BotProfile>(&content).with_context(|| {
            format!(
                "Failed to parse BRIDGE_PROFILE '{}': invalid JSON profile",
                path
            )
        })
    }
}

impl Default for BotProfile {
    fn default() -> Self {
        Self {
            pricing_keywords: default_pricing_keywords(),
            demo_keywords: default_demo_keywords(),
            support_keywords: default_support_keywords(),
            packages_message: default_packages_message(),
            lead_questions: default_lead_questions(),
            demo_ack: default_demo_ack(),
            support_ack: default_support_ack(),
            non_text_prompt: default_non_text_prompt(),
            cta: default_cta(),
            ai_unavailable: default_ai_unavailable(),
            empty_completion: default_empty_completion(),
            cta_max_chars: default_cta_max_chars(),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| (*w).to_owned()).collect()
}

fn default_pricing_keywords() -> Vec<String> {
    words(&[
        "price", "pricing", "package", "plans", "services", "service", "menu",
    ])
}

fn default_demo_keywords() -> Vec<String> {
    words(&["demo", "call", "meeting", "book"])
}

fn default_support_keywords() -> Vec<String> {
    words(&["support", "help", "issue", "problem"])
}

fn default_packages_message() -> String {
    "✅ *BuildByAlistar Services*
1) *WhatsApp AI Chatbot*
   - FAQ + Lead capture + Human handover
   - Setup: ₹9,999 (or $199)
   - Monthly: ₹2,999 (or $49)

2) *Website + Automation*
   - Landing page + forms + CRM + follow-ups
   - Setup: ₹14,999 (or $299)
   - Monthly: ₹3,999 (or $69)

3) *Custom Automation*
   - Any workflow (Sheets/CRM, reminders, bookings, integrations)
   - Quote after requirements

👉 Type:
*demo* = book a call
*pricing* = packages
*support* = help"
        .to_owned()
}

fn default_lead_questions() -> String {
    "Quick 3 questions so I can guide you perfectly:
1) Your name?
2) Your business type?
3) What do you want to automate? (leads / support / booking / ecommerce)"
        .to_owned()
}

fn default_demo_ack() -> String {
    "Awesome ✅ Send your preferred day/time + your city, and I’ll schedule a demo call.".to_owned()
}

fn default_support_ack() -> String {
    "Sure ✅ Tell me what you need help with (WhatsApp bot / website / automation) and what problem you’re facing.".to_owned()
}

fn default_non_text_prompt() -> String {
    "Send me a text message 🙂 I’ll help you.".to_owned()
}

fn default_cta() -> String {
    "Type *pricing* to see packages or *demo* to book a call.".to_owned()
}

fn default_ai_unavailable() -> String {
    "Sorry—AI is having an issue right now. Please try again in a minute.".to_owned()
}

fn default_empty_completion() -> String {
    "Sorry, I couldn't generate a reply.".to_owned()
}

fn default_cta_max_chars() -> usize {
    40
}
