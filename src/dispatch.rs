//! Reply routing for inbound messages.
//!
//! `Dispatcher::route` is a pure decision over the message text;
//! `Dispatcher::dispatch` carries it out against the outbound clients.
//! Sends are strictly sequential so the user sees replies in order.

use std::sync::Arc;

use crate::error::BridgeError;
use crate::intent::{normalize, Intent, IntentMatcher};
use crate::outbound::{CompletionClient, MessageSender};
use crate::profile::BotProfile;
use crate::webhook::InboundMessage;

/// What to do with one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// The message had no text body.
    NonText { reply: String },
    /// Keyword intent answered from templates.
    Canned { intent: Intent, replies: Vec<String> },
    /// Ask the model with the original text, optionally followed by a CTA.
    Model { prompt: String, cta: Option<String> },
}

impl Route {
    /// Label used in metrics and telemetry.
    pub fn label(&self) -> &'static str {
        match self {
            Route::NonText { .. } => "non_text",
            Route::Canned { intent, .. } => intent.as_str(),
            Route::Model { .. } => Intent::General.as_str(),
        }
    }

    pub fn intent(&self) -> Option<Intent> {
        match self {
            Route::NonText { .. } => None,
            Route::Canned { intent, .. } => Some(*intent),
            Route::Model { .. } => Some(Intent::General),
        }
    }
}

#[derive(Debug)]
pub struct DispatchReport {
    pub route: &'static str,
    pub intent: Option<Intent>,
    pub replies_sent: usize,
    /// Sends the Graph API answered with a non-2xx status.
    pub delivery_failures: usize,
    pub model_used: bool,
    pub model_failed: bool,
    /// Set when dispatch stopped early; remaining replies were not sent.
    pub error: Option<BridgeError>,
}

impl DispatchReport {
    fn new(route: &Route) -> Self {
        Self {
            route: route.label(),
            intent: route.intent(),
            replies_sent: 0,
            delivery_failures: 0,
            model_used: false,
            model_failed: false,
            error: None,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match (&self.error, self.delivery_failures) {
            (Some(_), _) => "error",
            (None, 0) => "ok",
            (None, _) => "partial",
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    profile: Arc<BotProfile>,
    matcher: Arc<IntentMatcher>,
    sender: Arc<dyn MessageSender>,
    model: Arc<dyn CompletionClient>,
}

impl Dispatcher {
    pub fn new(
        profile: BotProfile,
        sender: Arc<dyn MessageSender>,
        model: Arc<dyn CompletionClient>,
    ) -> Result<Self, BridgeError> {
        let matcher = IntentMatcher::new(&profile)?;
        Ok(Self {
            profile: Arc::new(profile),
            matcher: Arc::new(matcher),
            sender,
            model,
        })
    }

    pub fn profile(&self) -> &BotProfile {
        &self.profile
    }

    pub fn route(&self, msg: &InboundMessage) -> Route {
        let p = &self.profile;
        let Some(body) = msg.text_body() else {
            return Route::NonText {
                reply: p.non_text_prompt.clone(),
            };
        };
        let normalized = normalize(body);
        match self.matcher.classify(&normalized) {
            Intent::Pricing => Route::Canned {
                intent: Intent::Pricing,
                replies: vec![p.packages_message.clone(), p.lead_questions.clone()],
            },
            Intent::Demo => Route::Canned {
                intent: Intent::Demo,
                replies: vec![p.demo_ack.clone(), p.lead_questions.clone()],
            },
            Intent::Support => Route::Canned {
                intent: Intent::Support,
                replies: vec![p.support_ack.clone()],
            },
            Intent::General => {
                let short = normalized.chars().count() < p.cta_max_chars;
                Route::Model {
                    prompt: body.to_owned(),
                    cta: short.then(|| p.cta.clone()),
                }
            }
        }
    }

    pub async fn dispatch(&self, msg: &InboundMessage) -> DispatchReport {
        let route = self.route(msg);
        let mut report = DispatchReport::new(&route);
        tracing::debug!(route = report.route, message_id = ?msg.id, "routing inbound message");
        if let Err(err) = self.execute(&msg.from, route, &mut report).await {
            report.error = Some(err);
        }
        report
    }

    async fn execute(
        &self,
        to: &str,
        route: Route,
        report: &mut DispatchReport,
    ) -> Result<(), BridgeError> {
        match route {
            Route::NonText { reply } => self.deliver(to, &reply, report).await,
            Route::Canned { replies, .. } => {
                for reply in &replies {
                    self.deliver(to, reply, report).await?;
                }
                Ok(())
            }
            Route::Model { prompt, cta } => {
                report.model_used = true;
                let answer = self.ask_model(&prompt, report).await?;
                self.deliver(to, &answer, report).await?;
                if let Some(cta) = cta {
                    self.deliver(to, &cta, report).await?;
                }
                Ok(())
            }
        }
    }

    async fn deliver(
        &self,
        to: &str,
        body: &str,
        report: &mut DispatchReport,
    ) -> Result<(), BridgeError> {
        match self.sender.send_text(to, body).await {
            Ok(()) => {
                report.replies_sent += 1;
                Ok(())
            }
            Err(err) if err.is_rejection() => {
                tracing::error!(error = %err, "WhatsApp send rejected");
                report.delivery_failures += 1;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn ask_model(
        &self,
        prompt: &str,
        report: &mut DispatchReport,
    ) -> Result<String, BridgeError> {
        match self.model.complete(prompt).await {
            Ok(answer) => {
                let answer = answer.trim();
                if answer.is_empty() {
                    Ok(self.profile.empty_completion.clone())
                } else {
                    Ok(answer.to_owned())
                }
            }
            Err(err) if err.is_rejection() => {
                tracing::error!(error = %err, "completion API error");
                report.model_failed = true;
                Ok(self.profile.ai_unavailable.clone())
            }
            Err(err) => {
                report.model_failed = true;
                Err(err)
            }
        }
    }
}
