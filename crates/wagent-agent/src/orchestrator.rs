// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message orchestrator: one inbound message in, one [`ProcessingResult`] out.
//!
//! The pipeline is context → completion → parse → enrich → timing. The result
//! is published as a [`DomainEvent::MessageProcessed`] for billing; the
//! orchestrator itself never charges anything.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};
use wagent_context::ContextEngine;
use wagent_core::EventPublisher;
use wagent_core::billing::{DomainEvent, MessageProcessed};
use wagent_core::marker::Intent;
use wagent_core::types::{Account, InboundMessage, Message, ProcessingResult};
use wagent_provider::CompletionGateway;

use crate::enricher::ProductEnricher;
use crate::parser::parse_response;
use crate::timing::TimingSimulator;

pub struct MessageOrchestrator {
    context: ContextEngine,
    gateway: Arc<CompletionGateway>,
    enricher: ProductEnricher,
    timing: TimingSimulator,
    publisher: Arc<dyn EventPublisher>,
}

impl MessageOrchestrator {
    pub fn new(
        context: ContextEngine,
        gateway: Arc<CompletionGateway>,
        enricher: ProductEnricher,
        timing: TimingSimulator,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            context,
            gateway,
            enricher,
            timing,
            publisher,
        }
    }

    pub fn context(&self) -> &ContextEngine {
        &self.context
    }

    /// Produce the reply for `inbound`, given the conversation window before it.
    ///
    /// Always returns a result: vendor failures surface as the fallback reply,
    /// empty completions as a processed result without reply.
    pub async fn process_message(
        &self,
        account: &Account,
        inbound: &InboundMessage,
        history: &[Message],
    ) -> ProcessingResult {
        let now = Utc::now();
        let catalog = self.enricher.excerpt(account.subscriber_id).await;
        let model = self.gateway.resolve_model(account.ai.model.as_ref());
        let request = self
            .context
            .build_request(account, inbound, history, &catalog, &model, now);

        let completion = self.gateway.complete(&model.vendor, request).await;
        let parsed = parse_response(&completion.text);

        let result = if parsed.message.is_empty() {
            debug!(account_id = account.id, "completion had no usable text");
            ProcessingResult::without_reply()
        } else {
            let products = match parsed.intent {
                Intent::ShowProducts => {
                    self.enricher
                        .enrich(account.subscriber_id, &parsed.product_ids)
                        .await
                }
                Intent::ShowCatalog => self.enricher.catalog(account.subscriber_id).await,
                Intent::Text => Vec::new(),
            };

            let (wait_time_seconds, typing_duration_seconds) = {
                let mut rng = rand::thread_rng();
                (
                    self.timing.compute_wait(&account.ai.timing, &mut rng),
                    self.timing
                        .compute_typing(parsed.message.chars().count(), &mut rng),
                )
            };

            ProcessingResult {
                processed: true,
                has_reply: true,
                reply_text: parsed.message,
                products,
                wait_time_seconds,
                typing_duration_seconds,
                intent: parsed.intent,
                model: Some(completion.model.clone()),
                confidence: completion.confidence,
                fallback: completion.is_fallback(),
                skip_reason: None,
            }
        };

        info!(
            account_id = account.id,
            message_id = %inbound.message_id,
            has_reply = result.has_reply,
            intent = %result.intent,
            products = result.products.len(),
            fallback = result.fallback,
            cost_usd = completion.cost_usd,
            "message processed"
        );

        self.publish(account, inbound, &result).await;
        result
    }

    async fn publish(&self, account: &Account, inbound: &InboundMessage, result: &ProcessingResult) {
        let event = DomainEvent::MessageProcessed(MessageProcessed {
            event_id: uuid::Uuid::new_v4().to_string(),
            account_id: account.id,
            subscriber_id: account.subscriber_id,
            inbound: inbound.clone(),
            result: result.clone(),
            occurred_at: Utc::now(),
        });
        if let Err(e) = self.publisher.publish(event).await {
            error!(
                account_id = account.id,
                message_id = %inbound.message_id,
                error = %e,
                "failed to publish processed-message event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use wagent_config::model::{ContextConfig, ProviderConfig, TimingConfig};
    use wagent_core::types::{
        AccountStatus, AdapterType, AiSettings, CompletionRequest, HealthStatus, MessageType,
        Product, ProviderResponse, ReplyTiming, TokenUsage,
    };
    use wagent_core::{CatalogStore, PluginAdapter, ProviderAdapter, WagentError};

    struct ScriptedProvider {
        reply: Option<&'static str>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl PluginAdapter for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Provider
        }
        async fn health_check(&self) -> Result<HealthStatus, WagentError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), WagentError> {
            Ok(())
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedProvider {
        fn vendor(&self) -> &str {
            "openai"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<ProviderResponse, WagentError> {
            self.requests.lock().unwrap().push(request);
            match self.reply {
                Some(text) => Ok(ProviderResponse {
                    id: "resp_1".into(),
                    text: text.into(),
                    model: "gpt-4o-mini".into(),
                    stop_reason: Some("stop".into()),
                    usage: TokenUsage {
                        input_tokens: 100,
                        output_tokens: 20,
                    },
                }),
                None => Err(WagentError::Provider {
                    message: "vendor down".into(),
                    source: None,
                }),
            }
        }
    }

    struct Shelf;

    fn product(id: i64) -> Product {
        Product {
            id,
            subscriber_id: 1,
            title: format!("Vestido {id}"),
            description: "Algodão".into(),
            price_cents: 12990,
            media: vec!["a.jpg".into(), "b.jpg".into()],
            active: true,
        }
    }

    #[async_trait]
    impl CatalogStore for Shelf {
        async fn active_products_by_ids(
            &self,
            _subscriber_id: i64,
            ids: &[i64],
        ) -> Result<Vec<Product>, WagentError> {
            Ok(ids.iter().filter(|id| **id <= 3).map(|id| product(*id)).collect())
        }

        async fn active_catalog(
            &self,
            _subscriber_id: i64,
            limit: usize,
        ) -> Result<Vec<Product>, WagentError> {
            Ok((1..=3).map(product).take(limit).collect())
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<DomainEvent>>);

    #[async_trait]
    impl EventPublisher for Events {
        async fn publish(&self, event: DomainEvent) -> Result<(), WagentError> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn account() -> Account {
        Account {
            id: 7,
            subscriber_id: 1,
            name: "Boutique Lua".into(),
            phone: None,
            status: AccountStatus::Connected,
            ai: AiSettings {
                timing: ReplyTiming::Fixed { seconds: 40 },
                ..AiSettings::default()
            },
            created_at: Utc::now(),
        }
    }

    fn inbound(body: &str) -> InboundMessage {
        InboundMessage {
            message_id: "wamid.A1".into(),
            account_id: 7,
            sender_id: "5511988887777@c.us".into(),
            body: body.into(),
            timestamp: Utc::now(),
            message_type: MessageType::Text,
            is_group: false,
            chat_name: Some("Maria".into()),
            metadata: None,
        }
    }

    fn orchestrator(
        reply: Option<&'static str>,
    ) -> (MessageOrchestrator, Arc<ScriptedProvider>, Arc<Events>) {
        let provider = Arc::new(ScriptedProvider {
            reply,
            requests: Mutex::new(Vec::new()),
        });
        let gateway = CompletionGateway::new(&ProviderConfig::default())
            .with_provider(provider.clone());
        let events = Arc::new(Events::default());
        let orchestrator = MessageOrchestrator::new(
            ContextEngine::new(ContextConfig::default()),
            Arc::new(gateway),
            ProductEnricher::new(Arc::new(Shelf), 25, 10),
            TimingSimulator::new(TimingConfig::default()),
            events.clone(),
        );
        (orchestrator, provider, events)
    }

    #[tokio::test]
    async fn products_are_attached_and_event_published() {
        let (orchestrator, provider, events) = orchestrator(Some(
            "Temos estes modelos!\n[ACTION]{\"intent\":\"SHOW_PRODUCTS\",\"product_ids\":[3,1,99]}[/ACTION]",
        ));
        let result = orchestrator
            .process_message(&account(), &inbound("tem vestido?"), &[])
            .await;

        assert!(result.processed && result.has_reply);
        assert_eq!(result.reply_text, "Temos estes modelos!");
        assert_eq!(result.intent, Intent::ShowProducts);
        let ids: Vec<i64> = result.products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(result.wait_time_seconds, 40);
        assert!(result.typing_duration_seconds >= 2);
        assert_eq!(result.model.as_deref(), Some("gpt-4o-mini"));
        assert!(!result.fallback);

        let requests = provider.requests.lock().unwrap();
        assert!(requests[0].system_prompt.contains("Boutique Lua"));
        assert!(requests[0].system_prompt.contains("#1 | Vestido 1"));
        assert_eq!(requests[0].user_message, "tem vestido?");

        let events = events.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        let DomainEvent::MessageProcessed(event) = &events[0];
        assert_eq!(event.account_id, 7);
        assert_eq!(event.subscriber_id, 1);
        assert_eq!(event.message_id(), "wamid.A1");
        assert_eq!(event.result, result);
    }

    #[tokio::test]
    async fn catalog_intent_attaches_catalog() {
        let (orchestrator, ..) = orchestrator(Some(
            "Olha o catálogo [ACTION]{\"intent\":\"SHOW_CATALOG\"}[/ACTION]",
        ));
        let result = orchestrator
            .process_message(&account(), &inbound("catálogo"), &[])
            .await;
        assert_eq!(result.intent, Intent::ShowCatalog);
        assert_eq!(result.products.len(), 3);
    }

    #[tokio::test]
    async fn vendor_failure_yields_fallback_reply() {
        let (orchestrator, _, events) = orchestrator(None);
        let result = orchestrator
            .process_message(&account(), &inbound("oi"), &[])
            .await;
        assert!(result.has_reply);
        assert!(result.fallback);
        assert_eq!(result.confidence, Some(0.0));
        assert_eq!(result.reply_text, ProviderConfig::default().fallback_message);
        assert!(result.products.is_empty());
        assert_eq!(events.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn marker_only_completion_has_no_reply() {
        let (orchestrator, ..) = orchestrator(Some(
            "[ACTION]{\"intent\":\"SHOW_PRODUCTS\",\"product_ids\":[1]}[/ACTION]",
        ));
        let result = orchestrator
            .process_message(&account(), &inbound("oi"), &[])
            .await;
        assert!(result.processed);
        assert!(!result.has_reply);
        assert!(result.products.is_empty());
    }
}
