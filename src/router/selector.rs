//! Route selection logic.

use super::pattern::TopicPattern;
use super::route::{Route, RouteContext};
use crate::config::{ConfigError, LlmConfig, RouteRule};

/// A rule paired with its compiled topic pattern.
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: RouteRule,
    pattern: TopicPattern,
}

/// Resolves a [`RouteContext`] to a [`Route`].
///
/// Precedence: emergency override, then the first rule (in declaration order)
/// whose pattern matches the topic, then the system default.
#[derive(Debug, Clone)]
pub struct RouteSelector {
    rules: Vec<CompiledRule>,
    llm: LlmConfig,
}

impl RouteSelector {
    /// Compile every rule's pattern up front.
    pub fn new(rules: Vec<RouteRule>, llm: LlmConfig) -> Result<Self, ConfigError> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let pattern = TopicPattern::compile(&rule.match_pattern).map_err(|e| {
                    ConfigError::Validation(format!(
                        "Rule '{}' has an invalid pattern '{}': {}",
                        rule.name, rule.match_pattern, e
                    ))
                })?;
                Ok(CompiledRule { rule, pattern })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { rules, llm })
    }

    /// Select the route for a request.
    pub fn select(&self, context: &RouteContext) -> Route {
        if context.emergency {
            tracing::info!(topic = %context.topic, "Emergency override route selected");
            return Route::emergency();
        }

        match self.find_rule(&context.topic) {
            Some(rule) => {
                tracing::debug!(rule = %rule.name, topic = %context.topic, "Matched routing rule");
                Route::from_rule(rule, &self.llm)
            }
            None => {
                tracing::debug!(topic = %context.topic, "No routing rule matched, using default");
                Route::system_default(&self.llm)
            }
        }
    }

    /// First rule whose pattern matches the topic.
    fn find_rule(&self, topic: &str) -> Option<&RouteRule> {
        self.rules
            .iter()
            .find(|compiled| compiled.pattern.matches(topic))
            .map(|compiled| &compiled.rule)
    }

    /// Configured rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &RouteRule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    /// System defaults used when no rule matches.
    pub fn defaults(&self) -> &LlmConfig {
        &self.llm
    }
}
