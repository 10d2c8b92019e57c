//! Ordered routing rules. The first pattern matching an event type wins and
//! a catch-all is always evaluated last.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;

use crate::domain::entities::event::{DispatchTarget, EventEnvelope, Priority, TransformedEvent};
use crate::errors::DomainError;

use super::transform;

/// Pattern of the rule every table ends with
pub const CATCH_ALL_PATTERN: &str = ".*";

/// Maps an envelope to the record written to a rule's target
pub type TransformFn = fn(&EventEnvelope, Priority, DateTime<Utc>) -> TransformedEvent;

#[derive(Clone)]
pub struct RoutingRule {
    pub name: String,
    pub pattern: Regex,
    pub target: DispatchTarget,
    pub transform: TransformFn,
    /// Whether matching events may also raise an admin notification
    pub notify: bool,
    /// Lowest priority that triggers the notification
    pub priority_threshold: Priority,
}

impl fmt::Debug for RoutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("target", &self.target)
            .field("notify", &self.notify)
            .field("priority_threshold", &self.priority_threshold)
            .finish()
    }
}

impl RoutingRule {
    /// Rule without notification
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        target: DispatchTarget,
        transform: TransformFn,
    ) -> Result<Self, DomainError> {
        let pattern = Regex::new(pattern).map_err(|e| {
            DomainError::internal(format!("Invalid routing pattern {}: {}", pattern, e))
        })?;

        Ok(Self {
            name: name.into(),
            pattern,
            target,
            transform,
            notify: false,
            priority_threshold: Priority::Critical,
        })
    }

    /// Notify admins for events at or above `threshold`
    pub fn notify_at(mut self, threshold: Priority) -> Self {
        self.notify = true;
        self.priority_threshold = threshold;
        self
    }

    pub fn matches(&self, event_type: &str) -> bool {
        self.pattern.is_match(event_type)
    }

    pub fn should_notify(&self, priority: Priority) -> bool {
        self.notify && priority >= self.priority_threshold
    }

    fn is_catch_all(&self) -> bool {
        self.pattern.as_str() == CATCH_ALL_PATTERN
    }

    fn catch_all() -> Result<Self, DomainError> {
        Self::new(
            "catch_all",
            CATCH_ALL_PATTERN,
            DispatchTarget::EventQueue,
            transform::to_queue,
        )
    }
}

/// Rules in evaluation order
#[derive(Debug, Clone)]
pub struct RoutingTable {
    rules: Vec<RoutingRule>,
}

impl RoutingTable {
    /// Build a table, appending the queue catch-all unless the last rule already is one
    pub fn new(mut rules: Vec<RoutingRule>) -> Result<Self, DomainError> {
        if !rules.last().is_some_and(RoutingRule::is_catch_all) {
            rules.push(RoutingRule::catch_all()?);
        }
        Ok(Self { rules })
    }

    /// The hub's routing rules
    pub fn standard() -> Result<Self, DomainError> {
        Self::new(vec![
            RoutingRule::new(
                "service_health",
                r"^service\.health(\.|$)",
                DispatchTarget::ServiceHealth,
                transform::to_health,
            )?
            .notify_at(Priority::Critical),
            RoutingRule::new(
                "service_issue",
                r"^service\.issue(\.|$)",
                DispatchTarget::ServiceIssues,
                transform::to_issue,
            )?
            .notify_at(Priority::High),
            RoutingRule::new(
                "notification",
                r"^notification(\.|$)",
                DispatchTarget::Notifications,
                transform::to_notification,
            )?,
            RoutingRule::new(
                "service_event",
                r"^service\.(sync|job|event)(\.|$)",
                DispatchTarget::ServiceEvents,
                transform::to_service_event,
            )?
            .notify_at(Priority::Critical),
        ])
    }

    /// First rule whose pattern matches `event_type`
    pub fn match_event(&self, event_type: &str) -> Option<&RoutingRule> {
        self.rules.iter().find(|rule| rule.matches(event_type))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }
}
