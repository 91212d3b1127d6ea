//! Rule-based repair advisor
//!
//! Inspects recent room messages, extracts symptom keywords by fixed-
//! vocabulary substring matching, assesses urgency and produces a templated
//! suggestion plus an escalation decision. The name is honest: there is no
//! model here, only a deterministic rule table. The interface is async so a
//! real inference backend can replace it without touching the gateway.

use std::sync::Arc;

use fixchat_shared::{AdvisorResponse, ChatResult, CostEstimate, Urgency};

use super::rooms::RoomStore;

/// How many recent messages the advisor reads per request
const RECENT_WINDOW: usize = 5;

/// Symptom keywords matched case-insensitively as substrings
const SYMPTOM_KEYWORDS: &[&str] = &[
    "broken",
    "cracked",
    "slow",
    "hot",
    "freeze",
    "crash",
    "dead",
    "flickering",
    "noise",
    "battery",
    "charging",
    "screen",
    "keyboard",
    "mouse",
    "wifi",
];

/// Terms that flip urgency to high
const URGENT_KEYWORDS: &[&str] = &[
    "emergency",
    "urgent",
    "critical",
    "dead",
    "broken",
    "fire",
    "smoke",
];

/// Reason attached to every escalation
pub const ESCALATION_REASON: &str = "High urgency issue detected";

/// Follow-up actions offered alongside a symptom-based suggestion
const FOLLOW_UPS: [&str; 4] = [
    "Book a repair appointment",
    "Get a detailed cost estimate",
    "Speak to a technician",
    "View our repair guides",
];

/// Message intent, classified by keyword vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    RepairRequest,
    PriceInquiry,
    TimeInquiry,
    BookingRequest,
    GeneralInquiry,
}

pub struct RuleBasedAdvisor {
    rooms: Arc<RoomStore>,
}

impl RuleBasedAdvisor {
    pub fn new(rooms: Arc<RoomStore>) -> Self {
        Self { rooms }
    }

    /// Produce a suggestion and escalation decision for a room
    ///
    /// Reads the last five messages; `request_kind` is carried through from
    /// the client but does not change the rule table today.
    pub async fn advise(&self, room_id: &str, request_kind: &str) -> ChatResult<AdvisorResponse> {
        let recent = self.rooms.history(room_id, RECENT_WINDOW).await?;
        let combined = recent
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let symptoms = extract_symptoms(&combined);
        let urgency = assess_urgency(&combined);
        let escalate = urgency == Urgency::High;

        tracing::debug!(
            room_id = %room_id,
            request_kind = %request_kind,
            symptoms = ?symptoms,
            urgency = ?urgency,
            "Advisor assessed room"
        );

        if symptoms.is_empty() {
            let (intent, _confidence) = classify_intent(&combined);
            return Ok(AdvisorResponse {
                content: GREETING.to_string(),
                suggestions: quick_replies(intent),
                symptoms,
                urgency,
                cost_estimate: None,
                escalate: false,
                escalation_reason: None,
            });
        }

        let content = format!(
            "Based on what you've described ({}), here's what I suggest:\n\n\
             1. {}\n2. {}\n3. {}",
            symptoms.join(", "),
            immediate_action(&symptoms),
            next_steps(&symptoms),
            timeline(&symptoms),
        );

        Ok(AdvisorResponse {
            content,
            suggestions: FOLLOW_UPS.iter().map(|s| s.to_string()).collect(),
            cost_estimate: Some(cost_estimate(&symptoms)),
            symptoms,
            urgency,
            escalate,
            escalation_reason: escalate.then(|| ESCALATION_REASON.to_string()),
        })
    }
}

const GREETING: &str = "Hello! I'm the repair assistant. Tell me what's wrong \
with your device and I'll suggest the next steps.";

/// Deduplicated symptom keywords found in the (lowercased) content
fn extract_symptoms(content: &str) -> Vec<String> {
    SYMPTOM_KEYWORDS
        .iter()
        .filter(|kw| content.contains(*kw))
        .map(|kw| kw.to_string())
        .collect()
}

/// High when any urgent term appears, otherwise medium
///
/// `Low` is never produced; the assessor this was ported from only ever
/// returned medium or high.
fn assess_urgency(content: &str) -> Urgency {
    if URGENT_KEYWORDS.iter().any(|kw| content.contains(kw)) {
        Urgency::High
    } else {
        Urgency::Medium
    }
}

fn has_any(symptoms: &[String], keys: &[&str]) -> bool {
    symptoms.iter().any(|s| keys.contains(&s.as_str()))
}

fn immediate_action(symptoms: &[String]) -> &'static str {
    if has_any(symptoms, &["dead", "broken"]) {
        "Stop using the device and do not attempt to charge it until it has been inspected."
    } else if has_any(symptoms, &["hot"]) {
        "Power the device down and let it cool on a hard surface, away from direct sunlight."
    } else if has_any(symptoms, &["screen", "flickering"]) {
        "Avoid pressing on the display and note whether the issue changes with brightness."
    } else {
        "Try a full restart and note any error messages that appear."
    }
}

fn next_steps(symptoms: &[String]) -> &'static str {
    if has_any(symptoms, &["dead", "broken"]) {
        "Bring the device in for a hands-on diagnostic; back up your data first if you can."
    } else if has_any(symptoms, &["hot"]) {
        "Once cool, check for blocked vents and close background apps; if it reheats, book a diagnostic."
    } else if has_any(symptoms, &["screen", "flickering"]) {
        "Take a photo of the fault and book a screen assessment so we can order the right part."
    } else {
        "If the problem persists after a restart, book a diagnostic and we'll take a closer look."
    }
}

fn timeline(symptoms: &[String]) -> &'static str {
    if has_any(symptoms, &["dead", "broken"]) {
        "Diagnosis usually takes 24-48 hours; we'll confirm a repair quote before any work."
    } else if has_any(symptoms, &["hot"]) {
        "Thermal issues are typically diagnosed the same day."
    } else if has_any(symptoms, &["screen", "flickering"]) {
        "Screen repairs are usually completed within 1-2 working days."
    } else {
        "Most minor issues are resolved the same day."
    }
}

/// Rough cost band keyed by symptom category
fn cost_estimate(symptoms: &[String]) -> CostEstimate {
    let (min, max) = if has_any(symptoms, &["screen", "flickering"]) {
        (100, 300)
    } else if has_any(symptoms, &["battery", "charging"]) {
        (80, 200)
    } else {
        (50, 150)
    };
    CostEstimate {
        min,
        max,
        currency: "GBP".to_string(),
    }
}

/// Classify the dominant intent of the recent conversation
///
/// Keyword vocabularies and confidences carried over from the shop's NLU
/// service; the best-scoring intent wins, defaulting to a low-confidence
/// general inquiry.
pub fn classify_intent(content: &str) -> (Intent, f32) {
    let table: [(Intent, f32, &[&str]); 5] = [
        (
            Intent::RepairRequest,
            0.8,
            &["fix", "repair", "broken", "not working", "problem", "issue", "help"],
        ),
        (
            Intent::PriceInquiry,
            0.9,
            &["cost", "price", "how much", "quote", "estimate", "fee", "charge"],
        ),
        (
            Intent::TimeInquiry,
            0.85,
            &["how long", "when", "time", "ready", "take", "duration"],
        ),
        (
            Intent::BookingRequest,
            0.9,
            &["book", "appointment", "schedule", "visit", "bring in", "drop off"],
        ),
        (
            Intent::GeneralInquiry,
            0.7,
            &["hello", "hi", "help", "info", "information", "about"],
        ),
    ];

    let mut best = (Intent::GeneralInquiry, 0.3);
    for (intent, confidence, patterns) in table {
        if confidence > best.1 && patterns.iter().any(|p| content.contains(p)) {
            best = (intent, confidence);
        }
    }
    best
}

/// Quick replies offered with the greeting, shaped by intent
fn quick_replies(intent: Intent) -> Vec<String> {
    let replies: [&str; 4] = match intent {
        Intent::PriceInquiry => [
            "Get a repair quote",
            "See common repair prices",
            "Book a free diagnostic",
            "Speak to a technician",
        ],
        Intent::BookingRequest => [
            "Book a repair appointment",
            "Check opening hours",
            "Find our workshop",
            "Speak to a technician",
        ],
        Intent::TimeInquiry => [
            "Check typical repair times",
            "Track an existing repair",
            "Book a repair appointment",
            "Speak to a technician",
        ],
        Intent::RepairRequest | Intent::GeneralInquiry => [
            "Describe your device issue",
            "Book a repair appointment",
            "Get a cost estimate",
            "Speak to a technician",
        ],
    };
    replies.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixchat_shared::{MessageDraft, Participant, ParticipantRole, RoomKind, RoomMetadata, RoomSeed};
    use fixchat_shared::{DeliveryStatus, Message, MessageKind, MessageMetadata};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn seed() -> RoomSeed {
        RoomSeed {
            name: "Repair".to_string(),
            kind: RoomKind::Support,
            ticket_id: None,
            metadata: RoomMetadata::default(),
        }
    }

    async fn room_with_messages(contents: &[&str]) -> (Arc<RoomStore>, Participant) {
        let rooms = Arc::new(RoomStore::new());
        let customer = Participant::new(Uuid::new_v4(), "Sam", ParticipantRole::Customer);
        rooms.get_or_create("repair-1", &customer, seed).await;
        for content in contents {
            let draft = MessageDraft::text(*content);
            let message = Message {
                id: Uuid::new_v4(),
                room_id: "repair-1".to_string(),
                sender: customer.clone(),
                content: draft.content,
                timestamp: OffsetDateTime::now_utc(),
                kind: MessageKind::Text,
                status: DeliveryStatus::Sent,
                metadata: MessageMetadata::default(),
            };
            rooms.append_message("repair-1", message).await.unwrap();
        }
        (rooms, customer)
    }

    #[tokio::test]
    async fn test_symptom_extraction() {
        let (rooms, _) = room_with_messages(&[
            "My iPhone screen is cracked and the battery is not charging",
        ])
        .await;
        let advisor = RuleBasedAdvisor::new(rooms);

        let response = advisor.advise("repair-1", "diagnosis").await.unwrap();
        assert_eq!(
            response.symptoms,
            vec!["cracked", "battery", "charging", "screen"]
        );
        assert_eq!(response.urgency, Urgency::Medium);
        assert!(!response.escalate);
        assert!(response.escalation_reason.is_none());
    }

    #[tokio::test]
    async fn test_urgent_content_escalates() {
        let (rooms, _) =
            room_with_messages(&["emergency, device won't turn on, it's completely dead"]).await;
        let advisor = RuleBasedAdvisor::new(rooms);

        let response = advisor.advise("repair-1", "diagnosis").await.unwrap();
        assert_eq!(response.urgency, Urgency::High);
        assert!(response.escalate);
        assert_eq!(
            response.escalation_reason.as_deref(),
            Some(ESCALATION_REASON)
        );
    }

    #[tokio::test]
    async fn test_no_symptoms_yields_greeting() {
        let (rooms, _) = room_with_messages(&["hello, are you open today?"]).await;
        let advisor = RuleBasedAdvisor::new(rooms);

        let response = advisor.advise("repair-1", "general").await.unwrap();
        assert!(response.symptoms.is_empty());
        assert!(!response.escalate);
        assert!(response.cost_estimate.is_none());
        assert_eq!(response.suggestions.len(), 4);
        assert!(response.content.contains("repair assistant"));
    }

    #[tokio::test]
    async fn test_cost_bands() {
        let (rooms, _) = room_with_messages(&["the screen is flickering"]).await;
        let advisor = RuleBasedAdvisor::new(rooms);
        let response = advisor.advise("repair-1", "estimate").await.unwrap();
        let cost = response.cost_estimate.unwrap();
        assert_eq!((cost.min, cost.max), (100, 300));
        assert_eq!(cost.currency, "GBP");

        let (rooms, _) = room_with_messages(&["battery drains in an hour"]).await;
        let advisor = RuleBasedAdvisor::new(rooms);
        let cost = advisor
            .advise("repair-1", "estimate")
            .await
            .unwrap()
            .cost_estimate
            .unwrap();
        assert_eq!((cost.min, cost.max), (80, 200));

        let (rooms, _) = room_with_messages(&["the keyboard is unresponsive"]).await;
        let advisor = RuleBasedAdvisor::new(rooms);
        let cost = advisor
            .advise("repair-1", "estimate")
            .await
            .unwrap()
            .cost_estimate
            .unwrap();
        assert_eq!((cost.min, cost.max), (50, 150));
    }

    #[tokio::test]
    async fn test_dead_device_takes_template_priority() {
        let (rooms, _) = room_with_messages(&["screen flickering and now it's dead"]).await;
        let advisor = RuleBasedAdvisor::new(rooms);
        let response = advisor.advise("repair-1", "diagnosis").await.unwrap();
        // dead/broken outranks the screen template
        assert!(response.content.contains("Stop using the device"));
    }

    #[tokio::test]
    async fn test_reads_only_recent_window() {
        let mut contents = vec!["old message about a cracked screen"; 1];
        contents.extend(vec!["nothing relevant here"; 5]);
        let (rooms, _) = room_with_messages(&contents).await;
        let advisor = RuleBasedAdvisor::new(rooms);

        let response = advisor.advise("repair-1", "diagnosis").await.unwrap();
        assert!(response.symptoms.is_empty());
    }

    #[test]
    fn test_intent_classification() {
        assert_eq!(
            classify_intent("how much would a new screen cost").0,
            Intent::PriceInquiry
        );
        assert_eq!(
            classify_intent("can i book an appointment for tomorrow").0,
            Intent::BookingRequest
        );
        assert_eq!(classify_intent("hello there").0, Intent::GeneralInquiry);
        let (intent, confidence) = classify_intent("completely unrelated text");
        assert_eq!(intent, Intent::GeneralInquiry);
        assert!(confidence < 0.5);
    }
}
