//! Mock implementations for testing
//!
//! These mocks enable dispatcher integration tests without real I/O.

use super::executor::{Dispatcher, DispatcherSettings};
use super::sessions::InMemorySessionStore;
use super::traits::*;
use crate::db::{Order, StatusChange, UserId};
use crate::state_machine::event::Action;
use crate::state_machine::{Actor, Event, Inbound, OutboundMessage};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Recording Messenger
// ============================================================================

/// Messenger that records every delivered message
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<OutboundMessage>>,
    /// Chats whose sends fail
    failing: HashSet<UserId>,
    /// Chats whose sends never complete
    stalled: HashSet<UserId>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, chat: UserId) -> Self {
        self.failing.insert(chat);
        self
    }

    pub fn stalled_for(mut self, chat: UserId) -> Self {
        self.stalled.insert(chat);
        self
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat: UserId) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat)
            .collect()
    }

    pub fn texts_to(&self, chat: UserId) -> Vec<String> {
        self.sent_to(chat).into_iter().map(|m| m.text).collect()
    }

    pub fn last_to(&self, chat: UserId) -> Option<OutboundMessage> {
        self.sent_to(chat).pop()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, message: &OutboundMessage) -> Result<(), String> {
        if self.stalled.contains(&message.chat_id) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing.contains(&message.chat_id) {
            return Err(format!("chat {} unreachable", message.chat_id));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ============================================================================
// In-Memory Order Store
// ============================================================================

/// Order store backed by a vector, with switchable faults
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<Vec<Order>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: Mutex::new(orders),
            ..Self::default()
        }
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<(), String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err("read fault".to_string());
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("write fault".to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn append(&self, order: &Order) -> Result<(), String> {
        self.check_write()?;
        self.orders.lock().unwrap().push(order.clone());
        Ok(())
    }

    async fn update_status(&self, change: &StatusChange) -> Result<usize, String> {
        self.check_write()?;
        let mut orders = self.orders.lock().unwrap();
        Ok(orders
            .iter_mut()
            .map(|o| change.apply(o))
            .filter(|&moved| moved)
            .count())
    }

    async fn query_by_owner_or_handle(
        &self,
        owner: UserId,
        handle: Option<&str>,
    ) -> Result<Vec<Order>, String> {
        self.check_read()?;
        Ok(self
            .orders()
            .into_iter()
            .filter(|o| o.is_owned_by(owner, handle))
            .collect())
    }

    async fn has_orders(&self, owner: UserId) -> Result<bool, String> {
        self.check_read()?;
        Ok(self.orders().iter().any(|o| o.user_id == owner))
    }
}

// ============================================================================
// Test Dispatcher Builder
// ============================================================================

type MockDispatcher =
    Dispatcher<Arc<InMemoryOrderStore>, Arc<RecordingMessenger>, Arc<InMemorySessionStore>>;

/// Helper for driving a dispatcher over mocks with minimal boilerplate
pub struct TestDispatcher {
    pub dispatcher: MockDispatcher,
    pub orders: Arc<InMemoryOrderStore>,
    pub messenger: Arc<RecordingMessenger>,
    pub sessions: Arc<InMemorySessionStore>,
}

impl TestDispatcher {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> TestDispatcherBuilder {
        TestDispatcherBuilder::default()
    }

    pub async fn send(&self, actor: &Actor, event: Event) {
        self.dispatcher
            .dispatch(Inbound::new(actor.clone(), event))
            .await;
    }

    /// Message text as it would arrive from the chat (commands recognized)
    pub async fn say(&self, actor: &Actor, text: &str) {
        self.send(actor, Event::from_message_text(text)).await;
    }

    pub async fn press(&self, actor: &Actor, action: Action) {
        self.send(actor, Event::button(action)).await;
    }

    pub async fn photo(&self, actor: &Actor, file_id: &str) {
        self.send(
            actor,
            Event::Photo {
                file_id: file_id.to_string(),
            },
        )
        .await;
    }
}

pub struct TestDispatcherBuilder {
    settings: DispatcherSettings,
    orders: InMemoryOrderStore,
    messenger: RecordingMessenger,
}

impl Default for TestDispatcherBuilder {
    fn default() -> Self {
        Self {
            settings: DispatcherSettings {
                admins: vec![1, 2, 3],
                send_timeout: Duration::from_millis(200),
                ..DispatcherSettings::default()
            },
            orders: InMemoryOrderStore::new(),
            messenger: RecordingMessenger::new(),
        }
    }
}

impl TestDispatcherBuilder {
    pub fn admins(mut self, admins: Vec<UserId>) -> Self {
        self.settings.admins = admins;
        self
    }

    pub fn guide_url(mut self, url: impl Into<String>) -> Self {
        self.settings.guide_url = Some(url.into());
        self
    }

    pub fn orders(mut self, orders: InMemoryOrderStore) -> Self {
        self.orders = orders;
        self
    }

    pub fn messenger(mut self, messenger: RecordingMessenger) -> Self {
        self.messenger = messenger;
        self
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    pub fn build(self) -> TestDispatcher {
        let orders = Arc::new(self.orders);
        let messenger = Arc::new(self.messenger);
        let sessions = Arc::new(InMemorySessionStore::new());
        let dispatcher = Dispatcher::new(
            orders.clone(),
            messenger.clone(),
            sessions.clone(),
            self.settings,
        );
        TestDispatcher {
            dispatcher,
            orders,
            messenger,
            sessions,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::OrderStatus;
    use crate::state_machine::prompts;
    use crate::state_machine::state::{Session, Step};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    const ADMINS: [UserId; 3] = [1, 2, 3];

    fn customer() -> Actor {
        Actor::new(42)
            .with_username("ivan")
            .with_name("Ivan", Some("Petrov"))
    }

    fn admin(id: UserId) -> Actor {
        Actor::new(id).with_username(format!("admin{id}"))
    }

    /// Walk the customer through a full order
    async fn submit_order(rt: &TestDispatcher, actor: &Actor, photo: Option<&str>) {
        rt.say(actor, "/start").await;
        rt.press(actor, Action::StartOrder).await;
        for text in ["AB123", "42", "-", "Moscow", "courier"] {
            rt.say(actor, text).await;
        }
        match photo {
            Some(file_id) => {
                rt.press(actor, Action::AttachPhoto).await;
                rt.photo(actor, file_id).await;
            }
            None => rt.press(actor, Action::SkipPhoto).await,
        }
        rt.say(actor, "@ivan").await;
    }

    async fn quote_price(rt: &TestDispatcher, by: UserId, text: &str) {
        rt.press(&admin(by), Action::AdminPrice { customer: 42 })
            .await;
        rt.say(&admin(by), text).await;
    }

    #[tokio::test]
    async fn test_recording_messenger_failures() {
        let messenger = RecordingMessenger::new().failing_for(7);
        assert!(messenger.send(&OutboundMessage::text(7, "x")).await.is_err());
        assert!(messenger.send(&OutboundMessage::text(8, "y")).await.is_ok());
        assert_eq!(messenger.texts_to(8), vec!["y"]);
        assert!(messenger.sent_to(7).is_empty());
    }

    /// Scenario: submission without a photo lands as one pending record and
    /// reaches every admin
    #[tokio::test]
    async fn test_submission_skip_photo() {
        let rt = TestDispatcher::new().build();
        let ivan = customer();
        submit_order(&rt, &ivan, None).await;

        let orders = rt.orders.orders();
        assert_eq!(
            orders,
            vec![Order {
                user_id: 42,
                full_name: "Ivan Petrov".to_string(),
                username: "ivan".to_string(),
                article: "AB123".to_string(),
                size: "42".to_string(),
                color: "-".to_string(),
                city: "Moscow".to_string(),
                delivery: "courier".to_string(),
                photo_file_id: None,
                contact: "@ivan".to_string(),
                status: OrderStatus::Pending,
                admin_message: None,
            }]
        );

        assert_eq!(
            rt.messenger.last_to(42).map(|m| m.text),
            Some(prompts::SUBMITTED.to_string())
        );
        for id in ADMINS {
            let received = rt.messenger.sent_to(id);
            assert_eq!(received.len(), 1);
            for field in [
                "AB123",
                "Size: 42",
                "Color: -",
                "Moscow",
                "courier",
                "@ivan",
                "Ivan Petrov",
            ] {
                assert!(received[0].text.contains(field), "missing {field}");
            }
        }
        assert!(rt.sessions.load(42).await.is_none());
    }

    #[tokio::test]
    async fn test_first_start_shows_welcome_then_menu() {
        let rt = TestDispatcher::new().build();
        let ivan = customer();

        rt.say(&ivan, "/start").await;
        assert_eq!(rt.messenger.texts_to(42), vec![prompts::WELCOME]);

        submit_order(&rt, &ivan, None).await;
        rt.messenger.clear();
        rt.say(&ivan, "/start").await;
        assert_eq!(rt.messenger.texts_to(42), vec![prompts::MENU]);
    }

    #[tokio::test]
    async fn test_submission_with_photo() {
        let rt = TestDispatcher::new().build();
        submit_order(&rt, &customer(), Some("photo-large")).await;

        let orders = rt.orders.orders();
        assert_eq!(orders[0].photo_file_id.as_deref(), Some("photo-large"));
        for id in ADMINS {
            let received = rt.messenger.sent_to(id);
            assert_eq!(received.len(), 2);
            assert_eq!(received[1].photo.as_deref(), Some("photo-large"));
        }
    }

    #[tokio::test]
    async fn test_text_while_waiting_for_photo_is_ignored() {
        let rt = TestDispatcher::new().build();
        let ivan = customer();
        rt.say(&ivan, "/start").await;
        rt.press(&ivan, Action::StartOrder).await;
        for text in ["A", "B", "C", "D", "E"] {
            rt.say(&ivan, text).await;
        }
        rt.press(&ivan, Action::AttachPhoto).await;
        rt.messenger.clear();

        rt.say(&ivan, "not a photo").await;
        assert!(rt.messenger.sent().is_empty());
        let session = rt.sessions.load(42).await.unwrap();
        assert_eq!(session.step, Step::WaitPhotoUpload);
        assert!(session.waiting_photo);
    }

    /// Scenario: admin quotes a price, customer declines
    #[tokio::test]
    async fn test_price_relay_then_decline() {
        let rt = TestDispatcher::new().build();
        let ivan = customer();
        submit_order(&rt, &ivan, None).await;
        rt.messenger.clear();

        quote_price(&rt, 1, "50 USD, 7 days").await;

        let order = &rt.orders.orders()[0];
        assert_eq!(order.status, OrderStatus::PriceSent);
        assert_eq!(order.admin_message.as_deref(), Some("50 USD, 7 days"));

        let quote = rt.messenger.last_to(42).unwrap();
        assert_eq!(quote.text, "50 USD, 7 days");
        assert_eq!(
            quote.keyboard.unwrap().actions(),
            vec![Action::Accept, Action::Decline]
        );
        assert_eq!(
            rt.messenger.texts_to(1),
            vec![prompts::ASK_PRICE, prompts::PRICE_RELAYED]
        );
        assert_eq!(rt.sessions.capture_count().await, 0);

        rt.press(&ivan, Action::Decline).await;
        assert_eq!(rt.orders.orders()[0].status, OrderStatus::Declined);
        assert_eq!(
            rt.messenger.last_to(42).map(|m| m.text),
            Some(prompts::DECLINED.to_string())
        );
        for id in ADMINS {
            assert!(rt
                .messenger
                .last_to(id)
                .unwrap()
                .text
                .contains("declined"));
        }
    }

    #[tokio::test]
    async fn test_price_relay_then_confirm() {
        let rt = TestDispatcher::new().build();
        let ivan = customer();
        submit_order(&rt, &ivan, None).await;
        quote_price(&rt, 2, "30 USD").await;

        rt.press(&ivan, Action::Accept).await;
        assert_eq!(rt.orders.orders()[0].status, OrderStatus::Confirmed);
        assert_eq!(
            rt.messenger.last_to(42).map(|m| m.text),
            Some(prompts::CONFIRMED.to_string())
        );

        // A second press finds nothing at price_sent
        rt.messenger.clear();
        rt.press(&ivan, Action::Decline).await;
        assert_eq!(rt.orders.orders()[0].status, OrderStatus::Confirmed);
        assert!(rt.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_reject_pending_order() {
        let rt = TestDispatcher::new().build();
        submit_order(&rt, &customer(), None).await;

        rt.press(&admin(2), Action::AdminReject { customer: 42 })
            .await;
        assert_eq!(rt.orders.orders()[0].status, OrderStatus::Rejected);
        assert_eq!(
            rt.messenger.last_to(42).map(|m| m.text),
            Some(prompts::REJECTED.to_string())
        );

        // Another admin acting on the same order finds nothing left
        rt.press(&admin(3), Action::AdminReject { customer: 42 })
            .await;
        assert_eq!(
            rt.messenger.last_to(3).map(|m| m.text),
            Some(prompts::NOTHING_PENDING.to_string())
        );
    }

    #[tokio::test]
    async fn test_quote_after_rejection_is_refused() {
        let rt = TestDispatcher::new().build();
        submit_order(&rt, &customer(), None).await;
        rt.press(&admin(1), Action::AdminReject { customer: 42 })
            .await;
        rt.messenger.clear();

        quote_price(&rt, 2, "too late").await;
        assert_eq!(rt.orders.orders()[0].status, OrderStatus::Rejected);
        assert!(rt.messenger.sent_to(42).is_empty());
        assert_eq!(
            rt.messenger.last_to(2).map(|m| m.text),
            Some(prompts::NOTHING_PENDING.to_string())
        );
    }

    #[tokio::test]
    async fn test_admin_actions_from_non_admin_are_ignored() {
        let rt = TestDispatcher::new().build();
        let ivan = customer();
        submit_order(&rt, &ivan, None).await;
        rt.messenger.clear();

        let stranger = Actor::new(99);
        rt.press(&stranger, Action::AdminPrice { customer: 42 })
            .await;
        rt.press(&stranger, Action::AdminReject { customer: 42 })
            .await;
        assert_eq!(rt.sessions.capture_count().await, 0);
        assert_eq!(rt.orders.orders()[0].status, OrderStatus::Pending);
        assert!(rt.messenger.sent_to(42).is_empty());
    }

    #[tokio::test]
    async fn test_start_cancels_pending_capture() {
        let rt = TestDispatcher::new().build();
        submit_order(&rt, &customer(), None).await;

        rt.press(&admin(1), Action::AdminPrice { customer: 42 })
            .await;
        rt.say(&admin(1), "/start").await;
        assert_eq!(rt.sessions.capture_count().await, 0);

        rt.say(&admin(1), "hello").await;
        assert_eq!(rt.orders.orders()[0].status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_capture_does_not_disturb_admin_dialogue() {
        let rt = TestDispatcher::new().build();
        submit_order(&rt, &customer(), None).await;

        let boss = admin(1);
        rt.say(&boss, "/start").await;
        rt.press(&boss, Action::StartOrder).await;
        rt.say(&boss, "ZZ9").await;
        rt.press(&boss, Action::AdminPrice { customer: 42 })
            .await;
        rt.say(&boss, "45 USD").await;

        let session = rt.sessions.load(1).await.unwrap();
        assert_eq!(session.step, Step::Size);
        assert_eq!(session.draft.article, "ZZ9");
        assert_eq!(rt.orders.orders()[0].status, OrderStatus::PriceSent);
    }

    #[tokio::test]
    async fn test_my_orders_matches_owner_or_handle() {
        let legacy = Order {
            user_id: 7,
            username: "ivan".to_string(),
            article: "OLD1".to_string(),
            ..Order::default()
        };
        let other = Order {
            user_id: 8,
            username: "petr".to_string(),
            article: "NOPE".to_string(),
            ..Order::default()
        };
        let rt = TestDispatcher::new()
            .orders(InMemoryOrderStore::with_orders(vec![legacy, other]))
            .build();
        let ivan = customer();
        submit_order(&rt, &ivan, None).await;
        rt.messenger.clear();

        rt.say(&ivan, "/myorders").await;
        let text = rt.messenger.last_to(42).unwrap().text;
        assert!(text.contains("OLD1"));
        assert!(text.contains("AB123"));
        assert!(!text.contains("NOPE"));
        assert!(text.find("OLD1") < text.find("AB123"));
    }

    #[tokio::test]
    async fn test_my_orders_mid_dialogue_keeps_step() {
        let rt = TestDispatcher::new().build();
        let ivan = customer();
        rt.say(&ivan, "/start").await;
        rt.press(&ivan, Action::StartOrder).await;
        rt.say(&ivan, "AB123").await;

        rt.say(&ivan, "/myorders").await;
        assert_eq!(
            rt.messenger.last_to(42).map(|m| m.text),
            Some(prompts::NO_ORDERS.to_string())
        );
        assert_eq!(rt.sessions.load(42).await.unwrap().step, Step::Size);
    }

    #[tokio::test]
    async fn test_write_fault_keeps_draft_and_skips_fan_out() {
        let rt = TestDispatcher::new().build();
        let ivan = customer();
        rt.orders.set_fail_writes(true);
        submit_order(&rt, &ivan, None).await;

        assert!(rt.orders.orders().is_empty());
        assert_eq!(
            rt.messenger.last_to(42).map(|m| m.text),
            Some(prompts::STORE_FAILURE.to_string())
        );
        assert!(!rt.messenger.texts_to(42).contains(&prompts::SUBMITTED.to_string()));
        for id in ADMINS {
            assert!(rt.messenger.sent_to(id).is_empty());
        }
        let session = rt.sessions.load(42).await.unwrap();
        assert_eq!(session.step, Step::Contact);

        // Resending the contact once the store recovers completes the order
        rt.orders.set_fail_writes(false);
        rt.say(&ivan, "@ivan").await;
        assert_eq!(rt.orders.orders().len(), 1);
        assert_eq!(rt.messenger.sent_to(1).len(), 1);
    }

    #[tokio::test]
    async fn test_relay_write_fault_keeps_capture() {
        let rt = TestDispatcher::new().build();
        submit_order(&rt, &customer(), None).await;
        rt.messenger.clear();

        rt.orders.set_fail_writes(true);
        quote_price(&rt, 1, "50 USD").await;
        assert_eq!(
            rt.messenger.last_to(1).map(|m| m.text),
            Some(prompts::STORE_FAILURE.to_string())
        );
        assert_eq!(rt.sessions.capture_count().await, 1);
        assert!(rt.messenger.sent_to(42).is_empty());

        // The resent quote is still captured once the store recovers
        rt.orders.set_fail_writes(false);
        rt.say(&admin(1), "50 USD").await;
        let orders = rt.orders.orders();
        assert_eq!(orders[0].status, OrderStatus::PriceSent);
        assert_eq!(orders[0].admin_message.as_deref(), Some("50 USD"));
        assert_eq!(rt.messenger.texts_to(42), vec!["50 USD"]);
        assert_eq!(
            rt.messenger.last_to(1).map(|m| m.text),
            Some(prompts::PRICE_RELAYED.to_string())
        );
        assert_eq!(rt.sessions.capture_count().await, 0);
    }

    #[tokio::test]
    async fn test_read_fault_treated_as_no_orders() {
        let rt = TestDispatcher::new()
            .orders(InMemoryOrderStore::with_orders(vec![Order {
                user_id: 42,
                ..Order::default()
            }]))
            .build();
        rt.orders.set_fail_reads(true);

        rt.say(&customer(), "/start").await;
        assert_eq!(rt.messenger.texts_to(42), vec![prompts::WELCOME]);
        rt.say(&customer(), "/myorders").await;
        assert_eq!(
            rt.messenger.last_to(42).map(|m| m.text),
            Some(prompts::NO_ORDERS.to_string())
        );
    }

    #[tokio::test]
    async fn test_one_admin_failure_does_not_block_others() {
        let rt = TestDispatcher::new()
            .messenger(RecordingMessenger::new().failing_for(1).stalled_for(2))
            .build();
        submit_order(&rt, &customer(), Some("ph")).await;

        assert!(rt.messenger.sent_to(1).is_empty());
        assert!(rt.messenger.sent_to(2).is_empty());
        assert_eq!(rt.messenger.sent_to(3).len(), 2);
        assert_eq!(rt.orders.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_contact_admins_lists_roster() {
        let rt = TestDispatcher::new().admins(vec![10, 20]).build();
        let ivan = customer();
        rt.press(&ivan, Action::ContactAdmins).await;
        let text = rt.messenger.last_to(42).unwrap().text;
        assert!(text.contains("tg://user?id=10"));
        assert!(text.contains("tg://user?id=20"));
    }

    #[tokio::test]
    async fn test_guide_link_on_menu() {
        let rt = TestDispatcher::new()
            .guide_url("https://example.com/guide")
            .build();
        rt.say(&customer(), "/start").await;
        let welcome = rt.messenger.last_to(42).unwrap();
        let keyboard = welcome.keyboard.unwrap();
        assert!(keyboard.rows.iter().flatten().any(|b| matches!(
            b,
            crate::state_machine::effect::Button::Link { url, .. } if url == "https://example.com/guide"
        )));
    }

    #[tokio::test]
    async fn test_run_loop_processes_stream_in_order() {
        let builder = TestDispatcher::new();
        assert_eq!(builder.settings().admins, ADMINS.to_vec());
        let rt = builder.build();
        let TestDispatcher {
            dispatcher,
            orders,
            messenger,
            sessions,
        } = rt;

        let (tx, rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(dispatcher.run(rx, cancel.clone()));

        let ivan = customer();
        let events = [
            Event::from_message_text("/start"),
            Event::button(Action::StartOrder),
            Event::text("AB123"),
            Event::text("42"),
            Event::text("-"),
            Event::text("Moscow"),
            Event::text("courier"),
            Event::button(Action::SkipPhoto),
            Event::text("@ivan"),
        ];
        for event in events {
            tx.send(Inbound::new(ivan.clone(), event)).await.unwrap();
        }
        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(orders.orders().len(), 1);
        assert_eq!(messenger.sent_to(1).len(), 1);
        assert_eq!(sessions.len().await, 0);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_run_loop_stops_on_cancel() {
        let rt = TestDispatcher::new().build();
        let (_tx, rx) = mpsc::channel::<Inbound>(1);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(rt.dispatcher.run(rx, cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_abandoned_session_resumes_where_it_stopped() {
        let rt = TestDispatcher::new().build();
        let ivan = customer();
        rt.say(&ivan, "/start").await;
        rt.press(&ivan, Action::StartOrder).await;
        rt.say(&ivan, "AB123").await;
        assert_eq!(
            rt.sessions.load(42).await,
            Some(Session {
                step: Step::Size,
                draft: Order {
                    article: "AB123".to_string(),
                    ..Order::default()
                },
                waiting_photo: false,
            })
        );
    }
}
