//! Pure dialogue transition function
//!
//! Given the same session, context and event it always produces the same new
//! session and effects; all I/O happens in the runtime.

use super::effect::{Effect, OutboundMessage};
use super::event::{Action, Command, Event};
use super::state::{DialogueContext, Session, Step};
use super::{handoff, prompts};
use crate::db::OrderStatus;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: Session) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    /// The event means nothing at this step and is dropped without a reply
    #[error("Ignored {event} at step {step:?}")]
    Ignored { step: Step, event: &'static str },
}

/// Pure transition function
#[allow(clippy::too_many_lines)]
pub fn transition(
    session: &Session,
    ctx: &DialogueContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let actor = ctx.actor.id;
    let guide = ctx.guide_url.as_deref();

    match (session.step, event) {
        // ============================================================
        // Commands override every step
        // ============================================================
        (_, Event::Command(Command::Start)) => Ok(TransitionResult::new(Session::default())
            .with_effect(Effect::CancelPriceCapture { admin: actor })
            .with_effect(Effect::ResolveMenu { owner: actor })),

        (_, Event::Command(Command::MyOrders)) => {
            Ok(TransitionResult::new(session.clone()).with_effect(load_orders(ctx)))
        }

        // ============================================================
        // Generated by effect execution
        // ============================================================
        (_, Event::OrdersLoaded { orders }) => Ok(TransitionResult::new(session.clone())
            .with_effect(Effect::say(actor, prompts::my_orders(&orders)))),

        (Step::Menu | Step::Welcome, Event::MenuResolved { has_orders: true }) => {
            Ok(TransitionResult::new(session.advance(Step::Menu)).with_effect(Effect::send(
                OutboundMessage::text(actor, prompts::MENU)
                    .with_keyboard(prompts::main_menu_keyboard(guide)),
            )))
        }

        (Step::Menu | Step::Welcome, Event::MenuResolved { has_orders: false }) => {
            Ok(TransitionResult::new(session.advance(Step::Welcome)).with_effect(Effect::send(
                OutboundMessage::text(actor, prompts::WELCOME)
                    .with_keyboard(prompts::welcome_keyboard(guide)),
            )))
        }

        // ============================================================
        // Handoff buttons work regardless of the dialogue step
        // ============================================================
        (_, Event::Button {
            action: Some(action),
        }) if action.is_handoff() => {
            Ok(TransitionResult::new(session.clone()).with_effects(handoff::on_action(ctx, action)))
        }

        // ============================================================
        // Menu & Welcome
        // ============================================================
        (
            Step::Menu | Step::Welcome,
            Event::Button {
                action: Some(Action::StartOrder),
            },
        ) => Ok(start_order(actor)),

        (
            Step::Menu | Step::Welcome,
            Event::Button {
                action: Some(Action::MyOrders),
            },
        ) => Ok(TransitionResult::new(session.clone()).with_effect(load_orders(ctx))),

        (
            Step::Menu | Step::Welcome,
            Event::Button {
                action: Some(Action::ContactAdmins),
            },
        ) => Ok(TransitionResult::new(session.clone())
            .with_effect(Effect::say(actor, prompts::contact_admins(&ctx.admins)))),

        (Step::Menu, Event::Text { .. } | Event::Button { .. }) => {
            Ok(TransitionResult::new(session.clone()).with_effect(Effect::ResolveMenu { owner: actor }))
        }

        (Step::Welcome, Event::Text { .. } | Event::Button { .. }) => {
            Ok(TransitionResult::new(session.clone()).with_effect(Effect::send(
                OutboundMessage::text(actor, prompts::WELCOME)
                    .with_keyboard(prompts::welcome_keyboard(guide)),
            )))
        }

        // ============================================================
        // Free-text steps: store verbatim and advance
        // ============================================================
        (Step::Article, Event::Text { text }) => {
            let mut next = session.advance(Step::Size);
            next.draft.article = text;
            Ok(TransitionResult::new(next).with_effect(Effect::say(actor, prompts::ASK_SIZE)))
        }

        (Step::Size, Event::Text { text }) => {
            let mut next = session.advance(Step::Color);
            next.draft.size = text;
            Ok(TransitionResult::new(next).with_effect(Effect::say(actor, prompts::ASK_COLOR)))
        }

        (Step::Color, Event::Text { text }) => {
            let mut next = session.advance(Step::City);
            next.draft.color = text;
            Ok(TransitionResult::new(next).with_effect(Effect::say(actor, prompts::ASK_CITY)))
        }

        (Step::City, Event::Text { text }) => {
            let mut next = session.advance(Step::Delivery);
            next.draft.city = text;
            Ok(TransitionResult::new(next).with_effect(Effect::say(actor, prompts::ASK_DELIVERY)))
        }

        (Step::Delivery, Event::Text { text }) => {
            let mut next = session.advance(Step::WantPhoto);
            next.draft.delivery = text;
            Ok(TransitionResult::new(next).with_effect(Effect::send(
                OutboundMessage::text(actor, prompts::ASK_PHOTO_CHOICE)
                    .with_keyboard(prompts::photo_choice_keyboard()),
            )))
        }

        // ============================================================
        // Photo choice
        // ============================================================
        (
            Step::WantPhoto,
            Event::Button {
                action: Some(Action::AttachPhoto),
            },
        ) => {
            let mut next = session.advance(Step::WaitPhotoUpload);
            next.waiting_photo = true;
            Ok(TransitionResult::new(next).with_effect(Effect::say(actor, prompts::ASK_PHOTO)))
        }

        (
            Step::WantPhoto,
            Event::Button {
                action: Some(Action::SkipPhoto),
            },
        ) => Ok(TransitionResult::new(session.advance(Step::Contact))
            .with_effect(Effect::say(actor, prompts::ASK_CONTACT))),

        (Step::WantPhoto, Event::Text { .. } | Event::Button { .. } | Event::Photo { .. }) => {
            Ok(TransitionResult::new(session.clone()).with_effect(Effect::send(
                OutboundMessage::text(actor, prompts::REPEAT_PHOTO_CHOICE)
                    .with_keyboard(prompts::photo_choice_keyboard()),
            )))
        }

        (Step::WaitPhotoUpload, Event::Photo { file_id }) if session.waiting_photo => {
            let mut next = session.advance(Step::Contact);
            next.waiting_photo = false;
            next.draft.photo_file_id = Some(file_id);
            Ok(TransitionResult::new(next).with_effect(Effect::say(actor, prompts::ASK_CONTACT)))
        }

        // ============================================================
        // Submission
        // ============================================================
        (Step::Contact, Event::Text { text }) => {
            let mut order = session.draft.clone();
            order.contact = text;
            order.user_id = actor;
            order.username = ctx.actor.handle().to_string();
            order.full_name = ctx.actor.full_name();
            order.status = OrderStatus::Pending;
            order.admin_message = None;

            let fan_out = handoff::fan_out(&ctx.admins, &order);
            Ok(TransitionResult::new(Session {
                step: Step::Submitted,
                draft: order.clone(),
                waiting_photo: false,
            })
            .with_effect(Effect::AppendOrder(order))
            .with_effect(Effect::say(actor, prompts::SUBMITTED))
            .with_effect(fan_out))
        }

        // ============================================================
        // Everything else is dropped
        // ============================================================
        (step, event) => Err(TransitionError::Ignored {
            step,
            event: event_kind(&event),
        }),
    }
}

/// Starting an order prompts for the article in the same step
fn start_order(actor: crate::db::UserId) -> TransitionResult {
    TransitionResult::new(Session::at(Step::Article))
        .with_effect(Effect::say(actor, prompts::ASK_ARTICLE))
}

fn load_orders(ctx: &DialogueContext) -> Effect {
    Effect::LoadOrders {
        owner: ctx.actor.id,
        handle: ctx.actor.handle().to_string(),
    }
}

fn event_kind(event: &Event) -> &'static str {
    match event {
        Event::Command(_) => "command",
        Event::Text { .. } => "text",
        Event::Photo { .. } => "photo",
        Event::Button { .. } => "button",
        Event::MenuResolved { .. } => "menu_resolved",
        Event::OrdersLoaded { .. } => "orders_loaded",
    }
}
