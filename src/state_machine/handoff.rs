//! Admin handoff protocol
//!
//! Coordinates the price relay between administrators and a customer. The two
//! sides never share dialogue state; they meet only in the order store, through
//! owner-keyed status changes.

use super::effect::{Effect, OutboundMessage};
use super::event::Action;
use super::prompts;
use super::state::{DialogueContext, PriceCapture};
use crate::db::{Order, OrderStatus, StatusChange, UserId};

/// Per-administrator notification batches for a freshly submitted order
///
/// Each batch is the summary with the action choice, followed by the photo
/// when the order has one.
pub fn fan_out(admins: &[UserId], order: &Order) -> Effect {
    let batches = admins
        .iter()
        .map(|&admin| {
            let mut batch = vec![OutboundMessage::text(admin, prompts::admin_summary(order))
                .with_keyboard(prompts::admin_actions_keyboard(order.user_id))];
            if let Some(photo) = &order.photo_file_id {
                batch.push(OutboundMessage::photo(admin, photo.clone()));
            }
            batch
        })
        .collect();
    Effect::FanOut { batches }
}

/// Effects for a handoff button press (see [`Action::is_handoff`])
///
/// Admin actions from actors outside the roster produce nothing.
pub fn on_action(ctx: &DialogueContext, action: Action) -> Vec<Effect> {
    let actor = ctx.actor.id;
    match action {
        Action::AdminPrice { customer } if ctx.is_admin() => vec![
            Effect::BeginPriceCapture {
                admin: actor,
                customer,
            },
            Effect::say(actor, prompts::ASK_PRICE),
        ],
        Action::AdminReject { customer } if ctx.is_admin() => vec![Effect::ChangeStatus {
            change: StatusChange::new(customer, OrderStatus::Pending, OrderStatus::Rejected),
            on_success: vec![Effect::say(customer, prompts::REJECTED)],
            on_noop: vec![Effect::say(actor, prompts::NOTHING_PENDING)],
        }],
        Action::Accept => resolve(ctx, actor, true),
        Action::Decline => resolve(ctx, actor, false),
        _ => vec![],
    }
}

/// The captured admin text becomes the price quote for the customer
pub fn on_captured_text(ctx: &DialogueContext, capture: &PriceCapture, text: &str) -> Vec<Effect> {
    let admin = ctx.actor.id;
    let customer = capture.customer;
    vec![Effect::ChangeStatus {
        change: StatusChange::new(customer, OrderStatus::Pending, OrderStatus::PriceSent)
            .with_admin_message(text),
        on_success: vec![
            Effect::send(
                OutboundMessage::text(customer, text)
                    .with_keyboard(prompts::price_response_keyboard()),
            ),
            Effect::say(admin, prompts::PRICE_RELAYED),
        ],
        on_noop: vec![Effect::say(admin, prompts::NOTHING_PENDING)],
    }]
}

fn resolve(ctx: &DialogueContext, customer: UserId, confirmed: bool) -> Vec<Effect> {
    let (to, notice) = if confirmed {
        (OrderStatus::Confirmed, prompts::CONFIRMED)
    } else {
        (OrderStatus::Declined, prompts::DECLINED)
    };
    let admin_notice = prompts::customer_resolved(customer, confirmed);
    let batches = ctx
        .admins
        .iter()
        .map(|&admin| vec![OutboundMessage::text(admin, admin_notice.clone())])
        .collect();
    vec![Effect::ChangeStatus {
        change: StatusChange::new(customer, OrderStatus::PriceSent, to),
        on_success: vec![Effect::say(customer, notice), Effect::FanOut { batches }],
        on_noop: vec![],
    }]
}
