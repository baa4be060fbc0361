//! Message copy, choice sets and summaries shown to actors

use super::effect::{Button, Keyboard};
use super::event::Action;
use crate::db::{Order, UserId};
use std::fmt::Write;

pub const WELCOME: &str = "Hi!\nHow to place an order:\n\
1. Open the marketplace app\n\
2. Find the item and copy its article code\n\
3. Tell us the size and delivery details\n\
4. We will send you the price and options";
pub const MENU: &str = "👋 Welcome back!\nYou can:\n\
- 📨 Place a new order\n\
- 📦 Check your orders\n\
- 💬 Message us";
pub const ASK_ARTICLE: &str = "🔢 Enter the item's article code:";
pub const ASK_SIZE: &str = "📏 Enter the size (EU/US/CN):";
pub const ASK_COLOR: &str = "🎨 Enter the color/model (or '-' if there is only one):";
pub const ASK_CITY: &str = "📍 Enter your city:";
pub const ASK_DELIVERY: &str = "🚚 Enter the delivery method:";
pub const ASK_PHOTO_CHOICE: &str = "Would you like to attach a screenshot of the item?";
pub const REPEAT_PHOTO_CHOICE: &str = "Please pick one of the options below.";
pub const ASK_PHOTO: &str = "Send a photo of the item:";
pub const ASK_CONTACT: &str = "☎️ How can we reach you? (name and Telegram handle or phone)";
pub const SUBMITTED: &str = "🎉 Thank you! We will check the item and send you:\n\
- The final price\n\
- Delivery time\n\
- Payment options\n\
This usually takes 10–20 minutes.";
pub const NO_ORDERS: &str = "You have no orders.";
pub const ASK_PRICE: &str = "Enter the message for the customer (price, delivery time, payment):";
pub const PRICE_RELAYED: &str = "✅ Sent to the customer.";
pub const NOTHING_PENDING: &str = "This order has already been handled.";
pub const REJECTED: &str = "❌ Your order was rejected by an administrator.";
pub const CONFIRMED: &str =
    "🚀 Order accepted! We will let you know once the item is in stock or on its way.";
pub const DECLINED: &str = "❌ Order cancelled.";
pub const STORE_FAILURE: &str = "⚠️ Something went wrong on our side. Please try again.";

pub fn main_menu_keyboard(guide_url: Option<&str>) -> Keyboard {
    let keyboard = Keyboard::default()
        .row([Button::action("📨 Place an order", Action::StartOrder)])
        .row([Button::action("📦 My orders", Action::MyOrders)])
        .row([Button::action("💬 Message us", Action::ContactAdmins)]);
    match guide_url {
        Some(url) => keyboard.row([Button::link("📖 Full guide", url)]),
        None => keyboard,
    }
}

pub fn welcome_keyboard(guide_url: Option<&str>) -> Keyboard {
    let mut row = vec![Button::action("📨 Place an order", Action::StartOrder)];
    if let Some(url) = guide_url {
        row.push(Button::link("📖 Full guide", url));
    }
    Keyboard::default().row(row)
}

pub fn photo_choice_keyboard() -> Keyboard {
    Keyboard::default().row([
        Button::action("Yes", Action::AttachPhoto),
        Button::action("Skip", Action::SkipPhoto),
    ])
}

pub fn admin_actions_keyboard(customer: UserId) -> Keyboard {
    Keyboard::default().row([
        Button::action("✅ Send price", Action::AdminPrice { customer }),
        Button::action("❌ Reject", Action::AdminReject { customer }),
    ])
}

pub fn price_response_keyboard() -> Keyboard {
    Keyboard::default().row([
        Button::action("✅ Confirm", Action::Accept),
        Button::action("❌ Decline", Action::Decline),
    ])
}

/// Summary sent to administrators for a new order
pub fn admin_summary(order: &Order) -> String {
    format!(
        "New order!\nName: {}\nUsername: @{}\nArticle: {}\nSize: {}\nColor: {}\nCity: {}\nDelivery: {}\nContact: {}",
        order.full_name,
        order.username,
        order.article,
        order.size,
        order.color,
        order.city,
        order.delivery,
        order.contact,
    )
}

/// The actor's order history, oldest first
pub fn my_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return NO_ORDERS.to_string();
    }
    let mut out = String::new();
    for o in orders {
        let _ = write!(
            out,
            "Item: {}\nSize: {}\nColor: {}\nCity: {}\nStatus: {}\n",
            o.article, o.size, o.color, o.city, o.status
        );
        if let Some(message) = &o.admin_message {
            let _ = writeln!(out, "Quote: {message}");
        }
        out.push_str("---\n");
    }
    out
}

pub fn contact_admins(admins: &[UserId]) -> String {
    let mut out = String::from("Contact the administrators:\n");
    for id in admins {
        let _ = writeln!(out, "- tg://user?id={id}");
    }
    out
}

/// Resolution notice for administrators
pub fn customer_resolved(customer: UserId, confirmed: bool) -> String {
    if confirmed {
        format!("Customer {customer} confirmed the order.")
    } else {
        format!("Customer {customer} declined the order.")
    }
}
