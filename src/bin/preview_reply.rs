//! Runs the reply pipeline for a made-up review and prints the answer
//! instead of posting it. Handy for trying out prompt edits.
//!
//! Usage: cargo run --bin preview_reply <config.json> <stars> <review text> [item title]

use std::sync::Mutex;

use gpt_reviews::config::Config;
use gpt_reviews::handler::{Account, AccountError, FeedbackEvent, MessageType, Order, Outcome, Review};

const PREVIEW_ORDER_ID: &str = "PREVIEW0";

/// Serves one fixed order and keeps the answer instead of sending it.
struct PreviewAccount {
    order: Order,
    answer: Mutex<Option<String>>,
}

impl Account for PreviewAccount {
    async fn get_order(&self, order_id: &str) -> Result<Order, AccountError> {
        if order_id != self.order.id {
            return Err(AccountError(format!("unknown order {order_id}")));
        }
        Ok(self.order.clone())
    }

    async fn send_review(&self, _order_id: &str, _rating: Option<u8>, text: &str) -> Result<(), AccountError> {
        *self.answer.lock().map_err(|e| AccountError(e.to_string()))? = Some(text.to_string());
        Ok(())
    }
}

fn usage() -> ! {
    eprintln!("Usage: preview_reply <config.json> <stars 1-5> <review text> [item title]");
    std::process::exit(2);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        usage();
    }
    let Ok(stars) = args[2].parse::<u8>() else {
        usage();
    };

    let config = match Config::load(&args[1]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let responder = match gpt_reviews::responder_from_config(&config) {
        Ok(responder) => responder,
        Err(e) => {
            eprintln!("Failed to create backend client: {e}");
            std::process::exit(1);
        }
    };

    let account = PreviewAccount {
        order: Order {
            id: PREVIEW_ORDER_ID.to_string(),
            buyer_username: "preview_buyer".to_string(),
            title: args.get(4).cloned(),
            sum: 100.0,
            description: None,
            subcategory: None,
            review: Some(Review { stars, text: args[3].clone() }),
        },
        answer: Mutex::new(None),
    };
    let event = FeedbackEvent {
        message_type: MessageType::NewFeedback,
        text: format!("Покупатель preview_buyer написал отзыв к заказу #{PREVIEW_ORDER_ID}."),
    };

    match responder.process(&event, &account).await {
        Ok(Outcome::Replied { .. }) => {
            let posted = account.answer.lock().ok().and_then(|a| a.clone()).unwrap_or_default();
            println!("{posted}");
            println!("\n({} characters)", posted.chars().count());
        }
        Ok(Outcome::Skipped(reason)) => println!("No reply: {reason:?}"),
        Err(e) => {
            eprintln!("Failed: {e}");
            std::process::exit(1);
        }
    }
}
