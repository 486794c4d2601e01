//! Feedback event handling: order lookup, bucket checks and the reply pipeline.

use regex::Regex;
use std::fmt;
use std::future::Future;
use std::sync::LazyLock;
use tracing::{error, info};

use crate::backend::ChatBackend;
use crate::buckets::{BucketStore, RatingBucket};
use crate::generator::Generator;
use crate::normalize::normalize;
use crate::template::{self, ReviewContext};

/// Order ids appear in system messages as `#` followed by 8 characters.
static ORDER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Z0-9]{8})").expect("order id pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    NewFeedback,
    FeedbackChanged,
    Other,
}

/// A chat message event delivered by the host.
#[derive(Debug, Clone)]
pub struct FeedbackEvent {
    pub message_type: MessageType,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subcategory {
    pub name: String,
    pub fullname: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub stars: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub buyer_username: String,
    pub title: Option<String>,
    pub sum: f64,
    pub description: Option<String>,
    pub subcategory: Option<Subcategory>,
    pub review: Option<Review>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountError(pub String);

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account error: {}", self.0)
    }
}

impl std::error::Error for AccountError {}

/// The marketplace account, provided by the host.
pub trait Account: Send + Sync {
    fn get_order(&self, order_id: &str) -> impl Future<Output = Result<Order, AccountError>> + Send;

    /// Post `text` as the seller's answer. `rating: None` leaves the stars as they are.
    fn send_review(
        &self,
        order_id: &str,
        rating: Option<u8>,
        text: &str,
    ) -> impl Future<Output = Result<(), AccountError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a feedback event, or a changed feedback while only new ones are answered.
    EventType,
    BelowMinStars { stars: u8, min_stars: u8 },
    BucketDisabled(RatingBucket),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Replied { order_id: String, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    NoOrderId,
    Account(AccountError),
    NoReview { order_id: String },
    InvalidRating { order_id: String, stars: u8 },
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::NoOrderId => write!(f, "no order id in message"),
            HandleError::Account(e) => write!(f, "{e}"),
            HandleError::NoReview { order_id } => write!(f, "order {order_id} has no review"),
            HandleError::InvalidRating { order_id, stars } => {
                write!(f, "order {order_id} has invalid rating {stars}")
            }
        }
    }
}

impl std::error::Error for HandleError {}

impl From<AccountError> for HandleError {
    fn from(e: AccountError) -> Self {
        HandleError::Account(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponderOptions {
    /// Ignore reviews below this many stars; 0 answers every review.
    pub min_stars: u8,
    pub answer_only_on_new_feedback: bool,
}

impl Default for ResponderOptions {
    fn default() -> Self {
        Self { min_stars: 0, answer_only_on_new_feedback: true }
    }
}

pub fn extract_order_id(text: &str) -> Option<&str> {
    ORDER_ID.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Answers marketplace reviews with generated text.
pub struct ReviewResponder<B> {
    store: BucketStore,
    generator: Generator<B>,
    options: ResponderOptions,
}

impl<B: ChatBackend> ReviewResponder<B> {
    pub fn new(store: BucketStore, generator: Generator<B>, options: ResponderOptions) -> Self {
        Self { store, generator, options }
    }

    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    pub fn generator(&self) -> &Generator<B> {
        &self.generator
    }

    fn accepts(&self, message_type: MessageType) -> bool {
        match message_type {
            MessageType::NewFeedback => true,
            MessageType::FeedbackChanged => !self.options.answer_only_on_new_feedback,
            MessageType::Other => false,
        }
    }

    /// Run the pipeline for one event.
    pub async fn process<A: Account>(
        &self,
        event: &FeedbackEvent,
        account: &A,
    ) -> Result<Outcome, HandleError> {
        if !self.accepts(event.message_type) {
            return Ok(Outcome::Skipped(SkipReason::EventType));
        }

        let order_id = extract_order_id(&event.text).ok_or(HandleError::NoOrderId)?;
        let order = account.get_order(order_id).await?;

        let stars = order
            .review
            .as_ref()
            .map(|r| r.stars)
            .ok_or_else(|| HandleError::NoReview { order_id: order.id.clone() })?;
        let bucket = RatingBucket::from_stars(stars)
            .ok_or_else(|| HandleError::InvalidRating { order_id: order.id.clone(), stars })?;

        let min_stars = self.options.min_stars;
        if min_stars > 0 && stars < min_stars {
            return Ok(Outcome::Skipped(SkipReason::BelowMinStars { stars, min_stars }));
        }

        let buckets = self.store.load();
        if !buckets.answers(bucket) {
            return Ok(Outcome::Skipped(SkipReason::BucketDisabled(bucket)));
        }

        info!("Answering {stars}-star review on order #{}", order.id);
        let prompt = template::build(buckets.prompt_for(bucket), &ReviewContext::from_order(&order));
        let reply = self.generator.generate(&prompt).await;
        let text = normalize(&reply, order.title.as_deref().unwrap_or(""));

        account.send_review(&order.id, None, &text).await?;
        info!("Replied to review on order #{} ({} chars)", order.id, text.chars().count());

        Ok(Outcome::Replied { order_id: order.id, text })
    }

    /// Host entry point: failures are logged and the event is dropped.
    pub async fn on_new_message<A: Account>(&self, event: &FeedbackEvent, account: &A) {
        if let Err(e) = self.process(event, account).await {
            error!("An unexpected error occurred: {e}");
        }
    }
}
