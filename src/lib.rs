//! AI-written answers to marketplace reviews, with a Telegram settings menu.

pub mod backend;
pub mod buckets;
pub mod config;
pub mod generator;
pub mod handler;
pub mod normalize;
pub mod quality;
pub mod settings;
pub mod telegram_log;
pub mod template;

use backend::Client;
use buckets::BucketStore;
use config::Config;
use generator::Generator;
use handler::{ResponderOptions, ReviewResponder};

/// Build the review responder described by a loaded config.
pub fn responder_from_config(config: &Config) -> Result<ReviewResponder<Client>, backend::Error> {
    let client = Client::new(config.backend_url.clone(), config.backend_api_key.clone())?;
    let generator = Generator::new(client, config.models.clone());
    let options = ResponderOptions {
        min_stars: config.min_stars,
        answer_only_on_new_feedback: config.answer_only_on_new_feedback,
    };
    Ok(ReviewResponder::new(BucketStore::new(config.buckets_path()), generator, options))
}
