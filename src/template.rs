//! Prompt templating: fills order and review fields into a bucket's template.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

use crate::handler::Order;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(categoryfull|category|cost|disc|rating|name|item|text)\}")
        .expect("placeholder pattern is valid")
});

/// Order and review fields available to a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewContext {
    pub buyer_name: Option<String>,
    pub item_title: Option<String>,
    pub cost: Option<String>,
    pub stars: Option<u8>,
    pub review_text: Option<String>,
    pub category: Option<String>,
    pub category_full: Option<String>,
    pub description: Option<String>,
}

impl ReviewContext {
    pub fn from_order(order: &Order) -> Self {
        let subcategory = order.subcategory.as_ref();
        let review = order.review.as_ref();
        Self {
            buyer_name: Some(order.buyer_username.clone()),
            item_title: order.title.clone(),
            cost: Some(format_cost(order.sum)),
            stars: review.map(|r| r.stars),
            review_text: review.map(|r| r.text.clone()),
            category: subcategory.map(|s| s.name.clone()),
            category_full: subcategory.map(|s| s.fullname.clone()),
            description: order.description.clone(),
        }
    }

    fn value(&self, placeholder: &str) -> String {
        let or_empty = |v: &Option<String>| v.clone().unwrap_or_default();
        match placeholder {
            "name" => or_empty(&self.buyer_name),
            "item" => or_empty(&self.item_title),
            "cost" => or_empty(&self.cost),
            "rating" => self.stars.map(|s| s.to_string()).unwrap_or_default(),
            "text" => or_empty(&self.review_text),
            "category" => or_empty(&self.category),
            "categoryfull" => or_empty(&self.category_full),
            "disc" => self.description.clone().unwrap_or_else(|| "N/A".to_string()),
            _ => String::new(),
        }
    }
}

/// Whole sums print without a fractional part.
fn format_cost(sum: f64) -> String {
    if sum.fract() == 0.0 && sum.abs() < 1e15 {
        format!("{}", sum as i64)
    } else {
        sum.to_string()
    }
}

/// Substitute every known placeholder in one pass. Unknown `{tokens}` are
/// kept, and substituted values are never rescanned.
pub fn build(template: &str, ctx: &ReviewContext) -> String {
    let prompt = PLACEHOLDER
        .replace_all(template, |caps: &Captures| ctx.value(&caps[1]))
        .into_owned();
    debug!("Processed prompt: {prompt}");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Review, Subcategory};

    fn full_context() -> ReviewContext {
        ReviewContext {
            buyer_name: Some("Alice".to_string()),
            item_title: Some("1000 золота".to_string()),
            cost: Some("150".to_string()),
            stars: Some(5),
            review_text: Some("Всё быстро, спасибо".to_string()),
            category: Some("Золото".to_string()),
            category_full: Some("World of Warcraft, Золото".to_string()),
            description: Some("Сервер Гордунни".to_string()),
        }
    }

    #[test]
    fn test_all_placeholders() {
        let template = "{name}|{item}|{cost}|{rating}|{text}|{category}|{categoryfull}|{disc}";
        assert_eq!(
            build(template, &full_context()),
            "Alice|1000 золота|150|5|Всё быстро, спасибо|Золото|World of Warcraft, Золото|Сервер Гордунни"
        );
    }

    #[test]
    fn test_literal_text_is_kept() {
        let template = "Привет, {name}! Оценка {rating} из 5.\nСпасибо.";
        let out = build(template, &full_context());
        assert_eq!(out, "Привет, Alice! Оценка 5 из 5.\nСпасибо.");
        for placeholder in ["{name}", "{rating}"] {
            assert!(!out.contains(placeholder));
        }
    }

    #[test]
    fn test_repeated_placeholder() {
        assert_eq!(build("{name} {name}", &full_context()), "Alice Alice");
    }

    #[test]
    fn test_unknown_tokens_untouched() {
        let out = build("{unknown} {Name} { name } {name", &full_context());
        assert_eq!(out, "{unknown} {Name} { name } {name");
    }

    #[test]
    fn test_missing_fields() {
        let out = build("[{name}][{text}][{rating}][{category}][{disc}]", &ReviewContext::default());
        assert_eq!(out, "[][][][][N/A]");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mut ctx = full_context();
        ctx.review_text = Some("мой ник {name}".to_string());
        assert_eq!(build("{text} / {name}", &ctx), "мой ник {name} / Alice");
    }

    #[test]
    fn test_category_does_not_shadow_categoryfull() {
        let out = build("{category}:{categoryfull}", &full_context());
        assert_eq!(out, "Золото:World of Warcraft, Золото");
    }

    #[test]
    fn test_from_order() {
        let order = Order {
            id: "ABCD1234".to_string(),
            buyer_username: "bob".to_string(),
            title: None,
            sum: 99.5,
            description: None,
            subcategory: Some(Subcategory { name: "Аккаунты".to_string(), fullname: "Dota 2, Аккаунты".to_string() }),
            review: Some(Review { stars: 4, text: "ok".to_string() }),
        };
        let ctx = ReviewContext::from_order(&order);
        assert_eq!(
            build("{name} {item}|{cost} {rating} {text} {category} {disc}", &ctx),
            "bob |99.5 4 ok Аккаунты N/A"
        );
        assert_eq!(format_cost(150.0), "150");
    }
}
