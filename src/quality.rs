//! Quality gate for generated replies.

/// Attribution some free backends append to every answer.
pub const BOILERPLATE: &str = "Generated by BLACKBOX.AI, try unlimited chat https://www.blackbox.ai";

/// Shortest acceptable reply, in characters, after the boilerplate is removed.
pub const MINIMUM_RESPONSE_LENGTH: usize = 15;

/// Error texts that backends return as if they were answers.
const ERROR_SENTINELS: [&str; 3] = [
    "Unable to decode JSON response\u{2061}",
    "Model not found or too long input. Or any other error (xD)",
    "Request ended with status code",
];

const CODE_FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// CJK ideographs: the model answered in the wrong language.
    Cjk,
    TooShort,
    ErrorSentinel,
    CodeBlock,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Cjk => write!(f, "contains CJK characters"),
            Rejection::TooShort => write!(f, "shorter than {MINIMUM_RESPONSE_LENGTH} characters"),
            Rejection::ErrorSentinel => write!(f, "backend error text"),
            Rejection::CodeBlock => write!(f, "contains a code block"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

fn is_cjk(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

pub fn check(content: &str) -> Verdict {
    if content.chars().any(is_cjk) {
        return Verdict::Reject(Rejection::Cjk);
    }

    let stripped = content.replace(BOILERPLATE, "");
    if stripped.chars().count() < MINIMUM_RESPONSE_LENGTH {
        return Verdict::Reject(Rejection::TooShort);
    }

    if ERROR_SENTINELS.iter().any(|s| stripped.contains(s)) {
        return Verdict::Reject(Rejection::ErrorSentinel);
    }

    if stripped.contains(CODE_FENCE) {
        return Verdict::Reject(Rejection::CodeBlock);
    }

    Verdict::Accept
}

pub fn needs_regeneration(content: &str) -> bool {
    matches!(check(content), Verdict::Reject(_))
}
