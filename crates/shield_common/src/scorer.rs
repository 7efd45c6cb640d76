//! Rule-based risk scorer.
//!
//! Pure and deterministic: the same text always produces the same score and
//! flag list, with no external calls and no state. Each rule contributes
//! independently and the total is clamped to 0-100, so the score scales
//! with evidence density.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::message::ScoreResult;

/// Weight added per matching suspicious-phrase group.
const KEYWORD_WEIGHT: u32 = 18;
/// Weight added when the text contains at least one URL.
const URL_WEIGHT: u32 = 12;
/// Extra weight when a URL points at a known link shortener.
const SHORTENER_WEIGHT: u32 = 25;
/// Weight for an explicit money amount.
const MONEY_WEIGHT: u32 = 12;
/// Weight for repeated exclamation marks.
const URGENT_PUNCTUATION_WEIGHT: u32 = 8;
/// Weight for disproportionate uppercase.
const SHOUTING_WEIGHT: u32 = 6;

/// Maximum number of flags reported per message.
pub const MAX_FLAGS: usize = 8;

/// Display cap for the URL flag.
const URL_FLAG_MAX_LEN: usize = 200;

/// Suspicious phrase groups, matched case-insensitively. Each group counts
/// once no matter how many of its alternatives appear, so near-synonyms do
/// not stack the same signal.
static KEYWORD_GROUPS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        (
            "money transfer request",
            r"wire transfer|western union|bank transfer|money transfer|send money|\bdeposit\b|\bloan\b",
        ),
        (
            "urgency language",
            r"\burgent\b|act now|right away|immediately|final notice|limited time",
        ),
        (
            "credential request",
            r"verify your (?:account|identity)|confirm your (?:account|identity)|verify identity|\bpassword\b",
        ),
        (
            "account suspension threat",
            r"account[^.!?]{0,48}suspend|account (?:locked|closed|deactivated)",
        ),
        (
            "prize or lottery",
            r"congratulations|\bprize\b|\blottery\b|\bwinner\b|you(?:'ve| have)? won",
        ),
        (
            "claim or click now",
            r"claim now|claim your|click the link",
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| {
        let re = Regex::new(&format!("(?i){pattern}")).expect("keyword pattern");
        (name, re)
    })
    .collect()
});

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("url pattern"));

static SHORTENER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:bit\.ly|tinyurl|t\.co|goo\.gl|ow\.ly|tiny\.cc|is\.gd|buff\.ly)\b")
        .expect("shortener pattern")
});

static MONEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\s?\d{2,}").expect("money pattern"));

static USD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d+\s?usd").expect("usd pattern"));

static BANG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!!+").expect("bang pattern"));

/// Score a message text. Empty or whitespace-only text scores 0 with no
/// flags; callers wanting a distinct "nothing to analyze" reply must reject
/// such input before scoring.
pub fn score(text: &str) -> ScoreResult {
    if text.trim().is_empty() {
        return ScoreResult {
            score: 0,
            flags: Vec::new(),
        };
    }

    let mut total: u32 = 0;
    let mut flags: Vec<String> = Vec::new();

    for (name, re) in KEYWORD_GROUPS.iter() {
        if re.is_match(text) {
            total += KEYWORD_WEIGHT;
            flags.push(format!("Suspicious phrase: {name}"));
        }
    }

    let urls: Vec<&str> = URL_RE.find_iter(text).map(|m| m.as_str()).collect();
    if !urls.is_empty() {
        total += URL_WEIGHT;
        flags.push(format!(
            "Contains URL: {}",
            truncate(&urls.join(", "), URL_FLAG_MAX_LEN)
        ));
        if urls.iter().any(|u| SHORTENER_RE.is_match(u)) {
            total += SHORTENER_WEIGHT;
            flags.push("Shortened URL".to_string());
        }
    }

    if MONEY_RE.is_match(text) || USD_RE.is_match(text) {
        total += MONEY_WEIGHT;
        flags.push("Mentions a money amount".to_string());
    }

    if BANG_RE.is_match(text) {
        total += URGENT_PUNCTUATION_WEIGHT;
        flags.push("Urgent punctuation".to_string());
    }

    let length = text.chars().count();
    let uppercase = text.chars().filter(|c| c.is_uppercase()).count();
    if uppercase > shouting_threshold(length) {
        total += SHOUTING_WEIGHT;
        flags.push("Many uppercase characters".to_string());
    }

    flags.truncate(MAX_FLAGS);
    ScoreResult {
        score: total.min(100) as u8,
        flags,
    }
}

/// Uppercase count above which a text reads as shouting.
fn shouting_threshold(length: usize) -> usize {
    std::cmp::max(6, length * 12 / 100)
}

/// Char-boundary-safe prefix truncation for display.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_score_zero() {
        for text in ["", "   ", "\n\t "] {
            let result = score(text);
            assert_eq!(result.score, 0);
            assert!(result.flags.is_empty());
        }
    }

    #[test]
    fn benign_text_scores_zero() {
        let result = score("Hey, are we still meeting at 5pm?");
        assert_eq!(result.score, 0);
        assert!(result.flags.is_empty());
    }

    #[test]
    fn scoring_is_deterministic() {
        let text = "URGENT!! send money via wire transfer";
        assert_eq!(score(text), score(text));
    }

    #[test]
    fn score_never_exceeds_100() {
        let text = "URGENT wire transfer $500 USD!! CONGRATULATIONS WINNER \
                    claim now verify your account or your account will be suspended \
                    click the link http://bit.ly/x AND DO IT RIGHT AWAY";
        let result = score(text);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn flags_are_capped_at_eight() {
        // Triggers all six keyword groups plus URL, shortener, money,
        // punctuation and shouting: eleven contributions.
        let text = "URGENT wire transfer $500 USD!! CONGRATULATIONS WINNER \
                    claim now verify your account or your account will be suspended \
                    click the link http://bit.ly/x AND DO IT NOW";
        let result = score(text);
        assert_eq!(result.flags.len(), MAX_FLAGS);
        // Keyword flags come first, in group order.
        assert!(result.flags[0].contains("money transfer request"));
    }

    #[test]
    fn urgent_shortener_example_scores_99() {
        let text =
            "URGENT!! Verify your account now or it will be suspended. Click http://bit.ly/xyz";
        let result = score(text);
        // Three keyword groups (54) + URL (12) + shortener (25) + !! (8).
        assert_eq!(result.score, 99);
        assert_eq!(
            result
                .flags
                .iter()
                .filter(|f| f.starts_with("Suspicious phrase"))
                .count(),
            3
        );
    }

    #[test]
    fn prize_example_scores_36() {
        let result = score("Congratulations, you won a prize, claim now");
        // Exactly two keyword groups: prize language and claim-now phrasing.
        assert_eq!(result.score, 36);
        assert_eq!(result.flags.len(), 2);
    }

    #[test]
    fn plain_url_adds_12_without_shortener_bonus() {
        let result = score("see https://example.com/page for details");
        assert_eq!(result.score, 12);
        assert!(result.flags[0].starts_with("Contains URL"));
    }

    #[test]
    fn shortener_adds_25_on_top_of_url() {
        let result = score("see https://bit.ly/abc for details");
        assert_eq!(result.score, 37);
        assert!(result.flags.iter().any(|f| f == "Shortened URL"));
    }

    #[test]
    fn money_mentions() {
        assert_eq!(score("please send money, about $50 today").score, 18 + 12);
        assert_eq!(score("that will be 300 USD").score, 12);
        assert_eq!(score("it costs $5").score, 0); // one digit is not enough
    }

    #[test]
    fn urgency_punctuation_needs_two_bangs() {
        assert_eq!(score("really!! yes").score, URGENT_PUNCTUATION_WEIGHT as u8);
        assert_eq!(score("really! yes").score, 0);
    }

    #[test]
    fn shouting_threshold_scales_with_length() {
        // Short text: more than six uppercase chars required.
        assert_eq!(score("ABCDEFG rest is quiet text here").score, 6);
        assert_eq!(score("ABCDEF rest is quiet text here").score, 0);
    }

    #[test]
    fn url_flag_is_truncated_for_display() {
        let long_url = format!("http://example.com/{}", "a".repeat(400));
        let result = score(&long_url);
        let url_flag = &result.flags[0];
        assert!(url_flag.chars().count() <= URL_FLAG_MAX_LEN + "Contains URL: ".len());
    }
}
