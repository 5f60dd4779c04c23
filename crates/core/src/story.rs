use tracing::info;

use crate::{
    error::{Result, SpendreelError},
    provider::Provider,
    types::{PlaceTotal, StatementStory, StoryLine},
};

static STORY_PROMPT: &str = r#"You are a personal finance analyst. You receive the raw text of a bank statement.

You MUST output ONLY valid JSON matching this exact structure (no markdown, no explanation):
{
  "bank_name": "Name of the bank, or empty string",
  "summary": "Detailed summary of the spending in the period",
  "transactions": [
    {"date": "DD/MM", "merchant": "Account name or description", "amount": 5.00, "location": "City or null"}
  ],
  "categories": [
    {"name": "groceries", "total": 500.00}
  ],
  "financial_advice": "Advice based on the transactions",
  "spending_personality": "A label such as The Saver or The Splurger, and one line about it",
  "whatif_scenarios": "What-if scenarios and their long-term impact on savings",
  "story": [
    {"line": "One sentence of a short spending story, at least 10 words", "topic": "one physical object to search stock video for"}
  ],
  "youtube_search": "One search query for money saving videos"
}

Rules:
- transactions: ONLY money spent (debits), never incoming money
- amounts are plain numbers without currency symbols
- story: 4-8 lines based on the categories; each line is ONE sentence ending with a period
- never use a period inside a story line except at its end
- topic: a single concrete, filmable noun (e.g. "grocery", "coffee", "car")
- Output ONLY the JSON, nothing else"#;

/// Ask the language model for a structured story of the statement.
pub async fn extract_story(
    client: &reqwest::Client,
    provider: &Provider,
    statement_text: &str,
) -> Result<StatementStory> {
    let config = provider.config();
    let api_key = provider.validate_api_key()?;

    let user_prompt = format!("Here is the bank statement text:\n\n{}", statement_text);

    let response = client
        .post(config.api_url)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", api_key))
        .json(&serde_json::json!({
            "model": config.model,
            "messages": [
                {
                    "role": "system",
                    "content": STORY_PROMPT,
                },
                {
                    "role": "user",
                    "content": user_prompt,
                },
            ],
            "response_format": {"type": "json_object"},
            "temperature": 0.3,
        }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SpendreelError::StoryFailed {
            reason: format!("{} returned status {}: {}", provider.name(), status, body),
        });
    }

    let response = response.json::<serde_json::Value>().await?;
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| SpendreelError::StoryFailed {
            reason: format!("Invalid API response: {:?}", response),
        })?;

    let story = parse_story(content)?;
    info!(
        provider = provider.name(),
        lines = story.story.len(),
        transactions = story.transactions.len(),
        "story extracted"
    );
    Ok(story)
}

/// Parse model output into a story whose lines split back into exactly one sentence each.
pub fn parse_story(content: &str) -> Result<StatementStory> {
    let json = strip_code_fence(content);
    let mut story: StatementStory =
        serde_json::from_str(json).map_err(|e| SpendreelError::StoryFailed {
            reason: format!("{}; content was: {}", e, content),
        })?;

    story.story = story
        .story
        .into_iter()
        .filter_map(|StoryLine { line, topic }| {
            let line = normalize_line(&line)?;
            Some(StoryLine {
                line,
                topic: topic.trim().to_string(),
            })
        })
        .collect();

    if story.story.is_empty() {
        return Err(SpendreelError::StoryFailed {
            reason: "model returned no story lines".to_string(),
        });
    }

    Ok(story)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// One sentence ending in a single `.`; inner sentence breaks become commas.
fn normalize_line(line: &str) -> Option<String> {
    let body = line
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?') || c.is_whitespace());
    if body.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(body.len() + 1);
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        let breaks_sentence = matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|next| next.is_whitespace());
        out.push(if breaks_sentence { ',' } else { c });
    }
    out.push('.');
    Some(out)
}

impl StatementStory {
    /// Story lines as one narrative, without a final terminator so that every
    /// sentence lines up with a topic.
    pub fn narration(&self) -> String {
        let joined = self
            .story
            .iter()
            .map(|l| l.line.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        joined.trim_end_matches('.').to_string()
    }

    pub fn topics(&self) -> Vec<String> {
        self.story.iter().map(|l| l.topic.clone()).collect()
    }

    pub fn total_spent(&self) -> f64 {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    /// Spend per transaction location, largest first.
    ///
    /// Places match case-insensitively and keep the first spelling seen. Transactions
    /// without a usable location (missing, blank or `N/A`) are left out.
    pub fn spend_by_place(&self) -> Vec<PlaceTotal> {
        let mut totals: Vec<PlaceTotal> = Vec::new();

        for tx in &self.transactions {
            let Some(place) = tx.location.as_deref().map(str::trim) else {
                continue;
            };
            if place.is_empty() || place.eq_ignore_ascii_case("n/a") {
                continue;
            }

            match totals
                .iter_mut()
                .find(|t| t.place.to_lowercase() == place.to_lowercase())
            {
                Some(existing) => {
                    existing.total += tx.amount;
                    existing.transactions += 1;
                }
                None => totals.push(PlaceTotal {
                    place: place.to_string(),
                    total: tx.amount,
                    transactions: 1,
                }),
            }
        }

        totals.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.place.cmp(&b.place)));
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::split_sentences;

    const RESPONSE: &str = r#"```json
{
  "bank_name": "First Bank",
  "summary": "You spent $725.00 this month, mostly on groceries and rent.",
  "transactions": [
    {"date": "12/01", "merchant": "Starbucks", "amount": 5.0, "location": "New York"},
    {"date": "12/02", "merchant": "Amazon", "amount": 20.0, "location": null}
  ],
  "categories": [{"name": "groceries", "total": 500.0}, {"name": "coffee", "total": 25.0}],
  "financial_advice": "Cook at home more often.",
  "spending_personality": "The Planner, you track every cent.",
  "whatif_scenarios": "What if you skipped daily coffee? You would save $150 a year.",
  "story": [
    {"line": "You spent most of your money, $500.50, on groceries which are essentials.", "topic": "grocery"},
    {"line": "Coffee was a small treat! It still added up over the month", "topic": " coffee "},
    {"line": "   ", "topic": "nothing"}
  ],
  "youtube_search": "saving money on groceries"
}
```"#;

    #[test]
    fn parses_fenced_json() {
        let story = parse_story(RESPONSE).unwrap();
        assert_eq!(story.bank_name, "First Bank");
        assert_eq!(story.transactions.len(), 2);
        assert_eq!(story.transactions[1].location, None);
        assert_eq!(story.categories[0].name, "groceries");
        assert!((story.total_spent() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn story_lines_are_normalized_to_one_sentence() {
        let story = parse_story(RESPONSE).unwrap();
        assert_eq!(story.story.len(), 2);
        assert_eq!(
            story.story[1].line,
            "Coffee was a small treat, It still added up over the month."
        );
        assert_eq!(story.topics(), vec!["grocery", "coffee"]);
    }

    #[test]
    fn narration_splits_into_one_sentence_per_topic() {
        let story = parse_story(RESPONSE).unwrap();
        let sentences = split_sentences(&story.narration());
        assert_eq!(sentences.len(), story.topics().len());
        assert_eq!(
            sentences[0],
            "You spent most of your money, $500.50, on groceries which are essentials"
        );
    }

    #[test]
    fn empty_story_is_rejected() {
        let err = parse_story(r#"{"summary": "s", "story": []}"#).unwrap_err();
        assert!(matches!(err, SpendreelError::StoryFailed { .. }));
    }

    #[test]
    fn non_json_reply_keeps_content_for_diagnosis() {
        let err = parse_story("summary: you spent a lot").unwrap_err();
        assert!(err.to_string().contains("you spent a lot"));
    }

    #[test]
    fn spend_is_grouped_by_place() {
        let story = parse_story(
            r#"{
                "summary": "s",
                "transactions": [
                    {"date": "12/01", "merchant": "Starbucks", "amount": 5.0, "location": "New York"},
                    {"date": "12/02", "merchant": "Amazon", "amount": 20.0, "location": "N/A"},
                    {"date": "12/03", "merchant": "Whole Foods", "amount": 80.0, "location": "Boston"},
                    {"date": "12/04", "merchant": "Deli", "amount": 12.5, "location": " new york "},
                    {"date": "12/05", "merchant": "Netflix", "amount": 15.0}
                ],
                "story": [{"line": "You shopped a lot.", "topic": "shopping"}]
            }"#,
        )
        .unwrap();

        let places = story.spend_by_place();
        assert_eq!(
            places,
            vec![
                PlaceTotal {
                    place: "Boston".to_string(),
                    total: 80.0,
                    transactions: 1,
                },
                PlaceTotal {
                    place: "New York".to_string(),
                    total: 17.5,
                    transactions: 2,
                },
            ]
        );
    }
}
