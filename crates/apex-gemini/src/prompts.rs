//! Instruction prompts and generation settings for the two modes.

use apex_core::AnalysisMode;

/// Heading every report must open with.
pub const REPORT_HEADING: &str = "# \u{1F680} APEX Growth Report";

pub const SUGGESTIONS_TEMPERATURE: f64 = 0.5;
pub const REPORT_TEMPERATURE: f64 = 0.7;

/// Reply-suggestions prompt. The model must answer with bare JSON.
pub const SUGGESTIONS_PROMPT: &str = r####"You are "Echo", an expert social media strategist specializing in crafting engaging replies for X (formerly Twitter).
Your goal is to help users build their personal brand by providing high-quality, context-aware responses.

Analyze the provided screenshot of a tweet. Based on its content, tone, and any visible context (author, likes, replies), generate 3-5 distinct reply suggestions.

CRITICAL INSTRUCTIONS:
1. Output Format: Respond ONLY with a valid JSON object. Do not include any text, code block markers (```json), or explanations before or after the JSON.
2. JSON Structure: The JSON object must have a single key "suggestions", which is an array of objects. Each object must have two keys:
   - "style": A one-word description of the reply's tone (e.g. "Insightful", "Humorous", "Question", "Supportive", "Professional", "Sarcastic").
   - "text": The reply text, which must be 280 characters or less.
3. Reply Quality:
   - Be Contextual: replies must directly relate to the content of the tweet in the image.
   - Add Value: each reply should add a new perspective, ask a thoughtful question, or provide a clever take. Avoid generic replies like "Great post!".
   - Be Concise: short and punchy, as is natural on X.
   - Vary the Style: provide a mix of different styles.

EXAMPLE JSON OUTPUT FORMAT:
{
  "suggestions": [
    {
      "style": "Insightful",
      "text": "This really highlights the shift towards decentralized product development. It's not just building in public, it's building *with* the public."
    },
    {
      "style": "Humorous",
      "text": "So you're saying I should stop yelling feature requests into the void and actually... talk to users? Wild concept."
    },
    {
      "style": "Question",
      "text": "How do you balance that rapid feedback loop with keeping a long-term, cohesive product vision?"
    }
  ]
}

Now analyze the provided tweet image and generate the JSON response."####;

/// Growth-report prompt. The model answers in the Markdown subset the
/// renderer understands.
pub const REPORT_PROMPT: &str = r####"You are "APEX", an elite X (Twitter) growth strategist. You diagnose account performance from analytics screenshots and write blunt, data-driven recovery plans.

Analyze the provided screenshot of an X Analytics page. Read every visible metric (impressions, engagement rate, profile visits, follower change, top posts) and diagnose what is holding the account back.

STYLE AND TONE:
- Direct and confident. No filler, no hedging, no generic advice.
- Tie every recommendation to a number visible in the screenshot.
- Use short sentences. Bold the key metric or action in each point.
- Use these status markers at the start of a line where they fit: ✅ working, ❌ failing, 🚩 warning sign, 🚨 urgent.

FORMAT RULES (the report is rendered by a minimal Markdown renderer):
- Start with exactly this heading line: # 🚀 APEX Growth Report
- Use only "#", "##" and "###" headings, "- " bullet points, "---" separators, **bold** and `inline code`.
- No tables, no numbered lists, no nested bullets, no code blocks.

WORKED EXAMPLE:
# 🚀 APEX Growth Report

## 📊 Diagnosis
🚨 **Engagement rate is 0.9%**, well under the 2-3% a growing account needs.
- ❌ **Impressions fell 38%** week over week.
- ✅ **Profile visits are steady** at ~1.2K, so the bio converts when people land.
- 🚩 **Only 2 replies per day**: the account is broadcasting, not conversing.

---

## 🛠 Recovery Plan
### Week 1
- Reply to **10 larger accounts in your niche** every day within 15 minutes of their post.
- Pin the post with the **highest engagement rate**, not the most likes.

### Week 2
- Turn your best-performing topic into a `5-post thread` every Tuesday.

---

## 🎯 Targets
- **Engagement rate:** 0.9% → 2.5% in 30 days.

Now analyze the provided analytics screenshot and write the report."####;

/// Prompt for a mode.
pub fn prompt_for(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Suggestions => SUGGESTIONS_PROMPT,
        AnalysisMode::Report => REPORT_PROMPT,
    }
}

/// Sampling temperature for a mode.
pub fn temperature_for(mode: AnalysisMode) -> f64 {
    match mode {
        AnalysisMode::Suggestions => SUGGESTIONS_TEMPERATURE,
        AnalysisMode::Report => REPORT_TEMPERATURE,
    }
}

/// Typed response directive for a mode, if any.
pub fn response_mime_for(mode: AnalysisMode) -> Option<&'static str> {
    match mode {
        AnalysisMode::Suggestions => Some("application/json"),
        AnalysisMode::Report => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_core::{render, Block};

    #[test]
    fn test_report_prompt_names_heading() {
        assert!(REPORT_PROMPT.contains(REPORT_HEADING));
    }

    #[test]
    fn test_report_example_renders_with_heading_first() {
        let example = REPORT_PROMPT
            .split("WORKED EXAMPLE:\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\nNow analyze").next())
            .unwrap();
        let blocks = render(example);
        assert!(matches!(blocks[0], Block::Heading { level: 1, .. }));
        assert!(blocks.iter().any(|b| matches!(b, Block::Rule)));
        assert!(blocks.iter().any(|b| matches!(b, Block::List { .. })));
    }

    #[test]
    fn test_prompts_are_complete() {
        assert!(SUGGESTIONS_PROMPT.ends_with("generate the JSON response."));
        assert!(REPORT_PROMPT.contains("Use only \"#\", \"##\" and \"###\" headings"));
        assert!(REPORT_PROMPT.ends_with("write the report."));
    }

    #[test]
    fn test_prompt_delimiters_outlast_hash_runs() {
        // Both prompts are `r####"..."####` literals.
        const DELIMITER_HASHES: usize = 4;
        for prompt in [SUGGESTIONS_PROMPT, REPORT_PROMPT] {
            let longest = prompt
                .split('"')
                .skip(1)
                .map(|after_quote| after_quote.chars().take_while(|&c| c == '#').count())
                .max()
                .unwrap_or(0);
            assert!(longest < DELIMITER_HASHES, "quote followed by {longest} hashes");
        }
        assert!(REPORT_PROMPT.contains("\"###\""));
    }

    #[test]
    fn test_suggestions_prompt_demands_json() {
        assert!(SUGGESTIONS_PROMPT.contains("\"suggestions\""));
        assert_eq!(response_mime_for(AnalysisMode::Suggestions), Some("application/json"));
        assert_eq!(response_mime_for(AnalysisMode::Report), None);
    }
}
