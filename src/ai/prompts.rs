//! Role prompts for the boss and intern models.

use regex::Regex;
use std::sync::OnceLock;

use super::Message;

/// Prefix the boss emits when it has enough evidence to answer.
pub const COMPLETION_SENTINEL: &str = "FINAL_ANSWER:";

/// System prompt for the boss role.
pub const BOSS_SYSTEM_PROMPT: &str = r"You are the boss in a question-answering system. You cannot read the context yourself.

Your intern can read the full context and will answer one focused question at a time. The intern never sees the user's question or your earlier questions, so every question must stand on its own.

On each turn, do exactly one of the following:
- Reply with the single next question for the intern. Ask clear, specific questions that build on what the intern already told you.
- If the evidence gathered so far is sufficient, reply with FINAL_ANSWER: followed by your complete answer to the user's question.

Do not add commentary around the question or the final answer.";

/// System prompt for the intern role.
pub const INTERN_SYSTEM_PROMPT: &str = r"You are the intern in a question-answering system. Your boss asks you one specific question about a context.

Answer only from the given context. If the answer is not present in the context, state explicitly that it is not there.

Guidelines:
- Be precise and concise
- Include the actual numbers, names, and dates the context gives
- Quote qualifying phrases that change the meaning of the data
- Do not make assumptions beyond what the context says";

/// System prompt for the synthesis call made once the iteration budget is spent.
pub const SYNTHESIS_SYSTEM_PROMPT: &str = r"You synthesize clear, complete answers. The question can no longer be investigated further: answer it as well as possible from the gathered information alone, and say plainly what remains unknown.";

/// Appended to intern questions when the user question ranks or compares.
pub const QUALIFIER_HINT: &str = "(Include any contextual qualifiers like 'globally', 'regionally', 'worldwide', 'in the industry', or descriptive phrases that add important context.)";

/// Format the intern's single user turn.
#[must_use]
pub fn format_intern_request(question: &str, context: &str) -> String {
    format!(
        "Context:\n{context}\n\nQuestion from boss: {question}\n\nAnswer the question based solely on the context above. If the answer is not in the context, clearly state that."
    )
}

/// Build the boss conversation for the next turn.
///
/// Each earlier consultation becomes an assistant turn (the question the boss
/// asked, without any qualifier hint) followed by a user turn carrying the
/// intern's answer.
#[must_use]
pub fn boss_turns<'a, I>(
    user_question: &str,
    exchanges: I,
    iteration: usize,
    max_iterations: usize,
) -> Vec<Message>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut turns = vec![Message::user(format!(
        "Original question: {user_question}\n\nWhat should the intern be asked first?"
    ))];

    for (question, answer) in exchanges {
        turns.push(Message::assistant(without_qualifier_hint(question)));
        turns.push(Message::user(format!("Intern's answer: {answer}")));
    }

    let remaining = max_iterations.saturating_sub(iteration.saturating_sub(1));
    let last = turns.len() - 1;
    turns[last].content.push_str(&format!(
        "\n\nThis is iteration {iteration} of {max_iterations} ({remaining} intern question(s) left). \
         Ask the next question, or reply with {COMPLETION_SENTINEL} <your complete answer> if you have enough information."
    ));
    turns
}

/// Format the synthesis request from gathered evidence.
#[must_use]
pub fn format_synthesis_request(user_question: &str, evidence: &str) -> String {
    let evidence = if evidence.is_empty() {
        "No information gathered."
    } else {
        evidence
    };
    format!(
        "Question: {user_question}\n\nInformation gathered:\n{evidence}\n\nProvide the best answer based on this information."
    )
}

fn ranking_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b(largest|smallest|biggest|tiniest|highest|lowest|tallest|shortest|first|second|third|fourth|fifth|top|bottom|best|worst|most|least|maximum|minimum|greater|lesser|superior|inferior|leading|trailing|primary|secondary)\b",
            )
            .ok()
        })
        .as_ref()
}

/// Whether a question ranks or compares things.
#[must_use]
pub fn is_ranking_question(question: &str) -> bool {
    ranking_pattern().is_some_and(|re| re.is_match(question))
}

/// Append the qualifier hint to an intern question, at most once.
#[must_use]
pub fn with_qualifier_hint(question: &str) -> String {
    let question = without_qualifier_hint(question);
    format!("{question} {QUALIFIER_HINT}")
}

/// The question as the boss phrased it, with a trailing qualifier hint removed.
#[must_use]
pub fn without_qualifier_hint(question: &str) -> &str {
    question
        .trim_end()
        .strip_suffix(QUALIFIER_HINT)
        .map_or(question, str::trim_end)
}
