//! Prompt composition — a pure function from context to messages.
//!
//! The message sequence is always:
//!
//! 1. the system instruction
//! 2. each prior [`ChatTurn`] as `user` then `assistant`, oldest first
//! 3. the current query as the final `user` message

use digm_core::message::{ChatTurn, Message};
use digm_core::record::{OnboardingAnswer, Profile, RecordItem};

/// Characters of each record's content shown in the data summary.
const BULLET_CONTENT_CHARS: usize = 100;

/// Everything the system instruction is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub profile: &'a Profile,
    pub onboarding: &'a [OnboardingAnswer],
    pub items: &'a [RecordItem],
}

/// The final payload handed to the response generator.
#[derive(Debug, Clone)]
pub struct ComposedPrompt {
    pub system_instruction: String,
    /// System instruction first, current query last.
    pub messages: Vec<Message>,
}

/// One summary line: `- {Kind}: {first 100 chars of content}...`
pub fn render_bullet(item: &RecordItem) -> String {
    let content: String = item.content.chars().take(BULLET_CONTENT_CHARS).collect();
    format!("- {}: {}...", item.kind.label(), content)
}

/// The bullet list of selected records, one per line.
pub fn data_summary(items: &[RecordItem]) -> String {
    if items.is_empty() {
        return "(no goals, tasks or journal entries found)".to_string();
    }
    items.iter().map(render_bullet).collect::<Vec<_>>().join("\n")
}

fn onboarding_json(onboarding: &[OnboardingAnswer]) -> String {
    serde_json::to_string(onboarding).unwrap_or_else(|_| "[]".to_string())
}

/// Build the system instruction.
pub fn system_instruction(ctx: &PromptContext<'_>) -> String {
    let name = ctx
        .profile
        .display_name()
        .unwrap_or_else(|| "a user".to_string());
    let vision = ctx
        .profile
        .vision()
        .unwrap_or_else(|| "Not set yet".to_string());
    let level = ctx.profile.level().unwrap_or_else(|| "1".to_string());
    let xp = ctx.profile.xp().unwrap_or_else(|| "0".to_string());

    format!(
        "You are a personalized AI coach for {name}.

USER CONTEXT:
- Vision: {vision}
- Current Level: {level}
- XP: {xp}
- Onboarding Data: {onboarding}

AVAILABLE USER DATA:
{summary}

COACHING STYLE:
- Be motivational but realistic
- Provide data-driven insights based on the user's ACTUAL goals and tasks
- Give specific, actionable advice
- Reference the user's vision and current progress
- Be encouraging and supportive

CRITICAL INSTRUCTIONS:
- You MUST use the user's actual data from the AVAILABLE USER DATA section above
- If they ask \"What are my goals?\", you MUST list their specific goals from the data
- If they ask \"What are my tasks?\", you MUST list their specific tasks from the data
- If they ask about progress, reference their specific progress numbers
- NEVER give generic advice without referencing their real data
- NEVER invent goals, tasks, journal entries or numbers that are not in the data
- If no data exists for a category, say \"I don't see any [goals/tasks] in your data yet\"

SAFETY GUIDELINES:
- Do not give medical, legal or financial directives; suggest consulting a qualified professional instead
- If a request is unrelated to personal growth, goals or productivity, gently redirect the conversation back to coaching

RESPONSE FORMAT:
1. Acknowledge their question
2. List their ACTUAL data (goals, tasks, etc.) from the available data above
3. Provide specific insights based on their real data
4. Suggest concrete next steps
5. End with motivation

Keep responses conversational, helpful, and under 200 words.",
        onboarding = onboarding_json(ctx.onboarding),
        summary = data_summary(ctx.items),
    )
}

/// Compose the full message sequence for `query`.
pub fn compose(ctx: &PromptContext<'_>, query: &str, history: &[ChatTurn]) -> ComposedPrompt {
    let system_instruction = system_instruction(ctx);

    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(Message::system(system_instruction.clone()));
    messages.extend(history.iter().cloned().flat_map(ChatTurn::into_messages));
    messages.push(Message::user(query));

    ComposedPrompt {
        system_instruction,
        messages,
    }
}
