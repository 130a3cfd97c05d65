//! Prompt 模板加载：优先读 config/prompts 下的文件，找不到时使用内置默认
//!
//! 模板内容对回复循环是不透明的配置字符串；占位符：
//! - system: {profile}
//! - evaluator: {policy} {message} {reply} {score_floor} {score_threshold} {relevance_floor}

use std::path::{Path, PathBuf};

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a professional AI Career Assistant replying to employers on behalf of the candidate below.

{profile}

Rules:
- Reply in first person as the candidate; be professional, concise and warm.
- Employer shares an email? Call record_user_details right away.
- Interview or meeting proposed with date, time and mode? Call record_interview_request.
- Unsure or out of scope (salary specifics, legal, deep tech not in the profile)? Call record_unknown_question and say you'll follow up personally.
- Never invent skills or experience not in the profile.
- For greetings or non-specific messages, reply with a short greeting and ask how you can help; no CV summary unless asked."#;

pub const DEFAULT_EVALUATOR_PROMPT: &str = r#"You are a fair and balanced evaluator for a Career Assistant replying to potential employers.

Here is the system prompt for the assistant:
{policy}

Score the ASSISTANT REPLY against the EMPLOYER MESSAGE on each criterion from 0 to 10:
1. professionalism 2. clarity 3. completeness 4. safety 5. relevance
6. career_relevance: is the employer's message about hiring, the candidate's background or professional matters (0-3 off-topic, 4-7 tangential, 8-10 clearly career related).

Thresholds:
- is_acceptable = true when ALL six scores >= {score_floor} AND the average >= {score_threshold}.
- If career_relevance < {relevance_floor}, is_acceptable must be false and feedback must start with "OUT_OF_SCOPE: ".
If not acceptable, feedback MUST contain specific, actionable rewrite instructions.

---
EMPLOYER MESSAGE:
{message}

ASSISTANT REPLY:
{reply}
---

Respond ONLY with valid JSON:
{"is_acceptable": boolean, "feedback": "string", "confidence": number, "scores": {"professionalism": number, "clarity": number, "completeness": number, "safety": number, "relevance": number, "career_relevance": number}}"#;

/// 按顺序尝试 explicit、config/prompts/<name>、../config/prompts/<name>，全部失败时返回 fallback
pub fn load_prompt(explicit: Option<&Path>, name: &str, fallback: &str) -> String {
    let candidates: Vec<PathBuf> = explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain([
            PathBuf::from("config/prompts").join(name),
            PathBuf::from("../config/prompts").join(name),
        ])
        .collect();

    candidates
        .iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// 单遍填充 {name} 占位符；已填入的值不会再被扫描，未知的 {..} 原样保留
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = tail.find('}').and_then(|end| {
            let name = &tail[1..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (end, *value))
        });
        match hit {
            Some((end, value)) => {
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
