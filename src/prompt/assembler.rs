//! Joins the free-text fragments a user types into one raw prompt.

/// The four fragments collected from the form, in the order they are joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptParts {
    pub subject: String,
    pub pose: String,
    pub setting: String,
    pub other: String,
}

impl PromptParts {
    pub fn assemble(&self) -> String {
        assemble_raw_prompt(&self.subject, &self.pose, &self.setting, &self.other)
    }
}

/// Each fragment followed by a single space, trailing space included.
/// Fragments are taken verbatim; empty ones still contribute their separator.
pub fn assemble_raw_prompt(subject: &str, pose: &str, setting: &str, other: &str) -> String {
    let mut raw = String::with_capacity(subject.len() + pose.len() + setting.len() + other.len() + 4);
    for part in [subject, pose, setting, other] {
        raw.push_str(part);
        raw.push(' ');
    }
    raw
}
