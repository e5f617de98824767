//! Tolerant parser for line-based `LABEL: value` advisory replies.
//!
//! Each field is resolved on its own: a missing or empty field falls back to
//! its default without affecting the others, and the result records which
//! fields were defaulted.

/// Strict reading of the error flag. Only a literal `true`/`false` is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagValue {
    True,
    False,
    Unparseable,
}

impl FlagValue {
    pub fn is_true(self) -> bool {
        matches!(self, FlagValue::True)
    }
}

pub fn parse_flag(value: &str) -> FlagValue {
    match clean_value(value).to_lowercase().as_str() {
        "true" => FlagValue::True,
        "false" => FlagValue::False,
        _ => FlagValue::Unparseable,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedField {
    pub value: String,
    pub defaulted: bool,
}

impl ParsedField {
    fn found(value: String) -> Self {
        Self { value, defaulted: false }
    }

    fn default(value: &str) -> Self {
        Self {
            value: value.to_string(),
            defaulted: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAdvice {
    pub next_action: ParsedField,
    pub instruction: ParsedField,
    pub rationale: ParsedField,
    pub error_flag: FlagValue,
    /// True when no error-flag line was present at all.
    pub error_flag_defaulted: bool,
}

impl ParsedAdvice {
    /// Names of the fields that fell back to defaults.
    pub fn defaulted_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.next_action.defaulted {
            fields.push("next_action");
        }
        if self.instruction.defaulted {
            fields.push("instruction");
        }
        if self.rationale.defaulted {
            fields.push("rationale");
        }
        if self.error_flag_defaulted {
            fields.push("error_flag");
        }
        fields
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdviceDefaults<'a> {
    pub next_action: &'a str,
    pub instruction: &'a str,
    pub rationale: &'a str,
}

#[derive(Debug, Clone, Copy)]
enum Label {
    NextAction,
    Instruction,
    Rationale,
    ErrorFlag,
}

impl Label {
    /// Accepted spellings once the key is reduced to lower-case alphanumerics.
    fn tokens(self) -> &'static [&'static str] {
        match self {
            Label::NextAction => &["nextaction", "nextstep", "nextelement", "next"],
            Label::Instruction => &["instruction", "instructions"],
            Label::Rationale => &["reason", "rationale", "why"],
            Label::ErrorFlag => &["iserror", "errorflag", "error", "errorrecovery", "iserrorrecovery"],
        }
    }
}

pub fn parse_advice(text: &str, defaults: AdviceDefaults<'_>) -> ParsedAdvice {
    let pairs: Vec<(String, String)> = text.lines().filter_map(split_line).collect();

    let next_action = find_value(&pairs, Label::NextAction)
        .map(ParsedField::found)
        .unwrap_or_else(|| ParsedField::default(defaults.next_action));
    let instruction = find_value(&pairs, Label::Instruction)
        .map(ParsedField::found)
        .unwrap_or_else(|| ParsedField::default(defaults.instruction));
    let rationale = find_value(&pairs, Label::Rationale)
        .map(ParsedField::found)
        .unwrap_or_else(|| ParsedField::default(defaults.rationale));

    let (error_flag, error_flag_defaulted) = match find_value(&pairs, Label::ErrorFlag) {
        Some(raw) => (parse_flag(&raw), false),
        None => (FlagValue::Unparseable, true),
    };

    ParsedAdvice {
        next_action,
        instruction,
        rationale,
        error_flag,
        error_flag_defaulted,
    }
}

/// Split at the first `:` or `=`, reducing the key to lower-case alphanumerics.
fn split_line(line: &str) -> Option<(String, String)> {
    let idx = line.find([':', '='])?;
    let key: String = line[..idx]
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if key.is_empty() {
        return None;
    }
    Some((key, clean_value(&line[idx + 1..])))
}

/// Exact key matches win over keys that merely contain a token, so prose
/// lines like "If there is an error: ..." lose to a real `IS_ERROR:` line.
fn find_value(pairs: &[(String, String)], label: Label) -> Option<String> {
    let tokens = label.tokens();
    let non_empty = |(_, v): &&(String, String)| !v.is_empty();
    pairs
        .iter()
        .filter(non_empty)
        .find(|(k, _)| tokens.contains(&k.as_str()))
        .or_else(|| {
            pairs
                .iter()
                .filter(non_empty)
                .find(|(k, _)| tokens.iter().any(|t| t.len() > 4 && k.contains(t)))
        })
        .map(|(_, v)| v.clone())
}

fn clean_value(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '*' || c == '"' || c == '\'' || c == '`' || c.is_whitespace())
        .to_string()
}
