/// Longest time-limit entry accepted by the setup field.
pub const MAX_LIMIT_DIGITS: usize = 4;

/// Turns free-form time-limit text into whole minutes.
///
/// Everything but ASCII digits is dropped. No digits means no limit; values
/// too large for a `u32` saturate.
pub fn sanitize_minutes(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse::<u32>().unwrap_or(u32::MAX))
}

/// Editable "minutes (optional)" field on the setup screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeLimitField {
    text: String,
}

impl TimeLimitField {
    /// Appends `c` if it is a digit and the field has room.
    pub fn push(&mut self, c: char) -> bool {
        if !c.is_ascii_digit() || self.text.len() >= MAX_LIMIT_DIGITS {
            return false;
        }
        self.text.push(c);
        true
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn set_minutes(&mut self, minutes: u32) {
        self.text = minutes.to_string();
    }

    pub fn minutes(&self) -> Option<u32> {
        sanitize_minutes(&self.text)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
