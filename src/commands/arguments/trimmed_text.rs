use std::{fmt::Display, str::FromStr};

use crate::commands::CommandError;

/// Free text with surrounding whitespace removed. Blank input is rejected.
#[derive(Debug, PartialEq, Eq)]
pub struct TrimmedText(String);

impl FromStr for TrimmedText {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() {
            return Err(super::invalid_argument(
                "The text can't be blank.".to_string(),
            ));
        }

        Ok(TrimmedText(s.to_owned()))
    }
}

impl From<TrimmedText> for String {
    fn from(value: TrimmedText) -> Self {
        value.0
    }
}

impl Display for TrimmedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TrimmedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_log::test;

    use super::TrimmedText;

    #[test]
    fn trimmed() {
        assert_eq!(
            TrimmedText::from_str("Thursday Padel").unwrap().as_ref(),
            "Thursday Padel"
        );
    }

    #[test]
    fn untrimmed() {
        assert_eq!(
            TrimmedText::from_str("  Thursday  \t Padel   ").unwrap().as_ref(),
            "Thursday  \t Padel"
        );
    }

    #[test]
    fn blank() {
        assert!(TrimmedText::from_str(" \t ").is_err());
    }
}
