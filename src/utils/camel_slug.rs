use deunicode::deunicode_char;
use lazy_regex::regex_is_match;

/// Builds a CamelCase slug out of a display name, transliterating non-ASCII letters.
pub fn slugify_camel(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    let mut is_start_of_word = true;
    let mut add_char = |c: char| {
        match c {
            '0'..='9' | 'A'..='Z' => slug.push(c),
            'a'..='z' if is_start_of_word => slug.push(c.to_ascii_uppercase()),
            'a'..='z' => slug.push(c),
            _ => (),
        }

        is_start_of_word = !c.is_ascii_alphanumeric();
    };

    for c in name.chars() {
        if c.is_ascii() {
            add_char(c);
        } else if let Some(transliterated) = deunicode_char(c) {
            transliterated.chars().for_each(&mut add_char);
        }
    }

    slug.shrink_to_fit();
    slug
}

pub fn is_valid_slug(slug: &str) -> bool {
    regex_is_match!(r"^[A-Za-z0-9_-]+$", slug)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::{is_valid_slug, slugify_camel};

    #[test]
    fn capitalizes_words() {
        assert_eq!(slugify_camel("Tuesday tennis ladder 2024"), "TuesdayTennisLadder2024");
    }

    #[test]
    fn keeps_acronyms() {
        assert_eq!(slugify_camel("NYC Run Club"), "NYCRunClub");
    }

    #[test]
    fn drops_punctuation() {
        assert_eq!(slugify_camel("5k.time-trial#&%$*(spring)"), "5kTimeTrialSpring");
    }

    #[test]
    fn transliterates() {
        assert_eq!(slugify_camel("Лига падела"), "LigaPadela");
    }

    #[test]
    fn slug_alphabet() {
        assert!(is_valid_slug("Spring_Doubles-2"));
        assert!(!is_valid_slug("spring doubles"));
        assert!(!is_valid_slug(""));
    }
}
