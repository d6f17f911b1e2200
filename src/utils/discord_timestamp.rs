use strum::Display;
use time::OffsetDateTime;

/// Discord renders `<t:UNIX:STYLE>` markers in the reader's own time zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum TimestampStyle {
    /// `20 April 2021 16:20`
    #[strum(serialize = "f")]
    ShortDateTime,
    /// `in 3 days`
    #[strum(serialize = "R")]
    Relative,
}

pub fn timestamp(datetime: OffsetDateTime, style: TimestampStyle) -> String {
    format!("<t:{}:{style}>", datetime.unix_timestamp())
}

#[cfg(test)]
mod tests {
    use test_log::test;
    use time::macros::datetime;

    use super::{timestamp, TimestampStyle};

    #[test]
    fn markers() {
        let at = datetime!(2024-09-08 23:59:59 UTC);
        assert_eq!(timestamp(at, TimestampStyle::ShortDateTime), "<t:1725839999:f>");
        assert_eq!(timestamp(at, TimestampStyle::Relative), "<t:1725839999:R>");
    }
}
