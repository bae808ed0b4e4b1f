/// Telegram recipient: numeric chat id or `@channelusername`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub String);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Delimiter used when joining row fields into a comparison key. Chosen so it
/// cannot plausibly occur inside a table cell.
pub const KEY_DELIMITER: &str = "||";

/// Normalized extract of the top-most row of the results table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultRow {
    pub publish_date: String,
    pub course: String,
    pub details: String,
}

impl ResultRow {
    /// Comparison key identifying this row across cycles.
    pub fn key(&self) -> String {
        [
            self.publish_date.as_str(),
            self.course.as_str(),
            self.details.as_str(),
        ]
        .join(KEY_DELIMITER)
    }

    /// True when nothing was extracted. Callers must treat this as "no data
    /// this cycle", never as a cleared results page.
    pub fn is_empty(&self) -> bool {
        self.publish_date.is_empty() && self.course.is_empty() && self.details.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_fields_with_delimiter() {
        let row = ResultRow {
            publish_date: "12-05-2024".to_string(),
            course: "B.TECH".to_string(),
            details: "R19 3-2 Results".to_string(),
        };
        assert_eq!(row.key(), "12-05-2024||B.TECH||R19 3-2 Results");
    }

    #[test]
    fn empty_row_never_equals_a_real_key() {
        let empty = ResultRow::default();
        assert!(empty.is_empty());

        let row = ResultRow {
            publish_date: "12-05-2024".to_string(),
            ..Default::default()
        };
        assert!(!row.is_empty());
        assert_ne!(row.key(), String::new());
    }
}
