use time::format_description::well_known::Rfc3339;

use crate::history::Record;

const HEADER: &str = "Date,Mode,Input,Output";

/// Renders `records` as CSV; every field is quoted and embedded quotes are doubled.
pub fn to_csv(records: &[Record]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(HEADER.to_string());
    for record in records {
        let date = record.created_at.format(&Rfc3339).unwrap_or_default();
        lines.push(
            [
                date.as_str(),
                record.mode.as_str(),
                record.input_text.as_str(),
                record.output_text.as_str(),
            ]
            .iter()
            .map(|field| quote(field))
            .collect::<Vec<_>>()
            .join(","),
        );
    }
    let mut csv = lines.join("\n");
    csv.push('\n');
    csv
}

/// File name offered for a download made at `date` (`YYYY-MM-DD`).
pub fn file_name(date: &str) -> String {
    format!("dialect-translations-{}.csv", date)
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{DialectMode, Direction};
    use time::OffsetDateTime;

    fn record(input: &str, output: &str) -> Record {
        Record {
            id: "id".to_string(),
            user_id: "u".to_string(),
            input_text: input.to_string(),
            output_text: output.to_string(),
            mode: DialectMode::PaisaBoricua,
            direction: Direction::Forward,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn has_header_plus_one_line_per_record() {
        let records = vec![
            record("hola parce", "saludos, mano"),
            record("qué chimba", "¡qué brutal!"),
            record("", ""),
        ];
        let csv = to_csv(&records);
        assert_eq!(csv.lines().count(), records.len() + 1);
        assert_eq!(csv.lines().next(), Some(HEADER));
        assert_eq!(
            csv.lines().nth(1),
            Some("\"1970-01-01T00:00:00Z\",\"paisa-boricua\",\"hola parce\",\"saludos, mano\"")
        );
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let csv = to_csv(&[record("he said \"pues\"", "\"wepa\"")]);
        let row = csv.lines().nth(1).expect("row");
        assert!(row.contains("\"he said \"\"pues\"\"\""));
        assert!(row.ends_with(",\"\"\"wepa\"\"\""));
    }

    #[test]
    fn empty_history_is_header_only() {
        assert_eq!(to_csv(&[]), format!("{}\n", HEADER));
    }

    #[test]
    fn file_name_carries_date() {
        assert_eq!(file_name("2024-05-01"), "dialect-translations-2024-05-01.csv");
    }
}
