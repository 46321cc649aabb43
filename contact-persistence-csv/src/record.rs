use contact_server_domain::contact::{CONTACT_FIELDS, Contact, ContactId};
use thiserror::Error;

pub const DELIMITER: char = ',';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("line {line}: expected header '{expected}', found '{found}'")]
    Header {
        line: usize,
        expected: String,
        found: String,
    },
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid id '{value}'")]
    InvalidId { line: usize, value: String },
}

pub fn header() -> String {
    CONTACT_FIELDS.join(",")
}

pub fn encode(contact: &Contact) -> String {
    let mut line = contact.id.to_string();
    for (_, value) in contact.fields() {
        line.push(DELIMITER);
        line.push_str(value);
    }
    line
}

/// Decodes one data row. `line_number` is only used for error reporting.
pub fn decode(line: &str, line_number: usize) -> Result<Contact, RecordError> {
    let parts = line.split(DELIMITER).collect::<Vec<_>>();
    if parts.len() != CONTACT_FIELDS.len() {
        return Err(RecordError::FieldCount {
            line: line_number,
            expected: CONTACT_FIELDS.len(),
            found: parts.len(),
        });
    }
    let id = parts[0]
        .trim()
        .parse::<ContactId>()
        .map_err(|_| RecordError::InvalidId {
            line: line_number,
            value: parts[0].to_string(),
        })?;
    Ok(Contact {
        id,
        first_name: parts[1].to_string(),
        first_surname: parts[2].to_string(),
        second_surname: parts[3].to_string(),
        email: parts[4].to_string(),
        phone: parts[5].to_string(),
    })
}

/// Parses a whole record file. Blank lines are skipped and an empty file has no rows.
pub fn parse_file(text: &str) -> Result<Vec<Contact>, RecordError> {
    let expected_header = header();
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((line_number, first)) = lines.next() else {
        return Ok(Vec::new());
    };
    let first = first.strip_prefix('\u{feff}').unwrap_or(first);
    if first != expected_header {
        return Err(RecordError::Header {
            line: line_number,
            expected: expected_header,
            found: first.to_string(),
        });
    }

    lines.map(|(i, line)| decode(line, i)).collect()
}

pub fn render_file(contacts: &[Contact]) -> String {
    let mut out = header();
    out.push('\n');
    for contact in contacts {
        out.push_str(&encode(contact));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> Contact {
        Contact {
            id: 1,
            first_name: "Ana".to_string(),
            first_surname: "Lopez".to_string(),
            second_surname: "Ruiz".to_string(),
            email: "a@x.com".to_string(),
            phone: "555-0100".to_string(),
        }
    }

    #[test]
    fn test_header() {
        assert_eq!(
            header(),
            "id,first_name,first_surname,second_surname,email,phone"
        );
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(&ana()), "1,Ana,Lopez,Ruiz,a@x.com,555-0100");
    }

    #[test]
    fn test_decode_keeps_empty_fields() {
        let contact = decode("7,Bea,,,b@x.com,", 2).unwrap();
        assert_eq!(contact.id, 7);
        assert_eq!(contact.first_name, "Bea");
        assert_eq!(contact.first_surname, "");
        assert_eq!(contact.phone, "");
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            decode("1,Ana,Lopez", 3),
            Err(RecordError::FieldCount {
                line: 3,
                expected: 6,
                found: 3
            })
        );
        assert!(matches!(
            decode("x,Ana,Lopez,Ruiz,a@x.com,555", 4),
            Err(RecordError::InvalidId { line: 4, .. })
        ));
    }

    #[test]
    fn test_parse_file() {
        let text = "id,first_name,first_surname,second_surname,email,phone\r\n\
                    1,Ana,Lopez,Ruiz,a@x.com,555-0100\r\n\
                    \r\n\
                    2,Bea,,,b@x.com,\r\n";
        let contacts = parse_file(text).unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0], ana());
        assert_eq!(contacts[1].email, "b@x.com");
    }

    #[test]
    fn test_parse_empty_and_header_only() {
        assert_eq!(parse_file(""), Ok(vec![]));
        assert_eq!(parse_file(&format!("{}\n", header())), Ok(vec![]));
    }

    #[test]
    fn test_parse_rejects_wrong_header() {
        assert!(matches!(
            parse_file("id,nombre\n1,Ana\n"),
            Err(RecordError::Header { line: 1, .. })
        ));
    }

    #[test]
    fn test_render_then_parse_preserves_order() {
        let mut bea = ana();
        bea.id = 2;
        bea.first_name = "Bea".to_string();
        let contacts = vec![bea, ana()];
        assert_eq!(parse_file(&render_file(&contacts)), Ok(contacts));
    }
}
