use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::{AuditError, ParsedAudit, RecordProcessor};

/// Fieldset for records that do not name a workload.
pub const DEFAULT_FIELDSET: &str = "AuditLog";

const AUDIT_DATA_COLUMN: &str = "AuditData";
const WORKLOAD_FIELD: &str = "Workload";

/// Parser for Office 365 unified audit log CSV exports.
///
/// Each CSV row becomes one record. The JSON document in the `AuditData`
/// column is flattened into dotted field names (`Parameters.0.Name`) and
/// its `Workload` decides which output file the record lands in.
#[derive(Debug, Default, Clone)]
pub struct O365AuditParser;

impl RecordProcessor for O365AuditParser {
    fn process(&self, text: &str) -> Result<ParsedAudit, AuditError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let audit_data = headers.iter().position(|h| h == AUDIT_DATA_COLUMN);

        let mut parsed = ParsedAudit::default();
        for result in reader.records() {
            let row = result?;
            let line = row.position().map_or(0, |p| p.line());

            let mut fields: Vec<(String, String)> = headers
                .iter()
                .zip(row.iter())
                .enumerate()
                .filter(|(i, _)| Some(*i) != audit_data)
                .map(|(_, (name, value))| (name.to_string(), value.to_string()))
                .collect();

            let mut workload = None;
            if let Some(raw) = audit_data.and_then(|i| row.get(i)) {
                if !raw.trim().is_empty() {
                    let data: Value = serde_json::from_str(raw)
                        .map_err(|source| AuditError::AuditData { line, source })?;
                    if !data.is_object() {
                        return Err(AuditError::NotAnObject { line });
                    }

                    workload = data
                        .get(WORKLOAD_FIELD)
                        .and_then(Value::as_str)
                        .map(fieldset_key)
                        .filter(|key| !key.is_empty());
                    flatten("", &data, &mut fields);
                }
            }

            let key = workload.as_deref().unwrap_or(DEFAULT_FIELDSET);
            parsed.push(key, fields);
        }

        debug!(
            records = parsed.len(),
            fieldsets = parsed.records().len(),
            "parsed audit log"
        );
        Ok(parsed)
    }

    fn to_csv(&self, parsed: &ParsedAudit) -> Result<BTreeMap<String, String>, AuditError> {
        let mut outputs = BTreeMap::new();

        for (key, records) in parsed.records() {
            let Some(names) = parsed.field_names().get(key) else {
                continue;
            };

            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(names.iter())?;
            for record in records {
                writer.write_record(
                    names
                        .iter()
                        .map(|name| record.get(name).map_or("", String::as_str)),
                )?;
            }

            let bytes = writer.into_inner().map_err(|e| e.into_error())?;
            outputs.insert(format!("{key}.csv"), String::from_utf8(bytes)?);
        }

        Ok(outputs)
    }
}

/// Workload names come from the upload, so only keep characters that are
/// safe in an archive entry name.
fn fieldset_key(workload: &str) -> String {
    workload
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, value) in map {
                flatten(&join(key.as_str()), value, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, value) in items.iter().enumerate() {
                flatten(&join(i.to_string().as_str()), value, out);
            }
        }
        Value::Object(_) | Value::Array(_) | Value::Null => {
            if !prefix.is_empty() {
                out.push((prefix.to_string(), String::new()));
            }
        }
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "CreationDate,UserIds,Operations\n\
                          2023-01-01T00:00:00,alice@example.com,FileAccessed\n";

    fn run(text: &str) -> BTreeMap<String, String> {
        let parser = O365AuditParser;
        let parsed = parser.process(text).unwrap();
        parser.to_csv(&parsed).unwrap()
    }

    #[test]
    fn rows_without_audit_data_land_in_the_default_fieldset() {
        let outputs = run(SAMPLE);

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs["AuditLog.csv"], SAMPLE);
    }

    #[test]
    fn audit_data_is_flattened_and_grouped_by_workload() {
        let text = r#"CreationDate,UserIds,Operations,AuditData
2023-01-01T00:00:00,alice@example.com,Send,"{""Id"":""1"",""Item"":{""Subject"":""Hi""},""Workload"":""Exchange""}"
2023-01-01T00:01:00,bob@example.com,FileAccessed,"{""Id"":""2"",""ObjectId"":""https://x/doc.docx"",""Workload"":""SharePoint""}"
2023-01-01T00:02:00,carol@example.com,Send,"{""Id"":""3"",""Parameters"":[{""Name"":""To"",""Value"":""dan""}],""Workload"":""Exchange""}"
"#;
        let outputs = run(text);

        assert_eq!(
            outputs.keys().collect::<Vec<_>>(),
            ["Exchange.csv", "SharePoint.csv"]
        );
        assert_eq!(
            outputs["Exchange.csv"],
            "CreationDate,UserIds,Operations,Id,Item.Subject,Workload,Parameters.0.Name,Parameters.0.Value\n\
             2023-01-01T00:00:00,alice@example.com,Send,1,Hi,Exchange,,\n\
             2023-01-01T00:02:00,carol@example.com,Send,3,,Exchange,To,dan\n"
        );
        assert_eq!(
            outputs["SharePoint.csv"],
            "CreationDate,UserIds,Operations,Id,ObjectId,Workload\n\
             2023-01-01T00:01:00,bob@example.com,FileAccessed,2,https://x/doc.docx,SharePoint\n"
        );
    }

    #[test]
    fn empty_audit_data_and_missing_workload_use_the_default_fieldset() {
        let text = "Operations,AuditData\nA,\nB,\"{\"\"RecordType\"\":1}\"\n";
        let outputs = run(text);

        assert_eq!(
            outputs["AuditLog.csv"],
            "Operations,RecordType\nA,\nB,1\n"
        );
    }

    #[test]
    fn workload_names_cannot_escape_the_archive() {
        let text = "AuditData\n\"{\"\"Workload\"\":\"\"../../etc\"\"}\"\n";
        let outputs = run(text);

        assert!(outputs.contains_key("______etc.csv"));
        for name in outputs.keys() {
            crate::zip::validate_entry_name(name).unwrap();
        }
    }

    #[test]
    fn empty_upload_yields_no_outputs() {
        assert!(run("").is_empty());
        assert!(run("CreationDate,UserIds\n").is_empty());
    }

    #[test]
    fn malformed_audit_data_reports_the_line() {
        let parser = O365AuditParser;

        let err = parser.process("Id,AuditData\n1,{oops\n").unwrap_err();
        assert!(matches!(err, AuditError::AuditData { line: 2, .. }));

        let err = parser.process("Id,AuditData\n1,[1]\n").unwrap_err();
        assert!(matches!(err, AuditError::NotAnObject { line: 2 }));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = O365AuditParser.process("a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, AuditError::Csv(_)));
    }
}
