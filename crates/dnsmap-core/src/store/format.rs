// # Record File Format
//
// ```json
// {
//   "addresses": [
//     {"domain": "example.com", "ip": "192.168.1.1"},
//     {"domain": "test.com", "ip": "10.0.0.1"}
//   ]
// }
// ```
//
// Decoding goes through serde_json, so whitespace, field order, escaped
// quotes and unknown fields are all handled. The file is only considered a
// record file at all if the whitespace-stripped text contains the literal
// `"addresses":[`.
//
// Encoding always produces the layout above: two-space indent, one entry per
// line, no newline after the closing brace.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::Record;

/// Marker that must appear (whitespace stripped) for a file to be parsed
const ADDRESSES_MARKER: &str = "\"addresses\":[";

const HEADER: &str = "{\n  \"addresses\": [\n";
const FOOTER: &str = "\n  ]\n}";
const ENTRY_SEPARATOR: &str = ",\n";

/// Parse the contents of a record file
///
/// # Errors
///
/// - [`Error::MissingAddresses`]: no `"addresses":[` marker, including empty input
/// - [`Error::Json`]: the document is not valid JSON
/// - [`Error::MalformedRecord`]: an entry is not an object, lacks `domain`
///   or `ip`, has a non-string value for either, or has an empty domain
pub fn decode(text: &str) -> Result<Vec<Record>> {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if !stripped.contains(ADDRESSES_MARKER) {
        return Err(Error::missing_addresses("no \"addresses\" array"));
    }

    let document: Value = serde_json::from_str(text)?;
    let entries = document
        .get("addresses")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::missing_addresses("\"addresses\" is not a top-level array"))?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| decode_entry(index, entry))
        .collect()
}

fn decode_entry(index: usize, entry: &Value) -> Result<Record> {
    if !entry.is_object() {
        return Err(Error::malformed(index, format!("expected an object, got {}", entry)));
    }

    let record = Record::deserialize(entry).map_err(|e| Error::malformed(index, e.to_string()))?;

    if record.domain().is_empty() {
        return Err(Error::malformed(index, "empty domain"));
    }

    Ok(record)
}

/// Render records in the canonical file layout, in the given order
pub fn encode(records: &[Record]) -> String {
    let entries: Vec<String> = records.iter().map(encode_entry).collect();

    let mut out = String::with_capacity(HEADER.len() + FOOTER.len() + entries.len() * 48);
    out.push_str(HEADER);
    out.push_str(&entries.join(ENTRY_SEPARATOR));
    out.push_str(FOOTER);
    out
}

fn encode_entry(record: &Record) -> String {
    format!(
        "    {{\"domain\": {}, \"ip\": {}}}",
        Value::from(record.domain()),
        Value::from(record.address())
    )
}
