use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::constants::REMOTE_LISTING_KEY;
use crate::error::{ImporterError, Result};
use crate::types::{GroupRecord, RemoteRuleRecord, RuleInputRecord};

/// Read group rows from CSV with a header row
pub fn read_group_records<R: Read>(reader: R) -> Result<Vec<GroupRecord>> {
    read_csv(reader)
}

/// Read rule rows from CSV with a header row
pub fn read_rule_records<R: Read>(reader: R) -> Result<Vec<RuleInputRecord>> {
    read_csv(reader)
}

fn read_csv<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in csv_reader.deserialize() {
        records.push(result?);
    }
    debug!("Read {} CSV rows", records.len());
    Ok(records)
}

/// Load the remote rule listing
///
/// Accepts `describe-security-group-rules` output (an object holding a
/// `SecurityGroupRules` array) as well as a bare array of rules. Anything
/// else is an error; a partial listing must never be used.
pub fn load_remote_listing<R: Read>(reader: R) -> Result<Vec<RemoteRuleRecord>> {
    let value: Value = serde_json::from_reader(reader)?;

    let rules = match value {
        Value::Array(_) => value,
        Value::Object(mut object) => object.remove(REMOTE_LISTING_KEY).ok_or_else(|| {
            ImporterError::RemoteListing(format!("object has no '{}' array", REMOTE_LISTING_KEY))
        })?,
        other => {
            return Err(ImporterError::RemoteListing(format!(
                "expected an object or an array, found {}",
                json_kind(&other)
            )))
        }
    };

    if !rules.is_array() {
        return Err(ImporterError::RemoteListing(format!(
            "'{}' is {}, not an array",
            REMOTE_LISTING_KEY,
            json_kind(&rules)
        )));
    }

    let records: Vec<RemoteRuleRecord> = serde_json::from_value(rules)?;
    debug!("Loaded {} remote rules", records.len());
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn read_group_records_from_path(path: &Path) -> Result<Vec<GroupRecord>> {
    let records = read_group_records(open(path)?)?;
    info!("📥 Read {} group rows from {}", records.len(), path.display());
    Ok(records)
}

pub fn read_rule_records_from_path(path: &Path) -> Result<Vec<RuleInputRecord>> {
    let records = read_rule_records(open(path)?)?;
    info!("📥 Read {} rule rows from {}", records.len(), path.display());
    Ok(records)
}

pub fn load_remote_listing_from_path(path: &Path) -> Result<Vec<RemoteRuleRecord>> {
    let records = load_remote_listing(open(path)?)?;
    info!("📥 Loaded {} remote rules from {}", records.len(), path.display());
    Ok(records)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}
